//! PDF directory loading

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use hopeline_core::{ChunkSource, Error, Result};

static HORIZONTAL_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{00A0}]+").expect("static regex"));

/// Text of one PDF page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPage {
    pub text: String,
    pub source: ChunkSource,
}

/// Loads every `*.pdf` file directly inside a directory, one entry per page
pub struct PdfDirectoryLoader {
    dir: PathBuf,
}

impl PdfDirectoryLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// PDF files in the directory, sorted by path.
    ///
    /// A missing directory yields an empty list.
    pub fn pdf_files(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            tracing::warn!(dir = %self.dir.display(), "Document directory does not exist");
            return Ok(Vec::new());
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_pdf(path))
            .collect();
        files.sort();

        Ok(files)
    }

    /// Load every page of every PDF. Files that fail to parse are skipped.
    pub fn load(&self) -> Result<Vec<LoadedPage>> {
        let mut pages = Vec::new();

        for path in self.pdf_files()? {
            match load_pdf(&path) {
                Ok(file_pages) => {
                    tracing::debug!(file = %path.display(), pages = file_pages.len(), "Loaded PDF");
                    pages.extend(file_pages);
                }
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "Skipping unreadable PDF");
                }
            }
        }

        Ok(pages)
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Load a single PDF page by page, falling back to whole-document extraction
fn load_pdf(path: &Path) -> Result<Vec<LoadedPage>> {
    let bytes = std::fs::read(path)?;
    let document = lopdf::Document::load_mem(&bytes)
        .map_err(|e| Error::Ingestion(format!("Failed to parse {}: {}", path.display(), e)))?;

    let mut pages = Vec::new();
    for (index, number) in document.get_pages().into_keys().enumerate() {
        match document.extract_text(&[number]) {
            Ok(text) => {
                let text = clean_text(&text);
                if !text.is_empty() {
                    pages.push(LoadedPage {
                        text,
                        source: ChunkSource {
                            path: path.to_path_buf(),
                            page: Some(index as u32),
                        },
                    });
                }
            }
            Err(e) => {
                tracing::debug!(file = %path.display(), page = number, error = %e, "Page text extraction failed");
            }
        }
    }

    if pages.is_empty() {
        let text = pdf_extract::extract_text_from_mem(&bytes)
            .map_err(|e| Error::Ingestion(format!("No extractable text in {}: {}", path.display(), e)))?;
        let text = clean_text(&text);
        if !text.is_empty() {
            pages.push(LoadedPage {
                text,
                source: ChunkSource {
                    path: path.to_path_buf(),
                    page: None,
                },
            });
        }
    }

    Ok(pages)
}

/// Collapse runs of spaces and tabs, keeping line structure for the splitter
fn clean_text(text: &str) -> String {
    text.lines()
        .map(|line| HORIZONTAL_WHITESPACE.replace_all(line.trim(), " ").into_owned())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Write a PDF with one line of Helvetica text per page
#[cfg(test)]
pub(crate) fn write_text_pdf(path: &Path, pages: &[&str]) {
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(Object::from(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest_directory;
    use hopeline_core::IndexingConfig;

    #[test]
    fn test_clean_text() {
        let raw = "  Grounding\t\ttechniques  \n5 things   you can see \n\n";
        assert_eq!(clean_text(raw), "Grounding techniques\n5 things you can see");
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let loader = PdfDirectoryLoader::new("/definitely/not/here");
        assert!(loader.pdf_files().unwrap().is_empty());
        assert!(loader.load().unwrap().is_empty());
    }

    #[test]
    fn test_only_pdf_extensions_are_listed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.PDF"), b"x").unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let files = PdfDirectoryLoader::new(dir.path()).pdf_files().unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.PDF"]);
    }

    #[test]
    fn test_corrupt_pdf_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.pdf"), b"this is not a pdf").unwrap();

        let pages = PdfDirectoryLoader::new(dir.path()).load().unwrap();
        assert!(pages.is_empty());
    }

    #[test]
    fn test_pages_are_loaded_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coping.pdf");
        write_text_pdf(&path, &["Slow breathing calms the body.", "Keep a regular sleep routine."]);
        write_text_pdf(&dir.path().join("another.pdf"), &["Call a friend when you feel low."]);

        let pages = PdfDirectoryLoader::new(dir.path()).load().unwrap();

        assert_eq!(pages.len(), 3);
        assert!(pages[0].text.contains("Call a friend"));
        assert_eq!(pages[0].source.page, Some(0));
        assert_eq!(pages[1].source, ChunkSource { path: path.clone(), page: Some(0) });
        assert!(pages[1].text.contains("Slow breathing"));
        assert_eq!(pages[2].source, ChunkSource { path, page: Some(1) });
        assert!(pages[2].text.contains("sleep routine"));
    }

    #[tokio::test]
    async fn test_ingest_directory_chunks_pdf_pages() {
        let dir = tempfile::tempdir().unwrap();
        write_text_pdf(
            &dir.path().join("guide.pdf"),
            &["Grounding uses your five senses.", "Journaling helps sort your thoughts."],
        );

        let chunks = ingest_directory(dir.path(), &IndexingConfig::default()).await.unwrap();

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.contains("Grounding"));
        assert_eq!(chunks[0].source.page, Some(0));
        assert!(chunks[1].text.contains("Journaling"));
        assert_eq!(chunks[1].source.page, Some(1));
    }
}
