use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use hopeline_chat::{PromptTemplate, ResponsePipeline};
use hopeline_cli::{InteractiveSession, display_banner};
use hopeline_core::ChatModel;
use hopeline_groq::{GroqClient, GroqConfig};
use hopeline_rag::{IndexConfig, IndexManager};
use hopeline_server::{AppState, ChatServer, ServerConfig};

/// Sampling temperature of the interactive chat
const INTERACTIVE_TEMPERATURE: f32 = 0.0;
/// Sampling temperature of the HTTP service
const SERVICE_TEMPERATURE: f32 = 0.3;

#[derive(Parser)]
#[command(name = "hopeline", version)]
#[command(about = "Compassionate mental health chatbot with optional document retrieval", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat in the terminal, building the document index if it is missing
    Chat {
        /// Directory of PDFs to index
        #[arg(long, env = "DATA_DIR", default_value = "./data")]
        data_dir: PathBuf,
        /// Directory of the persisted index
        #[arg(long, env = "CHROMA_DIR", default_value = "./chroma_db")]
        index_dir: PathBuf,
    },
    /// Serve POST /chat over HTTP
    Serve {
        /// Listen host, overriding HOST (default 0.0.0.0)
        #[arg(long)]
        host: Option<String>,
        /// Listen port, overriding PORT (default 8001)
        #[arg(long)]
        port: Option<u16>,
        /// Persisted index to answer from; retrieval is off when unset
        #[arg(long, env = "CHROMA_DIR")]
        index_dir: Option<PathBuf>,
    },
    /// Rebuild the persisted index from a directory of PDFs
    Ingest {
        #[arg(long, env = "DATA_DIR", default_value = "./data")]
        data_dir: PathBuf,
        #[arg(long, env = "CHROMA_DIR", default_value = "./chroma_db")]
        index_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Chat { data_dir, index_dir } => run_chat(data_dir, index_dir).await,
        Commands::Serve {
            host,
            port,
            index_dir,
        } => {
            let server_config = ServerConfig::from_env()?.with_overrides(host, port);
            run_serve(server_config, index_dir).await
        }
        Commands::Ingest { data_dir, index_dir } => run_ingest(data_dir, index_dir).await,
    }
}

/// Logs go to stderr so the chat transcript on stdout stays clean
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hopeline=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

async fn run_chat(data_dir: PathBuf, index_dir: PathBuf) -> Result<()> {
    tracing::info!("Initializing chatbot");

    // A missing key is fatal here, before any index work
    let config = GroqConfig::from_env()?.with_temperature(INTERACTIVE_TEMPERATURE);
    let model: Arc<dyn ChatModel> = Arc::new(GroqClient::new(config)?);

    let index = IndexConfig::from_env()
        .with_persist_dir(index_dir)
        .with_source_dir(data_dir);
    let retrieval = IndexManager::new(index).acquire().await;

    let pipeline = ResponsePipeline::new(model, retrieval, PromptTemplate::interactive());
    display_banner(pipeline.model_id(), pipeline.retrieval().is_available());

    let stdin = io::stdin().lock();
    let stdout = io::stdout().lock();
    let mut session = InteractiveSession::new(&pipeline, stdin, stdout);

    session.run().await?;
    tracing::debug!(exchanges = session.transcript().len(), "Session ended");
    Ok(())
}

async fn run_serve(server_config: ServerConfig, index_dir: Option<PathBuf>) -> Result<()> {
    // A missing key is reported per request rather than aborting startup
    let groq = GroqConfig::from_env().map(|c| c.with_temperature(SERVICE_TEMPERATURE));
    let model_name = match &groq {
        Ok(config) => config.model.clone(),
        Err(_) => std::env::var("GROQ_MODEL").unwrap_or_else(|_| GroqConfig::DEFAULT_MODEL.to_string()),
    };
    let model = groq
        .and_then(GroqClient::new)
        .map(|client| Arc::new(client) as Arc<dyn ChatModel>);

    let mut index = IndexConfig::from_env().with_build_if_missing(false);
    index.persist_dir = index_dir;
    index.source_dir = None;
    let retrieval = IndexManager::new(index).acquire().await;

    let state = AppState::from_parts(model, model_name, retrieval, PromptTemplate::service());
    ChatServer::new(server_config, state).start().await?;

    Ok(())
}

async fn run_ingest(data_dir: PathBuf, index_dir: PathBuf) -> Result<()> {
    let config = IndexConfig::from_env()
        .with_persist_dir(&index_dir)
        .with_source_dir(&data_dir);

    let index = IndexManager::new(config).rebuild().await?;
    println!(
        "Indexed {} chunks from {} into {}",
        index.len(),
        data_dir.display(),
        index_dir.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_flags() {
        let cli = Cli::try_parse_from(["hopeline", "serve", "--host", "127.0.0.1", "--port", "9000"]).unwrap();
        match cli.command {
            Commands::Serve { host, port, .. } => {
                assert_eq!(host.as_deref(), Some("127.0.0.1"));
                assert_eq!(port, Some(9000));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_chat_flags() {
        let cli = Cli::try_parse_from([
            "hopeline",
            "chat",
            "--data-dir",
            "docs",
            "--index-dir",
            "idx",
        ])
        .unwrap();
        match cli.command {
            Commands::Chat { data_dir, index_dir } => {
                assert_eq!(data_dir, PathBuf::from("docs"));
                assert_eq!(index_dir, PathBuf::from("idx"));
            }
            _ => panic!("expected chat"),
        }
    }

    #[test]
    fn test_serve_flags_default_to_environment() {
        let cli = Cli::try_parse_from(["hopeline", "serve"]).unwrap();
        match cli.command {
            Commands::Serve { host, port, .. } => {
                assert!(host.is_none());
                assert!(port.is_none());
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["hopeline"]).is_err());
    }
}
