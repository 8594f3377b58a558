//! Terminal output helpers

use colored::*;
use crossterm::terminal::size;

const MAX_BANNER_WIDTH: usize = 67;
const MIN_BANNER_WIDTH: usize = 40;

/// Display the startup banner
pub fn display_banner(model: &str, retrieval_enabled: bool) {
    let terminal_width = size().map(|(w, _)| w as usize).unwrap_or(80);
    let width = terminal_width
        .saturating_sub(4)
        .clamp(MIN_BANNER_WIDTH, MAX_BANNER_WIDTH);

    println!();
    for (i, line) in banner_lines(width, model, retrieval_enabled).iter().enumerate() {
        if i == 2 {
            println!("{}", line.blue().bold());
        } else {
            println!("{}", line.blue());
        }
    }
    println!();
    println!("{}", "Type your question, or 'exit' to leave.".dimmed());
}

/// Boxed banner text, each line exactly `width` characters wide
pub(crate) fn banner_lines(width: usize, model: &str, retrieval_enabled: bool) -> Vec<String> {
    let inner = width.saturating_sub(2);
    let retrieval = if retrieval_enabled {
        "Retrieval: document context enabled"
    } else {
        "Retrieval: off (answering from the model alone)"
    };
    let model_line = format!("Model: {}", model);

    let body = [
        "",
        "HopeLine - Mental Health Chatbot",
        "",
        "A compassionate chatbot for mental well-being.",
        "For serious concerns, contact a professional.",
        "",
        model_line.as_str(),
        retrieval,
        "",
    ];

    let mut lines = Vec::with_capacity(body.len() + 2);
    lines.push(format!("┌{}┐", "─".repeat(inner)));
    for text in body {
        lines.push(format!("│{}│", pad(text, inner)));
    }
    lines.push(format!("└{}┘", "─".repeat(inner)));
    lines
}

/// Left-pad by two spaces, then fill or truncate to `width` characters
fn pad(text: &str, width: usize) -> String {
    let mut line: String = format!("  {}", text).chars().take(width).collect();
    let len = line.chars().count();
    line.push_str(&" ".repeat(width - len));
    line
}
