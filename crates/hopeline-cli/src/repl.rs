//! Line-oriented chat loop

use std::io::{BufRead, Write};

use hopeline_chat::ResponsePipeline;
use hopeline_core::Result;

/// Printed before every line of input
pub const HUMAN_PROMPT: &str = "\nHuman: ";

/// Printed when the user types `exit`
pub const GOODBYE: &str = "Chatbot: Take Care of yourself, Goodbye!";

const EXIT_COMMAND: &str = "exit";

/// One answered line of input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub query: String,
    pub reply: String,
}

/// Why a session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user typed `exit`
    Exit,
    /// Input was closed
    EndOfInput,
}

/// Reads questions from `input` and writes answers to `output` until the
/// user exits or input ends.
///
/// The transcript is kept for the caller only; each question is answered
/// on its own.
pub struct InteractiveSession<'a, R, W> {
    pipeline: &'a ResponsePipeline,
    input: R,
    output: W,
    transcript: Vec<Exchange>,
}

impl<'a, R: BufRead, W: Write> InteractiveSession<'a, R, W> {
    pub fn new(pipeline: &'a ResponsePipeline, input: R, output: W) -> Self {
        Self {
            pipeline,
            input,
            output,
            transcript: Vec::new(),
        }
    }

    pub fn transcript(&self) -> &[Exchange] {
        &self.transcript
    }

    pub fn into_transcript(self) -> Vec<Exchange> {
        self.transcript
    }

    /// Run the loop. Model errors end the session and are returned.
    pub async fn run(&mut self) -> Result<SessionEnd> {
        loop {
            write!(self.output, "{}", HUMAN_PROMPT)?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                tracing::debug!(exchanges = self.transcript.len(), "Input closed");
                return Ok(SessionEnd::EndOfInput);
            }
            let query = line.trim_end_matches(['\n', '\r']);

            if query.trim().eq_ignore_ascii_case(EXIT_COMMAND) {
                writeln!(self.output, "{}", GOODBYE)?;
                self.output.flush()?;
                return Ok(SessionEnd::Exit);
            }

            let reply = self.pipeline.respond_to_query(query).await?;
            writeln!(self.output, "Chatbot: {}", reply.text())?;

            if !query.trim().is_empty() {
                self.transcript.push(Exchange {
                    query: query.to_string(),
                    reply: reply.reply,
                });
            }
        }
    }
}
