//! Script text assembly.
//!
//! Scripts use CRLF line endings and, unless disabled, end every batch with
//! a `GO` line.

use crate::config::{ScriptEncoding, ScriptingOptions};
use crate::{Result, error::ScripterError};
use std::path::Path;

/// Batch separator line.
pub const BATCH_TERMINATOR: &str = "GO";

const LINE_ENDING: &str = "\r\n";

/// Bracket-quotes an identifier, doubling any closing bracket.
///
/// ```rust
/// use sqlscripter_core::adapters::quote_name;
///
/// assert_eq!(quote_name("Order Details"), "[Order Details]");
/// assert_eq!(quote_name("odd]name"), "[odd]]name]");
/// ```
pub fn quote_name(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Unicode string literal with embedded quotes doubled.
///
/// ```rust
/// use sqlscripter_core::adapters::quote_literal;
///
/// assert_eq!(quote_literal("O'Brien"), "N'O''Brien'");
/// ```
pub fn quote_literal(value: &str) -> String {
    format!("N'{}'", value.replace('\'', "''"))
}

/// Accumulates statements into batches.
#[derive(Debug)]
pub struct ScriptBuilder<'a> {
    options: &'a ScriptingOptions,
    text: String,
}

impl<'a> ScriptBuilder<'a> {
    /// Starts an empty script.
    pub fn new(options: &'a ScriptingOptions) -> Self {
        Self {
            options,
            text: String::new(),
        }
    }

    /// Emits `USE [database]` when database context is enabled.
    pub fn use_database(&mut self, database: &str) -> &mut Self {
        if self.options.include_database_context {
            self.batch(&format!("USE {}", quote_name(database)));
        }
        self
    }

    /// Appends text to the current batch, normalizing line endings.
    pub fn statement(&mut self, sql: &str) -> &mut Self {
        for line in sql.lines() {
            self.text.push_str(line);
            self.text.push_str(LINE_ENDING);
        }
        self
    }

    /// Closes the current batch.
    pub fn end_batch(&mut self) -> &mut Self {
        if self.options.batch_terminators {
            self.text.push_str(BATCH_TERMINATOR);
            self.text.push_str(LINE_ENDING);
        }
        self
    }

    /// A complete single-statement batch.
    pub fn batch(&mut self, sql: &str) -> &mut Self {
        self.statement(sql).end_batch()
    }

    /// Whether nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The assembled script text.
    pub fn finish(self) -> String {
        self.text
    }
}

/// Writes a script to `target` in the requested encoding, replacing any
/// existing file.
///
/// # Errors
/// Returns an I/O error if the file cannot be written.
pub async fn write_script(target: &Path, script: &str, encoding: ScriptEncoding) -> Result<()> {
    let preamble = encoding.preamble();
    let mut bytes = Vec::with_capacity(preamble.len() + script.len());
    bytes.extend_from_slice(preamble);
    bytes.extend_from_slice(script.as_bytes());

    tokio::fs::write(target, bytes)
        .await
        .map_err(|e| ScripterError::io("write", target, e))
}
