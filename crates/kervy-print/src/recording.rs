//! Recording driver: keeps every call instead of printing it.
//!
//! Backs the terminal's `--dry-run` checkout and the receipt tests.

use async_trait::async_trait;

use crate::driver::{Align, PrinterDriver, TextOptions};
use crate::error::{PrintError, PrintResult};
use crate::layout::{column_rows, CRLF};

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrintCommand {
    Connect(String),
    Init,
    Align(Align),
    SetBlob(u8),
    Text {
        text: String,
        options: TextOptions,
    },
    Columns {
        widths: Vec<usize>,
        aligns: Vec<Align>,
        cells: Vec<String>,
    },
}

/// [`PrinterDriver`] that records calls in order.
#[derive(Debug, Default)]
pub struct RecordingPrinter {
    commands: Vec<PrintCommand>,
    fail_after: Option<usize>,
}

impl RecordingPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every call once `calls` calls have been recorded.
    pub fn failing_after(calls: usize) -> Self {
        RecordingPrinter {
            commands: Vec::new(),
            fail_after: Some(calls),
        }
    }

    pub fn commands(&self) -> &[PrintCommand] {
        &self.commands
    }

    /// What the paper would show, with column rows laid out and CRLFs
    /// normalized to `\n`.
    pub fn rendered_text(&self) -> String {
        let mut out = String::new();
        for command in &self.commands {
            match command {
                PrintCommand::Text { text, .. } => out.push_str(text),
                PrintCommand::Columns {
                    widths,
                    aligns,
                    cells,
                } => {
                    if let Ok(rows) = column_rows(widths, aligns, cells) {
                        for row in rows {
                            out.push_str(&row);
                            out.push_str(CRLF);
                        }
                    }
                }
                _ => {}
            }
        }
        out.replace(CRLF, "\n")
    }

    fn record(&mut self, command: PrintCommand) -> PrintResult<()> {
        if let Some(limit) = self.fail_after {
            if self.commands.len() >= limit {
                return Err(PrintError::WriteFailed("printer went offline".to_string()));
            }
        }
        self.commands.push(command);
        Ok(())
    }
}

#[async_trait]
impl PrinterDriver for RecordingPrinter {
    async fn connect(&mut self, address: &str) -> PrintResult<()> {
        self.record(PrintCommand::Connect(address.to_string()))
    }

    async fn init(&mut self) -> PrintResult<()> {
        self.record(PrintCommand::Init)
    }

    async fn align(&mut self, align: Align) -> PrintResult<()> {
        self.record(PrintCommand::Align(align))
    }

    async fn set_blob(&mut self, weight: u8) -> PrintResult<()> {
        self.record(PrintCommand::SetBlob(weight))
    }

    async fn print_text(&mut self, text: &str, options: TextOptions) -> PrintResult<()> {
        self.record(PrintCommand::Text {
            text: text.to_string(),
            options,
        })
    }

    async fn print_columns(
        &mut self,
        widths: &[usize],
        aligns: &[Align],
        cells: &[String],
        _options: TextOptions,
    ) -> PrintResult<()> {
        column_rows(widths, aligns, cells)?;
        self.record(PrintCommand::Columns {
            widths: widths.to_vec(),
            aligns: aligns.to_vec(),
            cells: cells.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_in_order() {
        let mut printer = RecordingPrinter::new();
        printer.init().await.unwrap();
        printer.align(Align::Right).await.unwrap();
        printer
            .print_text("hi\r\n", TextOptions::default())
            .await
            .unwrap();

        assert_eq!(
            printer.commands(),
            &[
                PrintCommand::Init,
                PrintCommand::Align(Align::Right),
                PrintCommand::Text {
                    text: "hi\r\n".to_string(),
                    options: TextOptions::default()
                },
            ]
        );
        assert_eq!(printer.rendered_text(), "hi\n");
    }

    #[tokio::test]
    async fn test_fails_after_limit() {
        let mut printer = RecordingPrinter::failing_after(1);
        printer.init().await.unwrap();
        assert!(matches!(
            printer.init().await,
            Err(PrintError::WriteFailed(_))
        ));
        assert_eq!(printer.commands().len(), 1);
    }
}
