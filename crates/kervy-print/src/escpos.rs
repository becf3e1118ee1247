//! # ESC/POS Printer
//!
//! [`PrinterDriver`] that encodes commands as ESC/POS bytes and streams them
//! to a network printer or a serial/Bluetooth device file.
//!
//! ## Command Encoding
//! ```text
//! ┌──────────────────┬────────────────────┬────────────────────────────────┐
//! │ Driver call      │ Bytes              │ Meaning                        │
//! ├──────────────────┼────────────────────┼────────────────────────────────┤
//! │ init             │ 1B 40              │ ESC @   reset                  │
//! │ align(n)         │ 1B 61 n            │ ESC a n 0=left 1=centre 2=right│
//! │ set_blob(n)      │ 1B 45 n            │ ESC E n emphasis on/off        │
//! │ print_text       │ 1D 21 n, text      │ GS ! n  character size         │
//! │ print_columns    │ 1D 21 n, rows+CRLF │ one padded line per row        │
//! └──────────────────┴────────────────────┴────────────────────────────────┘
//! ```
//!
//! ## Addresses
//! - `192.168.1.50:9100` connects over TCP (raw port 9100 printers)
//! - `/dev/rfcomm0`, `/dev/usb/lp0` open the device file for writing

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::driver::{Align, PrinterDriver, TextOptions};
use crate::error::{PrintError, PrintResult};
use crate::layout::{column_rows, CRLF};

const ESC: u8 = 0x1B;
const GS: u8 = 0x1D;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

type Sink = Box<dyn AsyncWrite + Send + Unpin>;

/// ESC/POS printer over any byte sink.
pub struct EscPosPrinter {
    sink: Option<Sink>,
}

impl EscPosPrinter {
    /// Creates a disconnected printer; call [`PrinterDriver::connect`] next.
    pub fn new() -> Self {
        EscPosPrinter { sink: None }
    }

    /// Creates a printer that writes into an already-open sink.
    pub fn from_writer<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        EscPosPrinter {
            sink: Some(Box::new(writer)),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.sink.is_some()
    }

    async fn send(&mut self, bytes: &[u8]) -> PrintResult<()> {
        let sink = self.sink.as_mut().ok_or(PrintError::NotConnected)?;
        sink.write_all(bytes).await?;
        sink.flush().await?;
        Ok(())
    }
}

impl Default for EscPosPrinter {
    fn default() -> Self {
        Self::new()
    }
}

/// Thermal printers only know their code page; anything outside ASCII is
/// printed as `?`.
fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .collect()
}

fn is_device_path(address: &str) -> bool {
    address.starts_with('/') || address.starts_with("\\\\.\\")
}

#[async_trait]
impl PrinterDriver for EscPosPrinter {
    async fn connect(&mut self, address: &str) -> PrintResult<()> {
        let failed = |reason: String| PrintError::ConnectionFailed {
            address: address.to_string(),
            reason,
        };

        let sink: Sink = if is_device_path(address) {
            let file = tokio::fs::OpenOptions::new()
                .write(true)
                .open(address)
                .await
                .map_err(|e| failed(e.to_string()))?;
            Box::new(file)
        } else {
            let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(address))
                .await
                .map_err(|_| failed("timed out".to_string()))?
                .map_err(|e| failed(e.to_string()))?;
            Box::new(stream)
        };

        info!(address = %address, "Printer connected");
        self.sink = Some(sink);
        Ok(())
    }

    async fn init(&mut self) -> PrintResult<()> {
        self.send(&[ESC, b'@']).await
    }

    async fn align(&mut self, align: Align) -> PrintResult<()> {
        self.send(&[ESC, b'a', align.code()]).await
    }

    async fn set_blob(&mut self, weight: u8) -> PrintResult<()> {
        self.send(&[ESC, b'E', u8::from(weight > 0)]).await
    }

    async fn print_text(&mut self, text: &str, options: TextOptions) -> PrintResult<()> {
        let mut bytes = vec![GS, b'!', options.size_code()];
        bytes.extend(encode_text(text));
        self.send(&bytes).await
    }

    async fn print_columns(
        &mut self,
        widths: &[usize],
        aligns: &[Align],
        cells: &[String],
        options: TextOptions,
    ) -> PrintResult<()> {
        let rows = column_rows(widths, aligns, cells)?;
        debug!(rows = rows.len(), "Printing column row");

        let mut bytes = vec![GS, b'!', options.size_code()];
        for row in rows {
            bytes.extend(encode_text(&row));
            bytes.extend(CRLF.as_bytes());
        }
        self.send(&bytes).await
    }
}
