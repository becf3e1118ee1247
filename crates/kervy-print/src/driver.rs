//! # Printer Driver Contract
//!
//! The sequential command set every receipt printer backend understands.
//! Each call is awaited before the next one is issued, so the paper comes
//! out in the order the commands were written.

use async_trait::async_trait;

use crate::error::PrintResult;

/// Horizontal alignment of text or a column cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl Align {
    /// ESC/POS `ESC a n` argument.
    pub const fn code(&self) -> u8 {
        match self {
            Align::Left => 0,
            Align::Center => 1,
            Align::Right => 2,
        }
    }
}

/// Character magnification for a text call.
///
/// `0` and `1` both mean normal size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextOptions {
    pub height_times: u8,
    pub width_times: u8,
}

impl TextOptions {
    pub const fn double_height() -> Self {
        TextOptions {
            height_times: 2,
            width_times: 0,
        }
    }

    /// ESC/POS `GS ! n` argument. Magnification is capped at 8x.
    pub fn size_code(&self) -> u8 {
        let scale = |times: u8| times.clamp(1, 8) - 1;
        (scale(self.width_times) << 4) | scale(self.height_times)
    }
}

/// A receipt printer.
#[async_trait]
pub trait PrinterDriver: Send {
    /// Opens the connection to `address` (`host:port` or a device path).
    async fn connect(&mut self, address: &str) -> PrintResult<()>;

    /// Resets the printer to its power-on state.
    async fn init(&mut self) -> PrintResult<()>;

    async fn align(&mut self, align: Align) -> PrintResult<()>;

    /// Sets emphasis weight; `0` turns bold off.
    async fn set_blob(&mut self, weight: u8) -> PrintResult<()>;

    /// Prints `text` verbatim, line breaks included.
    async fn print_text(&mut self, text: &str, options: TextOptions) -> PrintResult<()>;

    /// Prints one table row, wrapping cells that overflow their column.
    async fn print_columns(
        &mut self,
        widths: &[usize],
        aligns: &[Align],
        cells: &[String],
        options: TextOptions,
    ) -> PrintResult<()>;
}
