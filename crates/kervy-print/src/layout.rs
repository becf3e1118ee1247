//! # Column Layout
//!
//! Pure text layout for fixed-width thermal paper.
//!
//! ```text
//!  widths [12, 6, 12]   aligns [Left, Center, Right]
//!  ┌────────────┬──────┬────────────┐
//!  │Halo-Halo   │  2   │    P 180.00│
//!  │Special     │      │            │   ← overflow wraps onto the next row
//!  └────────────┴──────┴────────────┘
//! ```

use crate::driver::Align;
use crate::error::{PrintError, PrintResult};

/// Characters per line on 58 mm paper.
pub const PAPER_WIDTH: usize = 32;

/// Horizontal rule spanning the paper.
pub const RULE: &str = "--------------------------------";

/// Line ending sent to the printer.
pub const CRLF: &str = "\r\n";

/// Pads `text` to `width` characters. Longer text is cut.
pub fn pad(text: &str, width: usize, align: Align) -> String {
    let text: String = text.chars().take(width).collect();
    let gap = width - text.chars().count();

    match align {
        Align::Left => format!("{}{}", text, " ".repeat(gap)),
        Align::Right => format!("{}{}", " ".repeat(gap), text),
        Align::Center => {
            let left = gap / 2;
            format!("{}{}{}", " ".repeat(left), text, " ".repeat(gap - left))
        }
    }
}

/// Splits `text` into pieces of at most `width` characters, breaking at
/// spaces where possible.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return Vec::new();
    }

    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..width).collect());
        }
        if word.is_empty() {
            continue;
        }

        let needed = if current.is_empty() {
            word.len()
        } else {
            current.chars().count() + 1 + word.len()
        };
        if needed > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(word);
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Lays out one table row as one or more printed lines (without line endings).
pub fn column_rows(widths: &[usize], aligns: &[Align], cells: &[String]) -> PrintResult<Vec<String>> {
    if widths.len() != aligns.len() || widths.len() != cells.len() {
        return Err(PrintError::InvalidLayout(format!(
            "{} widths, {} aligns, {} cells",
            widths.len(),
            aligns.len(),
            cells.len()
        )));
    }

    let wrapped: Vec<Vec<String>> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| wrap(cell, *width))
        .collect();
    let height = wrapped.iter().map(Vec::len).max().unwrap_or(0);

    let rows = (0..height)
        .map(|row| {
            wrapped
                .iter()
                .zip(widths.iter().zip(aligns))
                .map(|(pieces, (width, align))| {
                    pad(pieces.get(row).map(String::as_str).unwrap_or(""), *width, *align)
                })
                .collect::<String>()
        })
        .collect();

    Ok(rows)
}
