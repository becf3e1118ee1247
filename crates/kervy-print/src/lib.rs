//! # kervy-print: Receipt Printing for Kervy POS
//!
//! Turns a sale into the sequence of printer calls that produces a customer
//! receipt or a kitchen ticket, and encodes those calls for ESC/POS thermal
//! printers.
//!
//! ## Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  receipt    print_receipt / print_kitchen_ticket                        │
//! │     │        (fixed call order, one awaited call per line)              │
//! │     ▼                                                                   │
//! │  driver     PrinterDriver trait                                         │
//! │     │                                                                   │
//! │     ├──► EscPosPrinter   ESC/POS bytes → TCP :9100 or /dev/rfcomm0      │
//! │     └──► RecordingPrinter  keeps the calls (tests, dry runs)            │
//! │                                                                         │
//! │  layout     32-column paper: pad, wrap, column rows                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use kervy_print::{print_receipt, EscPosPrinter, Payment, Ticket};
//!
//! let mut printer = EscPosPrinter::new();
//! let printed = print_receipt(&mut printer, &profile, &Ticket::from(&tx), &Payment::from(&tx), "P").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod driver;
pub mod error;
pub mod escpos;
pub mod layout;
pub mod receipt;
pub mod recording;

// =============================================================================
// Re-exports
// =============================================================================

pub use driver::{Align, PrinterDriver, TextOptions};
pub use error::{PrintError, PrintResult};
pub use escpos::EscPosPrinter;
pub use layout::PAPER_WIDTH;
pub use receipt::{print_kitchen_ticket, print_receipt, Payment, Ticket};
pub use recording::{PrintCommand, RecordingPrinter};
