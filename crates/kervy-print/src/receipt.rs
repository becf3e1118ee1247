//! # Receipts and Kitchen Tickets
//!
//! The two documents the terminal prints, written as a fixed sequence of
//! driver calls.
//!
//! ## Customer Receipt
//! ```text
//!         Kervy's Kakanin              ← double height
//!        12 Rizal St, Cebu
//!  Date/Time: 2024-03-09 08:05:00
//!          SALES INVOICE
//! --------------------------------
//! --------------------------------
//! ITEM          QTY       SUBTOTAL
//! Bibingka       2         P 90.00
//! --------------------------------
//! TOTAL                    P 90.00
//! CASH                    P 100.00
//! CHANGE                   P 10.00
//! --------------------------------
//!       **Thank you Ana!**
//! --------------------------------
//!     TRANSACTION ID: 000042
//!        CASHIER: Kervy
//!           Contact Us
//!     MOBILE: 0917 000 0000
//! ```

use chrono::{DateTime, Local, Utc};
use tracing::{debug, info};

use kervy_core::{format_transaction_number, Money, NewTransaction, TransactionLine, UserProfile};

use crate::driver::{Align, PrinterDriver, TextOptions};
use crate::error::PrintResult;
use crate::layout::{CRLF, RULE};

/// Store name printed when the profile has none.
pub const DEFAULT_STORE_NAME: &str = "Please Set a Store Name";

/// Cashier placeholder when the profile has no name.
pub const DEFAULT_CASHIER: &str = "#######";

/// Phone placeholder when the profile has no phone.
pub const DEFAULT_PHONE: &str = "############";

const ITEM_COLUMNS: [usize; 3] = [12, 6, 12];
const ITEM_ALIGNS: [Align; 3] = [Align::Left, Align::Center, Align::Right];
const PAIR_COLUMNS: [usize; 2] = [16, 16];
const PAIR_ALIGNS: [Align; 2] = [Align::Left, Align::Right];

/// What a receipt or kitchen ticket is printed for.
#[derive(Debug, Clone, Copy)]
pub struct Ticket<'a> {
    pub number: u64,
    pub date: DateTime<Utc>,
    pub customer: Option<&'a str>,
    pub lines: &'a [TransactionLine],
}

impl<'a> From<&'a NewTransaction> for Ticket<'a> {
    fn from(tx: &'a NewTransaction) -> Self {
        Ticket {
            number: tx.number,
            date: tx.date,
            customer: tx.customer.as_deref(),
            lines: &tx.products,
        }
    }
}

/// Amounts on the receipt footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payment {
    pub total: Money,
    pub cash: Money,
    pub change: Money,
}

impl From<&NewTransaction> for Payment {
    fn from(tx: &NewTransaction) -> Self {
        Payment {
            total: Money::from_cents(tx.total_cents),
            cash: Money::from_cents(tx.cash_cents),
            change: Money::from_cents(tx.change_cents),
        }
    }
}

/// `Date/Time:` value, in the terminal's local time on a 12-hour clock.
pub fn format_ticket_date(date: &DateTime<Utc>) -> String {
    date.with_timezone(&Local)
        .format("%Y-%m-%d %I:%M:%S")
        .to_string()
}

async fn text(driver: &mut dyn PrinterDriver, line: &str) -> PrintResult<()> {
    driver.print_text(line, TextOptions::default()).await
}

async fn columns<const N: usize>(
    driver: &mut dyn PrinterDriver,
    widths: &[usize; N],
    aligns: &[Align; N],
    cells: [String; N],
) -> PrintResult<()> {
    driver
        .print_columns(widths, aligns, &cells, TextOptions::default())
        .await
}

/// Connects and resets the printer: init, centre, bold off, centre.
async fn start(driver: &mut dyn PrinterDriver, address: &str) -> PrintResult<()> {
    driver.connect(address).await?;
    driver.init().await?;
    driver.align(Align::Center).await?;
    driver.set_blob(0).await?;
    driver.align(Align::Center).await
}

/// Prints the customer receipt.
///
/// Returns `Ok(false)` without touching the driver when the profile has no
/// printer.
pub async fn print_receipt(
    driver: &mut dyn PrinterDriver,
    profile: &UserProfile,
    ticket: &Ticket<'_>,
    payment: &Payment,
    currency: &str,
) -> PrintResult<bool> {
    let Some(printer) = &profile.printer else {
        debug!("No printer paired, skipping receipt");
        return Ok(false);
    };

    start(driver, &printer.address).await?;

    let store = profile.store.as_deref().unwrap_or(DEFAULT_STORE_NAME);
    driver
        .print_text(&format!("{} {CRLF}{CRLF}", store), TextOptions::double_height())
        .await?;
    let address = profile.address.as_deref().unwrap_or("");
    text(driver, &format!("{}{CRLF}{CRLF}", address)).await?;
    text(driver, &format!("Date/Time: {}{CRLF}", format_ticket_date(&ticket.date))).await?;
    text(driver, &format!("SALES INVOICE{CRLF}")).await?;
    text(driver, &format!("{RULE}{CRLF}")).await?;
    text(driver, &format!("{RULE}{CRLF}")).await?;

    columns(
        driver,
        &ITEM_COLUMNS,
        &ITEM_ALIGNS,
        ["ITEM".into(), "QTY".into(), "SUBTOTAL".into()],
    )
    .await?;
    for line in ticket.lines {
        columns(
            driver,
            &ITEM_COLUMNS,
            &ITEM_ALIGNS,
            [
                line.name.clone(),
                line.quantity.to_string(),
                line.subtotal().with_symbol(currency),
            ],
        )
        .await?;
    }

    text(driver, &format!("{RULE}{CRLF}")).await?;
    for (label, amount) in [
        ("TOTAL", payment.total),
        ("CASH", payment.cash),
        ("CHANGE", payment.change),
    ] {
        columns(
            driver,
            &PAIR_COLUMNS,
            &PAIR_ALIGNS,
            [label.into(), amount.with_symbol(currency)],
        )
        .await?;
    }

    text(driver, &format!("{RULE}{CRLF}")).await?;
    let thanks = match ticket.customer {
        Some(customer) => format!("**Thank you {}!**{CRLF}", customer),
        None => format!("**Thank you!**{CRLF}"),
    };
    text(driver, &thanks).await?;
    text(driver, &format!("{RULE}{CRLF}")).await?;
    text(
        driver,
        &format!("TRANSACTION ID: {}{CRLF}", format_transaction_number(ticket.number)),
    )
    .await?;
    let cashier = profile.name.as_deref().unwrap_or(DEFAULT_CASHIER);
    text(driver, &format!("CASHIER: {}{CRLF}", cashier)).await?;
    driver.align(Align::Center).await?;
    text(driver, &format!("Contact Us{CRLF}")).await?;
    let phone = profile.phone.as_deref().unwrap_or(DEFAULT_PHONE);
    text(driver, &format!("MOBILE: {} {CRLF}", phone)).await?;
    text(driver, &CRLF.repeat(5)).await?;

    info!(number = ticket.number, "Receipt printed");
    Ok(true)
}

/// Prints the kitchen ticket: number, customer and quantities, no prices.
///
/// Returns `Ok(false)` when the profile has no printer.
pub async fn print_kitchen_ticket(
    driver: &mut dyn PrinterDriver,
    profile: &UserProfile,
    ticket: &Ticket<'_>,
) -> PrintResult<bool> {
    let Some(printer) = &profile.printer else {
        debug!("No printer paired, skipping kitchen ticket");
        return Ok(false);
    };

    start(driver, &printer.address).await?;

    driver
        .print_text(
            &format!(
                "TRANSACTION #{} {CRLF}{CRLF}",
                format_transaction_number(ticket.number)
            ),
            TextOptions::double_height(),
        )
        .await?;
    text(driver, &format!("Date/Time: {}{CRLF}", format_ticket_date(&ticket.date))).await?;
    text(
        driver,
        &format!("CUSTOMER NAME {}{CRLF}", ticket.customer.unwrap_or("")),
    )
    .await?;

    columns(driver, &PAIR_COLUMNS, &PAIR_ALIGNS, ["ITEM".into(), "QUANTITY".into()]).await?;
    for line in ticket.lines {
        columns(
            driver,
            &PAIR_COLUMNS,
            &PAIR_ALIGNS,
            [line.name.clone(), line.quantity.to_string()],
        )
        .await?;
    }

    text(driver, &format!("{RULE}{CRLF}")).await?;
    let cashier = profile.name.as_deref().unwrap_or(DEFAULT_CASHIER);
    text(driver, &format!("CASHIER: {}{CRLF}", cashier)).await?;
    text(driver, &CRLF.repeat(3)).await?;

    info!(number = ticket.number, "Kitchen ticket printed");
    Ok(true)
}
