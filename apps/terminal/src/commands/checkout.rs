//! # Checkout Commands
//!
//! Ringing up the cart and sending orders to the kitchen.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Total the cart; cash must cover it      (PAYMENT_ERROR otherwise)   │
//! │  2. Number = latest transaction number + 1  (1 for the first sale)      │
//! │  3. Save the transaction, decrement stock                               │
//! │  4. Clear the cart                                                      │
//! │  5. Print the receipt if a printer is paired                            │
//! │     └─ a printer failure is reported; the sale stays saved              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use kervy_core::{next_transaction_number, CheckoutSummary, CoreError, Money, Transaction, UserProfile};
use kervy_print::{print_kitchen_ticket, print_receipt, Payment, PrintError, PrinterDriver, Ticket};

use crate::error::AppResult;
use crate::state::{CartState, ConfigState, SessionState, TransactionStore};

/// What happened to the receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status", content = "reason")]
pub enum ReceiptStatus {
    Printed,
    /// The profile has no paired printer.
    NoPrinter,
    /// Printing failed; the sale was still saved.
    Failed(String),
}

/// Result of a completed checkout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutOutcome {
    pub transaction: Transaction,
    pub change: Money,
    pub receipt: ReceiptStatus,
}

/// State objects a checkout reads and writes.
#[derive(Clone, Copy)]
pub struct Till<'a> {
    pub cart: &'a CartState,
    pub transactions: &'a TransactionStore,
    pub session: &'a SessionState,
    pub config: &'a ConfigState,
}

impl Till<'_> {
    /// The signed-in profile with the configured store name filled in.
    async fn receipt_profile(&self) -> AppResult<UserProfile> {
        let mut profile = match self.session.profile().await {
            Some(profile) => profile,
            None => {
                let user = self.session.user_id().await?;
                UserProfile::new(user, "", None)
            }
        };
        if profile.store.is_none() {
            profile.store = self.config.store_name.clone();
        }
        Ok(profile)
    }

    async fn next_number(&self) -> AppResult<u64> {
        let latest = self.transactions.fetch_latest().await?;
        Ok(next_transaction_number(latest.map(|t| t.number)))
    }
}

/// Sells the cart for `cash` and prints the receipt.
pub async fn checkout(
    till: Till<'_>,
    printer: &mut dyn PrinterDriver,
    cash: Money,
    customer: Option<String>,
) -> AppResult<CheckoutOutcome> {
    let cart = till.cart.snapshot();
    let summary = CheckoutSummary::compute(&cart, cash)?;

    let number = till.next_number().await?;
    let tx = summary.into_transaction(&cart, number, customer, Utc::now());
    let transaction = till.transactions.add(tx.clone()).await?;
    till.cart.clear();

    let profile = till.receipt_profile().await?;
    let receipt = match print_receipt(
        printer,
        &profile,
        &Ticket::from(&tx),
        &Payment::from(&tx),
        &till.config.currency_symbol,
    )
    .await
    {
        Ok(true) => ReceiptStatus::Printed,
        Ok(false) => ReceiptStatus::NoPrinter,
        Err(e) => {
            warn!(error = %e, number, "Receipt failed; sale kept");
            ReceiptStatus::Failed(e.to_string())
        }
    };

    info!(number, change_cents = summary.change.cents(), "Checkout complete");
    Ok(CheckoutOutcome {
        transaction,
        change: summary.change,
        receipt,
    })
}

/// Prints a kitchen ticket for the cart without saving a sale.
///
/// Returns the number printed on the ticket.
pub async fn send_to_kitchen(
    till: Till<'_>,
    printer: &mut dyn PrinterDriver,
    customer: Option<String>,
) -> AppResult<u64> {
    let cart = till.cart.snapshot();
    if cart.is_empty() {
        return Err(CoreError::EmptyCart.into());
    }

    let profile = till.receipt_profile().await?;
    if profile.printer.is_none() {
        return Err(PrintError::NoPrinter.into());
    }

    let number = till.next_number().await?;
    let lines = cart.lines();
    let customer = customer.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
    let ticket = Ticket {
        number,
        date: Utc::now(),
        customer: customer.as_deref(),
        lines: &lines,
    };

    print_kitchen_ticket(printer, &profile, &ticket).await?;
    info!(number, lines = lines.len(), "Sent to kitchen");
    Ok(number)
}
