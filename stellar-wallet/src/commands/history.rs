//! Payment and transaction history commands

use crate::horizon::{HorizonClient, PaymentRecord, TransactionRecord};

use super::print_error;

/// Run the get_account_payments command
pub async fn payments(gateway: &HorizonClient, address: &str, limit: u32) {
    let records = match gateway.payments(address, limit).await {
        Ok(records) => records,
        Err(e) => {
            print_error(&e.to_string());
            println!("No payments could be retrieved");
            return;
        }
    };

    if records.is_empty() {
        println!("No payments yet.");
        return;
    }

    println!("Recent payments ({}):", records.len());
    for record in &records {
        println!("  {}", describe_payment(record, address));
    }
}

/// Run the get_account_transactions command
pub async fn transactions(gateway: &HorizonClient, address: &str, limit: u32) {
    let records = match gateway.transactions(address, limit).await {
        Ok(records) => records,
        Err(e) => {
            print_error(&e.to_string());
            println!("No transactions could be retrieved");
            return;
        }
    };

    if records.is_empty() {
        println!("No transactions yet.");
        return;
    }

    println!("Recent transactions ({}):", records.len());
    println!(
        "  {:<20}  {:<10}  {:>3}  {:<7}  {}",
        "Date", "Ledger", "Ops", "Status", "Hash"
    );
    for record in &records {
        println!("  {}", describe_transaction(record));
    }
}

/// One-line summary of a payment, seen from `address`
fn describe_payment(record: &PaymentRecord, address: &str) -> String {
    match record.kind.as_str() {
        "create_account" => format!(
            "{}  create_account  {} {}  funder {} account {}",
            record.created_at,
            record.starting_balance.as_deref().unwrap_or("?"),
            record.asset(),
            record.funder.as_deref().unwrap_or("?"),
            record.account.as_deref().unwrap_or("?"),
        ),
        kind => {
            let direction = if record.to.as_deref() == Some(address) {
                "received"
            } else {
                "sent"
            };
            format!(
                "{}  {}  {} {} {}  from {} to {}",
                record.created_at,
                kind,
                direction,
                record.amount.as_deref().unwrap_or("?"),
                record.asset(),
                record.from.as_deref().unwrap_or("?"),
                record.to.as_deref().unwrap_or("?"),
            )
        }
    }
}

fn describe_transaction(record: &TransactionRecord) -> String {
    let status = if record.successful { "ok" } else { "failed" };
    let mut line = format!(
        "{:<20}  {:<10}  {:>3}  {:<7}  {}",
        record.created_at, record.ledger, record.operation_count, status, record.hash
    );
    if let Some(memo) = record.memo.as_deref().filter(|m| !m.is_empty()) {
        line.push_str(&format!("  memo: {}", memo));
    }
    line
}
