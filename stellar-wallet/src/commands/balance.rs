//! Balance commands

use crate::horizon::{Balance, HorizonClient, HorizonError};
use crate::transaction::NATIVE_ASSET_CODE;

use super::print_error;

/// Run the get_account_balances command
pub async fn run(gateway: &HorizonClient, address: &str) {
    let balances = match gateway.get_balances(address).await {
        Ok(balances) => balances,
        Err(e) => {
            print_error(&e.to_string());
            println!("No balances could be retrieved");
            return;
        }
    };

    println!("Balances:");
    for balance in &balances {
        match &balance.issuer {
            Some(issuer) => println!("  {}: {} (issuer {})", balance.asset, balance.amount, issuer),
            None => println!("  {}: {}", balance.asset, balance.amount),
        }
    }
}

/// Run the xlm_balance command
pub async fn native(gateway: &HorizonClient, address: &str) {
    asset(gateway, address, NATIVE_ASSET_CODE).await
}

/// Run the token_balance command
pub async fn asset(gateway: &HorizonClient, address: &str, code: &str) {
    match asset_balances(gateway, address, code).await {
        Ok(lines) if lines.is_empty() => println!("{} Balance: 0", code),
        Ok(lines) if lines.len() == 1 => println!("{} Balance: {}", code, lines[0].amount),
        Ok(lines) => {
            // The same code issued by several accounts
            for line in lines {
                println!(
                    "{} Balance: {} (issuer {})",
                    code,
                    line.amount,
                    line.issuer.as_deref().unwrap_or("-")
                );
            }
        }
        Err(e) => print_error(&e.to_string()),
    }
}

/// Balance lines of `address` holding the asset `code`
pub async fn asset_balances(
    gateway: &HorizonClient,
    address: &str,
    code: &str,
) -> Result<Vec<Balance>, HorizonError> {
    let balances = gateway.get_balances(address).await?;
    Ok(balances
        .into_iter()
        .filter(|balance| balance.asset == code)
        .collect())
}
