//! Friendbot funding command

use crate::horizon::{FundResult, HorizonClient};

use super::{print_error, print_success};

/// Run the request_funds command
pub async fn run(gateway: &HorizonClient, address: &str) -> FundResult {
    println!("Requesting funds from Friendbot...");

    let result = gateway.fund_via_friendbot(address).await;
    match result {
        FundResult::Funded => print_success(&format!("Friendbot funding result: {}", result)),
        _ => print_error(&format!("Friendbot funding result: {}", result)),
    }
    result
}
