//! Transaction commands
//!
//! Payments, trustlines and account creation all share one flow: resolve the
//! signing keys, validate the request, confirm with the user, submit.

use anyhow::Result;

use crate::horizon::{HorizonClient, SubmitOutcome};
use crate::session::Session;
use crate::transaction::{parse_amount, AssetSpec, OperationRequest};

use super::{is_float_str, is_int_str, print_error, print_success, resolve_seed, Prompter};

/// Receives `send_donation` payments
pub const DONATION_ADDRESS: &str = "GBLHVU7EJMSUW72PINTRBRIHT55ZQ7HXFAXELG2JG53X4VAZSHZKLEY6";

/// Sign and submit `request` for the active account.
///
/// Returns the outcome when the transaction was accepted. Every other ending
/// (no usable seed, invalid request, declined, rejected) has already been
/// reported to the user and yields `None`.
pub async fn submit_operation<P: Prompter>(
    session: &mut Session,
    gateway: &HorizonClient,
    prompter: &mut P,
    request: OperationRequest,
) -> Result<Option<SubmitOutcome>> {
    let Some(keys) = resolve_seed(session, prompter)? else {
        return Ok(None);
    };

    if let Err(e) = request.validate(session.address()) {
        print_error(&e.to_string());
        return Ok(None);
    }

    println!();
    if !prompter.confirm(&request.confirmation_message())? {
        println!("Aborted.");
        return Ok(None);
    }

    println!();
    println!("Submitting transaction...");

    match gateway.submit(&keys, &request).await {
        Ok(outcome) => {
            println!();
            print_success("Transaction sent!");
            for line in outcome_lines(&outcome) {
                println!("{}", line);
            }
            Ok(Some(outcome))
        }
        Err(e) => {
            print_error(&e.to_string());
            Ok(None)
        }
    }
}

/// Details printed for an accepted transaction
fn outcome_lines(outcome: &SubmitOutcome) -> Vec<String> {
    let mut lines = vec![format!("Transaction hash: {}", outcome.hash)];
    if let Some(ledger) = outcome.ledger {
        lines.push(format!("Ledger: {}", ledger));
    }
    if let Some(code) = &outcome.result_code {
        lines.push(format!("Result: {}", code));
    }
    lines
}

/// Run the send_xlm_payment command
pub async fn xlm_payment<P: Prompter>(
    session: &mut Session,
    gateway: &HorizonClient,
    prompter: &mut P,
    args: &[String],
) -> Result<()> {
    let [destination, amount, rest @ ..] = args else {
        print_error("A destination address and a transfer amount are mandatory");
        println!("Usage: send_xlm_payment <destination_address> <amount> [memo]");
        return Ok(());
    };
    let Some(amount) = amount_arg(amount) else {
        return Ok(());
    };

    let request = OperationRequest::Payment {
        destination: destination.clone(),
        asset: AssetSpec::Native,
        amount,
        memo: memo_arg(rest),
    };
    submit_operation(session, gateway, prompter, request).await?;
    Ok(())
}

/// Run the send_token_payment command.
///
/// The token is `CODE` or `CODE:ISSUER`; without an issuer the current
/// account is assumed to be the issuer.
pub async fn token_payment<P: Prompter>(
    session: &mut Session,
    gateway: &HorizonClient,
    prompter: &mut P,
    args: &[String],
) -> Result<()> {
    let [destination, token, amount, rest @ ..] = args else {
        print_error("A destination address, token name and a transfer amount are mandatory");
        println!("Usage: send_token_payment <destination_address> <token[:issuer]> <amount> [memo]");
        return Ok(());
    };
    let Some(amount) = amount_arg(amount) else {
        return Ok(());
    };

    let asset = token_arg(token, session.address());
    let request = OperationRequest::Payment {
        destination: destination.clone(),
        asset,
        amount,
        memo: memo_arg(rest),
    };
    submit_operation(session, gateway, prompter, request).await?;
    Ok(())
}

/// Run the send_donation command
pub async fn donation<P: Prompter>(
    session: &mut Session,
    gateway: &HorizonClient,
    prompter: &mut P,
    args: &[String],
) -> Result<()> {
    let [amount, rest @ ..] = args else {
        print_error("A XLM amount is mandatory");
        println!("Usage: send_donation <amount> [memo]");
        return Ok(());
    };
    let Some(amount) = amount_arg(amount) else {
        return Ok(());
    };

    let request = OperationRequest::Payment {
        destination: DONATION_ADDRESS.to_string(),
        asset: AssetSpec::Native,
        amount,
        memo: memo_arg(rest),
    };
    submit_operation(session, gateway, prompter, request).await?;
    Ok(())
}

/// Run the establish_trustline command
pub async fn trustline<P: Prompter>(
    session: &mut Session,
    gateway: &HorizonClient,
    prompter: &mut P,
    args: &[String],
) -> Result<()> {
    let [issuer, code, limit, rest @ ..] = args else {
        print_error("An issuer address, token name and token limit are mandatory");
        println!("Usage: establish_trustline <issuer_address> <token_name> <token_limit> [memo]");
        return Ok(());
    };
    if !is_int_str(limit) {
        print_error("The token limit must be a valid integer value");
        return Ok(());
    }
    let limit = match parse_amount(limit) {
        Ok(limit) => limit,
        Err(e) => {
            print_error(&format!("Invalid token limit: {}", e));
            return Ok(());
        }
    };

    let request = OperationRequest::Trustline {
        issuer: issuer.clone(),
        code: code.clone(),
        limit,
        memo: memo_arg(rest),
    };
    submit_operation(session, gateway, prompter, request).await?;
    Ok(())
}

/// Run the create_new_account command
pub async fn create_account<P: Prompter>(
    session: &mut Session,
    gateway: &HorizonClient,
    prompter: &mut P,
    args: &[String],
) -> Result<()> {
    let [destination, amount, rest @ ..] = args else {
        print_error("An account address and a starting balance are mandatory");
        println!("Usage: create_new_account <account_address> <amount> [memo]");
        return Ok(());
    };
    let Some(starting_balance) = amount_arg(amount) else {
        return Ok(());
    };

    let request = OperationRequest::CreateAccount {
        destination: destination.clone(),
        starting_balance,
        memo: memo_arg(rest),
    };
    submit_operation(session, gateway, prompter, request).await?;
    Ok(())
}

/// Parse an amount argument, reporting what is wrong with it
fn amount_arg(input: &str) -> Option<i64> {
    if !is_float_str(input) {
        print_error("The transfer amount must be a valid value");
        return None;
    }

    match parse_amount(input) {
        Ok(amount) => Some(amount),
        Err(e) => {
            print_error(&format!("Invalid amount: {}", e));
            None
        }
    }
}

/// `CODE` or `CODE:ISSUER`
fn token_arg(token: &str, default_issuer: &str) -> AssetSpec {
    match token.split_once(':') {
        Some((code, issuer)) => AssetSpec::credit(code, issuer),
        None => AssetSpec::credit(token, default_issuer),
    }
}

/// Optional trailing memo, empty when absent
fn memo_arg(rest: &[String]) -> String {
    rest.first().cloned().unwrap_or_default()
}
