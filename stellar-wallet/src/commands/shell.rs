//! Interactive command loop
//!
//! Reads one line at a time, splits it with shell quoting rules and runs the
//! matching command against the session's account. Commands run strictly one
//! after the other.

use anyhow::Result;
use std::io::{self, Write};
use tracing::debug;

use crate::horizon::{HorizonClient, DEFAULT_HISTORY_LIMIT};
use crate::session::Session;

use super::{account, balance, fund, history, print_error, send, Prompter};

/// Shown before every command line
pub const PROMPT: &str = "> ";

/// Name, arguments and description of every command
const COMMANDS: &[(&str, &str, &str)] = &[
    ("current_account", "", "Show the account used by this session"),
    ("get_account_balances", "", "Show all balances of the account"),
    ("xlm_balance", "", "Show the XLM balance"),
    ("token_balance", "<token>", "Show the balance of a token"),
    ("get_account_payments", "[limit]", "Show recent payments"),
    ("get_account_transactions", "[limit]", "Show recent transactions"),
    ("request_funds", "", "Ask Friendbot to fund the account (testnet only, once)"),
    ("send_xlm_payment", "<destination> <amount> [memo]", "Send XLM"),
    (
        "send_token_payment",
        "<destination> <token[:issuer]> <amount> [memo]",
        "Send a token (issuer defaults to this account)",
    ),
    ("send_donation", "<amount> [memo]", "Donate XLM to the wallet's developers"),
    (
        "establish_trustline",
        "<issuer> <token> <limit> [memo]",
        "Trust a token issued by another account",
    ),
    (
        "create_new_account",
        "<address> <amount> [memo]",
        "Create and fund a new account",
    ),
    ("help", "[command]", "List commands"),
    ("cls", "", "Clear the screen"),
    ("quit", "", "Leave the wallet"),
];

/// What the loop does after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// The command loop, bound to one session
pub struct Shell<P: Prompter> {
    session: Session,
    gateway: HorizonClient,
    prompter: P,
}

impl<P: Prompter> Shell<P> {
    pub fn new(session: Session, gateway: HorizonClient, prompter: P) -> Self {
        Self {
            session,
            gateway,
            prompter,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    /// Read and run commands until `quit` or end of input
    pub async fn run(&mut self) -> Result<()> {
        loop {
            let Some(line) = self.prompter.line(PROMPT)? else {
                println!();
                quit();
                return Ok(());
            };

            if self.execute(&line).await? == Flow::Quit {
                return Ok(());
            }
        }
    }

    /// Run a single command line
    pub async fn execute(&mut self, line: &str) -> Result<Flow> {
        let Some(words) = shlex::split(line) else {
            print_error("Unbalanced quotes in command line");
            return Ok(Flow::Continue);
        };
        let Some((command, args)) = words.split_first() else {
            return Ok(Flow::Continue);
        };
        debug!("Running command {}", command);

        let address = self.session.address().to_string();
        match command.as_str() {
            "current_account" => account::run(&self.session),
            "get_account_balances" => balance::run(&self.gateway, &address).await,
            "xlm_balance" => balance::native(&self.gateway, &address).await,
            "token_balance" => match args.first() {
                Some(code) => balance::asset(&self.gateway, &address, code).await,
                None => {
                    print_error("A token name is mandatory");
                    println!("Usage: token_balance <token>");
                }
            },
            "get_account_payments" => {
                if let Some(limit) = limit_arg(args) {
                    history::payments(&self.gateway, &address, limit).await;
                }
            }
            "get_account_transactions" => {
                if let Some(limit) = limit_arg(args) {
                    history::transactions(&self.gateway, &address, limit).await;
                }
            }
            "request_funds" => {
                fund::run(&self.gateway, &address).await;
            }
            "send_xlm_payment" => {
                send::xlm_payment(&mut self.session, &self.gateway, &mut self.prompter, args)
                    .await?
            }
            "send_token_payment" => {
                send::token_payment(&mut self.session, &self.gateway, &mut self.prompter, args)
                    .await?
            }
            "send_donation" => {
                send::donation(&mut self.session, &self.gateway, &mut self.prompter, args).await?
            }
            "establish_trustline" => {
                send::trustline(&mut self.session, &self.gateway, &mut self.prompter, args)
                    .await?
            }
            "create_new_account" => {
                send::create_account(&mut self.session, &self.gateway, &mut self.prompter, args)
                    .await?
            }
            "help" => help(args.first().map(String::as_str)),
            "cls" => clear_screen()?,
            "quit" => {
                quit();
                return Ok(Flow::Quit);
            }
            other => {
                print_error(&format!("Unknown command: {}", other));
                println!("Type 'help' to list the available commands.");
            }
        }

        Ok(Flow::Continue)
    }
}

/// Say goodbye; shared by `quit`, end of input and Ctrl-C
pub fn quit() {
    println!("Quitting.");
}

fn help(command: Option<&str>) {
    if let Some(name) = command {
        match COMMANDS.iter().find(|(n, _, _)| *n == name) {
            Some((name, args, about)) => {
                println!("{}", about);
                println!("Usage: {} {}", name, args);
            }
            None => print_error(&format!("Unknown command: {}", name)),
        }
        return;
    }

    println!("Commands:");
    for (name, args, about) in COMMANDS {
        let usage = format!("{} {}", name, args);
        println!("  {:<58} {}", usage.trim_end(), about);
    }
}

fn clear_screen() -> Result<()> {
    print!("\x1b[2J\x1b[H");
    io::stdout().flush()?;
    Ok(())
}

/// Optional history limit, `DEFAULT_HISTORY_LIMIT` when absent
fn limit_arg(args: &[String]) -> Option<u32> {
    let Some(limit) = args.first() else {
        return Some(DEFAULT_HISTORY_LIMIT);
    };

    match limit.parse::<u32>() {
        Ok(limit) if limit > 0 => Some(limit),
        _ => {
            print_error("The limit must be a positive integer value");
            None
        }
    }
}
