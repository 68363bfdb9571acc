//! CLI Commands
//!
//! Implementation of the interactive shell and its commands.
//!
//! All user interaction goes through [`Prompter`], so the flows below can be
//! driven by a script in tests.

pub mod account;
pub mod balance;
pub mod fund;
pub mod history;
pub mod init;
pub mod send;
pub mod shell;
pub mod tty;

#[cfg(test)]
pub(crate) mod testing;

use anyhow::Result;
use std::io::{self, BufRead, Write};
use zeroize::Zeroizing;

use crate::keys::StellarKeys;
use crate::session::{CredentialError, Session};

/// Source of user input.
///
/// `None` from `line` or `secret` means the input is exhausted (end of file).
pub trait Prompter {
    /// Read one line, without its trailing newline
    fn line(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Read a secret without echoing it
    fn secret(&mut self, prompt: &str) -> Result<Option<Zeroizing<String>>>;

    /// Ask a yes/no question; anything but "y" or "yes" is a no
    fn confirm(&mut self, message: &str) -> Result<bool> {
        let answer = self.line(&format!("{} [y/N]: ", message))?;
        Ok(answer.is_some_and(|input| {
            input.trim().eq_ignore_ascii_case("y") || input.trim().eq_ignore_ascii_case("yes")
        }))
    }
}

/// Prompter reading from the controlling terminal
#[derive(Debug, Default)]
pub struct Terminal;

impl Prompter for Terminal {
    fn line(&mut self, prompt: &str) -> Result<Option<String>> {
        print!("{}", prompt);
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().lock().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        Ok(Some(input.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn secret(&mut self, prompt: &str) -> Result<Option<Zeroizing<String>>> {
        print!("{}", prompt);
        io::stdout().flush()?;

        tty::save();
        let secret = rpassword::read_password();
        tty::clear();
        Ok(Some(Zeroizing::new(secret?)))
    }
}

/// Ask for an integer until one is given. `None` at end of input.
pub fn prompt_int<P: Prompter>(prompter: &mut P, prompt: &str) -> Result<Option<i64>> {
    loop {
        let Some(input) = prompter.line(prompt)? else {
            return Ok(None);
        };
        match input.trim().parse() {
            Ok(value) => return Ok(Some(value)),
            Err(_) => print_error("Input must be a valid integer value"),
        }
    }
}

/// Keys that can sign for the active account.
///
/// Uses the stored seed when it is usable. Otherwise explains why, asks for
/// the seed once and offers to save it. `None` when no usable seed was given.
pub fn resolve_seed<P: Prompter>(
    session: &mut Session,
    prompter: &mut P,
) -> Result<Option<StellarKeys>> {
    let reason = match session.signing_keys() {
        Ok(keys) => return Ok(Some(keys)),
        Err(reason) => reason,
    };

    match reason {
        CredentialError::Missing => print_warning("No secret seed is stored for this account."),
        CredentialError::Invalid => print_warning("The stored secret seed is invalid."),
        CredentialError::Mismatch => {
            print_warning("The stored secret seed does not match the account address.")
        }
    }
    println!("No transaction can be made without a valid secret seed.");

    let Some(seed) = prompter.secret("Secret seed: ")? else {
        return Ok(None);
    };
    let seed = Zeroizing::new(seed.trim().to_string());

    let keys = match session.accept_seed(&seed, false) {
        Ok(keys) => keys,
        Err(e) => {
            print_error(&e.to_string());
            return Ok(None);
        }
    };

    if prompter.confirm("Do you want to save the secret seed for this account?")? {
        // Already checked above, this only stores it
        if let Err(e) = session.accept_seed(&seed, true) {
            print_error(&e.to_string());
        }
    }

    Ok(Some(keys))
}

/// Check that `input` parses as a decimal number (`,` accepted as separator)
pub fn is_float_str(input: &str) -> bool {
    input.trim().replace(',', ".").parse::<f64>().is_ok()
}

/// Check that `input` parses as an integer
pub fn is_int_str(input: &str) -> bool {
    input.trim().parse::<i64>().is_ok()
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("\x1b[31mError:\x1b[0m {}", message);
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("\x1b[32m{}\x1b[0m", message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("\x1b[33mWarning:\x1b[0m {}", message);
}

#[cfg(test)]
mod tests {
    use super::testing::Script;
    use super::*;
    use crate::storage::{AccountRecord, ConfigStore};
    use tempfile::TempDir;

    const ADDRESS_1: &str = "GB3I37MLME4LC5LVAKRTKSKE2K7X5VR4MEBVG3EVHMB2C6V6J5A3XC6L";
    const SEED_1: &str = "SADGEOC6FE5KQJMC7O65HNURFZTB6SLJDM5JB665NSWOGVBEGRRGC3KK";
    const SEED_2: &str = "SDNYPEIU5OOKMPZESV3S7NCJDF32UCUTPTXOOXWYWAGOQVKRCSEPC7PR";

    fn watch_only_session(dir: &TempDir) -> Session {
        let store = ConfigStore::new(dir.path().join("wallet.config"));
        let records = vec![AccountRecord::new("main", ADDRESS_1, None)];
        store.save(&records).unwrap();
        Session::new(store, records, 0).unwrap()
    }

    #[test]
    fn test_is_float_str() {
        assert!(is_float_str("1"));
        assert!(is_float_str("1.5"));
        assert!(is_float_str("1,5"));
        assert!(is_float_str(" 2 "));
        assert!(!is_float_str("one"));
        assert!(!is_float_str(""));
    }

    #[test]
    fn test_is_int_str() {
        assert!(is_int_str("100"));
        assert!(is_int_str("-3"));
        assert!(!is_int_str("1.5"));
        assert!(!is_int_str("lots"));
    }

    #[test]
    fn test_confirm_answers() {
        let mut script = Script::new(&["y", "YES", "n", "", "maybe"]);
        assert!(script.confirm("?").unwrap());
        assert!(script.confirm("?").unwrap());
        assert!(!script.confirm("?").unwrap());
        assert!(!script.confirm("?").unwrap());
        assert!(!script.confirm("?").unwrap());
        // End of input is a no
        assert!(!script.confirm("?").unwrap());
        assert_eq!(script.asked[0], "? [y/N]: ");
    }

    #[test]
    fn test_prompt_int_reprompts() {
        let mut script = Script::new(&["abc", "1.5", "2"]);
        assert_eq!(prompt_int(&mut script, "Index: ").unwrap(), Some(2));
        assert_eq!(script.asked.len(), 3);

        assert_eq!(prompt_int(&mut script, "Index: ").unwrap(), None);
    }

    #[test]
    fn test_resolve_seed_uses_stored_seed() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::new(temp_dir.path().join("wallet.config"));
        let records = vec![AccountRecord::new("main", ADDRESS_1, Some(SEED_1.to_string()))];
        let mut session = Session::new(store, records, 0).unwrap();
        let mut script = Script::default();

        let keys = resolve_seed(&mut session, &mut script).unwrap().unwrap();
        assert_eq!(keys.address(), ADDRESS_1);
        assert!(script.asked.is_empty());
    }

    #[test]
    fn test_resolve_seed_prompts_and_saves() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = watch_only_session(&temp_dir);
        let mut script = Script::new(&[SEED_1, "y"]);

        let keys = resolve_seed(&mut session, &mut script).unwrap().unwrap();
        assert_eq!(keys.address(), ADDRESS_1);
        assert_eq!(session.store().load()[0].seed.as_deref(), Some(SEED_1));
    }

    #[test]
    fn test_resolve_seed_without_saving() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = watch_only_session(&temp_dir);
        let mut script = Script::new(&[SEED_1, "n"]);

        assert!(resolve_seed(&mut session, &mut script).unwrap().is_some());
        assert_eq!(session.account().seed, None);
        assert_eq!(session.store().load()[0].seed, None);
    }

    #[test]
    fn test_resolve_seed_mismatch_does_not_retry() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = watch_only_session(&temp_dir);
        let mut script = Script::new(&[SEED_2, SEED_1, "y"]);

        assert!(resolve_seed(&mut session, &mut script).unwrap().is_none());
        // Only the seed was asked for
        assert_eq!(script.asked.len(), 1);
        assert_eq!(session.store().load()[0].seed, None);
    }

    #[test]
    fn test_resolve_seed_invalid_and_eof() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = watch_only_session(&temp_dir);

        let mut script = Script::new(&["not a seed"]);
        assert!(resolve_seed(&mut session, &mut script).unwrap().is_none());

        let mut script = Script::default();
        assert!(resolve_seed(&mut session, &mut script).unwrap().is_none());
    }
}
