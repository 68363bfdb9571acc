//! Account selection at startup

use anyhow::{Context, Result};

use crate::session::Session;
use crate::storage::ConfigStore;

use super::{print_error, print_success, prompt_int, Prompter};

/// Pick the account for this session.
///
/// Lists the accounts of the config file and offers to reuse one. Otherwise
/// offers to create a new account, which is written to the config file right
/// away. `None` when the user declines or gives an index out of range.
pub fn select_account<P: Prompter>(store: ConfigStore, prompter: &mut P) -> Result<Option<Session>> {
    let records = store.load();

    if !records.is_empty() {
        println!(
            "The following {} Stellar accounts were found on the configuration file:",
            records.len()
        );
        for (i, record) in records.iter().enumerate() {
            println!("[{}] {}", i + 1, record);
        }
        println!();

        if prompter.confirm("Do you want to use an existing account?")? {
            let Some(index) =
                prompt_int(prompter, "Which account do you want to use? (specify the index): ")?
            else {
                return Ok(None);
            };

            let session = usize::try_from(index)
                .ok()
                .and_then(|index| index.checked_sub(1))
                .and_then(|active| Session::new(store, records, active));
            if session.is_none() {
                print_error("Specified account index is invalid");
            }
            return Ok(session);
        }
    }

    if !prompter.confirm("Do you wish to add a new Stellar account?")? {
        return Ok(None);
    }

    let default_name = format!("Account {}", records.len() + 1);
    let name = prompter
        .line("What is the name of the account? (If no name is specified a default one will be used): ")?
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or(default_name);

    let session = Session::create(store, records, &name).context("Failed to save the new account")?;

    println!();
    print_success("New account created!");
    println!("  {}", session.account());
    println!(
        "Saved configuration file in: {}",
        session.store().path().display()
    );

    Ok(Some(session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::Script;
    use crate::keys::is_valid_address;
    use crate::storage::AccountRecord;
    use tempfile::TempDir;

    const ADDRESS_1: &str = "GB3I37MLME4LC5LVAKRTKSKE2K7X5VR4MEBVG3EVHMB2C6V6J5A3XC6L";
    const ADDRESS_2: &str = "GA6S6WSZVDBJQFEGYPZO7D5HWQINTIOSCKR5PAJRGZ4ZI2H7HED6V5RX";

    fn store_with_two_accounts(dir: &TempDir) -> ConfigStore {
        let store = ConfigStore::new(dir.path().join("wallet.config"));
        store
            .save(&[
                AccountRecord::new("first", ADDRESS_1, None),
                AccountRecord::new("second", ADDRESS_2, None),
            ])
            .unwrap();
        store
    }

    #[test]
    fn test_empty_config_decline() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::new(temp_dir.path().join("wallet.config"));

        let mut script = Script::new(&["n"]);
        let session = select_account(store.clone(), &mut script).unwrap();
        assert!(session.is_none());
        assert!(!store.exists());
        assert_eq!(script.asked, vec!["Do you wish to add a new Stellar account? [y/N]: "]);
    }

    #[test]
    fn test_empty_config_create_default_name() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::new(temp_dir.path().join("wallet.config"));

        let session = select_account(store.clone(), &mut Script::new(&["y", ""]))
            .unwrap()
            .unwrap();
        assert_eq!(session.account().name, "Account 1");
        assert!(is_valid_address(Some(session.address())));
        assert_eq!(store.load().len(), 1);
    }

    #[test]
    fn test_pick_existing_account() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_with_two_accounts(&temp_dir);

        let mut script = Script::new(&["y", "two", "2"]);
        let session = select_account(store, &mut script).unwrap().unwrap();
        assert_eq!(session.account().name, "second");
        assert_eq!(session.address(), ADDRESS_2);
        // A non-integer index is asked again
        assert_eq!(
            script.asked,
            vec![
                "Do you want to use an existing account? [y/N]: ",
                "Which account do you want to use? (specify the index): ",
                "Which account do you want to use? (specify the index): ",
            ]
        );
    }

    #[test]
    fn test_index_out_of_range_aborts() {
        let temp_dir = TempDir::new().unwrap();

        for index in ["0", "3", "-1"] {
            let store = store_with_two_accounts(&temp_dir);
            let session = select_account(store, &mut Script::new(&["y", index])).unwrap();
            assert!(session.is_none(), "index {} should be rejected", index);
        }
    }

    #[test]
    fn test_add_account_next_to_existing() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_with_two_accounts(&temp_dir);

        let session = select_account(store.clone(), &mut Script::new(&["n", "y", "savings"]))
            .unwrap()
            .unwrap();
        assert_eq!(session.account().name, "savings");

        let on_disk = store.load();
        assert_eq!(on_disk.len(), 3);
        assert_eq!(on_disk[0].name, "first");
        assert_eq!(on_disk[2].name, "savings");
    }
}
