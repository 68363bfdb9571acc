//! Current account command

use crate::session::Session;

/// Run the current_account command
pub fn run(session: &Session) {
    println!("{}", session.account());
}
