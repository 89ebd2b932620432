//! Map parsed arguments to the action the binary executes.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{database, entitlement, http, identity, idp, sftpgo};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    Ok(Action::Server(Args {
        http: http::Options::parse(matches)?,
        database: database::Options::parse(matches)?,
        identity: identity::Options::parse(matches)?,
        idp: idp::Options::parse(matches)?,
        sftpgo: sftpgo::Options::parse(matches)?,
        entitlement: entitlement::Options::parse(matches)?,
    }))
}
