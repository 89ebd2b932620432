pub mod database;
pub mod entitlement;
pub mod http;
pub mod identity;
pub mod idp;
pub mod logging;
pub mod sftpgo;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    ColorChoice, Command,
};

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("sftpgo-hooks")
        .about("SFTPGo authentication and pre-login hooks")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles);

    let command = http::with_args(command);
    let command = database::with_args(command);
    let command = identity::with_args(command);
    let command = idp::with_args(command);
    let command = sftpgo::with_args(command);
    let command = entitlement::with_args(command);
    logging::with_args(command)
}
