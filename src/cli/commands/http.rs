use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use std::time::Duration;

pub const ARG_PORT: &str = "port";
pub const ARG_API_KEY: &str = "api-key";
pub const ARG_HTTP_TIMEOUT_SECONDS: &str = "http-timeout-seconds";
pub const ARG_REQUEST_TIMEOUT_SECONDS: &str = "request-timeout-seconds";

#[derive(Debug, Clone)]
pub struct Options {
    pub port: u16,
    pub api_key: Option<SecretString>,
    /// Timeout of calls to the IdP, SFTPGo and the subscription service.
    pub outbound_timeout: Duration,
    pub request_timeout: Duration,
}

impl Options {
    /// Parse listener and timeout arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a timeout is zero.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let read_secs = |id: &str| -> anyhow::Result<Duration> {
            let secs = matches.get_one::<u64>(id).copied().unwrap_or_default();
            if secs == 0 {
                anyhow::bail!("--{id} must be greater than 0");
            }
            Ok(Duration::from_secs(secs))
        };

        Ok(Self {
            port: matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(9090),
            api_key: matches
                .get_one::<String>(ARG_API_KEY)
                .filter(|v| !v.is_empty())
                .map(|v| SecretString::from(v.clone())),
            outbound_timeout: read_secs(ARG_HTTP_TIMEOUT_SECONDS)?,
            request_timeout: read_secs(ARG_REQUEST_TIMEOUT_SECONDS)?,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("9090")
                .env("SFTPGO_HOOKS_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_API_KEY)
                .long(ARG_API_KEY)
                .help("Shared secret expected in the API-Key header of hook requests")
                .env("SFTPGO_HOOKS_API_KEY")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_HTTP_TIMEOUT_SECONDS)
                .long(ARG_HTTP_TIMEOUT_SECONDS)
                .help("Timeout in seconds for outbound HTTP calls")
                .default_value("15")
                .env("SFTPGO_HOOKS_HTTP_TIMEOUT_SECONDS")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_REQUEST_TIMEOUT_SECONDS)
                .long(ARG_REQUEST_TIMEOUT_SECONDS)
                .help("Timeout in seconds for handling an inbound hook request")
                .default_value("10")
                .env("SFTPGO_HOOKS_REQUEST_TIMEOUT_SECONDS")
                .value_parser(clap::value_parser!(u64)),
        )
}
