use crate::session::PgPoolConfig;
use clap::{Arg, ArgMatches, Command};
use std::time::Duration;

pub const ARG_DSN: &str = "dsn";
pub const ARG_DB_MAX_CONNECTIONS: &str = "db-max-connections";
pub const ARG_DB_MIN_CONNECTIONS: &str = "db-min-connections";
pub const ARG_DB_MAX_LIFETIME_SECONDS: &str = "db-max-lifetime-seconds";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_SESSION_SWEEP_SECONDS: &str = "session-sweep-seconds";

#[derive(Debug, Clone)]
pub struct Options {
    /// `None` runs without a session store.
    pub dsn: Option<String>,
    pub pool: PgPoolConfig,
    pub session_ttl: Duration,
    pub sweep_interval: Duration,
}

impl Options {
    /// Parse database and session arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the pool bounds are inconsistent or the TTL is zero.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let read_u32 = |id: &str| matches.get_one::<u32>(id).copied().unwrap_or_default();
        let read_secs =
            |id: &str| Duration::from_secs(matches.get_one::<u64>(id).copied().unwrap_or_default());

        let pool = PgPoolConfig {
            max_connections: read_u32(ARG_DB_MAX_CONNECTIONS),
            min_connections: read_u32(ARG_DB_MIN_CONNECTIONS),
            max_lifetime: read_secs(ARG_DB_MAX_LIFETIME_SECONDS),
        };
        if pool.max_connections == 0 || pool.min_connections > pool.max_connections {
            anyhow::bail!(
                "invalid pool bounds: --{ARG_DB_MIN_CONNECTIONS} {} --{ARG_DB_MAX_CONNECTIONS} {}",
                pool.min_connections,
                pool.max_connections
            );
        }

        let session_ttl = read_secs(ARG_SESSION_TTL_SECONDS);
        if session_ttl.is_zero() {
            anyhow::bail!("--{ARG_SESSION_TTL_SECONDS} must be greater than 0");
        }

        Ok(Self {
            dsn: matches
                .get_one::<String>(ARG_DSN)
                .cloned()
                .filter(|v| !v.trim().is_empty()),
            pool,
            session_ttl,
            sweep_interval: read_secs(ARG_SESSION_SWEEP_SECONDS),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long(ARG_DSN)
                .help("Database connection string")
                .long_help(
                    "Postgres connection string for the session store. Without it sessions are not persisted and multi-step logins cannot complete.",
                )
                .env("SFTPGO_HOOKS_DSN"),
        )
        .arg(
            Arg::new(ARG_DB_MAX_CONNECTIONS)
                .long(ARG_DB_MAX_CONNECTIONS)
                .help("Maximum open database connections")
                .default_value("25")
                .env("SFTPGO_HOOKS_DB_MAX_CONNECTIONS")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_DB_MIN_CONNECTIONS)
                .long(ARG_DB_MIN_CONNECTIONS)
                .help("Idle database connections kept open")
                .default_value("5")
                .env("SFTPGO_HOOKS_DB_MIN_CONNECTIONS")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_DB_MAX_LIFETIME_SECONDS)
                .long(ARG_DB_MAX_LIFETIME_SECONDS)
                .help("Maximum lifetime of a database connection in seconds")
                .default_value("300")
                .env("SFTPGO_HOOKS_DB_MAX_LIFETIME_SECONDS")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Seconds a login session is retained after its last step")
                .default_value("900")
                .env("SFTPGO_HOOKS_SESSION_TTL_SECONDS")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_SESSION_SWEEP_SECONDS)
                .long(ARG_SESSION_SWEEP_SECONDS)
                .help("Interval in seconds between expired session purges, 0 disables")
                .default_value("300")
                .env("SFTPGO_HOOKS_SESSION_SWEEP_SECONDS")
                .value_parser(clap::value_parser!(u64)),
        )
}
