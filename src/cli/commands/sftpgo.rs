use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_SFTPGO_API_BASE: &str = "sftpgo-api-base";
pub const ARG_SFTPGO_ADMIN_USER: &str = "sftpgo-admin-user";
pub const ARG_SFTPGO_ADMIN_KEY: &str = "sftpgo-admin-key";
pub const ARG_FOLDER_PATH: &str = "folder-path";
pub const ARG_HOME_DIR_PATH: &str = "home-dir-path";

#[derive(Debug, Clone)]
pub struct Options {
    pub api_base: String,
    pub admin_user: String,
    pub admin_key: SecretString,
    pub folder_path: String,
    pub home_dir_path: String,
}

impl Options {
    /// Parse SFTPGo admin API and filesystem layout arguments from matches.
    ///
    /// # Errors
    /// Returns an error if required arguments are missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let read_required = |id: &str| -> anyhow::Result<String> {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };

        Ok(Self {
            api_base: read_required(ARG_SFTPGO_API_BASE)?,
            admin_user: read_required(ARG_SFTPGO_ADMIN_USER)?,
            admin_key: SecretString::from(read_required(ARG_SFTPGO_ADMIN_KEY)?),
            folder_path: read_required(ARG_FOLDER_PATH)?,
            home_dir_path: read_required(ARG_HOME_DIR_PATH)?,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SFTPGO_API_BASE)
                .long(ARG_SFTPGO_API_BASE)
                .help("SFTPGo admin REST API base, example: http://sftpgo:8080/api/v2/")
                .env("SFTPGO_HOOKS_SFTPGO_API_BASE")
                .required(true),
        )
        .arg(
            Arg::new(ARG_SFTPGO_ADMIN_USER)
                .long(ARG_SFTPGO_ADMIN_USER)
                .help("SFTPGo admin username")
                .env("SFTPGO_HOOKS_SFTPGO_ADMIN_USER")
                .required(true),
        )
        .arg(
            Arg::new(ARG_SFTPGO_ADMIN_KEY)
                .long(ARG_SFTPGO_ADMIN_KEY)
                .help("SFTPGo admin password")
                .env("SFTPGO_HOOKS_SFTPGO_ADMIN_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_FOLDER_PATH)
                .long(ARG_FOLDER_PATH)
                .help("Backing directory of provisioned virtual folders")
                .env("SFTPGO_HOOKS_FOLDER_PATH")
                .required(true),
        )
        .arg(
            Arg::new(ARG_HOME_DIR_PATH)
                .long(ARG_HOME_DIR_PATH)
                .help("Root of user home directories")
                .env("SFTPGO_HOOKS_HOME_DIR_PATH")
                .required(true),
        )
}
