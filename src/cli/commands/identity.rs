use clap::{Arg, ArgMatches, Command};

pub const ARG_INTERNAL_USER_SUFFIX: &str = "internal-user-suffix";
pub const ARG_CHECK_ROLE: &str = "check-role";

#[derive(Debug, Clone)]
pub struct Options {
    pub internal_user_suffix: String,
    pub check_role: String,
}

impl Options {
    /// Parse identity classification arguments from matches.
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
            internal_user_suffix: read_required(ARG_INTERNAL_USER_SUFFIX)?,
            check_role: read_required(ARG_CHECK_ROLE)?,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_INTERNAL_USER_SUFFIX)
                .long(ARG_INTERNAL_USER_SUFFIX)
                .help("Username suffix of the internal organization")
                .default_value("@wso2.com")
                .env("SFTPGO_HOOKS_INTERNAL_USER_SUFFIX"),
        )
        .arg(
            Arg::new(ARG_CHECK_ROLE)
                .long(ARG_CHECK_ROLE)
                .help("Role display name granting project-key access to internal users")
                .env("SFTPGO_HOOKS_CHECK_ROLE")
                .required(true),
        )
}
