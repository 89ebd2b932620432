use crate::entitlement::UrlTemplate;
use clap::{Arg, ArgMatches, Command};

pub const ARG_SUBSCRIPTION_API: &str = "subscription-api";
pub const ARG_PROJECT_API: &str = "project-api";

#[derive(Debug, Clone)]
pub struct Options {
    pub subscription_api: UrlTemplate,
    pub project_api: UrlTemplate,
}

impl Options {
    /// Parse subscription service URL templates from matches.
    ///
    /// # Errors
    /// Returns an error if a template is missing or has no `%s` placeholder.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let read_template = |id: &str| -> anyhow::Result<UrlTemplate> {
            let value = matches
                .get_one::<String>(id)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))?;
            UrlTemplate::parse(value).map_err(|err| anyhow::anyhow!("invalid --{id}: {err}"))
        };

        Ok(Self {
            subscription_api: read_template(ARG_SUBSCRIPTION_API)?,
            project_api: read_template(ARG_PROJECT_API)?,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SUBSCRIPTION_API)
                .long(ARG_SUBSCRIPTION_API)
                .help("Folder list URL, %s is replaced by the username")
                .env("SFTPGO_HOOKS_SUBSCRIPTION_API")
                .required(true),
        )
        .arg(
            Arg::new(ARG_PROJECT_API)
                .long(ARG_PROJECT_API)
                .help("Project key validation URL, %s is replaced by the key")
                .env("SFTPGO_HOOKS_PROJECT_API")
                .required(true),
        )
}
