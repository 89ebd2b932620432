use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_INTERNAL_IDP_BASE_URL: &str = "internal-idp-base-url";
pub const ARG_INTERNAL_CLIENT_ID: &str = "internal-client-id";
pub const ARG_INTERNAL_CLIENT_SECRET: &str = "internal-client-secret";
pub const ARG_EXTERNAL_IDP_BASE_URL: &str = "external-idp-base-url";
pub const ARG_EXTERNAL_CLIENT_ID: &str = "external-client-id";
pub const ARG_EXTERNAL_CLIENT_SECRET: &str = "external-client-secret";
pub const ARG_OAUTH_CALLBACK_URL: &str = "oauth-callback-url";
pub const ARG_SCIM_SCOPE: &str = "scim-scope";

/// Tenant base URL and client credentials.
#[derive(Debug, Clone)]
pub struct Tenant {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: SecretString,
}

#[derive(Debug, Clone)]
pub struct Options {
    pub internal: Tenant,
    pub external: Option<Tenant>,
    pub callback_url: String,
    pub scim_scope: String,
}

impl Options {
    /// Parse identity provider arguments from matches.
    ///
    /// # Errors
    /// Returns an error if required arguments are missing or the external
    /// tenant is only partially configured.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let read = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };
        let read_required = |id: &str| -> anyhow::Result<String> {
            read(id).ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };

        let internal = Tenant {
            base_url: read_required(ARG_INTERNAL_IDP_BASE_URL)?,
            client_id: read_required(ARG_INTERNAL_CLIENT_ID)?,
            client_secret: SecretString::from(read_required(ARG_INTERNAL_CLIENT_SECRET)?),
        };

        let external = match (
            read(ARG_EXTERNAL_IDP_BASE_URL),
            read(ARG_EXTERNAL_CLIENT_ID),
            read(ARG_EXTERNAL_CLIENT_SECRET),
        ) {
            (Some(base_url), Some(client_id), Some(client_secret)) => Some(Tenant {
                base_url,
                client_id,
                client_secret: SecretString::from(client_secret),
            }),
            (None, None, None) => None,
            _ => anyhow::bail!(
                "external organization requires --{ARG_EXTERNAL_IDP_BASE_URL}, --{ARG_EXTERNAL_CLIENT_ID} and --{ARG_EXTERNAL_CLIENT_SECRET}"
            ),
        };

        Ok(Self {
            internal,
            external,
            callback_url: read_required(ARG_OAUTH_CALLBACK_URL)?,
            scim_scope: read_required(ARG_SCIM_SCOPE)?,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_INTERNAL_IDP_BASE_URL)
                .long(ARG_INTERNAL_IDP_BASE_URL)
                .help("Base URL of the internal organization's IdP tenant")
                .env("SFTPGO_HOOKS_INTERNAL_IDP_BASE_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_INTERNAL_CLIENT_ID)
                .long(ARG_INTERNAL_CLIENT_ID)
                .help("OAuth2 client id of the internal organization")
                .env("SFTPGO_HOOKS_INTERNAL_CLIENT_ID")
                .required(true),
        )
        .arg(
            Arg::new(ARG_INTERNAL_CLIENT_SECRET)
                .long(ARG_INTERNAL_CLIENT_SECRET)
                .help("OAuth2 client secret of the internal organization")
                .env("SFTPGO_HOOKS_INTERNAL_CLIENT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_EXTERNAL_IDP_BASE_URL)
                .long(ARG_EXTERNAL_IDP_BASE_URL)
                .help("Base URL of the external organization's IdP tenant")
                .env("SFTPGO_HOOKS_EXTERNAL_IDP_BASE_URL"),
        )
        .arg(
            Arg::new(ARG_EXTERNAL_CLIENT_ID)
                .long(ARG_EXTERNAL_CLIENT_ID)
                .help("OAuth2 client id of the external organization")
                .env("SFTPGO_HOOKS_EXTERNAL_CLIENT_ID"),
        )
        .arg(
            Arg::new(ARG_EXTERNAL_CLIENT_SECRET)
                .long(ARG_EXTERNAL_CLIENT_SECRET)
                .help("OAuth2 client secret of the external organization")
                .env("SFTPGO_HOOKS_EXTERNAL_CLIENT_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_OAUTH_CALLBACK_URL)
                .long(ARG_OAUTH_CALLBACK_URL)
                .help("Redirect URI registered for the flow-initiation request")
                .env("SFTPGO_HOOKS_OAUTH_CALLBACK_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_SCIM_SCOPE)
                .long(ARG_SCIM_SCOPE)
                .help("OAuth2 scope requested for directory lookups")
                .env("SFTPGO_HOOKS_SCIM_SCOPE")
                .required(true),
        )
}
