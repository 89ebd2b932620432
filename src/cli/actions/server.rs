use crate::{
    api::{self, ApiKey, Services},
    authz::{Authorizer, AuthorizerConfig},
    cli::commands::{database, entitlement, http, identity, idp, sftpgo},
    entitlement::{EntitlementResolver, SubscriptionClient},
    handshake::Handshake,
    http_client,
    identity::Classifier,
    idp::{IdentityProvider, IdpClient, OrgContext, OrgContexts},
    session::{self, DisabledSessionStore, PgSessionStore, SessionStore},
    sftpgo::{FolderProvisioner, SftpgoClient},
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct Args {
    pub http: http::Options,
    pub database: database::Options,
    pub identity: identity::Options,
    pub idp: idp::Options,
    pub sftpgo: sftpgo::Options,
    pub entitlement: entitlement::Options,
}

/// Execute the server action.
/// # Errors
/// Returns an error if a client cannot be built, the session store is
/// unreachable, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let Args {
        http,
        database,
        identity,
        idp,
        sftpgo,
        entitlement,
    } = args;

    let client = http_client::build(http.outbound_timeout)?;
    let classifier = Classifier::new(identity.internal_user_suffix);

    let contexts = OrgContexts::new(org_context(idp.internal), idp.external.map(org_context));
    let idp_client: Arc<dyn IdentityProvider> = Arc::new(IdpClient::new(
        client.clone(),
        contexts,
        idp.callback_url,
        idp.scim_scope,
    ));
    let entitlements: Arc<dyn EntitlementResolver> = Arc::new(SubscriptionClient::new(
        client.clone(),
        entitlement.subscription_api,
        entitlement.project_api,
    ));
    let provisioner: Arc<dyn FolderProvisioner> = Arc::new(SftpgoClient::new(
        client,
        &sftpgo.api_base,
        sftpgo.admin_user,
        sftpgo.admin_key,
        sftpgo.folder_path.clone(),
    )?);

    let sessions = session_store(&database).await?;
    session::spawn_sweeper(sessions.clone(), database.sweep_interval);

    let handshake = Handshake::new(classifier.clone(), idp_client.clone(), sessions.clone());
    let authorizer = Authorizer::new(
        classifier,
        idp_client,
        entitlements,
        provisioner,
        AuthorizerConfig {
            check_role: identity.check_role,
            home_root: sftpgo.home_dir_path,
            folder_root: sftpgo.folder_path,
        },
    );

    let app = api::router(
        Services {
            handshake: Arc::new(handshake),
            authorizer: Arc::new(authorizer),
            sessions,
            api_key: ApiKey::new(http.api_key),
        },
        http.request_timeout,
    );

    api::new(http.port, app).await
}

fn org_context(tenant: idp::Tenant) -> OrgContext {
    OrgContext::new(&tenant.base_url, tenant.client_id, tenant.client_secret)
}

async fn session_store(options: &database::Options) -> Result<Arc<dyn SessionStore>> {
    let Some(dsn) = &options.dsn else {
        warn!("No database configured, sessions are not persisted and multi-step logins cannot complete");
        return Ok(Arc::new(DisabledSessionStore));
    };

    let store = PgSessionStore::connect(dsn, options.pool, options.session_ttl)
        .await
        .context("Failed to initialize session store")?;
    info!("Session store ready");
    Ok(Arc::new(store))
}

fn log_startup_args(args: &Args) {
    debug!(
        port = args.http.port,
        api_key = args.http.api_key.is_some(),
        session_store = args.database.dsn.is_some(),
        external_org = args.idp.external.is_some(),
        "Starting sftpgo-hooks"
    );
    debug!(
        internal_idp = %args.idp.internal.base_url,
        external_idp = args.idp.external.as_ref().map(|t| t.base_url.as_str()),
        sftpgo_api = %args.sftpgo.api_base,
        folder_path = %args.sftpgo.folder_path,
        home_dir_path = %args.sftpgo.home_dir_path,
        "Upstream configuration"
    );
}
