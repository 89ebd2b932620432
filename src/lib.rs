//! # SFTPGo Hooks (external authentication bridge)
//!
//! `sftpgo-hooks` answers the two synchronous hooks SFTPGo uses to delegate
//! login decisions:
//!
//! - **Auth hook** (`POST /auth-hook`): drives a keyboard-interactive login by
//!   bridging each SFTPGo step to the identity provider's flow-based
//!   authentication API. In-flight flow state is persisted per SFTPGo request
//!   identifier so that steps handled by different replicas can continue the
//!   same flow.
//! - **Pre-login hook** (`POST /prelogin-hook`): turns an identity into a
//!   virtual filesystem grant. Folders come from project keys, the
//!   subscription service, or a legacy directory attribute, and are
//!   provisioned in SFTPGo before the grant is returned.
//!
//! ## Organizations
//!
//! Usernames ending with the configured internal suffix belong to the internal
//! organization; everything else is external. Each organization has its own
//! OAuth2 client and identity provider tenant, resolved once through
//! [`idp::OrgContexts`].
//!
//! ## Enumeration resistance
//!
//! Unknown users receive a fixed anonymous grant from the pre-login hook, and
//! the auth hook never echoes upstream error details back to SFTPGo.

pub mod api;
pub mod authz;
pub mod cli;
pub mod entitlement;
pub mod handshake;
pub mod http_client;
pub mod identity;
pub mod idp;
pub mod session;
pub mod sftpgo;

#[cfg(test)]
pub(crate) mod test_support;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
