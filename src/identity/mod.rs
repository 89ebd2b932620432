//! Username handling shared by both hooks.
//!
//! Usernames arrive unauthenticated from SFTPGo, so everything here is pure and
//! cheap: validation, organization classification, project-key parsing and the
//! home-directory segment derived from a username.

use thiserror::Error;

/// Maximum accepted username length in bytes.
pub const MAX_USERNAME_LEN: usize = 254;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UsernameError {
    #[error("username is empty")]
    Empty,
    #[error("username exceeds {} bytes", MAX_USERNAME_LEN)]
    TooLong,
    #[error("username contains control characters")]
    InvalidCharacters,
}

/// Validate a username received from SFTPGo.
///
/// # Errors
/// Returns [`UsernameError`] when the username is empty, longer than
/// [`MAX_USERNAME_LEN`] bytes, or contains control characters.
pub fn validate_username(username: &str) -> Result<(), UsernameError> {
    if username.is_empty() {
        return Err(UsernameError::Empty);
    }
    if username.len() > MAX_USERNAME_LEN {
        return Err(UsernameError::TooLong);
    }
    if username.chars().any(char::is_control) {
        return Err(UsernameError::InvalidCharacters);
    }
    Ok(())
}

/// The two identity provider tenants a user can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Organization {
    Internal,
    External,
}

impl Organization {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::External => "external",
        }
    }
}

/// Classifies usernames by the configured internal domain suffix.
///
/// Matching is an exact, case-sensitive suffix comparison.
#[derive(Debug, Clone)]
pub struct Classifier {
    internal_suffix: String,
}

impl Classifier {
    #[must_use]
    pub fn new(internal_suffix: impl Into<String>) -> Self {
        Self {
            internal_suffix: internal_suffix.into(),
        }
    }

    #[must_use]
    pub fn internal_suffix(&self) -> &str {
        &self.internal_suffix
    }

    #[must_use]
    pub fn classify(&self, username: &str) -> Organization {
        if !self.internal_suffix.is_empty() && username.ends_with(&self.internal_suffix) {
            Organization::Internal
        } else {
            Organization::External
        }
    }

    #[must_use]
    pub fn is_internal(&self, username: &str) -> bool {
        self.classify(username) == Organization::Internal
    }

    /// Split `key@local@domain` into its project key and bare username.
    ///
    /// Only internal usernames carry a project key; anything else yields `None`.
    #[must_use]
    pub fn parse_project_key(&self, username: &str) -> Option<KeyedUsername> {
        if !self.is_internal(username) {
            return None;
        }
        let mut parts = username.splitn(2, '@');
        let key = parts.next()?;
        let rest = parts.next()?;
        if key.is_empty() || rest.matches('@').count() != 1 {
            return None;
        }
        Some(KeyedUsername {
            project_key: key.to_string(),
            bare_username: rest.to_string(),
        })
    }

    /// Resolve the identity used for lookups: the bare username plus the
    /// project key when one was supplied.
    #[must_use]
    pub fn resolve(&self, username: &str) -> ResolvedIdentity {
        match self.parse_project_key(username) {
            Some(keyed) => ResolvedIdentity {
                organization: self.classify(&keyed.bare_username),
                username: keyed.bare_username,
                project_key: Some(keyed.project_key),
            },
            None => ResolvedIdentity {
                organization: self.classify(username),
                username: username.to_string(),
                project_key: None,
            },
        }
    }
}

/// A username that carried a project-key prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedUsername {
    pub project_key: String,
    pub bare_username: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub username: String,
    pub project_key: Option<String>,
    pub organization: Organization,
}

/// Replace characters that are unsafe in a directory name.
#[must_use]
pub fn sanitize_username(username: &str) -> String {
    username
        .chars()
        .map(|c| match c {
            '@' | '.' | '/' | '+' => '_',
            other => other,
        })
        .collect()
}
