//! Identity collaborator: turns an opaque token into a player profile.

use async_trait::async_trait;
use grove_core::PlayerId;
use serde::{Deserialize, Serialize};

use crate::IdentityError;

/// Resolved player identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Stable id.
    pub player_id: PlayerId,
    /// Display name.
    pub display_name: String,
    /// Preferred language tag.
    pub language: String,
}

/// Verifies identity tokens.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve `token` or reject it.
    async fn resolve(&self, token: &str) -> Result<Profile, IdentityError>;
}

/// Development resolver trusting tokens of the form `<id>` or
/// `<id>:<name>[:<lang>]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DevIdentityResolver;

#[async_trait]
impl IdentityResolver for DevIdentityResolver {
    async fn resolve(&self, token: &str) -> Result<Profile, IdentityError> {
        let mut parts = token.trim().splitn(3, ':');
        let raw_id = parts.next().unwrap_or_default();
        let id: u64 = raw_id
            .parse()
            .map_err(|_| IdentityError::Rejected(format!("'{raw_id}' is not a player id")))?;
        let display_name = parts
            .next()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("player{id}"));
        let language = parts
            .next()
            .filter(|lang| !lang.is_empty())
            .unwrap_or("en")
            .to_string();
        Ok(Profile {
            player_id: PlayerId(id),
            display_name,
            language,
        })
    }
}
