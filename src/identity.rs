//! Bearer credential -> user id.
//!
//! Real token verification belongs to an external identity provider; the
//! static table here covers configured and demo accounts.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use crate::config::UserCfg;
use crate::error::GameError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, bearer: &str) -> Result<Identity, GameError>;
}

pub struct StaticTokenVerifier {
    tokens: HashMap<String, String>,
}

impl StaticTokenVerifier {
    pub fn from_users(users: &[UserCfg]) -> Self {
        let tokens = users
            .iter()
            .map(|u| (u.token.clone(), u.id.clone()))
            .collect();
        Self { tokens }
    }
}

#[async_trait]
impl IdentityVerifier for StaticTokenVerifier {
    async fn verify(&self, bearer: &str) -> Result<Identity, GameError> {
        match self.tokens.get(bearer.trim()) {
            Some(user_id) => Ok(Identity {
                user_id: user_id.clone(),
            }),
            None => {
                debug!(target: "trivia_backend", "Unknown bearer token");
                Err(GameError::Unauthenticated)
            }
        }
    }
}

/// Token part of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
