//! Authentication session value object returned by login and refresh.

use serde::{Deserialize, Serialize};

use crate::domain::entities::token::TokenPair;
use crate::domain::entities::user::User;

/// Result of a successful login or refresh: the fresh token pair plus the
/// identity it was minted for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthSession {
    /// Fresh access/refresh token pair
    pub tokens: TokenPair,

    /// The authenticated user, as the directory reported it
    pub user: User,
}

impl AuthSession {
    /// Creates a new authentication session
    pub fn new(tokens: TokenPair, user: User) -> Self {
        Self { tokens, user }
    }
}
