//! Player identity and matchmaking criteria types.
//!
//! A `PlayerId` is an opaque key issued by the authentication collaborator;
//! the core never inspects it beyond equality and hashing. The profile and
//! criteria travel with the id but are immutable once issued.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque unique identifier for a player. Issued at authentication,
/// referenced by every component, owned by none.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub String);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        PlayerId(s.to_string())
    }
}

/// Display metadata attached to a verified identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub username: String,
    pub rating: u32,
    pub region: String,
}

/// Matchmaking criteria a player queues with. The rating anchor is the
/// player's own rating; the region never widens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criteria {
    pub rating: u32,
    pub region: String,
}

impl Criteria {
    pub fn new(rating: u32, region: impl Into<String>) -> Self {
        Self {
            rating,
            region: region.into(),
        }
    }
}
