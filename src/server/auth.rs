//! Authentication collaborator.
//!
//! The core trusts whatever identity the authenticator hands back; token
//! issuance and validation live outside this crate. The default
//! implementation reads the identity from the upgrade request's query
//! string, the same place the reference deployment carries it.

use std::borrow::Cow;

use crate::core::identity::{PlayerId, PlayerProfile};

/// Verifies an inbound connection attempt and yields the player's identity.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, query: &str) -> Result<(PlayerId, PlayerProfile), String>;
}

/// Default rating for players that do not announce one.
pub const DEFAULT_RATING: u32 = 1000;

/// Default region for players that do not announce one.
pub const DEFAULT_REGION: &str = "global";

/// Query-string authenticator. Expects `player` (required), and optional
/// `username`, `rating`, `region` parameters.
pub struct QueryAuth;

impl Authenticator for QueryAuth {
    fn authenticate(&self, query: &str) -> Result<(PlayerId, PlayerProfile), String> {
        let mut player_id: Option<String> = None;
        let mut username = String::new();
        let mut rating = DEFAULT_RATING;
        let mut region = DEFAULT_REGION.to_string();

        for kv in query.split('&') {
            let mut split = kv.split('=');
            match (split.next(), split.next()) {
                (Some("player"), Some(id)) => {
                    player_id = Some(id.to_string());
                }
                (Some("username"), Some(name)) => {
                    username = urlencoding::decode(name)
                        .unwrap_or_else(|_| Cow::Borrowed(""))
                        .into_owned();
                }
                (Some("rating"), Some(value)) => {
                    rating = value.parse().map_err(|_| "invalid rating".to_string())?;
                }
                (Some("region"), Some(value)) => {
                    region = value.to_string();
                }
                _ => {}
            }
        }

        let player_id = match player_id {
            Some(id) if !id.is_empty() => id,
            _ => return Err("missing player identity".to_string()),
        };

        if username.is_empty() {
            let prefix: String = player_id.chars().take(6).collect();
            username = format!("Player_{}", prefix);
        }

        let profile = PlayerProfile {
            username,
            rating,
            region,
        };
        Ok((PlayerId(player_id), profile))
    }
}
