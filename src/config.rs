//! Runtime configuration from environment variables.
//!
//! Nothing here is required: the server falls back to its defaults and the
//! Apple Music developer-token endpoint degrades to unauthenticated mode
//! when the signing credentials are absent.

use std::env;
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 3000;

/// Port for the HTTP server (`PORT`), defaulting to 3000.
pub fn server_port() -> u16 {
    env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

/// Apple Music developer team id (`APPLE_TEAM_ID`). Placeholder values from
/// template configs count as unset.
pub fn apple_team_id() -> Option<String> {
    configured(env::var("APPLE_TEAM_ID").ok(), "YOUR_TEAM_ID")
}

/// Apple Music signing key id (`APPLE_KEY_ID`).
pub fn apple_key_id() -> Option<String> {
    configured(env::var("APPLE_KEY_ID").ok(), "YOUR_KEY_ID")
}

/// Path to the Apple Music `.p8` private key (`APPLE_PRIVATE_KEY_PATH`),
/// defaulting to `apple_private_key.p8` in the working directory.
pub fn apple_private_key_path() -> PathBuf {
    env::var("APPLE_PRIVATE_KEY_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("apple_private_key.p8"))
}

fn configured(value: Option<String>, placeholder: &str) -> Option<String> {
    value.filter(|v| !v.is_empty() && v != placeholder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_counts_as_unset() {
        assert_eq!(configured(Some("YOUR_TEAM_ID".into()), "YOUR_TEAM_ID"), None);
        assert_eq!(configured(Some(String::new()), "YOUR_TEAM_ID"), None);
        assert_eq!(
            configured(Some("ABC123".into()), "YOUR_TEAM_ID"),
            Some("ABC123".into())
        );
        assert_eq!(configured(None, "YOUR_TEAM_ID"), None);
    }
}
