// src/config/social.rs
use crate::error::ConfigError;

/// @EPSGUID, the account the earnings bot follows by default.
pub const DEFAULT_FOLLOW_ID: &str = "55395551";

/// OAuth 1.0a user-context credentials for the filter stream.
#[derive(Clone)]
pub struct SocialCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl std::fmt::Debug for SocialCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocialCredentials")
            .field("consumer_key", &self.consumer_key)
            .field("access_token", &self.access_token)
            .finish_non_exhaustive()
    }
}

impl SocialCredentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// All four values are required; the first missing one is reported.
    pub fn from_lookup(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let req = |k: &'static str| {
            env(k)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(k))
        };
        Ok(Self {
            consumer_key: req("CONSUMER_KEY")?,
            consumer_secret: req("CONSUMER_SECRET")?,
            access_token: req("ACCESS_TOKEN")?,
            access_token_secret: req("ACCESS_TOKEN_SECRET")?,
        })
    }
}

/// Comma-separated account ids from `FOLLOW_IDS`, defaulting to @EPSGUID.
pub fn follow_ids_from(raw: Option<String>) -> Vec<String> {
    let ids: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if ids.is_empty() {
        vec![DEFAULT_FOLLOW_ID.to_string()]
    } else {
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_missing_credential_is_named() {
        let err = SocialCredentials::from_lookup(|k| match k {
            "CONSUMER_KEY" | "CONSUMER_SECRET" => Some("x".into()),
            _ => None,
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("ACCESS_TOKEN")));
    }

    #[test]
    fn debug_hides_secrets() {
        let c = SocialCredentials::from_lookup(|k| Some(format!("{k}-value"))).unwrap();
        let s = format!("{c:?}");
        assert!(s.contains("CONSUMER_KEY-value"));
        assert!(!s.contains("CONSUMER_SECRET-value"));
        assert!(!s.contains("ACCESS_TOKEN_SECRET-value"));
    }

    #[test]
    fn follow_ids_default_and_split() {
        assert_eq!(follow_ids_from(None), vec!["55395551"]);
        assert_eq!(follow_ids_from(Some(" 1, 2 ,,".into())), vec!["1", "2"]);
    }
}
