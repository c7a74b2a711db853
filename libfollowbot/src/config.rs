//! Configuration management for Followbot
//!
//! The configuration file is read once into a loosely-typed [`RawConfig`]
//! and then validated into a fully-populated [`Config`]. Every required key
//! is checked before reporting, so a single error lists all of the missing
//! settings.
//!
//! Two file formats are accepted:
//!
//! - TOML (any path ending in `.toml`)
//! - the legacy `KEY: value` text format (`OAUTH_TOKEN`, `TWITTER_HANDLE`,
//!   `FOLLOWERS_FILE`, ...)

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{IdSet, Role, UserId};

/// Snapshots older than this trigger a staleness warning.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(24 * 60 * 60);

/// Validated bot configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Screen name of the bot's own account
    pub handle: String,
    pub credentials: Arc<Credentials>,
    pub snapshots: SnapshotPaths,
    pub stale_after: Duration,
    pub keep: KeepLists,
}

/// OAuth 1.0a credential material.
#[derive(Debug)]
pub struct Credentials {
    pub consumer_key: SecretString,
    pub consumer_secret: SecretString,
    pub oauth_token: SecretString,
    pub oauth_secret: SecretString,
}

/// Where each snapshot role lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPaths {
    pub followers: PathBuf,
    pub following: PathBuf,
    pub already_followed: PathBuf,
}

impl SnapshotPaths {
    pub fn path(&self, role: Role) -> &Path {
        match role {
            Role::Followers => &self.followers,
            Role::Following => &self.following,
            Role::AlreadyFollowed => &self.already_followed,
        }
    }
}

/// Accounts exempt from bulk actions by default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeepLists {
    /// Never unfollowed by unfollow-nonfollowers
    pub following: IdSet,
    /// Never muted by mute-following
    pub unmuted: IdSet,
    /// Never unmuted by unmute-all
    pub muted: IdSet,
}

/// Configuration as written in the file, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub account: RawAccount,
    pub credentials: RawCredentials,
    pub snapshots: RawSnapshots,
    pub sync: RawSync,
    pub keep: RawKeep,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawAccount {
    pub handle: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawCredentials {
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
    pub oauth_token: Option<String>,
    pub oauth_secret: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSnapshots {
    pub followers: Option<String>,
    pub following: Option<String>,
    pub already_followed: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSync {
    pub stale_after: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawKeep {
    pub following: Vec<u64>,
    pub unmuted: Vec<u64>,
    pub muted: Vec<u64>,
}

impl RawConfig {
    /// Parse the TOML format
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Parse the legacy `KEY: value` format
    ///
    /// Blank lines and lines starting with `#` are ignored. Unknown keys are
    /// ignored so that old files with extra settings keep working.
    pub fn from_legacy_str(content: &str) -> Result<Self, ConfigError> {
        let mut raw = RawConfig::default();

        for (index, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let (key, value) = trimmed
                .split_once(':')
                .ok_or_else(|| ConfigError::MalformedLine {
                    line: index + 1,
                    content: line.to_string(),
                })?;
            let value = Some(value.trim().to_string());

            match key.trim() {
                "OAUTH_TOKEN" => raw.credentials.oauth_token = value,
                "OAUTH_SECRET" => raw.credentials.oauth_secret = value,
                "CONSUMER_KEY" => raw.credentials.consumer_key = value,
                "CONSUMER_SECRET" => raw.credentials.consumer_secret = value,
                "TWITTER_HANDLE" => raw.account.handle = value,
                "ALREADY_FOLLOWED_FILE" => raw.snapshots.already_followed = value,
                "FOLLOWERS_FILE" => raw.snapshots.followers = value,
                "FOLLOWS_FILE" => raw.snapshots.following = value,
                other => tracing::debug!("Ignoring unknown config key: {}", other),
            }
        }

        Ok(raw)
    }

    /// Check every required key and build a [`Config`]
    pub fn validate(self) -> Result<Config, ConfigError> {
        let mut missing = Vec::new();

        let mut require = |name: &str, value: Option<String>| -> String {
            match value.map(|v| v.trim().to_string()) {
                Some(v) if !v.is_empty() => v,
                _ => {
                    missing.push(name.to_string());
                    String::new()
                }
            }
        };

        let handle = require(
            "account.handle",
            self.account
                .handle
                .map(|h| h.trim().trim_start_matches('@').to_string()),
        );
        let consumer_key = require("credentials.consumer_key", self.credentials.consumer_key);
        let consumer_secret =
            require("credentials.consumer_secret", self.credentials.consumer_secret);
        let oauth_token = require("credentials.oauth_token", self.credentials.oauth_token);
        let oauth_secret = require("credentials.oauth_secret", self.credentials.oauth_secret);
        let followers = require("snapshots.followers", self.snapshots.followers);
        let following = require("snapshots.following", self.snapshots.following);
        let already_followed =
            require("snapshots.already_followed", self.snapshots.already_followed);

        if !missing.is_empty() {
            return Err(ConfigError::MissingFields(missing));
        }

        let stale_after = match self.sync.stale_after {
            Some(value) => {
                humantime::parse_duration(value.trim()).map_err(|e| ConfigError::InvalidValue {
                    field: "sync.stale_after".to_string(),
                    message: e.to_string(),
                })?
            }
            None => DEFAULT_STALE_AFTER,
        };

        Ok(Config {
            handle,
            credentials: Arc::new(Credentials {
                consumer_key: SecretString::from(consumer_key),
                consumer_secret: SecretString::from(consumer_secret),
                oauth_token: SecretString::from(oauth_token),
                oauth_secret: SecretString::from(oauth_secret),
            }),
            snapshots: SnapshotPaths {
                followers: expand_path(&followers),
                following: expand_path(&following),
                already_followed: expand_path(&already_followed),
            },
            stale_after,
            keep: KeepLists {
                following: to_id_set(self.keep.following),
                unmuted: to_id_set(self.keep.unmuted),
                muted: to_id_set(self.keep.muted),
            },
        })
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load and validate configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        read_raw(path)?.validate()
    }
}

/// Read a configuration file without validating it
pub fn read_raw(path: &Path) -> Result<RawConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    if path.extension().is_some_and(|ext| ext == "toml") {
        RawConfig::from_toml_str(&content)
    } else {
        RawConfig::from_legacy_str(&content)
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf, ConfigError> {
    if let Ok(path) = std::env::var("FOLLOWBOT_CONFIG") {
        return Ok(expand_path(&path));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("followbot").join("config.toml"))
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

fn to_id_set(ids: Vec<u64>) -> IdSet {
    ids.into_iter().map(UserId).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;

    const FULL_TOML: &str = r#"
[account]
handle = "@followbot_test"

[credentials]
consumer_key = "ck"
consumer_secret = "cs"
oauth_token = "ot"
oauth_secret = "os"

[snapshots]
followers = "/tmp/fb/followers.txt"
following = "/tmp/fb/following.txt"
already_followed = "/tmp/fb/already-followed.txt"

[sync]
stale_after = "12h"

[keep]
following = [1, 2]
"#;

    #[test]
    fn test_full_toml_validates() {
        let config = RawConfig::from_toml_str(FULL_TOML).unwrap().validate().unwrap();

        assert_eq!(config.handle, "followbot_test");
        assert_eq!(config.credentials.oauth_token.expose_secret(), "ot");
        assert_eq!(
            config.snapshots.path(Role::AlreadyFollowed),
            Path::new("/tmp/fb/already-followed.txt")
        );
        assert_eq!(config.stale_after, Duration::from_secs(12 * 3600));
        assert_eq!(config.keep.following, crate::types::id_set([1, 2]));
        assert!(config.keep.muted.is_empty());
    }

    #[test]
    fn test_missing_fields_are_all_reported() {
        let toml = r#"
[account]
handle = ""

[credentials]
consumer_key = "ck"
consumer_secret = "cs"
oauth_token = "ot"
"#;
        let err = RawConfig::from_toml_str(toml).unwrap().validate().unwrap_err();
        match err {
            ConfigError::MissingFields(fields) => {
                assert_eq!(
                    fields,
                    vec![
                        "account.handle",
                        "credentials.oauth_secret",
                        "snapshots.followers",
                        "snapshots.following",
                        "snapshots.already_followed",
                    ]
                );
            }
            other => panic!("Expected MissingFields, got {:?}", other),
        }
    }

    #[test]
    fn test_bare_at_sign_handle_is_missing() {
        let toml = FULL_TOML.replace("\"@followbot_test\"", "\" @ \"");
        let err = RawConfig::from_toml_str(&toml).unwrap().validate().unwrap_err();
        match err {
            ConfigError::MissingFields(fields) => assert_eq!(fields, vec!["account.handle"]),
            other => panic!("Expected MissingFields, got {:?}", other),
        }
    }

    #[test]
    fn test_legacy_bare_at_sign_handle_is_missing() {
        let legacy = "OAUTH_TOKEN: ot\nOAUTH_SECRET: os\nCONSUMER_KEY: ck\nCONSUMER_SECRET: cs\n\
                      TWITTER_HANDLE: @\nALREADY_FOLLOWED_FILE: a.txt\n\
                      FOLLOWERS_FILE: b.txt\nFOLLOWS_FILE: c.txt\n";
        let err = RawConfig::from_legacy_str(legacy).unwrap().validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingFields(ref f) if f == &vec!["account.handle".to_string()]));
    }

    #[test]
    fn test_default_stale_after() {
        let config = RawConfig::from_toml_str(FULL_TOML.replace("stale_after = \"12h\"", "").as_str())
            .unwrap()
            .validate()
            .unwrap();
        assert_eq!(config.stale_after, DEFAULT_STALE_AFTER);
    }

    #[test]
    fn test_invalid_stale_after() {
        let toml = FULL_TOML.replace("12h", "soon");
        let err = RawConfig::from_toml_str(&toml).unwrap().validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "sync.stale_after"));
    }

    #[test]
    fn test_legacy_format() {
        let legacy = "\
OAUTH_TOKEN: ot
OAUTH_SECRET: os
CONSUMER_KEY: ck
CONSUMER_SECRET: cs
TWITTER_HANDLE: followbot_test

ALREADY_FOLLOWED_FILE: C:/bot/already-followed.txt
FOLLOWERS_FILE: followers.txt
FOLLOWS_FILE: following.txt
";
        let config = RawConfig::from_legacy_str(legacy).unwrap().validate().unwrap();
        assert_eq!(config.handle, "followbot_test");
        assert_eq!(
            config.snapshots.already_followed,
            PathBuf::from("C:/bot/already-followed.txt")
        );
        assert_eq!(config.snapshots.following, PathBuf::from("following.txt"));
    }

    #[test]
    fn test_legacy_malformed_line() {
        let err = RawConfig::from_legacy_str("OAUTH_TOKEN ot\n").unwrap_err();
        assert!(matches!(err, ConfigError::MalformedLine { line: 1, .. }));
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let config = RawConfig::from_toml_str(FULL_TOML).unwrap().validate().unwrap();
        let debug = format!("{:?}", config.credentials);
        assert!(!debug.contains("\"os\""));
    }

    #[test]
    #[serial]
    fn test_resolve_config_path_from_env() {
        std::env::set_var("FOLLOWBOT_CONFIG", "/tmp/custom/followbot.toml");
        let path = resolve_config_path().unwrap();
        std::env::remove_var("FOLLOWBOT_CONFIG");
        assert_eq!(path, PathBuf::from("/tmp/custom/followbot.toml"));
    }

    #[test]
    fn test_read_raw_picks_format_by_extension() {
        let dir = tempfile::TempDir::new().unwrap();

        let toml_path = dir.path().join("config.toml");
        std::fs::write(&toml_path, FULL_TOML).unwrap();
        assert!(read_raw(&toml_path).unwrap().validate().is_ok());

        let legacy_path = dir.path().join("config.txt");
        std::fs::write(&legacy_path, "TWITTER_HANDLE: someone\n").unwrap();
        let raw = read_raw(&legacy_path).unwrap();
        assert_eq!(raw.account.handle.as_deref(), Some("someone"));
    }
}
