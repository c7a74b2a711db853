//! The bot and its setup state
//!
//! A [`Bot`] is either [`Bot::Unconfigured`], when its configuration could
//! not be validated, or [`Bot::Ready`]. The state is decided once, at setup,
//! and never changes afterwards. All operations go through
//! [`Bot::session`], which reports [`FollowbotError::NotSetUp`] for an
//! unconfigured bot instead of touching the network or the snapshots.
//!
//! # Example
//!
//! ```no_run
//! use libfollowbot::Bot;
//!
//! # async fn example() -> libfollowbot::Result<()> {
//! let bot = Bot::setup(std::path::Path::new("config.toml"));
//! let session = bot.session()?;
//!
//! session.sync().await?;
//! let report = session.follow_back().await?;
//! println!("followed {} accounts", report.succeeded.len());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::Serialize;

use crate::config::{self, Config};
use crate::error::{ConfigError, FollowbotError, RemoteError, Result};
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::remote::twitter::TwitterClient;
use crate::remote::SocialGraph;
use crate::store::SnapshotStore;
use crate::sync::{check_staleness, StaleSnapshot, SyncEngine, SyncReport};
use crate::types::{IdSet, Role, SearchQuery, Tweet};

/// Why setup did not reach the ready state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupFailure {
    /// Configuration keys that were absent or empty
    pub missing: Vec<String>,
    pub message: String,
}

impl SetupFailure {
    fn from_config_error(error: &ConfigError) -> Self {
        let missing = match error {
            ConfigError::MissingFields(fields) => fields.clone(),
            ConfigError::MissingField(field) => vec![field.clone()],
            _ => Vec::new(),
        };
        Self {
            missing,
            message: error.to_string(),
        }
    }

    fn from_message(message: String) -> Self {
        Self {
            missing: Vec::new(),
            message,
        }
    }
}

pub enum Bot<G: SocialGraph = TwitterClient> {
    Unconfigured(SetupFailure),
    Ready(Session<G>),
}

impl Bot<TwitterClient> {
    /// Load the configuration at `path` and connect to Twitter
    pub fn setup(path: &Path) -> Self {
        Self::setup_with(path, |config| TwitterClient::new(config.credentials.clone()))
    }
}

impl<G: SocialGraph> Bot<G> {
    /// Load the configuration at `path` and build the remote client with
    /// `connect`
    ///
    /// Never fails: every problem is captured in [`Bot::Unconfigured`].
    pub fn setup_with<F>(path: &Path, connect: F) -> Self
    where
        F: FnOnce(&Config) -> std::result::Result<G, RemoteError>,
    {
        let config = match Config::load_from_path(path) {
            Ok(config) => config,
            Err(e) => {
                for field in SetupFailure::from_config_error(&e).missing {
                    tracing::warn!("Missing config parameter: {}", field);
                }
                tracing::warn!(
                    "Please edit {} to include the missing parameters and run setup again",
                    path.display()
                );
                return Self::unconfigured(e);
            }
        };

        let api = match connect(&config) {
            Ok(api) => api,
            Err(e) => {
                tracing::warn!("Could not create API client: {}", e);
                return Bot::Unconfigured(SetupFailure::from_message(e.to_string()));
            }
        };

        match Self::ready(config, api) {
            Ok(bot) => bot,
            Err(e) => {
                tracing::warn!("Setup failed: {}", e);
                Bot::Unconfigured(SetupFailure::from_message(e.to_string()))
            }
        }
    }

    /// A ready bot for an already validated configuration
    ///
    /// Creates any missing snapshot file and warns about stale snapshots.
    pub fn ready(config: Config, api: G) -> Result<Self> {
        let store = SnapshotStore::new(config.snapshots.clone());
        store.ensure_exists()?;
        warn_if_stale(&store, config.stale_after, SystemTime::now());

        Ok(Bot::Ready(Session { config, api, store }))
    }

    pub fn unconfigured(error: ConfigError) -> Self {
        Bot::Unconfigured(SetupFailure::from_config_error(&error))
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Bot::Ready(_))
    }

    /// The ready session, or [`FollowbotError::NotSetUp`]
    pub fn session(&self) -> Result<&Session<G>> {
        match self {
            Bot::Ready(session) => Ok(session),
            Bot::Unconfigured(failure) => Err(FollowbotError::NotSetUp(failure.message.clone())),
        }
    }
}

/// Snapshot metadata reported by `status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotStatus {
    pub role: Role,
    pub path: PathBuf,
    pub count: usize,
    /// Seconds since the snapshot was written
    pub age_secs: u64,
    pub stale: bool,
}

/// A configured bot: validated config, remote client and snapshot store
pub struct Session<G: SocialGraph> {
    config: Config,
    api: G,
    store: SnapshotStore,
}

impl<G: SocialGraph> Session<G> {
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn api(&self) -> &G {
        &self.api
    }

    fn reconciler(&self) -> Reconciler<'_, G> {
        Reconciler::new(&self.api, &self.store, &self.config.handle)
    }

    pub async fn sync(&self) -> Result<SyncReport> {
        SyncEngine::new(&self.api, &self.store, &self.config.handle)
            .sync()
            .await
    }

    pub fn stale_snapshots(&self) -> Result<Vec<StaleSnapshot>> {
        check_staleness(&self.store, self.config.stale_after, SystemTime::now())
    }

    pub fn snapshot_status(&self) -> Result<Vec<SnapshotStatus>> {
        let now = SystemTime::now();
        Role::ALL
            .iter()
            .map(|&role| -> Result<SnapshotStatus> {
                let count = self.store.load(role)?.len();
                let age = self.store.age(role, now)?;
                Ok(SnapshotStatus {
                    role,
                    path: self.store.paths().path(role).to_path_buf(),
                    count,
                    age_secs: age.as_secs(),
                    stale: role != Role::AlreadyFollowed && age > self.config.stale_after,
                })
            })
            .collect()
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<Tweet>> {
        self.reconciler().search(query).await
    }

    pub async fn follow_matching(&self, query: &SearchQuery) -> Result<ReconcileReport> {
        self.reconciler().follow_matching(query).await
    }

    pub async fn follow_back(&self) -> Result<ReconcileReport> {
        self.reconciler().follow_back().await
    }

    pub async fn follow_followers_of(
        &self,
        screen_name: &str,
        limit: usize,
    ) -> Result<ReconcileReport> {
        if screen_name.trim_start_matches('@').trim().is_empty() {
            return Err(FollowbotError::InvalidInput(
                "screen name cannot be empty".to_string(),
            ));
        }
        self.reconciler().follow_followers_of(screen_name, limit).await
    }

    /// Unfollow nonfollowers, keeping the configured list plus `extra_keep`
    pub async fn unfollow_nonfollowers(&self, extra_keep: &IdSet) -> Result<ReconcileReport> {
        let keep = merged(&self.config.keep.following, extra_keep);
        self.reconciler().unfollow_nonfollowers(&keep).await
    }

    /// Mute everyone followed, keeping the configured list plus `extra_keep`
    pub async fn mute_following(&self, extra_keep: &IdSet) -> Result<ReconcileReport> {
        let keep = merged(&self.config.keep.unmuted, extra_keep);
        self.reconciler().mute_following(&keep).await
    }

    /// Unmute everyone, keeping the configured list plus `extra_keep`
    pub async fn unmute_all(&self, extra_keep: &IdSet) -> Result<ReconcileReport> {
        let keep = merged(&self.config.keep.muted, extra_keep);
        self.reconciler().unmute_all(&keep).await
    }

    pub async fn favorite_matching(&self, query: &SearchQuery) -> Result<ReconcileReport> {
        self.reconciler().favorite_matching(query).await
    }

    pub async fn retweet_matching(&self, query: &SearchQuery) -> Result<ReconcileReport> {
        self.reconciler().retweet_matching(query).await
    }
}

/// Staleness check that never blocks setup; an unreadable mtime is logged
fn warn_if_stale(
    store: &SnapshotStore,
    threshold: Duration,
    now: SystemTime,
) -> Vec<StaleSnapshot> {
    check_staleness(store, threshold, now).unwrap_or_else(|e| {
        tracing::warn!("Could not check snapshot age: {}", e);
        Vec::new()
    })
}

fn merged(a: &IdSet, b: &IdSet) -> IdSet {
    a.union(b).copied().collect()
}

/// Default config location, for callers that do not pass one
pub fn default_config_path() -> Result<PathBuf> {
    Ok(config::resolve_config_path()?)
}
