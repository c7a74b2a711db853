//! Refreshing local snapshots from the remote graph
//!
//! [`SyncEngine::sync`] pages through the bot's complete follower and
//! following lists and overwrites the matching snapshots. Both lists are
//! fetched before anything is written, so a remote failure leaves the old
//! snapshots untouched.
//!
//! Snapshots drift as soon as they are written. [`check_staleness`] reports
//! any follower/following snapshot older than the configured threshold; the
//! result is advisory and never blocks an operation.

use std::time::{Duration, SystemTime};

use serde::Serialize;

use crate::error::Result;
use crate::pager::{page_all, IdResource};
use crate::remote::SocialGraph;
use crate::store::SnapshotStore;
use crate::types::Role;

/// Sizes of the freshly written snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub followers: usize,
    pub following: usize,
}

pub struct SyncEngine<'a, G: SocialGraph + ?Sized> {
    api: &'a G,
    store: &'a SnapshotStore,
    handle: &'a str,
}

impl<'a, G: SocialGraph + ?Sized> SyncEngine<'a, G> {
    pub fn new(api: &'a G, store: &'a SnapshotStore, handle: &'a str) -> Self {
        Self { api, store, handle }
    }

    /// Replace the followers and following snapshots with the remote state
    pub async fn sync(&self) -> Result<SyncReport> {
        tracing::info!("Syncing followers and following for @{}", self.handle);

        let followers = page_all(self.api, &IdResource::FollowersOf(self.handle.to_string())).await?;
        let following = page_all(self.api, &IdResource::FriendsOf(self.handle.to_string())).await?;

        self.store.replace(Role::Followers, &followers)?;
        self.store.replace(Role::Following, &following)?;

        let report = SyncReport {
            followers: followers.len(),
            following: following.len(),
        };
        tracing::info!(
            "Synced {} followers and {} following",
            report.followers,
            report.following
        );
        Ok(report)
    }
}

/// A snapshot older than the staleness threshold
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleSnapshot {
    pub role: Role,
    #[serde(with = "as_secs")]
    pub age: Duration,
}

/// Report follower/following snapshots last written more than `threshold` ago
///
/// Logs a warning when anything is stale. Missing files are a storage error.
pub fn check_staleness(
    store: &SnapshotStore,
    threshold: Duration,
    now: SystemTime,
) -> Result<Vec<StaleSnapshot>> {
    let mut stale = Vec::new();
    for role in [Role::Followers, Role::Following] {
        let age = store.age(role, now)?;
        if age > threshold {
            stale.push(StaleSnapshot { role, age });
        }
    }

    if !stale.is_empty() {
        let roles: Vec<&str> = stale.iter().map(|s| s.role.as_str()).collect();
        tracing::warn!(
            "Snapshots older than {} ({}); run `followbot sync` to refresh them",
            humantime::format_duration(threshold),
            roles.join(", ")
        );
    }
    Ok(stale)
}

mod as_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(age: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(age.as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SnapshotPaths;
    use crate::error::{FollowbotError, RemoteError};
    use crate::remote::mock::{Listing, MockGraph};
    use crate::types::id_set;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> SnapshotStore {
        let store = SnapshotStore::new(SnapshotPaths {
            followers: dir.path().join("followers.txt"),
            following: dir.path().join("following.txt"),
            already_followed: dir.path().join("already-followed.txt"),
        });
        store.ensure_exists().unwrap();
        store
    }

    #[tokio::test]
    async fn test_sync_replaces_both_snapshots() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.replace(Role::Following, &id_set([99])).unwrap();
        let graph = MockGraph::default()
            .with_followers("me", [1, 2, 3])
            .with_friends("me", [2, 3, 4]);

        let report = SyncEngine::new(&graph, &store, "me").sync().await.unwrap();

        assert_eq!(report, SyncReport { followers: 3, following: 3 });
        assert_eq!(store.load(Role::Followers).unwrap(), id_set([1, 2, 3]));
        assert_eq!(store.load(Role::Following).unwrap(), id_set([2, 3, 4]));
    }

    #[tokio::test]
    async fn test_sync_is_byte_identical_when_remote_unchanged() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let graph = MockGraph::default()
            .with_page_size(2)
            .with_followers("me", [5, 3, 9, 1])
            .with_friends("me", [8, 6]);
        let engine = SyncEngine::new(&graph, &store, "me");

        engine.sync().await.unwrap();
        let first = (
            std::fs::read(dir.path().join("followers.txt")).unwrap(),
            std::fs::read(dir.path().join("following.txt")).unwrap(),
        );
        engine.sync().await.unwrap();
        let second = (
            std::fs::read(dir.path().join("followers.txt")).unwrap(),
            std::fs::read(dir.path().join("following.txt")).unwrap(),
        );

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_sync_failure_leaves_snapshots_untouched() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.replace(Role::Followers, &id_set([1])).unwrap();
        let graph = MockGraph::default()
            .with_followers("me", [1, 2])
            .fail_listing(
                Listing::Friends("me".to_string()),
                RemoteError::Network("connection reset".to_string()),
            );

        let err = SyncEngine::new(&graph, &store, "me").sync().await.unwrap_err();

        assert!(matches!(err, FollowbotError::Remote(_)));
        assert_eq!(store.load(Role::Followers).unwrap(), id_set([1]));
    }

    #[test]
    fn test_fresh_snapshots_are_not_stale() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let stale = check_staleness(&store, Duration::from_secs(3600), SystemTime::now()).unwrap();
        assert!(stale.is_empty());
    }

    #[test]
    fn test_old_snapshots_are_stale() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let two_days_later = SystemTime::now() + Duration::from_secs(2 * 86400);

        let stale = check_staleness(&store, Duration::from_secs(86400), two_days_later).unwrap();

        let roles: Vec<Role> = stale.iter().map(|s| s.role).collect();
        assert_eq!(roles, vec![Role::Followers, Role::Following]);
        assert!(stale[0].age > Duration::from_secs(86400));
    }
}
