//! Followbot - follow, unfollow and mute automation for Twitter accounts
//!
//! This library keeps local snapshots of an account's followers and
//! followings, refreshes them from the paginated remote API, and diffs them
//! to drive bulk actions such as following back, unfollowing accounts that
//! never followed back, and muting everyone followed.

pub mod bot;
pub mod config;
pub mod error;
pub mod logging;
pub mod pager;
pub mod reconcile;
pub mod remote;
pub mod store;
pub mod sync;
pub mod types;

// Re-export commonly used types
pub use bot::{Bot, Session};
pub use config::Config;
pub use error::{FollowbotError, Result};
pub use reconcile::{Action, ReconcileReport};
pub use remote::SocialGraph;
pub use store::SnapshotStore;
pub use types::{IdSet, Role, SearchQuery, Tweet, UserId};
