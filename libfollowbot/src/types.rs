//! Core types for Followbot

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Numeric handle of a remote account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(UserId)
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        UserId(id)
    }
}

/// A set of account identifiers.
///
/// Ordered so that snapshots serialize deterministically and bulk actions
/// walk their targets in a stable order.
pub type IdSet = BTreeSet<UserId>;

/// Build an [`IdSet`] from raw numeric ids.
pub fn id_set<I: IntoIterator<Item = u64>>(ids: I) -> IdSet {
    ids.into_iter().map(UserId).collect()
}

/// The persisted relationship roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Accounts following us
    Followers,
    /// Accounts we follow
    Following,
    /// Accounts we unfollowed for not following back; never followed again
    AlreadyFollowed,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Followers, Role::Following, Role::AlreadyFollowed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Followers => "followers",
            Role::Following => "following",
            Role::AlreadyFollowed => "already-followed",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One page of an id listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IdPage {
    pub ids: Vec<UserId>,
    /// Zero once the listing is exhausted
    pub next_cursor: i64,
}

impl IdPage {
    pub fn is_last(&self) -> bool {
        self.next_cursor == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetAuthor {
    pub id: UserId,
    pub screen_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tweet {
    pub id: u64,
    pub text: String,
    pub user: TweetAuthor,
}

impl Tweet {
    /// Whether the tweet was written by `handle` (compared case-insensitively).
    pub fn is_authored_by(&self, handle: &str) -> bool {
        self.user.screen_name.eq_ignore_ascii_case(handle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    #[default]
    Recent,
    Popular,
    Mixed,
}

impl ResultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultType::Recent => "recent",
            ResultType::Popular => "popular",
            ResultType::Mixed => "mixed",
        }
    }
}

impl FromStr for ResultType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "recent" => Ok(ResultType::Recent),
            "popular" => Ok(ResultType::Popular),
            "mixed" => Ok(ResultType::Mixed),
            _ => Err(format!(
                "Invalid result type: '{}'. Valid options: recent, popular, mixed",
                s
            )),
        }
    }
}

/// Parameters for a tweet search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub q: String,
    pub count: u32,
    pub result_type: ResultType,
}

impl SearchQuery {
    pub const DEFAULT_COUNT: u32 = 100;

    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            count: Self::DEFAULT_COUNT,
            result_type: ResultType::Recent,
        }
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn with_result_type(mut self, result_type: ResultType) -> Self {
        self.result_type = result_type;
        self
    }
}
