//! Permission tiers and sender authorization.
//!
//! # Responsibilities
//! - Define the ordered privilege levels for message senders
//! - Resolve a sender to exactly one level
//! - Walk levels cumulatively (a level grants everything below it)
//!
//! # Design Decisions
//! - Cumulation is an explicit descending walk, not fallthrough control flow
//! - Resolution is behind a trait so deployments can swap the policy

use serde::{Deserialize, Serialize};

/// Privilege level of a message sender, lowest to highest.
///
/// Higher levels include all capabilities of lower levels: a command
/// registered at [`PermissionLevel::Normal`] is reachable by every sender
/// resolved at `Normal` or above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    /// Blacklisted senders. Only handlers explicitly registered at this
    /// level are reachable.
    Black,
    Normal,
    /// Sender of a private (direct) message.
    Private,
    GroupMember,
    GroupAdmin,
    GroupOwner,
    WhiteList,
    Superuser,
}

/// Number of distinct levels, for sizing per-level tables.
pub const LEVEL_COUNT: usize = PermissionLevel::Superuser as usize + 1;

impl PermissionLevel {
    /// All levels in ascending order.
    pub const ALL: [PermissionLevel; LEVEL_COUNT] = [
        PermissionLevel::Black,
        PermissionLevel::Normal,
        PermissionLevel::Private,
        PermissionLevel::GroupMember,
        PermissionLevel::GroupAdmin,
        PermissionLevel::GroupOwner,
        PermissionLevel::WhiteList,
        PermissionLevel::Superuser,
    ];

    /// Table index for this level.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Iterate from this level down to [`PermissionLevel::Black`] inclusive.
    ///
    /// This is the cumulative-authorization walk: registries are consulted
    /// for every level the sender is entitled to, highest first.
    pub fn iter_down(self) -> impl Iterator<Item = PermissionLevel> {
        Self::ALL.into_iter().take(self.index() + 1).rev()
    }
}

/// Identity of a message sender, as the router sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenderInfo {
    pub user_id: i64,
    /// Group the message arrived through, if any.
    pub group_id: Option<i64>,
    /// Group role of the sender, when the platform reports one.
    pub role: Option<GroupRole>,
}

/// Sender role within a group, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupRole {
    Member,
    Admin,
    Owner,
}

/// Maps a sender to a single [`PermissionLevel`].
///
/// Implementations must be cheap: resolution runs on the process-worker
/// path for every message event.
pub trait PermissionResolver: Send + Sync {
    fn resolve(&self, sender: &SenderInfo) -> PermissionLevel;
}

/// Resolver backed by the static lists in the gateway configuration.
///
/// Precedence: blacklist, superusers, whitelist, then group role or
/// private/normal by message origin.
#[derive(Debug, Default)]
pub struct ConfigResolver {
    superusers: Vec<i64>,
    whitelist: Vec<i64>,
    blacklist: Vec<i64>,
}

impl ConfigResolver {
    pub fn new(superusers: Vec<i64>, whitelist: Vec<i64>, blacklist: Vec<i64>) -> Self {
        Self {
            superusers,
            whitelist,
            blacklist,
        }
    }
}

impl PermissionResolver for ConfigResolver {
    fn resolve(&self, sender: &SenderInfo) -> PermissionLevel {
        if self.blacklist.contains(&sender.user_id) {
            return PermissionLevel::Black;
        }
        if self.superusers.contains(&sender.user_id) {
            return PermissionLevel::Superuser;
        }
        if self.whitelist.contains(&sender.user_id) {
            return PermissionLevel::WhiteList;
        }
        match (sender.group_id, sender.role) {
            (Some(_), Some(GroupRole::Owner)) => PermissionLevel::GroupOwner,
            (Some(_), Some(GroupRole::Admin)) => PermissionLevel::GroupAdmin,
            (Some(_), _) => PermissionLevel::GroupMember,
            (None, _) => PermissionLevel::Private,
        }
    }
}
