//! Per-user session state.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Tracked state for one currently-known user.
///
/// A session lives in the tracker's table under its `current_nick` and is
/// evicted the moment its `channels` set drains. The `account` field is
/// empty until the user authenticates and is set at most once per session
/// lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// The nick the user currently goes by; key into the session table.
    pub current_nick: String,

    /// Authenticated account name; empty until a successful login.
    pub account: String,

    /// Channels the user is known to occupy, from the bot's vantage point.
    pub channels: HashSet<String>,
}

impl Session {
    /// Create an empty session for `nick`.
    pub fn new(nick: impl Into<String>) -> Self {
        Self {
            current_nick: nick.into(),
            account: String::new(),
            channels: HashSet::new(),
        }
    }

    /// Whether this session has authenticated against an account.
    pub fn is_authenticated(&self) -> bool {
        !self.account.is_empty()
    }

    /// Whether the user is known to occupy `channel`.
    pub fn in_channel(&self, channel: &str) -> bool {
        self.channels.contains(channel)
    }
}
