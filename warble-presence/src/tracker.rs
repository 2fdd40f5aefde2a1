//! The presence tracker: nick-to-session bookkeeping against protocol events.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::event::Event;
use crate::session::Session;

#[derive(Debug, Default)]
struct TableState {
    /// The bot's own current nick; never tracked as a session subject.
    self_nick: String,
    /// Session table, keyed by each session's `current_nick`.
    sessions: HashMap<String, Session>,
}

impl TableState {
    /// Remove `channel` from every session, evicting any that drop to zero
    /// channels.
    fn drop_channel(&mut self, channel: &str) {
        self.sessions.retain(|_, session| {
            session.channels.remove(channel);
            !session.channels.is_empty()
        });
    }
}

/// Owns the session table and mutates it as protocol events arrive.
///
/// All operations are total: an event referencing an unknown nick or channel
/// is a safe no-op. The table is guarded by a single lock held only for the
/// duration of one operation, so concurrent event delivery cannot interleave
/// reads and writes to a single session. The raw table is never exposed;
/// accessors return clones.
#[derive(Debug)]
pub struct PresenceTracker {
    state: Mutex<TableState>,
}

impl PresenceTracker {
    /// Create a tracker for a bot currently known as `self_nick`.
    pub fn new(self_nick: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(TableState {
                self_nick: self_nick.into(),
                sessions: HashMap::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, TableState> {
        // A poisoned lock still holds a structurally sound table.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reset the table for a fresh network connection.
    ///
    /// Channel membership from a prior connection is stale, so every session
    /// is discarded, authenticated or not. `nick` is the nick the network
    /// assigned the bot.
    pub fn handle_connected(&self, nick: &str) {
        let mut state = self.state();
        state.self_nick = nick.to_string();
        let dropped = state.sessions.len();
        state.sessions.clear();
        tracing::debug!(nick, dropped, "presence table reset");
    }

    /// Record a join of `nick` into `channel`.
    ///
    /// A join by the bot itself clears `channel` from every session instead:
    /// the bot cannot enumerate existing occupants from its own join, so
    /// prior bookkeeping about that channel is untrustworthy until per-user
    /// joins are observed again.
    pub fn handle_join(&self, channel: &str, nick: &str) {
        let mut state = self.state();
        if nick == state.self_nick {
            state.drop_channel(channel);
            return;
        }
        state
            .sessions
            .entry(nick.to_string())
            .or_insert_with(|| Session::new(nick))
            .channels
            .insert(channel.to_string());
    }

    /// Record a part of `nick` from `channel`, evicting the session when its
    /// last channel is left.
    ///
    /// A part by the bot itself drops `channel` from every session: the bot
    /// can no longer observe it.
    pub fn handle_part(&self, channel: &str, nick: &str) {
        let mut state = self.state();
        if nick == state.self_nick {
            state.drop_channel(channel);
            return;
        }
        let now_empty = match state.sessions.get_mut(nick) {
            Some(session) => {
                session.channels.remove(channel);
                session.channels.is_empty()
            }
            None => return,
        };
        if now_empty {
            state.sessions.remove(nick);
        }
    }

    /// Carry a session over from `old` to `new`.
    ///
    /// The session value moves under the new key with `account` and
    /// `channels` intact; it is never recreated. Channel-less users are not
    /// tracked, so an unknown `old` nick is a no-op. A nick change by the
    /// bot itself only updates the recorded own nick.
    pub fn handle_nick(&self, old: &str, new: &str) {
        let mut state = self.state();
        if old == state.self_nick {
            state.self_nick = new.to_string();
            return;
        }
        if let Some(mut session) = state.sessions.remove(old) {
            session.current_nick = new.to_string();
            state.sessions.insert(new.to_string(), session);
        }
    }

    /// Evict the session of a user who disconnected from the network,
    /// regardless of how many channels it still occupied.
    pub fn handle_quit(&self, nick: &str) {
        let mut state = self.state();
        if state.sessions.remove(nick).is_some() {
            tracing::debug!(nick, "session evicted on quit");
        }
    }

    /// Route a protocol event to the matching handler.
    ///
    /// Command events belong to the command layer and are ignored here.
    pub fn handle_event(&self, event: &Event) {
        match event {
            Event::Connected { nick } => self.handle_connected(nick),
            Event::Join { channel, nick } => self.handle_join(channel, nick),
            Event::Part { channel, nick } => self.handle_part(channel, nick),
            Event::Nick { old, new } => self.handle_nick(old, new),
            Event::Quit { nick } => self.handle_quit(nick),
            Event::Command { .. } => {}
        }
    }

    /// The existing session for `nick`, or a fresh transient one.
    ///
    /// The transient session is not inserted into the table: read-only
    /// lookups for nicks the bot has never seen must not grow it.
    pub fn resolve_or_create(&self, nick: &str) -> Session {
        self.state()
            .sessions
            .get(nick)
            .cloned()
            .unwrap_or_else(|| Session::new(nick))
    }

    /// The tabled session for `nick`, if any. Read-only surface for other
    /// extensions.
    pub fn session_of(&self, nick: &str) -> Option<Session> {
        self.state().sessions.get(nick).cloned()
    }

    /// Bind `account` to the tabled session for `nick`.
    ///
    /// Returns whether a session was updated. An account binds at most once
    /// per session lifetime; a nick without a tabled session keeps nothing,
    /// reproducing the lazy-creation rule for logins outside any channel.
    pub fn set_account(&self, nick: &str, account: &str) -> bool {
        let mut state = self.state();
        match state.sessions.get_mut(nick) {
            Some(session) if session.account.is_empty() => {
                session.account = account.to_string();
                true
            }
            _ => false,
        }
    }

    /// The bot's own current nick.
    pub fn self_nick(&self) -> String {
        self.state().self_nick.clone()
    }

    /// Number of tabled sessions.
    pub fn len(&self) -> usize {
        self.state().sessions.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.state().sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> PresenceTracker {
        PresenceTracker::new("warble")
    }

    #[test]
    fn test_join_creates_session() {
        let tracker = tracker();
        tracker.handle_join("#a", "bob");

        let session = tracker.session_of("bob").unwrap();
        assert_eq!(session.current_nick, "bob");
        assert!(session.in_channel("#a"));
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_join_is_idempotent() {
        let tracker = tracker();
        tracker.handle_join("#a", "bob");
        let once = tracker.session_of("bob").unwrap();

        tracker.handle_join("#a", "bob");
        let twice = tracker.session_of("bob").unwrap();

        assert_eq!(once.channels, twice.channels);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_own_join_is_not_tracked() {
        let tracker = tracker();
        tracker.handle_join("#a", "warble");
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_part_evicts_on_last_channel() {
        let tracker = tracker();
        tracker.handle_join("#a", "bob");
        tracker.handle_part("#a", "bob");
        assert!(tracker.session_of("bob").is_none());
    }

    #[test]
    fn test_part_keeps_session_with_remaining_channels() {
        let tracker = tracker();
        tracker.handle_join("#a", "bob");
        tracker.handle_join("#b", "bob");
        tracker.handle_part("#a", "bob");

        let session = tracker.session_of("bob").unwrap();
        assert!(!session.in_channel("#a"));
        assert!(session.in_channel("#b"));
    }

    #[test]
    fn test_part_unknown_nick_is_noop() {
        let tracker = tracker();
        tracker.handle_part("#a", "ghost");
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_own_join_clears_channel_bookkeeping() {
        let tracker = tracker();
        tracker.handle_join("#a", "bob");
        tracker.handle_join("#b", "bob");
        tracker.handle_join("#a", "carol");

        // The bot joining #a invalidates everything it thought it knew
        // about #a's occupants.
        tracker.handle_join("#a", "warble");

        let bob = tracker.session_of("bob").unwrap();
        assert!(!bob.in_channel("#a"));
        assert!(bob.in_channel("#b"));
        assert!(tracker.session_of("carol").is_none());
    }

    #[test]
    fn test_own_part_drops_channel_for_everyone() {
        let tracker = tracker();
        tracker.handle_join("#a", "bob");
        tracker.handle_join("#b", "bob");
        tracker.handle_join("#a", "carol");

        tracker.handle_part("#a", "warble");

        assert!(tracker.session_of("carol").is_none());
        let bob = tracker.session_of("bob").unwrap();
        assert_eq!(bob.channels.len(), 1);
        assert!(bob.in_channel("#b"));
    }

    #[test]
    fn test_nick_change_preserves_account_and_channels() {
        let tracker = tracker();
        tracker.handle_join("#a", "alice");
        tracker.handle_join("#b", "alice");
        assert!(tracker.set_account("alice", "alice"));

        tracker.handle_nick("alice", "alice_away");

        assert!(tracker.session_of("alice").is_none());
        let session = tracker.session_of("alice_away").unwrap();
        assert_eq!(session.current_nick, "alice_away");
        assert_eq!(session.account, "alice");
        assert!(session.in_channel("#a"));
        assert!(session.in_channel("#b"));
    }

    #[test]
    fn test_nick_change_unknown_nick_is_noop() {
        let tracker = tracker();
        tracker.handle_nick("ghost", "phantom");
        assert!(tracker.is_empty());
        assert!(tracker.session_of("phantom").is_none());
    }

    #[test]
    fn test_own_nick_change_follows_self() {
        let tracker = tracker();
        tracker.handle_nick("warble", "warble2");
        assert_eq!(tracker.self_nick(), "warble2");

        // Joins under the new own nick are treated as the bot's own.
        tracker.handle_join("#a", "bob");
        tracker.handle_join("#a", "warble2");
        assert!(tracker.session_of("bob").is_none());
    }

    #[test]
    fn test_quit_evicts_multi_channel_session() {
        let tracker = tracker();
        tracker.handle_join("#a", "bob");
        tracker.handle_join("#b", "bob");

        tracker.handle_quit("bob");

        assert!(tracker.session_of("bob").is_none());
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_connected_resets_table_and_own_nick() {
        let tracker = tracker();
        tracker.handle_join("#a", "bob");
        assert!(tracker.set_account("bob", "bob"));

        tracker.handle_connected("warble3");

        assert!(tracker.is_empty());
        assert_eq!(tracker.self_nick(), "warble3");
        // Authentication does not survive a reconnect.
        assert!(tracker.session_of("bob").is_none());
    }

    #[test]
    fn test_resolve_or_create_does_not_insert() {
        let tracker = tracker();
        let session = tracker.resolve_or_create("bob");
        assert_eq!(session.current_nick, "bob");
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_resolve_or_create_returns_tabled_session() {
        let tracker = tracker();
        tracker.handle_join("#a", "bob");
        let session = tracker.resolve_or_create("bob");
        assert!(session.in_channel("#a"));
    }

    #[test]
    fn test_set_account_requires_tabled_session() {
        let tracker = tracker();
        assert!(!tracker.set_account("ghost", "ghost"));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_set_account_binds_once() {
        let tracker = tracker();
        tracker.handle_join("#a", "bob");

        assert!(tracker.set_account("bob", "bob"));
        assert!(!tracker.set_account("bob", "mallory"));
        assert_eq!(tracker.session_of("bob").unwrap().account, "bob");
    }

    #[test]
    fn test_sessions_exist_iff_channels_nonempty() {
        let tracker = tracker();
        let events = [
            Event::Join {
                channel: "#a".into(),
                nick: "bob".into(),
            },
            Event::Join {
                channel: "#b".into(),
                nick: "bob".into(),
            },
            Event::Join {
                channel: "#a".into(),
                nick: "carol".into(),
            },
            Event::Part {
                channel: "#b".into(),
                nick: "bob".into(),
            },
            Event::Part {
                channel: "#a".into(),
                nick: "carol".into(),
            },
            Event::Part {
                channel: "#a".into(),
                nick: "bob".into(),
            },
            Event::Join {
                channel: "#c".into(),
                nick: "dave".into(),
            },
        ];
        for event in &events {
            tracker.handle_event(event);

            for nick in ["bob", "carol", "dave"] {
                if let Some(session) = tracker.session_of(nick) {
                    assert!(
                        !session.channels.is_empty(),
                        "tabled session for {nick} has no channels"
                    );
                }
            }
        }

        assert_eq!(tracker.len(), 1);
        assert!(tracker.session_of("dave").is_some());
    }

    #[test]
    fn test_handle_event_ignores_commands() {
        let tracker = tracker();
        tracker.handle_event(&Event::Command {
            name: "login".into(),
            nick: "bob".into(),
            text: "bob hunter2".into(),
        });
        assert!(tracker.is_empty());
    }
}
