//! The auth gate: the `login` command and the permission predicate.

use std::sync::Arc;

use async_trait::async_trait;
use warble_common::{AuthConfig, Result};
use warble_presence::{Event, PresenceTracker, Session};

use crate::store::{CredentialStore, SqliteCredentialStore};

/// Reply sent when the credential store is unreachable; deliberately distinct
/// from the failed-login reply.
const TRANSIENT_ERROR_REPLY: &str = "login is temporarily unavailable, try again later";

/// Delivers directed replies back to the issuing user.
///
/// Implemented by the transport layer; replies are addressed to a nick.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Send `text` addressed to `nick`.
    async fn reply(&self, nick: &str, text: &str) -> anyhow::Result<()>;
}

/// Outcome of one login attempt, rendered into the user-visible reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The session already carries an account; nothing changed.
    AlreadyLoggedIn,
    /// The command text did not split into a username and a password.
    BadUsage,
    /// Credentials matched; the session now carries this account.
    LoggedIn(String),
    /// Unknown username or wrong password; the reply does not say which.
    Failed,
}

impl LoginOutcome {
    /// The reply sent back to the issuing user. `prefix` is the command
    /// prefix, used only to render usage help.
    pub fn reply_text(&self, prefix: &str) -> String {
        match self {
            Self::AlreadyLoggedIn => "you are already logged in".to_string(),
            Self::BadUsage => format!("usage: {prefix}login <username> <password>"),
            Self::LoggedIn(account) => format!("you are now logged in as {account}"),
            Self::Failed => "login failed".to_string(),
        }
    }
}

/// Authenticates users against the credential store and exposes the
/// permission predicate other extensions gate their commands on.
///
/// Presence state is never duplicated here; every identity question goes
/// through the tracker. The tracker's lock is held only inside individual
/// tracker calls, never across the store round trip.
pub struct AuthGate {
    tracker: Arc<PresenceTracker>,
    store: Arc<dyn CredentialStore>,
    prefix: String,
}

impl AuthGate {
    /// Command name recognized by [`dispatch`](Self::dispatch).
    pub const LOGIN_COMMAND: &'static str = "login";

    /// Create a gate over an existing tracker and store.
    pub fn new(
        tracker: Arc<PresenceTracker>,
        store: Arc<dyn CredentialStore>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            tracker,
            store,
            prefix: prefix.into(),
        }
    }

    /// Build a gate from configuration, opening the SQLite account store at
    /// the configured path.
    pub fn from_config(config: &AuthConfig, tracker: Arc<PresenceTracker>) -> Result<Self> {
        let store = SqliteCredentialStore::open(&config.database_path())?;
        Ok(Self::new(
            tracker,
            Arc::new(store),
            config.command_prefix.clone(),
        ))
    }

    /// Shared access to the tracker, for extensions that need the read-only
    /// session surface ([`PresenceTracker::session_of`]).
    pub fn tracker(&self) -> &Arc<PresenceTracker> {
        &self.tracker
    }

    /// Handle one `login` command issued by `nick` with raw trailing `text`.
    ///
    /// The store round trip happens with no session-table lock held; the
    /// result is applied afterwards through [`PresenceTracker::set_account`].
    /// Store failures propagate as errors and are never folded into
    /// [`LoginOutcome::Failed`].
    pub async fn handle_login(&self, nick: &str, text: &str) -> Result<LoginOutcome> {
        let session = self.tracker.resolve_or_create(nick);
        if session.is_authenticated() {
            return Ok(LoginOutcome::AlreadyLoggedIn);
        }

        let Some((username, password)) = split_credentials(text) else {
            return Ok(LoginOutcome::BadUsage);
        };

        match self.store.verify(username, password).await? {
            Some(account) => {
                let retained = self.tracker.set_account(nick, &account.username);
                if !retained {
                    // Login from a nick with no tracked channels: accepted,
                    // but there is no tabled session to carry the account.
                    tracing::debug!(
                        nick,
                        account = %account.username,
                        "login accepted without a tabled session"
                    );
                }
                tracing::info!(nick, account = %account.username, "login succeeded");
                Ok(LoginOutcome::LoggedIn(account.username))
            }
            None => {
                tracing::info!(nick, "login failed");
                Ok(LoginOutcome::Failed)
            }
        }
    }

    /// Whether `session` may perform an action gated on `perm`.
    ///
    /// An unauthenticated session is always denied, without a store round
    /// trip.
    pub async fn check_permission(&self, perm: &str, session: &Session) -> Result<bool> {
        if !session.is_authenticated() {
            return Ok(false);
        }
        let permissions = self.store.permissions_of(&session.account).await?;
        Ok(permissions.contains(perm))
    }

    /// Route one protocol event.
    ///
    /// Presence events go to the tracker; the `login` command is handled
    /// here, with the outcome (or a transient-error notice) delivered
    /// through `responder`. Commands other than `login` are not ours and are
    /// ignored.
    pub async fn dispatch(&self, event: &Event, responder: &dyn Responder) {
        match event {
            Event::Command { name, nick, text } if name == Self::LOGIN_COMMAND => {
                let reply = match self.handle_login(nick, text).await {
                    Ok(outcome) => outcome.reply_text(&self.prefix),
                    Err(e) => {
                        tracing::error!(nick = %nick, error = %e, "credential store query failed");
                        TRANSIENT_ERROR_REPLY.to_string()
                    }
                };
                if let Err(e) = responder.reply(nick, &reply).await {
                    tracing::error!(nick = %nick, error = %e, "failed to deliver login reply");
                }
            }
            Event::Command { .. } => {}
            presence => self.tracker.handle_event(presence),
        }
    }
}

/// Split raw command text on the first whitespace run into
/// `(username, password)`. `None` unless both parts are non-empty.
fn split_credentials(text: &str) -> Option<(&str, &str)> {
    let text = text.trim();
    let mut parts = text.splitn(2, char::is_whitespace);
    let username = parts.next().unwrap_or("");
    let password = parts.next().map(str::trim_start).unwrap_or("");
    if username.is_empty() || password.is_empty() {
        return None;
    }
    Some((username, password))
}
