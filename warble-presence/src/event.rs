//! Protocol events consumed by the Warble extensions.

use serde::{Deserialize, Serialize};

/// A parsed protocol event, as delivered by the transport layer.
///
/// Transport parsing and command recognition are external concerns; by the
/// time an event reaches this crate it carries plain string fields and the
/// originator's nick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// The bot (re)established its own presence on the network, under `nick`.
    Connected { nick: String },

    /// A user (possibly the bot itself) joined a channel.
    Join { channel: String, nick: String },

    /// A user (possibly the bot itself) left a channel.
    Part { channel: String, nick: String },

    /// A user changed nicknames.
    Nick { old: String, new: String },

    /// A user disconnected from the network.
    Quit { nick: String },

    /// A prefixed command addressed to the bot, with its raw trailing text.
    Command {
        name: String,
        nick: String,
        text: String,
    },
}
