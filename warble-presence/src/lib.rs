//! Warble Presence - who is in which channel, under which nick.
//!
//! This crate owns the session table: the mapping from a user's current nick
//! to their tracked state (channels occupied, authenticated account). It
//! consumes the protocol event stream and keeps the table consistent against
//! arbitrary interleavings of joins, parts, nick changes, and quits, without
//! leaking sessions for departed users.
//!
//! The auth layer builds on top of this crate; presence knows nothing about
//! credentials beyond carrying the `account` field.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod event;
pub mod session;
pub mod tracker;

pub use event::Event;
pub use session::Session;
pub use tracker::PresenceTracker;
