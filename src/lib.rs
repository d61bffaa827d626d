//! Chatter Engine — the text core of a timeline chatter bot.
//!
//! Learns a bounded trigram model from the statuses it reads, and decides
//! per inbound event whether to stay quiet, reply, greet a new follower, or
//! post something of its own. Transport and tokenization are supplied by
//! the host.

pub mod core;
pub mod schema;
