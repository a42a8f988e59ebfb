//! marquee library
//!
//! Movie night for Discord guilds: members suggest titles, a moderator opens a
//! reaction vote over the list, and the winner becomes the next movie. Votes
//! survive restarts by replaying the reactions on the posted poll.

pub mod channels;
pub mod cli;
pub mod commands;
pub mod config;
pub mod election;
pub mod logging;
pub mod suggestions;
