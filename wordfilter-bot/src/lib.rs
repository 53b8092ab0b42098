//! Wordfilter Moderation Bot
//!
//! Glue between a chat platform and `wordfilter-core`: inbound messages are
//! evaluated and deleted on a match, administrative commands edit the shared
//! filter state.
//!
//! ## Module Structure
//!
//! - `config` - Startup configuration (seed words, threshold, own id)
//! - `commands` - Command table mapping names to typed handlers
//! - `pipeline` - Per-message moderation stage and platform actions trait
//! - `runtime` - Line-delimited JSON event loop over stdin/stdout
//! - `error` - Error types

pub mod commands;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod runtime;

pub use commands::{CommandArgs, CommandTable, Reply};
pub use config::BotConfig;
pub use pipeline::{InboundMessage, MessageActions, ModerationPipeline, Outcome};
