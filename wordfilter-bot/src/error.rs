//! Error types for the bot

use thiserror::Error;
use wordfilter_core::FilterError;

/// Errors returned to the administrator who issued a command.
///
/// None of these change the filter state.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("missing required argument '{0}'")]
    MissingArgument(&'static str),

    #[error("invalid value for '{name}': {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Errors raised while building the command table
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("command name must not be empty")]
    EmptyName,

    #[error("command name must be lowercase ascii: {0}")]
    InvalidName(String),

    #[error("command already registered: {0}")]
    Duplicate(String),
}

/// Failure to carry out a side effect on the chat platform
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("missing permission: {0}")]
    Forbidden(String),

    #[error("output channel closed")]
    ChannelClosed,
}

/// Startup configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Errors that stop the event loop
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("output writer task failed: {0}")]
    Writer(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
