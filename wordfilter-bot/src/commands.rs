//! Administrative command table
//!
//! Each command is registered once with a fixed handler signature. Name
//! problems surface when the table is built, never at dispatch time.
//!
//! Authorization happens before dispatch; `admin_only` is informational
//! (shown in help output).

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use serde::Serialize;
use tracing::{debug, info};
use wordfilter_core::{split_word_list, FilterState, PrincipalId};

use crate::error::{CommandError, RegistryError};

/// Handler signature shared by every command.
pub type CommandHandler = fn(&CommandContext<'_>, &CommandArgs) -> Result<Reply, CommandError>;

/// One registered command.
#[derive(Clone)]
pub struct CommandSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub usage: &'static str,
    pub admin_only: bool,
    pub handler: CommandHandler,
}

/// What a handler may touch.
pub struct CommandContext<'a> {
    pub state: &'a FilterState,
    pub table: &'a CommandTable,
}

/// Named string arguments as delivered by the platform.
#[derive(Debug, Clone, Default)]
pub struct CommandArgs {
    values: HashMap<String, String>,
}

impl CommandArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    /// Optional argument; blank values count as absent.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn require(&self, name: &'static str) -> Result<&str, CommandError> {
        self.get(name).ok_or(CommandError::MissingArgument(name))
    }

    fn principal(&self, name: &'static str) -> Result<Option<PrincipalId>, CommandError> {
        self.get(name)
            .map(|raw| parse_principal(name, raw))
            .transpose()
    }
}

impl From<HashMap<String, String>> for CommandArgs {
    fn from(values: HashMap<String, String>) -> Self {
        Self { values }
    }
}

/// Plain-text reply for the administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub text: String,
}

impl Reply {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Registry mapping command names to handlers.
#[derive(Default)]
pub struct CommandTable {
    commands: BTreeMap<&'static str, CommandSpec>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with every built-in command registered.
    pub fn builtin() -> Result<Self, RegistryError> {
        let mut table = Self::new();
        for spec in builtin_specs() {
            table.register(spec)?;
        }
        Ok(table)
    }

    pub fn register(&mut self, spec: CommandSpec) -> Result<(), RegistryError> {
        if spec.name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if !spec
            .name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(RegistryError::InvalidName(spec.name.to_string()));
        }
        if self.commands.contains_key(spec.name) {
            return Err(RegistryError::Duplicate(spec.name.to_string()));
        }
        self.commands.insert(spec.name, spec);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(name)
    }

    pub fn specs(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Run `name` against `state`.
    pub fn dispatch(
        &self,
        state: &FilterState,
        name: &str,
        args: &CommandArgs,
    ) -> Result<Reply, CommandError> {
        let name = name.trim().trim_start_matches('/');
        let spec = self
            .get(name)
            .ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?;

        debug!(command = spec.name, "Dispatching command");
        let ctx = CommandContext { state, table: self };
        (spec.handler)(&ctx, args)
    }
}

fn builtin_specs() -> Vec<CommandSpec> {
    vec![
        CommandSpec {
            name: "filter",
            description: "Sets global filter words",
            usage: "/filter [words] - words are comma-separated",
            admin_only: true,
            handler: handle_filter,
        },
        CommandSpec {
            name: "ufilter",
            description: "Sets filter words for a specific user",
            usage: "/ufilter [user] [words] - words are comma-separated",
            admin_only: true,
            handler: handle_ufilter,
        },
        CommandSpec {
            name: "fwords",
            description: "Displays the current global filter words",
            usage: "/fwords",
            admin_only: false,
            handler: handle_fwords,
        },
        CommandSpec {
            name: "uwords",
            description: "Displays filter words for all users or a specific user",
            usage: "/uwords [user]",
            admin_only: true,
            handler: handle_uwords,
        },
        CommandSpec {
            name: "reset",
            description: "Clears all global filter words",
            usage: "/reset",
            admin_only: true,
            handler: handle_reset,
        },
        CommandSpec {
            name: "ureset",
            description: "Clears filters for specific users or all users",
            usage: "/ureset [users]",
            admin_only: true,
            handler: handle_ureset,
        },
        CommandSpec {
            name: "similarity",
            description: "Changes or displays the similarity threshold (0-100)",
            usage: "/similarity [threshold]",
            admin_only: true,
            handler: handle_similarity,
        },
        CommandSpec {
            name: "help",
            description: "Shows all available commands and their descriptions",
            usage: "/help",
            admin_only: false,
            handler: handle_help,
        },
    ]
}

/// Chat mention for a principal.
pub fn mention(id: PrincipalId) -> String {
    format!("<@{}>", id)
}

fn parse_principal(name: &'static str, raw: &str) -> Result<PrincipalId, CommandError> {
    raw.parse().map_err(|_| CommandError::InvalidArgument {
        name,
        reason: format!("'{}' is not a user id or mention", raw),
    })
}

fn handle_filter(ctx: &CommandContext<'_>, args: &CommandArgs) -> Result<Reply, CommandError> {
    let words = split_word_list(args.require("words")?);
    ctx.state.set_global(&words);
    let global = ctx.state.global();

    info!(count = global.len(), "Global filter words updated");
    Ok(Reply::new(format!(
        "Global filter words updated to: {}",
        global.joined()
    )))
}

fn handle_ufilter(ctx: &CommandContext<'_>, args: &CommandArgs) -> Result<Reply, CommandError> {
    let user = parse_principal("user", args.require("user")?)?;
    let words = split_word_list(args.get("words").unwrap_or_default());
    ctx.state.set_user(user, &words);
    let list = ctx.state.user(user);

    info!(user = %user, count = list.len(), "User filter words updated");
    Ok(Reply::new(format!(
        "Custom filter words for {} updated to: {}",
        mention(user),
        list.joined()
    )))
}

fn handle_fwords(ctx: &CommandContext<'_>, _args: &CommandArgs) -> Result<Reply, CommandError> {
    let global = ctx.state.global();
    if global.is_empty() {
        Ok(Reply::new("No global filter words set."))
    } else {
        Ok(Reply::new(format!("Global filter words: {}", global.joined())))
    }
}

fn handle_uwords(ctx: &CommandContext<'_>, args: &CommandArgs) -> Result<Reply, CommandError> {
    if let Some(user) = args.principal("user")? {
        let list = ctx.state.user(user);
        return Ok(if list.is_empty() {
            Reply::new(format!("No filter words set for {}.", mention(user)))
        } else {
            Reply::new(format!("Filter words for {}: {}", mention(user), list.joined()))
        });
    }

    let users = ctx.state.users();
    if users.is_empty() {
        return Ok(Reply::new("No user-specific filter words set."));
    }

    let lines: Vec<String> = users
        .iter()
        .map(|(id, list)| {
            if list.is_empty() {
                format!("{}: No words set", mention(*id))
            } else {
                format!("{}: {}", mention(*id), list.joined())
            }
        })
        .collect();
    Ok(Reply::new(format!(
        "User-specific filters:\n{}",
        lines.join("\n")
    )))
}

fn handle_reset(ctx: &CommandContext<'_>, _args: &CommandArgs) -> Result<Reply, CommandError> {
    ctx.state.clear_global();
    info!("Global filter words reset");
    Ok(Reply::new("Global filter words have been reset."))
}

fn handle_ureset(ctx: &CommandContext<'_>, args: &CommandArgs) -> Result<Reply, CommandError> {
    let Some(raw) = args.get("users") else {
        ctx.state.clear_all_users();
        info!("All user filter words reset");
        return Ok(Reply::new("All user-specific filter words have been reset."));
    };

    let principals = raw
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| parse_principal("users", s))
        .collect::<Result<Vec<_>, _>>()?;

    let removed = ctx.state.clear_users(&principals);
    if removed.is_empty() {
        return Ok(Reply::new("No valid users found to reset filters for."));
    }

    info!(count = removed.len(), "User filter words reset");
    let mentions: Vec<String> = removed.into_iter().map(mention).collect();
    Ok(Reply::new(format!(
        "Filter words for the specified users ({}) have been reset.",
        mentions.join(", ")
    )))
}

fn handle_similarity(
    ctx: &CommandContext<'_>,
    args: &CommandArgs,
) -> Result<Reply, CommandError> {
    let Some(raw) = args.get("threshold") else {
        return Ok(Reply::new(format!(
            "Current similarity threshold is {}.",
            ctx.state.threshold()
        )));
    };

    let value: i64 = raw.parse().map_err(|_| CommandError::InvalidArgument {
        name: "threshold",
        reason: format!("'{}' is not an integer", raw),
    })?;
    ctx.state.set_threshold(value)?;

    info!(threshold = value, "Similarity threshold updated");
    Ok(Reply::new(format!(
        "Similarity threshold updated to {}.",
        ctx.state.threshold()
    )))
}

fn handle_help(ctx: &CommandContext<'_>, _args: &CommandArgs) -> Result<Reply, CommandError> {
    let mut text = String::from("Available commands:\n");
    for spec in ctx.table.specs() {
        let _ = write!(text, "\n{}\n  {}", spec.usage, spec.description);
        if spec.admin_only {
            text.push_str(" (Admin only)");
        }
    }
    Ok(Reply::new(text))
}
