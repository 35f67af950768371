//! Command parsing for incoming text messages

/// Commands understood by the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Generate,
    Help,
    Stats,
    Unknown(String),
}

/// Parse the first word of a message. Returns `None` for plain text.
///
/// Accepts the `/command@BotName` form Telegram uses in menus.
pub fn parse_command(text: &str) -> Option<Command> {
    let first = text.split_whitespace().next()?;
    let name = first.strip_prefix('/')?;
    let name = name.split('@').next().unwrap_or(name);

    let command = match name.to_ascii_lowercase().as_str() {
        "start" => Command::Start,
        "generate" => Command::Generate,
        "help" => Command::Help,
        "stats" => Command::Stats,
        _ => Command::Unknown(name.to_string()),
    };
    Some(command)
}
