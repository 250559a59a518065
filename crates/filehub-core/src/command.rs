//! Slash commands. `/cmd@botname` is accepted; arguments are whitespace-separated.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Data,
    Deepseek,
    Settings,
    SetDesc(Vec<String>),
}

impl Command {
    /// `None` for plain text and for commands the bot does not know.
    pub fn parse(text: &str) -> Option<Command> {
        let rest = text.trim_start().strip_prefix('/')?;
        let mut words = rest.split_whitespace();
        let head = words.next()?;
        let name = head.split_once('@').map_or(head, |(name, _bot)| name);
        let cmd = match name.to_ascii_lowercase().as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "data" => Command::Data,
            "deepseek" => Command::Deepseek,
            "settings" => Command::Settings,
            "setdesc" => Command::SetDesc(words.map(str::to_string).collect()),
            _ => return None,
        };
        Some(cmd)
    }

    /// True when `text` looks like any slash command, known or not.
    pub fn is_command(text: &str) -> bool {
        text.trim_start()
            .strip_prefix('/')
            .is_some_and(|rest| rest.chars().next().is_some_and(|c| !c.is_whitespace()))
    }
}
