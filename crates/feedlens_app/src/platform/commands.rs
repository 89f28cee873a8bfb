//! User actions typed on stdin.

use feedlens_core::Msg;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    /// Show or hide an item's details panel.
    Toggle(String),
    /// Drop the negative marker of an item.
    Revoke(String),
    Quit,
}

impl UserCommand {
    /// `None` for blank lines; `Err` carries a usage hint.
    pub fn parse(line: &str) -> Option<Result<Self, String>> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        let parsed = match (verb, rest) {
            ("quit" | "exit", _) => Ok(UserCommand::Quit),
            ("toggle", key) if !key.is_empty() => Ok(UserCommand::Toggle(key.to_string())),
            ("revoke", key) if !key.is_empty() => Ok(UserCommand::Revoke(key.to_string())),
            ("toggle" | "revoke", _) => Err(format!("usage: {verb} <item key>")),
            _ => Err(format!("unknown command {verb:?}; try toggle, revoke or quit")),
        };
        Some(parsed)
    }

    /// The observer message for this command; `None` for `Quit`.
    pub fn into_msg(self) -> Option<Msg> {
        match self {
            UserCommand::Toggle(key) => Some(Msg::DetailsToggled { key }),
            UserCommand::Revoke(key) => Some(Msg::RevokeNegativeClicked { key }),
            UserCommand::Quit => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_item_commands() {
        assert_eq!(
            UserCommand::parse("toggle urn:li:activity:1\n"),
            Some(Ok(UserCommand::Toggle("urn:li:activity:1".to_string())))
        );
        assert_eq!(
            UserCommand::parse("  revoke   sha:0011 "),
            Some(Ok(UserCommand::Revoke("sha:0011".to_string())))
        );
        assert_eq!(UserCommand::parse("quit"), Some(Ok(UserCommand::Quit)));
    }

    #[test]
    fn blank_and_bad_lines() {
        assert_eq!(UserCommand::parse("   "), None);
        assert!(matches!(UserCommand::parse("toggle"), Some(Err(_))));
        assert!(matches!(UserCommand::parse("paint all"), Some(Err(_))));
    }

    #[test]
    fn commands_map_to_messages() {
        assert_eq!(
            UserCommand::Revoke("k".to_string()).into_msg(),
            Some(Msg::RevokeNegativeClicked {
                key: "k".to_string()
            })
        );
        assert_eq!(UserCommand::Quit.into_msg(), None);
    }
}
