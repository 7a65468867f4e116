//! CLI surface line grammar: the interactive shell itself is an
//! external collaborator and out of scope here, but the commands it sends
//! over stdin have a fixed shape this crate owns as a parseable contract.

/// One parsed CLI line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// `talk <agent> <message>`.
    Talk {
        /// Target agent name.
        agent: String,
        /// The message, everything after `<agent> ` verbatim.
        message: String,
    },
    /// `god <command>`.
    God {
        /// The raw authority command string, passed through untouched.
        command: String,
    },
    /// An advisory-handoff JSON line.
    Handoff(String),
    /// A world-memory-request JSON line.
    WorldMemoryRequest(String),
    /// `exit`.
    Exit,
}

fn looks_like_json(trimmed: &str) -> bool {
    trimmed.starts_with('{')
}

/// Parse one raw CLI line per 's grammar. JSON lines are routed by
/// shape inspection only (cheap prefix check); full schema validation
/// happens downstream in `parse_handoff_line`/`parse_world_memory_request_line`.
pub fn parse_cli_line(line: &str) -> Option<CliCommand> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed == "exit" {
        return Some(CliCommand::Exit);
    }
    if looks_like_json(trimmed) {
        return Some(if trimmed.contains("world-memory-request") {
                CliCommand::WorldMemoryRequest(trimmed.to_string())
            } else {
                CliCommand::Handoff(trimmed.to_string())
            });
    }
    if let Some(rest) = trimmed.strip_prefix("talk ") {
        let mut parts = rest.splitn(2, ' ');
        let agent = parts.next()?.to_string();
        let message = parts.next().unwrap_or("").to_string();
        if agent.is_empty() || message.is_empty() {
            return None;
        }
        return Some(CliCommand::Talk { agent, message });
    }
    if let Some(rest) = trimmed.strip_prefix("god ") {
        if rest.is_empty() {
            return None;
        }
        return Some(CliCommand::God { command: rest.to_string() });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_talk_with_a_multi_word_message() {
        let cmd = parse_cli_line("talk mara hello there, friend").unwrap();
        assert_eq!(
            cmd,
            CliCommand::Talk {
                agent: "mara".to_string(),
                message: "hello there, friend".to_string(),
            }
        );
    }

    #[test]
    fn parses_god_command() {
        let cmd = parse_cli_line("god mayor talk riverbend").unwrap();
        assert_eq!(
            cmd,
            CliCommand::God {
                command: "mayor talk riverbend".to_string(),
            }
        );
    }

    #[test]
    fn routes_json_by_content() {
        assert!(matches!(
                parse_cli_line(r#"{"type":"world-memory-request.v1"}"#),
                Some(CliCommand::WorldMemoryRequest(_))
            ));
        assert!(matches!(
                parse_cli_line(r#"{"schemaVersion":"execution-handoff.v1"}"#),
                Some(CliCommand::Handoff(_))
            ));
    }

    #[test]
    fn exit_and_blank_and_garbage() {
        assert_eq!(parse_cli_line("exit"), Some(CliCommand::Exit));
        assert_eq!(parse_cli_line(" "), None);
        assert_eq!(parse_cli_line("talk"), None);
        assert_eq!(parse_cli_line("talk mara"), None);
        assert_eq!(parse_cli_line("gibberish"), None);
    }
}
