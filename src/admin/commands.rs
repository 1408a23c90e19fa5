use std::time::Duration;

use crate::domain::payload::escape_html;
use crate::domain::{SortMode, Source};
use crate::errors::RelayError;
use crate::services::SourceReport;

pub const DENIED: &str = "❌ You are not authorized to use this command.";
pub const UNKNOWN: &str = "❓ Unknown command. Use /help to see available commands.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Help,
    Add { name: String, sort_mode: SortMode },
    Remove { name: String },
    Reset { name: String },
    List,
    Status,
    /// Known command with missing or bad arguments; carries the reply
    Invalid(String),
    Unknown(String),
}

impl AdminCommand {
    /// Commands that anyone may run
    pub fn is_public(&self) -> bool {
        matches!(self, AdminCommand::Help)
    }
}

/// Parse a chat message. Returns `None` for anything that is not a slash command.
pub fn parse_command(text: &str) -> Option<AdminCommand> {
    let text = text.trim();
    let rest = text.strip_prefix('/')?;

    let mut parts = rest.split_whitespace();
    let head = parts.next().unwrap_or_default();
    // "/add@my_bot python" in group chats
    let command = head.split('@').next().unwrap_or_default().to_lowercase();
    let args: Vec<&str> = parts.collect();

    let parsed = match command.as_str() {
        "start" | "help" => AdminCommand::Help,
        "list" => AdminCommand::List,
        "status" => AdminCommand::Status,
        "add" => match args.as_slice() {
            [name] => AdminCommand::Add {
                name: name.to_string(),
                sort_mode: SortMode::default(),
            },
            [name, sort] => match sort.parse::<SortMode>() {
                Ok(sort_mode) => AdminCommand::Add {
                    name: name.to_string(),
                    sort_mode,
                },
                Err(e) => AdminCommand::Invalid(format!("❌ {}", escape_html(&e))),
            },
            _ => AdminCommand::Invalid(usage("add", " [new|hot|top-day|top-week|top-month]")),
        },
        "remove" => match args.as_slice() {
            [name] => AdminCommand::Remove {
                name: name.to_string(),
            },
            _ => AdminCommand::Invalid(usage("remove", "")),
        },
        "reset" => match args.as_slice() {
            [name] => AdminCommand::Reset {
                name: name.to_string(),
            },
            _ => AdminCommand::Invalid(usage("reset", "")),
        },
        other => AdminCommand::Unknown(other.to_string()),
    };

    Some(parsed)
}

fn usage(command: &str, extra: &str) -> String {
    format!(
        "❌ Usage: <code>/{command} subreddit_name{extra}</code>\n\nExample: <code>/{command} python</code>"
    )
}

pub fn help_text(poll_interval: Duration) -> String {
    format!(
        "🤖 <b>Reddit to Telegram Relay</b>\n\n\
         This bot watches subreddits and forwards new posts to this chat.\n\n\
         <b>Available Commands:</b>\n\
         /start or /help - Show this help message\n\
         /add &lt;subreddit&gt; [sort] - Subscribe to a subreddit\n\
         /remove &lt;subreddit&gt; - Unsubscribe from a subreddit\n\
         /reset &lt;subreddit&gt; - Forget what was sent and fetch recent posts again\n\
         /list - Show all subscribed subreddits\n\
         /status - Show the last poll result per subreddit\n\n\
         <b>Sort modes:</b> new (default), hot, top-day, top-week, top-month\n\n\
         <b>Example:</b>\n\
         <code>/add python</code> - Subscribe to r/python\n\
         <code>/add rust top-week</code> - Top weekly posts of r/rust\n\n\
         <b>Note:</b> Only the bot admin can use these commands.\n\
         The bot checks for new posts every {} seconds.",
        poll_interval.as_secs()
    )
}

pub fn added(source: &Source) -> String {
    format!(
        "✅ Successfully subscribed to r/{} ({})",
        source.name, source.sort_mode
    )
}

pub fn removed(name: &str) -> String {
    format!("✅ Unsubscribed from r/{}", escape_html(name))
}

pub fn reset_done(name: &str) -> String {
    format!(
        "✅ Reset r/{}. Recent posts will be sent on the next poll.",
        escape_html(name)
    )
}

pub fn format_list(sources: &[Source]) -> String {
    if sources.is_empty() {
        return "ℹ️ No subreddit subscriptions yet.\n\n\
                Use <code>/add subreddit_name</code> to subscribe to a subreddit."
            .to_string();
    }

    let mut text = format!("📋 <b>Subscribed Subreddits ({}):</b>\n\n", sources.len());
    let lines: Vec<String> = sources
        .iter()
        .map(|s| format!("• r/{} ({})", s.name, s.sort_mode))
        .collect();
    text.push_str(&lines.join("\n"));
    text
}

pub fn format_status(reports: &[SourceReport]) -> String {
    if reports.is_empty() {
        return "ℹ️ No subreddit subscriptions yet.".to_string();
    }

    let mut text = String::from("📊 <b>Status</b>\n");
    for report in reports {
        let last = match &report.cursor {
            Some(cursor) => format!(
                "last sent {} at {}",
                escape_html(&cursor.last_item_id),
                cursor.last_seen_time.format("%Y-%m-%d %H:%M UTC")
            ),
            None => "nothing sent yet".to_string(),
        };
        text.push_str(&format!(
            "\n<b>r/{}</b> ({})\n  {}\n  {}\n",
            report.source.name,
            report.source.sort_mode,
            escape_html(&report.status.describe()),
            last
        ));
    }
    text
}

/// Reply for a failed registry call
pub fn error_reply(err: &RelayError, name: &str) -> String {
    let name = escape_html(name);
    match err {
        RelayError::Unauthorized => DENIED.to_string(),
        RelayError::SourceAlreadyExists(n) => format!("ℹ️ Already subscribed to r/{}", n),
        RelayError::SourceNotRegistered(n) => format!("ℹ️ Not subscribed to r/{}", n),
        RelayError::InvalidSourceName(_) => format!("❌ \"{}\" is not a valid subreddit name.", name),
        RelayError::SourceNotFound(_) => format!("❌ Subreddit r/{} not found.", name),
        RelayError::ProviderUnavailable(_) => {
            format!("❌ Could not reach Reddit to check r/{}. Try again later.", name)
        }
        other => format!("❌ {}", escape_html(&other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Cursor, SourceStatus};
    use chrono::DateTime;

    #[test]
    fn test_non_commands_are_ignored() {
        assert_eq!(parse_command("hello there"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn test_parse_add() {
        assert_eq!(
            parse_command("/add python"),
            Some(AdminCommand::Add {
                name: "python".to_string(),
                sort_mode: SortMode::New
            })
        );
        assert_eq!(
            parse_command("/add@relay_bot rust top-week"),
            Some(AdminCommand::Add {
                name: "rust".to_string(),
                sort_mode: SortMode::TopWeekly
            })
        );
    }

    #[test]
    fn test_parse_bad_arguments() {
        assert!(matches!(parse_command("/add"), Some(AdminCommand::Invalid(msg)) if msg.contains("Usage")));
        assert!(matches!(parse_command("/add rust sideways"), Some(AdminCommand::Invalid(_))));
        assert!(matches!(parse_command("/remove"), Some(AdminCommand::Invalid(_))));
        assert!(matches!(parse_command("/reset a b"), Some(AdminCommand::Invalid(_))));
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_command("/start"), Some(AdminCommand::Help));
        assert_eq!(parse_command("/HELP"), Some(AdminCommand::Help));
        assert_eq!(parse_command("/list"), Some(AdminCommand::List));
        assert_eq!(parse_command("/status"), Some(AdminCommand::Status));
        assert_eq!(
            parse_command("/frobnicate"),
            Some(AdminCommand::Unknown("frobnicate".to_string()))
        );
    }

    #[test]
    fn test_only_help_is_public() {
        assert!(AdminCommand::Help.is_public());
        assert!(!AdminCommand::List.is_public());
    }

    #[test]
    fn test_help_mentions_interval() {
        assert!(help_text(Duration::from_secs(90)).contains("every 90 seconds"));
    }

    #[test]
    fn test_format_list() {
        assert!(format_list(&[]).contains("No subreddit subscriptions"));

        let sources = vec![
            Source::new("python".to_string(), SortMode::New),
            Source::new("rust".to_string(), SortMode::Hot),
        ];
        let text = format_list(&sources);
        assert!(text.contains("(2)"));
        assert!(text.contains("• r/python (new)"));
        assert!(text.contains("• r/rust (hot)"));
    }

    #[test]
    fn test_format_status() {
        let at = DateTime::from_timestamp(1_728_000_000, 0).unwrap();
        let reports = vec![SourceReport {
            source: Source::new("python".to_string(), SortMode::New),
            cursor: Some(Cursor::new("python".to_string(), "t3".to_string(), at)),
            status: SourceStatus::NotFound { at },
        }];

        let text = format_status(&reports);
        assert!(text.contains("<b>r/python</b>"));
        assert!(text.contains("last sent t3"));
        assert!(text.contains("not found upstream"));
    }

    #[test]
    fn test_error_replies() {
        assert_eq!(error_reply(&RelayError::Unauthorized, "x"), DENIED);
        assert_eq!(
            error_reply(&RelayError::SourceNotRegistered("rust".to_string()), "rust"),
            "ℹ️ Not subscribed to r/rust"
        );
        assert!(error_reply(&RelayError::InvalidSourceName("<b>".to_string()), "<b>")
            .contains("&lt;b&gt;"));
    }
}
