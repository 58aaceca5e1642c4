//! Command types and definitions.

use std::fmt;

use serde_json::Value;

use crate::channel::Activity;
use crate::charts::{ChartKind, SHOW_CHART_ACTION, SHOW_CHARTS_MENU_ACTION};

/// Usage line for the custom chart command.
pub const CUSTOM_CHART_USAGE: &str =
    "Usage: /customchart <bar|line|pie> <title> | <label>=<value>, <label>=<value>, ...";

/// Usage line for the chart command.
pub const CHART_USAGE: &str = "Usage: chart [bar|line|pie]";

/// Words that make any message show the user's account information.
const INFO_KEYWORDS: [&str; 4] = ["account", "credentials", "cuenta", "credenciales"];

/// Arguments for a chart built from user-supplied data.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomChartArgs {
    pub kind: ChartKind,
    pub title: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// Available bot commands.
#[derive(Debug, Clone, PartialEq)]
pub enum BotCommand {
    /// Show the sender's name, id and directory e-mail.
    Info,

    /// Clear the conversation's message counter.
    Reset,

    /// Greet the user and list the commands.
    Greeting,

    /// Send one of the sample charts.
    Chart(ChartKind),

    /// Offer the sample charts as card buttons.
    ChartsMenu,

    /// Send a chart built from the message's data.
    CustomChart(CustomChartArgs),

    /// Show how many messages this conversation has seen.
    Count,

    /// A recognised command with malformed arguments.
    Usage(&'static str),

    /// Anything else; replied to verbatim.
    Echo(String),
}

impl BotCommand {
    /// Parses a command from a message text and optional card submit payload.
    ///
    /// Never fails: unrecognised input becomes [`BotCommand::Echo`].
    #[must_use]
    pub fn parse(text: &str, value: Option<&Value>) -> Self {
        if let Some(command) = value.and_then(Self::parse_submit) {
            return command;
        }

        let original = text.trim();
        let lowered = original.to_lowercase();

        let (cmd, args) = match lowered.split_once(char::is_whitespace) {
            Some((cmd, args)) => (cmd, Some(args.trim())),
            None => (lowered.as_str(), None),
        };

        match (cmd, args) {
            ("info" | "/info", None) => return Self::Info,
            ("/reset", None) => return Self::Reset,
            ("hi" | "hello" | "hola" | "help" | "/help", None) => return Self::Greeting,
            ("charts" | "/charts", None) => return Self::ChartsMenu,
            ("count" | "/count", None) => return Self::Count,
            ("chart" | "/chart" | "grafica" | "gráfica", args) => {
                return args
                    .filter(|a| !a.is_empty())
                    .map_or(Some(Self::Chart(ChartKind::default())), |a| {
                        a.parse().ok().map(Self::Chart)
                    })
                    .unwrap_or(Self::Usage(CHART_USAGE));
            }
            ("/customchart", _) => {
                // Parse from the original text so titles and labels keep their case.
                let raw_args = original
                    .split_once(char::is_whitespace)
                    .map_or("", |(_, a)| a.trim());
                return Self::parse_custom_chart(raw_args)
                    .map_or(Self::Usage(CUSTOM_CHART_USAGE), Self::CustomChart);
            }
            _ => {}
        }

        if INFO_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            return Self::Info;
        }

        Self::Echo(original.to_owned())
    }

    /// Maps an Adaptive Card submit payload to a command.
    fn parse_submit(value: &Value) -> Option<Self> {
        match value.get("action")?.as_str()? {
            SHOW_CHARTS_MENU_ACTION => Some(Self::ChartsMenu),
            SHOW_CHART_ACTION => {
                let kind = value
                    .get("chart")
                    .and_then(Value::as_str)
                    .and_then(|c| c.parse().ok())
                    .unwrap_or_default();
                Some(Self::Chart(kind))
            }
            _ => None,
        }
    }

    /// Parses `<kind> <title> | <label>=<value>, ...`
    fn parse_custom_chart(args: &str) -> Option<CustomChartArgs> {
        let (head, data) = args.split_once('|')?;
        let (kind, title) = head.trim().split_once(char::is_whitespace)?;
        let kind = kind.parse().ok()?;
        let title = title.trim().to_owned();

        if title.is_empty() {
            return None;
        }

        let mut labels = Vec::new();
        let mut values = Vec::new();
        for pair in data.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (label, value) = pair.split_once('=')?;
            let label = label.trim();
            if label.is_empty() {
                return None;
            }
            labels.push(label.to_owned());
            values.push(value.trim().parse().ok()?);
        }

        if labels.is_empty() {
            return None;
        }

        Some(CustomChartArgs {
            kind,
            title,
            labels,
            values,
        })
    }

    /// Returns the command name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Reset => "reset",
            Self::Greeting => "greeting",
            Self::Chart(_) => "chart",
            Self::ChartsMenu => "charts",
            Self::CustomChart(_) => "customchart",
            Self::Count => "count",
            Self::Usage(_) => "usage",
            Self::Echo(_) => "echo",
        }
    }

    /// Returns all commands shown in the greeting.
    #[must_use]
    pub fn all_commands() -> Vec<(&'static str, &'static str)> {
        vec![
            ("info", "Show your user information"),
            ("chart [bar|line|pie]", "Show a sample chart"),
            ("charts", "Choose a sample chart"),
            (
                "/customchart <type> <title> | <label>=<value>, ...",
                "Chart your own data",
            ),
            ("count", "Show how many messages this conversation has seen"),
            ("/reset", "Reset the conversation"),
        ]
    }
}

impl fmt::Display for BotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chart(kind) => write!(f, "chart {kind}"),
            Self::CustomChart(args) => write!(
                f,
                "customchart {} '{}' ({} points)",
                args.kind,
                args.title,
                args.labels.len()
            ),
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// The parts of an inbound message activity the commands use.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncomingMessage {
    pub text: String,
    pub user_id: String,
    pub user_name: Option<String>,
    pub aad_object_id: Option<String>,
    pub conversation_id: String,
    pub value: Option<Value>,
}

impl IncomingMessage {
    /// Parses the command carried by this message.
    #[must_use]
    pub fn command(&self) -> BotCommand {
        BotCommand::parse(&self.text, self.value.as_ref())
    }
}

impl From<&Activity> for IncomingMessage {
    fn from(activity: &Activity) -> Self {
        let from = activity.from.as_ref();
        Self {
            text: activity.text.clone().unwrap_or_default(),
            user_id: from.map(|f| f.id.clone()).unwrap_or_default(),
            user_name: from.and_then(|f| f.name.clone()),
            aad_object_id: from.and_then(|f| f.aad_object_id.clone()),
            conversation_id: activity
                .conversation
                .as_ref()
                .map(|c| c.id.clone())
                .unwrap_or_default(),
            value: activity.value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(text: &str) -> BotCommand {
        BotCommand::parse(text, None)
    }

    #[test]
    fn test_parse_info() {
        assert_eq!(parse("info"), BotCommand::Info);
        assert_eq!(parse("/INFO"), BotCommand::Info);
        assert_eq!(parse("show my account please"), BotCommand::Info);
        assert_eq!(parse("mis credenciales"), BotCommand::Info);
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse("/reset"), BotCommand::Reset);
        assert_eq!(parse("  Hola  "), BotCommand::Greeting);
        assert_eq!(parse("/help"), BotCommand::Greeting);
        assert_eq!(parse("charts"), BotCommand::ChartsMenu);
        assert_eq!(parse("/count"), BotCommand::Count);
    }

    #[test]
    fn test_parse_chart() {
        assert_eq!(parse("chart"), BotCommand::Chart(ChartKind::Bar));
        assert_eq!(parse("chart line"), BotCommand::Chart(ChartKind::Line));
        assert_eq!(parse("/chart PIE"), BotCommand::Chart(ChartKind::Pie));
        assert_eq!(parse("gráfica pastel"), BotCommand::Chart(ChartKind::Pie));
        assert_eq!(parse("chart radar"), BotCommand::Usage(CHART_USAGE));
    }

    #[test]
    fn test_parse_custom_chart() {
        assert_eq!(
            parse("/customchart pie Team Size | Sales=12, Support = 7.5"),
            BotCommand::CustomChart(CustomChartArgs {
                kind: ChartKind::Pie,
                title: "Team Size".to_owned(),
                labels: vec!["Sales".to_owned(), "Support".to_owned()],
                values: vec![12.0, 7.5],
            })
        );
    }

    #[test]
    fn test_parse_custom_chart_malformed() {
        for text in [
            "/customchart",
            "/customchart bar Title",
            "/customchart radar Title | a=1",
            "/customchart bar | a=1",
            "/customchart bar Title | a=x",
            "/customchart bar Title | =1",
            "/customchart bar Title |",
        ] {
            assert_eq!(parse(text), BotCommand::Usage(CUSTOM_CHART_USAGE), "{text}");
        }
    }

    #[test]
    fn test_parse_submit_actions() {
        let menu = json!({"action": "show_charts_menu"});
        assert_eq!(BotCommand::parse("", Some(&menu)), BotCommand::ChartsMenu);

        let line = json!({"action": "show_chart", "chart": "line"});
        assert_eq!(BotCommand::parse("", Some(&line)), BotCommand::Chart(ChartKind::Line));

        let other = json!({"action": "something_else"});
        assert_eq!(BotCommand::parse("hello", Some(&other)), BotCommand::Greeting);
    }

    #[test]
    fn test_parse_echo_keeps_original_text() {
        assert_eq!(parse("  What's UP?  "), BotCommand::Echo("What's UP?".to_owned()));
        assert_eq!(parse("info please"), BotCommand::Echo("info please".to_owned()));
        assert_eq!(parse(""), BotCommand::Echo(String::new()));
    }

    #[test]
    fn test_incoming_from_activity() {
        let activity: Activity = serde_json::from_value(json!({
            "type": "message",
            "text": "chart",
            "from": {"id": "29:1", "name": "Ana", "aadObjectId": "aad-1"},
            "conversation": {"id": "conv-1"},
            "serviceUrl": "https://smba.example/"
        }))
        .unwrap();

        let message = IncomingMessage::from(&activity);
        assert_eq!(message.user_id, "29:1");
        assert_eq!(message.user_name.as_deref(), Some("Ana"));
        assert_eq!(message.aad_object_id.as_deref(), Some("aad-1"));
        assert_eq!(message.conversation_id, "conv-1");
        assert_eq!(message.command(), BotCommand::Chart(ChartKind::Bar));
    }
}
