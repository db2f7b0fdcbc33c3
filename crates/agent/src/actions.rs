//! Closed action set the think-act loop may dispatch (spec §4.5). Each
//! variant carries its own fixed parameter schema; anything that
//! doesn't parse against one of these is recorded as a thought only,
//! never dispatched.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", content = "params", rename_all = "snake_case")]
pub enum Action {
    WriteBlogPost { title: String, body: String },
    PostChannel { channel: String, text: String },
    ReadMessages,
    CheckVotes,
    CheckBudget,
    SwitchModel { model_id: String },
    CheckSystem,
    ListModels,
    CheckWeather { location: String },
    AskResearchHelper { question: String },
    NoOp,
}

impl Action {
    /// Parses a model-emitted JSON object into a known action. Returns
    /// `None` for anything that isn't one of the closed set or doesn't
    /// match its schema — the caller records the raw output as a
    /// thought instead of dispatching.
    pub fn parse(value: &Value) -> Option<Action> {
        serde_json::from_value(value.clone()).ok()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::WriteBlogPost { .. } => "write_blog_post",
            Action::PostChannel { .. } => "post_channel",
            Action::ReadMessages => "read_messages",
            Action::CheckVotes => "check_votes",
            Action::CheckBudget => "check_budget",
            Action::SwitchModel { .. } => "switch_model",
            Action::CheckSystem => "check_system",
            Action::ListModels => "list_models",
            Action::CheckWeather { .. } => "check_weather",
            Action::AskResearchHelper { .. } => "ask_research_helper",
            Action::NoOp => "no_op",
        }
    }

    /// Actions that produce outbound text subject to the content filter
    /// and secret redaction before dispatch.
    pub fn outbound_text(&self) -> Option<&str> {
        match self {
            Action::WriteBlogPost { body, .. } => Some(body),
            Action::PostChannel { text, .. } => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_known_action() {
        let v = json!({"action": "no_op", "params": {}});
        assert!(matches!(Action::parse(&v), Some(Action::NoOp)));
    }

    #[test]
    fn parses_action_with_params() {
        let v = json!({"action": "post_channel", "params": {"channel": "main", "text": "hi"}});
        match Action::parse(&v) {
            Some(Action::PostChannel { channel, text }) => {
                assert_eq!(channel, "main");
                assert_eq!(text, "hi");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unknown_action_name_does_not_parse() {
        let v = json!({"action": "launch_missiles", "params": {}});
        assert!(Action::parse(&v).is_none());
    }

    #[test]
    fn missing_required_param_does_not_parse() {
        let v = json!({"action": "check_weather", "params": {}});
        assert!(Action::parse(&v).is_none());
    }

    #[test]
    fn outbound_text_only_for_publishing_actions() {
        let post = Action::PostChannel {
            channel: "main".into(),
            text: "hello".into(),
        };
        assert_eq!(post.outbound_text(), Some("hello"));
        assert_eq!(Action::NoOp.outbound_text(), None);
    }
}
