use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_TOPIC: &str = "general";

/// Confidence assigned to a direct keyword hit.
pub const KEYWORD_MATCH_CONFIDENCE: f64 = 0.9;

/// Topic trigger table. Order is significant: the first matching topic wins.
pub const TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    ("networking", &["network", "subnet", "firewall", "vlan", "ip", "route"]),
    ("storage", &["disk", "storage", "volume", "ssd", "nfs"]),
    ("security", &["security", "auth", "user", "password", "permissions", "ssl"]),
    ("database", &["database", "postgres", "mysql", "db", "sql"]),
];

/// Conversational working memory for a single conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FocusContext {
    pub active_resource_id: Option<String>,
    pub current_topic: String,
    pub topic_confidence: f64,
}

impl Default for FocusContext {
    fn default() -> Self {
        Self {
            active_resource_id: None,
            current_topic: DEFAULT_TOPIC.to_string(),
            topic_confidence: 0.0,
        }
    }
}

impl FocusContext {
    pub fn new(active_resource_id: Option<String>, current_topic: impl Into<String>) -> Self {
        Self { active_resource_id, current_topic: current_topic.into(), topic_confidence: 0.0 }
    }

    pub fn with_confidence(mut self, topic_confidence: f64) -> Self {
        self.topic_confidence = topic_confidence;
        self
    }

    fn shifted_to(topic: &str) -> Self {
        Self {
            active_resource_id: None,
            current_topic: topic.to_string(),
            topic_confidence: KEYWORD_MATCH_CONFIDENCE,
        }
    }
}

/// Returns the focus for the next turn. A shift always drops the active resource so
/// commands aimed at the previous topic cannot re-apply to the new one.
pub fn detect_context_shift(input_text: &str, current_focus: &FocusContext) -> FocusContext {
    let tokens = tokenize(input_text);

    for (topic, keywords) in TOPIC_KEYWORDS {
        let matched = keywords.iter().any(|keyword| tokens.contains(*keyword));
        if matched && *topic != current_focus.current_topic {
            warn!(
                event_name = "cognitive.context.shift_detected",
                previous_topic = %current_focus.current_topic,
                next_topic = topic,
                cleared_resource = current_focus.active_resource_id.as_deref().unwrap_or("none"),
                "context shift detected"
            );
            return FocusContext::shifted_to(topic);
        }
    }

    current_focus.clone()
}

fn tokenize(input_text: &str) -> BTreeSet<String> {
    input_text.to_lowercase().split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::{detect_context_shift, FocusContext, DEFAULT_TOPIC, KEYWORD_MATCH_CONFIDENCE};

    fn compute_focus() -> FocusContext {
        FocusContext::new(Some("vm-123".to_string()), "compute")
    }

    #[test]
    fn default_focus_is_general_without_resource() {
        let focus = FocusContext::default();
        assert_eq!(focus.current_topic, DEFAULT_TOPIC);
        assert_eq!(focus.active_resource_id, None);
        assert_eq!(focus.topic_confidence, 0.0);
    }

    #[test]
    fn text_without_keywords_keeps_focus() {
        let initial = compute_focus();
        let next = detect_context_shift("what is the status of it?", &initial);
        assert_eq!(next, initial);
    }

    #[test]
    fn keyword_hit_shifts_topic_and_clears_resource() {
        let next =
            detect_context_shift("now let's talk about the database firewall", &compute_focus());
        assert_eq!(next.active_resource_id, None);
        assert_eq!(next.current_topic, "networking");
        assert_eq!(next.topic_confidence, KEYWORD_MATCH_CONFIDENCE);
    }

    #[test]
    fn same_topic_text_is_idempotent() {
        let focus =
            FocusContext::new(Some("subnet-7".to_string()), "networking").with_confidence(0.9);
        let once = detect_context_shift("open the firewall on that subnet", &focus);
        let twice = detect_context_shift("open the firewall on that subnet", &once);
        assert_eq!(once, focus);
        assert_eq!(twice, focus);
    }

    #[test]
    fn matching_is_case_insensitive_on_whole_tokens() {
        let next = detect_context_shift("Resize the NFS share", &FocusContext::default());
        assert_eq!(next.current_topic, "storage");

        // punctuation stays attached to the token, so "disk," is not "disk"
        let unchanged = detect_context_shift("the disk, please", &FocusContext::default());
        assert_eq!(unchanged.current_topic, DEFAULT_TOPIC);
    }

    #[test]
    fn current_topic_match_falls_through_to_later_topic() {
        let focus = FocusContext::new(Some("vlan-9".to_string()), "networking");
        let next = detect_context_shift("route traffic to the postgres replica", &focus);
        assert_eq!(next.current_topic, "database");
        assert_eq!(next.active_resource_id, None);
    }

    #[test]
    fn earlier_topic_wins_regardless_of_keyword_count() {
        let next = detect_context_shift("db sql mysql postgres ssl", &FocusContext::default());
        assert_eq!(next.current_topic, "security");
    }
}
