// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reply generation from a bounded window of conversation history.
//!
//! The generator has no side effects: it turns a tenant's AI profile and the
//! stored history into one completion call and reports either the reply text
//! or a failure reason. Callers own persistence and fallback policy.

use std::sync::Arc;
use std::time::{Duration, Instant};

use leadline_core::{
    AiProfile, ChatRole, ChatTurn, CompletionAdapter, CompletionRequest, DeliveryStatus,
    Direction, LeadlineError, Message, SenderRole,
};
use tracing::{debug, warn};

/// Result of a generation attempt. Failures are values, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Generated(String),
    Failed { reason: String },
}

/// Produces SMS replies through a [`CompletionAdapter`].
pub struct ReplyGenerator {
    completion: Arc<dyn CompletionAdapter>,
    history_window: usize,
    timeout: Duration,
}

impl ReplyGenerator {
    pub fn new(
        completion: Arc<dyn CompletionAdapter>,
        history_window: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            completion,
            history_window: history_window.max(1),
            timeout,
        }
    }

    /// Maximum number of stored messages considered per generation.
    pub fn history_window(&self) -> usize {
        self.history_window
    }

    /// Generates a reply for `history` (oldest first) under `profile`.
    ///
    /// Only the most recent `history_window` messages are used. Provider
    /// errors, timeouts and empty replies all come back as
    /// [`ReplyOutcome::Failed`].
    pub async fn generate(&self, profile: &AiProfile, history: &[Message]) -> ReplyOutcome {
        let start = history.len().saturating_sub(self.history_window);
        let messages = build_turns(&history[start..]);
        if messages.is_empty() {
            return ReplyOutcome::Failed {
                reason: "history has no lead messages".to_string(),
            };
        }

        let request = CompletionRequest {
            api_key: profile.api_key.clone(),
            model: profile.model.clone(),
            system_prompt: system_prompt(profile),
            messages,
            max_tokens: None,
        };

        let started = Instant::now();
        let result = tokio::time::timeout(self.timeout, self.completion.complete(request)).await;
        let latency = started.elapsed();

        let (label, outcome) = match result {
            Ok(Ok(response)) => {
                let text = response.content.trim();
                if text.is_empty() {
                    (
                        "failed",
                        ReplyOutcome::Failed {
                            reason: "completion returned no text".to_string(),
                        },
                    )
                } else {
                    debug!(
                        model = response.model.as_str(),
                        output_tokens = response.usage.output_tokens,
                        "reply generated"
                    );
                    ("generated", ReplyOutcome::Generated(text.to_string()))
                }
            }
            Ok(Err(e)) => (
                "failed",
                ReplyOutcome::Failed {
                    reason: e.to_string(),
                },
            ),
            Err(_) => (
                "timeout",
                ReplyOutcome::Failed {
                    reason: LeadlineError::Timeout {
                        duration: self.timeout,
                    }
                    .to_string(),
                },
            ),
        };

        if let ReplyOutcome::Failed { reason } = &outcome {
            warn!(reason = reason.as_str(), "reply generation failed");
        }
        leadline_prometheus::record_reply(label, latency);
        outcome
    }
}

/// The system prompt with the tenant's preferences appended.
pub fn system_prompt(profile: &AiProfile) -> String {
    let prompt = profile.system_prompt.trim();
    let preferences = profile.preferences.trim();
    match (prompt.is_empty(), preferences.is_empty()) {
        (_, true) => prompt.to_string(),
        (true, false) => preferences.to_string(),
        (false, false) => format!("{prompt}\n\n{preferences}"),
    }
}

/// Converts stored messages into alternating chat turns.
///
/// Outbound messages that never reached the provider are skipped, since the
/// lead never saw them. Consecutive turns from the same side are merged and
/// the result always starts and ends with a lead turn.
pub fn build_turns(history: &[Message]) -> Vec<ChatTurn> {
    let mut turns: Vec<ChatTurn> = Vec::new();

    for message in history {
        let role = match (message.direction, message.sender) {
            (Direction::Inbound, _) => ChatRole::User,
            (Direction::Outbound, SenderRole::Assistant)
                if message.status == DeliveryStatus::Sent =>
            {
                ChatRole::Assistant
            }
            _ => continue,
        };

        let content = render(message);
        if content.is_empty() {
            continue;
        }

        match turns.last_mut() {
            Some(last) if last.role == role => {
                last.content.push('\n');
                last.content.push_str(&content);
            }
            _ => turns.push(ChatTurn { role, content }),
        }
    }

    while turns.last().is_some_and(|t| t.role == ChatRole::Assistant) {
        turns.pop();
    }
    let first_user = turns
        .iter()
        .position(|t| t.role == ChatRole::User)
        .unwrap_or(turns.len());
    turns.drain(..first_user);
    turns
}

fn render(message: &Message) -> String {
    let body = message.body.trim();
    let Some(media) = &message.media else {
        return body.to_string();
    };
    let note = match &media.content_type {
        Some(kind) => format!("[attachment: {kind} {}]", media.url),
        None => format!("[attachment: {}]", media.url),
    };
    if body.is_empty() {
        note
    } else {
        format!("{body}\n{note}")
    }
}

#[cfg(test)]
mod tests {
    use leadline_core::MediaAttachment;
    use leadline_test_utils::MockCompletion;

    use super::*;

    fn message(seq: i64, direction: Direction, status: DeliveryStatus, body: &str) -> Message {
        Message {
            id: format!("m{seq}"),
            conversation_id: "c1".into(),
            sequence: seq,
            sender: match direction {
                Direction::Inbound => SenderRole::Lead,
                Direction::Outbound => SenderRole::Assistant,
            },
            direction,
            body: body.into(),
            status,
            provider_message_id: None,
            media: None,
            error: None,
            created_at: "2026-01-01T00:00:00.000Z".into(),
        }
    }

    fn inbound(seq: i64, body: &str) -> Message {
        message(seq, Direction::Inbound, DeliveryStatus::New, body)
    }

    fn outbound(seq: i64, status: DeliveryStatus, body: &str) -> Message {
        message(seq, Direction::Outbound, status, body)
    }

    fn profile() -> AiProfile {
        AiProfile {
            system_prompt: "You book tours.".into(),
            preferences: "Be brief.".into(),
            api_key: Some("sk-tenant".into()),
            model: Some("tenant-model".into()),
        }
    }

    #[test]
    fn turns_alternate_and_skip_undelivered_replies() {
        let history = vec![
            outbound(1, DeliveryStatus::Sent, "Welcome!"),
            inbound(2, "Hi"),
            inbound(3, "Are you open?"),
            outbound(4, DeliveryStatus::Failed, "lost reply"),
            outbound(5, DeliveryStatus::Sent, "Yes, until 6."),
            inbound(6, "Great"),
            outbound(7, DeliveryStatus::Sent, "trailing"),
        ];

        let turns = build_turns(&history);
        assert_eq!(
            turns,
            vec![
                ChatTurn {
                    role: ChatRole::User,
                    content: "Hi\nAre you open?".into()
                },
                ChatTurn {
                    role: ChatRole::Assistant,
                    content: "Yes, until 6.".into()
                },
                ChatTurn {
                    role: ChatRole::User,
                    content: "Great".into()
                },
            ]
        );
    }

    #[test]
    fn media_is_rendered_as_note() {
        let mut m = inbound(1, "");
        m.media = Some(MediaAttachment {
            url: "https://media.example/1.jpg".into(),
            content_type: Some("image/jpeg".into()),
        });
        let turns = build_turns(&[m]);
        assert_eq!(
            turns[0].content,
            "[attachment: image/jpeg https://media.example/1.jpg]"
        );
    }

    #[test]
    fn system_prompt_appends_preferences() {
        assert_eq!(system_prompt(&profile()), "You book tours.\n\nBe brief.");
        let bare = AiProfile {
            system_prompt: "Only prompt".into(),
            ..AiProfile::default()
        };
        assert_eq!(system_prompt(&bare), "Only prompt");
    }

    #[tokio::test]
    async fn generate_passes_tenant_profile_and_window() {
        let mock = MockCompletion::with_replies(["  See you at 5!  "]);
        let generator = ReplyGenerator::new(Arc::new(mock.clone()), 2, Duration::from_secs(1));

        let history = vec![
            inbound(1, "old message"),
            outbound(2, DeliveryStatus::Sent, "old reply"),
            inbound(3, "Can I come at 5?"),
        ];
        let outcome = generator.generate(&profile(), &history).await;
        assert_eq!(outcome, ReplyOutcome::Generated("See you at 5!".into()));

        let requests = mock.requests().await;
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.api_key.as_deref(), Some("sk-tenant"));
        assert_eq!(request.model.as_deref(), Some("tenant-model"));
        assert_eq!(request.system_prompt, "You book tours.\n\nBe brief.");
        // Window of 2 keeps the reply and the latest inbound; the leading
        // assistant turn is then dropped.
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].content, "Can I come at 5?");
    }

    #[tokio::test]
    async fn provider_error_is_a_failure_value() {
        let mock = MockCompletion::new();
        mock.push_failure("quota exceeded").await;
        let generator = ReplyGenerator::new(Arc::new(mock), 20, Duration::from_secs(1));

        match generator.generate(&profile(), &[inbound(1, "Hi")]).await {
            ReplyOutcome::Failed { reason } => assert!(reason.contains("quota exceeded")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out() {
        let mock = MockCompletion::new().with_delay(Duration::from_secs(30));
        let generator = ReplyGenerator::new(Arc::new(mock), 20, Duration::from_millis(500));

        match generator.generate(&profile(), &[inbound(1, "Hi")]).await {
            ReplyOutcome::Failed { reason } => assert!(reason.contains("timed out")),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_history_fails_without_calling_provider() {
        let mock = MockCompletion::new();
        let generator = ReplyGenerator::new(Arc::new(mock.clone()), 20, Duration::from_secs(1));
        let outcome = generator
            .generate(&profile(), &[outbound(1, DeliveryStatus::Sent, "hello")])
            .await;
        assert!(matches!(outcome, ReplyOutcome::Failed { .. }));
        assert_eq!(mock.call_count().await, 0);
    }
}
