// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the complete webhook pipeline.
//!
//! Each test creates an isolated TestHarness with temp SQLite, mock
//! completion and mock transport. Tests are independent and order-insensitive.

use std::time::Duration;

use leadline_agent::{CallbackOutcome, PipelineOutcome, ReplyResult};
use leadline_config::ReplyMode;
use leadline_core::{ChatRole, DeliveryStatus, Direction, LeadStatus, SenderRole, StorageAdapter};
use leadline_test_utils::fixtures;
use leadline_test_utils::{STATUS_URL, TestHarness, WEBHOOK_URL, sign};

fn param(name: &str, value: &str) -> (String, String) {
    (name.to_string(), value.to_string())
}

// ---- Happy path ----

#[tokio::test]
async fn known_lead_gets_a_reply_and_both_messages_are_stored() {
    let harness = TestHarness::builder()
        .with_replies(["Yes, the 2-bedroom is available. Want to tour Saturday?"])
        .build()
        .await
        .unwrap();

    let outcome = harness
        .deliver("SM100", "Is the apartment still available?")
        .await;
    let PipelineOutcome::Handled {
        conversation_id,
        reply: ReplyResult::Sent { fallback, .. },
    } = outcome
    else {
        panic!("expected a sent reply, got {outcome:?}");
    };
    assert!(!fallback);

    let conversation = harness.conversation().await.unwrap().unwrap();
    assert_eq!(conversation.id, conversation_id);
    assert_eq!(conversation.tenant_id, "T");
    assert_eq!(conversation.lead_id, "L");
    assert_eq!(conversation.agent_id, "default");

    let messages = harness.messages().await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].direction, Direction::Inbound);
    assert_eq!(messages[0].sender, SenderRole::Lead);
    assert_eq!(messages[0].provider_message_id.as_deref(), Some("SM100"));
    assert_eq!(messages[1].direction, Direction::Outbound);
    assert_eq!(messages[1].sender, SenderRole::Assistant);
    assert_eq!(messages[1].status, DeliveryStatus::Sent);
    assert_eq!(
        messages[1].body,
        "Yes, the 2-bedroom is available. Want to tour Saturday?"
    );

    let sent = harness.transport.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].from, "+15550000000");
    assert_eq!(sent[0].to, "+15551234567");
    assert_eq!(sent[0].account_sid, "ACT");
    assert_eq!(sent[0].status_callback.as_deref(), Some(STATUS_URL));
    assert_eq!(
        messages[1].provider_message_id,
        sent[0].provider_message_id
    );

    let lead = harness
        .storage
        .lead_by_phone("T", "+15551234567")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lead.status, LeadStatus::Contacted);
}

#[tokio::test]
async fn completion_sees_tenant_prompt_and_key() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.deliver("SM1", "Hello").await;

    let requests = harness.completion.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].api_key.as_deref(), Some("sk-T"));
    assert!(
        requests[0]
            .system_prompt
            .starts_with("You are a helpful leasing assistant.")
    );
    assert!(requests[0].system_prompt.contains("Keep replies under two sentences."));
    assert_eq!(requests[0].messages.len(), 1);
    assert_eq!(requests[0].messages[0].role, ChatRole::User);
    assert_eq!(requests[0].messages[0].content, "Hello");
}

// ---- Idempotency ----

#[tokio::test]
async fn redelivery_is_stored_once_and_answered_once() {
    let harness = TestHarness::builder().build().await.unwrap();

    let first = harness.deliver("SM1", "Hi").await;
    assert!(matches!(first, PipelineOutcome::Handled { .. }));
    let second = harness.deliver("SM1", "Hi").await;
    assert!(matches!(second, PipelineOutcome::Duplicate { .. }));

    assert_eq!(harness.messages().await.unwrap().len(), 2);
    assert_eq!(harness.transport.sent().await.len(), 1);
    assert_eq!(harness.completion.call_count().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_redelivery_produces_one_inbound_and_one_reply() {
    let harness = TestHarness::builder().build().await.unwrap();

    let (a, b) = tokio::join!(harness.deliver("SM7", "Hi"), harness.deliver("SM7", "Hi"));
    let duplicates = [&a, &b]
        .iter()
        .filter(|o| matches!(o, PipelineOutcome::Duplicate { .. }))
        .count();
    assert_eq!(duplicates, 1, "outcomes: {a:?} / {b:?}");

    let messages = harness.messages().await.unwrap();
    let inbound = messages
        .iter()
        .filter(|m| m.direction == Direction::Inbound)
        .count();
    assert_eq!(inbound, 1);
    assert_eq!(harness.transport.sent().await.len(), 1);
}

// ---- Ordering and conversation reuse ----

#[tokio::test]
async fn messages_keep_arrival_order_in_one_conversation() {
    let harness = TestHarness::builder()
        .with_replies(["r1", "r2", "r3"])
        .build()
        .await
        .unwrap();

    let mut conversation_ids = Vec::new();
    for (sid, body) in [("SM1", "one"), ("SM2", "two"), ("SM3", "three")] {
        match harness.deliver(sid, body).await {
            PipelineOutcome::Handled {
                conversation_id, ..
            } => conversation_ids.push(conversation_id),
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    conversation_ids.dedup();
    assert_eq!(conversation_ids.len(), 1);

    let messages = harness.messages().await.unwrap();
    let bodies: Vec<&str> = messages.iter().map(|m| m.body.as_str()).collect();
    assert_eq!(bodies, ["one", "r1", "two", "r2", "three", "r3"]);
    assert!(messages.windows(2).all(|w| w[0].sequence < w[1].sequence));
}

#[tokio::test]
async fn history_sent_to_completion_is_bounded_by_window() {
    let harness = TestHarness::builder()
        .with_history_window(3)
        .with_replies(["r1", "r2", "r3"])
        .build()
        .await
        .unwrap();

    harness.deliver("SM1", "first").await;
    harness.deliver("SM2", "second").await;
    harness.deliver("SM3", "third").await;

    let requests = harness.completion.requests().await;
    let last = &requests[2];
    let contents: Vec<&str> = last.messages.iter().map(|t| t.content.as_str()).collect();
    assert_eq!(contents, ["second", "r2", "third"]);
    assert_eq!(last.messages[0].role, ChatRole::User);
    assert_eq!(last.messages[1].role, ChatRole::Assistant);
}

// ---- Tenant isolation ----

#[tokio::test]
async fn same_phone_under_two_tenants_stays_isolated() {
    let harness = TestHarness::builder().build().await.unwrap();
    let other = fixtures::tenant("Y", "+15550000001", "other-secret");
    harness.storage.insert_tenant(&other).await.unwrap();
    harness
        .storage
        .insert_lead(&fixtures::lead("LY", "Y", "+15551234567"))
        .await
        .unwrap();

    harness.deliver("SM1", "for T").await;

    let params = vec![
        param("MessageSid", "SM2"),
        param("From", "+15551234567"),
        param("To", "+15550000001"),
        param("Body", "for Y"),
    ];
    let outcome = harness
        .pipeline
        .handle_inbound(sign("other-secret", WEBHOOK_URL, params))
        .await;
    let PipelineOutcome::Handled {
        conversation_id: y_conversation,
        ..
    } = outcome
    else {
        panic!("expected Y to handle its own lead, got {outcome:?}");
    };

    let t_messages = harness.messages().await.unwrap();
    assert!(t_messages.iter().all(|m| m.body != "for Y"));

    let y_conv = harness
        .storage
        .get_conversation(&y_conversation)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(y_conv.tenant_id, "Y");
    assert_eq!(y_conv.lead_id, "LY");
    let y_messages = harness.storage.list_messages(&y_conversation).await.unwrap();
    assert_eq!(y_messages[0].body, "for Y");

    let sent = harness.transport.sent().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].from, "+15550000001");
    assert_eq!(sent[1].account_sid, "ACY");
}

#[tokio::test]
async fn another_tenants_secret_does_not_authenticate() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness
        .storage
        .insert_tenant(&fixtures::tenant("Y", "+15550000001", "other-secret"))
        .await
        .unwrap();

    let params = harness.inbound_params("SM1", "spoofed");
    let outcome = harness
        .pipeline
        .handle_inbound(sign("other-secret", WEBHOOK_URL, params))
        .await;
    assert_eq!(outcome, PipelineOutcome::AuthFailed);
    assert!(harness.conversation().await.unwrap().is_none());
    assert_eq!(harness.completion.call_count().await, 0);
    assert!(harness.transport.attempts().await.is_empty());
}

// ---- Fail-closed authentication ----

#[tokio::test]
async fn tampered_body_is_rejected_without_side_effects() {
    let harness = TestHarness::builder().build().await.unwrap();
    let mut request = harness.signed(harness.inbound_params("SM1", "original"));
    for (name, value) in request.params.iter_mut() {
        if name == "Body" {
            *value = "tampered".to_string();
        }
    }

    assert_eq!(
        harness.pipeline.handle_inbound(request).await,
        PipelineOutcome::AuthFailed
    );
    assert!(harness.messages().await.unwrap().is_empty());
}

#[tokio::test]
async fn unsigned_request_is_rejected() {
    let harness = TestHarness::builder().build().await.unwrap();
    let mut request = harness.signed(harness.inbound_params("SM1", "hi"));
    request.signature = None;

    assert_eq!(
        harness.pipeline.handle_inbound(request).await,
        PipelineOutcome::AuthFailed
    );
    assert!(harness.conversation().await.unwrap().is_none());
}

// ---- Not-found handling ----

#[tokio::test]
async fn unknown_sender_gets_copy_and_nothing_is_stored() {
    let harness = TestHarness::builder().build().await.unwrap();
    let params = vec![
        param("MessageSid", "SM1"),
        param("From", "+15559999999"),
        param("To", "+15550000000"),
        param("Body", "who is this?"),
    ];
    let outcome = harness.pipeline.handle_inbound(harness.signed(params)).await;
    assert_eq!(
        outcome,
        PipelineOutcome::LeadNotFound {
            reply: Some("Sorry, this number is not recognized.".to_string())
        }
    );
    assert_eq!(harness.completion.call_count().await, 0);
    assert!(harness.transport.attempts().await.is_empty());
}

#[tokio::test]
async fn unknown_receiving_number_is_acknowledged_inertly() {
    let harness = TestHarness::builder().build().await.unwrap();
    let params = vec![
        param("MessageSid", "SM1"),
        param("From", "+15551234567"),
        param("To", "+15557777777"),
        param("Body", "hi"),
    ];
    let outcome = harness
        .pipeline
        .handle_inbound(sign("s3cr3t", WEBHOOK_URL, params))
        .await;
    assert_eq!(outcome, PipelineOutcome::TenantNotFound);
    assert!(harness.conversation().await.unwrap().is_none());
}

// ---- Generation failures ----

#[tokio::test]
async fn generation_timeout_still_persists_the_inbound() {
    let harness = TestHarness::builder()
        .with_completion_delay(Duration::from_secs(2))
        .with_generation_timeout(Duration::from_millis(100))
        .build()
        .await
        .unwrap();

    let outcome = harness.deliver("SM1", "anyone there?").await;
    assert!(
        matches!(
            outcome,
            PipelineOutcome::Handled {
                reply: ReplyResult::InboundOnly { .. },
                ..
            }
        ),
        "got {outcome:?}"
    );

    let messages = harness.messages().await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].body, "anyone there?");
    assert!(harness.transport.attempts().await.is_empty());
}

#[tokio::test]
async fn generation_failure_sends_configured_fallback() {
    let harness = TestHarness::builder()
        .with_fallback_message("Thanks! An agent will follow up shortly.")
        .build()
        .await
        .unwrap();
    harness.completion.push_failure("overloaded").await;

    let outcome = harness.deliver("SM1", "hello").await;
    assert!(matches!(
        outcome,
        PipelineOutcome::Handled {
            reply: ReplyResult::Sent { fallback: true, .. },
            ..
        }
    ));
    let messages = harness.messages().await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].body, "Thanks! An agent will follow up shortly.");
    assert_eq!(messages[1].status, DeliveryStatus::Sent);
}

// ---- Dispatch failures ----

#[tokio::test]
async fn failed_send_is_recorded_as_failed_never_sent() {
    let harness = TestHarness::builder()
        .with_failing_transport("carrier unreachable")
        .build()
        .await
        .unwrap();

    let outcome = harness.deliver("SM1", "hi").await;
    let PipelineOutcome::Handled {
        reply: ReplyResult::DispatchFailed { message_id, error },
        ..
    } = outcome
    else {
        panic!("expected dispatch failure, got {outcome:?}");
    };
    assert!(error.contains("carrier unreachable"));

    let messages = harness.messages().await.unwrap();
    assert_eq!(messages.len(), 2);
    let outbound = &messages[1];
    assert_eq!(Some(outbound.id.clone()), message_id);
    assert_eq!(outbound.status, DeliveryStatus::Failed);
    assert!(outbound.provider_message_id.is_none());
    assert!(outbound.error.as_deref().unwrap_or("").contains("carrier unreachable"));

    for m in &messages {
        if m.direction == Direction::Outbound && m.status == DeliveryStatus::Sent {
            assert!(m.provider_message_id.is_some());
        }
    }

    let lead = harness
        .storage
        .lead_by_phone("T", "+15551234567")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lead.status, LeadStatus::New);
}

#[tokio::test]
async fn undelivered_callback_marks_sent_reply_failed() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.deliver("SM1", "hi").await;
    let sent = harness.transport.sent().await;
    let provider_id = sent[0].provider_message_id.clone().unwrap();

    let params = vec![
        param("MessageSid", &provider_id),
        param("MessageStatus", "undelivered"),
        param("From", "+15550000000"),
        param("ErrorCode", "30003"),
    ];
    let outcome = harness
        .pipeline
        .handle_status_callback(sign("s3cr3t", STATUS_URL, params.clone()))
        .await;
    assert!(matches!(outcome, CallbackOutcome::Applied { .. }));

    let messages = harness.messages().await.unwrap();
    assert_eq!(messages[1].status, DeliveryStatus::Failed);
    assert!(messages[1].error.as_deref().unwrap_or("").contains("30003"));

    let again = harness
        .pipeline
        .handle_status_callback(sign("s3cr3t", STATUS_URL, params))
        .await;
    assert_eq!(again, CallbackOutcome::Ignored("already_final"));
}

// ---- Deferred mode and media ----

#[tokio::test]
async fn deferred_reply_completes_before_drain_returns() {
    let harness = TestHarness::builder()
        .with_reply_mode(ReplyMode::Deferred)
        .with_replies(["later reply"])
        .build()
        .await
        .unwrap();

    let outcome = harness.deliver("SM1", "hello").await;
    assert!(matches!(outcome, PipelineOutcome::Queued { .. }));
    assert!(harness.pipeline.drain(Duration::from_secs(5)).await);
    assert_eq!(harness.pipeline.pending_replies(), 0);

    let messages = harness.messages().await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].body, "later reply");
    assert_eq!(messages[1].status, DeliveryStatus::Sent);
}

#[tokio::test]
async fn media_is_stored_and_shown_to_completion() {
    let harness = TestHarness::builder().build().await.unwrap();
    let mut params = harness.inbound_params("SM1", "here is the photo");
    params.retain(|(name, _)| name != "NumMedia");
    params.push(param("NumMedia", "1"));
    params.push(param("MediaUrl0", "https://media.example.com/p.jpg"));
    params.push(param("MediaContentType0", "image/jpeg"));

    let outcome = harness.pipeline.handle_inbound(harness.signed(params)).await;
    assert!(matches!(outcome, PipelineOutcome::Handled { .. }));

    let messages = harness.messages().await.unwrap();
    let media = messages[0].media.as_ref().unwrap();
    assert_eq!(media.url, "https://media.example.com/p.jpg");
    assert_eq!(media.content_type.as_deref(), Some("image/jpeg"));

    let requests = harness.completion.requests().await;
    assert!(
        requests[0].messages[0]
            .content
            .contains("[attachment: image/jpeg https://media.example.com/p.jpg]")
    );
}
