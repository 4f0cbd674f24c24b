// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook pipeline for the Leadline SMS engagement platform.
//!
//! The [`WebhookPipeline`] is the central coordinator that:
//! - Resolves the tenant from the receiving number and verifies the signature
//! - Resolves the sending lead within that tenant
//! - Records the inbound message idempotently in the conversation store
//! - Generates a reply from bounded history and dispatches it, inline or deferred
//! - Applies delivery status callbacks to outbound messages

pub mod assignment;
pub mod callback;
pub mod dispatch;
pub mod pipeline;
pub mod reply;
pub mod resolver;
pub mod shutdown;

pub use assignment::assign_agent;
pub use callback::CallbackOutcome;
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use pipeline::{
    PipelineOutcome, PipelineSettings, PipelineState, ReplyResult, WebhookPipeline,
    WebhookRequest,
};
pub use reply::{ReplyGenerator, ReplyOutcome};
pub use resolver::{resolve_lead, resolve_tenant};
