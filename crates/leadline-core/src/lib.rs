// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Leadline SMS engagement pipeline.
//!
//! This crate provides the domain types, error type, and adapter traits
//! shared by every other crate in the workspace. Storage, completion and
//! telephony backends implement the traits defined here.

pub mod error;
pub mod traits;
pub mod types;

pub use error::LeadlineError;
pub use types::{
    AdapterType, AiProfile, AppendOutcome, ChatRole, ChatTurn, CompletionRequest,
    CompletionResponse, Conversation, DeliveryStatus, Direction, HealthStatus, InboundRecord,
    Lead, LeadStatus, MediaAttachment, Message, NewMessage, OutboundSms, SendReceipt,
    SenderRole, StatusChange, TelephonyCredentials, Tenant, TokenUsage,
};

pub use traits::{CompletionAdapter, PluginAdapter, SmsTransport, StorageAdapter};
