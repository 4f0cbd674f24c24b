// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telephony provider integration for Leadline.
//!
//! - [`signature`] verifies that a webhook was signed with a tenant's auth token.
//! - [`webhook`] parses inbound and status-callback form payloads and renders
//!   the XML acknowledgement bodies the provider expects.
//! - [`client`] sends outbound SMS over the provider's REST API.

pub mod client;
pub mod signature;
pub mod webhook;

pub use client::RestSmsTransport;
pub use signature::{compute_signature, verify};
pub use webhook::{InboundSms, MissingField, StatusCallback, ack_xml, message_xml};
