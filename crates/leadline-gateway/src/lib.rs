// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for Leadline.
//!
//! Receives the telephony provider's inbound SMS webhooks and delivery
//! status callbacks, hands them to the [`WebhookPipeline`](leadline_agent::WebhookPipeline),
//! and serves the operator read API plus health and metrics endpoints.

pub mod auth;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use server::{GatewayState, HealthState, ServerConfig, WebhookConfig, router, start_server};
