// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Leadline integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockCompletion`] - Scripted completion adapter with injectable failures and delays
//! - [`MockTransport`] - SMS transport that captures sends
//! - [`TestHarness`] - Full pipeline over a temp database with a seeded tenant and lead

pub mod fixtures;
pub mod harness;
pub mod mock_completion;
pub mod mock_transport;

pub use harness::{STATUS_URL, TestHarness, TestHarnessBuilder, WEBHOOK_URL, sign};
pub use mock_completion::MockCompletion;
pub use mock_transport::{MockTransport, SendAttempt};
