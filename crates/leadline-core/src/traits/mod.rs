// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the external collaborators of the pipeline.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod completion;
pub mod storage;
pub mod transport;

pub use adapter::PluginAdapter;
pub use completion::CompletionAdapter;
pub use storage::StorageAdapter;
pub use transport::SmsTransport;
