// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMS transport trait for telephony provider integrations.

use async_trait::async_trait;

use crate::error::LeadlineError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{OutboundSms, SendReceipt, TelephonyCredentials};

/// Adapter for sending SMS through a telephony provider.
///
/// A single call is a single attempt. Retry policy belongs to the caller.
#[async_trait]
pub trait SmsTransport: PluginAdapter {
    /// Sends one message using the given tenant's credentials.
    async fn send(
        &self,
        credentials: &TelephonyCredentials,
        message: OutboundSms,
    ) -> Result<SendReceipt, LeadlineError>;
}
