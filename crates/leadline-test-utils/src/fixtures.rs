// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant and lead records for tests.

use leadline_core::{AiProfile, Lead, LeadStatus, TelephonyCredentials, Tenant};

pub fn tenant(id: &str, sending_number: &str, auth_token: &str) -> Tenant {
    Tenant {
        id: id.to_string(),
        name: format!("Tenant {id}"),
        telephony: TelephonyCredentials {
            account_sid: format!("AC{id}"),
            auth_token: auth_token.to_string(),
            sending_number: sending_number.to_string(),
        },
        ai: AiProfile {
            system_prompt: "You are a helpful leasing assistant.".to_string(),
            preferences: "Keep replies under two sentences.".to_string(),
            api_key: Some(format!("sk-{id}")),
            model: None,
        },
        default_agent_id: None,
        created_at: "2026-01-01T00:00:00.000Z".to_string(),
    }
}

pub fn lead(id: &str, tenant_id: &str, phone_number: &str) -> Lead {
    Lead {
        id: id.to_string(),
        tenant_id: tenant_id.to_string(),
        phone_number: phone_number.to_string(),
        display_name: "Jamie".to_string(),
        status: LeadStatus::New,
        created_at: "2026-01-01T00:00:00.000Z".to_string(),
    }
}
