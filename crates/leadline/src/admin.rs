// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provisioning and inspection commands: `tenant`, `lead` and `history`.
//!
//! The pipeline treats tenants and leads as read-only; these commands are
//! the write path that seeds them.

use chrono::{SecondsFormat, Utc};
use leadline_config::model::LeadlineConfig;
use leadline_core::error::LeadlineError;
use leadline_core::{
    AiProfile, Lead, LeadStatus, Message, StorageAdapter, TelephonyCredentials, Tenant,
};
use leadline_storage::SqliteStorage;
use leadline_storage::queries::tenants;
use serde_json::json;

use crate::{LeadAddArgs, TenantAddArgs};

async fn open_storage(config: &LeadlineConfig) -> Result<SqliteStorage, LeadlineError> {
    let storage = SqliteStorage::new(
        config.storage.database_path.clone(),
        config.storage.wal_mode,
    );
    storage.initialize().await?;
    Ok(storage)
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `+` followed by 2 to 15 digits, the first non-zero.
pub(crate) fn is_e164(number: &str) -> bool {
    let Some(digits) = number.strip_prefix('+') else {
        return false;
    };
    (2..=15).contains(&digits.len())
        && !digits.starts_with('0')
        && digits.bytes().all(|b| b.is_ascii_digit())
}

fn require_e164(field: &str, number: &str) -> Result<(), LeadlineError> {
    if is_e164(number) {
        Ok(())
    } else {
        Err(LeadlineError::Validation(format!(
            "{field} must be an E.164 number like +15551234567, got `{number}`"
        )))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validates and stores a new tenant. Sending numbers must stay unique.
pub(crate) async fn create_tenant(
    storage: &dyn StorageAdapter,
    args: TenantAddArgs,
) -> Result<Tenant, LeadlineError> {
    require_e164("--number", &args.number)?;
    if args.auth_token.trim().is_empty() {
        return Err(LeadlineError::Validation(
            "--auth-token must not be empty".into(),
        ));
    }

    let taken = storage.tenants_by_sending_number(&args.number).await?;
    if let Some(existing) = taken.first() {
        return Err(LeadlineError::Validation(format!(
            "sending number {} already belongs to tenant {}",
            args.number, existing.id
        )));
    }

    let tenant = Tenant {
        id: non_empty(args.id).unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        name: args.name,
        telephony: TelephonyCredentials {
            account_sid: args.account_sid,
            auth_token: args.auth_token,
            sending_number: args.number,
        },
        ai: AiProfile {
            system_prompt: args.system_prompt,
            preferences: args.preferences,
            api_key: non_empty(args.api_key),
            model: non_empty(args.model),
        },
        default_agent_id: non_empty(args.default_agent),
        created_at: now(),
    };
    storage.insert_tenant(&tenant).await?;
    tracing::info!(tenant_id = %tenant.id, "tenant created");
    Ok(tenant)
}

/// Validates and stores a new lead under an existing tenant.
pub(crate) async fn create_lead(
    storage: &dyn StorageAdapter,
    args: LeadAddArgs,
) -> Result<Lead, LeadlineError> {
    require_e164("--phone", &args.phone)?;

    if storage.get_tenant(&args.tenant).await?.is_none() {
        return Err(LeadlineError::NotFound {
            entity: "tenant",
            key: args.tenant,
        });
    }
    if storage.lead_by_phone(&args.tenant, &args.phone).await?.is_some() {
        return Err(LeadlineError::Validation(format!(
            "lead {} already exists for tenant {}",
            args.phone, args.tenant
        )));
    }

    let lead = Lead {
        id: non_empty(args.id).unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        tenant_id: args.tenant,
        phone_number: args.phone,
        display_name: args.name,
        status: LeadStatus::New,
        created_at: now(),
    };
    storage.insert_lead(&lead).await?;
    tracing::info!(lead_id = %lead.id, tenant_id = %lead.tenant_id, "lead created");
    Ok(lead)
}

pub async fn add_tenant(config: &LeadlineConfig, args: TenantAddArgs) -> Result<(), LeadlineError> {
    let storage = open_storage(config).await?;
    let tenant = create_tenant(&storage, args).await?;
    println!(
        "tenant {} created for {}",
        tenant.id, tenant.telephony.sending_number
    );
    storage.close().await
}

pub async fn list_tenants(config: &LeadlineConfig) -> Result<(), LeadlineError> {
    let storage = open_storage(config).await?;
    let all = tenants::list_tenants(storage.database()?).await?;
    if all.is_empty() {
        println!("no tenants");
    }
    for tenant in &all {
        println!(
            "{:<38} {:<16} {:<12} {}",
            tenant.id,
            tenant.telephony.sending_number,
            tenant.default_agent_id.as_deref().unwrap_or("-"),
            tenant.name
        );
    }
    storage.close().await
}

pub async fn add_lead(config: &LeadlineConfig, args: LeadAddArgs) -> Result<(), LeadlineError> {
    let storage = open_storage(config).await?;
    let lead = create_lead(&storage, args).await?;
    println!("lead {} created for tenant {}", lead.id, lead.tenant_id);
    storage.close().await
}

/// One line per message: sequence, direction, status, body.
pub(crate) fn render_history(messages: &[Message]) -> String {
    let mut out = String::new();
    for m in messages {
        out.push_str(&format!(
            "{:>4}  {:<9} {:<7} {}",
            m.sequence, m.direction, m.status, m.body
        ));
        if let Some(media) = &m.media {
            out.push_str(&format!(" [media {}]", media.url));
        }
        if let Some(error) = &m.error {
            out.push_str(&format!(" (error: {error})"));
        }
        out.push('\n');
    }
    out
}

pub async fn print_history(
    config: &LeadlineConfig,
    conversation_id: &str,
    as_json: bool,
) -> Result<(), LeadlineError> {
    let storage = open_storage(config).await?;
    let conversation = storage
        .get_conversation(conversation_id)
        .await?
        .ok_or_else(|| LeadlineError::NotFound {
            entity: "conversation",
            key: conversation_id.to_string(),
        })?;
    let messages = storage.list_messages(conversation_id).await?;

    if as_json {
        let body = json!({ "conversation": conversation, "messages": messages });
        let text = serde_json::to_string_pretty(&body)
            .map_err(|e| LeadlineError::Internal(format!("failed to encode history: {e}")))?;
        println!("{text}");
    } else {
        println!(
            "conversation {} (tenant {}, lead {}, agent {})",
            conversation.id, conversation.tenant_id, conversation.lead_id, conversation.agent_id
        );
        print!("{}", render_history(&messages));
    }
    storage.close().await
}
