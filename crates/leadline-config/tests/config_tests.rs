// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Leadline configuration system.

use figment::Jail;
use leadline_config::diagnostic::ConfigError;
use leadline_config::model::LeadlineConfig;
use leadline_config::{
    ReplyMode, load_and_validate_str, load_config_from_path, load_config_from_str,
};

#[test]
fn full_toml_deserializes() {
    let toml = r#"
[server]
host = "0.0.0.0"
port = 9000
log_level = "debug"
public_base_url = "https://sms.example.com"
admin_token = "ops-token"

[storage]
database_path = "/tmp/leadline-test.db"
wal_mode = false

[telephony]
api_base_url = "http://localhost:4010"
signature_header = "X-Twilio-Signature"
request_timeout_ms = 2500
status_callback_url = "https://sms.example.com/webhooks/sms/status"

[completion]
api_key = "sk-platform"
model = "claude-haiku-4-5"
max_tokens = 160

[reply]
mode = "deferred"
generation_timeout_ms = 3000
history_window = 8
fallback_message = "Thanks, we'll get back to you shortly."
unknown_lead_reply = ""

[agents]
default_agent_id = "front-desk"

[prometheus]
enabled = true
"#;

    let config = load_and_validate_str(toml).expect("valid config");
    assert_eq!(config.server.port, 9000);
    assert_eq!(
        config.server.public_base_url.as_deref(),
        Some("https://sms.example.com")
    );
    assert!(!config.storage.wal_mode);
    assert_eq!(config.telephony.signature_header, "X-Twilio-Signature");
    assert_eq!(config.telephony.request_timeout_ms, 2500);
    assert_eq!(config.completion.model, "claude-haiku-4-5");
    assert_eq!(config.reply.mode, ReplyMode::Deferred);
    assert_eq!(config.reply.history_window, 8);
    assert_eq!(config.reply.unknown_lead_reply.as_deref(), Some(""));
    assert_eq!(config.agents.default_agent_id, "front-desk");
    assert!(config.prometheus.enabled);
}

#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty config is valid");
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.telephony.signature_header, "X-Provider-Signature");
    assert_eq!(config.reply.mode, ReplyMode::Inline);
    assert_eq!(config.reply.generation_timeout_ms, 4000);
    assert_eq!(config.reply.history_window, 20);
    assert!(config.reply.fallback_message.is_none());
    assert_eq!(config.agents.default_agent_id, "default");
    assert!(!config.prometheus.enabled);
}

#[test]
fn unknown_key_is_rejected_with_suggestion() {
    let toml = "[reply]\nhistroy_window = 5\n";
    let errors = load_and_validate_str(toml).expect_err("unknown key");
    let found = errors.iter().any(|e| {
        matches!(
            e,
            ConfigError::UnknownKey { key, suggestion, .. }
                if key == "histroy_window" && suggestion.as_deref() == Some("history_window")
        )
    });
    assert!(found, "expected an unknown-key diagnostic, got {errors:?}");
}

#[test]
fn unknown_top_level_section_is_rejected() {
    let err = load_config_from_str("[telegram]\nbot_token = \"x\"\n").expect_err("unknown section");
    assert!(err.to_string().contains("telegram"));
}

#[test]
fn invalid_reply_mode_is_rejected() {
    let errors = load_and_validate_str("[reply]\nmode = \"eventually\"\n").expect_err("bad mode");
    assert!(!errors.is_empty());
}

#[test]
fn wrong_type_yields_invalid_type() {
    let errors = load_and_validate_str("[server]\nport = \"eighty\"\n").expect_err("bad type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("port")))
    );
}

#[test]
fn validation_errors_surface_through_loader() {
    let errors = load_and_validate_str("[reply]\nhistory_window = 0\n").expect_err("invalid");
    assert!(matches!(
        &errors[0],
        ConfigError::Validation { message } if message.contains("history_window")
    ));
}

#[test]
fn env_overrides_file_values() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "leadline.toml",
            "[reply]\nhistory_window = 5\n[agents]\ndefault_agent_id = \"file\"\n",
        )?;
        jail.set_env("LEADLINE_REPLY_HISTORY_WINDOW", "12");
        jail.set_env("LEADLINE_AGENTS_DEFAULT_AGENT_ID", "env");
        jail.set_env("LEADLINE_REPLY_MODE", "deferred");

        let config = load_config_from_path(std::path::Path::new("leadline.toml"))?;
        assert_eq!(config.reply.history_window, 12);
        assert_eq!(config.agents.default_agent_id, "env");
        assert_eq!(config.reply.mode, ReplyMode::Deferred);
        Ok(())
    });
}

#[test]
fn secrets_do_not_leak_through_debug() {
    let config = load_config_from_str(
        "[server]\nadmin_token = \"ops-secret\"\n[completion]\napi_key = \"sk-secret\"\n",
    )
    .expect("valid");
    let debug = format!("{config:?}");
    assert!(!debug.contains("ops-secret"));
    assert!(!debug.contains("sk-secret"));
}

#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let errors = load_and_validate_str("[server]\nhots = \"0.0.0.0\"\n").expect_err("typo");
    let handler = GraphicalReportHandler::new();
    let mut out = String::new();
    let diagnostic: &dyn Diagnostic = &errors[0];
    handler.render_report(&mut out, diagnostic).expect("render");
    assert!(out.contains("hots"));
    assert!(out.contains("host"));
}

#[test]
fn default_round_trips_through_toml() {
    let serialized = toml::to_string(&LeadlineConfig::default()).expect("serialize");
    let parsed = load_and_validate_str(&serialized).expect("defaults reparse");
    assert_eq!(parsed.reply.history_window, 20);
}
