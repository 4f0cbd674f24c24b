// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook payloads and acknowledgement bodies.

use leadline_core::MediaAttachment;

/// A required form field was absent or empty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("missing required field `{0}`")]
pub struct MissingField(pub &'static str);

fn field<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

fn required(params: &[(String, String)], name: &'static str) -> Result<String, MissingField> {
    match field(params, name) {
        Some(v) if !v.trim().is_empty() => Ok(v.to_string()),
        _ => Err(MissingField(name)),
    }
}

/// An inbound SMS as delivered by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundSms {
    /// Provider message id, the idempotency key.
    pub message_sid: String,
    /// The lead's number.
    pub from: String,
    /// The tenant's number.
    pub to: String,
    pub body: String,
    /// First attachment only.
    pub media: Option<MediaAttachment>,
}

impl InboundSms {
    /// Parse from decoded form parameters.
    ///
    /// `Body` must be present but may be empty (media-only messages).
    pub fn from_params(params: &[(String, String)]) -> Result<Self, MissingField> {
        let message_sid = required(params, "MessageSid")?;
        let from = required(params, "From")?;
        let to = required(params, "To")?;
        let body = field(params, "Body")
            .ok_or(MissingField("Body"))?
            .to_string();
        let media = field(params, "MediaUrl0")
            .filter(|url| !url.is_empty())
            .map(|url| MediaAttachment {
                url: url.to_string(),
                content_type: field(params, "MediaContentType0")
                    .filter(|t| !t.is_empty())
                    .map(str::to_string),
            });

        Ok(Self {
            message_sid,
            from,
            to,
            body,
            media,
        })
    }

    /// Only the untrusted `To` field, for tenant resolution before the
    /// signature is checked.
    pub fn receiving_number(params: &[(String, String)]) -> Option<&str> {
        field(params, "To").filter(|v| !v.trim().is_empty())
    }
}

/// An asynchronous delivery-status callback for a message we sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCallback {
    pub message_sid: String,
    pub message_status: String,
    /// Our sending number.
    pub from: String,
    pub error_code: Option<String>,
}

impl StatusCallback {
    pub fn from_params(params: &[(String, String)]) -> Result<Self, MissingField> {
        Ok(Self {
            message_sid: required(params, "MessageSid")?,
            message_status: required(params, "MessageStatus")?,
            from: required(params, "From")?,
            error_code: field(params, "ErrorCode")
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        })
    }

    /// Whether the provider reports the message as not delivered.
    pub fn is_failure(&self) -> bool {
        matches!(self.message_status.as_str(), "failed" | "undelivered")
    }
}

/// Empty acknowledgement body.
pub fn ack_xml() -> String {
    r#"<?xml version="1.0" encoding="UTF-8"?><Response></Response>"#.to_string()
}

/// Acknowledgement that also replies with `text`.
pub fn message_xml(text: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><Response><Message>{}</Message></Response>"#,
        escape_xml(text)
    )
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_inbound_with_media() {
        let sms = InboundSms::from_params(&p(&[
            ("MessageSid", "SM1"),
            ("From", "+15551234567"),
            ("To", "+15550000000"),
            ("Body", "see pic"),
            ("MediaUrl0", "https://media.example.com/a.jpg"),
            ("MediaContentType0", "image/jpeg"),
        ]))
        .unwrap();
        assert_eq!(sms.message_sid, "SM1");
        assert_eq!(
            sms.media.unwrap().content_type.as_deref(),
            Some("image/jpeg")
        );
    }

    #[test]
    fn missing_fields_are_reported() {
        let err = InboundSms::from_params(&p(&[("From", "+1"), ("To", "+2"), ("Body", "x")]))
            .unwrap_err();
        assert_eq!(err, MissingField("MessageSid"));

        let err = InboundSms::from_params(&p(&[("MessageSid", "SM1"), ("From", "+1"), ("To", "+2")]))
            .unwrap_err();
        assert_eq!(err, MissingField("Body"));
    }

    #[test]
    fn empty_body_is_allowed() {
        let sms = InboundSms::from_params(&p(&[
            ("MessageSid", "SM1"),
            ("From", "+1"),
            ("To", "+2"),
            ("Body", ""),
        ]))
        .unwrap();
        assert!(sms.body.is_empty());
        assert!(sms.media.is_none());
    }

    #[test]
    fn status_callback_failure_detection() {
        let cb = StatusCallback::from_params(&p(&[
            ("MessageSid", "SM9"),
            ("MessageStatus", "undelivered"),
            ("From", "+15550000000"),
            ("ErrorCode", "30003"),
        ]))
        .unwrap();
        assert!(cb.is_failure());
        assert_eq!(cb.error_code.as_deref(), Some("30003"));

        let delivered = StatusCallback {
            message_status: "delivered".into(),
            ..cb
        };
        assert!(!delivered.is_failure());
    }

    #[test]
    fn message_xml_escapes_text() {
        assert_eq!(
            message_xml("Tom & Jerry <3"),
            r#"<?xml version="1.0" encoding="UTF-8"?><Response><Message>Tom &amp; Jerry &lt;3</Message></Response>"#
        );
        assert!(ack_xml().ends_with("<Response></Response>"));
    }
}
