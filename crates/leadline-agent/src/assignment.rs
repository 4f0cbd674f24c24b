// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent assignment for newly created conversations.

use leadline_core::Tenant;

/// Picks the agent for a new conversation: the tenant's default agent when it
/// has one, otherwise the platform-wide default.
pub fn assign_agent<'a>(tenant: &'a Tenant, platform_default: &'a str) -> &'a str {
    tenant
        .default_agent_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(platform_default)
}

#[cfg(test)]
mod tests {
    use leadline_test_utils::fixtures::tenant;

    use super::*;

    #[test]
    fn tenant_default_wins() {
        let mut t = tenant("t1", "+15550000000", "s");
        t.default_agent_id = Some("closer".into());
        assert_eq!(assign_agent(&t, "default"), "closer");
    }

    #[test]
    fn falls_back_to_platform_default() {
        let mut t = tenant("t1", "+15550000000", "s");
        assert_eq!(assign_agent(&t, "default"), "default");

        t.default_agent_id = Some("  ".into());
        assert_eq!(assign_agent(&t, "default"), "default");
    }
}
