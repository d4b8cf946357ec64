// src/system/security.rs

//! Baseline protection status: registered antivirus, firewall profiles and
//! UAC. Sources that cannot be queried count as "off" instead of failing the
//! probe, so the summary always lands on the worst defensible answer.

use anyhow::Result;

/// Snapshot of the host's baseline protections.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct SecurityReport {
    /// Display name of the registered antivirus product, if any.
    pub antivirus: Option<String>,
    pub antivirus_enabled: bool,
    pub firewall_enabled: bool,
    pub uac_enabled: bool,
}

impl SecurityReport {
    pub fn all_clear(&self) -> bool {
        self.antivirus_enabled && self.firewall_enabled && self.uac_enabled
    }

    pub fn summary(&self) -> &'static str {
        if self.all_clear() {
            "ok"
        } else {
            "needs attention"
        }
    }
}

/// Security Center encodes product state as a bitmask; bit 12 set means the
/// product is switched on.
const PRODUCT_ENABLED_BIT: u32 = 0x1000;

/// Parses `displayName|productState` lines from the SecurityCenter2
/// AntivirusProduct query into (name, enabled) pairs.
pub fn parse_antivirus_lines(output: &str) -> Vec<(String, bool)> {
    output
        .lines()
        .filter_map(|line| {
            let (name, state) = line.trim().split_once('|')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let state: u32 = state.trim().parse().ok()?;
            Some((name.to_string(), state & PRODUCT_ENABLED_BIT != 0))
        })
        .collect()
}

/// Parses the per-profile `State` lines of `netsh advfirewall show
/// allprofiles`, one bool per profile. `Estado` plus ACTIVAR/DESACTIVAR
/// cover Spanish consoles.
pub fn parse_firewall_states(output: &str) -> Vec<bool> {
    output
        .lines()
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let first = tokens.next()?;
            if !first.eq_ignore_ascii_case("State") && !first.eq_ignore_ascii_case("Estado") {
                return None;
            }
            match tokens.last()?.to_uppercase().as_str() {
                "ON" | "ACTIVAR" => Some(true),
                "OFF" | "DESACTIVAR" => Some(false),
                _ => None,
            }
        })
        .collect()
}

#[cfg(windows)]
const ANTIVIRUS_QUERY: &str = r#"Get-CimInstance -Namespace root/SecurityCenter2 -ClassName AntivirusProduct | ForEach-Object { "$($_.displayName)|$($_.productState)" }"#;

/// Gathers the report. Prefers an enabled product when several antivirus
/// registrations exist; the firewall counts as on only when every profile is.
#[cfg(windows)]
pub fn collect_security_report() -> Result<SecurityReport> {
    use crate::constants::{UAC_POLICY_KEY, UAC_POLICY_VALUE};
    use crate::utils::command::{run_hidden_checked, run_powershell};
    use crate::utils::registry::{self, RegistryValue};

    let mut report = SecurityReport::default();

    match run_powershell(ANTIVIRUS_QUERY) {
        Ok(output) => {
            let products = parse_antivirus_lines(&output);
            if let Some((name, enabled)) = products
                .iter()
                .find(|(_, enabled)| *enabled)
                .or_else(|| products.first())
            {
                report.antivirus = Some(name.clone());
                report.antivirus_enabled = *enabled;
            }
        }
        Err(e) => tracing::warn!("Antivirus query failed: {:?}", e),
    }

    match run_hidden_checked("netsh", &["advfirewall", "show", "allprofiles"]) {
        Ok(output) => {
            let states = parse_firewall_states(&output);
            report.firewall_enabled = !states.is_empty() && states.iter().all(|on| *on);
        }
        Err(e) => tracing::warn!("Firewall query failed: {:?}", e),
    }

    report.uac_enabled = matches!(
        registry::read_value(UAC_POLICY_KEY, UAC_POLICY_VALUE),
        Ok(Some(RegistryValue::Dword(1)))
    );

    Ok(report)
}

#[cfg(not(windows))]
pub fn collect_security_report() -> Result<SecurityReport> {
    anyhow::bail!("the security probe is only available on Windows")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn product_state_bit_distinguishes_enabled_products() {
        let products = parse_antivirus_lines("Windows Defender|397568\nDormant AV|262144\n");
        assert_eq!(
            products,
            vec![
                ("Windows Defender".to_string(), true),
                ("Dormant AV".to_string(), false),
            ]
        );
    }

    #[test]
    fn malformed_antivirus_lines_are_dropped() {
        let products = parse_antivirus_lines("|397568\nNo state here\nReal AV|notanumber\n");
        assert!(products.is_empty());
    }

    #[test]
    fn firewall_states_parse_one_flag_per_profile() {
        let output = "\
Domain Profile Settings:\n\
----------------------------------------------------------------------\n\
State                                 ON\n\
\n\
Private Profile Settings:\n\
----------------------------------------------------------------------\n\
State                                 ON\n\
\n\
Public Profile Settings:\n\
----------------------------------------------------------------------\n\
State                                 OFF\n";

        assert_eq!(parse_firewall_states(output), vec![true, true, false]);
    }

    #[test]
    fn localized_firewall_output_is_understood() {
        let output = "Estado                                ACTIVAR\n";
        assert_eq!(parse_firewall_states(output), vec![true]);
    }

    #[test]
    fn the_summary_needs_every_protection() {
        let mut report = SecurityReport {
            antivirus: Some("Windows Defender".to_string()),
            antivirus_enabled: true,
            firewall_enabled: true,
            uac_enabled: true,
        };
        assert_eq!(report.summary(), "ok");

        report.uac_enabled = false;
        assert_eq!(report.summary(), "needs attention");
    }
}
