//! Tenant and gateway inference from vendor device names.
//!
//! Vendor devices carry only a free-form display name. Ownership is inferred
//! by an ordered list of matchers; the first matcher that identifies exactly
//! one tenant wins. When nothing matches, the result is `Unresolved` and the
//! device is surfaced for manual assignment instead of being guessed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Gateway, Pharmacy};

lazy_static::lazy_static! {
    static ref TOKEN_REGEX: regex::Regex = regex::Regex::new(r"[A-Za-z0-9]+").unwrap();
    static ref WHITESPACE_REGEX: regex::Regex = regex::Regex::new(r"\s+").unwrap();
}

/// Minimum length for a tenant code to be matched as a bare substring.
const MIN_EMBEDDED_CODE_LEN: usize = 3;

/// Outcome of an inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inference {
    Resolved { id: Uuid, rule: &'static str },
    Unresolved,
}

impl Inference {
    pub fn id(&self) -> Option<Uuid> {
        match self {
            Inference::Resolved { id, .. } => Some(*id),
            Inference::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Inference::Resolved { .. })
    }
}

/// A single tenant matching rule.
///
/// Returns a tenant only if exactly one tenant satisfies the rule.
pub trait TenantMatcher: Send + Sync {
    fn rule(&self) -> &'static str;

    fn matches(&self, name: &str, tenants: &[Pharmacy]) -> Option<Uuid>;
}

fn unique(mut ids: Vec<Uuid>) -> Option<Uuid> {
    ids.sort();
    ids.dedup();
    match ids.as_slice() {
        [id] => Some(*id),
        _ => None,
    }
}

fn normalize(s: &str) -> String {
    WHITESPACE_REGEX
        .replace_all(s.trim(), " ")
        .to_lowercase()
}

fn tokens(name: &str) -> Vec<String> {
    TOKEN_REGEX
        .find_iter(name)
        .map(|m| m.as_str().to_uppercase())
        .collect()
}

/// Matches tenant short codes embedded in the device name.
///
/// Whole tokens are tried first ("FRIDGE-DT01-A" → "DT01"); longer codes may
/// also match as a bare substring ("DTWN2" contains "DTWN").
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortCodeMatcher;

impl TenantMatcher for ShortCodeMatcher {
    fn rule(&self) -> &'static str {
        "short_code"
    }

    fn matches(&self, name: &str, tenants: &[Pharmacy]) -> Option<Uuid> {
        let name_tokens = tokens(name);
        let by_token: Vec<Uuid> = tenants
            .iter()
            .filter(|t| !t.code.is_empty())
            .filter(|t| name_tokens.iter().any(|tok| tok.eq_ignore_ascii_case(&t.code)))
            .map(|t| t.id)
            .collect();
        if !by_token.is_empty() {
            return unique(by_token);
        }

        let upper = name.to_uppercase();
        unique(
            tenants
                .iter()
                .filter(|t| t.code.len() >= MIN_EMBEDDED_CODE_LEN)
                .filter(|t| upper.contains(&t.code.to_uppercase()))
                .map(|t| t.id)
                .collect(),
        )
    }
}

/// Matches the tenant's full name contained in the device name.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullNameMatcher;

impl TenantMatcher for FullNameMatcher {
    fn rule(&self) -> &'static str {
        "full_name"
    }

    fn matches(&self, name: &str, tenants: &[Pharmacy]) -> Option<Uuid> {
        let name = normalize(name);
        unique(
            tenants
                .iter()
                .filter(|t| {
                    let tenant_name = normalize(&t.name);
                    !tenant_name.is_empty() && name.contains(&tenant_name)
                })
                .map(|t| t.id)
                .collect(),
        )
    }
}

/// A legacy naming keyword that identifies a tenant by code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordAlias {
    pub keyword: String,
    pub tenant_code: String,
}

impl KeywordAlias {
    pub fn new(keyword: impl Into<String>, tenant_code: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            tenant_code: tenant_code.into(),
        }
    }
}

/// Matches configured keyword aliases for legacy device naming.
#[derive(Debug, Clone, Default)]
pub struct KeywordAliasMatcher {
    aliases: Vec<KeywordAlias>,
}

impl KeywordAliasMatcher {
    pub fn new(aliases: Vec<KeywordAlias>) -> Self {
        Self { aliases }
    }
}

impl TenantMatcher for KeywordAliasMatcher {
    fn rule(&self) -> &'static str {
        "keyword_alias"
    }

    fn matches(&self, name: &str, tenants: &[Pharmacy]) -> Option<Uuid> {
        let name = normalize(name);
        let codes: HashMap<String, Uuid> = tenants
            .iter()
            .map(|t| (t.code.to_uppercase(), t.id))
            .collect();

        unique(
            self.aliases
                .iter()
                .filter(|a| {
                    let keyword = normalize(&a.keyword);
                    !keyword.is_empty() && name.contains(&keyword)
                })
                .filter_map(|a| codes.get(&a.tenant_code.trim().to_uppercase()).copied())
                .collect(),
        )
    }
}

type GatewayRule = fn(&str, &[Gateway], Option<Uuid>) -> Option<Uuid>;

/// Ordered gateway rules. The tenant argument is the sensor's inferred
/// tenant, if any.
const GATEWAY_RULES: &[(&str, GatewayRule)] = &[
    ("gateway_external_id", gateway_by_external_id as GatewayRule),
    ("gateway_name", gateway_by_name as GatewayRule),
    ("tenant_gateway", gateway_by_tenant as GatewayRule),
    ("single_gateway", single_gateway as GatewayRule),
];

/// Prefers external ids that appear as whole tokens ("GW-100 probe" is
/// GW-100, not GW-1), then the longest embedded id.
fn gateway_by_external_id(sensor_name: &str, gateways: &[Gateway], _: Option<Uuid>) -> Option<Uuid> {
    let upper = sensor_name.to_uppercase();
    let embedded: Vec<(&Gateway, String)> = gateways
        .iter()
        .filter(|g| !g.external_id.is_empty())
        .map(|g| (g, g.external_id.to_uppercase()))
        .filter(|(_, id)| upper.contains(id.as_str()))
        .collect();

    let bounded: Vec<Uuid> = embedded
        .iter()
        .filter(|(_, id)| contains_bounded(&upper, id))
        .map(|(g, _)| g.id)
        .collect();
    if !bounded.is_empty() {
        return unique(bounded);
    }

    let longest = embedded.iter().map(|(_, id)| id.len()).max()?;
    unique(
        embedded
            .iter()
            .filter(|(_, id)| id.len() == longest)
            .map(|(g, _)| g.id)
            .collect(),
    )
}

/// True if `needle` occurs in `haystack` with no alphanumeric character
/// directly before or after it.
fn contains_bounded(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

fn gateway_by_name(sensor_name: &str, gateways: &[Gateway], _: Option<Uuid>) -> Option<Uuid> {
    let name = normalize(sensor_name);
    unique(
        gateways
            .iter()
            .filter(|g| {
                let gateway_name = normalize(&g.name);
                !gateway_name.is_empty() && name.contains(&gateway_name)
            })
            .map(|g| g.id)
            .collect(),
    )
}

fn gateway_by_tenant(_: &str, gateways: &[Gateway], tenant: Option<Uuid>) -> Option<Uuid> {
    let tenant = tenant?;
    unique(
        gateways
            .iter()
            .filter(|g| g.pharmacy_id == Some(tenant))
            .map(|g| g.id)
            .collect(),
    )
}

fn single_gateway(_: &str, gateways: &[Gateway], _: Option<Uuid>) -> Option<Uuid> {
    match gateways {
        [only] => Some(only.id),
        _ => None,
    }
}

/// Ordered, first-match-wins tenant inference.
pub struct TenantInferenceEngine {
    matchers: Vec<Box<dyn TenantMatcher>>,
}

impl TenantInferenceEngine {
    /// Engine with the standard rule order: short code, full name, aliases.
    pub fn new(aliases: Vec<KeywordAlias>) -> Self {
        Self::with_matchers(vec![
            Box::new(ShortCodeMatcher),
            Box::new(FullNameMatcher),
            Box::new(KeywordAliasMatcher::new(aliases)),
        ])
    }

    pub fn with_matchers(matchers: Vec<Box<dyn TenantMatcher>>) -> Self {
        Self { matchers }
    }

    pub fn infer_tenant(&self, device_name: &str, tenants: &[Pharmacy]) -> Inference {
        self.matchers
            .iter()
            .find_map(|m| {
                m.matches(device_name, tenants)
                    .map(|id| Inference::Resolved { id, rule: m.rule() })
            })
            .unwrap_or(Inference::Unresolved)
    }

    /// Associates a sensor with one of the known gateways.
    ///
    /// Falls back to the only gateway when exactly one exists; with several
    /// candidates and no disambiguating rule the sensor stays unresolved.
    pub fn infer_gateway_for_sensor(
        &self,
        sensor_name: &str,
        gateways: &[Gateway],
        tenants: &[Pharmacy],
    ) -> Inference {
        let tenant = self.infer_tenant(sensor_name, tenants).id();
        GATEWAY_RULES
            .iter()
            .find_map(|&(rule, apply)| {
                apply(sensor_name, gateways, tenant).map(|id| Inference::Resolved { id, rule })
            })
            .unwrap_or(Inference::Unresolved)
    }
}

impl Default for TenantInferenceEngine {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn tenants() -> Vec<Pharmacy> {
        vec![
            Pharmacy::new("Downtown Pharmacy", "DT01"),
            Pharmacy::new("Riverside Health", "RVS"),
            Pharmacy::new("Hilltop Apothecary", "HT"),
        ]
    }

    fn gateway(external_id: &str, name: &str, pharmacy_id: Option<Uuid>) -> Gateway {
        let now = Utc::now();
        Gateway {
            id: Uuid::new_v4(),
            external_id: external_id.into(),
            name: name.into(),
            pharmacy_id,
            paired: true,
            last_seen_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_short_code_token_match() {
        let tenants = tenants();
        let engine = TenantInferenceEngine::default();

        let result = engine.infer_tenant("Fridge-DT01-back", &tenants);
        assert_eq!(
            result,
            Inference::Resolved {
                id: tenants[0].id,
                rule: "short_code"
            }
        );

        // Two-letter code only as a whole token.
        assert_eq!(engine.infer_tenant("ht freezer", &tenants).id(), Some(tenants[2].id));
        assert_eq!(engine.infer_tenant("LIGHTHOUSE", &tenants), Inference::Unresolved);
    }

    #[test]
    fn test_short_code_embedded_substring() {
        let tenants = tenants();
        let engine = TenantInferenceEngine::default();
        assert_eq!(engine.infer_tenant("GW_RVS2", &tenants).id(), Some(tenants[1].id));
    }

    #[test]
    fn test_full_name_match() {
        let tenants = tenants();
        let engine = TenantInferenceEngine::default();

        let result = engine.infer_tenant("Riverside  Health - vaccine fridge", &tenants);
        assert_eq!(
            result,
            Inference::Resolved {
                id: tenants[1].id,
                rule: "full_name"
            }
        );
    }

    #[test]
    fn test_keyword_alias_match() {
        let tenants = tenants();
        let engine = TenantInferenceEngine::new(vec![KeywordAlias::new("main street", "dt01")]);

        let result = engine.infer_tenant("Main Street back room", &tenants);
        assert_eq!(
            result,
            Inference::Resolved {
                id: tenants[0].id,
                rule: "keyword_alias"
            }
        );
    }

    #[test]
    fn test_rule_order_first_match_wins() {
        let tenants = tenants();
        let engine = TenantInferenceEngine::new(vec![KeywordAlias::new("downtown", "RVS")]);

        // Short code beats the alias pointing elsewhere.
        let result = engine.infer_tenant("DT01 downtown", &tenants);
        assert_eq!(result.id(), Some(tenants[0].id));
    }

    #[test]
    fn test_ambiguous_rule_does_not_guess() {
        let tenants = tenants();
        let engine = TenantInferenceEngine::default();
        assert_eq!(engine.infer_tenant("DT01 / RVS shared", &tenants), Inference::Unresolved);
    }

    #[test]
    fn test_no_match_is_unresolved() {
        let tenants = tenants();
        let engine = TenantInferenceEngine::default();
        assert_eq!(engine.infer_tenant("Sensor 42", &tenants), Inference::Unresolved);
        assert_eq!(engine.infer_tenant("", &tenants), Inference::Unresolved);
        assert_eq!(engine.infer_tenant("DT01", &[]), Inference::Unresolved);
    }

    #[test]
    fn test_custom_matcher_list() {
        struct Always(Uuid);
        impl TenantMatcher for Always {
            fn rule(&self) -> &'static str {
                "always"
            }
            fn matches(&self, _: &str, _: &[Pharmacy]) -> Option<Uuid> {
                Some(self.0)
            }
        }

        let id = Uuid::new_v4();
        let engine = TenantInferenceEngine::with_matchers(vec![Box::new(Always(id))]);
        assert_eq!(
            engine.infer_tenant("anything", &[]),
            Inference::Resolved { id, rule: "always" }
        );
    }

    #[test]
    fn test_gateway_by_external_id() {
        let tenants = tenants();
        let gateways = vec![gateway("GW-100", "Front", None), gateway("GW-200", "Back", None)];
        let engine = TenantInferenceEngine::default();

        let result = engine.infer_gateway_for_sensor("gw-200 probe 1", &gateways, &tenants);
        assert_eq!(
            result,
            Inference::Resolved {
                id: gateways[1].id,
                rule: "gateway_external_id"
            }
        );
    }

    #[test]
    fn test_gateway_external_id_prefers_whole_token() {
        let tenants = tenants();
        let gateways = vec![gateway("GW-1", "Front", None), gateway("GW-100", "Back", None)];
        let engine = TenantInferenceEngine::default();

        let result = engine.infer_gateway_for_sensor("GW-100 probe", &gateways, &tenants);
        assert_eq!(result.id(), Some(gateways[1].id));
        let result = engine.infer_gateway_for_sensor("probe gw-1", &gateways, &tenants);
        assert_eq!(result.id(), Some(gateways[0].id));
    }

    #[test]
    fn test_gateway_external_id_longest_embedded_match() {
        let tenants = tenants();
        let gateways = vec![gateway("GW1", "Front", None), gateway("GW12", "Back", None)];
        let engine = TenantInferenceEngine::default();

        let result = engine.infer_gateway_for_sensor("probeGW12x", &gateways, &tenants);
        assert_eq!(
            result,
            Inference::Resolved {
                id: gateways[1].id,
                rule: "gateway_external_id"
            }
        );
    }

    #[test]
    fn test_gateway_by_name() {
        let tenants = tenants();
        let gateways = vec![
            gateway("A1", "Downstairs Hub", None),
            gateway("B2", "Upstairs Hub", None),
        ];
        let engine = TenantInferenceEngine::default();

        let result = engine.infer_gateway_for_sensor("Upstairs hub fridge", &gateways, &tenants);
        assert_eq!(result.id(), Some(gateways[1].id));
    }

    #[test]
    fn test_gateway_by_tenant() {
        let tenants = tenants();
        let gateways = vec![
            gateway("A1", "Hub A", Some(tenants[0].id)),
            gateway("B2", "Hub B", Some(tenants[1].id)),
        ];
        let engine = TenantInferenceEngine::default();

        let result = engine.infer_gateway_for_sensor("RVS fridge probe", &gateways, &tenants);
        assert_eq!(
            result,
            Inference::Resolved {
                id: gateways[1].id,
                rule: "tenant_gateway"
            }
        );
    }

    #[test]
    fn test_single_gateway_fallback() {
        let tenants = tenants();
        let gateways = vec![gateway("A1", "Hub", None)];
        let engine = TenantInferenceEngine::default();

        let result = engine.infer_gateway_for_sensor("probe 7", &gateways, &tenants);
        assert_eq!(
            result,
            Inference::Resolved {
                id: gateways[0].id,
                rule: "single_gateway"
            }
        );
    }

    #[test]
    fn test_multiple_gateways_without_rule_is_unresolved() {
        let tenants = tenants();
        let gateways = vec![gateway("A1", "Hub A", None), gateway("B2", "Hub B", None)];
        let engine = TenantInferenceEngine::default();

        assert_eq!(
            engine.infer_gateway_for_sensor("probe 7", &gateways, &tenants),
            Inference::Unresolved
        );
        assert_eq!(
            engine.infer_gateway_for_sensor("probe 7", &[], &tenants),
            Inference::Unresolved
        );
    }
}
