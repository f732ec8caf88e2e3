//! Category mapping rule models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Priority given to rules synthesized from a manual assignment.
/// Configured rules must stay below it.
pub const PRODUCT_RULE_PRIORITY: i32 = 100;

/// Id prefix of rules scoped to a single ERPNext item code
pub const PRODUCT_RULE_PREFIX: &str = "product-";

/// Predicate a rule tests against a remote item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RuleMatcher {
    /// Case-insensitive regular expression tested against item name or code
    Pattern { pattern: String },
    /// Exact match against the ERPNext item group
    ErpnextGroup { item_group: String },
}

impl RuleMatcher {
    pub fn kind(&self) -> &'static str {
        match self {
            RuleMatcher::Pattern { .. } => "pattern",
            RuleMatcher::ErpnextGroup { .. } => "erpnext-group",
        }
    }

    /// A blank pattern or group never matches anything
    pub fn is_blank(&self) -> bool {
        match self {
            RuleMatcher::Pattern { pattern } => pattern.trim().is_empty(),
            RuleMatcher::ErpnextGroup { item_group } => item_group.trim().is_empty(),
        }
    }
}

/// Escape the characters that are special in a regular expression
pub fn escape_literal(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '.' | '*' | '+' | '?' | '^' | '$' | '{' | '}' | '(' | ')' | '|' | '[' | ']' | '\\'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Anchored pattern matching exactly one item code
pub fn item_code_pattern(item_code: &str) -> String {
    format!("^{}$", escape_literal(item_code))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MappingRule {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub matcher: RuleMatcher,
    pub target_category_id: Uuid,
    pub target_subcategory_id: Option<Uuid>,
    /// Higher wins
    pub priority: i32,
    pub is_active: bool,
}

impl MappingRule {
    /// Whether the rule pins a single item code: `product-{code}` with the
    /// anchored pattern for that same code
    pub fn is_product_rule(&self) -> bool {
        let Some(code) = self.id.strip_prefix(PRODUCT_RULE_PREFIX) else {
            return false;
        };
        match &self.matcher {
            RuleMatcher::Pattern { pattern } => !code.is_empty() && *pattern == item_code_pattern(code),
            RuleMatcher::ErpnextGroup { .. } => false,
        }
    }
}

/// Row of `category_mapping_rules`
#[derive(Debug, Clone, FromRow)]
pub struct MappingRuleRow {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub pattern: Option<String>,
    pub item_group: Option<String>,
    pub target_category_id: Uuid,
    pub target_subcategory_id: Option<Uuid>,
    pub priority: i32,
    pub is_active: bool,
}

impl TryFrom<MappingRuleRow> for MappingRule {
    type Error = String;

    fn try_from(row: MappingRuleRow) -> Result<Self, Self::Error> {
        let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        let matcher = match (row.kind.as_str(), present(row.pattern), present(row.item_group)) {
            ("pattern", Some(pattern), _) => RuleMatcher::Pattern { pattern },
            ("erpnext-group", _, Some(item_group)) => RuleMatcher::ErpnextGroup { item_group },
            (kind, _, _) => {
                return Err(format!("Mapping rule {} has incomplete kind '{}'", row.id, kind))
            }
        };

        Ok(Self {
            id: row.id,
            name: row.name,
            matcher,
            target_category_id: row.target_category_id,
            target_subcategory_id: row.target_subcategory_id,
            priority: row.priority,
            is_active: row.is_active,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let rule: MappingRule = serde_json::from_value(json!({
            "id": "drops",
            "name": "Drops group",
            "type": "erpnext-group",
            "item_group": "Drops",
            "target_category_id": "6f1c1ad4-3e4b-4f64-9d43-0e0a3a3e9a01",
            "target_subcategory_id": null,
            "priority": 10,
            "is_active": true
        }))
        .unwrap();

        assert_eq!(
            rule.matcher,
            RuleMatcher::ErpnextGroup { item_group: "Drops".to_string() }
        );
        assert_eq!(rule.matcher.kind(), "erpnext-group");
        assert!(!rule.is_product_rule());
    }

    #[test]
    fn test_row_without_pattern_rejected() {
        let row = MappingRuleRow {
            id: "broken".to_string(),
            name: "Broken".to_string(),
            kind: "pattern".to_string(),
            pattern: None,
            item_group: None,
            target_category_id: Uuid::nil(),
            target_subcategory_id: None,
            priority: 1,
            is_active: true,
        };
        assert!(MappingRule::try_from(row).is_err());
    }

    fn row(kind: &str, pattern: Option<&str>, item_group: Option<&str>) -> MappingRuleRow {
        MappingRuleRow {
            id: "r".to_string(),
            name: "R".to_string(),
            kind: kind.to_string(),
            pattern: pattern.map(str::to_string),
            item_group: item_group.map(str::to_string),
            target_category_id: Uuid::nil(),
            target_subcategory_id: None,
            priority: 1,
            is_active: true,
        }
    }

    #[test]
    fn test_row_with_blank_matcher_rejected() {
        assert!(MappingRule::try_from(row("pattern", Some(""), None)).is_err());
        assert!(MappingRule::try_from(row("erpnext-group", None, Some("  "))).is_err());
        assert!(MappingRule::try_from(row("erpnext-group", None, Some("Drops"))).is_ok());
    }

    #[test]
    fn test_product_rule_requires_anchored_code() {
        let rule = |id: &str, pattern: &str| MappingRule {
            id: id.to_string(),
            name: id.to_string(),
            matcher: RuleMatcher::Pattern { pattern: pattern.to_string() },
            target_category_id: Uuid::nil(),
            target_subcategory_id: None,
            priority: PRODUCT_RULE_PRIORITY,
            is_active: true,
        };

        assert!(rule("product-ITM.1", r"^ITM\.1$").is_product_rule());
        assert!(!rule("product-ITM.1", "^ITM.1$").is_product_rule());
        assert!(!rule("product-anything", ".*").is_product_rule());
        assert!(!rule("product-", "^$").is_product_rule());
    }

    #[test]
    fn test_blank_matcher() {
        assert!(RuleMatcher::Pattern { pattern: " ".to_string() }.is_blank());
        assert!(RuleMatcher::ErpnextGroup { item_group: String::new() }.is_blank());
        assert!(!RuleMatcher::Pattern { pattern: "^A".to_string() }.is_blank());
    }
}
