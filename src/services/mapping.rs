//! Category mapping engine: proposes a local category for a remote item.

use regex::{Regex, RegexBuilder};
use uuid::Uuid;

use crate::models::{
    mapping_rule::{item_code_pattern, PRODUCT_RULE_PREFIX, PRODUCT_RULE_PRIORITY},
    MappingOutcome, MappingRule, RemoteItem, RuleMatcher,
};

/// Item groups whose items span many subcategories and always need an
/// operator-picked subcategory.
pub const AMBIGUOUS_GROUPS: &[&str] = &["Drops", "Specialties"];

enum Test {
    Pattern(Regex),
    Group(String),
}

struct PreparedRule {
    rule: MappingRule,
    test: Test,
}

impl PreparedRule {
    fn matches(&self, item: &RemoteItem) -> bool {
        match &self.test {
            Test::Pattern(re) => re.is_match(&item.item_name) || re.is_match(&item.item_code),
            Test::Group(group) => item.item_group == *group,
        }
    }
}

/// Active rules compiled once and ordered by descending priority.
///
/// Ties keep the order of the input. Blank or invalid rules are dropped
/// with a warning and never match.
pub struct PreparedRules {
    rules: Vec<PreparedRule>,
}

impl PreparedRules {
    pub fn new(rules: &[MappingRule]) -> Self {
        let mut prepared: Vec<PreparedRule> = rules
            .iter()
            .filter(|r| r.is_active)
            .filter_map(|rule| {
                if rule.matcher.is_blank() {
                    tracing::warn!("Ignoring mapping rule {} with a blank {}", rule.id, rule.matcher.kind());
                    return None;
                }
                let test = match &rule.matcher {
                    RuleMatcher::Pattern { pattern } => {
                        match RegexBuilder::new(pattern).case_insensitive(true).build() {
                            Ok(re) => Test::Pattern(re),
                            Err(e) => {
                                tracing::warn!("Invalid pattern in mapping rule {}: {}", rule.id, e);
                                return None;
                            }
                        }
                    }
                    RuleMatcher::ErpnextGroup { item_group } => Test::Group(item_group.clone()),
                };
                Some(PreparedRule { rule: rule.clone(), test })
            })
            .collect();
        // sort_by is stable
        prepared.sort_by(|a, b| b.rule.priority.cmp(&a.rule.priority));
        Self { rules: prepared }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Select the highest-priority rule matching `item`
    pub fn apply(&self, item: &RemoteItem) -> MappingOutcome {
        let Some(prepared) = self.rules.iter().find(|p| p.matches(item)) else {
            return MappingOutcome::default();
        };
        let rule = &prepared.rule;

        let requires_manual_selection = match &rule.matcher {
            RuleMatcher::ErpnextGroup { item_group } => AMBIGUOUS_GROUPS.contains(&item_group.as_str()),
            RuleMatcher::Pattern { .. } => false,
        };

        MappingOutcome {
            category_id: Some(rule.target_category_id),
            subcategory_id: rule.target_subcategory_id,
            rule_name: Some(rule.name.clone()),
            requires_manual_selection,
        }
    }
}

/// Select the highest-priority active rule matching `item`.
pub fn apply_rules(item: &RemoteItem, rules: &[MappingRule]) -> MappingOutcome {
    PreparedRules::new(rules).apply(item)
}

/// Rule pinning one ERPNext item code to an operator-chosen placement
pub fn product_rule(
    item_code: &str,
    item_name: &str,
    category_id: Uuid,
    subcategory_id: Option<Uuid>,
) -> MappingRule {
    MappingRule {
        id: format!("{}{}", PRODUCT_RULE_PREFIX, item_code),
        name: format!("Product: {}", item_name),
        matcher: RuleMatcher::Pattern {
            pattern: item_code_pattern(item_code),
        },
        target_category_id: category_id,
        target_subcategory_id: subcategory_id,
        priority: PRODUCT_RULE_PRIORITY,
        is_active: true,
    }
}
