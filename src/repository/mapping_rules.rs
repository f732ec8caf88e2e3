//! Category mapping rules repository

use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        mapping_rule::MappingRuleRow,
        MappingRule, RuleMatcher,
    },
};

#[derive(Clone)]
pub struct MappingRulesRepository {
    pool: Pool<Postgres>,
}

impl MappingRulesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Saved rules in creation order. Malformed rows are skipped.
    pub async fn list(&self) -> AppResult<Vec<MappingRule>> {
        let rows = sqlx::query_as::<_, MappingRuleRow>(
            r#"
            SELECT id, name, kind, pattern, item_group, target_category_id,
                   target_subcategory_id, priority, is_active
            FROM category_mapping_rules
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match MappingRule::try_from(row) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    tracing::warn!("Skipping mapping rule: {}", e);
                    None
                }
            })
            .collect())
    }

    /// Insert or replace a rule by id
    pub async fn upsert(&self, rule: &MappingRule) -> AppResult<()> {
        let (pattern, item_group) = match &rule.matcher {
            RuleMatcher::Pattern { pattern } => (Some(pattern.as_str()), None),
            RuleMatcher::ErpnextGroup { item_group } => (None, Some(item_group.as_str())),
        };

        sqlx::query(
            r#"
            INSERT INTO category_mapping_rules (
                id, name, kind, pattern, item_group, target_category_id,
                target_subcategory_id, priority, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                kind = EXCLUDED.kind,
                pattern = EXCLUDED.pattern,
                item_group = EXCLUDED.item_group,
                target_category_id = EXCLUDED.target_category_id,
                target_subcategory_id = EXCLUDED.target_subcategory_id,
                priority = EXCLUDED.priority,
                is_active = EXCLUDED.is_active
            "#,
        )
        .bind(&rule.id)
        .bind(&rule.name)
        .bind(rule.matcher.kind())
        .bind(pattern)
        .bind(item_group)
        .bind(rule.target_category_id)
        .bind(rule.target_subcategory_id)
        .bind(rule.priority)
        .bind(rule.is_active)
        .execute(&self.pool)
        .await?;

        tracing::debug!("Saved mapping rule {}", rule.id);
        Ok(())
    }
}
