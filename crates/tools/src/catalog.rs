//! Catalog search tool

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use omniline_persistence::{CatalogQuery, CatalogStore};

use crate::schema::{
    InputSchema, PropertySchema, Tool, ToolContext, ToolError, ToolOutput, ToolSchema,
};

/// Hard cap on returned items, whatever the store holds. Results are read
/// aloud; nobody listens to item eleven.
const MAX_RESULTS: usize = 10;

/// Descriptions are for speech, not display.
const SUMMARY_MAX_CHARS: usize = 200;

/// When the caller names an exact price, search a band around it instead of
/// a point: catalog prices rarely match a spoken figure to the euro.
const PRICE_BAND: f64 = 0.10;

pub struct SearchCatalogTool {
    catalog: Arc<dyn CatalogStore>,
}

impl SearchCatalogTool {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for SearchCatalogTool {
    fn name(&self) -> &str {
        "search_catalog"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "search_catalog".into(),
            description: "Recherche dans le catalogue du marchand (biens, services, produits). \
                          Utiliser exact_price quand le client donne un prix précis."
                .into(),
            input_schema: InputSchema::object()
                .property("category", PropertySchema::string("Catégorie d'articles"), false)
                .property("city", PropertySchema::string("Ville recherchée"), false)
                .property(
                    "keywords",
                    PropertySchema::string("Mots-clés libres (titre ou description)"),
                    false,
                )
                .property("min_price", PropertySchema::number("Prix minimum"), false)
                .property("max_price", PropertySchema::number("Prix maximum"), false)
                .property(
                    "exact_price",
                    PropertySchema::number("Prix exact annoncé par le client"),
                    false,
                ),
        }
    }

    async fn execute(&self, ctx: &ToolContext, args: Value) -> Result<ToolOutput, ToolError> {
        let mut query = CatalogQuery {
            category: string_arg(&args, "category"),
            city: string_arg(&args, "city"),
            keywords: string_arg(&args, "keywords"),
            min_price: number_arg(&args, "min_price"),
            max_price: number_arg(&args, "max_price"),
            limit: MAX_RESULTS,
        };

        // An exact price wins over explicit bounds.
        if let Some(price) = number_arg(&args, "exact_price") {
            query.min_price = Some(price * (1.0 - PRICE_BAND));
            query.max_price = Some(price * (1.0 + PRICE_BAND));
        }

        let items = match self.catalog.search(&ctx.tenant_id, &query).await {
            Ok(items) => items,
            Err(err) => {
                tracing::warn!(
                    conversation_id = %ctx.conversation_id,
                    error = %err,
                    "catalog search failed"
                );
                return Ok(ToolOutput::error(
                    "La recherche n'a pas abouti, le catalogue est momentanément indisponible.",
                ));
            }
        };

        if items.is_empty() {
            return Ok(ToolOutput::text(
                "Aucun article ne correspond à ces critères.",
            ));
        }

        let mut lines = Vec::with_capacity(items.len() + 1);
        lines.push(format!("{} résultat(s) :", items.len()));
        for item in &items {
            let mut summary = format!(
                "[{}] {} - {:.0} {}{}",
                item.id,
                item.title,
                item.price,
                item.currency,
                item.city
                    .as_deref()
                    .map(|c| format!(" à {c}"))
                    .unwrap_or_default(),
            );
            let description: String = item.description.chars().take(SUMMARY_MAX_CHARS).collect();
            if !description.is_empty() {
                summary.push_str(" : ");
                summary.push_str(&description);
            }
            lines.push(summary);
        }

        Ok(ToolOutput::text(lines.join("\n")))
    }
}

pub(crate) fn string_arg(args: &Value, key: &str) -> Option<String> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

pub(crate) fn number_arg(args: &Value, key: &str) -> Option<f64> {
    args.get(key).and_then(Value::as_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use omniline_persistence::MemoryStore;
    use serde_json::json;

    fn ctx() -> ToolContext {
        ToolContext {
            tenant_id: "tenant-1".into(),
            conversation_id: "conv-1".into(),
            caller: "+33612345678".into(),
        }
    }

    fn seeded_store() -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        store.seed_catalog(vec![
            omniline_persistence::CatalogItem {
                id: "a".into(),
                tenant_id: "tenant-1".into(),
                title: "Appartement T3".into(),
                description: "Trois pièces".into(),
                category: "real_estate".into(),
                price: 200_000.0,
                currency: "EUR".into(),
                city: Some("Lyon".into()),
                available: true,
            },
            omniline_persistence::CatalogItem {
                id: "b".into(),
                tenant_id: "tenant-1".into(),
                title: "Maison T5".into(),
                description: "Avec jardin".into(),
                category: "real_estate".into(),
                price: 450_000.0,
                currency: "EUR".into(),
                city: Some("Lyon".into()),
                available: true,
            },
        ]);
        store
    }

    #[tokio::test]
    async fn test_exact_price_band_overrides_bounds() {
        let store = seeded_store();
        let tool = SearchCatalogTool::new(store);

        let output = tool
            .execute(
                &ctx(),
                json!({"exact_price": 210_000.0, "min_price": 0.0, "max_price": 1.0}),
            )
            .await
            .unwrap();

        let text = output.first_text().unwrap();
        assert!(text.contains("Appartement T3"));
        assert!(!text.contains("Maison T5"));
    }

    #[tokio::test]
    async fn test_summary_carries_id_and_truncated_description() {
        let store = MemoryStore::new();
        store.seed_catalog(vec![omniline_persistence::CatalogItem {
            id: "long".into(),
            tenant_id: "tenant-1".into(),
            title: "Loft".into(),
            description: "grand ".repeat(60),
            category: "real_estate".into(),
            price: 300_000.0,
            currency: "EUR".into(),
            city: Some("Paris".into()),
            available: true,
        }]);
        let tool = SearchCatalogTool::new(store);

        let output = tool.execute(&ctx(), json!({})).await.unwrap();
        let text = output.first_text().unwrap();
        let line = text.lines().nth(1).unwrap();

        assert!(line.contains("[long]"));
        assert!(line.contains("Loft"));
        let description = line.split(" : ").nth(1).unwrap();
        assert_eq!(description.chars().count(), SUMMARY_MAX_CHARS);
    }

    #[tokio::test]
    async fn test_no_match_is_not_an_error() {
        let tool = SearchCatalogTool::new(seeded_store());
        let output = tool
            .execute(&ctx(), json!({"city": "Bordeaux"}))
            .await
            .unwrap();
        assert!(!output.is_error);
        assert!(output.first_text().unwrap().contains("Aucun article"));
    }

    #[tokio::test]
    async fn test_store_failure_becomes_error_output() {
        let store = seeded_store();
        store.fail_writes_with("db down");
        // Reads fail too while the store is failed.
        store.fail_reads_with("db down");
        let tool = SearchCatalogTool::new(store);

        let output = tool.execute(&ctx(), json!({})).await.unwrap();
        assert!(output.is_error);
    }
}
