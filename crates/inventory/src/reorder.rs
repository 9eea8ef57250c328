//! Reorder suggestions.

use serde::{Deserialize, Serialize};

use stockwise_core::{ArticleId, StoreId};

use crate::{classify, AlertLevel, Article, ArticleStatus, DaysUntilStockout};

/// Replenishment target as a multiple of `min_stock`.
pub const REPLENISHMENT_MULTIPLIER: i64 = 3;

/// Derived suggestion; never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderSuggestion {
    pub article_id: ArticleId,
    pub article_name: String,
    pub store_id: StoreId,
    pub current_stock: i64,
    pub min_stock: i64,
    pub suggested_quantity: i64,
    pub unit_cost: u64,
    pub estimated_cost: u64,
    pub level: AlertLevel,
    pub days_until_stockout: DaysUntilStockout,
}

/// Suggest a reorder for `article` if its stock is strictly below `min_stock`.
///
/// Orders enough to reach `min_stock * multiplier`. Discontinued articles are
/// never suggested. `article.stock` must already hold the store's on-hand value.
pub fn suggest(
    store_id: StoreId,
    article: &Article,
    days_until_stockout: DaysUntilStockout,
    multiplier: i64,
) -> Option<ReorderSuggestion> {
    if article.status == ArticleStatus::Discontinued || article.stock >= article.min_stock {
        return None;
    }

    let target = article.min_stock.saturating_mul(multiplier);
    let suggested_quantity = target.saturating_sub(article.stock).max(0);
    let estimated_cost = u64::try_from(suggested_quantity)
        .unwrap_or(0)
        .saturating_mul(article.purchase_price);

    Some(ReorderSuggestion {
        article_id: article.id,
        article_name: article.name.clone(),
        store_id,
        current_stock: article.stock,
        min_stock: article.min_stock,
        suggested_quantity,
        unit_cost: article.purchase_price,
        estimated_cost,
        level: classify(article.stock, article.min_stock),
        days_until_stockout,
    })
}

/// Most severe first, then soonest depletion (unbounded last), then name.
pub fn rank(suggestions: &mut [ReorderSuggestion]) {
    suggestions.sort_by(|a, b| {
        b.level
            .cmp(&a.level)
            .then_with(|| a.days_until_stockout.cmp(&b.days_until_stockout))
            .then_with(|| a.article_name.cmp(&b.article_name))
    });
}
