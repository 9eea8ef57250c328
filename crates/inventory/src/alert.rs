//! Stock alert classification.

use serde::{Deserialize, Serialize};

use stockwise_core::{ArticleId, StoreId};

use crate::Article;

/// Severity tier, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    None,
    Low,
    Warning,
    Critical,
}

impl AlertLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertLevel::None => "none",
            AlertLevel::Low => "low",
            AlertLevel::Warning => "warning",
            AlertLevel::Critical => "critical",
        }
    }
}

impl core::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map `(stock, min_stock)` to a severity tier.
///
/// Checked in order: critical (`stock == 0` or below half the threshold),
/// warning (below the threshold), low (below 1.5x the threshold), none.
/// Critical must be tested first since its band sits inside the warning band.
/// The scaled comparisons run in `i128` so extreme quantities cannot overflow.
pub fn classify(stock: i64, min_stock: i64) -> AlertLevel {
    let (stock, min_stock) = (i128::from(stock), i128::from(min_stock));
    if stock == 0 || 2 * stock < min_stock {
        AlertLevel::Critical
    } else if stock < min_stock {
        AlertLevel::Warning
    } else if 2 * stock < 3 * min_stock {
        AlertLevel::Low
    } else {
        AlertLevel::None
    }
}

/// A non-`None` classification with a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAlert {
    pub store_id: StoreId,
    pub article_id: ArticleId,
    pub article_name: String,
    pub level: AlertLevel,
    pub stock: i64,
    pub min_stock: i64,
    pub message: String,
}

/// Classify every active article; most severe first, then by name.
pub fn scan(store_id: StoreId, articles: &[Article]) -> Vec<StockAlert> {
    let mut alerts: Vec<StockAlert> = articles
        .iter()
        .filter(|a| a.is_active())
        .filter_map(|a| {
            let level = classify(a.stock, a.min_stock);
            if level == AlertLevel::None {
                return None;
            }
            Some(StockAlert {
                store_id,
                article_id: a.id,
                article_name: a.name.clone(),
                level,
                stock: a.stock,
                min_stock: a.min_stock,
                message: alert_message(a, level),
            })
        })
        .collect();

    alerts.sort_by(|x, y| {
        y.level
            .cmp(&x.level)
            .then_with(|| x.article_name.cmp(&y.article_name))
    });
    alerts
}

fn alert_message(article: &Article, level: AlertLevel) -> String {
    match level {
        AlertLevel::Critical if article.stock == 0 => format!("{} is out of stock", article.name),
        AlertLevel::Critical => format!(
            "{} is critically low: {} {} left (minimum {})",
            article.name, article.stock, article.unit, article.min_stock
        ),
        AlertLevel::Warning => format!(
            "{} is below its minimum: {} {} left (minimum {})",
            article.name, article.stock, article.unit, article.min_stock
        ),
        AlertLevel::Low | AlertLevel::None => format!(
            "{} is running low: {} {} left",
            article.name, article.stock, article.unit
        ),
    }
}
