use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use stockwise_core::ArticleId;
use stockwise_inventory::SaleLine;

/// Read-only source of completed sale lines.
pub trait SalesHistorySource: Send + Sync {
    /// Completed lines for `article_id` sold at or after `since`.
    fn completed_sales(&self, article_id: ArticleId, since: DateTime<Utc>) -> Vec<SaleLine>;
}

impl<H> SalesHistorySource for Arc<H>
where
    H: SalesHistorySource + ?Sized,
{
    fn completed_sales(&self, article_id: ArticleId, since: DateTime<Utc>) -> Vec<SaleLine> {
        (**self).completed_sales(article_id, since)
    }
}

#[derive(Debug, Default)]
pub struct InMemorySalesHistory {
    lines: RwLock<Vec<SaleLine>>,
}

impl InMemorySalesHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, line: SaleLine) {
        if let Ok(mut lines) = self.lines.write() {
            lines.push(line);
        }
    }
}

impl SalesHistorySource for InMemorySalesHistory {
    fn completed_sales(&self, article_id: ArticleId, since: DateTime<Utc>) -> Vec<SaleLine> {
        let lines = match self.lines.read() {
            Ok(l) => l,
            Err(_) => return vec![],
        };

        lines
            .iter()
            .filter(|l| l.completed && l.article_id == article_id && l.sold_at >= since)
            .cloned()
            .collect()
    }
}
