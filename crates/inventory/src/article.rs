use serde::{Deserialize, Serialize};

use stockwise_core::{ArticleId, DomainError};

/// Article status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    Active,
    Inactive,
    Discontinued,
}

/// Catalog article as seen by the inventory core.
///
/// `stock` is the on-hand projection for the store being looked at; it is
/// never edited directly, only replaced by the projector's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub name: String,
    pub unit: String,
    pub price: u64,          // Price in smallest currency unit (e.g., cents)
    pub purchase_price: u64, // Cost per unit, same unit as `price`
    pub stock: i64,
    pub min_stock: i64,
    pub category: String,
    pub status: ArticleStatus,
}

impl Article {
    pub fn new(
        id: ArticleId,
        name: impl Into<String>,
        unit: impl Into<String>,
        price: u64,
        purchase_price: u64,
        min_stock: i64,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("article name cannot be empty"));
        }
        if min_stock < 0 {
            return Err(DomainError::validation("min_stock cannot be negative"));
        }

        Ok(Self {
            id,
            name,
            unit: unit.into(),
            price,
            purchase_price,
            stock: 0,
            min_stock,
            category: String::new(),
            status: ArticleStatus::Active,
        })
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Copy with `stock` replaced by a projected on-hand value.
    #[must_use]
    pub fn with_stock(&self, on_hand: i64) -> Self {
        Self {
            stock: on_hand.max(0),
            ..self.clone()
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ArticleStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_name_and_negative_threshold() {
        assert!(Article::new(ArticleId::new(), "  ", "pcs", 100, 50, 1).is_err());
        assert!(Article::new(ArticleId::new(), "Bolt", "pcs", 100, 50, -1).is_err());
    }

    #[test]
    fn with_stock_never_goes_negative() {
        let article = Article::new(ArticleId::new(), "Bolt", "pcs", 100, 50, 10).unwrap();
        assert_eq!(article.with_stock(7).stock, 7);
        assert_eq!(article.with_stock(-3).stock, 0);
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&ArticleStatus::Discontinued).unwrap();
        assert_eq!(json, "\"discontinued\"");
    }
}
