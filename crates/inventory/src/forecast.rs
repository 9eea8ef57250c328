//! Trailing-window sales velocity and days-to-stockout.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use stockwise_core::{ArticleId, DomainError, StoreId};

pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// A sold line item from the sales history.
///
/// `store_id = None` marks a sale not attributed to a store; it counts for
/// every store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub article_id: ArticleId,
    pub store_id: Option<StoreId>,
    pub quantity: i64,
    pub sold_at: DateTime<Utc>,
    pub completed: bool,
}

/// Estimated days until on-hand stock runs out.
///
/// `Unbounded` sorts after every finite estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaysUntilStockout {
    Days(u64),
    /// No sales in the window, so no estimate.
    Unbounded,
}

impl core::fmt::Display for DaysUntilStockout {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DaysUntilStockout::Days(d) => write!(f, "{d} days"),
            DaysUntilStockout::Unbounded => f.write_str("no estimate"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VelocityForecast {
    pub article_id: ArticleId,
    pub store_id: StoreId,
    pub window_days: u32,
    pub total_sold: i64,
    pub avg_daily_consumption: f64,
    pub days_until_stockout: DaysUntilStockout,
}

/// Forecast consumption of `article_id` at `store_id` from `sales`.
///
/// Sums completed lines sold within `[now - window_days, now]`. Days until
/// stockout is computed in integers as `floor(stock * window / total_sold)`,
/// which equals `floor(stock / avg)` without float rounding.
pub fn forecast(
    article_id: ArticleId,
    store_id: StoreId,
    current_stock: i64,
    sales: &[SaleLine],
    now: DateTime<Utc>,
    window_days: u32,
) -> Result<VelocityForecast, DomainError> {
    if window_days == 0 {
        return Err(DomainError::validation("forecast window must be at least one day"));
    }

    let since = now - Duration::days(i64::from(window_days));

    let total_sold: i64 = sales
        .iter()
        .filter(|s| s.completed && s.article_id == article_id)
        .filter(|s| s.store_id.is_none_or(|sid| sid == store_id))
        .filter(|s| s.sold_at >= since && s.sold_at <= now)
        .map(|s| s.quantity.max(0))
        .fold(0i64, i64::saturating_add);

    let avg_daily_consumption = total_sold as f64 / f64::from(window_days);

    let days_until_stockout = if total_sold > 0 {
        let stock = current_stock.max(0) as i128;
        let days = stock * i128::from(window_days) / i128::from(total_sold);
        DaysUntilStockout::Days(u64::try_from(days).unwrap_or(u64::MAX))
    } else {
        DaysUntilStockout::Unbounded
    };

    Ok(VelocityForecast {
        article_id,
        store_id,
        window_days,
        total_sold,
        avg_daily_consumption,
        days_until_stockout,
    })
}
