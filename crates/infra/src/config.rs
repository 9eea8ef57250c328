//! Inventory service configuration.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use stockwise_inventory::{NegativeStockPolicy, DEFAULT_WINDOW_DAYS, REPLENISHMENT_MULTIPLIER};

pub const ENV_FORECAST_WINDOW_DAYS: &str = "STOCKWISE_FORECAST_WINDOW_DAYS";
pub const ENV_REPLENISHMENT_MULTIPLIER: &str = "STOCKWISE_REPLENISHMENT_MULTIPLIER";
pub const ENV_NEGATIVE_STOCK_POLICY: &str = "STOCKWISE_NEGATIVE_STOCK_POLICY";
pub const ENV_NOTIFY_ON_APPEND: &str = "STOCKWISE_NOTIFY_ON_APPEND";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Trailing sales window for velocity forecasts.
    pub forecast_window_days: u32,
    /// Reorder target as a multiple of `min_stock`.
    pub replenishment_multiplier: i64,
    pub negative_stock_policy: NegativeStockPolicy,
    /// Raise a notification for every successful ledger append.
    pub notify_on_append: bool,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            forecast_window_days: DEFAULT_WINDOW_DAYS,
            replenishment_multiplier: REPLENISHMENT_MULTIPLIER,
            negative_stock_policy: NegativeStockPolicy::Clamp,
            notify_on_append: true,
        }
    }
}

impl InventoryConfig {
    /// Load from `STOCKWISE_*` environment variables; unset variables keep defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_FORECAST_WINDOW_DAYS) {
            config.forecast_window_days = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_FORECAST_WINDOW_DAYS}='{raw}' is not a day count"))?;
        }
        if let Some(raw) = lookup(ENV_REPLENISHMENT_MULTIPLIER) {
            config.replenishment_multiplier = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_REPLENISHMENT_MULTIPLIER}='{raw}' is not an integer"))?;
        }
        if let Some(raw) = lookup(ENV_NEGATIVE_STOCK_POLICY) {
            config.negative_stock_policy = raw
                .parse()
                .with_context(|| format!("invalid {ENV_NEGATIVE_STOCK_POLICY}"))?;
        }
        if let Some(raw) = lookup(ENV_NOTIFY_ON_APPEND) {
            config.notify_on_append = parse_bool(&raw)
                .with_context(|| format!("{ENV_NOTIFY_ON_APPEND}='{raw}' is not a boolean"))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.forecast_window_days == 0 {
            bail!("forecast window must be at least one day");
        }
        if self.replenishment_multiplier < 1 {
            bail!("replenishment multiplier must be at least 1");
        }
        Ok(())
    }
}

fn parse_bool(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("unrecognized boolean '{other}'"),
    }
}
