//! Read-side advisor: alerts, velocity forecasts, reorder suggestions.
//!
//! Stock figures come from the inventory projection, so answers may trail an
//! in-flight append. Only `process_reorder` writes anything.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use stockwise_auth::{PermissionGate, StoreAction};
use stockwise_core::{ArticleId, Clock, StoreId, SystemClock, UserId};
use stockwise_inventory::{
    forecast, rank, scan, suggest, Article, PurchaseOrder, ReorderSuggestion, StockAlert, VelocityForecast,
};

use crate::config::InventoryConfig;
use crate::error::{InventoryError, InventoryResult};
use crate::external::{CatalogRepository, PurchaseOrderRepository, SalesHistorySource};
use crate::notifications::{Notification, NotificationSink};
use crate::projections::{InventoryProjector, StockReadModel};
use crate::read_model::StoreScopedStore;

pub struct ReorderAdvisor<M>
where
    M: StoreScopedStore<ArticleId, StockReadModel>,
{
    projector: Arc<InventoryProjector<M>>,
    catalog: Arc<dyn CatalogRepository>,
    sales: Arc<dyn SalesHistorySource>,
    gate: Arc<dyn PermissionGate>,
    orders: Arc<dyn PurchaseOrderRepository>,
    notifications: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    config: InventoryConfig,
}

impl<M> ReorderAdvisor<M>
where
    M: StoreScopedStore<ArticleId, StockReadModel>,
{
    pub fn new(
        projector: Arc<InventoryProjector<M>>,
        catalog: Arc<dyn CatalogRepository>,
        sales: Arc<dyn SalesHistorySource>,
        gate: Arc<dyn PermissionGate>,
        orders: Arc<dyn PurchaseOrderRepository>,
        notifications: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            projector,
            catalog,
            sales,
            gate,
            orders,
            notifications,
            clock: Arc::new(SystemClock),
            config: InventoryConfig::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: InventoryConfig) -> Self {
        self.config = config;
        self
    }

    /// Forecast over the configured window.
    pub fn forecast(&self, article_id: ArticleId, store_id: StoreId) -> InventoryResult<VelocityForecast> {
        self.forecast_with_window(article_id, store_id, self.config.forecast_window_days)
    }

    pub fn forecast_with_window(
        &self,
        article_id: ArticleId,
        store_id: StoreId,
        window_days: u32,
    ) -> InventoryResult<VelocityForecast> {
        let article = self
            .catalog
            .get_article(article_id)
            .ok_or_else(|| InventoryError::NotFound(format!("article {article_id}")))?;
        let stocked = article.with_stock(self.projector.on_hand(store_id, article_id));
        self.forecast_for(&stocked, store_id, window_days)
    }

    /// Alerts for every active catalog article at `store_id`.
    pub fn alerts(&self, store_id: StoreId) -> Vec<StockAlert> {
        scan(store_id, &self.stocked_articles(store_id))
    }

    /// Ranked reorder suggestions for `store_id`.
    #[instrument(skip_all, fields(store_id = %store_id))]
    pub fn suggest_all(&self, store_id: StoreId) -> InventoryResult<Vec<ReorderSuggestion>> {
        let mut suggestions = Vec::new();

        for article in self.stocked_articles(store_id) {
            if article.stock >= article.min_stock {
                continue;
            }
            let velocity = self.forecast_for(&article, store_id, self.config.forecast_window_days)?;
            if let Some(s) = suggest(
                store_id,
                &article,
                velocity.days_until_stockout,
                self.config.replenishment_multiplier,
            ) {
                suggestions.push(s);
            }
        }

        rank(&mut suggestions);
        debug!(count = suggestions.len(), "reorder suggestions computed");
        Ok(suggestions)
    }

    /// Turn accepted suggestions into a draft purchase order.
    ///
    /// `actor_id` needs `create` on the store. Nothing is saved when the
    /// batch is empty or belongs to another store.
    #[instrument(skip_all, fields(store_id = %store_id, actor_id = %actor_id, lines = suggestions.len()))]
    pub fn process_reorder(
        &self,
        store_id: StoreId,
        suggestions: &[ReorderSuggestion],
        actor_id: UserId,
    ) -> InventoryResult<PurchaseOrder> {
        self.gate.check(actor_id, store_id, StoreAction::Create)?;

        let order = PurchaseOrder::draft(store_id, suggestions, actor_id, self.clock.now())?;
        self.orders.save(order.clone());

        info!(
            purchase_order_id = %order.id,
            total_cost = order.total_cost,
            "draft purchase order created"
        );
        self.notifications.add_alert(Notification::success(
            "Reorder processed",
            format!(
                "Draft purchase order {} created with {} article(s), {} units, estimated cost {}",
                order.id,
                order.lines.len(),
                order.total_quantity(),
                format_cents(order.total_cost)
            ),
            order.created_at,
        ));

        Ok(order)
    }

    pub fn purchase_orders(&self, store_id: StoreId) -> Vec<PurchaseOrder> {
        self.orders.list(store_id)
    }

    fn stocked_articles(&self, store_id: StoreId) -> Vec<Article> {
        self.catalog
            .list_articles()
            .into_iter()
            .map(|a| {
                let on_hand = self.projector.on_hand(store_id, a.id);
                a.with_stock(on_hand)
            })
            .collect()
    }

    fn forecast_for(&self, article: &Article, store_id: StoreId, window_days: u32) -> InventoryResult<VelocityForecast> {
        let now = self.clock.now();
        let since = now - chrono::Duration::days(i64::from(window_days));
        let sales = self.sales.completed_sales(article.id, since);
        Ok(forecast(article.id, store_id, article.stock, &sales, now, window_days)?)
    }
}

fn format_cents(cents: u64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use stockwise_auth::{AccessProfileResolver, InMemoryAccessRepository, Role};
    use stockwise_core::{FixedClock, InMemoryStoreDirectory, Store, StreamKey};
    use stockwise_events::{EventBus, EventEnvelope, InMemoryEventBus};
    use stockwise_inventory::{
        AlertLevel, ArticleStatus, DaysUntilStockout, MovementRecorded, MovementType, SaleLine, StockEvent,
        StockMovement,
    };
    use uuid::Uuid;

    use super::*;
    use crate::external::{InMemoryCatalog, InMemoryPurchaseOrders, InMemorySalesHistory};
    use crate::notifications::BusNotificationSink;
    use crate::read_model::InMemoryStoreScopedStore;

    type Projector = InventoryProjector<Arc<InMemoryStoreScopedStore<ArticleId, StockReadModel>>>;

    struct Fixture {
        advisor: ReorderAdvisor<Arc<InMemoryStoreScopedStore<ArticleId, StockReadModel>>>,
        projector: Arc<Projector>,
        catalog: Arc<InMemoryCatalog>,
        sales: Arc<InMemorySalesHistory>,
        orders: Arc<InMemoryPurchaseOrders>,
        notifications: stockwise_events::Subscription<Notification>,
        clock: Arc<FixedClock>,
        store: StoreId,
        buyer: UserId,
        viewer: UserId,
    }

    fn fixture() -> Fixture {
        let store = Store::new(StoreId::new(), "Norte", "Porto");
        let resolver = AccessProfileResolver::new(
            Arc::new(InMemoryAccessRepository::new()),
            Arc::new(InMemoryStoreDirectory::with_stores([store.clone()])),
        );
        let buyer = UserId::new();
        let viewer = UserId::new();
        resolver.register_user(buyer, Role::Manager);
        resolver.register_user(viewer, Role::Viewer);
        resolver.assign_user_to_store(buyer, store.id, None, None).unwrap();
        resolver.assign_user_to_store(viewer, store.id, None, None).unwrap();

        let projector = Arc::new(InventoryProjector::new(Arc::new(InMemoryStoreScopedStore::new())));
        let catalog = Arc::new(InMemoryCatalog::new());
        let sales = Arc::new(InMemorySalesHistory::new());
        let orders = Arc::new(InMemoryPurchaseOrders::new());
        let bus = Arc::new(InMemoryEventBus::<Notification>::new());
        let notifications = bus.subscribe();
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 30, 18, 0, 0).unwrap()));

        let advisor = ReorderAdvisor::new(
            projector.clone(),
            catalog.clone(),
            sales.clone(),
            Arc::new(resolver),
            orders.clone(),
            Arc::new(BusNotificationSink::new(bus)),
        )
        .with_clock(clock.clone());

        Fixture {
            advisor,
            projector,
            catalog,
            sales,
            orders,
            notifications,
            clock,
            store: store.id,
            buyer,
            viewer,
        }
    }

    fn article(name: &str, min_stock: i64, purchase_price: u64) -> Article {
        Article::new(ArticleId::new(), name, "pcs", purchase_price * 2, purchase_price, min_stock).unwrap()
    }

    fn receive(f: &Fixture, article_id: ArticleId, quantity: i64) {
        let key = StreamKey::new(f.store, article_id);
        let seq = f.projector.cursor(key) + 1;
        let movement =
            StockMovement::new(f.store, article_id, MovementType::In, quantity, UserId::new(), f.clock.now()).unwrap();
        let payload = serde_json::to_value(StockEvent::MovementRecorded(MovementRecorded { movement })).unwrap();
        let envelope = EventEnvelope::new(Uuid::now_v7(), key, "inventory.stock".to_string(), seq, payload);
        f.projector.apply_envelope(&envelope).unwrap();
    }

    #[test]
    fn suggestions_are_ranked_by_severity_then_depletion() {
        let f = fixture();
        let empty = article("Bolts", 10, 50);
        let low = article("Washers", 10, 20);
        let healthy = article("Nuts", 10, 30);
        for a in [&empty, &low, &healthy] {
            f.catalog.upsert(a.clone());
        }
        receive(&f, low.id, 8);
        receive(&f, healthy.id, 40);

        let suggestions = f.advisor.suggest_all(f.store).unwrap();

        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].article_id, empty.id);
        assert_eq!(suggestions[0].level, AlertLevel::Critical);
        assert_eq!(suggestions[0].suggested_quantity, 30);
        assert_eq!(suggestions[0].estimated_cost, 1_500);
        assert_eq!(suggestions[1].article_id, low.id);
        assert_eq!(suggestions[1].level, AlertLevel::Warning);
        assert_eq!(suggestions[1].suggested_quantity, 22);
    }

    #[test]
    fn discontinued_articles_are_not_reordered() {
        let f = fixture();
        let mut retired = article("Old cable", 5, 10);
        retired.status = ArticleStatus::Discontinued;
        f.catalog.upsert(retired);

        assert!(f.advisor.suggest_all(f.store).unwrap().is_empty());
        assert!(f.advisor.alerts(f.store).is_empty());
    }

    #[test]
    fn forecast_uses_store_stock_and_recent_sales() {
        let f = fixture();
        let glue = article("Glue", 5, 100);
        f.catalog.upsert(glue.clone());
        receive(&f, glue.id, 20);

        for day in 1..=30 {
            f.sales.record(SaleLine {
                article_id: glue.id,
                store_id: Some(f.store),
                quantity: 2,
                sold_at: f.clock.now() - Duration::days(day) + Duration::hours(1),
                completed: true,
            });
        }
        f.sales.record(SaleLine {
            article_id: glue.id,
            store_id: Some(f.store),
            quantity: 500,
            sold_at: f.clock.now() - Duration::days(90),
            completed: true,
        });

        let first = f.advisor.forecast(glue.id, f.store).unwrap();
        assert_eq!(first.total_sold, 60);
        assert!((first.avg_daily_consumption - 2.0).abs() < f64::EPSILON);
        assert_eq!(first.days_until_stockout, DaysUntilStockout::Days(10));

        assert_eq!(f.advisor.forecast(glue.id, f.store).unwrap(), first);
    }

    #[test]
    fn forecast_rejects_unknown_article_and_zero_window() {
        let f = fixture();
        let glue = article("Glue", 5, 100);
        f.catalog.upsert(glue.clone());

        assert!(matches!(
            f.advisor.forecast(ArticleId::new(), f.store),
            Err(InventoryError::NotFound(_))
        ));
        assert!(matches!(
            f.advisor.forecast_with_window(glue.id, f.store, 0),
            Err(InventoryError::Validation(_))
        ));
    }

    #[test]
    fn alerts_reflect_projected_stock() {
        let f = fixture();
        let tape = article("Tape", 10, 10);
        f.catalog.upsert(tape.clone());
        receive(&f, tape.id, 12);

        let alerts = f.advisor.alerts(f.store);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].level, AlertLevel::Low);
        assert_eq!(alerts[0].stock, 12);
    }

    #[test]
    fn process_reorder_saves_draft_and_notifies() {
        let f = fixture();
        let bolts = article("Bolts", 10, 50);
        f.catalog.upsert(bolts);
        let suggestions = f.advisor.suggest_all(f.store).unwrap();

        let order = f.advisor.process_reorder(f.store, &suggestions, f.buyer).unwrap();

        assert_eq!(order.total_cost, 1_500);
        assert_eq!(f.advisor.purchase_orders(f.store), vec![order]);
        let notes = f.notifications.drain();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].message.contains("15.00"));
    }

    #[test]
    fn process_reorder_requires_create_and_a_batch() {
        let f = fixture();
        let bolts = article("Bolts", 10, 50);
        f.catalog.upsert(bolts);
        let suggestions = f.advisor.suggest_all(f.store).unwrap();

        assert!(matches!(
            f.advisor.process_reorder(f.store, &suggestions, f.viewer),
            Err(InventoryError::Unauthorized(_))
        ));
        assert!(matches!(
            f.advisor.process_reorder(f.store, &[], f.buyer),
            Err(InventoryError::Validation(_))
        ));
        assert!(f.orders.list(f.store).is_empty());
        assert!(f.notifications.drain().is_empty());
    }

    #[test]
    fn cents_are_formatted_with_two_decimals() {
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(1_505), "15.05");
    }
}
