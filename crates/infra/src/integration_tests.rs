//! End-to-end tests for the inventory pipeline.
//!
//! Request → permission gate → ledger store → projector → bus → gateway/outbox
//!
//! Verifies:
//! - Reorder and forecast answers match hand-computed figures
//! - Transfers land both legs or none
//! - Envelopes published on the bus rebuild the same projection elsewhere
//! - Gateway outages degrade to the outbox without losing ledger rows
//! - Concurrent appends and transfers on one key conserve stock

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration as StdDuration;

    use chrono::{Duration, TimeZone, Utc};
    use serde_json::Value as JsonValue;

    use stockwise_auth::{AccessProfileResolver, InMemoryAccessRepository, PermissionSet, Role, StoreAction};
    use stockwise_core::{ArticleId, Clock, FixedClock, InMemoryStoreDirectory, Store, StoreId, UserId};
    use stockwise_events::{EventBus, EventEnvelope, InMemoryEventBus, Subscription};
    use stockwise_inventory::{
        apply_delta, AlertLevel, Article, DaysUntilStockout, MovementFilter, MovementType, NegativeStockPolicy,
        ReferenceType, SaleLine,
    };

    use crate::advisor::ReorderAdvisor;
    use crate::config::InventoryConfig;
    use crate::error::InventoryError;
    use crate::external::{InMemoryCatalog, InMemoryPersistenceGateway, InMemoryPurchaseOrders, InMemorySalesHistory};
    use crate::ledger::StockLedger;
    use crate::ledger_store::InMemoryLedgerStore;
    use crate::notifications::{BusNotificationSink, Notification, NotificationKind};
    use crate::projections::{InventoryProjector, StockReadModel};
    use crate::read_model::InMemoryStoreScopedStore;
    use crate::transfer::TransferCoordinator;

    type ReadStore = Arc<InMemoryStoreScopedStore<ArticleId, StockReadModel>>;
    type EnvelopeBus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
    type Ledger = StockLedger<InMemoryLedgerStore, ReadStore, EnvelopeBus>;
    type Resolver = AccessProfileResolver<Arc<InMemoryAccessRepository>, Arc<InMemoryStoreDirectory>>;

    struct World {
        ledger: Arc<Ledger>,
        transfers: TransferCoordinator<InMemoryLedgerStore, ReadStore, EnvelopeBus>,
        advisor: ReorderAdvisor<ReadStore>,
        resolver: Arc<Resolver>,
        envelopes: EnvelopeBus,
        notifications: Subscription<Notification>,
        gateway: Arc<InMemoryPersistenceGateway>,
        catalog: Arc<InMemoryCatalog>,
        sales: Arc<InMemorySalesHistory>,
        clock: Arc<FixedClock>,
        lisbon: StoreId,
        porto: StoreId,
        /// Warehouse clerk assigned to both stores.
        clerk: UserId,
        /// Lisbon-only clerk.
        local_clerk: UserId,
        manager: UserId,
    }

    fn world(policy: NegativeStockPolicy) -> World {
        stockwise_observability::init_for_tests();

        let lisbon = Store::new(StoreId::new(), "Lisboa Centro", "Lisboa").headquarters();
        let porto = Store::new(StoreId::new(), "Porto Norte", "Porto");
        let directory = Arc::new(InMemoryStoreDirectory::with_stores([lisbon.clone(), porto.clone()]));
        let resolver = Arc::new(AccessProfileResolver::new(Arc::new(InMemoryAccessRepository::new()), directory));

        let clerk = UserId::new();
        let local_clerk = UserId::new();
        let manager = UserId::new();
        resolver.register_user(clerk, Role::Warehouse);
        resolver.register_user(local_clerk, Role::Warehouse);
        resolver.register_user(manager, Role::Manager);
        for store in [lisbon.id, porto.id] {
            resolver.assign_user_to_store(clerk, store, None, None).unwrap();
        }
        resolver.assign_user_to_store(local_clerk, lisbon.id, None, None).unwrap();
        resolver.set_user_global_access(manager, true).unwrap();

        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 31, 20, 0, 0).unwrap()));
        let config = InventoryConfig {
            negative_stock_policy: policy,
            ..InventoryConfig::default()
        };

        let notification_bus = Arc::new(InMemoryEventBus::<Notification>::new());
        let notifications = notification_bus.subscribe();
        let sink = Arc::new(BusNotificationSink::new(notification_bus));

        let projector = Arc::new(InventoryProjector::new(Arc::new(InMemoryStoreScopedStore::new())));
        let envelopes: EnvelopeBus = Arc::new(InMemoryEventBus::new());
        let gateway = Arc::new(InMemoryPersistenceGateway::new());

        let ledger = Arc::new(
            StockLedger::new(
                InMemoryLedgerStore::new(),
                projector.clone(),
                envelopes.clone(),
                resolver.clone(),
                gateway.clone(),
                sink.clone(),
            )
            .with_clock(clock.clone())
            .with_config(config.clone()),
        );

        let catalog = Arc::new(InMemoryCatalog::new());
        let sales = Arc::new(InMemorySalesHistory::new());
        let advisor = ReorderAdvisor::new(
            projector,
            catalog.clone(),
            sales.clone(),
            resolver.clone(),
            Arc::new(InMemoryPurchaseOrders::new()),
            sink,
        )
        .with_clock(clock.clone())
        .with_config(config);

        World {
            transfers: TransferCoordinator::new(ledger.clone()),
            ledger,
            advisor,
            resolver,
            envelopes,
            notifications,
            gateway,
            catalog,
            sales,
            clock,
            lisbon: lisbon.id,
            porto: porto.id,
            clerk,
            local_clerk,
            manager,
        }
    }

    fn catalog_article(w: &World, name: &str, min_stock: i64, purchase_price: u64) -> ArticleId {
        let article = Article::new(ArticleId::new(), name, "pcs", purchase_price + 100, purchase_price, min_stock)
            .unwrap()
            .with_category("hardware");
        let id = article.id;
        w.catalog.upsert(article);
        id
    }

    fn receive(w: &World, store: StoreId, article: ArticleId, quantity: i64) {
        w.ledger
            .append(store, article, MovementType::In, quantity, w.clerk, None)
            .unwrap();
    }

    #[test]
    fn empty_shelf_is_critical_and_reorders_to_target() {
        let w = world(NegativeStockPolicy::Clamp);
        let article = catalog_article(&w, "Paint 5L", 10, 1_250);

        let alerts = w.advisor.alerts(w.lisbon);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].level, AlertLevel::Critical);
        assert!(alerts[0].message.contains("out of stock"));

        let suggestions = w.advisor.suggest_all(w.lisbon).unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].article_id, article);
        assert_eq!(suggestions[0].suggested_quantity, 30);
        assert_eq!(suggestions[0].estimated_cost, 37_500);
        assert_eq!(suggestions[0].days_until_stockout, DaysUntilStockout::Unbounded);
    }

    #[test]
    fn slightly_low_shelf_is_a_warning_and_tops_up() {
        let w = world(NegativeStockPolicy::Clamp);
        let article = catalog_article(&w, "Brush", 10, 300);
        receive(&w, w.lisbon, article, 8);

        let suggestions = w.advisor.suggest_all(w.lisbon).unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].level, AlertLevel::Warning);
        assert_eq!(suggestions[0].suggested_quantity, 22);

        // Porto holds nothing, so it has its own critical suggestion.
        let porto = w.advisor.suggest_all(w.porto).unwrap();
        assert_eq!(porto[0].level, AlertLevel::Critical);
    }

    #[test]
    fn unauthorized_transfer_leaves_both_stores_untouched() {
        let w = world(NegativeStockPolicy::Clamp);
        let article = catalog_article(&w, "Tiles", 5, 80);
        receive(&w, w.lisbon, article, 20);
        let before = w.ledger.get_movements(&MovementFilter::all()).unwrap().len();

        let err = w
            .transfers
            .transfer(w.lisbon, w.porto, article, 5, w.local_clerk, None)
            .unwrap_err();

        assert!(matches!(err, InventoryError::Unauthorized(_)));
        assert_eq!(w.ledger.get_movements(&MovementFilter::all()).unwrap().len(), before);
        assert!(w
            .ledger
            .get_movements(&MovementFilter::all().store(w.porto))
            .unwrap()
            .is_empty());
        assert_eq!(w.ledger.on_hand(w.lisbon, article), 20);
        assert_eq!(w.ledger.on_hand(w.porto, article), 0);
    }

    #[test]
    fn thirty_days_of_sales_forecast_ten_days_of_cover() {
        let w = world(NegativeStockPolicy::Clamp);
        let article = catalog_article(&w, "Sealant", 5, 450);
        receive(&w, w.lisbon, article, 20);

        for day in 0..30 {
            w.sales.record(SaleLine {
                article_id: article,
                store_id: Some(w.lisbon),
                quantity: 2,
                sold_at: w.clock.now() - Duration::days(day),
                completed: true,
            });
        }
        // Pending and foreign-store lines never count.
        w.sales.record(SaleLine {
            article_id: article,
            store_id: Some(w.lisbon),
            quantity: 40,
            sold_at: w.clock.now(),
            completed: false,
        });
        w.sales.record(SaleLine {
            article_id: article,
            store_id: Some(w.porto),
            quantity: 40,
            sold_at: w.clock.now(),
            completed: true,
        });

        let forecast = w.advisor.forecast(article, w.lisbon).unwrap();
        assert_eq!(forecast.total_sold, 60);
        assert!((forecast.avg_daily_consumption - 2.0).abs() < f64::EPSILON);
        assert_eq!(forecast.days_until_stockout, DaysUntilStockout::Days(10));
    }

    #[test]
    fn transfer_moves_both_legs_with_a_shared_reference() {
        let w = world(NegativeStockPolicy::Clamp);
        let article = catalog_article(&w, "Cement", 10, 700);
        receive(&w, w.lisbon, article, 25);

        let plan = w
            .transfers
            .transfer(w.lisbon, w.porto, article, 10, w.clerk, Some("weekend restock".to_string()))
            .unwrap();

        assert_eq!(w.ledger.on_hand(w.lisbon, article), 15);
        assert_eq!(w.ledger.on_hand(w.porto, article), 10);

        let legs = w
            .ledger
            .get_movements(&MovementFilter::all().article(article))
            .unwrap()
            .into_iter()
            .filter(|m| m.movement_type.is_transfer())
            .collect::<Vec<_>>();
        assert_eq!(legs.len(), 2);
        for leg in &legs {
            assert_eq!(leg.reference_type, ReferenceType::Transfer);
            assert_eq!(leg.reference_id, Some(plan.reference_id));
            assert_eq!(leg.quantity, 10);
            assert!(leg.notes.as_deref().unwrap_or_default().contains("weekend restock"));
        }

        // The gateway received the pair in one call.
        let persisted = w.gateway.persisted();
        assert_eq!(persisted.len(), 3);
        assert_eq!(persisted[1].movement_type, MovementType::TransferOut);
        assert_eq!(persisted[2].movement_type, MovementType::TransferIn);
    }

    #[test]
    fn invalid_transfers_are_validation_errors() {
        let w = world(NegativeStockPolicy::Clamp);
        let article = catalog_article(&w, "Sand", 1, 10);

        assert!(matches!(
            w.transfers.transfer(w.lisbon, w.lisbon, article, 1, w.clerk, None),
            Err(InventoryError::Validation(_))
        ));
        assert!(matches!(
            w.transfers.transfer(w.lisbon, w.porto, article, 0, w.clerk, None),
            Err(InventoryError::Validation(_))
        ));
        assert!(w.ledger.get_movements(&MovementFilter::all()).unwrap().is_empty());
    }

    #[test]
    fn clamp_policy_lets_a_transfer_overdraw_the_source() {
        let w = world(NegativeStockPolicy::Clamp);
        let article = catalog_article(&w, "Grout", 1, 10);
        receive(&w, w.lisbon, article, 3);

        w.transfers.transfer(w.lisbon, w.porto, article, 5, w.manager, None).unwrap();

        let source = w.ledger.projector().get(w.lisbon, article).unwrap();
        assert_eq!(source.on_hand, 0);
        assert_eq!(source.shortfall, 2);
        assert_eq!(w.ledger.on_hand(w.porto, article), 5);
    }

    #[test]
    fn reject_policy_fails_the_whole_transfer() {
        let w = world(NegativeStockPolicy::Reject);
        let article = catalog_article(&w, "Grout", 1, 10);
        receive(&w, w.lisbon, article, 3);

        let err = w
            .transfers
            .transfer(w.lisbon, w.porto, article, 5, w.clerk, None)
            .unwrap_err();

        assert!(matches!(err, InventoryError::InvariantViolation(_)));
        assert_eq!(w.ledger.on_hand(w.lisbon, article), 3);
        assert!(w.ledger.projector().get(w.porto, article).is_none());
        assert_eq!(w.ledger.get_movements(&MovementFilter::all()).unwrap().len(), 1);
    }

    #[test]
    fn published_envelopes_rebuild_the_same_projection() {
        let w = world(NegativeStockPolicy::Clamp);
        let replica: Arc<InventoryProjector<ReadStore>> =
            Arc::new(InventoryProjector::new(Arc::new(InMemoryStoreScopedStore::new())));

        // Subscribe before anything is published.
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<()>();
        let (done_tx, done_rx) = std::sync::mpsc::channel::<usize>();
        let bus = w.envelopes.clone();
        let replica_clone = replica.clone();
        std::thread::spawn(move || {
            let sub = bus.subscribe();
            let _ = ready_tx.send(());
            let mut applied = 0;
            while let Ok(env) = sub.recv_timeout(StdDuration::from_secs(2)) {
                if replica_clone.apply_envelope(&env).is_ok() {
                    applied += 1;
                }
                if applied == 4 {
                    break;
                }
            }
            let _ = done_tx.send(applied);
        });
        let _ = ready_rx.recv_timeout(StdDuration::from_secs(1));

        let article = catalog_article(&w, "Nails", 10, 5);
        receive(&w, w.lisbon, article, 12);
        w.ledger
            .append(w.lisbon, article, MovementType::Out, 4, w.clerk, None)
            .unwrap();
        w.transfers.transfer(w.lisbon, w.porto, article, 3, w.clerk, None).unwrap();

        assert_eq!(done_rx.recv_timeout(StdDuration::from_secs(2)).unwrap(), 4);
        assert_eq!(replica.list(w.lisbon), w.ledger.projector().list(w.lisbon));
        assert_eq!(replica.list(w.porto), w.ledger.projector().list(w.porto));
        assert_eq!(replica.on_hand(w.lisbon, article), 5);
    }

    #[test]
    fn gateway_outage_keeps_working_and_syncs_later() {
        let w = world(NegativeStockPolicy::Clamp);
        let article = catalog_article(&w, "Screws", 10, 5);
        w.gateway.set_offline(true);

        receive(&w, w.lisbon, article, 10);
        w.transfers.transfer(w.lisbon, w.porto, article, 4, w.clerk, None).unwrap();

        assert_eq!(w.ledger.on_hand(w.lisbon, article), 6);
        assert_eq!(w.ledger.on_hand(w.porto, article), 4);
        assert_eq!(w.ledger.pending_writes().len(), 2);
        assert!(w.gateway.persisted().is_empty());

        let warnings = w
            .notifications
            .drain()
            .into_iter()
            .filter(|n| n.kind == NotificationKind::Warning)
            .count();
        assert_eq!(warnings, 2);

        w.gateway.set_offline(false);
        let report = w.ledger.flush_outbox();
        assert_eq!(report.delivered, 2);
        assert_eq!(report.pending, 0);
        assert_eq!(w.gateway.persisted().len(), 3);
        assert!(w.ledger.pending_writes().is_empty());
    }

    #[test]
    fn revoked_permissions_take_effect_immediately() {
        let w = world(NegativeStockPolicy::Clamp);
        let article = catalog_article(&w, "Wire", 10, 5);
        receive(&w, w.porto, article, 1);

        w.resolver
            .assign_user_to_store(w.clerk, w.porto, Some(PermissionSet::of(&[StoreAction::Create])), Some(w.manager))
            .unwrap();
        assert!(w.resolver.remove_user_from_store(w.clerk, w.lisbon));

        for store in [w.porto, w.lisbon] {
            let err = w
                .ledger
                .append(store, article, MovementType::In, 1, w.clerk, None)
                .unwrap_err();
            assert!(matches!(err, InventoryError::Unauthorized(_)));
        }
        assert_eq!(w.ledger.on_hand(w.porto, article), 1);
    }

    #[test]
    fn notifications_are_pushed_to_subscribers() {
        let w = world(NegativeStockPolicy::Clamp);
        let article = catalog_article(&w, "Glue", 10, 5);
        receive(&w, w.porto, article, 7);

        let suggestions = w.advisor.suggest_all(w.porto).unwrap();
        let order = w.advisor.process_reorder(w.porto, &suggestions, w.manager).unwrap();
        assert_eq!(order.total_quantity(), 23);

        let received = w.notifications.drain();
        let titles: Vec<&str> = received.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["Stock updated", "Reorder processed"]);
        assert!(received[0].message.contains("on hand: 7"));
        assert!(received[1].message.contains("1.15"));
    }

    #[test]
    fn movement_history_is_chronological_across_stores() {
        let w = world(NegativeStockPolicy::Clamp);
        let article = catalog_article(&w, "Lamp", 1, 5);

        receive(&w, w.porto, article, 1);
        w.clock.advance(Duration::minutes(5));
        receive(&w, w.lisbon, article, 2);
        w.clock.advance(Duration::minutes(5));
        w.ledger
            .append(w.porto, article, MovementType::Out, 1, w.clerk, Some("damaged".to_string()))
            .unwrap();

        let history = w.ledger.get_movements(&MovementFilter::all().article(article)).unwrap();
        let stores: Vec<StoreId> = history.iter().map(|m| m.store_id).collect();
        assert_eq!(stores, vec![w.porto, w.lisbon, w.porto]);
        assert!(history.windows(2).all(|p| p[0].created_at <= p[1].created_at));
        assert_eq!(history[2].notes.as_deref(), Some("damaged"));
    }

    fn clamped_fold(w: &World, store: StoreId, article: ArticleId) -> i64 {
        w.ledger
            .get_movements(&MovementFilter::all().store(store).article(article))
            .unwrap()
            .iter()
            .fold(0, |on_hand, m| apply_delta(on_hand, m.signed_delta()).0)
    }

    #[test]
    fn concurrent_appends_and_transfers_match_the_ledger_fold() {
        let w = world(NegativeStockPolicy::Clamp);
        let article = catalog_article(&w, "Cable 10m", 5, 300);
        let (ledger, transfers, clock) = (&w.ledger, &w.transfers, &w.clock);
        let (lisbon, porto, clerk) = (w.lisbon, w.porto, w.clerk);

        thread::scope(|scope| {
            for worker in 0..4i64 {
                scope.spawn(move || {
                    for i in 0..30i64 {
                        clock.advance(Duration::seconds(1));
                        let movement_type = if i % 3 == 2 { MovementType::Out } else { MovementType::In };
                        ledger
                            .append(lisbon, article, movement_type, 1 + (worker + i) % 5, clerk, None)
                            .unwrap();
                    }
                });
            }
            for worker in 0..2i64 {
                scope.spawn(move || {
                    for i in 0..20i64 {
                        clock.advance(Duration::seconds(1));
                        let (from, to) = if (worker + i) % 2 == 0 { (lisbon, porto) } else { (porto, lisbon) };
                        transfers.transfer(from, to, article, 1 + i % 4, clerk, None).unwrap();
                    }
                });
            }
        });

        assert_eq!(w.ledger.get_movements(&MovementFilter::all()).unwrap().len(), 4 * 30 + 2 * 20 * 2);
        for store in [w.lisbon, w.porto] {
            assert_eq!(w.ledger.on_hand(store, article), clamped_fold(&w, store, article));
        }

        let before: Vec<_> = [w.lisbon, w.porto]
            .iter()
            .map(|store| w.ledger.projector().get(*store, article))
            .collect();
        w.ledger.rebuild_projection().unwrap();
        let after: Vec<_> = [w.lisbon, w.porto]
            .iter()
            .map(|store| w.ledger.projector().get(*store, article))
            .collect();
        assert_eq!(after, before);
    }

    #[test]
    fn concurrent_rejected_overdraws_conserve_total_stock() {
        let w = world(NegativeStockPolicy::Reject);
        let article = catalog_article(&w, "Fuse", 2, 40);
        receive(&w, w.lisbon, article, 50);
        let (ledger, transfers) = (&w.ledger, &w.transfers);
        let (lisbon, porto, clerk) = (w.lisbon, w.porto, w.clerk);

        let net_changes: Vec<i64> = thread::scope(|scope| {
            let mut handles = Vec::new();
            for worker in 0..3i64 {
                handles.push(scope.spawn(move || {
                    let mut net = 0i64;
                    for i in 0..25i64 {
                        let quantity = 1 + (worker + i) % 6;
                        let (movement_type, sign) = if i % 2 == 0 {
                            (MovementType::Out, -1)
                        } else {
                            (MovementType::In, 1)
                        };
                        match ledger.append(lisbon, article, movement_type, quantity, clerk, None) {
                            Ok(_) => net += sign * quantity,
                            Err(InventoryError::InvariantViolation(_)) => {}
                            Err(other) => panic!("unexpected append failure: {other}"),
                        }
                    }
                    net
                }));
            }
            for worker in 0..2i64 {
                handles.push(scope.spawn(move || {
                    for i in 0..25i64 {
                        let (from, to) = if (worker + i) % 2 == 0 { (lisbon, porto) } else { (porto, lisbon) };
                        match transfers.transfer(from, to, article, 1 + i % 7, clerk, None) {
                            Ok(_) | Err(InventoryError::InvariantViolation(_)) => {}
                            Err(other) => panic!("unexpected transfer failure: {other}"),
                        }
                    }
                    0
                }));
            }
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let lisbon_stock = w.ledger.on_hand(w.lisbon, article);
        let porto_stock = w.ledger.on_hand(w.porto, article);
        assert!(lisbon_stock >= 0 && porto_stock >= 0);
        assert_eq!(lisbon_stock + porto_stock, 50 + net_changes.iter().sum::<i64>());
        assert_eq!(lisbon_stock, clamped_fold(&w, w.lisbon, article));
        assert_eq!(porto_stock, clamped_fold(&w, w.porto, article));
    }
}
