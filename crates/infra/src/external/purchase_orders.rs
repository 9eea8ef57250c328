use std::sync::{Arc, RwLock};

use stockwise_core::StoreId;
use stockwise_inventory::PurchaseOrder;

/// Storage for draft purchase orders raised by the reorder advisor.
pub trait PurchaseOrderRepository: Send + Sync {
    fn save(&self, order: PurchaseOrder);
    /// Orders of a store, oldest first.
    fn list(&self, store_id: StoreId) -> Vec<PurchaseOrder>;
}

impl<P> PurchaseOrderRepository for Arc<P>
where
    P: PurchaseOrderRepository + ?Sized,
{
    fn save(&self, order: PurchaseOrder) {
        (**self).save(order)
    }

    fn list(&self, store_id: StoreId) -> Vec<PurchaseOrder> {
        (**self).list(store_id)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryPurchaseOrders {
    orders: RwLock<Vec<PurchaseOrder>>,
}

impl InMemoryPurchaseOrders {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PurchaseOrderRepository for InMemoryPurchaseOrders {
    fn save(&self, order: PurchaseOrder) {
        if let Ok(mut orders) = self.orders.write() {
            orders.retain(|o| o.id != order.id);
            orders.push(order);
        }
    }

    fn list(&self, store_id: StoreId) -> Vec<PurchaseOrder> {
        match self.orders.read() {
            Ok(orders) => orders.iter().filter(|o| o.store_id == store_id).cloned().collect(),
            Err(_) => vec![],
        }
    }
}
