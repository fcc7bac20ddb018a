//! In-memory repositories for service tests. A transaction works on a copy
//! of the state and only writes it back when the closure succeeds, which is
//! enough to observe rollback behaviour without a database.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::domain::catalog::{CatalogItem, CatalogItemPatch, NewCatalogItem};
use crate::domain::errors::DomainError;
use crate::domain::idempotency::IdempotencyKey;
use crate::domain::order::{
    page_offset, ListResult, OrderDraft, OrderFilter, OrderIntent, OrderLineView, OrderStatus, OrderType,
    OrderView,
};
use crate::domain::ports::{CatalogLocker, CatalogRepository, OrderRepository, OrderUnitOfWork};
use crate::domain::pricing::price_order;

fn catalog_item(id: i64, name: &str, price: i32, is_available: bool) -> CatalogItem {
    CatalogItem {
        id,
        name: name.to_string(),
        price,
        image_url: None,
        is_available,
        category: None,
        lock_version: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[derive(Debug, Clone, Default)]
struct State {
    catalog: BTreeMap<i64, CatalogItem>,
    orders: Vec<OrderView>,
    next_order_id: i64,
    next_line_id: i64,
}

impl State {
    fn insert(&mut self, draft: &OrderDraft) -> Result<OrderView, DomainError> {
        let key = draft.idempotency_key.map(|k| k.as_uuid());
        if key.is_some() && self.orders.iter().any(|o| o.idempotency_key == key) {
            return Err(DomainError::IdempotencyKeyTaken);
        }
        self.next_order_id += 1;
        let lines = draft
            .priced
            .lines
            .iter()
            .map(|line| {
                self.next_line_id += 1;
                OrderLineView {
                    id: self.next_line_id,
                    quantity: line.quantity,
                    subtotal: line.subtotal,
                    snapshot: line.snapshot.clone(),
                }
            })
            .collect();
        let order = OrderView {
            id: self.next_order_id,
            table_reference: draft.table_reference.clone(),
            order_type: draft.order_type,
            total_amount: draft.priced.total_amount,
            tax_amount: draft.priced.tax_amount,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            idempotency_key: key,
            lines,
        };
        self.orders.push(order.clone());
        Ok(order)
    }
}

#[derive(Default)]
struct Inner {
    state: State,
    locked: Vec<i64>,
    transactions: usize,
    failure: Option<DomainError>,
    concurrent: Option<OrderDraft>,
}

#[derive(Clone, Default)]
pub struct InMemoryOrderRepository {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryOrderRepository {
    pub fn add_item(&self, id: i64, name: &str, price: i32, is_available: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .state
            .catalog
            .insert(id, catalog_item(id, name, price, is_available));
    }

    pub fn set_price(&self, id: i64, price: i32) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(item) = inner.state.catalog.get_mut(&id) {
            item.price = price;
        }
    }

    /// Make the next `insert_order` fail with `err`.
    pub fn fail_next_insert(&self, err: DomainError) {
        self.inner.lock().unwrap().failure = Some(err);
    }

    /// Simulate another request committing an order under `key` between
    /// this request's lock-free lookup and its own insert. Returns the id
    /// the concurrent order will receive.
    pub fn commit_concurrently_on_next_transaction(&self, key: &str, intent: OrderIntent) -> i64 {
        let mut inner = self.inner.lock().unwrap();
        let items: Vec<CatalogItem> = intent
            .items
            .iter()
            .map(|l| inner.state.catalog[&l.catalog_item_id].clone())
            .collect();
        let priced = price_order(items.iter().zip(intent.items.iter().map(|l| l.quantity)))
            .expect("priceable intent");
        inner.concurrent = Some(OrderDraft {
            table_reference: intent.table_reference.clone(),
            order_type: intent.requested_order_type().parse().unwrap_or(OrderType::DineIn),
            idempotency_key: Some(IdempotencyKey::parse(key).expect("valid key")),
            priced,
        });
        inner.state.next_order_id + 1
    }

    pub fn order_count(&self) -> usize {
        self.inner.lock().unwrap().state.orders.len()
    }

    pub fn line_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.state.orders.iter().map(|o| o.lines.len()).sum()
    }

    pub fn locked_ids(&self) -> Vec<i64> {
        self.inner.lock().unwrap().locked.clone()
    }

    pub fn transactions_started(&self) -> usize {
        self.inner.lock().unwrap().transactions
    }
}

struct InMemoryUnitOfWork<'a> {
    staged: State,
    locked: &'a mut Vec<i64>,
    failure: Option<DomainError>,
}

impl CatalogLocker for InMemoryUnitOfWork<'_> {
    fn lock_catalog_item(&mut self, id: i64) -> Result<Option<CatalogItem>, DomainError> {
        self.locked.push(id);
        Ok(self.staged.catalog.get(&id).cloned())
    }
}

impl OrderUnitOfWork for InMemoryUnitOfWork<'_> {
    fn insert_order(&mut self, draft: &OrderDraft) -> Result<OrderView, DomainError> {
        if let Some(err) = self.failure.take() {
            return Err(err);
        }
        self.staged.insert(draft)
    }
}

impl OrderRepository for InMemoryOrderRepository {
    fn transaction<T, F>(&self, work: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn OrderUnitOfWork) -> Result<T, DomainError>,
    {
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;
        inner.transactions += 1;
        if let Some(draft) = inner.concurrent.take() {
            inner.state.insert(&draft)?;
        }

        let mut uow = InMemoryUnitOfWork {
            staged: inner.state.clone(),
            locked: &mut inner.locked,
            failure: inner.failure.take(),
        };
        let result = work(&mut uow)?;
        inner.state = uow.staged;
        Ok(result)
    }

    fn find_by_id(&self, id: i64) -> Result<Option<OrderView>, DomainError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.state.orders.iter().find(|o| o.id == id).cloned())
    }

    fn find_by_idempotency_key(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<OrderView>, DomainError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .state
            .orders
            .iter()
            .find(|o| o.idempotency_key == Some(key.as_uuid()))
            .cloned())
    }

    fn list(&self, filter: &OrderFilter, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let inner = self.inner.lock().unwrap();
        let matching: Vec<OrderView> = inner
            .state
            .orders
            .iter()
            .rev()
            .filter(|o| {
                filter
                    .table_reference
                    .as_ref()
                    .map_or(true, |t| o.table_reference.as_ref() == Some(t))
                    && filter.status.map_or(true, |s| o.status == s)
            })
            .cloned()
            .collect();
        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(page_offset(page, limit)).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect();
        Ok(ListResult { items, total })
    }

    fn update_status(&self, id: i64, next: OrderStatus) -> Result<OrderView, DomainError> {
        let mut inner = self.inner.lock().unwrap();
        let order = inner
            .state
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(DomainError::NotFound("Order"))?;
        if !order.status.can_transition_to(next) {
            return Err(DomainError::validation(format!(
                "cannot change status from {} to {}",
                order.status, next
            )));
        }
        order.status = next;
        Ok(order.clone())
    }
}

fn apply_patch(patch: &CatalogItemPatch, item: &mut CatalogItem) {
    if let Some(name) = &patch.name {
        item.name = name.clone();
    }
    if let Some(price) = patch.price {
        item.price = price;
    }
    if let Some(url) = &patch.image_url {
        item.image_url = url.clone();
    }
    if let Some(available) = patch.is_available {
        item.is_available = available;
    }
    if let Some(category) = &patch.category {
        item.category = category.clone();
    }
}

#[derive(Clone, Default)]
pub struct InMemoryCatalogRepository {
    items: Arc<Mutex<BTreeMap<i64, CatalogItem>>>,
}

impl CatalogRepository for InMemoryCatalogRepository {
    fn create(&self, item: &NewCatalogItem) -> Result<CatalogItem, DomainError> {
        let mut items = self.items.lock().unwrap();
        let id = items.keys().next_back().copied().unwrap_or(0) + 1;
        let mut created = catalog_item(id, &item.name, item.price, item.is_available);
        created.image_url = item.image_url.clone();
        created.category = item.category.clone();
        items.insert(id, created.clone());
        Ok(created)
    }

    fn find_by_id(&self, id: i64) -> Result<Option<CatalogItem>, DomainError> {
        Ok(self.items.lock().unwrap().get(&id).cloned())
    }

    fn list(&self, available_only: bool) -> Result<Vec<CatalogItem>, DomainError> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .values()
            .filter(|i| !available_only || i.is_available)
            .cloned()
            .collect())
    }

    fn update_versioned(
        &self,
        id: i64,
        expected_version: i32,
        patch: &CatalogItemPatch,
    ) -> Result<CatalogItem, DomainError> {
        let mut items = self.items.lock().unwrap();
        let item = items.get_mut(&id).ok_or(DomainError::NotFound("Catalog item"))?;
        if item.lock_version != expected_version {
            return Err(DomainError::StaleObject);
        }
        apply_patch(patch, item);
        item.lock_version += 1;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }
}
