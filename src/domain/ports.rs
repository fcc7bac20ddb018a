use super::catalog::{CatalogItem, CatalogItemPatch, NewCatalogItem};
use super::errors::DomainError;
use super::idempotency::IdempotencyKey;
use super::order::{ListResult, OrderDraft, OrderFilter, OrderStatus, OrderView};

/// Row-level exclusive lock on a catalog item, held until the enclosing
/// unit of work ends. Blocks while another transaction holds the row.
pub trait CatalogLocker {
    fn lock_catalog_item(&mut self, id: i64) -> Result<Option<CatalogItem>, DomainError>;
}

/// Operations available inside one atomic unit of work.
pub trait OrderUnitOfWork: CatalogLocker {
    /// Fails with `IdempotencyKeyTaken` if the draft's key is already stored.
    fn insert_order(&mut self, draft: &OrderDraft) -> Result<OrderView, DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    /// Run `work` in a single transaction: committed if it returns `Ok`,
    /// rolled back otherwise.
    fn transaction<T, F>(&self, work: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn OrderUnitOfWork) -> Result<T, DomainError>;

    fn find_by_id(&self, id: i64) -> Result<Option<OrderView>, DomainError>;
    fn find_by_idempotency_key(&self, key: &IdempotencyKey)
        -> Result<Option<OrderView>, DomainError>;
    fn list(&self, filter: &OrderFilter, page: i64, limit: i64) -> Result<ListResult, DomainError>;
    fn update_status(&self, id: i64, next: OrderStatus) -> Result<OrderView, DomainError>;
}

pub trait CatalogRepository: Send + Sync + 'static {
    fn create(&self, item: &NewCatalogItem) -> Result<CatalogItem, DomainError>;
    fn find_by_id(&self, id: i64) -> Result<Option<CatalogItem>, DomainError>;
    fn list(&self, available_only: bool) -> Result<Vec<CatalogItem>, DomainError>;
    /// Apply `patch` only if the stored `lock_version` equals
    /// `expected_version`, bumping it by one. `StaleObject` otherwise.
    fn update_versioned(
        &self,
        id: i64,
        expected_version: i32,
        patch: &CatalogItemPatch,
    ) -> Result<CatalogItem, DomainError>;
}
