use std::fmt;

use crate::domain::errors::DomainError;
use crate::domain::idempotency::{resolve_replay, IdempotencyKey};
use crate::domain::order::{
    CreateOutcome, ListResult, OrderDraft, OrderFilter, OrderIntent, OrderStatus, OrderView,
};
use crate::domain::ports::{OrderRepository, OrderUnitOfWork};
use crate::domain::pricing::price_order;
use crate::domain::validation::validate_and_lock;

/// Where a creation attempt was when its unit of work ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationStage {
    NotStarted,
    ValidatingAndLocking,
    Calculating,
    Persisting,
    Committed,
}

impl fmt::Display for CreationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CreationStage::NotStarted => "not-started",
            CreationStage::ValidatingAndLocking => "validating-and-locking",
            CreationStage::Calculating => "calculating",
            CreationStage::Persisting => "persisting",
            CreationStage::Committed => "committed",
        })
    }
}

pub struct OrderService<R> {
    repo: R,
}

impl<R: OrderRepository> OrderService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Create the order described by `intent` exactly once per idempotency
    /// key.
    ///
    /// A key that already names an order short-circuits before any
    /// transaction is opened. Two requests racing on the same new key are
    /// settled by the unique constraint: the loser re-reads the winner.
    pub fn create_order(
        &self,
        intent: OrderIntent,
        idempotency_key: Option<&str>,
    ) -> Result<CreateOutcome, DomainError> {
        let key = idempotency_key.map(IdempotencyKey::parse).transpose()?;

        if let Some(key) = &key {
            if let Some(existing) = self.repo.find_by_idempotency_key(key)? {
                return self.replay(existing, &intent);
            }
        }

        match self.create_in_transaction(&intent, key) {
            Ok(order) => {
                log::info!(
                    "Created order id={} subtotal={} total_amount={} lines={}",
                    order.id,
                    order.subtotal(),
                    order.total_amount,
                    order.lines.len()
                );
                Ok(CreateOutcome::Created(order))
            }
            Err(DomainError::IdempotencyKeyTaken) => {
                let Some(key) = key else {
                    return Err(DomainError::Internal(
                        "unique violation on an order without idempotency key".to_string(),
                    ));
                };
                let existing = self.repo.find_by_idempotency_key(&key)?.ok_or_else(|| {
                    DomainError::Internal(format!(
                        "idempotency key {} reported taken but no order holds it",
                        key.as_uuid()
                    ))
                })?;
                self.replay(existing, &intent)
            }
            Err(e) => Err(e),
        }
    }

    fn replay(&self, existing: OrderView, intent: &OrderIntent) -> Result<CreateOutcome, DomainError> {
        let outcome = resolve_replay(existing, intent);
        match &outcome {
            Ok(dup) => log::info!("Duplicate request replayed existing order id={}", dup.order().id),
            Err(_) => log::warn!("Idempotency key reused with different order parameters"),
        }
        outcome
    }

    fn create_in_transaction(
        &self,
        intent: &OrderIntent,
        key: Option<IdempotencyKey>,
    ) -> Result<OrderView, DomainError> {
        let mut stage = CreationStage::NotStarted;

        let result = self.repo.transaction(|uow: &mut dyn OrderUnitOfWork| {
            stage = CreationStage::ValidatingAndLocking;
            let locked = validate_and_lock(&mut *uow, intent)?.into_result()?;

            stage = CreationStage::Calculating;
            let priced = price_order(locked.resolve(&intent.items)?)?;

            stage = CreationStage::Persisting;
            uow.insert_order(&OrderDraft {
                table_reference: intent.table_reference.clone(),
                order_type: locked.order_type,
                idempotency_key: key,
                priced,
            })
        });

        match &result {
            Ok(_) => stage = CreationStage::Committed,
            Err(e) if e.is_retryable() => {
                log::warn!("Order creation aborted at {stage}: {e}, caller may retry")
            }
            Err(DomainError::Internal(cause)) => {
                log::error!("Order creation aborted at {stage}: {cause}")
            }
            Err(e) => log::debug!("Order creation aborted at {stage}: {e}"),
        }
        log::debug!("Order creation finished in stage {stage}");
        result
    }

    pub fn get_order(&self, id: i64) -> Result<Option<OrderView>, DomainError> {
        self.repo.find_by_id(id)
    }

    pub fn list_orders(
        &self,
        filter: &OrderFilter,
        page: i64,
        limit: i64,
    ) -> Result<ListResult, DomainError> {
        self.repo.list(filter, page, limit)
    }

    pub fn update_status(&self, id: i64, next: OrderStatus) -> Result<OrderView, DomainError> {
        let order = self.repo.update_status(id, next)?;
        log::info!("Order id={} moved to status {}", order.id, order.status);
        Ok(order)
    }
}
