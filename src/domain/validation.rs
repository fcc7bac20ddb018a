//! Input checks and catalog row locking for order creation.
//!
//! Checks run in a fixed order and stop at the first failure. Locks are
//! taken in request order, not id order, so two orders naming the same
//! items in opposite order can deadlock; the store's detector aborts one
//! of them and the orchestrator reports it as `DomainError::Deadlock`.

use std::collections::HashMap;

use super::catalog::CatalogItem;
use super::errors::DomainError;
use super::order::{LineRequest, OrderIntent, OrderType};
use super::ports::CatalogLocker;

pub const MAX_TABLE_REFERENCE_LEN: usize = 10;

/// Result of a validation pass. `errors` holds at most one message since
/// validation short-circuits; `locked_items` holds every row locked before
/// that point.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub order_type: Option<OrderType>,
    pub locked_items: HashMap<i64, CatalogItem>,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn failed(mut self, message: impl Into<String>) -> Self {
        self.errors.push(message.into());
        self
    }

    pub fn into_result(self) -> Result<LockedCatalog, DomainError> {
        if !self.errors.is_empty() {
            return Err(DomainError::Validation(self.errors));
        }
        let order_type = self
            .order_type
            .ok_or_else(|| DomainError::Internal("validated report without order type".into()))?;
        Ok(LockedCatalog {
            order_type,
            items: self.locked_items,
        })
    }
}

/// Catalog rows locked for the rest of the current unit of work.
#[derive(Debug)]
pub struct LockedCatalog {
    pub order_type: OrderType,
    items: HashMap<i64, CatalogItem>,
}

impl LockedCatalog {
    pub fn get(&self, id: i64) -> Option<&CatalogItem> {
        self.items.get(&id)
    }

    /// Pair each requested line with its locked row, in request order.
    pub fn resolve<'a>(
        &'a self,
        lines: &[LineRequest],
    ) -> Result<Vec<(&'a CatalogItem, i32)>, DomainError> {
        lines
            .iter()
            .map(|line| {
                self.get(line.catalog_item_id)
                    .map(|item| (item, line.quantity))
                    .ok_or_else(|| {
                        DomainError::Internal(format!(
                            "catalog item {} was not locked",
                            line.catalog_item_id
                        ))
                    })
            })
            .collect()
    }
}

/// Validate `intent` and lock every catalog row it references.
///
/// `Err` is reserved for storage failures raised while locking (deadlock,
/// lost connection); every input problem lands in `ValidationReport::errors`.
pub fn validate_and_lock<L>(locker: &mut L, intent: &OrderIntent) -> Result<ValidationReport, DomainError>
where
    L: CatalogLocker + ?Sized,
{
    let mut report = ValidationReport::default();

    if intent.items.is_empty() {
        return Ok(report.failed("items required"));
    }

    match intent.requested_order_type().parse::<OrderType>() {
        Ok(order_type) => report.order_type = Some(order_type),
        Err(DomainError::Validation(mut messages)) => {
            report.errors.append(&mut messages);
            return Ok(report);
        }
        Err(other) => return Err(other),
    }

    if let Some(table) = &intent.table_reference {
        if table.chars().count() > MAX_TABLE_REFERENCE_LEN {
            return Ok(report.failed(format!(
                "table_reference is too long (maximum is {MAX_TABLE_REFERENCE_LEN} characters)"
            )));
        }
    }

    if let Some(line) = intent.items.iter().find(|line| line.quantity <= 0) {
        return Ok(report.failed(format!(
            "quantity for catalog item {} must be greater than 0",
            line.catalog_item_id
        )));
    }

    for line in &intent.items {
        let Some(item) = locker.lock_catalog_item(line.catalog_item_id)? else {
            return Ok(report.failed(format!(
                "catalog item {} not found",
                line.catalog_item_id
            )));
        };
        if !item.is_available {
            return Ok(report.failed(format!("{} is currently unavailable", item.name)));
        }
        report.locked_items.insert(item.id, item);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[derive(Default)]
    struct FakeLocker {
        rows: HashMap<i64, CatalogItem>,
        locked: Vec<i64>,
        fail_on: Option<(i64, DomainError)>,
    }

    impl FakeLocker {
        fn with(items: &[(i64, i32, bool)]) -> Self {
            let rows = items
                .iter()
                .map(|&(id, price, is_available)| {
                    (
                        id,
                        CatalogItem {
                            id,
                            name: format!("item-{id}"),
                            price,
                            image_url: None,
                            is_available,
                            category: None,
                            lock_version: 0,
                            created_at: Utc::now(),
                            updated_at: Utc::now(),
                        },
                    )
                })
                .collect();
            FakeLocker {
                rows,
                ..Default::default()
            }
        }
    }

    impl CatalogLocker for FakeLocker {
        fn lock_catalog_item(&mut self, id: i64) -> Result<Option<CatalogItem>, DomainError> {
            if let Some((fail_id, err)) = &self.fail_on {
                if *fail_id == id {
                    return Err(err.clone());
                }
            }
            self.locked.push(id);
            Ok(self.rows.get(&id).cloned())
        }
    }

    fn intent(items: &[(i64, i32)]) -> OrderIntent {
        OrderIntent {
            table_reference: Some("A-1".to_string()),
            order_type: None,
            items: items
                .iter()
                .map(|&(catalog_item_id, quantity)| LineRequest {
                    catalog_item_id,
                    quantity,
                })
                .collect(),
        }
    }

    fn single_error(report: ValidationReport) -> String {
        assert_eq!(report.errors.len(), 1, "{:?}", report.errors);
        report.errors.into_iter().next().unwrap()
    }

    #[test]
    fn locks_rows_in_request_order() {
        let mut locker = FakeLocker::with(&[(1, 100, true), (2, 200, true), (3, 300, true)]);
        let i = intent(&[(3, 1), (1, 2), (2, 1)]);
        let report = validate_and_lock(&mut locker, &i).unwrap();

        assert!(report.errors.is_empty());
        assert_eq!(locker.locked, vec![3, 1, 2]);

        let locked = report.into_result().unwrap();
        assert_eq!(locked.order_type, OrderType::DineIn);
        let ids: Vec<i64> = locked.resolve(&i.items).unwrap().iter().map(|(item, _)| item.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn empty_items_fail_before_any_lock() {
        let mut locker = FakeLocker::with(&[(1, 100, true)]);
        let report = validate_and_lock(&mut locker, &intent(&[])).unwrap();

        assert_eq!(single_error(report), "items required");
        assert!(locker.locked.is_empty());
    }

    #[test]
    fn unknown_order_type_fails_before_any_lock() {
        let mut locker = FakeLocker::with(&[(1, 100, true)]);
        let mut i = intent(&[(1, 1)]);
        i.order_type = Some("drive_thru".to_string());

        let report = validate_and_lock(&mut locker, &i).unwrap();
        assert!(single_error(report).contains("order_type"));
        assert!(locker.locked.is_empty());
    }

    #[test]
    fn long_table_reference_is_rejected() {
        let mut locker = FakeLocker::with(&[(1, 100, true)]);
        let mut i = intent(&[(1, 1)]);
        i.table_reference = Some("TABLE-12345".to_string());

        let report = validate_and_lock(&mut locker, &i).unwrap();
        assert!(single_error(report).contains("table_reference"));
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let mut locker = FakeLocker::with(&[(1, 100, true)]);
        let report = validate_and_lock(&mut locker, &intent(&[(1, 0)])).unwrap();

        assert!(single_error(report).contains("quantity"));
        assert!(locker.locked.is_empty());
    }

    #[test]
    fn missing_item_stops_at_first_failure() {
        let mut locker = FakeLocker::with(&[(1, 100, true), (3, 300, true)]);
        let report = validate_and_lock(&mut locker, &intent(&[(1, 1), (2, 1), (3, 1)])).unwrap();

        assert_eq!(locker.locked, vec![1, 2]);
        assert_eq!(single_error(report), "catalog item 2 not found");
    }

    #[test]
    fn unavailable_item_is_rejected() {
        let mut locker = FakeLocker::with(&[(1, 100, true), (2, 200, false)]);
        let report = validate_and_lock(&mut locker, &intent(&[(1, 1), (2, 1)])).unwrap();

        assert_eq!(single_error(report), "item-2 is currently unavailable");
    }

    #[test]
    fn invalid_report_converts_to_validation_error() {
        let mut locker = FakeLocker::with(&[]);
        let report = validate_and_lock(&mut locker, &intent(&[(9, 1)])).unwrap();

        assert!(matches!(report.into_result(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn storage_failures_propagate_as_errors() {
        let mut locker = FakeLocker::with(&[(1, 100, true), (2, 200, true)]);
        locker.fail_on = Some((2, DomainError::Deadlock));

        let result = validate_and_lock(&mut locker, &intent(&[(1, 1), (2, 1)]));
        assert_eq!(result.unwrap_err(), DomainError::Deadlock);
    }

    #[test]
    fn repeated_item_resolves_once_per_line() {
        let mut locker = FakeLocker::with(&[(1, 100, true)]);
        let i = intent(&[(1, 1), (1, 4)]);
        let locked = validate_and_lock(&mut locker, &i)
            .unwrap()
            .into_result()
            .unwrap();

        let resolved = locked.resolve(&i.items).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[1].1, 4);
    }
}
