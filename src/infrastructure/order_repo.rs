use chrono::Utc;
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::db::DbPool;
use crate::domain::catalog::CatalogItem;
use crate::domain::errors::DomainError;
use crate::domain::idempotency::IdempotencyKey;
use crate::domain::order::{
    page_offset, ListResult, OrderDraft, OrderFilter, OrderLineView, OrderStatus, OrderView,
};
use crate::domain::ports::{CatalogLocker, OrderRepository, OrderUnitOfWork};
use crate::schema::{catalog_items, order_lines, orders};

use super::models::{CatalogItemRow, NewOrderLineRow, NewOrderRow, OrderLineRow, OrderRow};

// ── Error conversions (infrastructure concern only) ──────────────────────────

/// Postgres reports SQLSTATE 40P01 as an unclassified database error, so the
/// deadlock is recognised by its message.
fn is_deadlock(message: &str) -> bool {
    message.contains("deadlock detected")
}

impl From<DieselError> for DomainError {
    fn from(e: DieselError) -> Self {
        match e {
            DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => {
                DomainError::Deadlock
            }
            DieselError::DatabaseError(_, ref info) if is_deadlock(info.message()) => {
                DomainError::Deadlock
            }
            other => DomainError::Internal(other.to_string()),
        }
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::Internal(format!("malformed item snapshot: {e}"))
    }
}

// ── Row mapping ──────────────────────────────────────────────────────────────

fn stored<T: std::str::FromStr>(column: &str, value: &str) -> Result<T, DomainError> {
    value
        .parse()
        .map_err(|_| DomainError::Internal(format!("unexpected {column} '{value}' in orders")))
}

fn to_view(order: OrderRow, lines: Vec<OrderLineRow>) -> Result<OrderView, DomainError> {
    let lines = lines
        .into_iter()
        .map(|l| {
            Ok(OrderLineView {
                id: l.id,
                quantity: l.quantity,
                subtotal: l.subtotal,
                snapshot: serde_json::from_value(l.menu_snapshot)?,
            })
        })
        .collect::<Result<Vec<_>, DomainError>>()?;

    Ok(OrderView {
        id: order.id,
        table_reference: order.table_reference,
        order_type: stored("order_type", &order.order_type)?,
        total_amount: order.total_amount,
        tax_amount: order.tax_amount,
        status: stored("status", &order.status)?,
        created_at: order.created_at,
        idempotency_key: order.idempotency_key,
        lines,
    })
}

fn load_lines(conn: &mut PgConnection, order_id: i64) -> Result<Vec<OrderLineRow>, DomainError> {
    Ok(order_lines::table
        .filter(order_lines::order_id.eq(order_id))
        .select(OrderLineRow::as_select())
        .order(order_lines::id.asc())
        .load(conn)?)
}

fn with_lines(conn: &mut PgConnection, order: Option<OrderRow>) -> Result<Option<OrderView>, DomainError> {
    let Some(order) = order else {
        return Ok(None);
    };
    let lines = load_lines(conn, order.id)?;
    to_view(order, lines).map(Some)
}

fn filtered(filter: &OrderFilter) -> orders::BoxedQuery<'_, Pg> {
    let mut query = orders::table.into_boxed();
    if let Some(table) = &filter.table_reference {
        query = query.filter(orders::table_reference.eq(table.as_str()));
    }
    if let Some(status) = filter.status {
        query = query.filter(orders::status.eq(status.as_str()));
    }
    query
}

// ── Unit of work ─────────────────────────────────────────────────────────────

/// Statements issued inside one open Postgres transaction. Row locks taken
/// here are released by the enclosing COMMIT or ROLLBACK.
struct PgUnitOfWork<'c> {
    conn: &'c mut PgConnection,
}

impl CatalogLocker for PgUnitOfWork<'_> {
    fn lock_catalog_item(&mut self, id: i64) -> Result<Option<CatalogItem>, DomainError> {
        let row = catalog_items::table
            .filter(catalog_items::id.eq(id))
            .select(CatalogItemRow::as_select())
            .for_update()
            .first(self.conn)
            .optional()?;
        Ok(row.map(CatalogItem::from))
    }
}

impl OrderUnitOfWork for PgUnitOfWork<'_> {
    fn insert_order(&mut self, draft: &OrderDraft) -> Result<OrderView, DomainError> {
        // 1. Insert the order. The only unique constraint on `orders` is the
        //    idempotency key, so a unique violation means another request
        //    already committed this intent.
        let order = diesel::insert_into(orders::table)
            .values(&NewOrderRow {
                table_reference: draft.table_reference.as_deref(),
                order_type: draft.order_type.as_str(),
                total_amount: draft.priced.total_amount,
                tax_amount: draft.priced.tax_amount,
                status: OrderStatus::Pending.as_str(),
                idempotency_key: draft.idempotency_key.map(|k| k.as_uuid()),
            })
            .returning(OrderRow::as_returning())
            .get_result(self.conn)
            .map_err(|e| match e {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    DomainError::IdempotencyKeyTaken
                }
                other => other.into(),
            })?;

        // 2. Insert one line per priced item, each carrying its snapshot.
        let new_lines = draft
            .priced
            .lines
            .iter()
            .map(|l| {
                Ok(NewOrderLineRow {
                    order_id: order.id,
                    menu_snapshot: serde_json::to_value(&l.snapshot)?,
                    quantity: l.quantity,
                    subtotal: l.subtotal,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;
        let lines = diesel::insert_into(order_lines::table)
            .values(&new_lines)
            .returning(OrderLineRow::as_returning())
            .get_results(self.conn)?;

        to_view(order, lines)
    }
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderRepository for DieselOrderRepository {
    fn transaction<T, F>(&self, work: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn OrderUnitOfWork) -> Result<T, DomainError>,
    {
        let mut pooled = self.pool.get()?;
        let conn: &mut PgConnection = &mut pooled;

        conn.transaction::<_, DomainError, _>(|conn| {
            let mut uow = PgUnitOfWork { conn };
            work(&mut uow)
        })
    }

    fn find_by_id(&self, id: i64) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        let order = orders::table
            .filter(orders::id.eq(id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        with_lines(&mut conn, order)
    }

    fn find_by_idempotency_key(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        let order = orders::table
            .filter(orders::idempotency_key.eq(key.as_uuid()))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        with_lines(&mut conn, order)
    }

    fn list(&self, filter: &OrderFilter, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let mut conn = self.pool.get()?;

        let offset = page_offset(page, limit);
        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = filtered(filter).count().get_result(conn)?;

            let rows = filtered(filter)
                .select(OrderRow::as_select())
                .order((orders::created_at.desc(), orders::id.desc()))
                .limit(limit)
                .offset(offset)
                .load(conn)?;

            let lines = OrderLineRow::belonging_to(&rows)
                .select(OrderLineRow::as_select())
                .order(order_lines::id.asc())
                .load(conn)?;

            let items = lines
                .grouped_by(&rows)
                .into_iter()
                .zip(rows)
                .map(|(lines, order)| to_view(order, lines))
                .collect::<Result<Vec<_>, DomainError>>()?;

            Ok(ListResult { items, total })
        })
    }

    fn update_status(&self, id: i64, next: OrderStatus) -> Result<OrderView, DomainError> {
        let mut pooled = self.pool.get()?;
        let conn: &mut PgConnection = &mut pooled;

        conn.transaction::<_, DomainError, _>(|conn| {
            let current = orders::table
                .filter(orders::id.eq(id))
                .select(OrderRow::as_select())
                .for_update()
                .first(conn)
                .optional()?
                .ok_or(DomainError::NotFound("Order"))?;

            let status: OrderStatus = stored("status", &current.status)?;
            if !status.can_transition_to(next) {
                return Err(DomainError::validation(format!(
                    "cannot change status from {status} to {next}"
                )));
            }

            let order = diesel::update(orders::table.filter(orders::id.eq(id)))
                .set((
                    orders::status.eq(next.as_str()),
                    orders::updated_at.eq(Utc::now()),
                ))
                .returning(OrderRow::as_returning())
                .get_result(conn)?;

            let lines = load_lines(conn, order.id)?;
            to_view(order, lines)
        })
    }
}
