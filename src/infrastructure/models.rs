use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::catalog::{CatalogItem, CatalogItemPatch, NewCatalogItem};
use crate::schema::{catalog_items, order_lines, orders};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = catalog_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CatalogItemRow {
    pub id: i64,
    pub name: String,
    pub price: i32,
    pub image_url: Option<String>,
    pub is_available: bool,
    pub category: Option<String>,
    pub lock_version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CatalogItemRow> for CatalogItem {
    fn from(row: CatalogItemRow) -> Self {
        CatalogItem {
            id: row.id,
            name: row.name,
            price: row.price,
            image_url: row.image_url,
            is_available: row.is_available,
            category: row.category,
            lock_version: row.lock_version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = catalog_items)]
pub struct NewCatalogItemRow<'a> {
    pub name: &'a str,
    pub price: i32,
    pub image_url: Option<&'a str>,
    pub is_available: bool,
    pub category: Option<&'a str>,
}

impl<'a> From<&'a NewCatalogItem> for NewCatalogItemRow<'a> {
    fn from(item: &'a NewCatalogItem) -> Self {
        NewCatalogItemRow {
            name: &item.name,
            price: item.price,
            image_url: item.image_url.as_deref(),
            is_available: item.is_available,
            category: item.category.as_deref(),
        }
    }
}

/// `None` fields are skipped by diesel, so only supplied columns change.
/// `Some(None)` writes NULL.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = catalog_items)]
pub struct CatalogItemChangeset<'a> {
    pub name: Option<&'a str>,
    pub price: Option<i32>,
    pub image_url: Option<Option<&'a str>>,
    pub is_available: Option<bool>,
    pub category: Option<Option<&'a str>>,
    pub updated_at: DateTime<Utc>,
}

impl<'a> CatalogItemChangeset<'a> {
    pub fn from_patch(patch: &'a CatalogItemPatch, updated_at: DateTime<Utc>) -> Self {
        CatalogItemChangeset {
            name: patch.name.as_deref(),
            price: patch.price,
            image_url: patch.image_url.as_ref().map(Option::as_deref),
            is_available: patch.is_available,
            category: patch.category.as_ref().map(Option::as_deref),
            updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: i64,
    pub table_reference: Option<String>,
    pub order_type: String,
    pub total_amount: i64,
    pub tax_amount: i64,
    pub status: String,
    pub idempotency_key: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow<'a> {
    pub table_reference: Option<&'a str>,
    pub order_type: &'a str,
    pub total_amount: i64,
    pub tax_amount: i64,
    pub status: &'a str,
    pub idempotency_key: Option<Uuid>,
}

#[derive(
    Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, Associations,
)]
#[diesel(table_name = order_lines)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderLineRow {
    pub id: i64,
    pub order_id: i64,
    pub menu_snapshot: Value,
    pub quantity: i32,
    pub subtotal: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_lines)]
pub struct NewOrderLineRow {
    pub order_id: i64,
    pub menu_snapshot: Value,
    pub quantity: i32,
    pub subtotal: i64,
}
