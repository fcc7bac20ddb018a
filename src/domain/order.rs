use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;
use super::idempotency::IdempotencyKey;
use super::pricing::PricedOrder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    #[default]
    DineIn,
    Takeout,
    Delivery,
}

impl OrderType {
    pub const ALL: [OrderType; 3] = [OrderType::DineIn, OrderType::Takeout, OrderType::Delivery];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderType::DineIn => "dine_in",
            OrderType::Takeout => "takeout",
            OrderType::Delivery => "delivery",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "order_type must be one of dine_in, takeout, delivery (got '{s}')"
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// `pending -> confirmed -> completed`, and cancellation from any
    /// non-terminal state.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Confirmed, Completed) | (Pending, Cancelled) | (Confirmed, Cancelled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::validation(format!(
                "status must be one of pending, confirmed, completed, cancelled (got '{other}')"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRequest {
    pub catalog_item_id: i64,
    pub quantity: i32,
}

/// What the client asked for, before anything was checked or locked.
/// `order_type` stays raw so that an unknown value is reported by the
/// validator rather than by the deserializer.
#[derive(Debug, Clone, Default)]
pub struct OrderIntent {
    pub table_reference: Option<String>,
    pub order_type: Option<String>,
    pub items: Vec<LineRequest>,
}

impl OrderIntent {
    pub fn requested_order_type(&self) -> &str {
        self.order_type
            .as_deref()
            .unwrap_or(OrderType::DineIn.as_str())
    }
}

/// Immutable copy of a catalog item embedded in an order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub id: i64,
    pub name: String,
    pub price: i32,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLineView {
    pub id: i64,
    pub quantity: i32,
    pub subtotal: i64,
    pub snapshot: ItemSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderView {
    pub id: i64,
    pub table_reference: Option<String>,
    pub order_type: OrderType,
    pub total_amount: i64,
    pub tax_amount: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub idempotency_key: Option<Uuid>,
    pub lines: Vec<OrderLineView>,
}

impl OrderView {
    pub fn subtotal(&self) -> i64 {
        self.total_amount - self.tax_amount
    }
}

/// Everything the unit of work needs to persist one order.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub table_reference: Option<String>,
    pub order_type: OrderType,
    pub idempotency_key: Option<IdempotencyKey>,
    pub priced: PricedOrder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(OrderView),
    Duplicate(OrderView),
}

impl CreateOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, CreateOutcome::Duplicate(_))
    }

    pub fn order(&self) -> &OrderView {
        match self {
            CreateOutcome::Created(order) | CreateOutcome::Duplicate(order) => order,
        }
    }

    pub fn into_order(self) -> OrderView {
        match self {
            CreateOutcome::Created(order) | CreateOutcome::Duplicate(order) => order,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub table_reference: Option<String>,
    pub status: Option<OrderStatus>,
}

/// Rows to skip for a 1-based `page`. Saturates, so an absurd page number
/// reads past the end and yields an empty page.
pub fn page_offset(page: i64, limit: i64) -> i64 {
    page.max(1).saturating_sub(1).saturating_mul(limit.max(0))
}

#[derive(Debug, Clone)]
pub struct ListResult {
    pub items: Vec<OrderView>,
    pub total: i64,
}
