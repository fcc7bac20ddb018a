use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::order::{ItemSnapshot, LineRequest, OrderIntent, OrderLineView, OrderView};
use crate::errors::{AppError, ErrorEnvelope};

use super::{Orders, IDEMPOTENCY_KEY_HEADER, IDEMPOTENT_REPLAYED_HEADER};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderLineRequest {
    pub catalog_item_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    /// Table the order is for, at most 10 characters.
    pub table_reference: Option<String>,
    /// One of `dine_in`, `takeout`, `delivery`. Defaults to `dine_in`.
    pub order_type: Option<String>,
    #[serde(default)]
    pub items: Vec<CreateOrderLineRequest>,
}

impl From<CreateOrderRequest> for OrderIntent {
    fn from(req: CreateOrderRequest) -> Self {
        OrderIntent {
            table_reference: req.table_reference,
            order_type: req.order_type,
            items: req
                .items
                .into_iter()
                .map(|l| LineRequest {
                    catalog_item_id: l.catalog_item_id,
                    quantity: l.quantity,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ItemSnapshotResponse {
    pub id: i64,
    pub name: String,
    pub price: i32,
    pub category: Option<String>,
}

impl From<&ItemSnapshot> for ItemSnapshotResponse {
    fn from(s: &ItemSnapshot) -> Self {
        ItemSnapshotResponse {
            id: s.id,
            name: s.name.clone(),
            price: s.price,
            category: s.category.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderLineResponse {
    pub id: i64,
    pub quantity: i32,
    pub subtotal: i64,
    pub snapshot: ItemSnapshotResponse,
}

impl From<&OrderLineView> for OrderLineResponse {
    fn from(l: &OrderLineView) -> Self {
        OrderLineResponse {
            id: l.id,
            quantity: l.quantity,
            subtotal: l.subtotal,
            snapshot: (&l.snapshot).into(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: i64,
    pub table_reference: Option<String>,
    pub order_type: String,
    pub total_amount: i64,
    pub tax_amount: i64,
    pub status: String,
    pub created_at: String,
    pub idempotency_key: Option<Uuid>,
    pub lines: Vec<OrderLineResponse>,
}

impl From<&OrderView> for OrderResponse {
    fn from(o: &OrderView) -> Self {
        OrderResponse {
            id: o.id,
            table_reference: o.table_reference.clone(),
            order_type: o.order_type.to_string(),
            total_amount: o.total_amount,
            tax_amount: o.tax_amount,
            status: o.status.to_string(),
            created_at: o.created_at.to_rfc3339(),
            idempotency_key: o.idempotency_key,
            lines: o.lines.iter().map(OrderLineResponse::from).collect(),
        }
    }
}

fn idempotency_key(req: &HttpRequest) -> Result<Option<String>, AppError> {
    req.headers()
        .get(IDEMPOTENCY_KEY_HEADER)
        .map(|value| {
            value.to_str().map(str::to_owned).map_err(|_| {
                AppError::Validation(vec!["idempotency key must be a valid UUID v4".to_string()])
            })
        })
        .transpose()
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /api/v1/customer/orders
///
/// Creates an order from the referenced catalog items. Every catalog row is
/// locked for the duration of the transaction, prices are snapshotted into
/// the order lines, and the order plus its lines commit atomically.
///
/// With an `X-Idempotency-Key` header, repeating the same request returns
/// the first order with `200 OK` instead of creating a second one.
#[utoipa::path(
    post,
    path = "/api/v1/customer/orders",
    request_body = CreateOrderRequest,
    params(
        ("X-Idempotency-Key" = Option<String>, Header, description = "UUID v4 naming this order intent"),
    ),
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 200, description = "Duplicate request, existing order returned", body = OrderResponse),
        (status = 409, description = "Deadlock detected, retry the request", body = ErrorEnvelope),
        (status = 422, description = "Validation failed or idempotency key mismatch", body = ErrorEnvelope),
        (status = 500, description = "Internal server error", body = ErrorEnvelope),
    ),
    tag = "orders"
)]
pub async fn create_order(
    service: web::Data<Orders>,
    req: HttpRequest,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let key = idempotency_key(&req)?;
    let intent = OrderIntent::from(body.into_inner());

    let outcome = web::block(move || service.create_order(intent, key.as_deref())).await??;

    let replayed = outcome.is_duplicate();
    let response = OrderResponse::from(&outcome.into_order());
    if replayed {
        Ok(HttpResponse::Ok()
            .insert_header((IDEMPOTENT_REPLAYED_HEADER, "true"))
            .json(response))
    } else {
        Ok(HttpResponse::Created().json(response))
    }
}

/// GET /api/v1/customer/orders/{id}/summary
///
/// Returns the order together with its lines.
#[utoipa::path(
    get,
    path = "/api/v1/customer/orders/{id}/summary",
    params(
        ("id" = i64, Path, description = "Order id"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found", body = ErrorEnvelope),
        (status = 500, description = "Internal server error", body = ErrorEnvelope),
    ),
    tag = "orders"
)]
pub async fn order_summary(
    service: web::Data<Orders>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = web::block(move || service.get_order(order_id))
        .await??
        .ok_or(AppError::NotFound("Order"))?;

    Ok(HttpResponse::Ok().json(OrderResponse::from(&order)))
}
