use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::order::{OrderFilter, OrderStatus};
use crate::errors::{AppError, ErrorEnvelope};

use super::orders::OrderResponse;
use super::Orders;

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListOrdersParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Only orders for this table.
    pub table_reference: Option<String>,
    /// Only orders in this status.
    pub status: Option<String>,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// `confirmed`, `completed` or `cancelled`.
    pub status: Option<String>,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /api/v1/admin/orders
///
/// Returns a paginated list of orders with their lines, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/admin/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
        ("table_reference" = Option<String>, Query, description = "Only orders for this table"),
        ("status" = Option<String>, Query, description = "Only orders in this status"),
    ),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
        (status = 422, description = "Unknown status filter", body = ErrorEnvelope),
        (status = 500, description = "Internal server error", body = ErrorEnvelope),
    ),
    tag = "admin"
)]
pub async fn list_orders(
    service: web::Data<Orders>,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);
    let filter = OrderFilter {
        table_reference: params.table_reference,
        status: params
            .status
            .as_deref()
            .map(str::parse::<OrderStatus>)
            .transpose()?,
    };

    let result = web::block(move || service.list_orders(&filter, page, limit)).await??;

    Ok(HttpResponse::Ok().json(ListOrdersResponse {
        items: result.items.iter().map(OrderResponse::from).collect(),
        total: result.total,
        page,
        limit,
    }))
}

/// GET /api/v1/admin/orders/{id}
#[utoipa::path(
    get,
    path = "/api/v1/admin/orders/{id}",
    params(
        ("id" = i64, Path, description = "Order id"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found", body = ErrorEnvelope),
    ),
    tag = "admin"
)]
pub async fn get_order(
    service: web::Data<Orders>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = web::block(move || service.get_order(order_id))
        .await??
        .ok_or(AppError::NotFound("Order"))?;

    Ok(HttpResponse::Ok().json(OrderResponse::from(&order)))
}

/// PATCH /api/v1/admin/orders/{id}/status
///
/// Moves an order along its lifecycle. Amounts and lines never change.
#[utoipa::path(
    patch,
    path = "/api/v1/admin/orders/{id}/status",
    request_body = UpdateStatusRequest,
    params(
        ("id" = i64, Path, description = "Order id"),
    ),
    responses(
        (status = 200, description = "Status updated", body = OrderResponse),
        (status = 400, description = "Status missing", body = ErrorEnvelope),
        (status = 404, description = "Order not found", body = ErrorEnvelope),
        (status = 422, description = "Unknown status or forbidden transition", body = ErrorEnvelope),
    ),
    tag = "admin"
)]
pub async fn update_order_status(
    service: web::Data<Orders>,
    path: web::Path<i64>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let next: OrderStatus = body
        .into_inner()
        .status
        .ok_or(AppError::MissingParameter("status"))?
        .parse()?;

    let order = web::block(move || service.update_status(order_id, next)).await??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(&order)))
}
