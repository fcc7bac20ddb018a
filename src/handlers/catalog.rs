use actix_web::{web, HttpResponse};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::domain::catalog::{CatalogItem, CatalogItemPatch, NewCatalogItem};
use crate::errors::{AppError, ErrorEnvelope};

use super::Catalog;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct CatalogItemResponse {
    pub id: i64,
    pub name: String,
    /// Smallest currency unit.
    pub price: i32,
    pub image_url: Option<String>,
    pub is_available: bool,
    pub category: Option<String>,
    /// Send this back unchanged when updating the item.
    pub lock_version: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<CatalogItem> for CatalogItemResponse {
    fn from(item: CatalogItem) -> Self {
        CatalogItemResponse {
            id: item.id,
            name: item.name,
            price: item.price,
            image_url: item.image_url,
            is_available: item.is_available,
            category: item.category,
            lock_version: item.lock_version,
            created_at: item.created_at.to_rfc3339(),
            updated_at: item.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCatalogItemRequest {
    pub name: Option<String>,
    pub price: Option<i32>,
    pub image_url: Option<String>,
    /// Defaults to `true`.
    pub is_available: Option<bool>,
    pub category: Option<String>,
}

impl CreateCatalogItemRequest {
    fn into_new_item(self) -> Result<NewCatalogItem, AppError> {
        Ok(NewCatalogItem {
            name: self.name.ok_or(AppError::MissingParameter("name"))?,
            price: self.price.ok_or(AppError::MissingParameter("price"))?,
            image_url: self.image_url,
            is_available: self.is_available.unwrap_or(true),
            category: self.category,
        })
    }
}

/// Present-but-null becomes `Some(None)`; an absent field stays `None`
/// through `#[serde(default)]`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCatalogItemRequest {
    /// Version the caller last read. Required.
    pub lock_version: Option<i32>,
    pub name: Option<String>,
    pub price: Option<i32>,
    /// `null` clears the image.
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub image_url: Option<Option<String>>,
    pub is_available: Option<bool>,
    /// `null` clears the category.
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub category: Option<Option<String>>,
}

impl UpdateCatalogItemRequest {
    fn split(self) -> (Option<i32>, CatalogItemPatch) {
        let patch = CatalogItemPatch {
            name: self.name,
            price: self.price,
            image_url: self.image_url,
            is_available: self.is_available,
            category: self.category,
        };
        (self.lock_version, patch)
    }
}

fn to_responses(items: Vec<CatalogItem>) -> Vec<CatalogItemResponse> {
    items.into_iter().map(CatalogItemResponse::from).collect()
}

// ── Customer handlers ────────────────────────────────────────────────────────

/// GET /api/v1/customer/menus
///
/// Lists the items that can currently be ordered.
#[utoipa::path(
    get,
    path = "/api/v1/customer/menus",
    responses(
        (status = 200, description = "Available catalog items", body = Vec<CatalogItemResponse>),
    ),
    tag = "catalog"
)]
pub async fn list_available_items(service: web::Data<Catalog>) -> Result<HttpResponse, AppError> {
    let items = web::block(move || service.list_items(true)).await??;
    Ok(HttpResponse::Ok().json(to_responses(items)))
}

/// GET /api/v1/customer/menus/{id}
///
/// Unavailable items are reported as not found.
#[utoipa::path(
    get,
    path = "/api/v1/customer/menus/{id}",
    params(
        ("id" = i64, Path, description = "Catalog item id"),
    ),
    responses(
        (status = 200, description = "Catalog item", body = CatalogItemResponse),
        (status = 404, description = "No such available item", body = ErrorEnvelope),
    ),
    tag = "catalog"
)]
pub async fn get_available_item(
    service: web::Data<Catalog>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let item_id = path.into_inner();
    let item = web::block(move || service.get_available_item(item_id)).await??;
    Ok(HttpResponse::Ok().json(CatalogItemResponse::from(item)))
}

// ── Admin handlers ───────────────────────────────────────────────────────────

/// GET /api/v1/admin/menus
#[utoipa::path(
    get,
    path = "/api/v1/admin/menus",
    responses(
        (status = 200, description = "All catalog items", body = Vec<CatalogItemResponse>),
    ),
    tag = "admin"
)]
pub async fn list_items(service: web::Data<Catalog>) -> Result<HttpResponse, AppError> {
    let items = web::block(move || service.list_items(false)).await??;
    Ok(HttpResponse::Ok().json(to_responses(items)))
}

/// GET /api/v1/admin/menus/{id}
#[utoipa::path(
    get,
    path = "/api/v1/admin/menus/{id}",
    params(
        ("id" = i64, Path, description = "Catalog item id"),
    ),
    responses(
        (status = 200, description = "Catalog item", body = CatalogItemResponse),
        (status = 404, description = "Catalog item not found", body = ErrorEnvelope),
    ),
    tag = "admin"
)]
pub async fn get_item(
    service: web::Data<Catalog>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let item_id = path.into_inner();
    let item = web::block(move || service.get_item(item_id)).await??;
    Ok(HttpResponse::Ok().json(CatalogItemResponse::from(item)))
}

/// POST /api/v1/admin/menus
#[utoipa::path(
    post,
    path = "/api/v1/admin/menus",
    request_body = CreateCatalogItemRequest,
    responses(
        (status = 201, description = "Catalog item created", body = CatalogItemResponse),
        (status = 400, description = "Name or price missing", body = ErrorEnvelope),
        (status = 422, description = "Validation failed", body = ErrorEnvelope),
    ),
    tag = "admin"
)]
pub async fn create_item(
    service: web::Data<Catalog>,
    body: web::Json<CreateCatalogItemRequest>,
) -> Result<HttpResponse, AppError> {
    let new_item = body.into_inner().into_new_item()?;
    let item = web::block(move || service.create_item(new_item)).await??;
    Ok(HttpResponse::Created().json(CatalogItemResponse::from(item)))
}

/// PATCH /api/v1/admin/menus/{id}
///
/// Optimistically locked: the update applies only when `lock_version`
/// matches the stored version, otherwise `409 STALE_OBJECT` and the caller
/// must re-read before retrying.
#[utoipa::path(
    patch,
    path = "/api/v1/admin/menus/{id}",
    request_body = UpdateCatalogItemRequest,
    params(
        ("id" = i64, Path, description = "Catalog item id"),
    ),
    responses(
        (status = 200, description = "Catalog item updated", body = CatalogItemResponse),
        (status = 400, description = "lock_version missing", body = ErrorEnvelope),
        (status = 404, description = "Catalog item not found", body = ErrorEnvelope),
        (status = 409, description = "Item was modified since it was read", body = ErrorEnvelope),
        (status = 422, description = "Validation failed", body = ErrorEnvelope),
    ),
    tag = "admin"
)]
pub async fn update_item(
    service: web::Data<Catalog>,
    path: web::Path<i64>,
    body: web::Json<UpdateCatalogItemRequest>,
) -> Result<HttpResponse, AppError> {
    let item_id = path.into_inner();
    let (expected_version, patch) = body.into_inner().split();

    let item = web::block(move || service.update_item(item_id, expected_version, patch)).await??;
    Ok(HttpResponse::Ok().json(CatalogItemResponse::from(item)))
}

#[derive(Debug, Deserialize)]
pub struct RetireParams {
    pub lock_version: Option<i32>,
}

/// DELETE /api/v1/admin/menus/{id}
///
/// Retires the item: it stops being orderable but stays readable by admins
/// and referenced by existing order snapshots.
#[utoipa::path(
    delete,
    path = "/api/v1/admin/menus/{id}",
    params(
        ("id" = i64, Path, description = "Catalog item id"),
        ("lock_version" = i32, Query, description = "Version the caller last read"),
    ),
    responses(
        (status = 204, description = "Catalog item retired"),
        (status = 400, description = "lock_version missing", body = ErrorEnvelope),
        (status = 404, description = "Catalog item not found", body = ErrorEnvelope),
        (status = 409, description = "Item was modified since it was read", body = ErrorEnvelope),
    ),
    tag = "admin"
)]
pub async fn retire_item(
    service: web::Data<Catalog>,
    path: web::Path<i64>,
    query: web::Query<RetireParams>,
) -> Result<HttpResponse, AppError> {
    let item_id = path.into_inner();
    let expected_version = query.into_inner().lock_version;

    web::block(move || service.retire_item(item_id, expected_version)).await??;
    Ok(HttpResponse::NoContent().finish())
}
