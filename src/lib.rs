pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::catalog_service::CatalogService;
use application::order_service::OrderService;
use errors::AppError;
use infrastructure::catalog_repo::DieselCatalogRepository;
use infrastructure::order_repo::DieselOrderRepository;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(OpenApi)]
#[openapi(
    info(title = "Restaurant orders", description = "Table ordering and catalog administration"),
    paths(
        handlers::orders::create_order,
        handlers::orders::order_summary,
        handlers::catalog::list_available_items,
        handlers::catalog::get_available_item,
        handlers::catalog::list_items,
        handlers::catalog::get_item,
        handlers::catalog::create_item,
        handlers::catalog::update_item,
        handlers::catalog::retire_item,
        handlers::admin_orders::list_orders,
        handlers::admin_orders::get_order,
        handlers::admin_orders::update_order_status,
    ),
    components(schemas(
        handlers::orders::CreateOrderRequest,
        handlers::orders::CreateOrderLineRequest,
        handlers::orders::OrderResponse,
        handlers::orders::OrderLineResponse,
        handlers::orders::ItemSnapshotResponse,
        handlers::catalog::CatalogItemResponse,
        handlers::catalog::CreateCatalogItemRequest,
        handlers::catalog::UpdateCatalogItemRequest,
        handlers::admin_orders::ListOrdersResponse,
        handlers::admin_orders::UpdateStatusRequest,
        errors::ErrorEnvelope,
        errors::ErrorBody,
    )),
    tags(
        (name = "orders", description = "Customer ordering"),
        (name = "catalog", description = "Customer catalog browsing"),
        (name = "admin", description = "Catalog and order administration"),
    )
)]
pub struct ApiDoc;

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    if !applied.is_empty() {
        log::info!("Applied {} migration(s)", applied.len());
    }
    Ok(())
}

/// Register services, extractor error handlers and routes.
pub fn configure(cfg: &mut web::ServiceConfig, pool: DbPool) {
    let orders = web::Data::new(OrderService::new(DieselOrderRepository::new(pool.clone())));
    let catalog = web::Data::new(CatalogService::new(DieselCatalogRepository::new(pool)));

    cfg.app_data(orders)
        .app_data(catalog)
        .app_data(web::JsonConfig::default().error_handler(|err, _req| {
            AppError::Validation(vec![format!("malformed request body: {}", err)]).into()
        }))
        .app_data(web::QueryConfig::default().error_handler(|err, _req| {
            AppError::Validation(vec![format!("malformed query string: {}", err)]).into()
        }))
        .app_data(web::PathConfig::default().error_handler(|_err, _req| {
            AppError::NotFound("Resource").into()
        }))
        .service(
            web::scope("/api/v1/customer")
                .route("/orders", web::post().to(handlers::orders::create_order))
                .route(
                    "/orders/{id}/summary",
                    web::get().to(handlers::orders::order_summary),
                )
                .route(
                    "/menus",
                    web::get().to(handlers::catalog::list_available_items),
                )
                .route(
                    "/menus/{id}",
                    web::get().to(handlers::catalog::get_available_item),
                ),
        )
        .service(
            web::scope("/api/v1/admin")
                .route("/menus", web::get().to(handlers::catalog::list_items))
                .route("/menus", web::post().to(handlers::catalog::create_item))
                .route("/menus/{id}", web::get().to(handlers::catalog::get_item))
                .route("/menus/{id}", web::patch().to(handlers::catalog::update_item))
                .route("/menus/{id}", web::delete().to(handlers::catalog::retire_item))
                .route("/orders", web::get().to(handlers::admin_orders::list_orders))
                .route("/orders/{id}", web::get().to(handlers::admin_orders::get_order))
                .route(
                    "/orders/{id}/status",
                    web::patch().to(handlers::admin_orders::update_order_status),
                ),
        )
        .service(
            SwaggerUi::new("/api-docs/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
        );
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    pool: DbPool,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    Ok(HttpServer::new(move || {
        let pool = pool.clone();
        App::new()
            .wrap(Logger::default())
            .configure(move |cfg| configure(cfg, pool))
    })
    .bind((host.to_string(), port))?
    .run())
}
