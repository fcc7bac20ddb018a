pub mod admin_orders;
pub mod catalog;
pub mod orders;

use crate::application::catalog_service::CatalogService;
use crate::application::order_service::OrderService;
use crate::infrastructure::catalog_repo::DieselCatalogRepository;
use crate::infrastructure::order_repo::DieselOrderRepository;

pub type Orders = OrderService<DieselOrderRepository>;
pub type Catalog = CatalogService<DieselCatalogRepository>;

pub const IDEMPOTENCY_KEY_HEADER: &str = "X-Idempotency-Key";
pub const IDEMPOTENT_REPLAYED_HEADER: &str = "Idempotent-Replayed";
