pub mod catalog_repo;
pub mod models;
pub mod order_repo;
