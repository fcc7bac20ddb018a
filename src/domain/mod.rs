pub mod catalog;
pub mod errors;
pub mod idempotency;
pub mod order;
pub mod ports;
pub mod pricing;
pub mod validation;
