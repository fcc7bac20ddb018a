pub mod catalog_service;
pub mod order_service;

#[cfg(test)]
pub(crate) mod test_support;
