use chrono::{DateTime, Utc};

use super::errors::DomainError;
use super::order::ItemSnapshot;

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_CATEGORY_LEN: usize = 50;

/// A menu entry as currently stored. `lock_version` is the optimistic
/// concurrency token: it grows by exactly one on every committed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
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

impl CatalogItem {
    pub fn snapshot(&self) -> ItemSnapshot {
        ItemSnapshot {
            id: self.id,
            name: self.name.clone(),
            price: self.price,
            category: self.category.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewCatalogItem {
    pub name: String,
    pub price: i32,
    pub image_url: Option<String>,
    pub is_available: bool,
    pub category: Option<String>,
}

impl NewCatalogItem {
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut errors = Vec::new();
        check_name(&self.name, &mut errors);
        check_price(self.price, &mut errors);
        check_category(self.category.as_deref(), &mut errors);
        into_result(errors)
    }
}

/// Field changes for a catalog item. `None` leaves the column untouched;
/// for the nullable columns `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct CatalogItemPatch {
    pub name: Option<String>,
    pub price: Option<i32>,
    pub image_url: Option<Option<String>>,
    pub is_available: Option<bool>,
    pub category: Option<Option<String>>,
}

impl CatalogItemPatch {
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut errors = Vec::new();
        if let Some(name) = &self.name {
            check_name(name, &mut errors);
        }
        if let Some(price) = self.price {
            check_price(price, &mut errors);
        }
        check_category(self.category.clone().flatten().as_deref(), &mut errors);
        into_result(errors)
    }
}

fn check_name(name: &str, errors: &mut Vec<String>) {
    if name.trim().is_empty() {
        errors.push("name can't be blank".to_string());
    } else if name.chars().count() > MAX_NAME_LEN {
        errors.push(format!("name is too long (maximum is {MAX_NAME_LEN} characters)"));
    }
}

fn check_price(price: i32, errors: &mut Vec<String>) {
    if price <= 0 {
        errors.push("price must be greater than 0".to_string());
    }
}

fn check_category(category: Option<&str>, errors: &mut Vec<String>) {
    if category.is_some_and(|c| c.chars().count() > MAX_CATEGORY_LEN) {
        errors.push(format!(
            "category is too long (maximum is {MAX_CATEGORY_LEN} characters)"
        ));
    }
}

fn into_result(errors: Vec<String>) -> Result<(), DomainError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(DomainError::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_item(name: &str, price: i32) -> NewCatalogItem {
        NewCatalogItem {
            name: name.to_string(),
            price,
            image_url: None,
            is_available: true,
            category: Some("main".to_string()),
        }
    }

    #[test]
    fn valid_item_passes() {
        assert!(new_item("Ramen", 900).validate().is_ok());
    }

    #[test]
    fn collects_every_field_error() {
        let err = new_item("  ", 0).validate().unwrap_err();
        let DomainError::Validation(messages) = err else {
            panic!("expected validation error");
        };
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn overlong_category_is_rejected() {
        let mut item = new_item("Gyoza", 500);
        item.category = Some("x".repeat(MAX_CATEGORY_LEN + 1));
        assert!(item.validate().is_err());
    }

    #[test]
    fn empty_patch_is_valid() {
        assert!(CatalogItemPatch::default().validate().is_ok());
    }

    #[test]
    fn clearing_category_is_valid() {
        let patch = CatalogItemPatch {
            category: Some(None),
            ..Default::default()
        };
        assert!(patch.validate().is_ok());

        let patch = CatalogItemPatch {
            category: Some(Some("x".repeat(MAX_CATEGORY_LEN + 1))),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn patch_rejects_non_positive_price() {
        let patch = CatalogItemPatch {
            price: Some(-5),
            ..Default::default()
        };
        assert!(matches!(patch.validate(), Err(DomainError::Validation(_))));
    }
}
