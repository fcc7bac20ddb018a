use crate::domain::catalog::{CatalogItem, CatalogItemPatch, NewCatalogItem};
use crate::domain::errors::DomainError;
use crate::domain::ports::CatalogRepository;

pub struct CatalogService<C> {
    repo: C,
}

impl<C: CatalogRepository> CatalogService<C> {
    pub fn new(repo: C) -> Self {
        Self { repo }
    }

    pub fn create_item(&self, item: NewCatalogItem) -> Result<CatalogItem, DomainError> {
        item.validate()?;
        let created = self.repo.create(&item)?;
        log::info!("Created catalog item id={} name={}", created.id, created.name);
        Ok(created)
    }

    pub fn get_item(&self, id: i64) -> Result<CatalogItem, DomainError> {
        self.repo
            .find_by_id(id)?
            .ok_or(DomainError::NotFound("Catalog item"))
    }

    /// Customers only ever see items that can currently be ordered.
    pub fn get_available_item(&self, id: i64) -> Result<CatalogItem, DomainError> {
        self.repo
            .find_by_id(id)?
            .filter(|item| item.is_available)
            .ok_or(DomainError::NotFound("Catalog item"))
    }

    pub fn list_items(&self, available_only: bool) -> Result<Vec<CatalogItem>, DomainError> {
        self.repo.list(available_only)
    }

    /// Apply `patch` if the caller saw the current version. The token is a
    /// hard precondition: omitting it is a `MissingParameter`, never a
    /// blind overwrite.
    pub fn update_item(
        &self,
        id: i64,
        expected_version: Option<i32>,
        patch: CatalogItemPatch,
    ) -> Result<CatalogItem, DomainError> {
        let expected_version = expected_version.ok_or(DomainError::MissingParameter("lock_version"))?;
        patch.validate()?;

        match self.repo.update_versioned(id, expected_version, &patch) {
            Ok(item) => {
                log::info!(
                    "Updated catalog item id={} lock_version {} -> {}",
                    item.id,
                    expected_version,
                    item.lock_version
                );
                Ok(item)
            }
            Err(DomainError::StaleObject) => {
                log::warn!(
                    "Rejected stale update of catalog item id={} (lock_version {})",
                    id,
                    expected_version
                );
                Err(DomainError::StaleObject)
            }
            Err(e) => Err(e),
        }
    }

    /// Take an item off the menu. Orders keep their snapshots, so the row
    /// itself is never deleted; retiring is a versioned update like any other.
    pub fn retire_item(
        &self,
        id: i64,
        expected_version: Option<i32>,
    ) -> Result<CatalogItem, DomainError> {
        let retire = CatalogItemPatch {
            is_available: Some(false),
            ..Default::default()
        };
        let item = self.update_item(id, expected_version, retire)?;
        log::info!("Retired catalog item id={}", item.id);
        Ok(item)
    }
}
