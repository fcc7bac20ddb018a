use chrono::Utc;
use diesel::dsl::exists;
use diesel::pg::PgConnection;
use diesel::prelude::*;

use crate::db::DbPool;
use crate::domain::catalog::{CatalogItem, CatalogItemPatch, NewCatalogItem};
use crate::domain::errors::DomainError;
use crate::domain::ports::CatalogRepository;
use crate::schema::catalog_items;

use super::models::{CatalogItemChangeset, CatalogItemRow, NewCatalogItemRow};

pub struct DieselCatalogRepository {
    pool: DbPool,
}

impl DieselCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CatalogRepository for DieselCatalogRepository {
    fn create(&self, item: &NewCatalogItem) -> Result<CatalogItem, DomainError> {
        let mut conn = self.pool.get()?;

        let row = diesel::insert_into(catalog_items::table)
            .values(&NewCatalogItemRow::from(item))
            .returning(CatalogItemRow::as_returning())
            .get_result(&mut conn)?;

        Ok(row.into())
    }

    fn find_by_id(&self, id: i64) -> Result<Option<CatalogItem>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = catalog_items::table
            .filter(catalog_items::id.eq(id))
            .select(CatalogItemRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(row.map(CatalogItem::from))
    }

    fn list(&self, available_only: bool) -> Result<Vec<CatalogItem>, DomainError> {
        let mut conn = self.pool.get()?;

        let mut query = catalog_items::table
            .select(CatalogItemRow::as_select())
            .order((
                catalog_items::category.asc(),
                catalog_items::name.asc(),
                catalog_items::id.asc(),
            ))
            .into_boxed();
        if available_only {
            query = query.filter(catalog_items::is_available.eq(true));
        }

        Ok(query
            .load(&mut conn)?
            .into_iter()
            .map(CatalogItem::from)
            .collect())
    }

    fn update_versioned(
        &self,
        id: i64,
        expected_version: i32,
        patch: &CatalogItemPatch,
    ) -> Result<CatalogItem, DomainError> {
        let mut pooled = self.pool.get()?;
        let conn: &mut PgConnection = &mut pooled;

        conn.transaction::<_, DomainError, _>(|conn| {
            // Compare-and-increment in one statement. Blocks while an order
            // transaction holds this row FOR UPDATE.
            let updated = diesel::update(
                catalog_items::table
                    .filter(catalog_items::id.eq(id))
                    .filter(catalog_items::lock_version.eq(expected_version)),
            )
            .set((
                CatalogItemChangeset::from_patch(patch, Utc::now()),
                catalog_items::lock_version.eq(catalog_items::lock_version + 1),
            ))
            .returning(CatalogItemRow::as_returning())
            .get_result(conn)
            .optional()?;

            if let Some(row) = updated {
                return Ok(row.into());
            }

            // Zero rows: either the id is unknown or the version moved on.
            let present: bool = diesel::select(exists(
                catalog_items::table.filter(catalog_items::id.eq(id)),
            ))
            .get_result(conn)?;
            if present {
                Err(DomainError::StaleObject)
            } else {
                Err(DomainError::NotFound("Catalog item"))
            }
        })
    }
}
