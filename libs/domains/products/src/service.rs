//! Product Service - Business logic layer

use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;

use crate::error::{ProductError, ProductResult};
use crate::models::{
    CreateProduct, PageMeta, PagedResult, PaginationQuery, Product, ProductChanges,
    UpdateProduct,
};
use crate::repository::ProductRepository;

/// Product catalog operations over a [`ProductRepository`]
///
/// Holds no state between calls; cloning shares the repository.
pub struct ProductService<R: ProductRepository> {
    repository: Arc<R>,
}

impl<R: ProductRepository> Clone for ProductService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: ProductRepository> ProductService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    /// Persist a new product; it starts out available
    #[instrument(skip(self, input), fields(product_name = %input.name))]
    pub async fn create(&self, input: CreateProduct) -> ProductResult<Product> {
        Ok(self.repository.create(input).await?)
    }

    /// One page of available products plus pagination metadata.
    ///
    /// Pages past the end come back with empty `data`; a page whose offset
    /// overflows is a bad request.
    #[instrument(skip(self))]
    pub async fn list(&self, query: PaginationQuery) -> ProductResult<PagedResult<Product>> {
        let offset = query
            .offset()
            .ok_or_else(|| ProductError::BadRequest("Page is out of range".to_string()))?;

        let total_rows = self.repository.count_available().await?;
        let data = self.repository.find_available(offset, query.limit).await?;

        Ok(PagedResult {
            data,
            meta: PageMeta::new(query.page, total_rows, query.limit),
        })
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: i32) -> ProductResult<Product> {
        self.repository
            .find_available_by_id(id)
            .await?
            .ok_or_else(|| ProductError::not_found(id))
    }

    /// Apply a partial update. Availability is not checked, so soft-deleted
    /// products can still be edited.
    #[instrument(skip(self, input), fields(product_id = input.id))]
    pub async fn update(&self, input: UpdateProduct) -> ProductResult<Product> {
        let (id, changes) = input.into_parts();
        self.repository
            .update(id, changes)
            .await
            .map_err(ProductError::from_write_failure)
    }

    /// Soft delete: flips `available` to false and returns the row
    #[instrument(skip(self))]
    pub async fn remove(&self, id: i32) -> ProductResult<Product> {
        self.repository
            .update(id, ProductChanges::soft_delete())
            .await
            .map_err(ProductError::from_write_failure)
    }

    /// Fetch every id in `ids`, failing unless all of them are available.
    /// Duplicates are ignored.
    #[instrument(skip(self, ids), fields(requested = ids.len()))]
    pub async fn validate_products(&self, ids: Vec<i32>) -> ProductResult<Vec<Product>> {
        let unique: HashSet<i32> = ids.into_iter().collect();
        let expected = unique.len();

        let products = self
            .repository
            .find_available_by_ids(unique.into_iter().collect())
            .await?;

        if products.len() != expected {
            tracing::debug!(expected, found = products.len(), "Product validation failed");
            return Err(ProductError::BadRequest(
                "One or more products not found".to_string(),
            ));
        }

        Ok(products)
    }
}
