use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::models::{CreateProduct, Product, ProductChanges};

/// Repository trait for Product persistence
///
/// Every read only sees rows with `available = true`. Writes address a row
/// by id regardless of its availability.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Count available products
    async fn count_available(&self) -> Result<u64, StoreError>;

    /// Page through available products ordered by id
    async fn find_available(&self, skip: u64, take: u64) -> Result<Vec<Product>, StoreError>;

    async fn find_available_by_id(&self, id: i32) -> Result<Option<Product>, StoreError>;

    /// Available products whose id is in `ids`, ordered by id
    async fn find_available_by_ids(&self, ids: Vec<i32>) -> Result<Vec<Product>, StoreError>;

    /// Insert a new available product
    async fn create(&self, input: CreateProduct) -> Result<Product, StoreError>;

    /// Apply `changes` to the row with `id`; [`StoreError::RowNotFound`] when no row has it
    async fn update(&self, id: i32, changes: ProductChanges) -> Result<Product, StoreError>;
}

/// Process-local store used in development and tests
#[derive(Clone, Default)]
pub struct InMemoryProductRepository {
    products: Arc<RwLock<BTreeMap<i32, Product>>>,
    next_id: Arc<RwLock<i32>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn count_available(&self) -> Result<u64, StoreError> {
        let products = self.products.read().await;
        Ok(products.values().filter(|p| p.available).count() as u64)
    }

    async fn find_available(&self, skip: u64, take: u64) -> Result<Vec<Product>, StoreError> {
        let products = self.products.read().await;
        Ok(products
            .values()
            .filter(|p| p.available)
            .skip(skip as usize)
            .take(take as usize)
            .cloned()
            .collect())
    }

    async fn find_available_by_id(&self, id: i32) -> Result<Option<Product>, StoreError> {
        let products = self.products.read().await;
        Ok(products.get(&id).filter(|p| p.available).cloned())
    }

    async fn find_available_by_ids(&self, ids: Vec<i32>) -> Result<Vec<Product>, StoreError> {
        let products = self.products.read().await;
        Ok(products
            .values()
            .filter(|p| p.available && ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn create(&self, input: CreateProduct) -> Result<Product, StoreError> {
        let mut next_id = self.next_id.write().await;
        *next_id += 1;

        let product = Product::new(*next_id, input);
        self.products
            .write()
            .await
            .insert(product.id, product.clone());

        Ok(product)
    }

    async fn update(&self, id: i32, changes: ProductChanges) -> Result<Product, StoreError> {
        let mut products = self.products.write().await;
        let product = products.get_mut(&id).ok_or(StoreError::RowNotFound)?;
        product.apply_changes(changes);
        Ok(product.clone())
    }
}
