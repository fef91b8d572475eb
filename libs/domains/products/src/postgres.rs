use async_trait::async_trait;
use sea_orm::ActiveValue::{Set, Unchanged};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

use crate::{
    entity,
    error::StoreError,
    models::{CreateProduct, Product, ProductChanges},
    repository::ProductRepository,
};

pub struct PgProductRepository {
    db: DatabaseConnection,
}

impl PgProductRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn available() -> sea_orm::Select<entity::Entity> {
        entity::Entity::find().filter(entity::Column::Available.eq(true))
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn count_available(&self) -> Result<u64, StoreError> {
        Ok(Self::available().count(&self.db).await?)
    }

    async fn find_available(&self, skip: u64, take: u64) -> Result<Vec<Product>, StoreError> {
        let models = Self::available()
            .order_by_asc(entity::Column::Id)
            .offset(skip)
            .limit(take)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn find_available_by_id(&self, id: i32) -> Result<Option<Product>, StoreError> {
        let model = Self::available()
            .filter(entity::Column::Id.eq(id))
            .one(&self.db)
            .await?;

        Ok(model.map(Into::into))
    }

    async fn find_available_by_ids(&self, ids: Vec<i32>) -> Result<Vec<Product>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let models = Self::available()
            .filter(entity::Column::Id.is_in(ids))
            .order_by_asc(entity::Column::Id)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn create(&self, input: CreateProduct) -> Result<Product, StoreError> {
        let active_model: entity::ActiveModel = input.into();
        let model = active_model.insert(&self.db).await?;

        tracing::info!(product_id = model.id, "Created product");
        Ok(model.into())
    }

    async fn update(&self, id: i32, changes: ProductChanges) -> Result<Product, StoreError> {
        let mut active_model = entity::ActiveModel {
            id: Unchanged(id),
            updated_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        if let Some(name) = changes.name {
            active_model.name = Set(name);
        }
        if let Some(price) = changes.price {
            active_model.price = Set(price);
        }
        if let Some(available) = changes.available {
            active_model.available = Set(available);
        }

        // single UPDATE ... RETURNING; no matching row surfaces as RecordNotUpdated
        let model = active_model.update(&self.db).await?;

        tracing::info!(product_id = id, "Updated product");
        Ok(model.into())
    }
}
