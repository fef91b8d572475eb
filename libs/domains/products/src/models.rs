use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Catalog product.
///
/// `available` doubles as the soft-delete flag: a removed product keeps its
/// row with `available = false` and disappears from every read path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub price: f64,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub name: String,
    pub price: f64,
}

/// Payload for updating a product: the target id plus the fields to change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct UpdateProduct {
    #[validate(range(min = 1))]
    pub id: i32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
}

impl UpdateProduct {
    /// Split into the target id and the field changes
    pub fn into_parts(self) -> (i32, ProductChanges) {
        let changes = ProductChanges {
            name: self.name,
            price: self.price,
            available: None,
        };
        (self.id, changes)
    }
}

/// Partial field set written by the store; `None` leaves a column untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub available: Option<bool>,
}

impl ProductChanges {
    /// Changes that soft-delete a product
    pub fn soft_delete() -> Self {
        Self {
            available: Some(false),
            ..Default::default()
        }
    }
}

/// Payload carrying a single product id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductId {
    pub id: i32,
}

/// Page request; both fields default when omitted.
///
/// The bounds keep `(page - 1) * limit` inside a signed 64-bit OFFSET.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    #[validate(range(min = 1, max = 1_000_000_000))]
    pub page: u64,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 1_000))]
    pub limit: u64,
}

impl PaginationQuery {
    pub fn new(page: u64, limit: u64) -> Self {
        Self { page, limit }
    }

    /// Rows to skip before this page; `None` when the offset or the limit
    /// would not fit a SQL `BIGINT`
    pub fn offset(&self) -> Option<u64> {
        let max = i64::MAX as u64;
        if self.limit > max {
            return None;
        }
        self.page
            .saturating_sub(1)
            .checked_mul(self.limit)
            .filter(|offset| *offset <= max)
    }
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    10
}

/// Pagination metadata returned alongside a page of products
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u64,
    pub total_rows: u64,
    pub last_page: u64,
}

impl PageMeta {
    /// `last_page` is `ceil(total_rows / limit)`; a zero limit yields zero pages
    pub fn new(page: u64, total_rows: u64, limit: u64) -> Self {
        let last_page = if limit == 0 {
            0
        } else {
            total_rows.div_ceil(limit)
        };

        Self {
            page,
            total_rows,
            last_page,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

/// Ids to check for existence.
///
/// Accepts either a bare JSON array or `{ "ids": [...] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValidateProducts {
    Ids(Vec<i32>),
    Wrapped { ids: Vec<i32> },
}

impl ValidateProducts {
    pub fn into_ids(self) -> Vec<i32> {
        match self {
            ValidateProducts::Ids(ids) | ValidateProducts::Wrapped { ids } => ids,
        }
    }
}

impl Product {
    /// Build a fresh, available product
    pub fn new(id: i32, input: CreateProduct) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: input.name,
            price: input.price,
            available: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply changes and bump `updated_at`
    pub fn apply_changes(&mut self, changes: ProductChanges) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(price) = changes.price {
            self.price = price;
        }
        if let Some(available) = changes.available {
            self.available = available;
        }
        self.updated_at = Utc::now();
    }
}
