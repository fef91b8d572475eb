//! RPC handlers for the products message patterns
//!
//! Each pattern is served on its own subject (`{prefix}.{pattern}`). Handlers
//! take the raw JSON payload of a request and return the encoded reply:
//!
//! - `{"data": ...}` on success
//! - `{"error": {"status": 404, "message": "..."}}` on failure

use http::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};
use tracing::{debug, warn};
use validator::Validate;

use crate::error::RpcError;
use crate::models::{CreateProduct, PaginationQuery, ProductId, UpdateProduct, ValidateProducts};
use crate::repository::ProductRepository;
use crate::service::ProductService;

/// Message patterns understood by the products service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ProductPattern {
    CreateProduct,
    FindAllProducts,
    FindOneProduct,
    UpdateProduct,
    DeleteProduct,
    ValidateProducts,
}

impl ProductPattern {
    /// Subject this pattern is served on
    pub fn subject(&self, prefix: &str) -> String {
        format!("{}.{}", prefix, self.as_ref())
    }

    /// Every subject served under `prefix`
    pub fn subjects(prefix: &str) -> Vec<String> {
        Self::iter().map(|p| p.subject(prefix)).collect()
    }
}

/// Reply envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RpcReply {
    Data(Value),
    Error(RpcError),
}

impl RpcReply {
    fn ok<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => RpcReply::Data(value),
            Err(e) => RpcReply::Error(RpcError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode reply: {}", e),
            )),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        // Serializing a Value-backed enum cannot fail
        serde_json::to_vec(self).unwrap_or_default()
    }
}

impl<T: Serialize, E: Into<RpcError>> From<Result<T, E>> for RpcReply {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => RpcReply::ok(&value),
            Err(err) => RpcReply::Error(err.into()),
        }
    }
}

fn bad_request(message: impl Into<String>) -> RpcError {
    RpcError::new(StatusCode::BAD_REQUEST, message)
}

/// Decode a payload; an empty body is read as `{}`
fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, RpcError> {
    let payload = if payload.iter().all(u8::is_ascii_whitespace) {
        b"{}".as_slice()
    } else {
        payload
    };

    serde_json::from_slice(payload).map_err(|e| bad_request(format!("Invalid payload: {}", e)))
}

fn decode_valid<T: DeserializeOwned + Validate>(payload: &[u8]) -> Result<T, RpcError> {
    let value: T = decode(payload)?;
    value.validate().map_err(|e| bad_request(e.to_string()))?;
    Ok(value)
}

/// Run one request through the service
pub async fn handle<R: ProductRepository>(
    service: &ProductService<R>,
    pattern: ProductPattern,
    payload: &[u8],
) -> RpcReply {
    debug!(pattern = %pattern, bytes = payload.len(), "Handling request");

    match pattern {
        ProductPattern::CreateProduct => match decode::<CreateProduct>(payload) {
            Ok(input) => service.create(input).await.into(),
            Err(e) => RpcReply::Error(e),
        },
        ProductPattern::FindAllProducts => match decode_valid::<PaginationQuery>(payload) {
            Ok(query) => service.list(query).await.into(),
            Err(e) => RpcReply::Error(e),
        },
        ProductPattern::FindOneProduct => match decode::<ProductId>(payload) {
            Ok(ProductId { id }) => service.get_by_id(id).await.into(),
            Err(e) => RpcReply::Error(e),
        },
        ProductPattern::UpdateProduct => match decode_valid::<UpdateProduct>(payload) {
            Ok(input) => service.update(input).await.into(),
            Err(e) => RpcReply::Error(e),
        },
        ProductPattern::DeleteProduct => match decode::<ProductId>(payload) {
            Ok(ProductId { id }) => service.remove(id).await.into(),
            Err(e) => RpcReply::Error(e),
        },
        ProductPattern::ValidateProducts => match decode::<ValidateProducts>(payload) {
            Ok(request) => service.validate_products(request.into_ids()).await.into(),
            Err(e) => RpcReply::Error(e),
        },
    }
}

/// Resolve `pattern` and return the encoded reply
pub async fn dispatch<R: ProductRepository>(
    service: &ProductService<R>,
    pattern: &str,
    payload: &[u8],
) -> Vec<u8> {
    let reply = match pattern.parse::<ProductPattern>() {
        Ok(pattern) => handle(service, pattern, payload).await,
        Err(_) => {
            warn!(pattern, "No handler for pattern");
            RpcReply::Error(RpcError::new(
                StatusCode::NOT_FOUND,
                format!("No handler for pattern '{}'", pattern),
            ))
        }
    };

    if let RpcReply::Error(ref err) = reply {
        debug!(pattern, status = err.status, message = %err.message, "Request failed");
    }

    reply.encode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryProductRepository;
    use serde_json::json;

    fn service() -> ProductService<InMemoryProductRepository> {
        ProductService::new(InMemoryProductRepository::new())
    }

    async fn call(
        service: &ProductService<InMemoryProductRepository>,
        pattern: &str,
        payload: Value,
    ) -> RpcReply {
        let bytes = dispatch(service, pattern, payload.to_string().as_bytes()).await;
        serde_json::from_slice(&bytes).unwrap()
    }

    fn data(reply: RpcReply) -> Value {
        match reply {
            RpcReply::Data(value) => value,
            RpcReply::Error(err) => panic!("expected data, got error {:?}", err),
        }
    }

    fn error(reply: RpcReply) -> RpcError {
        match reply {
            RpcReply::Error(err) => err,
            RpcReply::Data(value) => panic!("expected error, got data {}", value),
        }
    }

    #[test]
    fn test_pattern_subjects() {
        assert_eq!(
            ProductPattern::FindAllProducts.subject("products"),
            "products.find_all_products"
        );
        assert_eq!(
            "validate_products".parse::<ProductPattern>().unwrap(),
            ProductPattern::ValidateProducts
        );
        assert_eq!(ProductPattern::subjects("catalog").len(), 6);
    }

    #[test]
    fn test_reply_envelope_shape() {
        let reply = RpcReply::Error(RpcError::new(StatusCode::NOT_FOUND, "gone"));
        let json: Value = serde_json::from_slice(&reply.encode()).unwrap();
        assert_eq!(json, json!({"error": {"status": 404, "message": "gone"}}));
    }

    #[tokio::test]
    async fn test_create_then_find_one() {
        let service = service();

        let created = data(
            call(&service, "create_product", json!({"name": "Lamp", "price": 12.5})).await,
        );
        assert_eq!(created["name"], "Lamp");
        assert_eq!(created["available"], true);

        let found = data(call(&service, "find_one_product", json!({"id": created["id"]})).await);
        assert_eq!(found["id"], created["id"]);
    }

    #[tokio::test]
    async fn test_find_all_defaults_and_meta() {
        let service = service();
        for i in 0..12 {
            call(&service, "create_product", json!({"name": format!("P{i}"), "price": 1.0})).await;
        }

        let page = data(call(&service, "find_all_products", json!({})).await);

        assert_eq!(page["data"].as_array().unwrap().len(), 10);
        assert_eq!(page["meta"], json!({"page": 1, "totalRows": 12, "lastPage": 2}));
    }

    #[tokio::test]
    async fn test_find_all_empty_payload() {
        let service = service();
        let bytes = dispatch(&service, "find_all_products", b"").await;
        let reply: RpcReply = serde_json::from_slice(&bytes).unwrap();

        let page = data(reply);
        assert_eq!(page["meta"]["lastPage"], 0);
    }

    #[tokio::test]
    async fn test_find_all_rejects_zero_limit() {
        let service = service();

        let err = error(call(&service, "find_all_products", json!({"limit": 0})).await);

        assert_eq!(err.status, 400);
    }

    #[tokio::test]
    async fn test_find_all_rejects_huge_page() {
        let service = service();
        call(&service, "create_product", json!({"name": "Bolt", "price": 0.1})).await;

        let err = error(
            call(
                &service,
                "find_all_products",
                json!({"page": 1_000_000_000_000_000_000u64, "limit": 10}),
            )
            .await,
        );
        assert_eq!(err.status, 400);

        let err = error(call(&service, "find_all_products", json!({"limit": 5000})).await);
        assert_eq!(err.status, 400);
    }

    #[tokio::test]
    async fn test_find_one_missing() {
        let service = service();

        let err = error(call(&service, "find_one_product", json!({"id": 7})).await);

        assert_eq!(err.status, 404);
        assert_eq!(err.message, "Product with ID 7 not found");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let service = service();
        call(&service, "create_product", json!({"name": "Pen", "price": 2.0})).await;

        let updated = data(
            call(&service, "update_product", json!({"id": 1, "name": "Fountain pen"})).await,
        );
        assert_eq!(updated["name"], "Fountain pen");
        assert_eq!(updated["price"], 2.0);

        let deleted = data(call(&service, "delete_product", json!({"id": 1})).await);
        assert_eq!(deleted["available"], false);

        let err = error(call(&service, "find_one_product", json!({"id": 1})).await);
        assert_eq!(err.status, 404);
    }

    #[tokio::test]
    async fn test_update_rejects_non_positive_id() {
        let service = service();

        let err = error(call(&service, "update_product", json!({"id": 0, "price": 3.0})).await);

        assert_eq!(err.status, 400);
    }

    #[tokio::test]
    async fn test_delete_missing() {
        let service = service();

        let err = error(call(&service, "delete_product", json!({"id": 5})).await);

        assert_eq!(err.status, 404);
        assert_eq!(err.message, "Product not found");
    }

    #[tokio::test]
    async fn test_validate_products_shapes() {
        let service = service();
        for name in ["A", "B"] {
            call(&service, "create_product", json!({"name": name, "price": 1.0})).await;
        }

        let found = data(call(&service, "validate_products", json!([1, 1, 2])).await);
        assert_eq!(found.as_array().unwrap().len(), 2);

        let found = data(call(&service, "validate_products", json!({"ids": [2]})).await);
        assert_eq!(found.as_array().unwrap().len(), 1);

        let err = error(call(&service, "validate_products", json!([1, 3])).await);
        assert_eq!(err.status, 400);
        assert_eq!(err.message, "One or more products not found");
    }

    #[tokio::test]
    async fn test_malformed_payload() {
        let service = service();

        let bytes = dispatch(&service, "create_product", b"{not json").await;
        let err = error(serde_json::from_slice(&bytes).unwrap());

        assert_eq!(err.status, 400);
        assert!(err.message.starts_with("Invalid payload"));
    }

    #[tokio::test]
    async fn test_unknown_pattern() {
        let service = service();

        let err = error(call(&service, "restock_product", json!({})).await);

        assert_eq!(err.status, 404);
        assert_eq!(err.message, "No handler for pattern 'restock_product'");
    }
}
