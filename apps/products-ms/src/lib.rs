//! Products microservice
//!
//! Serves the product catalog over NATS request/reply. Each message pattern
//! (`create_product`, `find_all_products`, ...) is a subject under a common
//! prefix; replies go to the request's reply inbox. A small HTTP listener
//! exposes liveness and readiness probes.

pub mod config;
pub mod health;
pub mod messaging;
pub mod server;
pub mod shutdown;
