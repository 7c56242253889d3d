//! Order-completion workflow.
//!
//! The commerce platform owns orders; this module only reads them. When an
//! order completes, `CodeIssuer` walks its line items and issues at most
//! one code for the whole order.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod issuer;
mod source;

pub use issuer::CodeIssuer;
pub use source::{HttpOrderSource, InMemoryOrderSource};

use crate::model::RedeemedCode;

/// Order status the commerce platform reports once an order is fulfilled.
pub const ORDER_STATUS_COMPLETED: &str = "completed";

/// Category whose products carry redemption codes.
pub const DEFAULT_QUALIFYING_CATEGORY: &str = "e-learning";

/// Errors from reading orders.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Commerce API returned status {status} for order {order_id}")]
    UnexpectedStatus { order_id: u64, status: u16 },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// A product as seen by the commerce platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    /// Stock-keeping identifier. For e-learning products this is the ISBN.
    pub sku: String,
    /// Category slugs.
    #[serde(default)]
    pub categories: Vec<String>,
}

impl Product {
    pub fn in_category(&self, slug: &str) -> bool {
        self.categories.iter().any(|c| c == slug)
    }
}

/// One order line. `product` is `None` when the product has since been deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub name: String,
    pub product: Option<Product>,
}

/// An order as read from the commerce platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    /// Platform status slug; codes are only issued for `completed` orders.
    #[serde(default)]
    pub status: String,
    pub billing_email: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
}

impl Order {
    pub fn is_completed(&self) -> bool {
        self.status == ORDER_STATUS_COMPLETED
    }
}

/// Read-only access to the commerce platform's orders.
#[async_trait]
pub trait OrderSource: Send + Sync {
    /// Fetch an order. Returns `None` when the order does not exist.
    async fn fetch_order(&self, order_id: u64) -> Result<Option<Order>, OrderError>;
}

/// What an order completion produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "code", rename_all = "snake_case")]
pub enum OrderOutcome {
    Issued(RedeemedCode),
    NothingIssued,
}

/// Capability invoked by the host when an order reaches "completed".
#[async_trait]
pub trait OrderCompletionHandler: Send + Sync {
    /// Handle one completed order.
    ///
    /// Only failures to read the order are returned; a missing code is
    /// `NothingIssued`, never an error.
    async fn on_order_completed(&self, order_id: u64) -> Result<OrderOutcome, OrderError>;
}

/// Commerce platform configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommerceConfig {
    /// Base URL of the commerce API; orders are read from `{endpoint}/orders/{id}`.
    /// Empty means no commerce API: no order is ever found.
    pub endpoint: String,
    /// Optional bearer token.
    pub api_key: Option<String>,
    /// Bearer token the commerce platform presents on the order-completed
    /// hook. Unset rejects every hook call.
    pub hook_token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Category slug that qualifies a product for a code.
    pub qualifying_category: String,
}

impl Default for CommerceConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: None,
            hook_token: None,
            timeout_secs: 30,
            qualifying_category: DEFAULT_QUALIFYING_CATEGORY.to_string(),
        }
    }
}
