//! OrderSource implementations.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tokio::sync::RwLock;
use tracing::debug;

use super::{CommerceConfig, Order, OrderError, OrderSource};

/// Orders held in memory. Used by tests and embedding hosts that push
/// orders in directly.
#[derive(Default)]
pub struct InMemoryOrderSource {
    orders: RwLock<HashMap<u64, Order>>,
}

impl InMemoryOrderSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, order: Order) {
        self.orders.write().await.insert(order.id, order);
    }
}

#[async_trait]
impl OrderSource for InMemoryOrderSource {
    async fn fetch_order(&self, order_id: u64) -> Result<Option<Order>, OrderError> {
        Ok(self.orders.read().await.get(&order_id).cloned())
    }
}

/// Reads orders from the commerce platform's HTTP API.
pub struct HttpOrderSource {
    client: Client,
    config: CommerceConfig,
}

impl HttpOrderSource {
    pub fn new(config: CommerceConfig) -> Result<Self, OrderError> {
        if config.endpoint.is_empty() {
            return Err(OrderError::Config(
                "commerce endpoint not configured".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    fn order_url(&self, order_id: u64) -> String {
        format!(
            "{}/orders/{}",
            self.config.endpoint.trim_end_matches('/'),
            order_id
        )
    }
}

#[async_trait]
impl OrderSource for HttpOrderSource {
    async fn fetch_order(&self, order_id: u64) -> Result<Option<Order>, OrderError> {
        let mut request = self.client.get(self.order_url(order_id));
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let order = response.json::<Order>().await?;
                debug!(order_id, items = order.items.len(), "fetched order");
                Ok(Some(order))
            }
            status => Err(OrderError::UnexpectedStatus {
                order_id,
                status: status.as_u16(),
            }),
        }
    }
}
