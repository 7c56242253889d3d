//! Mock CodeStore implementation for testing.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::model::{CodeRecord, NewCode, RedeemedCode};
use crate::storage::{CodeStore, OrderClaim, Result, StorageError};

#[derive(Default)]
struct Tables {
    available: Vec<CodeRecord>,
    redeemed: Vec<RedeemedCode>,
    /// Order id to the redeemed id it was issued.
    issued_orders: HashMap<u64, i64>,
    last_available_id: i64,
    last_redeemed_id: i64,
}

impl Tables {
    fn insert(&mut self, code: NewCode) -> CodeRecord {
        self.last_available_id += 1;
        let record = code.into_available(self.last_available_id);
        self.available.push(record.clone());
        record
    }

    fn append_redeemed(&mut self, code: NewCode) -> RedeemedCode {
        self.last_redeemed_id += 1;
        let record = code.into_redeemed(self.last_redeemed_id);
        self.redeemed.push(record.clone());
        record
    }

    fn position(&self, isbn: &str) -> Option<usize> {
        // Ids are pushed in increasing order, so the first match is the lowest id.
        self.available.iter().position(|c| c.isbn == isbn)
    }

    fn claim(&mut self, isbn: &str) -> Option<RedeemedCode> {
        let index = self.position(isbn)?;
        let record = self.available.remove(index);
        Some(self.append_redeemed(record.into()))
    }

    fn remove(&mut self, id: i64) -> bool {
        let before = self.available.len();
        self.available.retain(|c| c.id != id);
        self.available.len() != before
    }
}

/// Mock code store that keeps both tables in memory.
///
/// A single mutex guards both tables, so `claim` is atomic.
#[derive(Default)]
pub struct MockCodeStore {
    tables: Mutex<Tables>,
    fail_on_claim: RwLock<bool>,
    fail_on_count: RwLock<bool>,
}

impl MockCodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with available codes.
    pub async fn with_codes(codes: Vec<NewCode>) -> Self {
        let store = Self::new();
        {
            let mut tables = store.tables.lock().await;
            for code in codes {
                tables.insert(code);
            }
        }
        store
    }

    pub async fn set_fail_on_claim(&self, fail: bool) {
        *self.fail_on_claim.write().await = fail;
    }

    pub async fn set_fail_on_count(&self, fail: bool) {
        *self.fail_on_count.write().await = fail;
    }
}

#[async_trait]
impl CodeStore for MockCodeStore {
    async fn find_available(&self, isbn: &str) -> Result<Option<CodeRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables.position(isbn).map(|i| tables.available[i].clone()))
    }

    async fn remove(&self, id: i64) -> Result<bool> {
        Ok(self.tables.lock().await.remove(id))
    }

    async fn append_redeemed(&self, code: NewCode) -> Result<RedeemedCode> {
        Ok(self.tables.lock().await.append_redeemed(code))
    }

    async fn count_available(&self) -> Result<u64> {
        if *self.fail_on_count.read().await {
            return Err(StorageError::Unavailable("count failed".to_string()));
        }
        Ok(self.tables.lock().await.available.len() as u64)
    }

    async fn claim(&self, isbn: &str) -> Result<Option<RedeemedCode>> {
        if *self.fail_on_claim.read().await {
            return Err(StorageError::Unavailable("claim failed".to_string()));
        }
        Ok(self.tables.lock().await.claim(isbn))
    }

    async fn claim_for_order(&self, order_id: u64, isbn: &str) -> Result<OrderClaim> {
        if *self.fail_on_claim.read().await {
            return Err(StorageError::Unavailable("claim failed".to_string()));
        }
        let mut tables = self.tables.lock().await;
        if tables.issued_orders.contains_key(&order_id) {
            return Ok(OrderClaim::AlreadyIssued);
        }
        match tables.claim(isbn) {
            Some(redeemed) => {
                tables.issued_orders.insert(order_id, redeemed.id);
                Ok(OrderClaim::Claimed(redeemed))
            }
            None => Ok(OrderClaim::NoStock),
        }
    }

    async fn order_issued(&self, order_id: u64) -> Result<bool> {
        Ok(self.tables.lock().await.issued_orders.contains_key(&order_id))
    }

    async fn insert(&self, code: NewCode) -> Result<CodeRecord> {
        Ok(self.tables.lock().await.insert(code))
    }

    async fn insert_many(&self, codes: Vec<NewCode>) -> Result<u64> {
        let mut tables = self.tables.lock().await;
        let count = codes.len() as u64;
        for code in codes {
            tables.insert(code);
        }
        Ok(count)
    }

    async fn list_available(&self) -> Result<Vec<CodeRecord>> {
        Ok(self.tables.lock().await.available.clone())
    }

    async fn list_redeemed(&self) -> Result<Vec<RedeemedCode>> {
        Ok(self.tables.lock().await.redeemed.clone())
    }

    async fn delete_all_available(&self) -> Result<u64> {
        let mut tables = self.tables.lock().await;
        let count = tables.available.len() as u64;
        tables.available.clear();
        Ok(count)
    }

    async fn delete_available(&self, id: i64) -> Result<bool> {
        Ok(self.tables.lock().await.remove(id))
    }
}
