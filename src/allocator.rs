//! Code allocation.
//!
//! Claims one available code for an ISBN and records it as redeemed.

use std::sync::Arc;

use tracing::{debug, info};

use crate::model::RedeemedCode;
use crate::storage::{CodeStore, OrderClaim, StorageError};

/// Errors from a single allocation.
#[derive(Debug, thiserror::Error)]
pub enum AllocateError {
    /// No available code for the ISBN. Callers treat this as "nothing to send".
    #[error("No available code for ISBN {isbn}")]
    NotFound { isbn: String },

    /// The order was issued a code earlier; nothing changed.
    #[error("Order {order_id} already received a code")]
    AlreadyIssued { order_id: u64 },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Moves codes from the available pool to the redeemed log.
///
/// Isolation comes from `CodeStore::claim`: the store performs the find,
/// remove and append as one unit, so concurrent orders for the same ISBN
/// never receive the same code. Among several matches the lowest id wins.
#[derive(Clone)]
pub struct Allocator {
    store: Arc<dyn CodeStore>,
}

impl Allocator {
    pub fn new(store: Arc<dyn CodeStore>) -> Self {
        Self { store }
    }

    /// Claim one code for `isbn`.
    ///
    /// On `NotFound` neither table has changed.
    pub async fn allocate(&self, isbn: &str) -> Result<RedeemedCode, AllocateError> {
        match self.store.claim(isbn).await? {
            Some(redeemed) => {
                info!(isbn, code_id = redeemed.id, "allocated code");
                Ok(redeemed)
            }
            None => {
                debug!(isbn, "no available code");
                Err(AllocateError::NotFound {
                    isbn: isbn.to_string(),
                })
            }
        }
    }

    /// Claim one code for `isbn` on behalf of `order_id`.
    ///
    /// A second call for the same order yields `AlreadyIssued`, whatever the
    /// ISBN, so replayed completions cannot drain the pool.
    pub async fn allocate_for_order(
        &self,
        order_id: u64,
        isbn: &str,
    ) -> Result<RedeemedCode, AllocateError> {
        match self.store.claim_for_order(order_id, isbn).await? {
            OrderClaim::Claimed(redeemed) => {
                info!(order_id, isbn, code_id = redeemed.id, "allocated code");
                Ok(redeemed)
            }
            OrderClaim::NoStock => {
                debug!(order_id, isbn, "no available code");
                Err(AllocateError::NotFound {
                    isbn: isbn.to_string(),
                })
            }
            OrderClaim::AlreadyIssued => Err(AllocateError::AlreadyIssued { order_id }),
        }
    }

    /// Whether `order_id` has already been issued a code.
    pub async fn order_issued(&self, order_id: u64) -> Result<bool, StorageError> {
        self.store.order_issued(order_id).await
    }

    /// Number of codes left in the pool, across all ISBNs.
    pub async fn remaining(&self) -> Result<u64, StorageError> {
        self.store.count_available().await
    }
}
