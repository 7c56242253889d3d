//! Redemption code records.
//!
//! A code lives in exactly one of two places: the available pool
//! (`CodeRecord`) or the redeemed log (`RedeemedCode`). It moves from the
//! first to the second once, when an order claims it.

use serde::{Deserialize, Serialize};

/// An unissued redemption code tied to one product by ISBN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRecord {
    /// Store-assigned, monotonically increasing identifier.
    pub id: i64,
    pub code: String,
    pub publisher_code: String,
    pub product_title: String,
    pub isbn: String,
}

/// Insert payload for a code, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewCode {
    pub code: String,
    pub publisher_code: String,
    pub product_title: String,
    pub isbn: String,
}

/// A code that has been issued to an order.
///
/// Append-only. `id` is assigned by the redeemed log and is unrelated to
/// the id the code had while available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemedCode {
    pub id: i64,
    pub code: String,
    pub publisher_code: String,
    pub product_title: String,
    pub isbn: String,
}

impl NewCode {
    pub fn new(
        code: impl Into<String>,
        publisher_code: impl Into<String>,
        product_title: impl Into<String>,
        isbn: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            publisher_code: publisher_code.into(),
            product_title: product_title.into(),
            isbn: isbn.into(),
        }
    }

    /// Attach a store-assigned id, producing an available record.
    pub fn into_available(self, id: i64) -> CodeRecord {
        CodeRecord {
            id,
            code: self.code,
            publisher_code: self.publisher_code,
            product_title: self.product_title,
            isbn: self.isbn,
        }
    }

    /// Attach a redeemed-log id, producing a redeemed record.
    pub fn into_redeemed(self, id: i64) -> RedeemedCode {
        RedeemedCode {
            id,
            code: self.code,
            publisher_code: self.publisher_code,
            product_title: self.product_title,
            isbn: self.isbn,
        }
    }
}

impl From<CodeRecord> for NewCode {
    fn from(record: CodeRecord) -> Self {
        Self {
            code: record.code,
            publisher_code: record.publisher_code,
            product_title: record.product_title,
            isbn: record.isbn,
        }
    }
}
