//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.

use sea_query::Iden;

/// Available codes table schema.
#[derive(Iden)]
pub enum Codes {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "code"]
    Code,
    #[iden = "publisher_code"]
    PublisherCode,
    #[iden = "product_title"]
    ProductTitle,
    #[iden = "isbn"]
    Isbn,
}

/// Redeemed codes table schema. Same shape as `Codes`, separate id space.
#[derive(Iden)]
pub enum RedeemedCodes {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "code"]
    Code,
    #[iden = "publisher_code"]
    PublisherCode,
    #[iden = "product_title"]
    ProductTitle,
    #[iden = "isbn"]
    Isbn,
}

/// Orders that have been issued a code. At most one row per order.
#[derive(Iden)]
pub enum ProcessedOrders {
    Table,
    #[iden = "order_id"]
    OrderId,
    #[iden = "redeemed_id"]
    RedeemedId,
}

/// Settings table schema.
#[derive(Iden)]
pub enum Settings {
    Table,
    #[iden = "key"]
    Key,
    #[iden = "value"]
    Value,
}

/// SQL for creating the available codes table.
///
/// AUTOINCREMENT keeps ids monotonic even after the pool is cleared.
pub const CREATE_CODES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS codes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL,
    publisher_code TEXT NOT NULL,
    product_title TEXT NOT NULL,
    isbn TEXT NOT NULL
)
"#;

/// SQL for the ISBN lookup index used by claims.
pub const CREATE_CODES_ISBN_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_codes_isbn ON codes(isbn, id)";

/// SQL for creating the redeemed codes table.
pub const CREATE_REDEEMED_CODES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS redeemed_codes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL,
    publisher_code TEXT NOT NULL,
    product_title TEXT NOT NULL,
    isbn TEXT NOT NULL
)
"#;

/// SQL for creating the processed orders table.
pub const CREATE_PROCESSED_ORDERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS processed_orders (
    order_id INTEGER PRIMARY KEY,
    redeemed_id INTEGER NOT NULL
)
"#;

/// SQL for creating the settings table.
pub const CREATE_SETTINGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
"#;
