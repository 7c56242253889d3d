//! SQLite CodeStore implementation.

use async_trait::async_trait;
use sea_query::{Expr, Order, Query, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::model::{CodeRecord, NewCode, RedeemedCode};
use crate::storage::schema::{
    Codes, ProcessedOrders, RedeemedCodes, CREATE_CODES_ISBN_INDEX, CREATE_CODES_TABLE,
    CREATE_PROCESSED_ORDERS_TABLE, CREATE_REDEEMED_CODES_TABLE,
};
use crate::storage::{CodeStore, OrderClaim, Result, StorageError};

/// SQLite implementation of CodeStore.
pub struct SqliteCodeStore {
    pool: SqlitePool,
}

impl SqliteCodeStore {
    /// Create a new SQLite code store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the database schema.
    pub async fn init(&self) -> Result<()> {
        for statement in [
            CREATE_CODES_TABLE,
            CREATE_CODES_ISBN_INDEX,
            CREATE_REDEEMED_CODES_TABLE,
            CREATE_PROCESSED_ORDERS_TABLE,
        ] {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    fn find_available_query(isbn: &str) -> String {
        Query::select()
            .columns([
                Codes::Id,
                Codes::Code,
                Codes::PublisherCode,
                Codes::ProductTitle,
                Codes::Isbn,
            ])
            .from(Codes::Table)
            .and_where(Expr::col(Codes::Isbn).eq(isbn))
            .order_by(Codes::Id, Order::Asc)
            .limit(1)
            .to_string(SqliteQueryBuilder)
    }

    async fn find_in(conn: &mut SqliteConnection, isbn: &str) -> Result<Option<CodeRecord>> {
        let query = Self::find_available_query(isbn);
        let row = sqlx::query(&query).fetch_optional(&mut *conn).await?;
        Ok(row.as_ref().map(code_from_row))
    }

    async fn remove_in(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        let query = Query::delete()
            .from_table(Codes::Table)
            .and_where(Expr::col(Codes::Id).eq(id))
            .to_string(SqliteQueryBuilder);

        let result = sqlx::query(&query).execute(&mut *conn).await?;
        Ok(result.rows_affected() == 1)
    }

    async fn append_in(conn: &mut SqliteConnection, code: NewCode) -> Result<RedeemedCode> {
        let query = Query::insert()
            .into_table(RedeemedCodes::Table)
            .columns([
                RedeemedCodes::Code,
                RedeemedCodes::PublisherCode,
                RedeemedCodes::ProductTitle,
                RedeemedCodes::Isbn,
            ])
            .values_panic([
                code.code.clone().into(),
                code.publisher_code.clone().into(),
                code.product_title.clone().into(),
                code.isbn.clone().into(),
            ])
            .to_string(SqliteQueryBuilder);

        let result = sqlx::query(&query).execute(&mut *conn).await?;
        Ok(code.into_redeemed(result.last_insert_rowid()))
    }

    /// Find, remove and log one code within an already-started transaction.
    async fn claim_in(conn: &mut SqliteConnection, isbn: &str) -> Result<Option<RedeemedCode>> {
        let Some(record) = Self::find_in(conn, isbn).await? else {
            return Ok(None);
        };

        if !Self::remove_in(conn, record.id).await? {
            return Err(StorageError::Unavailable(format!(
                "code {} disappeared during claim",
                record.id
            )));
        }

        let redeemed = Self::append_in(conn, record.into()).await?;
        Ok(Some(redeemed))
    }

    async fn order_issued_in(conn: &mut SqliteConnection, order_id: i64) -> Result<bool> {
        let query = Query::select()
            .column(ProcessedOrders::OrderId)
            .from(ProcessedOrders::Table)
            .and_where(Expr::col(ProcessedOrders::OrderId).eq(order_id))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&mut *conn).await?;
        Ok(row.is_some())
    }

    async fn claim_for_order_in(
        conn: &mut SqliteConnection,
        order_id: i64,
        isbn: &str,
    ) -> Result<OrderClaim> {
        if Self::order_issued_in(conn, order_id).await? {
            return Ok(OrderClaim::AlreadyIssued);
        }

        let Some(redeemed) = Self::claim_in(conn, isbn).await? else {
            return Ok(OrderClaim::NoStock);
        };

        let query = Query::insert()
            .into_table(ProcessedOrders::Table)
            .columns([ProcessedOrders::OrderId, ProcessedOrders::RedeemedId])
            .values_panic([order_id.into(), redeemed.id.into()])
            .to_string(SqliteQueryBuilder);
        sqlx::query(&query).execute(&mut *conn).await?;

        Ok(OrderClaim::Claimed(redeemed))
    }

    async fn end_transaction(conn: &mut SqliteConnection, commit: bool) -> Result<()> {
        let statement = if commit { "COMMIT" } else { "ROLLBACK" };
        sqlx::query(statement).execute(&mut *conn).await?;
        Ok(())
    }
}

/// SQLite integers are signed.
fn order_key(order_id: u64) -> Result<i64> {
    i64::try_from(order_id).map_err(|_| StorageError::OrderIdOutOfRange(order_id))
}

fn code_from_row(row: &SqliteRow) -> CodeRecord {
    CodeRecord {
        id: row.get("id"),
        code: row.get("code"),
        publisher_code: row.get("publisher_code"),
        product_title: row.get("product_title"),
        isbn: row.get("isbn"),
    }
}

fn redeemed_from_row(row: &SqliteRow) -> RedeemedCode {
    RedeemedCode {
        id: row.get("id"),
        code: row.get("code"),
        publisher_code: row.get("publisher_code"),
        product_title: row.get("product_title"),
        isbn: row.get("isbn"),
    }
}

#[async_trait]
impl CodeStore for SqliteCodeStore {
    async fn find_available(&self, isbn: &str) -> Result<Option<CodeRecord>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_in(&mut conn, isbn).await
    }

    async fn remove(&self, id: i64) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Self::remove_in(&mut conn, id).await
    }

    async fn append_redeemed(&self, code: NewCode) -> Result<RedeemedCode> {
        let mut conn = self.pool.acquire().await?;
        Self::append_in(&mut conn, code).await
    }

    async fn count_available(&self) -> Result<u64> {
        let query = Query::select()
            .expr(Expr::col(Codes::Id).count())
            .from(Codes::Table)
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_one(&self.pool).await?;
        let count: i64 = row.get(0);
        Ok(count.max(0) as u64)
    }

    async fn claim(&self, isbn: &str) -> Result<Option<RedeemedCode>> {
        // BEGIN IMMEDIATE takes the write lock before the read, so a second
        // claimer cannot observe the row this one is about to remove.
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result = Self::claim_in(&mut conn, isbn).await;

        match result {
            Ok(Some(redeemed)) => {
                Self::end_transaction(&mut conn, true).await?;
                debug!(isbn, code_id = redeemed.id, "claimed code");
                Ok(Some(redeemed))
            }
            Ok(None) => {
                Self::end_transaction(&mut conn, false).await?;
                Ok(None)
            }
            Err(e) => {
                let _ = Self::end_transaction(&mut conn, false).await;
                Err(e)
            }
        }
    }

    async fn claim_for_order(&self, order_id: u64, isbn: &str) -> Result<OrderClaim> {
        let order_id = order_key(order_id)?;
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        match Self::claim_for_order_in(&mut conn, order_id, isbn).await {
            Ok(OrderClaim::Claimed(redeemed)) => {
                Self::end_transaction(&mut conn, true).await?;
                debug!(order_id, isbn, code_id = redeemed.id, "claimed code for order");
                Ok(OrderClaim::Claimed(redeemed))
            }
            Ok(other) => {
                Self::end_transaction(&mut conn, false).await?;
                Ok(other)
            }
            Err(e) => {
                let _ = Self::end_transaction(&mut conn, false).await;
                Err(e)
            }
        }
    }

    async fn order_issued(&self, order_id: u64) -> Result<bool> {
        let order_id = order_key(order_id)?;
        let mut conn = self.pool.acquire().await?;
        Self::order_issued_in(&mut conn, order_id).await
    }

    async fn insert(&self, code: NewCode) -> Result<CodeRecord> {
        let query = Query::insert()
            .into_table(Codes::Table)
            .columns([
                Codes::Code,
                Codes::PublisherCode,
                Codes::ProductTitle,
                Codes::Isbn,
            ])
            .values_panic([
                code.code.clone().into(),
                code.publisher_code.clone().into(),
                code.product_title.clone().into(),
                code.isbn.clone().into(),
            ])
            .to_string(SqliteQueryBuilder);

        let result = sqlx::query(&query).execute(&self.pool).await?;
        Ok(code.into_available(result.last_insert_rowid()))
    }

    async fn insert_many(&self, codes: Vec<NewCode>) -> Result<u64> {
        if codes.is_empty() {
            return Ok(0);
        }

        // InsertStatement is !Send; render it before the first await.
        let query = {
            let mut insert = Query::insert();
            insert.into_table(Codes::Table).columns([
                Codes::Code,
                Codes::PublisherCode,
                Codes::ProductTitle,
                Codes::Isbn,
            ]);
            for code in codes {
                insert.values_panic([
                    code.code.into(),
                    code.publisher_code.into(),
                    code.product_title.into(),
                    code.isbn.into(),
                ]);
            }
            insert.to_string(SqliteQueryBuilder)
        };

        let result = sqlx::query(&query).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn list_available(&self) -> Result<Vec<CodeRecord>> {
        let query = Query::select()
            .columns([
                Codes::Id,
                Codes::Code,
                Codes::PublisherCode,
                Codes::ProductTitle,
                Codes::Isbn,
            ])
            .from(Codes::Table)
            .order_by(Codes::Id, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(code_from_row).collect())
    }

    async fn list_redeemed(&self) -> Result<Vec<RedeemedCode>> {
        let query = Query::select()
            .columns([
                RedeemedCodes::Id,
                RedeemedCodes::Code,
                RedeemedCodes::PublisherCode,
                RedeemedCodes::ProductTitle,
                RedeemedCodes::Isbn,
            ])
            .from(RedeemedCodes::Table)
            .order_by(RedeemedCodes::Id, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(redeemed_from_row).collect())
    }

    async fn delete_all_available(&self) -> Result<u64> {
        let query = Query::delete()
            .from_table(Codes::Table)
            .to_string(SqliteQueryBuilder);

        let result = sqlx::query(&query).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn delete_available(&self, id: i64) -> Result<bool> {
        self.remove(id).await
    }
}
