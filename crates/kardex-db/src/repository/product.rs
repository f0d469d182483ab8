//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Who Writes What
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products row                                                           │
//! │                                                                         │
//! │  code, name, thresholds, prices ◄── update_details()   (this repo)      │
//! │  is_active                      ◄── deactivate() / reactivate()         │
//! │  stock, average_cost_cents      ◄── StockReconciler only, via           │
//! │                                     lock() + write_balance() inside the │
//! │                                     movement transaction                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use kardex_core::validation::{validate_product_update, validate_thresholds};
use kardex_core::{InventorySummary, Product, ProductUpdate};
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let product = repo.get_by_code("CEM-42").await?;
/// let reorder = repo.low_stock(None).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        debug!(id = %id, "Getting product by ID");
        Self::fetch(&self.pool, id).await
    }

    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        debug!(code = %code, "Getting product by code");

        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE code = ?1")
            .bind(code.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Active products ordered by code.
    pub async fn list_active(&self, limit: u32, offset: u32) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE is_active = 1
            ORDER BY code
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Every product id, active or not, ordered by code.
    pub async fn all_ids(&self) -> DbResult<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>("SELECT id FROM products ORDER BY code")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    /// Case-insensitive match on code or name.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        debug!(query = %query, limit = limit, "Searching products");

        let pattern = format!("%{}%", query.trim());
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE is_active = 1 AND (code LIKE ?1 OR name LIKE ?1)
            ORDER BY code
            LIMIT ?2
            "#,
        )
        .bind(pattern)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Active products at or below a threshold.
    ///
    /// Without an explicit `threshold` each product's own `min_stock` is used.
    pub async fn low_stock(&self, threshold: Option<i64>) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE is_active = 1 AND stock <= COALESCE(?1, min_stock)
            ORDER BY stock, code
            "#,
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Warehouse-wide counts and valuation at average cost.
    pub async fn inventory_summary(&self) -> DbResult<InventorySummary> {
        let (total, active, low, out, value): (i64, i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN is_active = 1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN is_active = 1 AND stock <= min_stock THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN is_active = 1 AND stock = 0 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN is_active = 1 THEN stock * average_cost_cents ELSE 0 END), 0)
            FROM products
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(InventorySummary {
            total_products: total,
            active_products: active,
            low_stock_products: low,
            out_of_stock_products: out,
            total_value_cents: value,
        })
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Non-stock writes
    // =========================================================================

    /// Edits descriptive fields, thresholds and prices.
    ///
    /// Stock and average cost are untouched.
    pub async fn update_details(&self, id: &str, update: &ProductUpdate) -> DbResult<Product> {
        debug!(id = %id, "Updating product details");

        validate_product_update(update)?;

        let current = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        let min_stock = update.min_stock.unwrap_or(current.min_stock);
        let max_stock = update.max_stock.or(current.max_stock);
        validate_thresholds(min_stock, max_stock)?;

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = COALESCE(?2, name),
                description = COALESCE(?3, description),
                unit_of_measure = COALESCE(?4, unit_of_measure),
                min_stock = ?5,
                max_stock = ?6,
                purchase_cost_cents = COALESCE(?7, purchase_cost_cents),
                sale_price_cents = COALESCE(?8, sale_price_cents),
                updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(update.name.as_deref().map(str::trim))
        .bind(update.description.as_deref())
        .bind(update.unit_of_measure.as_deref().map(str::trim))
        .bind(min_stock)
        .bind(max_stock)
        .bind(update.purchase_cost_cents)
        .bind(update.sale_price_cents)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Soft-deletes a product. Its ledger stays readable.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        self.set_active(id, false).await
    }

    pub async fn reactivate(&self, id: &str) -> DbResult<()> {
        self.set_active(id, true).await
    }

    async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        debug!(id = %id, active = active, "Setting product active flag");

        let result =
            sqlx::query("UPDATE products SET is_active = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(id)
                .bind(active)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    // =========================================================================
    // Transaction-scoped helpers (used by the reconciler)
    // =========================================================================

    /// Reads a product through any executor: the pool or an open transaction.
    pub(crate) async fn fetch<'e, E>(executor: E, id: &str) -> DbResult<Option<Product>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(product)
    }

    /// Takes the write lock for `id` inside the caller's transaction.
    ///
    /// Must be the first write of the transaction: SQLite applies the busy
    /// timeout while acquiring it, so a contended lock surfaces as
    /// `DbError::Busy` after `lock_timeout`. Returns `false` when the product
    /// does not exist.
    pub(crate) async fn lock(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
        let result = sqlx::query("UPDATE products SET updated_at = updated_at WHERE id = ?1")
            .bind(id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Inserts a product row (stock starts at zero).
    pub(crate) async fn insert(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
        debug!(code = %product.code, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, code, name, description, unit_of_measure, stock,
                min_stock, max_stock, purchase_cost_cents, average_cost_cents,
                sale_price_cents, is_active, created_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.unit_of_measure)
        .bind(product.stock)
        .bind(product.min_stock)
        .bind(product.max_stock)
        .bind(product.purchase_cost_cents)
        .bind(product.average_cost_cents)
        .bind(product.sale_price_cents)
        .bind(product.is_active)
        .bind(&product.created_by)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: product.code.clone(),
            },
            other => other,
        })?;

        Ok(())
    }

    /// Writes a new balance and average cost, guarded by the balance the
    /// movement was planned against.
    ///
    /// Returns `false` if the stock changed underneath the caller.
    pub(crate) async fn write_balance(
        conn: &mut SqliteConnection,
        id: &str,
        expected_stock: i64,
        new_stock: i64,
        new_average_cost_cents: i64,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products SET
                stock = ?3,
                average_cost_cents = ?4,
                updated_at = ?5
            WHERE id = ?1 AND stock = ?2
            "#,
        )
        .bind(id)
        .bind(expected_stock)
        .bind(new_stock)
        .bind(new_average_cost_cents)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, LedgerError};
    use kardex_core::{MovementKind, MovementRequest, NewProduct};

    async fn seeded() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let reconciler = db.reconciler();
        for (code, name, stock) in [
            ("CEM-42", "Cemento Portland 42.5kg", 50),
            ("CEM-25", "Cemento Portland 25kg", 0),
            ("FIE-38", "Fierro corrugado 3/8\"", 200),
        ] {
            reconciler
                .create_product(
                    NewProduct::new(code, name).purchase_cost(1_000).initial_stock(stock),
                    "tester",
                )
                .await
                .unwrap();
        }
        db
    }

    #[tokio::test]
    async fn test_search_matches_code_and_name() {
        let db = seeded().await;
        let repo = db.products();

        let cement = repo.search("cemento", 10).await.unwrap();
        assert_eq!(cement.len(), 2);

        let by_code = repo.search("FIE", 10).await.unwrap();
        assert_eq!(by_code.len(), 1);
        assert_eq!(by_code[0].code, "FIE-38");

        assert_eq!(repo.search("CEM", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_deactivated_product_rejects_movements() {
        let db = seeded().await;
        let repo = db.products();
        let product = repo.get_by_code("CEM-42").await.unwrap().unwrap();

        repo.deactivate(&product.id).await.unwrap();
        assert_eq!(repo.list_active(50, 0).await.unwrap().len(), 2);
        assert!(repo.search("CEM-42", 10).await.unwrap().is_empty());

        let req = MovementRequest::new(&product.id, MovementKind::Exit, 1)
            .document_ref("GS-1")
            .actor("tester");
        let err = db.reconciler().apply_movement(req.clone()).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));

        repo.reactivate(&product.id).await.unwrap();
        let entry = db.reconciler().apply_movement(req).await.unwrap();
        assert_eq!(entry.balance_after, 49);
    }

    #[tokio::test]
    async fn test_unknown_product_writes_are_not_found() {
        let db = seeded().await;
        let err = db.products().deactivate("missing").await.unwrap_err();
        assert!(matches!(err, crate::DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_code_is_rejected() {
        let db = seeded().await;
        let err = db
            .reconciler()
            .create_product(NewProduct::new("CEM-42", "Otro cemento"), "tester")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
        assert_eq!(db.products().count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_inventory_summary_counts() {
        let db = seeded().await;
        let summary = db.products().inventory_summary().await.unwrap();

        assert_eq!(summary.total_products, 3);
        assert_eq!(summary.active_products, 3);
        assert_eq!(summary.out_of_stock_products, 1);
        assert_eq!(summary.total_value_cents, 250 * 1_000);
    }
}
