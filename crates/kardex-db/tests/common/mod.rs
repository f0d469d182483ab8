//! Shared fixtures for the scenario tests.

#![allow(dead_code)]

use kardex_core::{MovementKind, MovementRequest, NewProduct, Product};
use kardex_db::{Database, DbConfig};

pub const ACTOR: &str = "almacen@gde";

/// Fresh, migrated in-memory database.
pub async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

/// Creates a product with no opening stock and the given purchase cost.
pub async fn product(db: &Database, code: &str, cost_cents: i64) -> Product {
    db.reconciler()
        .create_product(
            NewProduct::new(code, format!("Producto {code}")).purchase_cost(cost_cents),
            ACTOR,
        )
        .await
        .expect("create product")
        .product
}

/// Creates a product that starts with `stock` units at `cost_cents`.
pub async fn stocked_product(db: &Database, code: &str, stock: i64, cost_cents: i64) -> Product {
    db.reconciler()
        .create_product(
            NewProduct::new(code, format!("Producto {code}"))
                .purchase_cost(cost_cents)
                .initial_stock(stock),
            ACTOR,
        )
        .await
        .expect("create stocked product")
        .product
}

pub fn entry(product_id: &str, quantity: i64, unit_cost_cents: i64) -> MovementRequest {
    MovementRequest::new(product_id, MovementKind::Entry, quantity)
        .unit_cost(unit_cost_cents)
        .document_ref("GR-TEST")
        .actor(ACTOR)
}

pub fn exit(product_id: &str, quantity: i64) -> MovementRequest {
    MovementRequest::new(product_id, MovementKind::Exit, quantity)
        .document_ref("GS-TEST")
        .actor(ACTOR)
}

/// Asserts stock equals the signed ledger total and the chain is intact.
pub async fn assert_consistent(db: &Database, product_id: &str) {
    let audit = db.ledger().audit(product_id).await.expect("audit");
    assert!(audit.is_consistent(), "inconsistent ledger: {audit:?}");
    assert_eq!(
        db.ledger().signed_total(product_id).await.expect("signed total"),
        audit.product_balance
    );
}
