//! Stock movements end to end: costing, rejections, chain and reports.

mod common;

use chrono::{Duration, Utc};
use common::{assert_consistent, entry, exit, memory_db, product, stocked_product, ACTOR};
use kardex_core::{LedgerFilter, MovementKind, ProductUpdate};
use kardex_db::LedgerError;

#[tokio::test]
async fn weighted_average_walkthrough() {
    let db = memory_db().await;
    let p = product(&db, "CEM-42", 0).await;
    let reconciler = db.reconciler();

    let first = reconciler.apply_movement(entry(&p.id, 10, 100)).await.unwrap();
    assert_eq!((first.balance_after, first.average_cost_cents), (10, 100));

    let second = reconciler.apply_movement(entry(&p.id, 10, 200)).await.unwrap();
    assert_eq!((second.balance_after, second.average_cost_cents), (20, 150));

    let third = reconciler.apply_movement(exit(&p.id, 5)).await.unwrap();
    assert_eq!((third.balance_after, third.average_cost_cents), (15, 150));
    assert_eq!(third.unit_cost_cents, 150);
    assert_eq!(third.total_value_cents, 750);

    let balance = reconciler.get_balance(&p.id).await.unwrap();
    assert_eq!(balance.balance, 15);
    assert_eq!(balance.average_cost_cents, 150);
    assert_eq!(balance.inventory_value_cents, 15 * 150);

    assert_consistent(&db, &p.id).await;
}

#[tokio::test]
async fn average_rounds_to_nearest_cent() {
    let db = memory_db().await;
    let p = product(&db, "CLA-3", 0).await;
    let reconciler = db.reconciler();

    reconciler.apply_movement(entry(&p.id, 2, 100)).await.unwrap();
    // (2*100 + 1*101) / 3 = 100.33 → 100
    let e = reconciler.apply_movement(entry(&p.id, 1, 101)).await.unwrap();
    assert_eq!(e.average_cost_cents, 100);
    // (3*100 + 1*102) / 4 = 100.5 → 101
    let e = reconciler.apply_movement(entry(&p.id, 1, 102)).await.unwrap();
    assert_eq!(e.average_cost_cents, 101);
}

#[tokio::test]
async fn entry_without_cost_keeps_average() {
    let db = memory_db().await;
    let p = stocked_product(&db, "ARE-GR", 10, 5_500).await;

    let req = kardex_core::MovementRequest::new(&p.id, MovementKind::Entry, 5)
        .document_ref("DEVOLUCION")
        .actor(ACTOR);
    let e = db.reconciler().apply_movement(req).await.unwrap();

    assert_eq!(e.unit_cost_cents, 5_500);
    assert_eq!(e.average_cost_cents, 5_500);
    assert_eq!(e.balance_after, 15);
}

#[tokio::test]
async fn insufficient_stock_leaves_no_trace() {
    let db = memory_db().await;
    let p = stocked_product(&db, "FIE-38", 5, 2_550).await;
    let reconciler = db.reconciler();

    let err = reconciler.apply_movement(exit(&p.id, 10)).await.unwrap_err();
    match err {
        LedgerError::InsufficientStock {
            product_code,
            available,
            requested,
        } => {
            assert_eq!(product_code, "FIE-38");
            assert_eq!(available, 5);
            assert_eq!(requested, 10);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    assert_eq!(reconciler.get_balance(&p.id).await.unwrap().balance, 5);
    let ledger = reconciler.get_ledger(&p.id, &LedgerFilter::default()).await.unwrap();
    assert_eq!(ledger.len(), 1, "only the opening entry");
    assert_consistent(&db, &p.id).await;
}

#[tokio::test]
async fn exit_of_whole_balance_reaches_zero() {
    let db = memory_db().await;
    let p = stocked_product(&db, "PIE-CH", 7, 6_800).await;

    let e = db.reconciler().apply_movement(exit(&p.id, 7)).await.unwrap();
    assert_eq!(e.balance_after, 0);

    let product = db.products().get_by_id(&p.id).await.unwrap().unwrap();
    assert!(product.is_out_of_stock());
    assert_eq!(product.average_cost_cents, 6_800);
}

#[tokio::test]
async fn ledger_filters_and_ordering() {
    let db = memory_db().await;
    let p = product(&db, "TUB-PVC4", 2_390).await;
    let reconciler = db.reconciler();

    reconciler.apply_movement(entry(&p.id, 20, 2_390)).await.unwrap();
    reconciler.apply_movement(exit(&p.id, 3)).await.unwrap();
    reconciler.apply_movement(exit(&p.id, 4)).await.unwrap();
    reconciler.apply_movement(entry(&p.id, 5, 2_400)).await.unwrap();

    let all = reconciler.get_ledger(&p.id, &LedgerFilter::default()).await.unwrap();
    let sequences: Vec<i64> = all.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3, 4]);

    let newest = reconciler
        .get_ledger(&p.id, &LedgerFilter::default().newest_first().limit(2))
        .await
        .unwrap();
    let sequences: Vec<i64> = newest.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![4, 3]);

    let exits = reconciler
        .get_ledger(&p.id, &LedgerFilter::default().kind(MovementKind::Exit))
        .await
        .unwrap();
    assert_eq!(exits.len(), 2);
    assert!(exits.iter().all(|e| e.kind == MovementKind::Exit));

    let page = reconciler
        .get_ledger(&p.id, &LedgerFilter::default().offset(1).limit(2))
        .await
        .unwrap();
    assert_eq!(page.iter().map(|e| e.sequence).collect::<Vec<_>>(), vec![2, 3]);

    let receipts = reconciler
        .get_ledger(&p.id, &LedgerFilter::default().document_ref("GR-TEST"))
        .await
        .unwrap();
    assert_eq!(receipts.len(), 2);
}

#[tokio::test]
async fn unknown_product_ledger_is_invalid_input() {
    let db = memory_db().await;
    let err = db
        .reconciler()
        .get_ledger("missing", &LedgerFilter::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidInput(_)));
}

#[tokio::test]
async fn summary_and_movement_report() {
    let db = memory_db().await;
    let a = stocked_product(&db, "ALA-16", 50, 650).await;
    let b = stocked_product(&db, "CLA-3", 20, 720).await;
    let reconciler = db.reconciler();

    reconciler.apply_movement(exit(&a.id, 10)).await.unwrap();
    db.adjustments().adjust(&b.id, -2, "merma", ACTOR).await.unwrap();

    let only_a = db.ledger().summary(Some(&a.id), &LedgerFilter::default()).await.unwrap();
    assert_eq!(only_a.total_movements, 2);
    assert_eq!(only_a.total_entries, 50);
    assert_eq!(only_a.total_exits, 10);
    assert_eq!(only_a.net_change, 40);

    let warehouse = db.ledger().summary(None, &LedgerFilter::default()).await.unwrap();
    assert_eq!(warehouse.total_movements, 4);
    assert_eq!(warehouse.total_adjustments, 2);
    assert_eq!(warehouse.net_change, 40 + 18);

    let report = db.ledger().movement_report(&a.id, 30).await.unwrap();
    assert_eq!(report.product.code, "ALA-16");
    assert_eq!(report.period_days, 30);
    assert_eq!(report.movements.len(), 2);
    assert_eq!(report.summary.net_change, 40);
}

#[tokio::test]
async fn ledger_rows_are_immutable() {
    let db = memory_db().await;
    let p = stocked_product(&db, "CEM-25", 3, 1_700).await;

    let update = sqlx::query("UPDATE kardex_entries SET quantity = 99 WHERE product_id = ?1")
        .bind(&p.id)
        .execute(db.pool())
        .await;
    assert!(update.is_err());

    let delete = sqlx::query("DELETE FROM kardex_entries WHERE product_id = ?1")
        .bind(&p.id)
        .execute(db.pool())
        .await;
    assert!(delete.is_err());

    assert_consistent(&db, &p.id).await;
}

#[tokio::test]
async fn product_edits_never_touch_stock() {
    let db = memory_db().await;
    let p = stocked_product(&db, "LAD-KK", 12, 78_000).await;

    let update = ProductUpdate {
        name: Some("Ladrillo King Kong 18H".to_string()),
        min_stock: Some(20),
        sale_price_cents: Some(95_000),
        ..Default::default()
    };
    let edited = db.products().update_details(&p.id, &update).await.unwrap();

    assert_eq!(edited.name, "Ladrillo King Kong 18H");
    assert_eq!(edited.stock, 12);
    assert_eq!(edited.average_cost_cents, 78_000);
    assert!(edited.is_low_stock());

    let low = db.products().low_stock(None).await.unwrap();
    assert_eq!(low.len(), 1);

    let summary = db.products().inventory_summary().await.unwrap();
    assert_eq!(summary.total_value_cents, 12 * 78_000);
    assert_consistent(&db, &p.id).await;
}

#[tokio::test]
async fn date_window_filters_entries() {
    let db = memory_db().await;
    let p = product(&db, "ARE-GR", 4_500).await;
    let reconciler = db.reconciler();

    let before = Utc::now() - Duration::seconds(1);
    reconciler.apply_movement(entry(&p.id, 10, 4_500)).await.unwrap();
    reconciler.apply_movement(exit(&p.id, 3)).await.unwrap();
    let after = Utc::now() + Duration::seconds(1);

    let window = LedgerFilter::default().between(before, after);
    assert_eq!(reconciler.get_ledger(&p.id, &window).await.unwrap().len(), 2);

    let future = LedgerFilter::default().since(after + Duration::hours(1));
    assert!(reconciler.get_ledger(&p.id, &future).await.unwrap().is_empty());

    let past = LedgerFilter::default().until(before - Duration::hours(1));
    assert!(reconciler.get_ledger(&p.id, &past).await.unwrap().is_empty());

    let exits = LedgerFilter::default().since(before).kind(MovementKind::Exit);
    let rows = reconciler.get_ledger(&p.id, &exits).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].quantity, 3);

    let summary = db.ledger().summary(Some(&p.id), &future).await.unwrap();
    assert_eq!(summary.total_movements, 0);
}
