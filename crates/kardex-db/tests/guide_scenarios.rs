//! Guide lifecycle end to end: completion batches, rollback and history.

mod common;

use common::{assert_consistent, memory_db, product, stocked_product, ACTOR};
use kardex_core::{
    GuideAction, GuideItemUpdate, GuideKind, GuideStatus, GuideUpdate, MovementKind, NewGuide,
    NewGuideItem,
};
use kardex_db::{Database, LedgerError};

async fn advance_to_transit(db: &Database, guide_id: &str) {
    let coordinator = db.coordinator();
    coordinator.submit(guide_id, ACTOR).await.unwrap();
    coordinator.dispatch(guide_id, ACTOR).await.unwrap();
}

#[tokio::test]
async fn outgoing_guide_issues_one_exit_per_line() {
    let db = memory_db().await;
    let cement = stocked_product(&db, "CEM-42", 100, 2_650).await;
    let rebar = stocked_product(&db, "FIE-38", 50, 2_550).await;

    let guide = db
        .guides()
        .create(
            &NewGuide::new("GS-100", GuideKind::Outgoing)
                .counterparty("Constructora Los Andes")
                .item(NewGuideItem::new(&cement.id, 30).unit_price(3_100))
                .item(NewGuideItem::new(&rebar.id, 20).unit_price(3_050).discount(1_000)),
            ACTOR,
        )
        .await
        .unwrap();

    let items = db.guides().items(&guide.id).await.unwrap();
    assert_eq!(items.iter().map(|i| i.line_no).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(items[1].subtotal_cents, 20 * 3_050 - 1_000);

    advance_to_transit(&db, &guide.id).await;
    let completed = db.coordinator().complete(&guide.id, ACTOR).await.unwrap();
    assert_eq!(completed.status, GuideStatus::Completed);

    let entries = db.ledger().entries_for_document("GS-100").await.unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.kind == MovementKind::Exit));
    assert_eq!(entries[0].product_id, cement.id);
    assert_eq!(entries[1].product_id, rebar.id);

    let reconciler = db.reconciler();
    assert_eq!(reconciler.get_balance(&cement.id).await.unwrap().balance, 70);
    assert_eq!(reconciler.get_balance(&rebar.id).await.unwrap().balance, 30);
    assert_consistent(&db, &cement.id).await;
    assert_consistent(&db, &rebar.id).await;
}

#[tokio::test]
async fn incoming_guide_values_entries_at_unit_price() {
    let db = memory_db().await;
    let cement = stocked_product(&db, "CEM-42", 10, 100).await;
    let glue = product(&db, "PEG-ORO", 1_990).await;

    let guide = db
        .guides()
        .create(
            &NewGuide::new("GR-200", GuideKind::Incoming)
                .counterparty("Cementos Yura")
                .item(NewGuideItem::new(&cement.id, 10).unit_price(200))
                .item(NewGuideItem::new(&glue.id, 5)),
            ACTOR,
        )
        .await
        .unwrap();

    advance_to_transit(&db, &guide.id).await;
    db.coordinator().complete(&guide.id, ACTOR).await.unwrap();

    let cement_balance = db.reconciler().get_balance(&cement.id).await.unwrap();
    assert_eq!(cement_balance.balance, 20);
    assert_eq!(cement_balance.average_cost_cents, 150);

    // Unpriced line: valued at the current average
    let glue_balance = db.reconciler().get_balance(&glue.id).await.unwrap();
    assert_eq!(glue_balance.balance, 5);
    assert_eq!(glue_balance.average_cost_cents, 1_990);
}

#[tokio::test]
async fn failing_line_rolls_back_the_whole_guide() {
    let db = memory_db().await;
    let a = stocked_product(&db, "CEM-42", 10, 2_650).await;
    let b = stocked_product(&db, "FIE-12", 2, 4_480).await;

    let guide = db
        .guides()
        .create(
            &NewGuide::new("GS-300", GuideKind::Outgoing)
                .item(NewGuideItem::new(&a.id, 5))
                .item(NewGuideItem::new(&b.id, 3)),
            ACTOR,
        )
        .await
        .unwrap();

    advance_to_transit(&db, &guide.id).await;

    let err = db.coordinator().complete(&guide.id, ACTOR).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientStock { available: 2, requested: 3, .. }
    ));

    let reconciler = db.reconciler();
    assert_eq!(reconciler.get_balance(&a.id).await.unwrap().balance, 10);
    assert_eq!(reconciler.get_balance(&b.id).await.unwrap().balance, 2);
    assert!(db.ledger().entries_for_document("GS-300").await.unwrap().is_empty());

    let after = db.guides().get_by_id(&guide.id).await.unwrap().unwrap();
    assert_eq!(after.status, GuideStatus::InTransit);
    assert!(after.stock_applied_at.is_none());

    assert_consistent(&db, &a.id).await;
    assert_consistent(&db, &b.id).await;
}

#[tokio::test]
async fn completing_twice_applies_stock_once() {
    let db = memory_db().await;
    let p = stocked_product(&db, "ALA-16", 40, 650).await;

    let guide = db
        .guides()
        .create(
            &NewGuide::new("GS-400", GuideKind::Transfer)
                .destination("Almacén Cerro Colorado")
                .item(NewGuideItem::new(&p.id, 15)),
            ACTOR,
        )
        .await
        .unwrap();

    advance_to_transit(&db, &guide.id).await;

    let coordinator = db.coordinator();
    let first = coordinator.complete(&guide.id, ACTOR).await.unwrap();
    let second = coordinator.complete(&guide.id, ACTOR).await.unwrap();

    assert_eq!(first.status, GuideStatus::Completed);
    assert_eq!(second.status, GuideStatus::Completed);
    assert_eq!(first.stock_applied_at, second.stock_applied_at);

    assert_eq!(db.ledger().entries_for_document("GS-400").await.unwrap().len(), 1);
    assert_eq!(db.reconciler().get_balance(&p.id).await.unwrap().balance, 25);
}

#[tokio::test]
async fn terminal_guides_cannot_move() {
    let db = memory_db().await;
    let p = stocked_product(&db, "ARE-GR", 10, 5_500).await;

    let guide = db
        .guides()
        .create(
            &NewGuide::new("GS-500", GuideKind::Outgoing).item(NewGuideItem::new(&p.id, 1)),
            ACTOR,
        )
        .await
        .unwrap();

    advance_to_transit(&db, &guide.id).await;
    let returned = db
        .coordinator()
        .mark_returned(&guide.id, ACTOR, "obra cerrada")
        .await
        .unwrap();
    assert_eq!(returned.status, GuideStatus::Returned);

    let err = db.coordinator().complete(&guide.id, ACTOR).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InvalidTransition {
            from: GuideStatus::Returned,
            to: GuideStatus::Completed,
            ..
        }
    ));

    // Returned guides never touched stock
    assert_eq!(db.reconciler().get_balance(&p.id).await.unwrap().balance, 10);
}

#[tokio::test]
async fn lines_are_editable_only_before_dispatch() {
    let db = memory_db().await;
    let a = stocked_product(&db, "CEM-42", 10, 2_650).await;
    let b = stocked_product(&db, "CLA-3", 10, 720).await;
    let guides = db.guides();

    let guide = guides
        .create(&NewGuide::new("GS-600", GuideKind::Outgoing), ACTOR)
        .await
        .unwrap();

    let first = guides.add_item(&guide.id, &NewGuideItem::new(&a.id, 2), ACTOR).await.unwrap();
    let second = guides.add_item(&guide.id, &NewGuideItem::new(&b.id, 3), ACTOR).await.unwrap();
    assert_eq!((first.line_no, second.line_no), (1, 2));

    guides.remove_item(&guide.id, 1, ACTOR).await.unwrap();
    let third = guides.add_item(&guide.id, &NewGuideItem::new(&a.id, 4), ACTOR).await.unwrap();
    assert_eq!(third.line_no, 3);

    advance_to_transit(&db, &guide.id).await;

    let err = guides
        .add_item(&guide.id, &NewGuideItem::new(&a.id, 1), ACTOR)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidInput(_)));

    let err = guides.remove_item(&guide.id, 2, ACTOR).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidInput(_)));

    db.coordinator().complete(&guide.id, ACTOR).await.unwrap();
    assert_eq!(db.reconciler().get_balance(&a.id).await.unwrap().balance, 6);
    assert_eq!(db.reconciler().get_balance(&b.id).await.unwrap().balance, 7);
}

#[tokio::test]
async fn drafts_can_be_edited_until_dispatch() {
    let db = memory_db().await;
    let p = stocked_product(&db, "FIE-12", 40, 1_900).await;
    let guides = db.guides();

    let guide = guides
        .create(
            &NewGuide::new("GS-650", GuideKind::Outgoing)
                .item(NewGuideItem::new(&p.id, 5).unit_price(2_400)),
            ACTOR,
        )
        .await
        .unwrap();

    let header = GuideUpdate {
        counterparty: Some("  Obras Civiles del Sur  ".to_string()),
        destination: Some("Av. Industrial 450".to_string()),
        ..Default::default()
    };
    let edited = guides.update_header(&guide.id, &header, ACTOR).await.unwrap();
    assert_eq!(edited.counterparty.as_deref(), Some("Obras Civiles del Sur"));
    assert_eq!(edited.destination.as_deref(), Some("Av. Industrial 450"));
    assert_eq!(edited.code, "GS-650");

    let line = guides
        .update_item(&guide.id, 1, &GuideItemUpdate::default().quantity(8).discount(400), ACTOR)
        .await
        .unwrap();
    assert_eq!(line.quantity, 8);
    assert_eq!(line.unit_price_cents, Some(2_400));
    assert_eq!(line.subtotal_cents, 8 * 2_400 - 400);
    assert_eq!(guides.items(&guide.id).await.unwrap()[0].subtotal_cents, 8 * 2_400 - 400);

    let err = guides
        .update_item(&guide.id, 9, &GuideItemUpdate::default().quantity(1), ACTOR)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidInput(_)));

    let err = guides
        .update_header(&guide.id, &GuideUpdate::default(), ACTOR)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidInput(_)));

    let history = guides.history(&guide.id).await.unwrap();
    let updated = history
        .iter()
        .find(|e| e.action == GuideAction::Updated)
        .expect("header edit recorded");
    assert_eq!(updated.note.as_deref(), Some("counterparty, destination"));
    assert!(history.iter().any(|e| e.action == GuideAction::ItemUpdated));

    advance_to_transit(&db, &guide.id).await;

    let late = GuideUpdate {
        notes: Some("reprogramado".to_string()),
        ..Default::default()
    };
    let err = guides.update_header(&guide.id, &late, ACTOR).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidInput(_)));
    let err = guides
        .update_item(&guide.id, 1, &GuideItemUpdate::default().quantity(1), ACTOR)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidInput(_)));

    db.coordinator().complete(&guide.id, ACTOR).await.unwrap();
    assert_eq!(db.reconciler().get_balance(&p.id).await.unwrap().balance, 32);
    assert_consistent(&db, &p.id).await;
}

#[tokio::test]
async fn tracking_shows_lines_and_history() {
    let db = memory_db().await;
    let p = stocked_product(&db, "TUB-PVC4", 10, 2_390).await;

    let guide = db
        .guides()
        .create(
            &NewGuide::new("GS-700/2024", GuideKind::Outgoing).item(NewGuideItem::new(&p.id, 2)),
            ACTOR,
        )
        .await
        .unwrap();

    advance_to_transit(&db, &guide.id).await;
    db.coordinator().complete(&guide.id, ACTOR).await.unwrap();

    let tracking = db.guides().tracking("GS-700/2024").await.unwrap().unwrap();
    assert_eq!(tracking.guide.status, GuideStatus::Completed);
    assert_eq!(tracking.items.len(), 1);

    let actions: Vec<GuideAction> = tracking.events.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![
            GuideAction::Created,
            GuideAction::StatusChanged,
            GuideAction::StatusChanged,
            GuideAction::StatusChanged,
        ]
    );
    let statuses: Vec<Option<GuideStatus>> = tracking.events.iter().map(|e| e.to_status).collect();
    assert_eq!(
        statuses,
        vec![
            Some(GuideStatus::Draft),
            Some(GuideStatus::Pending),
            Some(GuideStatus::InTransit),
            Some(GuideStatus::Completed),
        ]
    );

    assert!(db.guides().tracking("GS-404").await.unwrap().is_none());

    let completed = db.guides().list(Some(GuideStatus::Completed), 10, 0).await.unwrap();
    assert_eq!(completed.len(), 1);
}

#[tokio::test]
async fn guide_creation_rejects_bad_input() {
    let db = memory_db().await;
    let p = stocked_product(&db, "CEM-42", 10, 2_650).await;
    let guides = db.guides();

    guides
        .create(&NewGuide::new("GS-800", GuideKind::Outgoing), ACTOR)
        .await
        .unwrap();

    let duplicate = guides
        .create(&NewGuide::new("GS-800", GuideKind::Incoming), ACTOR)
        .await
        .unwrap_err();
    assert!(matches!(duplicate, LedgerError::InvalidInput(ref m) if m.contains("GS-800")));

    let unknown_product = guides
        .create(
            &NewGuide::new("GS-801", GuideKind::Outgoing).item(NewGuideItem::new("ghost", 1)),
            ACTOR,
        )
        .await
        .unwrap_err();
    assert!(matches!(unknown_product, LedgerError::InvalidInput(_)));
    assert!(guides.get_by_code("GS-801").await.unwrap().is_none());

    let zero_qty = guides
        .create(
            &NewGuide::new("GS-802", GuideKind::Outgoing).item(NewGuideItem::new(&p.id, 0)),
            ACTOR,
        )
        .await
        .unwrap_err();
    assert!(matches!(zero_qty, LedgerError::InvalidInput(_)));
}

#[tokio::test]
async fn inactive_product_blocks_completion() {
    let db = memory_db().await;
    let p = stocked_product(&db, "FIE-14", 30, 1_150).await;

    let guide = db
        .guides()
        .create(
            &NewGuide::new("GS-900", GuideKind::Outgoing).item(NewGuideItem::new(&p.id, 5)),
            ACTOR,
        )
        .await
        .unwrap();
    advance_to_transit(&db, &guide.id).await;

    db.products().deactivate(&p.id).await.unwrap();

    let err = db.coordinator().complete(&guide.id, ACTOR).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidInput(_)));
    assert_eq!(
        db.guides().get_by_id(&guide.id).await.unwrap().unwrap().status,
        GuideStatus::InTransit
    );
}
