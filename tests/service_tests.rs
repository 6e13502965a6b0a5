mod common;

use common::{group, GROUP};
use group_settlement::config::{CacheSettings, LedgerSettings};
use group_settlement::error::AppError;
use group_settlement::models::{AccountId, EntryKind, NewEntry};
use group_settlement::repositories::{EntryStore, InMemoryEntryStore};
use group_settlement::services::{EntryValidator, SettlementService};
use rust_decimal_macros::dec;
use std::sync::Arc;

fn service_with(ledger: LedgerSettings) -> SettlementService<InMemoryEntryStore> {
    let store = Arc::new(InMemoryEntryStore::new(EntryValidator::from_settings(&ledger)));
    SettlementService::new(store, &ledger, CacheSettings::default())
}

fn service() -> SettlementService<InMemoryEntryStore> {
    service_with(LedgerSettings::default())
}

async fn seed_abc(service: &SettlementService<InMemoryEntryStore>) {
    for player in ["A", "B", "C"] {
        service
            .record(NewEntry::issuance(GROUP, "system", player, dec!(1000)))
            .await
            .unwrap();
    }
    for (from, to, amount) in [("A", "B", dec!(300)), ("B", "C", dec!(500)), ("C", "A", dec!(100))] {
        service
            .record(NewEntry::new(GROUP, EntryKind::Win, from, to, amount))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_record_plan_commit_round() {
    let service = service();
    seed_abc(&service).await;

    let plan = service.plan_settlement(&group()).await.unwrap();
    assert_eq!(plan.transfers.len(), 2);

    let committed = service.commit_plan(&group(), &plan).await.unwrap();
    assert_eq!(committed.len(), 2);
    assert!(committed.iter().all(|e| e.kind == EntryKind::Settlement));

    let after = service.balances(&group()).await.unwrap();
    for id in ["A", "B", "C"] {
        assert_eq!(after.net_result(&AccountId::from(id)), dec!(0), "{id}");
    }
    assert_eq!(after.custodial_balance(&AccountId::from("A")), dec!(600));
    assert_eq!(after.custodial_balance(&AccountId::from("B")), dec!(600));
    assert_eq!(after.custodial_balance(&AccountId::from("C")), dec!(1800));
    assert_eq!(after.custodial_total(), dec!(3000));

    let again = service.plan_settlement(&group()).await.unwrap();
    assert!(again.is_empty());
}

#[tokio::test]
async fn test_plan_goes_stale_after_new_entry() {
    let service = service();
    seed_abc(&service).await;

    let plan = service.plan_settlement(&group()).await.unwrap();
    service
        .record(NewEntry::new(GROUP, EntryKind::Win, "C", "B", dec!(50)))
        .await
        .unwrap();

    let err = service.commit_plan(&group(), &plan).await.unwrap_err();
    assert!(matches!(err, AppError::StalePlan { .. }));
    assert_eq!(service.store().snapshot(&group()).await.unwrap().len(), 7);
}

#[tokio::test]
async fn test_loans_and_returns() {
    let service = service();
    seed_abc(&service).await;

    let loan = service
        .record(NewEntry::new(GROUP, EntryKind::Loan, "C", "A", dec!(200)))
        .await
        .unwrap();
    service
        .record(NewEntry::repayment(GROUP, "A", "C", dec!(50), loan.entry_id))
        .await
        .unwrap();

    let loans = service.outstanding_loans(&group()).await.unwrap();
    assert_eq!(loans.len(), 1);
    assert_eq!(loans[0].lender.as_str(), "C");
    assert_eq!(loans[0].borrower.as_str(), "A");
    assert_eq!(loans[0].outstanding, dec!(150));

    let over = service
        .record(NewEntry::repayment(GROUP, "A", "C", dec!(151), loan.entry_id))
        .await;
    assert!(matches!(over, Err(AppError::InvalidReturn(_))));

    service
        .record(NewEntry::repayment(GROUP, "A", "C", dec!(150), loan.entry_id))
        .await
        .unwrap();
    assert!(service.outstanding_loans(&group()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_funds_are_checked_when_configured() {
    let service = service_with(LedgerSettings {
        require_funds: true,
        ..LedgerSettings::default()
    });
    seed_abc(&service).await;

    let a = AccountId::from("A");
    assert!(service.can_afford(&group(), &a, dec!(800)).await.unwrap());
    assert!(!service.can_afford(&group(), &a, dec!(800.01)).await.unwrap());

    let err = service
        .record(NewEntry::new(GROUP, EntryKind::BuyIn, "A", "B", dec!(900)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientFunds { .. }));
    assert!(err.is_validation());

    let plan = service.plan_settlement(&group()).await.unwrap();
    service.commit_plan(&group(), &plan).await.unwrap();
    assert_eq!(
        service.balances(&group()).await.unwrap().custodial_balance(&a),
        dec!(600)
    );
}

#[tokio::test]
async fn test_groups_are_isolated() {
    let service = service();
    seed_abc(&service).await;
    service
        .record(NewEntry::issuance("other", "system", "A", dec!(5)))
        .await
        .unwrap();

    let ours = service.balances(&group()).await.unwrap();
    let theirs = service.balances(&"other".into()).await.unwrap();

    assert_eq!(ours.custodial_balance(&AccountId::from("A")), dec!(800));
    assert_eq!(theirs.custodial_balance(&AccountId::from("A")), dec!(5));
    assert_eq!(theirs.entry_count, 1);
}

#[tokio::test]
async fn test_concurrent_writers_keep_ledger_consistent() {
    let service = Arc::new(service());
    for player in ["A", "B", "C", "D"] {
        service
            .record(NewEntry::issuance(GROUP, "system", player, dec!(1000)))
            .await
            .unwrap();
    }

    let players = ["A", "B", "C", "D"];
    let handles: Vec<_> = (0..40)
        .map(|i| {
            let service = Arc::clone(&service);
            let from = players[i % 4];
            let to = players[(i + 1) % 4];
            tokio::spawn(async move {
                service
                    .record(NewEntry::new(GROUP, EntryKind::Win, from, to, dec!(1.25)))
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let balances = service.balances(&group()).await.unwrap();
    assert_eq!(balances.entry_count, 44);
    assert_eq!(balances.custodial_total(), dec!(4000));
    assert_eq!(balances.net_result_total(), dec!(0));
}

#[test]
fn test_service_from_blocking_context() {
    let service = service();
    let entry = tokio_test::block_on(service.record(NewEntry::issuance(GROUP, "system", "A", dec!(1))))
        .unwrap();

    assert_eq!(entry.group_id, group());
    let head = tokio_test::block_on(service.store().head(&group())).unwrap();
    assert_eq!(head.last_entry_id, Some(entry.entry_id));
}
