use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use group_settlement::cache::CacheStats;
use group_settlement::config::{CacheSettings, LedgerSettings};
use group_settlement::models::{EntryKind, GroupId, LedgerEntry, NewEntry};
use group_settlement::repositories::InMemoryEntryStore;
use group_settlement::services::{
    BalanceProjector, ConservationAuditor, NettingPlanner, SettlementService,
};

const GROUP: &str = "bench";
const KINDS: [EntryKind; 5] = [
    EntryKind::Win,
    EntryKind::Transfer,
    EntryKind::Loan,
    EntryKind::BuyIn,
    EntryKind::CashOut,
];

/// Funds `players` accounts, then cycles through the non-issuance kinds.
fn synthetic_history(players: usize, size: usize) -> Vec<LedgerEntry> {
    let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let names: Vec<String> = (0..players).map(|i| format!("player-{i}")).collect();

    let drafts = names
        .iter()
        .map(|name| NewEntry::issuance(GROUP, "system", name.as_str(), Decimal::from(1_000_000)))
        .chain((0..size).map(|i| {
            let from = &names[i % players];
            let to = &names[(i * 7 + 1) % players];
            let to = if to == from { &names[(i + 1) % players] } else { to };
            let amount = Decimal::new((i % 1000) as i64 + 100, 2);
            NewEntry::new(GROUP, KINDS[i % KINDS.len()], from.as_str(), to.as_str(), amount)
        }));

    drafts
        .enumerate()
        .map(|(seq, draft)| {
            draft.into_entry(
                Uuid::from_u128(seq as u128 + 1),
                start + ChronoDuration::milliseconds(seq as i64),
            )
        })
        .collect()
}

fn benchmark_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection");
    group.measurement_time(Duration::from_secs(10));

    let projector = BalanceProjector::default();
    let group_id = GroupId::from(GROUP);

    for size in [100, 1000, 10000].iter() {
        let entries = synthetic_history(10, *size);
        group.bench_with_input(BenchmarkId::new("project", size), &entries, |b, entries| {
            b.iter(|| {
                let projection = projector.project(&group_id, black_box(entries)).unwrap();
                black_box(projection)
            });
        });
    }

    group.finish();
}

fn benchmark_audit(c: &mut Criterion) {
    let mut group = c.benchmark_group("audit");

    let entries = synthetic_history(10, 10000);
    let projection = BalanceProjector::default()
        .project(&GroupId::from(GROUP), &entries)
        .unwrap();
    let auditor = ConservationAuditor::default();

    group.bench_function("audit_10000", |b| {
        b.iter(|| black_box(auditor.audit(black_box(&entries), &projection).is_ok()));
    });

    group.finish();
}

fn benchmark_netting(c: &mut Criterion) {
    let mut group = c.benchmark_group("netting");

    let planner = NettingPlanner::default();
    for players in [10, 100, 1000].iter() {
        let entries = synthetic_history(*players, players * 20);
        let projection = BalanceProjector::default()
            .project(&GroupId::from(GROUP), &entries)
            .unwrap();

        group.bench_with_input(BenchmarkId::new("plan", players), &projection, |b, projection| {
            b.iter(|| {
                let plan = planner.plan(black_box(projection)).unwrap();
                black_box(plan)
            });
        });
    }

    group.finish();
}

fn benchmark_cached_balances(c: &mut Criterion) {
    let mut group = c.benchmark_group("service");
    let runtime = tokio::runtime::Runtime::new().unwrap();

    let ledger = LedgerSettings::default();
    let service = SettlementService::new(
        Arc::new(InMemoryEntryStore::default()),
        &ledger,
        CacheSettings::default(),
    );
    let group_id = GroupId::from(GROUP);
    runtime.block_on(async {
        for i in 0..10 {
            service
                .record(NewEntry::issuance(GROUP, "system", format!("player-{i}"), Decimal::from(100)))
                .await
                .unwrap();
        }
        for i in 0..1000 {
            service
                .record(NewEntry::new(
                    GROUP,
                    EntryKind::Win,
                    format!("player-{}", i % 10),
                    format!("player-{}", (i + 3) % 10),
                    Decimal::ONE,
                ))
                .await
                .unwrap();
        }
    });

    group.bench_function("balances_cached", |b| {
        b.to_async(&runtime).iter(|| async {
            black_box(service.balances(&group_id).await.unwrap())
        });
    });

    group.finish();
}

fn benchmark_cache_stats(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_stats");

    group.bench_function("record_hit", |b| {
        let stats = CacheStats::new();
        b.iter(|| {
            stats.record_hit();
        });
    });

    group.bench_function("hit_rate_calculation", |b| {
        let stats = CacheStats::new();
        for _ in 0..1000 {
            stats.record_hit();
        }
        for _ in 0..100 {
            stats.record_miss();
        }

        b.iter(|| {
            let rate = stats.hit_rate();
            black_box(rate)
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_projection,
    benchmark_audit,
    benchmark_netting,
    benchmark_cached_balances,
    benchmark_cache_stats,
);

criterion_main!(benches);
