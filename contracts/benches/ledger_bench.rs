// Share ledger and registry benchmarks.
//
// Covers the share/value conversions every balance read goes through, a
// rebase-heavy transfer workload, and the registry's mint path with its
// solvency checks.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use vaulthub_contracts::share_ledger::{LedgerConfig, ShareLedger};
use vaulthub_contracts::vault_registry::{RegistryConfig, VaultRegistry};
use vaulthub_protocol::message::{LedgerMessage, RegistryMessage};
use vaulthub_protocol::runtime::Actor;
use vaulthub_protocol::types::{Address, Envelope};

const NOW: u64 = 1_700_000_000;

/// A ledger with `holders` accounts of 1_000 shares each, rebased to a
/// non-trivial ratio.
fn setup_ledger(holders: u64) -> ShareLedger {
    let mut ledger = ShareLedger::with_registry(
        Address::new("ledger"),
        Address::new("deployer"),
        Address::new("registry"),
        LedgerConfig::default(),
    );
    for i in 0..holders {
        let mint = LedgerMessage::Mint {
            recipient: Address::new(format!("holder-{i}")),
            shares: 1_000,
        };
        let _ = ledger.handle(Envelope::new(i, "registry", mint), NOW);
    }
    let rebase = LedgerMessage::Rebase {
        total_pooled_value: holders * 1_037,
    };
    let _ = ledger.handle(Envelope::new(holders, "registry", rebase), NOW);
    ledger
}

fn bench_conversions(c: &mut Criterion) {
    let ledger = setup_ledger(1_000);
    let holder = Address::new("holder-42");

    c.bench_function("ledger/balance_of", |b| {
        b.iter(|| ledger.balance_of(&holder));
    });
    c.bench_function("ledger/value_round_trip", |b| {
        b.iter(|| {
            ledger
                .shares_by_pooled_value(123_456)
                .and_then(|s| ledger.pooled_value_by_shares(s))
        });
    });
}

fn bench_transfers(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger/transfer");
    for count in [100u64, 1_000] {
        group.throughput(Throughput::Elements(count));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut ledger = setup_ledger(16);
                for id in 1..=count {
                    let from = Address::new(format!("holder-{}", id % 16));
                    let transfer = LedgerMessage::Transfer {
                        to: Address::new(format!("holder-{}", (id + 1) % 16)),
                        amount: 3,
                    };
                    let _ = ledger.handle(Envelope::new(id, from, transfer), NOW);
                }
                ledger
            });
        });
    }
    group.finish();
}

fn bench_registry_mint(c: &mut Criterion) {
    c.bench_function("registry/mint_1000", |b| {
        b.iter(|| {
            let mut registry = VaultRegistry::with_ledger(
                Address::new("registry"),
                Address::new("admin"),
                Address::new("oracle"),
                Address::new("ledger"),
                RegistryConfig::default(),
            );
            let vault = Address::new("v1");
            let connect = RegistryMessage::ConnectVault {
                vault: vault.clone(),
                share_limit: u64::MAX,
                reserve_ratio_bp: 1_000,
                infra_fee_bp: 100,
                liquidity_fee_bp: 0,
            };
            let report = RegistryMessage::ApplyVaultReport {
                vault: vault.clone(),
                total_value: i64::MAX,
                in_out_delta: 0,
            };
            let _ = registry.handle(Envelope::new(0, "admin", connect), NOW);
            let _ = registry.handle(Envelope::new(0, "oracle", report), NOW);
            for id in 1..=1_000u64 {
                let mint = RegistryMessage::MintShares {
                    vault: vault.clone(),
                    amount: 10,
                    recipient: Address::new("alice"),
                };
                let _ = registry.handle(Envelope::new(id, "admin", mint), NOW);
            }
            registry
        });
    });
}

criterion_group!(benches, bench_conversions, bench_transfers, bench_registry_mint);
criterion_main!(benches);
