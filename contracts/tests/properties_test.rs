//! Randomized property tests for the ledger and registry.
//!
//! Each test runs a few hundred seeded rounds so failures reproduce exactly.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use vaulthub_contracts::share_ledger::{LedgerConfig, ShareLedger};
use vaulthub_contracts::vault_registry::{RegistryConfig, VaultRegistry};
use vaulthub_protocol::error::{Classify, ErrorClass};
use vaulthub_protocol::message::{LedgerMessage, RegistryMessage};
use vaulthub_protocol::runtime::Actor;
use vaulthub_protocol::types::{Address, Envelope, MessageId};

const ROUNDS: usize = 300;
const NOW: u64 = 1_700_000_000;

fn holder(i: usize) -> Address {
    Address::new(format!("holder-{i}"))
}

fn ledger() -> ShareLedger {
    ShareLedger::with_registry(
        Address::new("ledger"),
        Address::new("deployer"),
        Address::new("registry"),
        LedgerConfig::default(),
    )
}

/// Feeds registry-originated messages with increasing ids.
struct RegistryFeed {
    next: MessageId,
}

impl RegistryFeed {
    fn send(&mut self, ledger: &mut ShareLedger, body: LedgerMessage) -> bool {
        self.next += 1;
        ledger
            .handle(Envelope::new(self.next, "registry", body), NOW)
            .is_ok()
    }
}

fn share_sum(ledger: &ShareLedger) -> u64 {
    ledger.holders().map(|(_, account)| account.shares).sum()
}

#[test]
fn shares_are_conserved_under_random_traffic() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut l = ledger();
    let mut feed = RegistryFeed { next: 0 };
    let mut holder_ids = vec![0u64; 6];

    for _ in 0..ROUNDS * 5 {
        let a = rng.gen_range(0..6);
        let b = rng.gen_range(0..6);
        let shares = rng.gen_range(0..500u64);
        match rng.gen_range(0..5) {
            0 => {
                feed.send(
                    &mut l,
                    LedgerMessage::Mint {
                        recipient: holder(a),
                        shares,
                    },
                );
            }
            1 => {
                feed.send(
                    &mut l,
                    LedgerMessage::Burn {
                        account: holder(a),
                        shares,
                    },
                );
            }
            2 => {
                holder_ids[a] += 1;
                let _ = l.handle(
                    Envelope::new(
                        holder_ids[a],
                        holder(a),
                        LedgerMessage::TransferShares { to: holder(b), shares },
                    ),
                    NOW,
                );
            }
            3 => {
                holder_ids[a] += 1;
                let _ = l.handle(
                    Envelope::new(
                        holder_ids[a],
                        holder(a),
                        LedgerMessage::Approve {
                            spender: holder(b),
                            shares,
                        },
                    ),
                    NOW,
                );
            }
            _ => {
                holder_ids[b] += 1;
                let _ = l.handle(
                    Envelope::new(
                        holder_ids[b],
                        holder(b),
                        LedgerMessage::TransferFrom {
                            from: holder(a),
                            to: holder(rng.gen_range(0..6)),
                            shares,
                        },
                    ),
                    NOW,
                );
            }
        }
        assert_eq!(share_sum(&l), l.total_shares());
    }
}

#[test]
fn rebase_is_proportional_with_bounded_loss() {
    let mut rng = StdRng::seed_from_u64(11);

    for _ in 0..ROUNDS {
        let mut l = ledger();
        let mut feed = RegistryFeed { next: 0 };
        let n = rng.gen_range(1..12usize);
        let shares: Vec<u64> = (0..n).map(|_| rng.gen_range(1..1_000_000)).collect();
        for (i, s) in shares.iter().enumerate() {
            assert!(feed.send(
                &mut l,
                LedgerMessage::Mint {
                    recipient: holder(i),
                    shares: *s,
                },
            ));
        }
        let total: u64 = shares.iter().sum();
        let pooled = rng.gen_range(0..u64::MAX / 4);
        assert!(feed.send(
            &mut l,
            LedgerMessage::Rebase {
                total_pooled_value: pooled,
            },
        ));

        let mut sum = 0u128;
        for (i, s) in shares.iter().enumerate() {
            let expected = (*s as u128 * pooled as u128 / total as u128) as u64;
            let balance = l.balance_of(&holder(i));
            assert_eq!(balance, expected);
            assert_eq!(l.shares_of(&holder(i)), *s);
            sum += balance as u128;
        }
        assert!(sum <= pooled as u128);
        assert!(pooled as u128 - sum <= (n - 1) as u128);
    }
}

#[test]
fn value_round_trip_loses_at_most_one_unit() {
    let mut rng = StdRng::seed_from_u64(23);

    for _ in 0..ROUNDS {
        let mut l = ledger();
        let mut feed = RegistryFeed { next: 0 };
        // Shares at or above pooled value: a share is worth at most one unit.
        let pooled = rng.gen_range(1..1_000_000_000u64);
        let total = pooled + rng.gen_range(0..1_000_000_000u64);
        assert!(feed.send(
            &mut l,
            LedgerMessage::Mint {
                recipient: holder(0),
                shares: total,
            },
        ));
        assert!(feed.send(
            &mut l,
            LedgerMessage::Rebase {
                total_pooled_value: pooled,
            },
        ));

        let x = rng.gen_range(0..pooled);
        let shares = l.shares_by_pooled_value(x).unwrap();
        let back = l.pooled_value_by_shares(shares).unwrap();
        assert!(back <= x);
        assert!(x - back <= 1, "x={x} back={back} pooled={pooled} total={total}");
    }
}

#[test]
fn value_round_trip_loses_less_than_one_share() {
    let mut rng = StdRng::seed_from_u64(29);

    for _ in 0..ROUNDS {
        let mut l = ledger();
        let mut feed = RegistryFeed { next: 0 };
        let total = rng.gen_range(1..1_000_000u64);
        let pooled = total * rng.gen_range(1..50u64) + rng.gen_range(0..total);
        feed.send(
            &mut l,
            LedgerMessage::Mint {
                recipient: holder(0),
                shares: total,
            },
        );
        feed.send(
            &mut l,
            LedgerMessage::Rebase {
                total_pooled_value: pooled,
            },
        );

        let x = rng.gen_range(0..pooled);
        let back = l
            .pooled_value_by_shares(l.shares_by_pooled_value(x).unwrap())
            .unwrap();
        let share_price = pooled.div_ceil(total);
        assert!(back <= x);
        assert!(x - back <= share_price);
    }
}

#[test]
fn resent_ids_change_nothing() {
    let mut rng = StdRng::seed_from_u64(31);
    let mut l = ledger();
    let mut sent = Vec::new();

    for id in 1..=200u64 {
        let body = LedgerMessage::Mint {
            recipient: holder(rng.gen_range(0..4)),
            shares: rng.gen_range(1..1_000),
        };
        l.handle(Envelope::new(id, "registry", body.clone()), NOW)
            .unwrap();
        sent.push((id, body));
    }
    let before = (l.total_shares(), share_sum(&l));

    for _ in 0..200 {
        let (id, body) = sent[rng.gen_range(0..sent.len())].clone();
        let err = l
            .handle(Envelope::new(id, "registry", body), NOW)
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::Replay);
    }
    assert_eq!((l.total_shares(), share_sum(&l)), before);
}

#[test]
fn every_successful_mint_leaves_vault_solvent() {
    let mut rng = StdRng::seed_from_u64(43);

    for _ in 0..ROUNDS {
        let mut r = VaultRegistry::with_ledger(
            Address::new("registry"),
            Address::new("admin"),
            Address::new("oracle"),
            Address::new("ledger"),
            RegistryConfig::default(),
        );
        let vault = Address::new("v");
        let share_limit = rng.gen_range(0..100_000u64);
        let reserve_ratio_bp = rng.gen_range(0..=10_000u64);
        r.handle(
            Envelope::new(
                1,
                "admin",
                RegistryMessage::ConnectVault {
                    vault: vault.clone(),
                    share_limit,
                    reserve_ratio_bp,
                    infra_fee_bp: rng.gen_range(0..=10_000),
                    liquidity_fee_bp: 0,
                },
            ),
            NOW,
        )
        .unwrap();
        r.handle(
            Envelope::new(
                1,
                "oracle",
                RegistryMessage::ApplyVaultReport {
                    vault: vault.clone(),
                    total_value: rng.gen_range(-1_000..100_000i64),
                    in_out_delta: 0,
                },
            ),
            NOW,
        )
        .unwrap();

        for id in 2..40u64 {
            let amount = rng.gen_range(0..10_000u64);
            let result = r.handle(
                Envelope::new(
                    id,
                    "admin",
                    RegistryMessage::MintShares {
                        vault: vault.clone(),
                        amount,
                        recipient: Address::new("alice"),
                    },
                ),
                NOW,
            );
            let record = r.vault(&vault).unwrap();
            match result {
                Ok(_) => {
                    let held = record.liability_shares as i128 * reserve_ratio_bp as i128;
                    let backing = record.total_value as i128 * 10_000;
                    assert!(held <= backing, "{held} > {backing}");
                }
                Err(e) => assert_eq!(e.code(), "max_liability"),
            }
            assert!(record.liability_shares <= share_limit);
        }
    }
}
