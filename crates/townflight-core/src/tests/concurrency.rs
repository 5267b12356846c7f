//! Parallel and interleaved signals across independent towns.
//!
//! These tests verify that:
//! - counts for different towns never leak into each other
//! - concurrent entry/exit for distinct players keeps each count equal to
//!   the number of enemies whose last move put them in that town

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use townmap::{PlayerId, TownId};

use crate::collaborator::FlightControl;
use crate::reconciler::Reconciler;
use crate::tracker::{DecrementOutcome, EnemyTracker};

use super::helpers::{CountingFlight, InterruptingFlight, OddEnemies};

/// Applies `ops` to `town` in order, returning the expected final count.
fn run_ops(tracker: &EnemyTracker, town: TownId, ops: &[bool]) -> Option<u32> {
    let mut model: Option<u32> = None;
    for &increment in ops {
        if increment {
            tracker.increment_enemies(town);
            model = Some(model.unwrap_or(0) + 1);
        } else {
            let _ = tracker.decrement_enemies(town);
            model = model.map(|n| n.saturating_sub(1));
        }
    }
    model
}

// =============================================================================
// Tracker
// =============================================================================

#[test]
fn parallel_towns_keep_their_own_counts() {
    let tracker = EnemyTracker::new();

    (0..32u64).into_par_iter().for_each(|i| {
        let town = TownId::new(i);
        for _ in 0..=i {
            tracker.increment_enemies(town);
        }
        for _ in 0..i / 2 {
            tracker.decrement_enemies(town).unwrap();
        }
    });

    for i in 0..32u64 {
        let expected = u32::try_from(i + 1 - i / 2).unwrap();
        assert_eq!(tracker.enemy_count(TownId::new(i)), Some(expected));
    }
}

#[test]
fn concurrent_balanced_traffic_on_one_town_clears_once() {
    let tracker = Arc::new(EnemyTracker::new());
    let town = TownId::new(1);
    // Keep one enemy inside so the town never clears mid-test
    tracker.increment_enemies(town);

    thread::scope(|scope| {
        for _ in 0..8 {
            let tracker = Arc::clone(&tracker);
            scope.spawn(move || {
                for _ in 0..500 {
                    tracker.increment_enemies(town);
                    assert!(matches!(
                        tracker.decrement_enemies(town),
                        Ok(DecrementOutcome::Remaining(_))
                    ));
                }
            });
        }
    });

    assert_eq!(tracker.enemy_count(town), Some(1));
    assert_eq!(tracker.decrement_enemies(town), Ok(DecrementOutcome::Cleared));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Each town's op sequence runs on its own rayon task; final counts must
    /// match each town's own sequential model.
    #[test]
    fn interleaved_towns_never_cross_contaminate(
        per_town in proptest::collection::vec(
            proptest::collection::vec(any::<bool>(), 0..60),
            1..12,
        )
    ) {
        let tracker = EnemyTracker::new();

        let expected: Vec<Option<u32>> = per_town
            .par_iter()
            .enumerate()
            .map(|(i, ops)| run_ops(&tracker, TownId::new(i as u64), ops))
            .collect();

        for (i, model) in expected.iter().enumerate() {
            let town = TownId::new(i as u64);
            prop_assert_eq!(tracker.enemy_count(town), *model);
            prop_assert_eq!(tracker.town_is_contested(town), model.unwrap_or(0) > 0);
        }
    }
}

// =============================================================================
// Reconciler
// =============================================================================

type TestReconciler = Reconciler<OddEnemies, CountingFlight>;

fn reconciler() -> TestReconciler {
    Reconciler::new(Arc::new(OddEnemies), Arc::new(CountingFlight::default()))
}

/// Counts odd (enemy) players per final town.
fn expected_counts(finals: &BTreeMap<PlayerId, Option<TownId>>) -> BTreeMap<TownId, u32> {
    let mut counts = BTreeMap::new();
    for (player, town) in finals {
        if let Some(town) = town {
            if player.as_u64() % 2 == 1 {
                *counts.entry(*town).or_insert(0) += 1;
            }
        }
    }
    counts
}

#[test]
fn players_moving_concurrently_balance_counts() {
    let reconciler = reconciler();
    let towns: Vec<TownId> = (0..4).map(TownId::new).collect();

    (0..64u64).into_par_iter().for_each(|raw| {
        let player = PlayerId::new(raw);
        for step in 0..20u64 {
            let town = towns[usize::try_from((raw + step) % 4).unwrap()];
            reconciler.on_enter(player, town);
        }
        reconciler.on_logout(player);
    });

    for town in &towns {
        assert_eq!(reconciler.tracker().enemy_count(*town), Some(0));
        assert!(reconciler.occupants(*town).is_empty());
    }
}

#[test]
fn seeded_interleaving_matches_final_positions() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x7041_f11e);
    let towns: Vec<TownId> = (0..6).map(TownId::new).collect();

    // Per-player schedules; `None` means logging out
    let schedules: Vec<(PlayerId, Vec<Option<TownId>>)> = (0..40u64)
        .map(|raw| {
            let moves = (0..rng.gen_range(1..30))
                .map(|_| {
                    if rng.gen_bool(0.15) {
                        None
                    } else {
                        Some(towns[rng.gen_range(0..towns.len())])
                    }
                })
                .collect();
            (PlayerId::new(raw), moves)
        })
        .collect();

    let reconciler = reconciler();
    thread::scope(|scope| {
        for (player, moves) in &schedules {
            let reconciler = &reconciler;
            scope.spawn(move || {
                for step in moves {
                    match step {
                        Some(town) => reconciler.on_enter(*player, *town),
                        None => reconciler.on_logout(*player),
                    };
                }
            });
        }
    });

    let finals: BTreeMap<PlayerId, Option<TownId>> = schedules
        .iter()
        .map(|(player, moves)| (*player, moves.last().copied().flatten()))
        .collect();
    let expected = expected_counts(&finals);

    for town in &towns {
        let actual = reconciler.tracker().enemy_count(*town).unwrap_or(0);
        assert_eq!(actual, expected.get(town).copied().unwrap_or(0), "{town}");
    }
    for (player, town) in &finals {
        assert_eq!(reconciler.presence_of(*player).map(|p| p.town), *town);
    }
}

#[test]
fn contested_town_grounds_friendly_players_under_load() {
    let flight = Arc::new(CountingFlight::default());
    let reconciler = Reconciler::new(Arc::new(OddEnemies), Arc::clone(&flight));
    let town = TownId::new(0);

    // Odd player 1 holds the town for the whole test
    reconciler.on_enter(PlayerId::new(1), town);

    (0..50u64).into_par_iter().for_each(|i| {
        let friendly = PlayerId::new(i * 2 + 2);
        let report = reconciler.on_enter(friendly, town);
        assert_eq!(report.revoked, vec![friendly]);
    });

    assert_eq!(reconciler.tracker().enemy_count(town), Some(1));
    assert_eq!(reconciler.occupants(town).len(), 51);

    let calls = flight.calls.lock().unwrap();
    assert_eq!(calls.len(), 51);
    assert!(calls.iter().all(|(_, granted)| !granted));
}

#[test]
fn clear_during_revoke_leaves_friendly_flying() {
    let flight = Arc::new(InterruptingFlight::default());
    let reconciler = Arc::new(Reconciler::new(Arc::new(OddEnemies), Arc::clone(&flight)));
    let town = TownId::new(0);
    let enemy = PlayerId::new(1);
    let friendly = PlayerId::new(2);

    reconciler.on_enter(enemy, town);
    flight.inner.grant_flight(friendly).unwrap();

    // The enemy leaves while the friendly player's revoke is half done
    let inner = Arc::clone(&reconciler);
    flight.on_revoke(friendly, move || {
        let report = inner.on_exit(enemy, town);
        assert!(report.cleared(town));
    });
    let report = reconciler.on_enter(friendly, town);

    assert!(!reconciler.town_is_contested(town));
    assert_eq!(report.revoked, vec![friendly]);
    assert_eq!(report.granted, vec![friendly]);
    assert!(flight.is_flying(friendly));
}
