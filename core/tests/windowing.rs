//! Window partitioning and data-availability tests.

mod common;

use chrono::Duration;
use common::{anchor, end_minus, random_history, HistoryBuilder};
use spendsense_core::{
    error::SignalError,
    window::{DataAvailability, WindowPartitioner, WindowType},
};

#[test]
fn window_ends_the_day_before_the_anchor() {
    let history = HistoryBuilder::new("w-1")
        .checking("chk", 100.0)
        .spend("chk", end_minus(200), 10.0, "Corner Grocery")
        .build();

    for wt in [WindowType::Short, WindowType::Long] {
        let slice = WindowPartitioner::partition(&history, wt, anchor()).unwrap();
        assert_eq!(slice.window.end_date, anchor() - Duration::days(1));
        assert_eq!(slice.window.length_days(), wt.length_days());
        assert_eq!(
            (slice.window.end_date - slice.window.start_date).num_days() + 1,
            wt.length_days()
        );
    }
}

#[test]
fn boundaries_are_inclusive_and_the_anchor_day_is_excluded() {
    let history = HistoryBuilder::new("w-2")
        .checking("chk", 100.0)
        .spend("chk", end_minus(30), 1.0, "Before Start")
        .spend("chk", end_minus(29), 2.0, "First Day")
        .spend("chk", end_minus(0), 3.0, "Last Day")
        .spend("chk", anchor(), 4.0, "Anchor Day")
        .build();

    let slice = WindowPartitioner::partition(&history, WindowType::Short, anchor()).unwrap();
    let merchants: Vec<&str> = slice
        .transactions
        .iter()
        .filter_map(|t| t.merchant.as_deref())
        .collect();
    assert_eq!(merchants, vec!["First Day", "Last Day"]);
}

#[test]
fn pending_transactions_never_enter_a_slice() {
    let history = HistoryBuilder::new("w-3")
        .checking("chk", 100.0)
        .spend("chk", end_minus(10), 20.0, "Settled")
        .pending_spend("chk", end_minus(5), 999.0, "Pending")
        .build();

    let slice = WindowPartitioner::partition(&history, WindowType::Short, anchor()).unwrap();
    assert_eq!(slice.transactions.len(), 1);
    assert!(slice.transactions.iter().all(|t| !t.pending));
}

#[test]
fn slice_is_ordered_by_date_then_id() {
    let history = HistoryBuilder::new("w-4")
        .checking("chk", 100.0)
        .spend("chk", end_minus(1), 1.0, "b")
        .spend("chk", end_minus(9), 1.0, "a")
        .spend("chk", end_minus(1), 1.0, "c")
        .build();

    let slice = WindowPartitioner::partition(&history, WindowType::Short, anchor()).unwrap();
    let ids: Vec<&str> = slice.transactions.iter().map(|t| t.transaction_id.as_str()).collect();
    assert_eq!(ids, vec!["w-4-t0002", "w-4-t0001", "w-4-t0003"]);
}

#[test]
fn anchor_before_earliest_data_is_an_invalid_window() {
    let history = HistoryBuilder::new("w-5")
        .checking("chk", 100.0)
        .spend("chk", end_minus(10), 5.0, "Corner Grocery")
        .build();

    let too_early = end_minus(20);
    let err = WindowPartitioner::partition(&history, WindowType::Short, too_early).unwrap_err();
    assert!(err.is_invalid_window());
    assert!(matches!(err, SignalError::AnchorBeforeData { .. }));
}

#[test]
fn empty_history_partitions_to_an_empty_slice() {
    let history = HistoryBuilder::new("w-6").checking("chk", 50.0).build();
    let slice = WindowPartitioner::partition(&history, WindowType::Long, anchor()).unwrap();
    assert!(slice.transactions.is_empty());
    assert_eq!(slice.accounts.len(), 1);
}

#[test]
fn availability_tier_follows_earliest_settled_transaction() {
    let tier_for = |age: i64| {
        let history = HistoryBuilder::new("w-7")
            .checking("chk", 10.0)
            .spend("chk", anchor() - Duration::days(age), 1.0, "Corner Grocery")
            .build();
        DataAvailability::classify(&history, anchor())
    };
    assert_eq!(tier_for(6), DataAvailability::New);
    assert_eq!(tier_for(7), DataAvailability::Limited);
    assert_eq!(tier_for(29), DataAvailability::Limited);
    assert_eq!(tier_for(30), DataAvailability::Full);
    assert_eq!(tier_for(179), DataAvailability::Full);
    assert_eq!(tier_for(180), DataAvailability::Extended);
}

#[test]
fn pending_only_history_is_new() {
    let history = HistoryBuilder::new("w-8")
        .checking("chk", 10.0)
        .pending_spend("chk", end_minus(300), 1.0, "Pending")
        .build();
    assert_eq!(DataAvailability::classify(&history, anchor()), DataAvailability::New);
}

#[test]
fn random_histories_keep_window_arithmetic() {
    for seed in 0..40u64 {
        let history = random_history(seed, &format!("rand-{seed}"));
        for wt in [WindowType::Short, WindowType::Long] {
            let slice = WindowPartitioner::partition(&history, wt, anchor()).unwrap();
            assert_eq!(slice.window.end_date, anchor() - Duration::days(1), "seed {seed}");
            assert_eq!(slice.window.length_days(), wt.length_days(), "seed {seed}");
            assert!(
                slice.transactions.iter().all(|t| !t.pending && slice.window.contains(t.date)),
                "seed {seed}: slice leaked a pending or out-of-range transaction"
            );
        }
    }
}
