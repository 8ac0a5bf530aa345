//! End-to-end classification scenarios through the engine.
//!
//! Each scenario builds one subject, asks the engine for a persona at
//! ANCHOR, and checks both the choice and the decision trace behind it.

mod common;

use common::{anchor, ctx, end_minus, engine_with, HistoryBuilder};
use spendsense_core::{
    error::SignalError,
    model::{PaymentChannel, SubjectHistory},
    persona::Persona,
    trace::TieBreakStep,
    window::{DataAvailability, WindowType},
};

/// One card at 68 % utilization, history old enough for the FULL tier.
fn scenario_a() -> SubjectHistory {
    HistoryBuilder::new("scn-a")
        .checking("chk", 2_000.0)
        .credit_card("card", 3_400.0, 5_000.0)
        .spend("chk", end_minus(59), 40.0, "Corner Grocery")
        .spend("chk", end_minus(5), 50.0, "Corner Grocery")
        .build()
}

/// Checking and savings, no credit, no growth.
fn scenario_b() -> SubjectHistory {
    HistoryBuilder::new("scn-b")
        .checking("chk", 1_500.0)
        .savings("sav", 3_000.0)
        .spend("chk", end_minus(39), 60.0, "Corner Grocery")
        .build()
}

/// Payroll every 60 days, half a month of buffer, four $15 subscriptions.
fn scenario_c() -> SubjectHistory {
    let mut b = HistoryBuilder::new("scn-c")
        .checking("chk", 515.0)
        .spend("chk", end_minus(179), 40.0, "Corner Grocery");
    for offset in [170, 110, 50] {
        b = b.paycheck("chk", end_minus(offset), 3_000.0, "Acme Payroll");
    }
    for merchant in ["StreamFlix", "CloudBox", "TuneBox", "NewsDaily"] {
        for offset in [75, 45, 15] {
            b = b.charge("chk", end_minus(offset), 15.0, merchant);
        }
    }
    // Rent spans 150 days, so it never reads as a subscription.
    for offset in [165, 135, 105, 75, 45, 15] {
        b = b.spend("chk", end_minus(offset), 1_000.0, "Landlord");
    }
    b.build()
}

#[test]
fn scenario_a_high_utilization() {
    let mut engine = engine_with(vec![scenario_a()]);
    let a = engine.get_persona("scn-a", &ctx()).unwrap();

    assert_eq!(a.persona, Persona::HighUtilization);
    assert_eq!(a.priority, 1);
    let trace = &a.decision_trace;
    assert_eq!(trace.data_availability, DataAvailability::Full);
    assert_eq!(trace.window_type, Some(WindowType::Short));
    assert_eq!(trace.matched, vec![Persona::HighUtilization]);
    assert_eq!(trace.resolved_by, TieBreakStep::PriorityOrder);
    assert!(!trace.empty_match_fallback);
}

#[test]
fn scenario_b_credit_builder() {
    let mut engine = engine_with(vec![scenario_b()]);
    let a = engine.get_persona("scn-b", &ctx()).unwrap();

    assert_eq!(a.persona, Persona::CreditBuilder);
    assert_eq!(a.priority, 3);
    assert_eq!(a.decision_trace.matched, vec![Persona::CreditBuilder]);
}

#[test]
fn scenario_c_variable_income_beats_subscription_heavy() {
    let mut engine = engine_with(vec![scenario_c()]);
    let c = ctx();

    let record = engine.get_signals("scn-c", WindowType::Long, &c).unwrap();
    assert!(record.income.payroll_detected);
    assert_eq!(record.income.payroll_frequency_days, 60.0);
    assert!(record.income.income_buffer_months < 1.0);
    assert!((record.income.income_buffer_months - 0.5).abs() < 0.01);
    assert_eq!(record.subscriptions.recurring_merchant_count, 4);
    assert!((record.subscriptions.monthly_equivalent_spend - 60.0).abs() < 1e-6);

    let a = engine.get_persona("scn-c", &c).unwrap();
    let trace = &a.decision_trace;
    assert_eq!(trace.data_availability, DataAvailability::Extended);
    assert_eq!(trace.window_type, Some(WindowType::Long));
    assert!(trace.matched.contains(&Persona::VariableIncome));
    assert!(trace.matched.contains(&Persona::SubscriptionHeavy));
    assert_eq!(a.persona, Persona::VariableIncome);
    assert_eq!(a.priority, 2);
    assert_eq!(trace.top_priority, Some(2));

    let survivors: Vec<Persona> = trace
        .candidates
        .iter()
        .filter(|c| c.at_top_priority)
        .map(|c| c.persona)
        .collect();
    assert_eq!(survivors, vec![Persona::VariableIncome]);
}

#[test]
fn scenario_d_empty_short_window_defaults() {
    let history = HistoryBuilder::new("scn-d")
        .checking("chk", 500.0)
        .spend("chk", end_minus(59), 40.0, "Corner Grocery")
        .build();
    let mut engine = engine_with(vec![history]);

    let record = engine.get_signals("scn-d", WindowType::Short, &ctx()).unwrap();
    assert_eq!(record.subscriptions.recurring_merchant_count, 0);
    assert_eq!(record.subscriptions.spend_share, 0.0);
    assert_eq!(record.credit.max_utilization, 0.0);
    assert!(!record.income.payroll_detected);
    assert_eq!(record.income.income_buffer_months, 0.0);

    // No credit and a checking account: Credit-builder still applies.
    let a = engine.get_persona("scn-d", &ctx()).unwrap();
    assert_eq!(a.persona, Persona::CreditBuilder);
}

#[test]
fn new_subject_is_welcomed_without_matching() {
    let history = HistoryBuilder::new("new-1")
        .checking("chk", 100.0)
        .credit_card("card", 900.0, 1_000.0)
        .spend("chk", end_minus(2), 10.0, "Corner Grocery")
        .build();
    let mut engine = engine_with(vec![history]);

    let a = engine.get_persona("new-1", &ctx()).unwrap();
    assert_eq!(a.persona, Persona::Welcome);
    assert_eq!(a.priority, 0);
    assert_eq!(a.signal_strength, 0.0);
    assert_eq!(a.decision_trace.resolved_by, TieBreakStep::NewSubjectWelcome);
    assert_eq!(a.decision_trace.window_type, None);
    assert!(a.decision_trace.matched.is_empty());
    // Matching was bypassed, so nothing was computed or cached.
    assert_eq!(engine.cached_records(), 0);
}

#[test]
fn unknown_subject_is_welcomed() {
    let mut engine = engine_with(vec![]);
    let a = engine.get_persona("nobody", &ctx()).unwrap();
    assert_eq!(a.persona, Persona::Welcome);
    assert_eq!(a.decision_trace.data_availability, DataAvailability::New);
}

#[test]
fn nothing_matched_falls_back_to_the_lowest_priority_persona() {
    // 40 % utilization: too high for Savings-builder, too low for
    // High-utilization, and a card rules out Credit-builder.
    let history = HistoryBuilder::new("fb-1")
        .checking("chk", 800.0)
        .credit_card("card", 400.0, 1_000.0)
        .spend("chk", end_minus(45), 30.0, "Corner Grocery")
        .spend("chk", end_minus(3), 30.0, "Corner Grocery")
        .build();
    let mut engine = engine_with(vec![history]);

    let a = engine.get_persona("fb-1", &ctx()).unwrap();
    assert_eq!(a.persona, Persona::SavingsBuilder);
    assert_eq!(a.priority, 5);
    assert!(a.decision_trace.empty_match_fallback);
    assert_eq!(a.decision_trace.resolved_by, TieBreakStep::EmptyMatchFallback);
    assert!(a.decision_trace.matched.is_empty());

    let fallback_events = engine
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, spendsense_core::event::EngineEvent::EmptyMatchFallback { .. }))
        .count();
    assert_eq!(fallback_events, 1);
}

#[test]
fn every_scenario_yields_exactly_one_persona_with_a_complete_trace() {
    let mut engine = engine_with(vec![scenario_a(), scenario_b(), scenario_c()]);
    let assignments = engine.assign_all(&ctx()).unwrap();
    assert_eq!(assignments.len(), 3);

    for a in &assignments {
        let trace = &a.decision_trace;
        assert_eq!(trace.chosen, a.persona);
        assert_eq!(trace.chosen_priority, a.priority);
        assert_eq!(trace.anchor_date, ctx().anchor_date);
        assert_eq!(trace.recorded_at, ctx().now);
        assert!(trace.strength_components.is_some());
        assert!((0.0..=5.0).contains(&a.signal_strength));
        if !trace.empty_match_fallback {
            assert!(trace.matched.contains(&a.persona));
        }
    }
    let ids: Vec<&str> = assignments.iter().map(|a| a.subject_id.as_str()).collect();
    assert_eq!(ids, vec!["scn-a", "scn-b", "scn-c"]);
}

#[test]
fn a_card_refund_does_not_read_as_minimum_payment_behaviour() {
    let history = HistoryBuilder::new("scn-refund")
        .checking("chk", 1_200.0)
        .credit_card("card", 100.0, 1_000.0)
        .liability("card", 25.0, false)
        .spend("chk", end_minus(40), 30.0, "Corner Grocery")
        .spend("card", end_minus(12), 60.0, "Book Nook")
        .txn(
            "card",
            end_minus(2),
            25.0,
            Some("Book Nook"),
            &["GENERAL_MERCHANDISE"],
            PaymentChannel::InStore,
            false,
        )
        .build();

    let mut engine = engine_with(vec![history]);
    let a = engine.get_persona("scn-refund", &ctx()).unwrap();
    assert_ne!(a.persona, Persona::HighUtilization);
    assert!(!a.decision_trace.matched.contains(&Persona::HighUtilization));
}

#[test]
fn transfers_only_leave_the_buffer_unmeasured_and_not_variable_income() {
    let mut b = HistoryBuilder::new("scn-xfer")
        .checking("chk", 20_000.0)
        .transfer_in("chk", end_minus(179), 100.0);
    for offset in [170, 110, 50] {
        b = b.paycheck("chk", end_minus(offset), 3_000.0, "Acme Payroll");
    }
    for offset in [160, 100, 40] {
        b = b.txn(
            "chk",
            end_minus(offset),
            -2_500.0,
            None,
            &["TRANSFER_OUT"],
            PaymentChannel::Online,
            false,
        );
    }
    let mut engine = engine_with(vec![b.build()]);

    let record = engine.get_signals("scn-xfer", WindowType::Long, &ctx()).unwrap();
    assert!(record.income.payroll_detected);
    assert!(record.income.payroll_frequency_days > 45.0);
    assert!(!record.income.buffer_measured);

    let a = engine.get_persona("scn-xfer", &ctx()).unwrap();
    assert_eq!(a.decision_trace.window_type, Some(WindowType::Long));
    assert!(!a.decision_trace.matched.contains(&Persona::VariableIncome));
}

#[test]
fn persona_for_an_anchor_before_all_data_is_an_invalid_window() {
    let history = HistoryBuilder::new("scn-future")
        .checking("chk", 800.0)
        .spend("chk", anchor() + chrono::Duration::days(40), 25.0, "Corner Grocery")
        .spend("chk", anchor() + chrono::Duration::days(200), 25.0, "Corner Grocery")
        .build();
    let mut engine = engine_with(vec![history]);

    let signals = engine.get_signals("scn-future", WindowType::Short, &ctx()).unwrap_err();
    assert!(signals.is_invalid_window());

    let persona = engine.get_persona("scn-future", &ctx()).unwrap_err();
    assert!(persona.is_invalid_window());
    assert!(matches!(persona, SignalError::AnchorBeforeData { .. }));
    assert!(engine.current_persona("scn-future").is_none());
    assert!(engine.drain_events().is_empty());
}
