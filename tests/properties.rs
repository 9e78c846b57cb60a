//! Property-based tests for the reconciliation engine.
//!
//! Run with: `cargo test --test properties`

use care_billing::calculation::{ReconcileConfig, reconcile};
use care_billing::config::{ConfigLoader, SubstitutionRules};
use care_billing::models::{
    Approval, ApprovalLine, ApprovalUnit, Delivery, DeliveryLine, ServiceCode, TargetMonth,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

const CODES: [&str; 10] = [
    "LK01", "LK02", "LK03", "LK04", "LK05", "LK09", "LK13", "LK14", "LK15", "LK17A",
];

fn code(s: &str) -> ServiceCode {
    ServiceCode::parse(s).unwrap()
}

fn config(month: TargetMonth, budget: Decimal) -> ReconcileConfig {
    let loader = ConfigLoader::load("./config/berlin_lk").unwrap();
    loader.reconcile_config(month, budget, None).unwrap()
}

// ── Proptest Strategies ─────────────────────────────────────────────────────

fn arb_code() -> impl Strategy<Value = ServiceCode> {
    prop::sample::select(CODES.to_vec()).prop_map(code)
}

/// Quantities with up to one decimal place, 0 to 40.
fn arb_quantity() -> impl Strategy<Value = Decimal> {
    (0i64..=400).prop_map(|tenths| Decimal::new(tenths, 1))
}

fn arb_unit() -> impl Strategy<Value = ApprovalUnit> {
    prop_oneof![Just(ApprovalUnit::Weekly), Just(ApprovalUnit::Monthly)]
}

fn arb_approval() -> impl Strategy<Value = Approval> {
    prop::collection::vec(
        (arb_code(), arb_quantity(), arb_unit()).prop_map(|(code, quantity, unit)| ApprovalLine {
            code,
            quantity,
            unit,
        }),
        0..8,
    )
    .prop_map(Approval::new)
}

fn arb_delivery() -> impl Strategy<Value = Delivery> {
    prop::collection::vec(
        (arb_code(), (0u32..=30).prop_map(Decimal::from)).prop_map(|(c, q)| DeliveryLine::new(c, q)),
        0..10,
    )
    .prop_map(Delivery::new)
}

fn arb_month() -> impl Strategy<Value = TargetMonth> {
    (2025i32..=2026, 1u32..=12).prop_map(|(y, m)| TargetMonth::new(y, m).unwrap())
}

fn arb_budget() -> impl Strategy<Value = Decimal> {
    (0i64..300_000).prop_map(|cents| Decimal::new(cents, 2))
}

/// True if `code` takes part in any substitution rule.
fn is_substituted(rules: &SubstitutionRules, code: &ServiceCode) -> bool {
    let in_meal = rules
        .meal_downgrade
        .as_ref()
        .is_some_and(|m| &m.large_meal == code || &m.small_meal == code);
    let in_care = rules
        .care_downgrades
        .iter()
        .any(|r| &r.higher == code || &r.lower == code);
    in_meal || in_care
}

fn delivered_total(delivery: &Delivery, code: &ServiceCode) -> Decimal {
    delivery
        .lines
        .iter()
        .filter(|l| &l.code == code)
        .map(|l| l.quantity)
        .sum()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_untouched_codes_are_conserved(
        approval in arb_approval(),
        delivery in arb_delivery(),
        month in arb_month(),
    ) {
        let config = config(month, Decimal::ZERO);
        let result = reconcile(&approval, &delivery, &config).unwrap();
        let rules = SubstitutionRules::default();

        for c in CODES.iter().map(|c| code(c)).filter(|c| !is_substituted(&rules, c)) {
            let delivered = delivered_total(&delivery, &c);
            let insurer = result.insurer_quantity(&c);
            let private = result.private_quantity(&c);
            prop_assert_eq!(insurer + private, delivered, "{} not conserved", c);
            prop_assert!(insurer <= result.diagnostics.codes.get(&c).map_or(Decimal::ZERO, |d| d.ceiling));
        }
    }

    #[test]
    fn prop_total_quantity_is_conserved(
        approval in arb_approval(),
        delivery in arb_delivery(),
        month in arb_month(),
    ) {
        let result = reconcile(&approval, &delivery, &config(month, Decimal::ZERO)).unwrap();

        let delivered: Decimal = delivery.lines.iter().map(|l| l.quantity).sum();
        let billed: Decimal = result
            .diagnostics
            .codes
            .values()
            .map(|d| d.insurer + d.private)
            .sum();
        prop_assert_eq!(billed, delivered);

        for diagnostics in result.diagnostics.codes.values() {
            prop_assert!(diagnostics.insurer >= Decimal::ZERO);
            prop_assert!(diagnostics.private >= Decimal::ZERO);
        }
    }

    #[test]
    fn prop_totals_have_two_decimals_and_no_drift(
        approval in arb_approval(),
        delivery in arb_delivery(),
        month in arb_month(),
        budget in arb_budget(),
    ) {
        let result = reconcile(&approval, &delivery, &config(month, budget)).unwrap();

        for (lines, totals) in [
            (&result.insurer_lines, &result.insurer_totals),
            (&result.private_lines, &result.private_totals),
        ] {
            let summed: Decimal = lines.iter().map(|l| l.line_total).sum();
            prop_assert_eq!(summed, totals.subtotal);
            for amount in [
                totals.subtotal,
                totals.levy_surcharge,
                totals.investment_surcharge,
                totals.gross_total,
                totals.insurer_deduction,
                totals.payable,
            ] {
                prop_assert_eq!(amount.scale(), 2);
                prop_assert!(amount >= Decimal::ZERO);
            }
            prop_assert!(lines.iter().all(|l| l.quantity > Decimal::ZERO));
        }

        prop_assert!(result.insurer_totals.insurer_deduction <= budget);
    }

    #[test]
    fn prop_reconcile_is_idempotent(
        approval in arb_approval(),
        delivery in arb_delivery(),
        month in arb_month(),
        budget in arb_budget(),
    ) {
        let config = config(month, budget);
        let first = serde_json::to_string(&reconcile(&approval, &delivery, &config).unwrap()).unwrap();
        let second = serde_json::to_string(&reconcile(&approval, &delivery, &config).unwrap()).unwrap();
        prop_assert_eq!(first, second);
    }
}
