//! Invoice totals.
//!
//! Computes subtotal, levy surcharge, investment surcharge and gross total of
//! each invoice, then nets the insurer budget against the insurer invoice.
//! Every amount is rounded to cents where it is computed.

use rust_decimal::Decimal;

use crate::models::{AuditStep, BillableLine, Totals};

use super::rounding::round_money;

/// Investment cost surcharge rate applied when none is configured (3.38 %).
pub const DEFAULT_INVESTMENT_RATE: Decimal = Decimal::from_parts(338, 0, 0, false, 4);

/// The result of the totals stage, including both invoices and the audit step.
#[derive(Debug, Clone)]
pub struct InvoiceTotalsResult {
    /// Totals of the insurer invoice.
    pub insurer: Totals,
    /// Totals of the private invoice.
    pub private: Totals,
    /// True if the budget exceeded the insurer gross total.
    pub budget_covers_gross: bool,
    /// The audit step recording the calculation.
    pub audit_step: AuditStep,
}

/// Subtotal, levy surcharge, investment surcharge and gross total of one
/// line set. Deduction and payable are left at zero.
pub fn line_set_totals(lines: &[BillableLine], investment_rate: Decimal) -> Totals {
    let subtotal = round_money(lines.iter().map(|l| l.line_total).sum());
    let levy_surcharge = round_money(
        lines
            .iter()
            .filter(|l| l.is_levy)
            .map(|l| l.line_total)
            .sum(),
    );
    let investment_surcharge = round_money(subtotal * investment_rate);
    let gross_total = round_money(subtotal + investment_surcharge);

    Totals {
        subtotal,
        levy_surcharge,
        investment_surcharge,
        gross_total,
        ..Totals::zero()
    }
}

/// Computes the totals of both invoices.
///
/// The insurer budget is deducted from the insurer gross total. When the
/// budget exceeds a positive insurer gross total, the insurer still pays the
/// investment surcharge and the private invoice carries none.
///
/// # Example
///
/// ```
/// use care_billing::calculation::{calculate_totals, DEFAULT_INVESTMENT_RATE};
/// use care_billing::models::{BillableLine, ServiceCode};
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let line = BillableLine {
///     code: ServiceCode::parse("LK02").unwrap(),
///     quantity: Decimal::from(100),
///     unit_price: Decimal::from_str("9.61").unwrap(),
///     line_total: Decimal::from_str("961.00").unwrap(),
///     is_levy: false,
/// };
///
/// let result = calculate_totals(&[line], &[], DEFAULT_INVESTMENT_RATE, Decimal::from(500), 5);
/// // 961.00 + 32.48 investment surcharge - 500.00 budget
/// assert_eq!(result.insurer.payable.to_string(), "493.48");
/// ```
pub fn calculate_totals(
    insurer_lines: &[BillableLine],
    private_lines: &[BillableLine],
    investment_rate: Decimal,
    insurer_budget: Decimal,
    step_number: u32,
) -> InvoiceTotalsResult {
    let mut insurer = line_set_totals(insurer_lines, investment_rate);
    let mut private = line_set_totals(private_lines, investment_rate);

    let budget_covers_gross =
        insurer.gross_total > Decimal::ZERO && insurer.gross_total < insurer_budget;

    if budget_covers_gross {
        insurer.payable = insurer.investment_surcharge;
        insurer.insurer_deduction = round_money(insurer.gross_total - insurer.investment_surcharge);

        private.investment_surcharge = round_money(Decimal::ZERO);
        private.gross_total = private.subtotal;
    } else {
        insurer.insurer_deduction = round_money(insurer.gross_total.min(insurer_budget));
        insurer.payable =
            round_money((insurer.gross_total - insurer.insurer_deduction).max(Decimal::ZERO));
    }

    private.insurer_deduction = round_money(Decimal::ZERO);
    private.payable = private.gross_total;

    let reasoning = if budget_covers_gross {
        format!(
            "Budget {} exceeds insurer gross {}; insurer pays investment surcharge {} and private investment surcharge is waived",
            insurer_budget, insurer.gross_total, insurer.payable
        )
    } else {
        format!(
            "Insurer gross {} minus budget deduction {} = {}; private payable {}",
            insurer.gross_total, insurer.insurer_deduction, insurer.payable, private.payable
        )
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "invoice_totals".to_string(),
        rule_name: "Invoice Totals".to_string(),
        service_code: None,
        input: serde_json::json!({
            "insurer_lines": insurer_lines.len(),
            "private_lines": private_lines.len(),
            "investment_rate": investment_rate.to_string(),
            "insurer_budget": insurer_budget.to_string()
        }),
        output: serde_json::json!({
            "insurer_gross_total": insurer.gross_total.to_string(),
            "insurer_deduction": insurer.insurer_deduction.to_string(),
            "insurer_payable": insurer.payable.to_string(),
            "private_gross_total": private.gross_total.to_string(),
            "private_payable": private.payable.to_string(),
            "budget_covers_gross": budget_covers_gross
        }),
        reasoning,
    };

    InvoiceTotalsResult {
        insurer,
        private,
        budget_covers_gross,
        audit_step,
    }
}
