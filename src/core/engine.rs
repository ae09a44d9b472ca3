use super::config::{
    validate_brackets, validate_eligibility_threshold, validate_retirement_multiple,
};
use super::error::{EngineError, Result, ensure_finite, ensure_in_range, ensure_non_negative};
use super::types::{
    Eligibility, EligibilityAssessment, EligibilityInputs, EmiSchedule, LoanTerms,
    RetirementInputs, RetirementProjection, TaxAssessment, TaxBracket, TaxSlice,
};

const MONTHS_PER_YEAR: u32 = 12;

/// Marginal-rate tax over an ascending bracket table. Each bracket only taxes
/// the part of the taxable income above its lower bound and below its upper
/// bound.
pub fn compute_tax(
    annual_income: f64,
    deductions: f64,
    brackets: &[TaxBracket],
) -> Result<TaxAssessment> {
    ensure_non_negative(annual_income, "annual income")?;
    ensure_non_negative(deductions, "deductions")?;
    validate_brackets(brackets)?;

    let taxable_income = (annual_income - deductions).max(0.0);

    let mut total_tax = 0.0;
    let mut slices = Vec::new();
    for bracket in brackets {
        if taxable_income <= bracket.lower {
            continue;
        }
        let taxed_amount = taxable_income.min(bracket.upper_or_infinity()) - bracket.lower;
        let tax = taxed_amount * bracket.rate;
        total_tax += tax;
        slices.push(TaxSlice {
            lower: bracket.lower,
            upper: bracket.upper,
            rate: bracket.rate,
            taxed_amount,
            tax,
        });
    }

    let effective_rate = if taxable_income > 0.0 {
        total_tax / taxable_income
    } else {
        0.0
    };

    Ok(TaxAssessment {
        taxable_income,
        total_tax,
        effective_rate,
        slices,
    })
}

pub fn compute_emi(terms: &LoanTerms) -> Result<EmiSchedule> {
    ensure_non_negative(terms.principal, "principal")?;
    ensure_non_negative(terms.annual_rate_percent, "annual interest rate")?;
    if terms.tenure_years == 0 {
        return Err(EngineError::NonPositiveTenure {
            field: "loan tenure",
        });
    }
    let months = terms
        .tenure_years
        .checked_mul(MONTHS_PER_YEAR)
        .ok_or(EngineError::OutOfRange {
            field: "loan tenure",
            min: 1.0,
            max: f64::from(u32::MAX / MONTHS_PER_YEAR),
        })?;

    let monthly_rate = terms.annual_rate_percent / (12.0 * 100.0);
    let n = f64::from(months);

    // (1 + r)^n - 1 is computed without cancellation so rates too small to
    // move 1.0 still amortize.
    let growth_minus_one = (n * monthly_rate.ln_1p()).exp_m1();
    let emi = if growth_minus_one <= 0.0 {
        terms.principal / n
    } else {
        terms.principal * installment_per_unit(monthly_rate, growth_minus_one)
    };

    let total_payment = emi * n;
    if !total_payment.is_finite() {
        return Err(EngineError::OutOfRange {
            field: "principal",
            min: 0.0,
            max: f64::MAX / (n * installment_per_unit(monthly_rate, growth_minus_one)),
        });
    }
    Ok(EmiSchedule {
        emi,
        months,
        total_payment,
        total_interest: (total_payment - terms.principal).max(0.0),
    })
}

fn installment_per_unit(monthly_rate: f64, growth_minus_one: f64) -> f64 {
    if growth_minus_one.is_finite() {
        monthly_rate * ((growth_minus_one + 1.0) / growth_minus_one)
    } else {
        // Growth overflowed; the installment has converged to interest-only.
        monthly_rate
    }
}

pub fn classify_eligibility(
    inputs: &EligibilityInputs,
    threshold: f64,
) -> Result<EligibilityAssessment> {
    ensure_non_negative(inputs.annual_income, "annual income")?;
    ensure_non_negative(inputs.current_debts, "current debts")?;
    ensure_finite(inputs.proposed_loan_amount, "proposed loan amount")?;
    validate_eligibility_threshold(threshold)?;
    if inputs.annual_income == 0.0 {
        return Err(EngineError::ZeroIncomeDivision);
    }

    let debt_to_income_ratio = inputs.current_debts / inputs.annual_income;
    let eligibility = if debt_to_income_ratio < threshold {
        Eligibility::Eligible
    } else {
        Eligibility::NotEligible
    };

    Ok(EligibilityAssessment {
        debt_to_income_ratio,
        threshold,
        proposed_loan_amount: inputs.proposed_loan_amount,
        eligibility,
    })
}

/// Corpus needed at retirement (`multiple` times the inflated annual
/// expenses) and the flat monthly saving that closes the gap from today's
/// savings. A negative monthly figure means the target is already met.
pub fn project_retirement(
    inputs: &RetirementInputs,
    multiple: f64,
) -> Result<RetirementProjection> {
    ensure_non_negative(inputs.current_savings, "current savings")?;
    ensure_non_negative(inputs.annual_expenses, "annual expenses")?;
    ensure_in_range(inputs.inflation_rate, "inflation rate", 0.0, 1.0)?;
    validate_retirement_multiple(multiple)?;

    let years_to_retirement = inputs
        .retirement_age
        .checked_sub(inputs.current_age)
        .filter(|years| *years > 0)
        .ok_or(EngineError::NonPositiveTenure {
            field: "years to retirement",
        })?;

    let years = f64::from(years_to_retirement);
    let inflation_growth = (1.0 + inputs.inflation_rate).powf(years);
    if !inflation_growth.is_finite() {
        return Err(EngineError::OutOfRange {
            field: "years to retirement",
            min: 1.0,
            max: (f64::MAX.ln() / inputs.inflation_rate.ln_1p()).floor(),
        });
    }
    let future_annual_expenses = inputs.annual_expenses * inflation_growth;
    let savings_needed = future_annual_expenses * multiple;
    if !savings_needed.is_finite() {
        return Err(EngineError::OutOfRange {
            field: "annual expenses",
            min: 0.0,
            max: f64::MAX / (inflation_growth * multiple),
        });
    }
    let monthly_savings_required =
        (savings_needed - inputs.current_savings) / (years * f64::from(MONTHS_PER_YEAR));

    Ok(RetirementProjection {
        years_to_retirement,
        future_annual_expenses,
        savings_needed,
        monthly_savings_required,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{
        DEFAULT_ELIGIBILITY_THRESHOLD, DEFAULT_RETIREMENT_MULTIPLE, DEFAULT_TAX_BRACKETS,
    };
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn loan(principal: f64, annual_rate_percent: f64, tenure_years: u32) -> LoanTerms {
        LoanTerms {
            principal,
            annual_rate_percent,
            tenure_years,
        }
    }

    fn sample_retirement() -> RetirementInputs {
        RetirementInputs {
            current_age: 30,
            retirement_age: 60,
            current_savings: 0.0,
            annual_expenses: 500_000.0,
            inflation_rate: 0.06,
        }
    }

    fn eligibility_inputs(annual_income: f64, current_debts: f64) -> EligibilityInputs {
        EligibilityInputs {
            annual_income,
            current_debts,
            proposed_loan_amount: 1_000_000.0,
        }
    }

    #[test]
    fn tax_applies_marginal_rates_per_slab() {
        let tax = compute_tax(600_000.0, 0.0, &DEFAULT_TAX_BRACKETS).expect("valid inputs");
        assert_approx(tax.taxable_income, 600_000.0);
        assert_approx(tax.total_tax, 0.05 * 249_999.0 + 0.2 * 99_999.0);
        assert_approx(tax.total_tax, 32_499.75);
        assert_eq!(tax.slices.len(), 3);
        assert_approx(tax.slices[1].taxed_amount, 249_999.0);
        assert_approx(tax.slices[2].tax, 19_999.8);
    }

    #[test]
    fn tax_is_zero_when_deductions_cover_income() {
        let tax = compute_tax(400_000.0, 450_000.0, &DEFAULT_TAX_BRACKETS).expect("valid inputs");
        assert_eq!(tax.taxable_income, 0.0);
        assert_eq!(tax.total_tax, 0.0);
        assert_eq!(tax.effective_rate, 0.0);
        assert!(tax.slices.is_empty());
    }

    #[test]
    fn tax_reaches_top_bracket_for_high_income() {
        let tax = compute_tax(1_500_000.0, 100_000.0, &DEFAULT_TAX_BRACKETS).expect("valid inputs");
        let expected = 0.05 * 249_999.0 + 0.2 * 499_999.0 + 0.3 * 399_999.0;
        assert_approx(tax.taxable_income, 1_400_000.0);
        assert_approx(tax.total_tax, expected);
        assert_eq!(tax.slices.last().and_then(|s| s.upper), None);
    }

    #[test]
    fn tax_rejects_negative_income_and_deductions() {
        let err = compute_tax(-1.0, 0.0, &DEFAULT_TAX_BRACKETS).expect_err("negative income");
        assert_eq!(
            err,
            EngineError::NegativeInput {
                field: "annual income"
            }
        );
        let err = compute_tax(1.0, -5.0, &DEFAULT_TAX_BRACKETS).expect_err("negative deductions");
        assert_eq!(err, EngineError::NegativeInput { field: "deductions" });
    }

    #[test]
    fn tax_rejects_nan_income() {
        let err = compute_tax(f64::NAN, 0.0, &DEFAULT_TAX_BRACKETS).expect_err("nan income");
        assert_eq!(err.kind(), "non-finite-input");
    }

    #[test]
    fn tax_rejects_invalid_table() {
        let brackets = [TaxBracket::new(0.0, Some(100.0), 0.1)];
        let err = compute_tax(50.0, 0.0, &brackets).expect_err("bounded top bracket");
        assert_eq!(err.kind(), "invalid-bracket-table");
    }

    #[test]
    fn emi_matches_amortization_formula() {
        let schedule = compute_emi(&loan(1_000_000.0, 8.5, 20)).expect("valid loan");
        let r: f64 = 8.5 / 1200.0;
        let growth = (1.0 + r).powf(240.0);
        let expected = 1_000_000.0 * r * growth / (growth - 1.0);
        assert_approx(schedule.emi, expected);
        assert_eq!(schedule.months, 240);
        assert_approx(schedule.total_payment, expected * 240.0);
        assert_approx(schedule.total_interest, expected * 240.0 - 1_000_000.0);
    }

    #[test]
    fn emi_zero_rate_divides_principal_evenly() {
        let schedule = compute_emi(&loan(100_000.0, 0.0, 1)).expect("valid loan");
        assert_approx(schedule.emi, 100_000.0 / 12.0);
        assert_approx(schedule.total_interest, 0.0);
    }

    #[test]
    fn emi_with_negligible_rate_matches_zero_rate() {
        for rate in [1e-15, 1e-10] {
            let schedule = compute_emi(&loan(100_000.0, rate, 1)).expect("valid loan");
            assert_approx(schedule.emi, 100_000.0 / 12.0);
            assert_approx(schedule.total_interest, 0.0);

            let empty = compute_emi(&loan(0.0, rate, 1)).expect("valid loan");
            assert_eq!(empty.emi, 0.0);
            assert_eq!(empty.total_payment, 0.0);
        }
    }

    #[test]
    fn emi_rejects_principal_whose_installment_overflows() {
        let err = compute_emi(&loan(f64::MAX, 1_000.0, 1)).expect_err("installment overflows");
        assert_eq!(err.kind(), "out-of-range");
    }

    #[test]
    fn emi_of_zero_principal_is_zero() {
        for (rate, tenure) in [(0.0, 1), (7.0, 5), (18.0, 30)] {
            let schedule = compute_emi(&loan(0.0, rate, tenure)).expect("valid loan");
            assert_eq!(schedule.emi, 0.0);
        }
    }

    #[test]
    fn emi_rejects_zero_tenure_and_negative_inputs() {
        assert_eq!(
            compute_emi(&loan(1_000.0, 5.0, 0)).unwrap_err(),
            EngineError::NonPositiveTenure {
                field: "loan tenure"
            }
        );
        assert_eq!(
            compute_emi(&loan(-1.0, 5.0, 1)).unwrap_err().kind(),
            "negative-input"
        );
        assert_eq!(
            compute_emi(&loan(1.0, -5.0, 1)).unwrap_err().kind(),
            "negative-input"
        );
    }

    #[test]
    fn emi_stays_finite_at_tenure_bounds() {
        for tenure in [1, 30] {
            let schedule = compute_emi(&loan(5_000_000.0, 12.0, tenure)).expect("valid loan");
            assert!(schedule.emi.is_finite() && schedule.emi > 0.0);
        }
    }

    #[test]
    fn emi_converges_to_interest_only_when_growth_overflows() {
        let schedule = compute_emi(&loan(1_000.0, 1_000.0, 10_000)).expect("valid loan");
        assert!(schedule.emi.is_finite());
        assert_approx(schedule.emi, 1_000.0 * (1_000.0 / 1200.0));
    }

    #[test]
    fn eligibility_uses_forty_percent_threshold() {
        let eligible = classify_eligibility(
            &eligibility_inputs(100_000.0, 30_000.0),
            DEFAULT_ELIGIBILITY_THRESHOLD,
        )
        .expect("valid inputs");
        assert_approx(eligible.debt_to_income_ratio, 0.3);
        assert_eq!(eligible.eligibility, Eligibility::Eligible);

        let rejected = classify_eligibility(
            &eligibility_inputs(100_000.0, 50_000.0),
            DEFAULT_ELIGIBILITY_THRESHOLD,
        )
        .expect("valid inputs");
        assert_approx(rejected.debt_to_income_ratio, 0.5);
        assert_eq!(rejected.eligibility, Eligibility::NotEligible);
    }

    #[test]
    fn eligibility_ratio_at_threshold_is_not_eligible() {
        let at_threshold = classify_eligibility(
            &eligibility_inputs(100_000.0, 40_000.0),
            DEFAULT_ELIGIBILITY_THRESHOLD,
        )
        .expect("valid inputs");
        assert_eq!(at_threshold.eligibility, Eligibility::NotEligible);
    }

    #[test]
    fn eligibility_rejects_threshold_outside_half_open_unit_interval() {
        let inputs = eligibility_inputs(100_000.0, 0.0);
        for threshold in [0.0, -0.2, 1.5] {
            let err = classify_eligibility(&inputs, threshold).expect_err("bad threshold");
            assert_eq!(
                err,
                EngineError::OutOfRange {
                    field: "eligibility threshold",
                    min: 0.0,
                    max: 1.0,
                }
            );
        }
        let strictest = classify_eligibility(&inputs, 1.0).expect("1.0 is allowed");
        assert_eq!(strictest.eligibility, Eligibility::Eligible);
    }

    #[test]
    fn eligibility_rejects_zero_income() {
        let err = classify_eligibility(&eligibility_inputs(0.0, 10.0), 0.4)
            .expect_err("zero income is undefined");
        assert_eq!(err, EngineError::ZeroIncomeDivision);
    }

    #[test]
    fn eligibility_echoes_proposed_loan_without_using_it() {
        let mut inputs = eligibility_inputs(100_000.0, 10_000.0);
        let small = classify_eligibility(&inputs, 0.4).expect("valid inputs");
        inputs.proposed_loan_amount = 1e12;
        let huge = classify_eligibility(&inputs, 0.4).expect("valid inputs");
        assert_eq!(small.eligibility, huge.eligibility);
        assert_eq!(huge.proposed_loan_amount, 1e12);
    }

    #[test]
    fn retirement_matches_closed_form() {
        let projection =
            project_retirement(&sample_retirement(), DEFAULT_RETIREMENT_MULTIPLE).expect("valid");
        let future = 500_000.0 * (1.0_f64 + 0.06).powf(30.0);
        let needed = future * 25.0;
        assert_eq!(projection.years_to_retirement, 30);
        assert_eq!(projection.future_annual_expenses, future);
        assert_eq!(projection.savings_needed, needed);
        assert_eq!(projection.monthly_savings_required, needed / 360.0);
    }

    #[test]
    fn retirement_rejects_horizon_where_inflation_overflows() {
        for annual_expenses in [0.0, 1_000.0] {
            let inputs = RetirementInputs {
                current_age: 0,
                retirement_age: 2_000,
                current_savings: 0.0,
                annual_expenses,
                inflation_rate: 1.0,
            };
            let err = project_retirement(&inputs, 25.0).expect_err("2^2000 overflows");
            let EngineError::OutOfRange { field, max, .. } = err else {
                panic!("expected out-of-range, got {err:?}");
            };
            assert_eq!(field, "years to retirement");
            assert!((1_023.0..=1_024.0).contains(&max));
        }
    }

    #[test]
    fn retirement_rejects_expenses_whose_corpus_overflows() {
        let inputs = RetirementInputs {
            current_age: 30,
            retirement_age: 130,
            current_savings: 0.0,
            annual_expenses: 1e306,
            inflation_rate: 1.0,
        };
        let err = project_retirement(&inputs, 25.0).expect_err("corpus overflows");
        assert_eq!(err.kind(), "out-of-range");
        assert!(err.to_string().contains("annual expenses"));
    }

    #[test]
    fn retirement_over_funded_yields_negative_monthly_saving() {
        let mut inputs = sample_retirement();
        inputs.annual_expenses = 10_000.0;
        inputs.inflation_rate = 0.0;
        inputs.current_savings = 1_000_000.0;
        let projection = project_retirement(&inputs, 25.0).expect("valid");
        assert_approx(projection.savings_needed, 250_000.0);
        assert_approx(projection.monthly_savings_required, -750_000.0 / 360.0);
    }

    #[test]
    fn retirement_rejects_non_positive_horizon() {
        let mut inputs = sample_retirement();
        inputs.retirement_age = inputs.current_age;
        assert_eq!(
            project_retirement(&inputs, 25.0).unwrap_err().kind(),
            "non-positive-tenure"
        );
        inputs.retirement_age = inputs.current_age - 1;
        assert_eq!(
            project_retirement(&inputs, 25.0).unwrap_err().kind(),
            "non-positive-tenure"
        );
    }

    #[test]
    fn retirement_rejects_inflation_outside_unit_interval() {
        let mut inputs = sample_retirement();
        inputs.inflation_rate = 1.5;
        assert_eq!(
            project_retirement(&inputs, 25.0).unwrap_err().kind(),
            "out-of-range"
        );
    }

    #[test]
    fn retirement_multiple_is_configurable() {
        let base = project_retirement(&sample_retirement(), 25.0).expect("valid");
        let conservative = project_retirement(&sample_retirement(), 30.0).expect("valid");
        assert_approx(
            conservative.savings_needed / base.savings_needed,
            30.0 / 25.0,
        );
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_tax_is_non_negative_and_bounded_by_top_rate(
            income in 0u32..50_000_000,
            deductions in 0u32..2_000_000
        ) {
            let tax = compute_tax(income as f64, deductions as f64, &DEFAULT_TAX_BRACKETS).unwrap();
            prop_assert!(tax.taxable_income >= 0.0);
            prop_assert!(tax.total_tax >= 0.0);
            prop_assert!(tax.total_tax <= tax.taxable_income * 0.3 + 1e-6);
        }

        #[test]
        fn prop_tax_is_monotonic_in_income(
            income in 0u32..20_000_000,
            raise in 0u32..2_000_000
        ) {
            let lower = compute_tax(income as f64, 0.0, &DEFAULT_TAX_BRACKETS).unwrap();
            let higher = compute_tax(income as f64 + raise as f64, 0.0, &DEFAULT_TAX_BRACKETS).unwrap();
            prop_assert!(higher.total_tax + 1e-9 >= lower.total_tax);
        }

        #[test]
        fn prop_tax_slices_sum_to_total(income in 0u32..20_000_000) {
            let tax = compute_tax(income as f64, 0.0, &DEFAULT_TAX_BRACKETS).unwrap();
            let sum: f64 = tax.slices.iter().map(|s| s.tax).sum();
            prop_assert!((sum - tax.total_tax).abs() <= 1e-6);
        }

        #[test]
        fn prop_emi_repays_at_least_principal(
            principal in 0u32..50_000_000,
            rate_bp in 0u32..3_000,
            tenure in 1u32..=30
        ) {
            let schedule = compute_emi(&loan(principal as f64, rate_bp as f64 / 100.0, tenure)).unwrap();
            prop_assert!(schedule.emi.is_finite());
            prop_assert!(schedule.emi >= 0.0);
            prop_assert!(schedule.total_payment + 1e-6 >= principal as f64);
        }

        #[test]
        fn prop_emi_with_tiny_rate_is_finite_and_near_even_split(
            principal in 0u32..50_000_000,
            rate in 0.0f64..1e-9,
            tenure in 1u32..=30
        ) {
            let schedule = compute_emi(&loan(principal as f64, rate, tenure)).unwrap();
            let even = principal as f64 / (tenure as f64 * 12.0);
            prop_assert!(schedule.emi.is_finite());
            prop_assert!((schedule.emi - even).abs() <= even * 1e-9 + 1e-9);
        }

        #[test]
        fn prop_eligibility_matches_ratio_threshold(
            income in 1u32..10_000_000,
            debts in 0u32..10_000_000
        ) {
            let assessment = classify_eligibility(&eligibility_inputs(income as f64, debts as f64), 0.4).unwrap();
            let expected = if (debts as f64) / (income as f64) < 0.4 {
                Eligibility::Eligible
            } else {
                Eligibility::NotEligible
            };
            prop_assert_eq!(assessment.eligibility, expected);
        }

        #[test]
        fn prop_calls_are_bit_identical(
            income in 0u32..5_000_000,
            rate_bp in 0u32..2_500,
            tenure in 1u32..=30,
            current_age in 18u32..60,
            span in 1u32..40,
            inflation_bp in 0u32..=10_000
        ) {
            let a = compute_tax(income as f64, 0.0, &DEFAULT_TAX_BRACKETS).unwrap();
            let b = compute_tax(income as f64, 0.0, &DEFAULT_TAX_BRACKETS).unwrap();
            prop_assert_eq!(a.total_tax.to_bits(), b.total_tax.to_bits());

            let terms = loan(income as f64, rate_bp as f64 / 100.0, tenure);
            let a = compute_emi(&terms).unwrap();
            let b = compute_emi(&terms).unwrap();
            prop_assert_eq!(a.emi.to_bits(), b.emi.to_bits());

            let inputs = RetirementInputs {
                current_age,
                retirement_age: current_age + span,
                current_savings: 0.0,
                annual_expenses: income as f64,
                inflation_rate: inflation_bp as f64 / 10_000.0,
            };
            let a = project_retirement(&inputs, 25.0).unwrap();
            let b = project_retirement(&inputs, 25.0).unwrap();
            prop_assert_eq!(
                a.monthly_savings_required.to_bits(),
                b.monthly_savings_required.to_bits()
            );
        }
    }
}
