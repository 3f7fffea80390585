//! Voucher line normalization.
//!
//! Expands a raw line array into the canonical line set that gets
//! persisted: 1-based line numbers in input order, tax sub-lines
//! synthesized from embedded tax descriptors, and the double-entry balance
//! enforced over the expanded set.

use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::{DrCr, NormalizedVoucher, VoucherLine, VoucherTotals};

/// Expands and validates a raw voucher line array.
pub struct VoucherNormalizer;

impl VoucherNormalizer {
    /// Normalizes a raw line array into the canonical line set.
    ///
    /// Previously synthesized tax lines in the input are dropped and
    /// re-derived from the embedded tax descriptors, which makes
    /// normalization idempotent across the update path.
    ///
    /// # Errors
    ///
    /// Returns a structural error when a line amount is negative, a tax
    /// descriptor has no account, or the expanded set does not balance.
    pub fn normalize(lines: &[VoucherLine]) -> Result<NormalizedVoucher, LedgerError> {
        let mut base_lines: Vec<VoucherLine> = Vec::with_capacity(lines.len());
        let mut tax_lines: Vec<VoucherLine> = Vec::new();
        let mut debit_total = Decimal::ZERO;
        let mut credit_total = Decimal::ZERO;

        for line in lines.iter().filter(|l| !l.is_tax_line) {
            let mut base = line.clone();
            base.line_no = u32::try_from(base_lines.len()).unwrap_or(u32::MAX) + 1;
            base.base_line_no = None;

            if base.amount < Decimal::ZERO {
                return Err(LedgerError::NegativeAmount {
                    line_no: base.line_no,
                });
            }
            accumulate(&base, &mut debit_total, &mut credit_total);

            if let Some(tax) = base.tax.clone().filter(|t| t.amount != Decimal::ZERO) {
                if tax.amount < Decimal::ZERO {
                    return Err(LedgerError::NegativeAmount {
                        line_no: base.line_no,
                    });
                }
                let Some(tax_account) = tax.account_code.filter(|c| !c.trim().is_empty()) else {
                    return Err(LedgerError::TaxAccountNotConfigured {
                        line_no: base.line_no,
                    });
                };

                let tax_line = VoucherLine {
                    account_code: tax_account,
                    drcr: tax.side.unwrap_or(base.drcr),
                    amount: tax.amount,
                    is_tax_line: true,
                    base_line_no: Some(base.line_no),
                    ..VoucherLine::default()
                };
                accumulate(&tax_line, &mut debit_total, &mut credit_total);
                tax_lines.push(tax_line);
            }

            base_lines.push(base);
        }

        if base_lines.is_empty() {
            return Err(LedgerError::EmptyVoucher);
        }

        if debit_total != credit_total {
            return Err(LedgerError::Unbalanced {
                debit: debit_total,
                credit: credit_total,
            });
        }

        // Tax lines are appended after all base lines so that the final
        // resequencing leaves base line numbers, and therefore the
        // base_line_no back-pointers, untouched.
        let mut all_lines = base_lines;
        all_lines.append(&mut tax_lines);
        for (index, line) in all_lines.iter_mut().enumerate() {
            line.line_no = u32::try_from(index).unwrap_or(u32::MAX) + 1;
        }

        Ok(NormalizedVoucher {
            lines: all_lines,
            totals: VoucherTotals::new(debit_total, credit_total),
        })
    }
}

fn accumulate(line: &VoucherLine, debit_total: &mut Decimal, credit_total: &mut Decimal) {
    match line.drcr {
        DrCr::Debit => *debit_total += line.amount,
        DrCr::Credit => *credit_total += line.amount,
    }
}


/// Property-based tests for the balance invariant.
#[cfg(test)]
mod props {
    use super::*;
    use crate::ledger::types::TaxInput;
    use proptest::prelude::*;

    fn amount_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..1_000_000i64).prop_map(Decimal::from)
    }

    fn balanced_lines_strategy() -> impl Strategy<Value = Vec<VoucherLine>> {
        prop::collection::vec(amount_strategy(), 1..8).prop_map(|amounts| {
            let mut lines: Vec<VoucherLine> = amounts
                .iter()
                .map(|&amount| VoucherLine {
                    account_code: "5200".to_string(),
                    drcr: DrCr::Debit,
                    amount,
                    ..VoucherLine::default()
                })
                .collect();
            let total: Decimal = amounts.iter().copied().sum();
            lines.push(VoucherLine {
                account_code: "1110".to_string(),
                drcr: DrCr::Credit,
                amount: total,
                ..VoucherLine::default()
            });
            lines
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Any balanced line set is accepted and its totals agree.
        #[test]
        fn prop_balanced_sets_accepted(lines in balanced_lines_strategy()) {
            let normalized = VoucherNormalizer::normalize(&lines).unwrap();
            prop_assert!(normalized.totals.is_balanced);
            prop_assert_eq!(
                normalized.totals.debit_total,
                normalized.totals.credit_total
            );
        }

        /// Perturbing one side of a balanced set is always rejected.
        #[test]
        fn prop_unbalanced_sets_rejected(
            lines in balanced_lines_strategy(),
            extra in amount_strategy(),
        ) {
            let mut lines = lines;
            if let Some(last) = lines.last_mut() {
                last.amount += extra;
            }
            let is_unbalanced = matches!(
                VoucherNormalizer::normalize(&lines),
                Err(LedgerError::Unbalanced { .. })
            );
            prop_assert!(is_unbalanced);
        }

        /// Tax amounts participate in the balance on the chosen side.
        #[test]
        fn prop_tax_counts_toward_balance(
            base in amount_strategy(),
            tax_amount in amount_strategy(),
        ) {
            let mut expense = VoucherLine {
                account_code: "5200".to_string(),
                drcr: DrCr::Debit,
                amount: base,
                ..VoucherLine::default()
            };
            expense.tax = Some(TaxInput {
                amount: tax_amount,
                account_code: Some("2301".to_string()),
                ..TaxInput::default()
            });
            let funding = VoucherLine {
                account_code: "1110".to_string(),
                drcr: DrCr::Credit,
                amount: base + tax_amount,
                ..VoucherLine::default()
            };

            let normalized = VoucherNormalizer::normalize(&[expense, funding]).unwrap();
            prop_assert_eq!(normalized.totals.debit_total, base + tax_amount);
            prop_assert!(normalized.totals.is_balanced);
        }

        /// Line numbers are always a 1-based contiguous sequence.
        #[test]
        fn prop_line_numbers_contiguous(lines in balanced_lines_strategy()) {
            let normalized = VoucherNormalizer::normalize(&lines).unwrap();
            for (index, line) in normalized.lines.iter().enumerate() {
                prop_assert_eq!(line.line_no as usize, index + 1);
            }
        }
    }
}
