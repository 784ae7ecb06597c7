//! # Shift Accrual
//!
//! Cash-register session rules: which bucket a movement lands in, and the
//! arithmetic of closing a drawer.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   open(start 500.00)                                                    │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   ┌─────────┐  accrue(cash 400.00)   cash_sales     += 400.00          │
//! │   │  OPEN   │  accrue(card  75.00)   card_sales     +=  75.00          │
//! │   │         │  supplier cash payout  expenses_total +=  20.00          │
//! │   └────┬────┘                                                           │
//! │        │ close(end 880.00)                                              │
//! │        │   expected   = 500 + 400 - 20 = 880.00                         │
//! │        │   difference = end - expected = 0.00                           │
//! │        ▼                                                                │
//! │   ┌─────────┐                                                           │
//! │   │ CLOSED  │  terminal, frozen                                         │
//! │   └─────────┘                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Routing Table
//! | Source              | CASH           | CARD        | TRANSFER        | OTHER |
//! |---------------------|----------------|-------------|-----------------|-------|
//! | Receivable payment  | cash_sales     | card_sales  | transfer_sales  | -     |
//! | Payable payment     | expenses_total | -           | -               | -     |
//! | Register sale       | cash_sales     | card_sales  | transfer_sales  | -     |
//!
//! Non-cash payable payments never touch the drawer.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{
    AccrualBucket, InstrumentKind, PaymentMethod, Shift, ShiftClose, ShiftStatus, ShiftTotals,
};
use crate::validation::{validate_actor, validate_cash_amount, validate_notes};

/// Bucket a sale tender accrues into.
pub fn sale_bucket(method: PaymentMethod) -> Option<AccrualBucket> {
    match method {
        PaymentMethod::Cash => Some(AccrualBucket::CashSales),
        PaymentMethod::Card => Some(AccrualBucket::CardSales),
        PaymentMethod::Transfer => Some(AccrualBucket::TransferSales),
        PaymentMethod::Other => None,
    }
}

/// Bucket a debt payment accrues into.
pub fn payment_bucket(kind: InstrumentKind, method: PaymentMethod) -> Option<AccrualBucket> {
    match kind {
        InstrumentKind::Receivable => sale_bucket(method),
        InstrumentKind::Payable => match method {
            PaymentMethod::Cash => Some(AccrualBucket::Expenses),
            PaymentMethod::Card | PaymentMethod::Transfer | PaymentMethod::Other => None,
        },
    }
}

impl ShiftTotals {
    fn validate(&self) -> CoreResult<()> {
        validate_cash_amount("cash sales", self.cash_sales)?;
        validate_cash_amount("card sales", self.card_sales)?;
        validate_cash_amount("transfer sales", self.transfer_sales)?;
        validate_cash_amount("expenses total", self.expenses_total)?;
        Ok(())
    }
}

impl Shift {
    /// Builds a new OPEN shift with zeroed accruals.
    pub fn open(
        store_id: &str,
        opened_by: &str,
        start_balance: Money,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        validate_actor(opened_by)?;
        validate_cash_amount("start balance", start_balance)?;

        Ok(Shift {
            id: Uuid::new_v4().to_string(),
            store_id: store_id.to_string(),
            status: ShiftStatus::Open,
            opened_by: opened_by.to_string(),
            start_time: now,
            start_balance_cents: start_balance.cents(),
            cash_sales_cents: 0,
            card_sales_cents: 0,
            transfer_sales_cents: 0,
            expenses_total_cents: 0,
            end_balance_cents: None,
            expected_balance_cents: None,
            difference_cents: None,
            closed_by: None,
            end_time: None,
            notes: None,
            updated_at: now,
        })
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if self.status != ShiftStatus::Open {
            return Err(CoreError::AlreadyClosed {
                shift_id: self.id.clone(),
            });
        }
        Ok(())
    }

    /// In-memory model of the persisted `column = column + amount` accrual.
    /// Rejected once the shift is closed.
    #[cfg(test)]
    fn accrue(&mut self, bucket: AccrualBucket, amount: Money) -> CoreResult<()> {
        self.ensure_open()?;
        if !amount.is_positive() {
            return Err(crate::error::ValidationError::MustBePositive {
                field: "accrual amount".to_string(),
            }
            .into());
        }

        let slot = match bucket {
            AccrualBucket::CashSales => &mut self.cash_sales_cents,
            AccrualBucket::CardSales => &mut self.card_sales_cents,
            AccrualBucket::TransferSales => &mut self.transfer_sales_cents,
            AccrualBucket::Expenses => &mut self.expenses_total_cents,
        };
        *slot += amount.cents();
        Ok(())
    }

    /// Cash that should be in the drawer: start + cash sales - cash expenses.
    pub fn expected_cash(&self) -> Money {
        let totals = self.totals();
        self.start_balance() + totals.cash_sales - totals.expenses_total
    }

    /// Freezes the shift with its closing figures.
    ///
    /// Counted totals, when given, replace the accrued ones before the
    /// expected balance is derived.
    pub fn close(
        &mut self,
        close: &ShiftClose,
        closed_by: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        self.ensure_open()?;
        validate_actor(closed_by)?;
        validate_cash_amount("end balance", close.end_balance)?;
        validate_notes(close.notes.as_deref())?;
        if let Some(expected) = close.expected_balance {
            validate_cash_amount("expected balance", expected)?;
        }
        if let Some(totals) = &close.totals {
            totals.validate()?;
        }

        if let Some(totals) = close.totals {
            self.cash_sales_cents = totals.cash_sales.cents();
            self.card_sales_cents = totals.card_sales.cents();
            self.transfer_sales_cents = totals.transfer_sales.cents();
            self.expenses_total_cents = totals.expenses_total.cents();
        }

        let expected = close.expected_balance.unwrap_or_else(|| self.expected_cash());

        self.status = ShiftStatus::Closed;
        self.end_balance_cents = Some(close.end_balance.cents());
        self.expected_balance_cents = Some(expected.cents());
        self.difference_cents = Some((close.end_balance - expected).cents());
        self.closed_by = Some(closed_by.to_string());
        self.end_time = Some(now);
        if close.notes.is_some() {
            self.notes = close.notes.clone();
        }
        self.updated_at = now;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn open_shift(start: i64) -> Shift {
        Shift::open("store-1", "cashier-7", Money::from_cents(start), Utc::now()).unwrap()
    }

    #[test]
    fn test_routing_preserves_payable_asymmetry() {
        use PaymentMethod::*;

        assert_eq!(
            payment_bucket(InstrumentKind::Receivable, Cash),
            Some(AccrualBucket::CashSales)
        );
        assert_eq!(
            payment_bucket(InstrumentKind::Receivable, Card),
            Some(AccrualBucket::CardSales)
        );
        assert_eq!(
            payment_bucket(InstrumentKind::Receivable, Transfer),
            Some(AccrualBucket::TransferSales)
        );
        assert_eq!(payment_bucket(InstrumentKind::Receivable, Other), None);

        assert_eq!(
            payment_bucket(InstrumentKind::Payable, Cash),
            Some(AccrualBucket::Expenses)
        );
        for method in [Card, Transfer, Other] {
            assert_eq!(payment_bucket(InstrumentKind::Payable, method), None);
        }
    }

    #[test]
    fn test_open_rejects_negative_start() {
        let err = Shift::open("store-1", "cashier-7", Money::from_cents(-1), Utc::now());
        assert!(matches!(err, Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_accrual_is_additive() {
        let mut shift = open_shift(50_000);
        shift.accrue(AccrualBucket::CashSales, Money::from_cents(10_000)).unwrap();
        shift.accrue(AccrualBucket::CashSales, Money::from_cents(30_000)).unwrap();
        shift.accrue(AccrualBucket::CardSales, Money::from_cents(7_500)).unwrap();
        shift.accrue(AccrualBucket::Expenses, Money::from_cents(2_000)).unwrap();

        let totals = shift.totals();
        assert_eq!(totals.cash_sales.cents(), 40_000);
        assert_eq!(totals.card_sales.cents(), 7_500);
        assert_eq!(totals.expenses_total.cents(), 2_000);
        assert_eq!(shift.expected_cash().cents(), 88_000);
    }

    #[test]
    fn test_close_with_exact_count() {
        let mut shift = open_shift(50_000);
        shift.accrue(AccrualBucket::CashSales, Money::from_cents(40_000)).unwrap();

        let close = ShiftClose::new(Money::from_cents(90_000)).expected(Money::from_cents(90_000));
        shift.close(&close, "manager-1", Utc::now()).unwrap();

        assert_eq!(shift.status, ShiftStatus::Closed);
        assert_eq!(shift.difference(), Some(Money::zero()));
        assert_eq!(shift.closed_by.as_deref(), Some("manager-1"));
        assert!(shift.end_time.is_some());
    }

    #[test]
    fn test_close_keeps_sign_of_difference() {
        let mut short = open_shift(10_000);
        short.close(&ShiftClose::new(Money::from_cents(9_500)), "m", Utc::now()).unwrap();
        assert_eq!(short.expected_balance_cents, Some(10_000));
        assert_eq!(short.difference_cents, Some(-500));

        let mut over = open_shift(10_000);
        over.close(&ShiftClose::new(Money::from_cents(10_200)), "m", Utc::now()).unwrap();
        assert_eq!(over.difference_cents, Some(200));
    }

    #[test]
    fn test_close_with_counted_totals_replaces_accruals() {
        let mut shift = open_shift(10_000);
        shift.accrue(AccrualBucket::CashSales, Money::from_cents(5_000)).unwrap();

        let counted = ShiftTotals {
            cash_sales: Money::from_cents(6_000),
            ..ShiftTotals::default()
        };
        shift
            .close(&ShiftClose::new(Money::from_cents(16_000)).totals(counted), "m", Utc::now())
            .unwrap();

        assert_eq!(shift.cash_sales_cents, 6_000);
        assert_eq!(shift.expected_balance_cents, Some(16_000));
        assert_eq!(shift.difference_cents, Some(0));
    }

    #[test]
    fn test_closed_shift_is_frozen() {
        let mut shift = open_shift(10_000);
        shift.close(&ShiftClose::new(Money::from_cents(10_000)), "m", Utc::now()).unwrap();
        let frozen = shift.clone();

        assert!(matches!(
            shift.close(&ShiftClose::new(Money::from_cents(1)), "m", Utc::now()),
            Err(CoreError::AlreadyClosed { .. })
        ));
        assert!(matches!(
            shift.accrue(AccrualBucket::CashSales, Money::from_cents(100)),
            Err(CoreError::AlreadyClosed { .. })
        ));
        assert_eq!(shift, frozen);
    }

    #[test]
    fn test_invalid_close_leaves_shift_open() {
        let mut shift = open_shift(10_000);
        let before = shift.clone();
        let bad = ShiftClose::new(Money::from_cents(-1));
        assert!(shift.close(&bad, "m", Utc::now()).is_err());
        assert_eq!(shift, before);
    }
}
