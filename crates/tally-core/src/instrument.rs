//! # Debt Instruments
//!
//! Balance and status rules for receivables and payables.
//!
//! ## Status Is Derived, Never Stored Blindly
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  (balance, total)                    status                             │
//! │  ──────────────────────────────────  ─────────                          │
//! │  balance <= 0                        PAID                               │
//! │  0 < balance < total                 PARTIAL                            │
//! │  balance == total                    PENDING                            │
//! │                                                                         │
//! │  Receivable 1000.00:                                                    │
//! │    pay 400 (cash)      → balance 600   PARTIAL                          │
//! │    pay 600 (transfer)  → balance 0     PAID                             │
//! │    pay 1               → AlreadySettled                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{
    DebtInstrument, InstrumentKind, InstrumentStatus, NewInstrument, OriginType,
    PaymentRequest, PaymentTransaction,
};
use crate::validation::{
    validate_actor, validate_instrument_amount, validate_notes, validate_payment_amount,
    validate_reference, validate_required,
};

impl InstrumentStatus {
    /// Maps a balance/total pair to exactly one status.
    ///
    /// A balance above the total cannot be produced by the ledger; it is
    /// reported as PENDING since nothing has been paid against it.
    ///
    /// ```rust
    /// use tally_core::{InstrumentStatus, Money};
    ///
    /// let total = Money::from_cents(100_000);
    /// assert_eq!(InstrumentStatus::derive(total, total), InstrumentStatus::Pending);
    /// assert_eq!(InstrumentStatus::derive(Money::from_cents(60_000), total), InstrumentStatus::Partial);
    /// assert_eq!(InstrumentStatus::derive(Money::zero(), total), InstrumentStatus::Paid);
    /// ```
    pub fn derive(balance: Money, total: Money) -> Self {
        if !balance.is_positive() {
            InstrumentStatus::Paid
        } else if balance >= total {
            InstrumentStatus::Pending
        } else {
            InstrumentStatus::Partial
        }
    }
}

impl NewInstrument {
    /// Checks the request before an instrument is built from it.
    pub fn validate(&self) -> CoreResult<()> {
        validate_required("counterparty", &self.counterparty_id)?;
        validate_instrument_amount(self.amount)?;
        validate_notes(self.notes.as_deref())?;
        Ok(())
    }
}

/// Due date a payable gets when the caller does not supply one.
pub fn default_due_date(now: DateTime<Utc>, term_days: i64) -> DateTime<Utc> {
    now + Duration::days(term_days)
}

impl DebtInstrument {
    /// Builds a PENDING receivable (sale on credit).
    pub fn receivable(
        store_id: &str,
        actor: &str,
        new: NewInstrument,
        now: DateTime<Utc>,
    ) -> Self {
        Self::build(InstrumentKind::Receivable, store_id, actor, new, now)
    }

    /// Builds a PENDING payable. Due date defaults to `now + term_days`.
    pub fn payable(
        store_id: &str,
        actor: &str,
        mut new: NewInstrument,
        now: DateTime<Utc>,
        term_days: i64,
    ) -> Self {
        if new.due_date.is_none() {
            new.due_date = Some(default_due_date(now, term_days));
        }
        Self::build(InstrumentKind::Payable, store_id, actor, new, now)
    }

    fn build(
        kind: InstrumentKind,
        store_id: &str,
        actor: &str,
        new: NewInstrument,
        now: DateTime<Utc>,
    ) -> Self {
        let origin_type = new.origin_id.as_ref().map(|_| match kind {
            InstrumentKind::Receivable => OriginType::Sale,
            InstrumentKind::Payable => OriginType::PurchaseOrder,
        });

        DebtInstrument {
            id: Uuid::new_v4().to_string(),
            store_id: store_id.to_string(),
            kind,
            counterparty_id: new.counterparty_id,
            origin_type,
            origin_id: new.origin_id,
            total_cents: new.amount.cents(),
            balance_cents: new.amount.cents(),
            status: InstrumentStatus::derive(new.amount, new.amount),
            due_date: new.due_date,
            notes: new.notes,
            created_by: actor.to_string(),
            created_at: now,
            updated_at: now,
            sync_version: 0,
        }
    }

    /// Re-derives `status` from the balance.
    pub fn recompute_status(&mut self) {
        self.status = InstrumentStatus::derive(self.balance(), self.total());
    }

    /// Applies a payment to the running balance.
    ///
    /// ## Errors
    /// - `AlreadySettled` if the instrument is PAID
    /// - `Validation` if `amount <= 0` or `amount > balance`
    ///
    /// On error the instrument is left untouched.
    pub fn apply_payment(&mut self, amount: Money) -> CoreResult<()> {
        // Stored status is not trusted.
        self.recompute_status();

        if self.status == InstrumentStatus::Paid {
            return Err(CoreError::AlreadySettled {
                kind: self.kind,
                id: self.id.clone(),
            });
        }

        validate_payment_amount(amount)?;

        let balance = self.balance();
        if amount > balance {
            return Err(ValidationError::ExceedsBalance { amount, balance }.into());
        }

        self.balance_cents = (balance - amount).cents();
        self.recompute_status();
        Ok(())
    }
}

impl PaymentTransaction {
    /// Builds the ledger row for a payment against `instrument`.
    pub fn for_instrument(
        instrument: &DebtInstrument,
        request: &PaymentRequest,
        recorded_by: &str,
        shift_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        PaymentTransaction {
            id: Uuid::new_v4().to_string(),
            store_id: instrument.store_id.clone(),
            instrument_id: instrument.id.clone(),
            instrument_kind: instrument.kind,
            amount_cents: request.amount.cents(),
            method: request.method,
            reference: request.reference.clone(),
            recorded_by: recorded_by.to_string(),
            shift_id,
            created_at: now,
        }
    }
}

impl PaymentRequest {
    /// Checks everything about the request that does not depend on the
    /// instrument's current balance.
    pub fn validate(&self, actor: &str) -> CoreResult<()> {
        validate_actor(actor)?;
        validate_payment_amount(self.amount)?;
        validate_reference(self.reference.as_deref())?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaymentMethod;

    fn receivable(total: i64) -> DebtInstrument {
        DebtInstrument::receivable(
            "store-1",
            "cashier-7",
            NewInstrument::new("client-42", Money::from_cents(total)),
            Utc::now(),
        )
    }

    #[test]
    fn test_new_instrument_is_pending() {
        let r = receivable(100_000);
        assert_eq!(r.status, InstrumentStatus::Pending);
        assert_eq!(r.balance(), r.total());
        assert_eq!(r.kind, InstrumentKind::Receivable);
        assert!(r.origin().is_none());
    }

    #[test]
    fn test_two_payments_settle_receivable() {
        let mut r = receivable(100_000);

        r.apply_payment(Money::from_cents(40_000)).unwrap();
        assert_eq!(r.balance_cents, 60_000);
        assert_eq!(r.status, InstrumentStatus::Partial);

        r.apply_payment(Money::from_cents(60_000)).unwrap();
        assert_eq!(r.balance_cents, 0);
        assert_eq!(r.status, InstrumentStatus::Paid);
        assert_eq!(r.paid(), r.total());
    }

    #[test]
    fn test_overpayment_rejected_without_effect() {
        let mut r = receivable(100_000);
        r.apply_payment(Money::from_cents(40_000)).unwrap();
        let before = r.clone();

        let err = r.apply_payment(Money::from_cents(60_001)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::ExceedsBalance { .. })
        ));
        assert_eq!(r, before);
    }

    #[test]
    fn test_non_positive_payment_rejected() {
        let mut r = receivable(100_000);
        assert!(matches!(
            r.apply_payment(Money::zero()),
            Err(CoreError::Validation(ValidationError::MustBePositive { .. }))
        ));
        assert!(r.apply_payment(Money::from_cents(-5)).is_err());
        assert_eq!(r.balance_cents, 100_000);
    }

    #[test]
    fn test_paid_instrument_reports_already_settled() {
        let mut r = receivable(5_000);
        r.apply_payment(Money::from_cents(5_000)).unwrap();

        let err = r.apply_payment(Money::from_cents(1)).unwrap_err();
        assert_eq!(
            err,
            CoreError::AlreadySettled {
                kind: InstrumentKind::Receivable,
                id: r.id.clone()
            }
        );
    }

    /// A stale status handed in by a caller is corrected before use.
    #[test]
    fn test_stale_status_is_rederived() {
        let mut r = receivable(10_000);
        r.balance_cents = 0;
        r.status = InstrumentStatus::Pending;

        assert!(matches!(
            r.apply_payment(Money::from_cents(100)),
            Err(CoreError::AlreadySettled { .. })
        ));
        assert_eq!(r.status, InstrumentStatus::Paid);
    }

    /// Any sequence of payments keeps balance non-increasing and status in
    /// step with the balance.
    #[test]
    fn test_payment_sequence_preserves_invariants() {
        let mut r = receivable(10_000);
        let attempts = [2_500, 0, 20_000, 2_500, -1, 4_999, 1, 1, 7];

        for amount in attempts {
            let before = r.balance();
            let _ = r.apply_payment(Money::from_cents(amount));
            assert!(r.balance() <= before);
            assert_eq!(r.status, InstrumentStatus::derive(r.balance(), r.total()));
        }
        assert_eq!(r.status, InstrumentStatus::Paid);
    }

    #[test]
    fn test_status_derivation_is_total() {
        let total = Money::from_cents(1_000);
        for balance in -5..=1_005 {
            let status = InstrumentStatus::derive(Money::from_cents(balance), total);
            let expected = if balance <= 0 {
                InstrumentStatus::Paid
            } else if balance >= 1_000 {
                InstrumentStatus::Pending
            } else {
                InstrumentStatus::Partial
            };
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn test_payable_defaults_due_date() {
        let now = Utc::now();
        let p = DebtInstrument::payable(
            "store-1",
            "buyer-1",
            NewInstrument::new("supplier-9", Money::from_cents(9_000)).origin("po-1"),
            now,
            30,
        );
        assert_eq!(p.due_date, Some(now + Duration::days(30)));
        assert_eq!(p.origin_type, Some(OriginType::PurchaseOrder));
        assert_eq!(p.origin().map(|o| o.id), Some("po-1".to_string()));
    }

    #[test]
    fn test_new_instrument_validation() {
        assert!(NewInstrument::new("client-1", Money::from_cents(1)).validate().is_ok());
        assert!(NewInstrument::new("", Money::from_cents(1)).validate().is_err());
        assert!(NewInstrument::new("client-1", Money::zero()).validate().is_err());
    }

    #[test]
    fn test_payment_request_validation() {
        let req = PaymentRequest::new(Money::from_cents(100), PaymentMethod::Cash);
        assert!(req.validate("cashier-7").is_ok());
        assert!(req.validate("").is_err());

        let long = req.clone().reference("r".repeat(200));
        assert!(long.validate("cashier-7").is_err());
    }
}
