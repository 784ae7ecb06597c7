//! Shift operations: open, close, current, list, register-sale accrual.

use chrono::Utc;
use tally_core::shift::sale_bucket;
use tally_core::validation::validate_payment_amount;
use tally_core::{
    CoreError, Money, PaymentMethod, PaymentTransaction, Shift, ShiftClose, ShiftTarget,
    StoreContext,
};
use tracing::{debug, info, warn};

use super::{Ledger, LedgerError, LedgerResult};
use crate::repository::{payment, shift as shifts};

/// Upper bound for [`Ledger::list_shifts`].
const MAX_SHIFT_PAGE: i64 = 500;

impl Ledger {
    /// Opens a shift for the caller's store.
    ///
    /// ## Errors
    /// - `Conflict` if the store already has an open shift
    /// - `Validation` if the start balance is negative
    pub async fn open_shift(&self, ctx: &StoreContext, start_balance: Money) -> LedgerResult<Shift> {
        let shift = Shift::open(&ctx.store_id, &ctx.actor, start_balance, Utc::now())?;

        let mut tx = self.pool.begin().await?;

        // The partial unique index decides between concurrent openers.
        if let Err(err) = shifts::insert(&mut *tx, &shift).await {
            if err.is_unique_violation_on("shifts.store_id") {
                warn!(store_id = %ctx.store_id, "Shift already open for store");
                return Err(CoreError::Conflict(format!(
                    "store {} already has an open shift",
                    ctx.store_id
                ))
                .into());
            }
            return Err(err.into());
        }

        tx.commit().await?;

        info!(
            shift_id = %shift.id,
            store_id = %shift.store_id,
            start_balance = %shift.start_balance(),
            opened_by = %shift.opened_by,
            "Shift opened"
        );
        Ok(shift)
    }

    /// Closes a shift and freezes it.
    ///
    /// `difference = end_balance - expected_balance`; expected defaults to
    /// the shift's expected cash.
    ///
    /// ## Errors
    /// - `NotFound` if the shift does not exist in the caller's store (or,
    ///   for [`ShiftTarget::CurrentOpen`], no shift is open)
    /// - `AlreadyClosed` if it was closed before; nothing is modified
    pub async fn close_shift(
        &self,
        ctx: &StoreContext,
        target: ShiftTarget,
        close: ShiftClose,
    ) -> LedgerResult<Shift> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let found = match &target {
            ShiftTarget::Id(id) => {
                if !shifts::touch(&mut *tx, &ctx.store_id, id, now).await? {
                    return Err(CoreError::not_found("Shift", id.as_str()).into());
                }
                shifts::find(&mut *tx, &ctx.store_id, id).await?
            }
            ShiftTarget::CurrentOpen => {
                if !shifts::touch_open(&mut *tx, &ctx.store_id, now).await? {
                    return Err(CoreError::not_found("Open shift", ctx.store_id.as_str()).into());
                }
                shifts::find_open(&mut *tx, &ctx.store_id).await?
            }
        };
        let mut shift =
            found.ok_or_else(|| LedgerError::internal("shift row missing after lock"))?;

        // AlreadyClosed here drops `tx`, undoing the touch.
        shift.close(&close, &ctx.actor, now)?;

        if !shifts::close(&mut *tx, &shift).await? {
            return Err(CoreError::AlreadyClosed { shift_id: shift.id }.into());
        }

        tx.commit().await?;

        info!(
            shift_id = %shift.id,
            store_id = %shift.store_id,
            end_balance = ?shift.end_balance_cents,
            expected_balance = ?shift.expected_balance_cents,
            difference = ?shift.difference_cents,
            closed_by = %ctx.actor,
            "Shift closed"
        );
        Ok(shift)
    }

    /// The store's open shift. `None` means "no open shift", not a failure.
    pub async fn current_shift(&self, store_id: &str) -> LedgerResult<Option<Shift>> {
        let mut conn = self.conn().await?;
        Ok(shifts::find_open(&mut *conn, store_id).await?)
    }

    pub async fn get_shift(&self, store_id: &str, shift_id: &str) -> LedgerResult<Shift> {
        let mut conn = self.conn().await?;
        shifts::find(&mut *conn, store_id, shift_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Shift", shift_id).into())
    }

    /// Newest shifts first. `limit` is clamped to 1..=500.
    pub async fn list_shifts(&self, store_id: &str, limit: i64) -> LedgerResult<Vec<Shift>> {
        let mut conn = self.conn().await?;
        let limit = limit.clamp(1, MAX_SHIFT_PAGE);
        Ok(shifts::list(&mut *conn, store_id, limit).await?)
    }

    /// Debt payments recorded against a shift.
    pub async fn shift_payments(
        &self,
        store_id: &str,
        shift_id: &str,
    ) -> LedgerResult<Vec<PaymentTransaction>> {
        let mut conn = self.conn().await?;
        Ok(payment::list_for_shift(&mut *conn, store_id, shift_id).await?)
    }

    /// Accrues a register sale tender into the store's open shift.
    ///
    /// Returns the shift after the accrual, or `None` when no shift is open.
    /// OTHER tenders accrue nothing and return the open shift unchanged.
    pub async fn accrue_sale(
        &self,
        ctx: &StoreContext,
        amount: Money,
        method: PaymentMethod,
    ) -> LedgerResult<Option<Shift>> {
        validate_payment_amount(amount)?;

        let Some(bucket) = sale_bucket(method) else {
            debug!(store_id = %ctx.store_id, ?method, "Tender does not accrue");
            return self.current_shift(&ctx.store_id).await;
        };

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        if !shifts::accrue_open(&mut *tx, &ctx.store_id, bucket, amount, now).await? {
            debug!(store_id = %ctx.store_id, "No open shift; sale not accrued");
            return Ok(None);
        }
        let shift = shifts::find_open(&mut *tx, &ctx.store_id).await?;

        tx.commit().await?;

        debug!(store_id = %ctx.store_id, ?bucket, amount = %amount, "Sale accrued");
        Ok(shift)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::test_support::{ctx, ledger};
    use crate::ledger::ErrorCode;
    use tally_core::{NewInstrument, PaymentRequest, ShiftStatus, ShiftTotals};

    #[tokio::test]
    async fn test_open_and_current() {
        let (_db, ledger) = ledger().await;
        assert_eq!(ledger.current_shift("store-1").await.unwrap(), None);

        let shift = ledger.open_shift(&ctx(), Money::from_cents(50_000)).await.unwrap();
        assert_eq!(shift.status, ShiftStatus::Open);
        assert_eq!(shift.totals(), ShiftTotals::default());

        let current = ledger.current_shift("store-1").await.unwrap().unwrap();
        assert_eq!(current.id, shift.id);
        assert_eq!(current.start_balance_cents, 50_000);

        // Other stores are unaffected
        assert_eq!(ledger.current_shift("store-2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_second_open_shift_conflicts() {
        let (_db, ledger) = ledger().await;
        let first = ledger.open_shift(&ctx(), Money::from_cents(50_000)).await.unwrap();

        let err = ledger
            .open_shift(&StoreContext::new("store-1", "cashier-8"), Money::from_cents(1))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);

        let current = ledger.current_shift("store-1").await.unwrap().unwrap();
        assert_eq!(current, first);

        // A different store can open its own
        ledger
            .open_shift(&StoreContext::new("store-2", "cashier-1"), Money::zero())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_opens_one_wins() {
        let (_db, ledger) = ledger().await;

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let ledger = ledger.clone();
                tokio::spawn(async move {
                    ledger
                        .open_shift(
                            &StoreContext::new("store-1", format!("cashier-{i}")),
                            Money::from_cents(10_000),
                        )
                        .await
                })
            })
            .collect();

        let mut opened = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => opened += 1,
                Err(err) => assert_eq!(err.code(), ErrorCode::Conflict),
            }
        }
        assert_eq!(opened, 1);
    }

    #[tokio::test]
    async fn test_cash_receivable_payment_reconciles_drawer() {
        let (_db, ledger) = ledger().await;
        let ctx = ctx();
        let shift = ledger.open_shift(&ctx, Money::from_cents(50_000)).await.unwrap();

        let receivable = ledger
            .create_receivable(&ctx, NewInstrument::new("client-42", Money::from_cents(40_000)))
            .await
            .unwrap();
        ledger
            .pay_receivable(
                &ctx,
                &receivable.id,
                PaymentRequest::new(Money::from_cents(40_000), PaymentMethod::Cash),
            )
            .await
            .unwrap();

        let current = ledger.current_shift("store-1").await.unwrap().unwrap();
        assert_eq!(current.cash_sales_cents, 40_000);
        assert_eq!(current.expected_cash().cents(), 90_000);

        let closed = ledger
            .close_shift(
                &ctx,
                ShiftTarget::Id(shift.id.clone()),
                ShiftClose::new(Money::from_cents(90_000)).expected(Money::from_cents(90_000)),
            )
            .await
            .unwrap();

        assert_eq!(closed.status, ShiftStatus::Closed);
        assert_eq!(closed.difference_cents, Some(0));
        assert_eq!(closed.cash_sales_cents, 40_000);
        assert_eq!(ledger.current_shift("store-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_close_current_defaults_expected_to_cash() {
        let (_db, ledger) = ledger().await;
        ledger.open_shift(&ctx(), Money::from_cents(10_000)).await.unwrap();
        ledger
            .accrue_sale(&ctx(), Money::from_cents(2_500), PaymentMethod::Cash)
            .await
            .unwrap();

        let closed = ledger
            .close_shift(
                &ctx(),
                ShiftTarget::CurrentOpen,
                ShiftClose::new(Money::from_cents(12_000)).notes("short 5.00"),
            )
            .await
            .unwrap();

        assert_eq!(closed.expected_balance_cents, Some(12_500));
        assert_eq!(closed.difference_cents, Some(-500));
        assert_eq!(closed.notes.as_deref(), Some("short 5.00"));
    }

    #[tokio::test]
    async fn test_close_twice_is_rejected_without_mutation() {
        let (_db, ledger) = ledger().await;
        let shift = ledger.open_shift(&ctx(), Money::from_cents(10_000)).await.unwrap();
        let closed = ledger
            .close_shift(
                &ctx(),
                ShiftTarget::Id(shift.id.clone()),
                ShiftClose::new(Money::from_cents(10_000)),
            )
            .await
            .unwrap();

        let err = ledger
            .close_shift(
                &StoreContext::new("store-1", "manager-2"),
                ShiftTarget::Id(shift.id.clone()),
                ShiftClose::new(Money::from_cents(1)).notes("again"),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlreadyClosed);

        let stored = ledger.get_shift("store-1", &shift.id).await.unwrap();
        assert_eq!(stored, closed);
    }

    #[tokio::test]
    async fn test_close_unknown_or_foreign_shift() {
        let (_db, ledger) = ledger().await;
        let shift = ledger.open_shift(&ctx(), Money::zero()).await.unwrap();

        let err = ledger
            .close_shift(&ctx(), ShiftTarget::Id("nope".to_string()), ShiftClose::new(Money::zero()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        let other_store = StoreContext::new("store-2", "manager-1");
        let err = ledger
            .close_shift(&other_store, ShiftTarget::Id(shift.id), ShiftClose::new(Money::zero()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        let err = ledger
            .close_shift(&other_store, ShiftTarget::CurrentOpen, ShiftClose::new(Money::zero()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_invalid_close_leaves_shift_open() {
        let (_db, ledger) = ledger().await;
        let shift = ledger.open_shift(&ctx(), Money::from_cents(10_000)).await.unwrap();

        let err = ledger
            .close_shift(&ctx(), ShiftTarget::CurrentOpen, ShiftClose::new(Money::from_cents(-1)))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let current = ledger.current_shift("store-1").await.unwrap().unwrap();
        assert_eq!(current.id, shift.id);
        assert_eq!(current.updated_at, shift.updated_at);
    }

    #[tokio::test]
    async fn test_reopen_after_close() {
        let (_db, ledger) = ledger().await;
        let first = ledger.open_shift(&ctx(), Money::zero()).await.unwrap();
        ledger
            .close_shift(&ctx(), ShiftTarget::CurrentOpen, ShiftClose::new(Money::zero()))
            .await
            .unwrap();
        let second = ledger.open_shift(&ctx(), Money::from_cents(100)).await.unwrap();

        let shifts = ledger.list_shifts("store-1", 10).await.unwrap();
        assert_eq!(shifts.len(), 2);
        assert_eq!(shifts[0].id, second.id);
        assert_eq!(shifts[1].id, first.id);
        assert_eq!(ledger.list_shifts("store-1", 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_accrue_sale_routes_by_tender() {
        let (_db, ledger) = ledger().await;

        // No open shift is an explicit result
        let none = ledger
            .accrue_sale(&ctx(), Money::from_cents(100), PaymentMethod::Cash)
            .await
            .unwrap();
        assert!(none.is_none());

        ledger.open_shift(&ctx(), Money::zero()).await.unwrap();
        ledger.accrue_sale(&ctx(), Money::from_cents(1_000), PaymentMethod::Cash).await.unwrap();
        ledger.accrue_sale(&ctx(), Money::from_cents(750), PaymentMethod::Card).await.unwrap();
        ledger.accrue_sale(&ctx(), Money::from_cents(300), PaymentMethod::Transfer).await.unwrap();
        let after = ledger
            .accrue_sale(&ctx(), Money::from_cents(999), PaymentMethod::Other)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(after.cash_sales_cents, 1_000);
        assert_eq!(after.card_sales_cents, 750);
        assert_eq!(after.transfer_sales_cents, 300);
        assert_eq!(after.expenses_total_cents, 0);

        let err = ledger
            .accrue_sale(&ctx(), Money::zero(), PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_concurrent_accruals_are_not_lost() {
        let (_db, ledger) = ledger().await;
        ledger.open_shift(&ctx(), Money::zero()).await.unwrap();

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let ledger = ledger.clone();
                tokio::spawn(async move {
                    ledger
                        .accrue_sale(&ctx(), Money::from_cents(125), PaymentMethod::Cash)
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let shift = ledger.current_shift("store-1").await.unwrap().unwrap();
        assert_eq!(shift.cash_sales_cents, 2_500);
    }
}
