//! Instrument and payment operations.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tally_core::shift::payment_bucket;
use tally_core::validation::validate_actor;
use tally_core::{
    CoreError, DebtInstrument, InstrumentKind, InstrumentStatus, Money, NewInstrument,
    OriginType, PaymentRequest, PaymentTransaction, PurchasePaymentStatus, Shift, StoreContext,
};
use tracing::{info, warn};

use super::{Ledger, LedgerError, LedgerResult, PaymentReceipt};
use crate::repository::{instrument as instruments, payment, purchase, shift as shifts};

impl Ledger {
    // =========================================================================
    // Creation
    // =========================================================================

    /// Records a sale on credit. Starts PENDING with balance = total.
    pub async fn create_receivable(
        &self,
        ctx: &StoreContext,
        new: NewInstrument,
    ) -> LedgerResult<DebtInstrument> {
        validate_actor(&ctx.actor)?;
        new.validate()?;
        let receivable = DebtInstrument::receivable(&ctx.store_id, &ctx.actor, new, Utc::now());
        self.insert_instrument(&receivable).await?;
        Ok(receivable)
    }

    /// Records a manual payable. Due date defaults to now + the configured
    /// term.
    pub async fn create_payable(
        &self,
        ctx: &StoreContext,
        new: NewInstrument,
    ) -> LedgerResult<DebtInstrument> {
        validate_actor(&ctx.actor)?;
        new.validate()?;
        let payable = DebtInstrument::payable(
            &ctx.store_id,
            &ctx.actor,
            new,
            Utc::now(),
            self.payable_term_days,
        );
        self.insert_instrument(&payable).await?;
        Ok(payable)
    }

    async fn insert_instrument(&self, instrument: &DebtInstrument) -> LedgerResult<()> {
        let mut tx = self.pool.begin().await?;
        instruments::insert(&mut *tx, instrument).await?;
        tx.commit().await?;

        info!(
            id = %instrument.id,
            kind = %instrument.kind,
            store_id = %instrument.store_id,
            counterparty_id = %instrument.counterparty_id,
            total = %instrument.total(),
            "Debt instrument created"
        );
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_instrument(
        &self,
        store_id: &str,
        kind: InstrumentKind,
        id: &str,
    ) -> LedgerResult<DebtInstrument> {
        let mut conn = self.conn().await?;
        instruments::find(&mut *conn, store_id, kind, id)
            .await?
            .ok_or_else(|| CoreError::not_found(kind.entity_name(), id).into())
    }

    /// Instruments ordered by due date (undated last), then creation.
    pub async fn list_instruments(
        &self,
        store_id: &str,
        kind: InstrumentKind,
        status: Option<InstrumentStatus>,
    ) -> LedgerResult<Vec<DebtInstrument>> {
        let mut conn = self.conn().await?;
        Ok(instruments::list(&mut *conn, store_id, kind, status).await?)
    }

    /// Unsettled instruments whose due date is before `as_of`.
    pub async fn overdue_instruments(
        &self,
        store_id: &str,
        kind: InstrumentKind,
        as_of: DateTime<Utc>,
    ) -> LedgerResult<Vec<DebtInstrument>> {
        let mut conn = self.conn().await?;
        Ok(instruments::overdue(&mut *conn, store_id, kind, as_of).await?)
    }

    /// Sum of what is still owed on every instrument of `kind`.
    pub async fn outstanding_total(&self, store_id: &str, kind: InstrumentKind) -> LedgerResult<Money> {
        let mut conn = self.conn().await?;
        let cents = instruments::outstanding_total(&mut *conn, store_id, kind).await?;
        Ok(Money::from_cents(cents))
    }

    /// Ledger rows for one instrument, oldest first.
    pub async fn payment_history(
        &self,
        store_id: &str,
        instrument_id: &str,
    ) -> LedgerResult<Vec<PaymentTransaction>> {
        let mut conn = self.conn().await?;
        Ok(payment::list_for_instrument(&mut *conn, store_id, instrument_id).await?)
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Collects a payment from a client.
    ///
    /// CASH, CARD and TRANSFER accrue into the shift's sales buckets.
    ///
    /// ## Errors
    /// - `NotFound` if the receivable is absent or in another store
    /// - `Validation` if the amount is not positive or exceeds the balance
    /// - `AlreadySettled` if the receivable is PAID
    pub async fn pay_receivable(
        &self,
        ctx: &StoreContext,
        receivable_id: &str,
        request: PaymentRequest,
    ) -> LedgerResult<PaymentReceipt> {
        self.pay(ctx, InstrumentKind::Receivable, receivable_id, request)
            .await
    }

    /// Pays a supplier.
    ///
    /// Only CASH touches the drawer (`expenses_total`). If the payable came
    /// from a purchase order, the order's payment status follows the
    /// payable's status.
    pub async fn pay_payable(
        &self,
        ctx: &StoreContext,
        payable_id: &str,
        request: PaymentRequest,
    ) -> LedgerResult<PaymentReceipt> {
        self.pay(ctx, InstrumentKind::Payable, payable_id, request).await
    }

    async fn pay(
        &self,
        ctx: &StoreContext,
        kind: InstrumentKind,
        id: &str,
        request: PaymentRequest,
    ) -> LedgerResult<PaymentReceipt> {
        request.validate(&ctx.actor)?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        // Write first: from here on no other writer can move the balance.
        if !instruments::bump_version(&mut *tx, &ctx.store_id, kind, id).await? {
            return Err(CoreError::not_found(kind.entity_name(), id).into());
        }
        let mut instrument = instruments::find(&mut *tx, &ctx.store_id, kind, id)
            .await?
            .ok_or_else(|| LedgerError::internal("instrument row missing after lock"))?;

        let previous_balance = instrument.balance_cents;
        instrument.apply_payment(request.amount)?;
        instrument.updated_at = now;

        if !instruments::update_balance(&mut *tx, &instrument, previous_balance).await? {
            return Err(CoreError::Conflict(format!(
                "{kind} {id} changed while the payment was applied"
            ))
            .into());
        }

        let shift = resolve_shift(&mut *tx, ctx, request.shift_id.as_deref()).await?;
        let payment = PaymentTransaction::for_instrument(
            &instrument,
            &request,
            &ctx.actor,
            shift.as_ref().map(|s| s.id.clone()),
            now,
        );
        payment::insert(&mut *tx, &payment).await?;

        if let (Some(shift), Some(bucket)) = (&shift, payment_bucket(kind, request.method)) {
            if !shifts::accrue(&mut *tx, &ctx.store_id, &shift.id, bucket, request.amount, now)
                .await?
            {
                return Err(LedgerError::internal("open shift rejected accrual under lock"));
            }
        }

        if let (InstrumentKind::Payable, Some(origin)) = (kind, instrument.origin()) {
            if origin.origin_type == OriginType::PurchaseOrder {
                let status = PurchasePaymentStatus::from(instrument.status);
                if !purchase::set_payment_status(&mut *tx, &ctx.store_id, &origin.id, status, now)
                    .await?
                {
                    warn!(
                        payable_id = %instrument.id,
                        order_id = %origin.id,
                        "Payable references a purchase order that does not exist"
                    );
                }
            }
        }

        tx.commit().await?;

        info!(
            payment_id = %payment.id,
            instrument_id = %instrument.id,
            kind = %kind,
            store_id = %ctx.store_id,
            amount = %payment.amount(),
            method = ?payment.method,
            shift_id = ?payment.shift_id,
            balance = %instrument.balance(),
            status = ?instrument.status,
            "Payment recorded"
        );

        Ok(PaymentReceipt {
            payment,
            instrument,
        })
    }
}

/// The shift a payment accrues into.
///
/// No explicit shift: the store's open shift, if any. An explicit shift that
/// is closed or belongs to another store is ignored with a warning; the
/// payment still goes through.
async fn resolve_shift(
    conn: &mut SqliteConnection,
    ctx: &StoreContext,
    requested: Option<&str>,
) -> LedgerResult<Option<Shift>> {
    let Some(shift_id) = requested else {
        return Ok(shifts::find_open(conn, &ctx.store_id).await?);
    };

    match shifts::find(conn, &ctx.store_id, shift_id).await? {
        Some(shift) if shift.is_open() => Ok(Some(shift)),
        Some(_) => {
            warn!(shift_id, store_id = %ctx.store_id, "Payment names a closed shift; not accrued");
            Ok(None)
        }
        None => {
            warn!(shift_id, store_id = %ctx.store_id, "Payment names an unknown shift; not accrued");
            Ok(None)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
