//! Payment ledger storage. Append-only: there is no update or delete here,
//! and triggers reject them at the schema level.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use tally_core::PaymentTransaction;

const COLUMNS: &str = "id, store_id, instrument_id, instrument_kind, amount_cents, method, \
    reference, recorded_by, shift_id, created_at";

pub async fn insert(conn: &mut SqliteConnection, payment: &PaymentTransaction) -> DbResult<()> {
    debug!(
        id = %payment.id,
        instrument_id = %payment.instrument_id,
        amount_cents = payment.amount_cents,
        "Appending payment transaction"
    );

    sqlx::query(
        r#"
        INSERT INTO payment_transactions (
            id, store_id, instrument_id, instrument_kind, amount_cents, method,
            reference, recorded_by, shift_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.store_id)
    .bind(&payment.instrument_id)
    .bind(payment.instrument_kind)
    .bind(payment.amount_cents)
    .bind(payment.method)
    .bind(&payment.reference)
    .bind(&payment.recorded_by)
    .bind(&payment.shift_id)
    .bind(payment.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Payments against one instrument, oldest first.
pub async fn list_for_instrument(
    conn: &mut SqliteConnection,
    store_id: &str,
    instrument_id: &str,
) -> DbResult<Vec<PaymentTransaction>> {
    let payments = sqlx::query_as::<_, PaymentTransaction>(&format!(
        r#"
        SELECT {COLUMNS} FROM payment_transactions
        WHERE store_id = ?1 AND instrument_id = ?2
        ORDER BY created_at, rowid
        "#
    ))
    .bind(store_id)
    .bind(instrument_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(payments)
}

/// Payments that accrued into one shift, oldest first.
pub async fn list_for_shift(
    conn: &mut SqliteConnection,
    store_id: &str,
    shift_id: &str,
) -> DbResult<Vec<PaymentTransaction>> {
    let payments = sqlx::query_as::<_, PaymentTransaction>(&format!(
        r#"
        SELECT {COLUMNS} FROM payment_transactions
        WHERE store_id = ?1 AND shift_id = ?2
        ORDER BY created_at, rowid
        "#
    ))
    .bind(store_id)
    .bind(shift_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(payments)
}
