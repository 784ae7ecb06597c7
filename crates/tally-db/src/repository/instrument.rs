//! Debt instrument storage (receivables and payables share one table).

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use tally_core::{DebtInstrument, InstrumentKind, InstrumentStatus};

const COLUMNS: &str = "id, store_id, kind, counterparty_id, origin_type, origin_id, \
    total_cents, balance_cents, status, due_date, notes, created_by, created_at, \
    updated_at, sync_version";

pub async fn insert(conn: &mut SqliteConnection, instrument: &DebtInstrument) -> DbResult<()> {
    debug!(id = %instrument.id, kind = %instrument.kind, "Inserting debt instrument");

    sqlx::query(
        r#"
        INSERT INTO debt_instruments (
            id, store_id, kind, counterparty_id, origin_type, origin_id,
            total_cents, balance_cents, status, due_date, notes,
            created_by, created_at, updated_at, sync_version
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        "#,
    )
    .bind(&instrument.id)
    .bind(&instrument.store_id)
    .bind(instrument.kind)
    .bind(&instrument.counterparty_id)
    .bind(instrument.origin_type)
    .bind(&instrument.origin_id)
    .bind(instrument.total_cents)
    .bind(instrument.balance_cents)
    .bind(instrument.status)
    .bind(instrument.due_date)
    .bind(&instrument.notes)
    .bind(&instrument.created_by)
    .bind(instrument.created_at)
    .bind(instrument.updated_at)
    .bind(instrument.sync_version)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Gets an instrument of `kind` by id, scoped to the store.
pub async fn find(
    conn: &mut SqliteConnection,
    store_id: &str,
    kind: InstrumentKind,
    id: &str,
) -> DbResult<Option<DebtInstrument>> {
    let instrument = sqlx::query_as::<_, DebtInstrument>(&format!(
        "SELECT {COLUMNS} FROM debt_instruments WHERE id = ?1 AND store_id = ?2 AND kind = ?3"
    ))
    .bind(id)
    .bind(store_id)
    .bind(kind)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(instrument)
}

/// Increments `sync_version`. Returns false if no such instrument exists in
/// the store.
///
/// Run first inside a payment transaction so the write lock is held before
/// the balance is read.
pub async fn bump_version(
    conn: &mut SqliteConnection,
    store_id: &str,
    kind: InstrumentKind,
    id: &str,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE debt_instruments
        SET sync_version = sync_version + 1
        WHERE id = ?1 AND store_id = ?2 AND kind = ?3
        "#,
    )
    .bind(id)
    .bind(store_id)
    .bind(kind)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Writes the new balance and status, only if the stored balance still
/// equals `expected_balance_cents`.
pub async fn update_balance(
    conn: &mut SqliteConnection,
    instrument: &DebtInstrument,
    expected_balance_cents: i64,
) -> DbResult<bool> {
    debug!(
        id = %instrument.id,
        from = expected_balance_cents,
        to = instrument.balance_cents,
        "Updating instrument balance"
    );

    let result = sqlx::query(
        r#"
        UPDATE debt_instruments
        SET balance_cents = ?1, status = ?2, updated_at = ?3
        WHERE id = ?4 AND store_id = ?5 AND balance_cents = ?6
        "#,
    )
    .bind(instrument.balance_cents)
    .bind(instrument.status)
    .bind(instrument.updated_at)
    .bind(&instrument.id)
    .bind(&instrument.store_id)
    .bind(expected_balance_cents)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Lists instruments for aging views: due date first (undated last), then
/// creation time.
pub async fn list(
    conn: &mut SqliteConnection,
    store_id: &str,
    kind: InstrumentKind,
    status: Option<InstrumentStatus>,
) -> DbResult<Vec<DebtInstrument>> {
    let instruments = sqlx::query_as::<_, DebtInstrument>(&format!(
        r#"
        SELECT {COLUMNS} FROM debt_instruments
        WHERE store_id = ?1 AND kind = ?2 AND (?3 IS NULL OR status = ?3)
        ORDER BY due_date IS NULL, due_date, created_at, id
        "#
    ))
    .bind(store_id)
    .bind(kind)
    .bind(status)
    .fetch_all(&mut *conn)
    .await?;

    Ok(instruments)
}

/// Sum of outstanding balances of one kind, in cents.
pub async fn outstanding_total(
    conn: &mut SqliteConnection,
    store_id: &str,
    kind: InstrumentKind,
) -> DbResult<i64> {
    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(balance_cents), 0)
        FROM debt_instruments
        WHERE store_id = ?1 AND kind = ?2
        "#,
    )
    .bind(store_id)
    .bind(kind)
    .fetch_one(&mut *conn)
    .await?;

    Ok(total)
}

/// Instruments past their due date that still carry a balance.
pub async fn overdue(
    conn: &mut SqliteConnection,
    store_id: &str,
    kind: InstrumentKind,
    as_of: DateTime<Utc>,
) -> DbResult<Vec<DebtInstrument>> {
    let instruments = sqlx::query_as::<_, DebtInstrument>(&format!(
        r#"
        SELECT {COLUMNS} FROM debt_instruments
        WHERE store_id = ?1 AND kind = ?2 AND status <> 'paid'
          AND due_date IS NOT NULL AND due_date < ?3
        ORDER BY due_date, created_at, id
        "#
    ))
    .bind(store_id)
    .bind(kind)
    .bind(as_of)
    .fetch_all(&mut *conn)
    .await?;

    Ok(instruments)
}
