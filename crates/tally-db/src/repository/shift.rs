//! Shift storage.
//!
//! Accruals are applied as `column = column + amount` in SQL, never as a
//! read-modify-write of a cached row.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use tally_core::{AccrualBucket, Money, Shift};

const COLUMNS: &str = "id, store_id, status, opened_by, start_time, start_balance_cents, \
    cash_sales_cents, card_sales_cents, transfer_sales_cents, expenses_total_cents, \
    end_balance_cents, expected_balance_cents, difference_cents, closed_by, end_time, \
    notes, updated_at";

fn bucket_column(bucket: AccrualBucket) -> &'static str {
    match bucket {
        AccrualBucket::CashSales => "cash_sales_cents",
        AccrualBucket::CardSales => "card_sales_cents",
        AccrualBucket::TransferSales => "transfer_sales_cents",
        AccrualBucket::Expenses => "expenses_total_cents",
    }
}

/// Inserts a new shift.
///
/// A second open shift for the same store fails with a unique violation on
/// `shifts.store_id` (partial index).
pub async fn insert(conn: &mut SqliteConnection, shift: &Shift) -> DbResult<()> {
    debug!(id = %shift.id, store_id = %shift.store_id, "Inserting shift");

    sqlx::query(
        r#"
        INSERT INTO shifts (
            id, store_id, status, opened_by, start_time, start_balance_cents,
            cash_sales_cents, card_sales_cents, transfer_sales_cents, expenses_total_cents,
            notes, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&shift.id)
    .bind(&shift.store_id)
    .bind(shift.status)
    .bind(&shift.opened_by)
    .bind(shift.start_time)
    .bind(shift.start_balance_cents)
    .bind(shift.cash_sales_cents)
    .bind(shift.card_sales_cents)
    .bind(shift.transfer_sales_cents)
    .bind(shift.expenses_total_cents)
    .bind(&shift.notes)
    .bind(shift.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn find(
    conn: &mut SqliteConnection,
    store_id: &str,
    id: &str,
) -> DbResult<Option<Shift>> {
    let shift = sqlx::query_as::<_, Shift>(&format!(
        "SELECT {COLUMNS} FROM shifts WHERE id = ?1 AND store_id = ?2"
    ))
    .bind(id)
    .bind(store_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(shift)
}

/// The store's open shift, if any.
pub async fn find_open(conn: &mut SqliteConnection, store_id: &str) -> DbResult<Option<Shift>> {
    let shift = sqlx::query_as::<_, Shift>(&format!(
        "SELECT {COLUMNS} FROM shifts WHERE store_id = ?1 AND status = 'open'"
    ))
    .bind(store_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(shift)
}

/// Most recent shifts first.
pub async fn list(conn: &mut SqliteConnection, store_id: &str, limit: i64) -> DbResult<Vec<Shift>> {
    let shifts = sqlx::query_as::<_, Shift>(&format!(
        "SELECT {COLUMNS} FROM shifts WHERE store_id = ?1 ORDER BY start_time DESC, rowid DESC LIMIT ?2"
    ))
    .bind(store_id)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;

    Ok(shifts)
}

/// Open shifts across all stores.
pub async fn count_open(conn: &mut SqliteConnection) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shifts WHERE status = 'open'")
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// Touches `updated_at` to take the write lock. False if the shift does not
/// exist in the store.
pub async fn touch(
    conn: &mut SqliteConnection,
    store_id: &str,
    id: &str,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query("UPDATE shifts SET updated_at = ?1 WHERE id = ?2 AND store_id = ?3")
        .bind(now)
        .bind(id)
        .bind(store_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Like [`touch`], for whatever shift is open in the store.
pub async fn touch_open(
    conn: &mut SqliteConnection,
    store_id: &str,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result =
        sqlx::query("UPDATE shifts SET updated_at = ?1 WHERE store_id = ?2 AND status = 'open'")
            .bind(now)
            .bind(store_id)
            .execute(&mut *conn)
            .await?;

    Ok(result.rows_affected() > 0)
}

/// Adds `amount` to one bucket of an OPEN shift. False if the shift is
/// closed or missing.
pub async fn accrue(
    conn: &mut SqliteConnection,
    store_id: &str,
    id: &str,
    bucket: AccrualBucket,
    amount: Money,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let column = bucket_column(bucket);
    debug!(shift_id = %id, column, amount_cents = amount.cents(), "Accruing into shift");

    let result = sqlx::query(&format!(
        r#"
        UPDATE shifts
        SET {column} = {column} + ?1, updated_at = ?2
        WHERE id = ?3 AND store_id = ?4 AND status = 'open'
        "#
    ))
    .bind(amount.cents())
    .bind(now)
    .bind(id)
    .bind(store_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Adds `amount` to one bucket of whatever shift is open in the store.
/// False if there is none.
pub async fn accrue_open(
    conn: &mut SqliteConnection,
    store_id: &str,
    bucket: AccrualBucket,
    amount: Money,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let column = bucket_column(bucket);

    let result = sqlx::query(&format!(
        r#"
        UPDATE shifts
        SET {column} = {column} + ?1, updated_at = ?2
        WHERE store_id = ?3 AND status = 'open'
        "#
    ))
    .bind(amount.cents())
    .bind(now)
    .bind(store_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Persists the closing figures of `shift`, only if it is still open.
pub async fn close(conn: &mut SqliteConnection, shift: &Shift) -> DbResult<bool> {
    debug!(id = %shift.id, difference_cents = ?shift.difference_cents, "Closing shift");

    let result = sqlx::query(
        r#"
        UPDATE shifts
        SET status = ?1,
            cash_sales_cents = ?2,
            card_sales_cents = ?3,
            transfer_sales_cents = ?4,
            expenses_total_cents = ?5,
            end_balance_cents = ?6,
            expected_balance_cents = ?7,
            difference_cents = ?8,
            closed_by = ?9,
            end_time = ?10,
            notes = ?11,
            updated_at = ?12
        WHERE id = ?13 AND store_id = ?14 AND status = 'open'
        "#,
    )
    .bind(shift.status)
    .bind(shift.cash_sales_cents)
    .bind(shift.card_sales_cents)
    .bind(shift.transfer_sales_cents)
    .bind(shift.expenses_total_cents)
    .bind(shift.end_balance_cents)
    .bind(shift.expected_balance_cents)
    .bind(shift.difference_cents)
    .bind(&shift.closed_by)
    .bind(shift.end_time)
    .bind(&shift.notes)
    .bind(shift.updated_at)
    .bind(&shift.id)
    .bind(&shift.store_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}
