//! Purchase order storage.
//!
//! Orders belong to the purchasing collaborator. The ledger only stages
//! them, marks them received and mirrors payable settlement onto them.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use tally_core::{PurchaseOrder, PurchaseOrderItem, PurchasePaymentStatus};

const ORDER_COLUMNS: &str = "id, store_id, supplier_id, status, payment_status, total_cents, \
    notes, created_by, received_by, received_at, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, purchase_order_id, inventory_item_id, product_id, description, \
    quantity, unit_cost_cents, received, created_at";

pub async fn insert_order(conn: &mut SqliteConnection, order: &PurchaseOrder) -> DbResult<()> {
    debug!(id = %order.id, supplier_id = %order.supplier_id, "Inserting purchase order");

    sqlx::query(
        r#"
        INSERT INTO purchase_orders (
            id, store_id, supplier_id, status, payment_status, total_cents,
            notes, created_by, received_by, received_at, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&order.id)
    .bind(&order.store_id)
    .bind(&order.supplier_id)
    .bind(order.status)
    .bind(order.payment_status)
    .bind(order.total_cents)
    .bind(&order.notes)
    .bind(&order.created_by)
    .bind(&order.received_by)
    .bind(order.received_at)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn insert_item(conn: &mut SqliteConnection, item: &PurchaseOrderItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO purchase_order_items (
            id, purchase_order_id, inventory_item_id, product_id, description,
            quantity, unit_cost_cents, received, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&item.id)
    .bind(&item.purchase_order_id)
    .bind(&item.inventory_item_id)
    .bind(&item.product_id)
    .bind(&item.description)
    .bind(item.quantity)
    .bind(item.unit_cost_cents)
    .bind(item.received)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn find_order(
    conn: &mut SqliteConnection,
    store_id: &str,
    id: &str,
) -> DbResult<Option<PurchaseOrder>> {
    let order = sqlx::query_as::<_, PurchaseOrder>(&format!(
        "SELECT {ORDER_COLUMNS} FROM purchase_orders WHERE id = ?1 AND store_id = ?2"
    ))
    .bind(id)
    .bind(store_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(order)
}

/// Lines of an order in insertion order.
pub async fn items(
    conn: &mut SqliteConnection,
    purchase_order_id: &str,
) -> DbResult<Vec<PurchaseOrderItem>> {
    let items = sqlx::query_as::<_, PurchaseOrderItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM purchase_order_items WHERE purchase_order_id = ?1 ORDER BY rowid"
    ))
    .bind(purchase_order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

/// Touches `updated_at` to take the write lock. False if the order does not
/// exist in the store.
pub async fn touch(
    conn: &mut SqliteConnection,
    store_id: &str,
    id: &str,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result =
        sqlx::query("UPDATE purchase_orders SET updated_at = ?1 WHERE id = ?2 AND store_id = ?3")
            .bind(now)
            .bind(id)
            .bind(store_id)
            .execute(&mut *conn)
            .await?;

    Ok(result.rows_affected() > 0)
}

/// Persists PENDING → COMPLETED. False if the order was not pending.
pub async fn mark_received(conn: &mut SqliteConnection, order: &PurchaseOrder) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE purchase_orders
        SET status = ?1, received_by = ?2, received_at = ?3, updated_at = ?4
        WHERE id = ?5 AND store_id = ?6 AND status = 'pending'
        "#,
    )
    .bind(order.status)
    .bind(&order.received_by)
    .bind(order.received_at)
    .bind(order.updated_at)
    .bind(&order.id)
    .bind(&order.store_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn mark_item_received(conn: &mut SqliteConnection, item_id: &str) -> DbResult<()> {
    sqlx::query("UPDATE purchase_order_items SET received = 1 WHERE id = ?1")
        .bind(item_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Mirrors a payable's status onto its order. False if the order is gone.
pub async fn set_payment_status(
    conn: &mut SqliteConnection,
    store_id: &str,
    id: &str,
    status: PurchasePaymentStatus,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    debug!(order_id = %id, ?status, "Mirroring payment status onto purchase order");

    let result = sqlx::query(
        r#"
        UPDATE purchase_orders
        SET payment_status = ?1, updated_at = ?2
        WHERE id = ?3 AND store_id = ?4
        "#,
    )
    .bind(status)
    .bind(now)
    .bind(id)
    .bind(store_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}
