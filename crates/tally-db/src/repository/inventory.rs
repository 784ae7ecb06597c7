//! Inventory item and stock movement storage.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use tally_core::{InventoryItem, StockMovement};

const ITEM_COLUMNS: &str = "id, store_id, product_id, name, current_stock, cost_cents, updated_at";

const MOVEMENT_COLUMNS: &str = "id, store_id, inventory_item_id, product_id, reason, quantity, \
    previous_stock, new_stock, reference_id, created_by, created_at";

pub async fn insert_item(conn: &mut SqliteConnection, item: &InventoryItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO inventory_items (
            id, store_id, product_id, name, current_stock, cost_cents, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&item.id)
    .bind(&item.store_id)
    .bind(&item.product_id)
    .bind(&item.name)
    .bind(item.current_stock)
    .bind(item.cost_cents)
    .bind(item.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn find(
    conn: &mut SqliteConnection,
    store_id: &str,
    id: &str,
) -> DbResult<Option<InventoryItem>> {
    let item = sqlx::query_as::<_, InventoryItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = ?1 AND store_id = ?2"
    ))
    .bind(id)
    .bind(store_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(item)
}

/// Resolves a legacy catalog product to its inventory item. The oldest item
/// wins if a product was stocked twice.
pub async fn find_by_product(
    conn: &mut SqliteConnection,
    store_id: &str,
    product_id: &str,
) -> DbResult<Option<InventoryItem>> {
    let item = sqlx::query_as::<_, InventoryItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE store_id = ?1 AND product_id = ?2 ORDER BY rowid LIMIT 1"
    ))
    .bind(store_id)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(item)
}

/// Writes stock and active cost, only if stock still equals
/// `previous_stock`.
pub async fn update_stock_and_cost(
    conn: &mut SqliteConnection,
    item: &InventoryItem,
    previous_stock: i64,
) -> DbResult<bool> {
    debug!(
        id = %item.id,
        previous_stock,
        new_stock = item.current_stock,
        cost_cents = item.cost_cents,
        "Updating stock and cost"
    );

    let result = sqlx::query(
        r#"
        UPDATE inventory_items
        SET current_stock = ?1, cost_cents = ?2, updated_at = ?3
        WHERE id = ?4 AND store_id = ?5 AND current_stock = ?6
        "#,
    )
    .bind(item.current_stock)
    .bind(item.cost_cents)
    .bind(item.updated_at)
    .bind(&item.id)
    .bind(&item.store_id)
    .bind(previous_stock)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn insert_movement(conn: &mut SqliteConnection, movement: &StockMovement) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, store_id, inventory_item_id, product_id, reason, quantity,
            previous_stock, new_stock, reference_id, created_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.store_id)
    .bind(&movement.inventory_item_id)
    .bind(&movement.product_id)
    .bind(movement.reason)
    .bind(movement.quantity)
    .bind(movement.previous_stock)
    .bind(movement.new_stock)
    .bind(&movement.reference_id)
    .bind(&movement.created_by)
    .bind(movement.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Movements caused by one document, in the order they were written.
pub async fn movements_for_reference(
    conn: &mut SqliteConnection,
    store_id: &str,
    reference_id: &str,
) -> DbResult<Vec<StockMovement>> {
    let movements = sqlx::query_as::<_, StockMovement>(&format!(
        "SELECT {MOVEMENT_COLUMNS} FROM stock_movements WHERE store_id = ?1 AND reference_id = ?2 ORDER BY rowid"
    ))
    .bind(store_id)
    .bind(reference_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(movements)
}
