//! Purchase staging and receiving.

use chrono::Utc;
use sqlx::SqliteConnection;
use tally_core::validation::validate_actor;
use tally_core::{
    CoreError, InventoryItem, Money, NewPurchaseLine, PurchaseOrder, PurchaseOrderItem,
    StockMovement, StoreContext,
};
use tracing::{debug, info, warn};

use super::{Ledger, LedgerError, LedgerResult, ReceiptOutcome, ReceiveOptions};
use crate::repository::{instrument as instruments, inventory, purchase};

impl Ledger {
    /// Stages a PENDING purchase order with its lines.
    pub async fn stage_purchase_order(
        &self,
        ctx: &StoreContext,
        supplier_id: &str,
        lines: &[NewPurchaseLine],
        notes: Option<String>,
    ) -> LedgerResult<(PurchaseOrder, Vec<PurchaseOrderItem>)> {
        let (order, items) =
            PurchaseOrder::stage(&ctx.store_id, supplier_id, &ctx.actor, lines, notes, Utc::now())?;

        let mut tx = self.pool.begin().await?;
        purchase::insert_order(&mut *tx, &order).await?;
        for item in &items {
            purchase::insert_item(&mut *tx, item).await?;
        }
        tx.commit().await?;

        info!(
            order_id = %order.id,
            store_id = %order.store_id,
            supplier_id = %order.supplier_id,
            lines = items.len(),
            total = %order.total(),
            "Purchase order staged"
        );
        Ok((order, items))
    }

    /// Registers a stock item.
    pub async fn insert_inventory_item(
        &self,
        ctx: &StoreContext,
        product_id: Option<String>,
        name: &str,
        current_stock: i64,
        cost: Money,
    ) -> LedgerResult<InventoryItem> {
        let item = InventoryItem::new(&ctx.store_id, product_id, name, current_stock, cost, Utc::now())?;

        let mut conn = self.conn().await?;
        inventory::insert_item(&mut *conn, &item).await?;

        debug!(id = %item.id, store_id = %item.store_id, "Inventory item registered");
        Ok(item)
    }

    pub async fn get_inventory_item(&self, store_id: &str, id: &str) -> LedgerResult<InventoryItem> {
        let mut conn = self.conn().await?;
        inventory::find(&mut *conn, store_id, id)
            .await?
            .ok_or_else(|| CoreError::not_found("Inventory item", id).into())
    }

    pub async fn get_purchase_order(
        &self,
        store_id: &str,
        id: &str,
    ) -> LedgerResult<(PurchaseOrder, Vec<PurchaseOrderItem>)> {
        let mut conn = self.conn().await?;
        let order = purchase::find_order(&mut *conn, store_id, id)
            .await?
            .ok_or_else(|| CoreError::not_found("Purchase order", id))?;
        let items = purchase::items(&mut *conn, &order.id).await?;
        Ok((order, items))
    }

    /// Audit rows written by one document (e.g. a purchase order receipt).
    pub async fn stock_movements(
        &self,
        store_id: &str,
        reference_id: &str,
    ) -> LedgerResult<Vec<StockMovement>> {
        let mut conn = self.conn().await?;
        Ok(inventory::movements_for_reference(&mut *conn, store_id, reference_id).await?)
    }

    /// Receives a purchase order.
    ///
    /// Each line with a resolvable inventory item adds to stock, replaces the
    /// item's cost and writes a stock movement. Lines without one are only
    /// marked received. The order becomes COMPLETED and, if requested, a
    /// PENDING payable for the order total is created. An order with a zero
    /// total creates no payable.
    ///
    /// ## Errors
    /// - `NotFound` if the order does not exist in the caller's store
    /// - `AlreadyReceived` if it was received before; nothing is modified
    pub async fn receive_purchase(
        &self,
        ctx: &StoreContext,
        order_id: &str,
        options: ReceiveOptions,
    ) -> LedgerResult<ReceiptOutcome> {
        validate_actor(&ctx.actor)?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        if !purchase::touch(&mut *tx, &ctx.store_id, order_id, now).await? {
            return Err(CoreError::not_found("Purchase order", order_id).into());
        }
        let mut order = purchase::find_order(&mut *tx, &ctx.store_id, order_id)
            .await?
            .ok_or_else(|| LedgerError::internal("purchase order row missing after lock"))?;

        order.mark_received(&ctx.actor, now)?;

        let lines = purchase::items(&mut *tx, &order.id).await?;
        let mut movements = Vec::new();

        for line in lines.iter().filter(|line| !line.received) {
            match resolve_inventory(&mut *tx, &ctx.store_id, line).await? {
                Some(mut item) => {
                    let previous_stock = item.current_stock;
                    let movement = item.receive(line, &ctx.actor, now)?;
                    if !inventory::update_stock_and_cost(&mut *tx, &item, previous_stock).await? {
                        return Err(LedgerError::internal("inventory stock moved under lock"));
                    }
                    inventory::insert_movement(&mut *tx, &movement).await?;
                    movements.push(movement);
                }
                None => debug!(
                    line_id = %line.id,
                    description = %line.description,
                    "Line has no inventory link; received without stock movement"
                ),
            }
            purchase::mark_item_received(&mut *tx, &line.id).await?;
        }

        if !purchase::mark_received(&mut *tx, &order).await? {
            return Err(CoreError::AlreadyReceived { order_id: order.id }.into());
        }

        let payable = if options.create_payable {
            let payable = order.payable(&ctx.actor, options.due_date, now, self.payable_term_days);
            match &payable {
                Some(payable) => instruments::insert(&mut *tx, payable).await?,
                None => debug!(order_id = %order.id, "Order total is zero; no payable created"),
            }
            payable
        } else {
            None
        };

        tx.commit().await?;

        info!(
            order_id = %order.id,
            store_id = %order.store_id,
            movements = movements.len(),
            payable_id = ?payable.as_ref().map(|p| p.id.as_str()),
            received_by = %ctx.actor,
            "Purchase order received"
        );

        Ok(ReceiptOutcome {
            purchase_order: order,
            payable,
            movements,
        })
    }
}

/// Finds the inventory item a line feeds: the direct link first, then the
/// legacy catalog product.
async fn resolve_inventory(
    conn: &mut SqliteConnection,
    store_id: &str,
    line: &PurchaseOrderItem,
) -> LedgerResult<Option<InventoryItem>> {
    if let Some(item_id) = &line.inventory_item_id {
        if let Some(item) = inventory::find(conn, store_id, item_id).await? {
            return Ok(Some(item));
        }
        warn!(line_id = %line.id, inventory_item_id = %item_id, "Line links a missing inventory item");
    }

    match &line.product_id {
        Some(product_id) => Ok(inventory::find_by_product(conn, store_id, product_id).await?),
        None => Ok(None),
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
    use chrono::Duration;
    use tally_core::{
        InstrumentKind, InstrumentStatus, MovementReason, PaymentMethod, PaymentRequest,
        PurchaseOrderStatus, PurchasePaymentStatus,
    };

    fn line(item: Option<&InventoryItem>, qty: i64, cost: i64) -> NewPurchaseLine {
        NewPurchaseLine {
            inventory_item_id: item.map(|i| i.id.clone()),
            product_id: None,
            description: format!("{qty} units"),
            quantity: qty,
            unit_cost: Money::from_cents(cost),
        }
    }

    async fn item(ledger: &Ledger, name: &str, stock: i64) -> InventoryItem {
        ledger
            .insert_inventory_item(&ctx(), Some(format!("prod-{name}")), name, stock, Money::from_cents(100))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_receive_with_payable() {
        let (_db, ledger) = ledger().await;
        let a = item(&ledger, "a", 3).await;
        let b = item(&ledger, "b", 0).await;
        let (order, _) = ledger
            .stage_purchase_order(&ctx(), "supplier-9", &[line(Some(&a), 10, 500), line(Some(&b), 5, 800)], None)
            .await
            .unwrap();
        assert_eq!(order.total_cents, 9_000);

        let before = Utc::now();
        let outcome = ledger
            .receive_purchase(&ctx(), &order.id, ReceiveOptions::with_payable())
            .await
            .unwrap();

        assert_eq!(outcome.purchase_order.status, PurchaseOrderStatus::Completed);
        assert_eq!(outcome.purchase_order.payment_status, PurchasePaymentStatus::Unpaid);
        assert_eq!(outcome.purchase_order.received_by.as_deref(), Some("cashier-7"));

        let payable = outcome.payable.unwrap();
        assert_eq!(payable.kind, InstrumentKind::Payable);
        assert_eq!(payable.total_cents, 9_000);
        assert_eq!(payable.balance_cents, 9_000);
        assert_eq!(payable.status, InstrumentStatus::Pending);
        assert_eq!(payable.counterparty_id, "supplier-9");
        let due = payable.due_date.unwrap();
        assert!(due >= before + Duration::days(30));
        assert!(due <= Utc::now() + Duration::days(30));

        assert_eq!(outcome.movements.len(), 2);
        let stored = ledger.stock_movements("store-1", &order.id).await.unwrap();
        assert_eq!(stored, outcome.movements);
        assert_eq!((stored[0].previous_stock, stored[0].new_stock, stored[0].quantity), (3, 13, 10));
        assert_eq!((stored[1].previous_stock, stored[1].new_stock, stored[1].quantity), (0, 5, 5));
        assert!(stored.iter().all(|m| m.reason == MovementReason::PurchaseReceipt));
        assert_eq!(stored[0].product_id.as_deref(), Some("prod-a"));

        let a = ledger.get_inventory_item("store-1", &a.id).await.unwrap();
        assert_eq!((a.current_stock, a.cost_cents), (13, 500));
        let b = ledger.get_inventory_item("store-1", &b.id).await.unwrap();
        assert_eq!((b.current_stock, b.cost_cents), (5, 800));

        let (_, items) = ledger.get_purchase_order("store-1", &order.id).await.unwrap();
        assert!(items.iter().all(|i| i.received));
    }

    #[tokio::test]
    async fn test_receiving_twice_changes_nothing() {
        let (_db, ledger) = ledger().await;
        let a = item(&ledger, "a", 0).await;
        let (order, _) = ledger
            .stage_purchase_order(&ctx(), "supplier-9", &[line(Some(&a), 10, 500)], None)
            .await
            .unwrap();

        ledger
            .receive_purchase(&ctx(), &order.id, ReceiveOptions::with_payable())
            .await
            .unwrap();
        let err = ledger
            .receive_purchase(&ctx(), &order.id, ReceiveOptions::with_payable())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlreadyReceived);

        let a = ledger.get_inventory_item("store-1", &a.id).await.unwrap();
        assert_eq!(a.current_stock, 10);
        assert_eq!(ledger.stock_movements("store-1", &order.id).await.unwrap().len(), 1);
        let payables = ledger
            .list_instruments("store-1", InstrumentKind::Payable, None)
            .await
            .unwrap();
        assert_eq!(payables.len(), 1);
    }

    #[tokio::test]
    async fn test_unlinked_and_legacy_lines() {
        let (_db, ledger) = ledger().await;
        let legacy = item(&ledger, "legacy", 2).await;

        let by_product = NewPurchaseLine {
            inventory_item_id: None,
            product_id: legacy.product_id.clone(),
            description: "Sugar".to_string(),
            quantity: 4,
            unit_cost: Money::from_cents(250),
        };
        let (order, _) = ledger
            .stage_purchase_order(&ctx(), "supplier-2", &[by_product, line(None, 1, 1_200)], None)
            .await
            .unwrap();

        let outcome = ledger
            .receive_purchase(&ctx(), &order.id, ReceiveOptions::default())
            .await
            .unwrap();

        assert!(outcome.payable.is_none());
        assert_eq!(outcome.movements.len(), 1);
        assert_eq!(outcome.movements[0].inventory_item_id, legacy.id);
        assert_eq!(outcome.movements[0].new_stock, 6);

        let (stored, items) = ledger.get_purchase_order("store-1", &order.id).await.unwrap();
        assert_eq!(stored.status, PurchaseOrderStatus::Completed);
        assert!(items.iter().all(|i| i.received));
    }

    #[tokio::test]
    async fn test_free_goods_receipt_skips_payable() {
        let (_db, ledger) = ledger().await;
        let a = item(&ledger, "a", 2).await;
        let (order, _) = ledger
            .stage_purchase_order(&ctx(), "supplier-9", &[line(Some(&a), 3, 0)], None)
            .await
            .unwrap();
        assert_eq!(order.total_cents, 0);

        let outcome = ledger
            .receive_purchase(&ctx(), &order.id, ReceiveOptions::with_payable())
            .await
            .unwrap();

        assert!(outcome.payable.is_none());
        assert_eq!(outcome.purchase_order.status, PurchaseOrderStatus::Completed);
        assert_eq!(outcome.movements.len(), 1);

        let a = ledger.get_inventory_item("store-1", &a.id).await.unwrap();
        assert_eq!((a.current_stock, a.cost_cents), (5, 0));
        let payables = ledger
            .list_instruments("store-1", InstrumentKind::Payable, None)
            .await
            .unwrap();
        assert!(payables.is_empty());
    }

    #[tokio::test]
    async fn test_overflowing_order_is_rejected() {
        let (db, ledger) = ledger().await;

        let err = ledger
            .stage_purchase_order(&ctx(), "supplier-9", &[line(None, i64::MAX / 10, 100)], None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM purchase_orders")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_explicit_due_date_and_foreign_store() {
        let (_db, ledger) = ledger().await;
        let (order, _) = ledger
            .stage_purchase_order(&ctx(), "supplier-9", &[line(None, 2, 500)], Some("rush".to_string()))
            .await
            .unwrap();

        let err = ledger
            .receive_purchase(
                &StoreContext::new("store-2", "clerk-1"),
                &order.id,
                ReceiveOptions::with_payable(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        let due = Utc::now() + Duration::days(7);
        let outcome = ledger
            .receive_purchase(&ctx(), &order.id, ReceiveOptions::with_payable().due_date(due))
            .await
            .unwrap();
        assert_eq!(outcome.payable.unwrap().due_date, Some(due));
    }

    #[tokio::test]
    async fn test_payable_settlement_mirrors_onto_order() {
        let (_db, ledger) = ledger().await;
        let (order, _) = ledger
            .stage_purchase_order(&ctx(), "supplier-9", &[line(None, 10, 500)], None)
            .await
            .unwrap();
        let payable = ledger
            .receive_purchase(&ctx(), &order.id, ReceiveOptions::with_payable())
            .await
            .unwrap()
            .payable
            .unwrap();

        ledger
            .pay_payable(&ctx(), &payable.id, PaymentRequest::new(Money::from_cents(2_000), PaymentMethod::Transfer))
            .await
            .unwrap();
        let (stored, _) = ledger.get_purchase_order("store-1", &order.id).await.unwrap();
        assert_eq!(stored.payment_status, PurchasePaymentStatus::Partial);

        ledger
            .pay_payable(&ctx(), &payable.id, PaymentRequest::new(Money::from_cents(3_000), PaymentMethod::Cash))
            .await
            .unwrap();
        let (stored, _) = ledger.get_purchase_order("store-1", &order.id).await.unwrap();
        assert_eq!(stored.payment_status, PurchasePaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_failed_line_rolls_back_receipt() {
        let (db, ledger) = ledger().await;
        let a = item(&ledger, "a", 3).await;
        let b = item(&ledger, "b", 0).await;
        let (order, _) = ledger
            .stage_purchase_order(&ctx(), "supplier-9", &[line(Some(&a), 10, 500), line(Some(&b), 5, 800)], None)
            .await
            .unwrap();

        // Second line's movement insert fails after the first line was written.
        sqlx::query(&format!(
            "CREATE TRIGGER fail_second_movement BEFORE INSERT ON stock_movements \
             WHEN NEW.inventory_item_id = '{}' \
             BEGIN SELECT RAISE(ABORT, 'movement rejected'); END",
            b.id
        ))
        .execute(db.pool())
        .await
        .unwrap();

        let err = ledger
            .receive_purchase(&ctx(), &order.id, ReceiveOptions::with_payable())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Internal);

        let (stored, items) = ledger.get_purchase_order("store-1", &order.id).await.unwrap();
        assert_eq!(stored.status, PurchaseOrderStatus::Pending);
        assert!(items.iter().all(|i| !i.received));
        assert_eq!(ledger.get_inventory_item("store-1", &a.id).await.unwrap().current_stock, 3);
        assert!(ledger.stock_movements("store-1", &order.id).await.unwrap().is_empty());
        assert!(ledger
            .list_instruments("store-1", InstrumentKind::Payable, None)
            .await
            .unwrap()
            .is_empty());
    }
}
