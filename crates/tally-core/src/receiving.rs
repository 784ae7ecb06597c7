//! # Purchase Receiving
//!
//! Turning a delivered purchase order into stock deltas and, optionally, a
//! payable.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PurchaseOrder (PENDING, total 90.00)                                   │
//! │   ├── line: 10 × 5.00  → inventory item A (stock 3)                     │
//! │   │        └── StockMovement { previous 3,  new 13, qty 10 }            │
//! │   │            item A cost := 5.00                                      │
//! │   ├── line:  5 × 8.00  → inventory item B (stock 0)                     │
//! │   │        └── StockMovement { previous 0,  new 5,  qty 5 }             │
//! │   └── line:  1 × 12.00 → no inventory link                              │
//! │            └── marked received, cost tracked out of band                │
//! │                                                                         │
//! │  order.status := COMPLETED                                              │
//! │  create_payable? → Payable { total 90.00, due now + 30d, PENDING }      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{
    DebtInstrument, InventoryItem, MovementReason, NewInstrument, NewPurchaseLine, PurchaseOrder,
    PurchaseOrderItem, PurchaseOrderStatus, PurchasePaymentStatus, StockMovement,
};
use crate::validation::{
    validate_actor, validate_notes, validate_quantity, validate_required, validate_unit_cost,
};

impl PurchaseOrder {
    /// Builds a PENDING, UNPAID order and its lines. Total = Σ qty × unit cost.
    pub fn stage(
        store_id: &str,
        supplier_id: &str,
        created_by: &str,
        lines: &[NewPurchaseLine],
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> CoreResult<(PurchaseOrder, Vec<PurchaseOrderItem>)> {
        validate_required("supplier", supplier_id)?;
        validate_actor(created_by)?;
        validate_notes(notes.as_deref())?;
        if lines.is_empty() {
            return Err(ValidationError::Required {
                field: "lines".to_string(),
            }
            .into());
        }

        let order_id = Uuid::new_v4().to_string();
        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            validate_required("description", &line.description)?;
            validate_quantity(line.quantity)?;
            validate_unit_cost(line.unit_cost)?;
            items.push(PurchaseOrderItem {
                id: Uuid::new_v4().to_string(),
                purchase_order_id: order_id.clone(),
                inventory_item_id: line.inventory_item_id.clone(),
                product_id: line.product_id.clone(),
                description: line.description.clone(),
                quantity: line.quantity,
                unit_cost_cents: line.unit_cost.cents(),
                received: false,
                created_at: now,
            });
        }

        let total = items
            .iter()
            .try_fold(Money::zero(), |acc, item| {
                item.line_total().and_then(|line| acc.checked_add(line))
            })
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "lines".to_string(),
                reason: "order total would overflow".to_string(),
            })?;

        let order = PurchaseOrder {
            id: order_id,
            store_id: store_id.to_string(),
            supplier_id: supplier_id.to_string(),
            status: PurchaseOrderStatus::Pending,
            payment_status: PurchasePaymentStatus::Unpaid,
            total_cents: total.cents(),
            notes,
            created_by: created_by.to_string(),
            received_by: None,
            received_at: None,
            created_at: now,
            updated_at: now,
        };
        Ok((order, items))
    }

    /// Fails if the order was already received.
    pub fn ensure_receivable(&self) -> CoreResult<()> {
        if self.status == PurchaseOrderStatus::Completed {
            return Err(CoreError::AlreadyReceived {
                order_id: self.id.clone(),
            });
        }
        Ok(())
    }

    /// PENDING → COMPLETED. One-way.
    pub fn mark_received(&mut self, received_by: &str, now: DateTime<Utc>) -> CoreResult<()> {
        self.ensure_receivable()?;
        self.status = PurchaseOrderStatus::Completed;
        self.received_by = Some(received_by.to_string());
        self.received_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// The payable a received order creates. Starts PENDING with the
    /// full order total outstanding.
    ///
    /// An order of free goods owes nothing and creates no payable.
    pub fn payable(
        &self,
        created_by: &str,
        due_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        term_days: i64,
    ) -> Option<DebtInstrument> {
        if !self.total().is_positive() {
            return None;
        }
        let mut new = NewInstrument::new(self.supplier_id.clone(), self.total()).origin(self.id.clone());
        new.due_date = due_date;
        Some(DebtInstrument::payable(&self.store_id, created_by, new, now, term_days))
    }
}

impl InventoryItem {
    /// Builds a stock item for the inventory collaborator to register.
    pub fn new(
        store_id: &str,
        product_id: Option<String>,
        name: &str,
        current_stock: i64,
        cost: Money,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        validate_required("name", name)?;
        validate_unit_cost(cost)?;
        if current_stock < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "current stock".to_string(),
            }
            .into());
        }

        Ok(InventoryItem {
            id: Uuid::new_v4().to_string(),
            store_id: store_id.to_string(),
            product_id,
            name: name.to_string(),
            current_stock,
            cost_cents: cost.cents(),
            updated_at: now,
        })
    }

    /// Adds a received line to stock, takes its unit cost as the active cost
    /// and returns the audit record.
    pub fn receive(
        &mut self,
        line: &PurchaseOrderItem,
        received_by: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<StockMovement> {
        validate_quantity(line.quantity)?;

        let previous_stock = self.current_stock;
        let new_stock = previous_stock.checked_add(line.quantity).ok_or_else(|| {
            ValidationError::InvalidFormat {
                field: "quantity".to_string(),
                reason: "stock level would overflow".to_string(),
            }
        })?;

        self.current_stock = new_stock;
        self.cost_cents = line.unit_cost_cents;
        self.updated_at = now;

        Ok(StockMovement {
            id: Uuid::new_v4().to_string(),
            store_id: self.store_id.clone(),
            inventory_item_id: self.id.clone(),
            product_id: self.product_id.clone().or_else(|| line.product_id.clone()),
            reason: MovementReason::PurchaseReceipt,
            quantity: line.quantity,
            previous_stock,
            new_stock,
            reference_id: line.purchase_order_id.clone(),
            created_by: received_by.to_string(),
            created_at: now,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
