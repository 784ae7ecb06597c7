//! # Domain Types
//!
//! Entities and request shapes of the reconciliation core.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────────┐   ┌─────────────────┐   │
//! │  │ DebtInstrument  │◄──│ PaymentTransaction  │──►│     Shift       │   │
//! │  │  ─────────────  │ 1 │  ─────────────────  │ 0..1 ─────────────  │   │
//! │  │  kind           │   │  amount_cents       │   │  status         │   │
//! │  │  total_cents    │   │  method             │   │  cash_sales     │   │
//! │  │  balance_cents  │   │  shift_id (weak)    │   │  card_sales     │   │
//! │  │  status         │   └─────────────────────┘   │  transfer_sales │   │
//! │  │  origin (weak)  │                             │  expenses_total │   │
//! │  └────────┬────────┘                             └─────────────────┘   │
//! │           │ origin = purchase_order                                     │
//! │  ┌────────▼────────┐   ┌─────────────────────┐   ┌─────────────────┐   │
//! │  │ PurchaseOrder   │──►│ PurchaseOrderItem   │──►│ InventoryItem   │   │
//! │  │  status         │ * │  quantity           │0..1  current_stock  │   │
//! │  │  payment_status │   │  unit_cost_cents    │   │  cost_cents     │   │
//! │  └─────────────────┘   └─────────────────────┘   └────────┬────────┘   │
//! │                                                            │ audit      │
//! │                                                   ┌────────▼────────┐   │
//! │                                                   │ StockMovement   │   │
//! │                                                   └─────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! References between entities are ids only. Nothing here owns another row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Store Context
// =============================================================================

/// Resolved tenant and actor for one operation.
///
/// Authentication and authorization happen upstream; the ledger trusts
/// this value and scopes every read and write to `store_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreContext {
    pub store_id: String,
    /// Who is performing the operation (user id or username).
    pub actor: String,
}

impl StoreContext {
    pub fn new(store_id: impl Into<String>, actor: impl Into<String>) -> Self {
        StoreContext {
            store_id: store_id.into(),
            actor: actor.into(),
        }
    }
}

// =============================================================================
// Debt Instruments
// =============================================================================

/// Which side of the books an instrument sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    /// Money a client owes the store.
    Receivable,
    /// Money the store owes a supplier.
    Payable,
}

impl InstrumentKind {
    /// Entity name used in not-found errors and logs.
    pub const fn entity_name(&self) -> &'static str {
        match self {
            InstrumentKind::Receivable => "Receivable",
            InstrumentKind::Payable => "Payable",
        }
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrumentKind::Receivable => f.write_str("receivable"),
            InstrumentKind::Payable => f.write_str("payable"),
        }
    }
}

/// Settlement status of an instrument.
///
/// Always derived from the balance; see [`InstrumentStatus::derive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentStatus {
    /// Nothing paid yet.
    Pending,
    /// Some but not all of the total paid.
    Partial,
    /// Fully settled.
    Paid,
}

/// Kind of document an instrument originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OriginType {
    /// A sale made on credit (receivables).
    Sale,
    /// A received purchase order (payables).
    PurchaseOrder,
}

/// Tagged weak link to an originating document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OriginRef {
    pub origin_type: OriginType,
    pub id: String,
}

/// A receivable or payable: one owed amount and its running balance.
///
/// Never deleted. Mutated only by the ledger coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DebtInstrument {
    pub id: String,
    pub store_id: String,
    pub kind: InstrumentKind,
    /// Client id (receivable) or supplier id (payable). Lookup only.
    pub counterparty_id: String,
    pub origin_type: Option<OriginType>,
    pub origin_id: Option<String>,
    /// Amount originally owed. Immutable.
    pub total_cents: i64,
    /// Amount still owed. Never increases.
    pub balance_cents: i64,
    pub status: InstrumentStatus,
    /// Used for aging and ordering only.
    #[ts(as = "Option<String>")]
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    /// Bumped on every mutation.
    pub sync_version: i64,
}

impl DebtInstrument {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }

    /// Amount paid so far.
    #[inline]
    pub fn paid(&self) -> Money {
        self.total() - self.balance()
    }

    /// Returns the origin link, if both halves are present.
    pub fn origin(&self) -> Option<OriginRef> {
        match (self.origin_type, &self.origin_id) {
            (Some(origin_type), Some(id)) => Some(OriginRef {
                origin_type,
                id: id.clone(),
            }),
            _ => None,
        }
    }
}

/// Input for creating a receivable or payable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInstrument {
    pub counterparty_id: String,
    pub amount: Money,
    /// Sale id for receivables, purchase-order id for payables.
    pub origin_id: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl NewInstrument {
    pub fn new(counterparty_id: impl Into<String>, amount: Money) -> Self {
        NewInstrument {
            counterparty_id: counterparty_id.into(),
            amount,
            origin_id: None,
            due_date: None,
            notes: None,
        }
    }

    pub fn origin(mut self, origin_id: impl Into<String>) -> Self {
        self.origin_id = Some(origin_id.into());
        self
    }

    pub fn due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

// =============================================================================
// Payment Ledger
// =============================================================================

/// How a payment was tendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    Other,
}

/// One immutable row of the payment ledger.
///
/// Corrections are new rows, never edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PaymentTransaction {
    pub id: String,
    pub store_id: String,
    pub instrument_id: String,
    pub instrument_kind: InstrumentKind,
    /// Strictly positive.
    pub amount_cents: i64,
    pub method: PaymentMethod,
    /// External reference (check number, transfer id).
    pub reference: Option<String>,
    pub recorded_by: String,
    /// Open shift the payment accrued into, if any.
    pub shift_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl PaymentTransaction {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// A request to pay down an instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub amount: Money,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    /// Explicit shift to accrue into. Defaults to the store's open shift.
    pub shift_id: Option<String>,
}

impl PaymentRequest {
    pub fn new(amount: Money, method: PaymentMethod) -> Self {
        PaymentRequest {
            amount,
            method,
            reference: None,
            shift_id: None,
        }
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn shift(mut self, shift_id: impl Into<String>) -> Self {
        self.shift_id = Some(shift_id.into());
        self
    }
}

// =============================================================================
// Shifts
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    Open,
    /// Terminal. A closed shift is never reopened.
    Closed,
}

/// A cash-register session and its running totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Shift {
    pub id: String,
    pub store_id: String,
    pub status: ShiftStatus,
    pub opened_by: String,
    #[ts(as = "String")]
    pub start_time: DateTime<Utc>,
    /// Cash in the drawer when the shift opened.
    pub start_balance_cents: i64,
    pub cash_sales_cents: i64,
    pub card_sales_cents: i64,
    pub transfer_sales_cents: i64,
    /// Cash paid out of the drawer (supplier payments).
    pub expenses_total_cents: i64,
    pub end_balance_cents: Option<i64>,
    pub expected_balance_cents: Option<i64>,
    /// end - expected. Positive = surplus, negative = shortage.
    pub difference_cents: Option<i64>,
    pub closed_by: Option<String>,
    #[ts(as = "Option<String>")]
    pub end_time: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Shift {
    #[inline]
    pub fn start_balance(&self) -> Money {
        Money::from_cents(self.start_balance_cents)
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == ShiftStatus::Open
    }

    /// Current accrual totals.
    pub fn totals(&self) -> ShiftTotals {
        ShiftTotals {
            cash_sales: Money::from_cents(self.cash_sales_cents),
            card_sales: Money::from_cents(self.card_sales_cents),
            transfer_sales: Money::from_cents(self.transfer_sales_cents),
            expenses_total: Money::from_cents(self.expenses_total_cents),
        }
    }

    pub fn difference(&self) -> Option<Money> {
        self.difference_cents.map(Money::from_cents)
    }
}

/// Snapshot of the four accrual buckets of a shift.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShiftTotals {
    pub cash_sales: Money,
    pub card_sales: Money,
    pub transfer_sales: Money,
    pub expenses_total: Money,
}

/// The running total a cash movement lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccrualBucket {
    CashSales,
    CardSales,
    TransferSales,
    Expenses,
}

/// Which shift a close request targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftTarget {
    /// A specific shift id (must belong to the caller's store).
    Id(String),
    /// Whatever shift is currently open in the caller's store.
    CurrentOpen,
}

/// Figures supplied when closing a shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftClose {
    /// Cash counted in the drawer.
    pub end_balance: Money,
    /// Defaults to the shift's expected cash when absent.
    pub expected_balance: Option<Money>,
    /// Counted totals. When present they replace the accrued totals.
    pub totals: Option<ShiftTotals>,
    pub notes: Option<String>,
}

impl ShiftClose {
    pub fn new(end_balance: Money) -> Self {
        ShiftClose {
            end_balance,
            expected_balance: None,
            totals: None,
            notes: None,
        }
    }

    pub fn expected(mut self, expected_balance: Money) -> Self {
        self.expected_balance = Some(expected_balance);
        self
    }

    pub fn totals(mut self, totals: ShiftTotals) -> Self {
        self.totals = Some(totals);
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

// =============================================================================
// Purchasing & Inventory
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOrderStatus {
    Pending,
    /// Goods received. One-way.
    Completed,
}

/// Mirror of the linked payable's status on the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PurchasePaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

impl From<InstrumentStatus> for PurchasePaymentStatus {
    fn from(status: InstrumentStatus) -> Self {
        match status {
            InstrumentStatus::Pending => PurchasePaymentStatus::Unpaid,
            InstrumentStatus::Partial => PurchasePaymentStatus::Partial,
            InstrumentStatus::Paid => PurchasePaymentStatus::Paid,
        }
    }
}

/// A purchase order as seen at receiving time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseOrder {
    pub id: String,
    pub store_id: String,
    pub supplier_id: String,
    pub status: PurchaseOrderStatus,
    pub payment_status: PurchasePaymentStatus,
    pub total_cents: i64,
    pub notes: Option<String>,
    pub created_by: String,
    pub received_by: Option<String>,
    #[ts(as = "Option<String>")]
    pub received_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl PurchaseOrder {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line of a purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseOrderItem {
    pub id: String,
    pub purchase_order_id: String,
    /// Direct inventory link.
    pub inventory_item_id: Option<String>,
    /// Legacy catalog link, resolved to inventory when no direct link exists.
    pub product_id: Option<String>,
    pub description: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    pub received: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl PurchaseOrderItem {
    #[inline]
    pub fn unit_cost(&self) -> Money {
        Money::from_cents(self.unit_cost_cents)
    }

    /// `None` when quantity × unit cost does not fit in cents.
    #[inline]
    pub fn line_total(&self) -> Option<Money> {
        self.unit_cost().checked_mul(self.quantity)
    }
}

/// Input line for staging a purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPurchaseLine {
    pub inventory_item_id: Option<String>,
    pub product_id: Option<String>,
    pub description: String,
    pub quantity: i64,
    pub unit_cost: Money,
}

/// A stock-keeping item owned by the inventory collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryItem {
    pub id: String,
    pub store_id: String,
    pub product_id: Option<String>,
    pub name: String,
    pub current_stock: i64,
    /// Active unit cost.
    pub cost_cents: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementReason {
    PurchaseReceipt,
}

/// Immutable audit record of one stock change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub store_id: String,
    pub inventory_item_id: String,
    pub product_id: Option<String>,
    pub reason: MovementReason,
    pub quantity: i64,
    pub previous_stock: i64,
    pub new_stock: i64,
    /// Document that caused the movement (purchase order id).
    pub reference_id: String,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::to_string(&InstrumentStatus::Partial).unwrap(),
            "\"partial\""
        );
        assert_eq!(
            serde_json::to_string(&OriginType::PurchaseOrder).unwrap(),
            "\"purchase_order\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Transfer).unwrap(),
            "\"transfer\""
        );
    }

    #[test]
    fn test_payment_status_mirrors_instrument_status() {
        assert_eq!(
            PurchasePaymentStatus::from(InstrumentStatus::Pending),
            PurchasePaymentStatus::Unpaid
        );
        assert_eq!(
            PurchasePaymentStatus::from(InstrumentStatus::Partial),
            PurchasePaymentStatus::Partial
        );
        assert_eq!(
            PurchasePaymentStatus::from(InstrumentStatus::Paid),
            PurchasePaymentStatus::Paid
        );
    }

    #[test]
    fn test_line_total() {
        let now = Utc::now();
        let item = PurchaseOrderItem {
            id: "i-1".to_string(),
            purchase_order_id: "po-1".to_string(),
            inventory_item_id: None,
            product_id: None,
            description: "Flour 25kg".to_string(),
            quantity: 5,
            unit_cost_cents: 800,
            received: false,
            created_at: now,
        };
        assert_eq!(item.line_total(), Some(Money::from_cents(4000)));

        let huge = PurchaseOrderItem {
            quantity: i64::MAX / 10,
            unit_cost_cents: 100,
            ..item
        };
        assert_eq!(huge.line_total(), None);
    }

    #[test]
    fn test_instrument_kind_display() {
        assert_eq!(InstrumentKind::Receivable.to_string(), "receivable");
        assert_eq!(InstrumentKind::Payable.entity_name(), "Payable");
    }
}
