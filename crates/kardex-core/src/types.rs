//! # Domain Types
//!
//! Core domain types of the Kardex engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │  LedgerEntry    │   │     Guide       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  product_id     │   │  id (UUID)      │       │
//! │  │  code (biz)     │   │  sequence       │   │  code (biz)     │       │
//! │  │  stock          │   │  kind           │   │  kind, status   │       │
//! │  │  avg cost       │   │  balance b/a    │   │  items ──────┐  │       │
//! │  └─────────────────┘   │  unit/avg cost  │   └──────────────┼──┘       │
//! │           ▲            └─────────────────┘                  │          │
//! │           │                                                 ▼          │
//! │           │                                      ┌─────────────────┐   │
//! │           └──────────────────────────────────────│   GuideItem     │   │
//! │                                                  │  product, qty   │   │
//! │                                                  └─────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4, used for relations
//! - Business ID: (`code` for products and guides), shown to warehouse staff

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A stocked product.
///
/// `stock` and `average_cost_cents` change only through the stock
/// reconciler. Products are deactivated, never deleted, so their ledger keeps
/// pointing at a real row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business code printed on shelves and guides.
    pub code: String,

    pub name: String,

    pub description: Option<String>,

    /// Unit of measure (UNIDAD, CAJA, KG, ...).
    pub unit_of_measure: String,

    /// Current balance. Never negative.
    pub stock: i64,

    /// Reorder threshold.
    pub min_stock: i64,

    pub max_stock: Option<i64>,

    /// Last agreed purchase cost in cents.
    pub purchase_cost_cents: i64,

    /// Weighted-average unit cost in cents.
    pub average_cost_cents: i64,

    pub sale_price_cents: i64,

    /// Soft-deactivation flag.
    pub is_active: bool,

    pub created_by: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn average_cost(&self) -> Money {
        Money::from_cents(self.average_cost_cents)
    }

    #[inline]
    pub fn purchase_cost(&self) -> Money {
        Money::from_cents(self.purchase_cost_cents)
    }

    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }

    /// Stock valued at the weighted-average cost.
    ///
    /// Saturates at `i64::MAX` rather than wrapping.
    pub fn inventory_value(&self) -> Money {
        self.average_cost()
            .multiply_quantity(self.stock)
            .unwrap_or(Money::from_cents(i64::MAX))
    }

    /// At or below the reorder threshold.
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.stock == 0
    }

    /// Above the configured maximum, if there is one.
    pub fn is_over_max(&self) -> bool {
        self.max_stock.is_some_and(|max| self.stock > max)
    }

    /// Snapshot of balance and valuation.
    pub fn balance(&self) -> StockBalance {
        StockBalance {
            product_id: self.id.clone(),
            product_code: self.code.clone(),
            balance: self.stock,
            average_cost_cents: self.average_cost_cents,
            inventory_value_cents: self.inventory_value().cents(),
        }
    }
}

/// Input for product creation.
///
/// `initial_stock` above zero is recorded as an opening ledger entry valued
/// at `purchase_cost_cents`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub unit_of_measure: Option<String>,
    pub min_stock: Option<i64>,
    pub max_stock: Option<i64>,
    pub purchase_cost_cents: i64,
    pub sale_price_cents: i64,
    #[serde(default)]
    pub initial_stock: i64,
}

impl NewProduct {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn purchase_cost(mut self, cents: i64) -> Self {
        self.purchase_cost_cents = cents;
        self
    }

    pub fn sale_price(mut self, cents: i64) -> Self {
        self.sale_price_cents = cents;
        self
    }

    pub fn initial_stock(mut self, qty: i64) -> Self {
        self.initial_stock = qty;
        self
    }

    pub fn thresholds(mut self, min_stock: i64, max_stock: Option<i64>) -> Self {
        self.min_stock = Some(min_stock);
        self.max_stock = max_stock;
        self
    }
}

/// Non-stock product attributes that may be edited in place.
///
/// Stock is not editable here; it moves only through ledger movements.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub unit_of_measure: Option<String>,
    pub min_stock: Option<i64>,
    pub max_stock: Option<i64>,
    pub purchase_cost_cents: Option<i64>,
    pub sale_price_cents: Option<i64>,
}

// =============================================================================
// Movements & Ledger
// =============================================================================

/// Kind of stock movement recorded in the Kardex.
///
/// ```text
/// entry       +qty   average cost recomputed
/// exit        -qty   average cost unchanged, valued at average
/// adjustment  -qty   average cost unchanged, valued at average
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Entry,
    Exit,
    Adjustment,
}

impl MovementKind {
    /// +1 for stock coming in, -1 for stock going out.
    #[inline]
    pub const fn sign(self) -> i64 {
        match self {
            MovementKind::Entry => 1,
            MovementKind::Exit | MovementKind::Adjustment => -1,
        }
    }

    #[inline]
    pub const fn is_inbound(self) -> bool {
        matches!(self, MovementKind::Entry)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            MovementKind::Entry => "entry",
            MovementKind::Exit => "exit",
            MovementKind::Adjustment => "adjustment",
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to move stock for one product.
///
/// ## Example
/// ```rust
/// use kardex_core::types::{MovementKind, MovementRequest};
///
/// let req = MovementRequest::new("prod-1", MovementKind::Entry, 10)
///     .unit_cost(250)
///     .document_ref("GR-0001")
///     .actor("almacen@gde");
/// assert_eq!(req.unit_cost_cents, Some(250));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MovementRequest {
    pub product_id: String,
    pub kind: MovementKind,
    /// Always positive; direction comes from `kind`.
    pub quantity: i64,
    /// Cost of incoming units. Ignored for outbound movements.
    pub unit_cost_cents: Option<i64>,
    /// Originating document (guide code, "AJUSTE", ...).
    pub document_ref: String,
    pub reference: Option<String>,
    pub actor: String,
    pub note: Option<String>,
}

impl MovementRequest {
    pub fn new(product_id: impl Into<String>, kind: MovementKind, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            kind,
            quantity,
            unit_cost_cents: None,
            document_ref: String::new(),
            reference: None,
            actor: String::new(),
            note: None,
        }
    }

    pub fn unit_cost(mut self, cents: i64) -> Self {
        self.unit_cost_cents = Some(cents);
        self
    }

    pub fn document_ref(mut self, document_ref: impl Into<String>) -> Self {
        self.document_ref = document_ref.into();
        self
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Quantity with the movement's direction applied.
    #[inline]
    pub fn signed_quantity(&self) -> i64 {
        self.kind.sign() * self.quantity
    }
}

/// One immutable Kardex record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LedgerEntry {
    pub id: String,
    pub product_id: String,
    /// Position in the product's ledger, starting at 1.
    pub sequence: i64,
    pub kind: MovementKind,
    pub document_ref: String,
    pub reference: Option<String>,
    /// Always positive.
    pub quantity: i64,
    pub balance_before: i64,
    pub balance_after: i64,
    /// Unit cost the movement was valued at.
    pub unit_cost_cents: i64,
    /// Weighted-average cost after the movement.
    pub average_cost_cents: i64,
    /// `quantity × unit_cost_cents`.
    pub total_value_cents: i64,
    pub actor: String,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    #[inline]
    pub fn signed_quantity(&self) -> i64 {
        self.kind.sign() * self.quantity
    }

    #[inline]
    pub fn unit_cost(&self) -> Money {
        Money::from_cents(self.unit_cost_cents)
    }

    #[inline]
    pub fn total_value(&self) -> Money {
        Money::from_cents(self.total_value_cents)
    }
}

/// Current balance and valuation of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockBalance {
    pub product_id: String,
    pub product_code: String,
    pub balance: i64,
    pub average_cost_cents: i64,
    pub inventory_value_cents: i64,
}

/// Sort order of ledger listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LedgerOrder {
    #[default]
    OldestFirst,
    NewestFirst,
}

/// Filters for ledger listings.
///
/// ## Example
/// ```rust
/// use kardex_core::types::{LedgerFilter, LedgerOrder, MovementKind};
///
/// let filter = LedgerFilter::default()
///     .kind(MovementKind::Exit)
///     .newest_first()
///     .limit(20);
/// assert_eq!(filter.order, LedgerOrder::NewestFirst);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LedgerFilter {
    pub kind: Option<MovementKind>,
    pub document_ref: Option<String>,
    #[ts(as = "Option<String>")]
    pub from: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub offset: u32,
    pub limit: Option<u32>,
    #[serde(default)]
    pub order: LedgerOrder,
}

impl LedgerFilter {
    pub fn kind(mut self, kind: MovementKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn document_ref(mut self, document_ref: impl Into<String>) -> Self {
        self.document_ref = Some(document_ref.into());
        self
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn since(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    pub fn until(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn newest_first(mut self) -> Self {
        self.order = LedgerOrder::NewestFirst;
        self
    }
}

/// Movement totals over a slice of the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LedgerSummary {
    pub total_movements: i64,
    /// Units received.
    pub total_entries: i64,
    /// Units shipped.
    pub total_exits: i64,
    /// Units written off by adjustment.
    pub total_adjustments: i64,
    /// `total_entries - total_exits - total_adjustments`.
    pub net_change: i64,
}

/// Recent movements of one product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MovementReport {
    pub product: Product,
    pub period_days: u32,
    pub summary: LedgerSummary,
    pub movements: Vec<LedgerEntry>,
}

/// Warehouse-wide stock figures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventorySummary {
    pub total_products: i64,
    pub active_products: i64,
    pub low_stock_products: i64,
    pub out_of_stock_products: i64,
    /// Active stock valued at average cost.
    pub total_value_cents: i64,
}

// =============================================================================
// Guides
// =============================================================================

/// Direction of a dispatch guide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum GuideKind {
    /// Goods received into the warehouse.
    Incoming,
    /// Goods dispatched to a customer.
    Outgoing,
    /// Goods moved out to another location.
    Transfer,
}

impl GuideKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            GuideKind::Incoming => "incoming",
            GuideKind::Outgoing => "outgoing",
            GuideKind::Transfer => "transfer",
        }
    }
}

impl fmt::Display for GuideKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a guide. See [`crate::guide`] for the transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum GuideStatus {
    Draft,
    Pending,
    InTransit,
    Completed,
    Cancelled,
    Returned,
}

impl GuideStatus {
    pub const ALL: [GuideStatus; 6] = [
        GuideStatus::Draft,
        GuideStatus::Pending,
        GuideStatus::InTransit,
        GuideStatus::Completed,
        GuideStatus::Cancelled,
        GuideStatus::Returned,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            GuideStatus::Draft => "draft",
            GuideStatus::Pending => "pending",
            GuideStatus::InTransit => "in_transit",
            GuideStatus::Completed => "completed",
            GuideStatus::Cancelled => "cancelled",
            GuideStatus::Returned => "returned",
        }
    }
}

impl fmt::Display for GuideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dispatch guide (guía de remisión).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Guide {
    pub id: String,
    pub code: String,
    pub kind: GuideKind,
    pub status: GuideStatus,
    /// Customer or supplier name.
    pub counterparty: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub estimated_delivery_at: Option<DateTime<Utc>>,
    /// Set when the guide is completed.
    #[ts(as = "Option<String>")]
    pub delivered_at: Option<DateTime<Utc>>,
    /// Set when the completion batch reached the ledger.
    #[ts(as = "Option<String>")]
    pub stock_applied_at: Option<DateTime<Utc>>,
}

/// One line of a guide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct GuideItem {
    pub id: String,
    pub guide_id: String,
    /// 1-based line order; completion applies lines in this order.
    pub line_no: i64,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: Option<i64>,
    pub discount_cents: i64,
    pub subtotal_cents: i64,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for a guide line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewGuideItem {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: Option<i64>,
    #[serde(default)]
    pub discount_cents: i64,
    pub note: Option<String>,
}

impl NewGuideItem {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            unit_price_cents: None,
            discount_cents: 0,
            note: None,
        }
    }

    pub fn unit_price(mut self, cents: i64) -> Self {
        self.unit_price_cents = Some(cents);
        self
    }

    pub fn discount(mut self, cents: i64) -> Self {
        self.discount_cents = cents;
        self
    }
}

/// Edits to one guide line. `None` keeps the current value.
///
/// The product of a line cannot change; remove the line and add another.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GuideItemUpdate {
    pub quantity: Option<i64>,
    pub unit_price_cents: Option<i64>,
    pub discount_cents: Option<i64>,
    pub note: Option<String>,
}

impl GuideItemUpdate {
    pub fn quantity(mut self, quantity: i64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn unit_price(mut self, cents: i64) -> Self {
        self.unit_price_cents = Some(cents);
        self
    }

    pub fn discount(mut self, cents: i64) -> Self {
        self.discount_cents = Some(cents);
        self
    }
}

/// Edits to a guide's header. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GuideUpdate {
    pub counterparty: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "Option<String>")]
    pub estimated_delivery_at: Option<DateTime<Utc>>,
}

impl GuideUpdate {
    pub fn is_empty(&self) -> bool {
        self.counterparty.is_none()
            && self.origin.is_none()
            && self.destination.is_none()
            && self.notes.is_none()
            && self.estimated_delivery_at.is_none()
    }

    /// Names of the fields this update sets, for the guide history.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        [
            ("counterparty", self.counterparty.is_some()),
            ("origin", self.origin.is_some()),
            ("destination", self.destination.is_some()),
            ("notes", self.notes.is_some()),
            ("estimated_delivery_at", self.estimated_delivery_at.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}

/// Input for guide creation. Guides always start as drafts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewGuide {
    pub code: String,
    pub kind: GuideKind,
    pub counterparty: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "Option<String>")]
    pub estimated_delivery_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<NewGuideItem>,
}

impl NewGuide {
    pub fn new(code: impl Into<String>, kind: GuideKind) -> Self {
        Self {
            code: code.into(),
            kind,
            counterparty: None,
            origin: None,
            destination: None,
            notes: None,
            estimated_delivery_at: None,
            items: Vec::new(),
        }
    }

    pub fn counterparty(mut self, counterparty: impl Into<String>) -> Self {
        self.counterparty = Some(counterparty.into());
        self
    }

    pub fn destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn item(mut self, item: NewGuideItem) -> Self {
        self.items.push(item);
        self
    }
}

/// What happened to a guide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum GuideAction {
    Created,
    /// Header fields edited while draft or pending.
    Updated,
    ItemAdded,
    ItemUpdated,
    ItemRemoved,
    StatusChanged,
}

/// One row of a guide's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct GuideEvent {
    pub id: String,
    pub guide_id: String,
    pub actor: String,
    pub action: GuideAction,
    pub from_status: Option<GuideStatus>,
    pub to_status: Option<GuideStatus>,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Guide with its lines and history, for tracking screens.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GuideTracking {
    pub guide: Guide,
    pub items: Vec<GuideItem>,
    pub events: Vec<GuideEvent>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i64, min_stock: i64, max_stock: Option<i64>) -> Product {
        let now = Utc::now();
        Product {
            id: "p-1".to_string(),
            code: "CEM-42".to_string(),
            name: "Cemento 42.5kg".to_string(),
            description: None,
            unit_of_measure: "BOLSA".to_string(),
            stock,
            min_stock,
            max_stock,
            purchase_cost_cents: 2500,
            average_cost_cents: 2600,
            sale_price_cents: 3200,
            is_active: true,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_movement_kind_sign() {
        assert_eq!(MovementKind::Entry.sign(), 1);
        assert_eq!(MovementKind::Exit.sign(), -1);
        assert_eq!(MovementKind::Adjustment.sign(), -1);

        let req = MovementRequest::new("p-1", MovementKind::Exit, 4);
        assert_eq!(req.signed_quantity(), -4);
    }

    #[test]
    fn test_product_stock_flags() {
        let p = product(10, 10, Some(50));
        assert!(p.is_low_stock());
        assert!(!p.is_out_of_stock());
        assert!(!p.is_over_max());

        let p = product(0, 10, None);
        assert!(p.is_out_of_stock());

        let p = product(60, 10, Some(50));
        assert!(p.is_over_max());
        assert!(!p.is_low_stock());
    }

    #[test]
    fn test_product_balance_uses_average_cost() {
        let balance = product(3, 1, None).balance();
        assert_eq!(balance.balance, 3);
        assert_eq!(balance.average_cost_cents, 2600);
        assert_eq!(balance.inventory_value_cents, 7800);

        let huge = Product {
            average_cost_cents: i64::MAX / 2,
            ..product(3, 1, None)
        };
        assert_eq!(huge.inventory_value().cents(), i64::MAX);
    }

    #[test]
    fn test_guide_update_lists_changed_fields() {
        assert!(GuideUpdate::default().is_empty());

        let update = GuideUpdate {
            destination: Some("Av. Ejército 1020".to_string()),
            notes: Some("entregar por la tarde".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
        assert_eq!(update.changed_fields(), vec!["destination", "notes"]);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&GuideStatus::InTransit).unwrap();
        assert_eq!(json, "\"in_transit\"");
        let back: GuideStatus = serde_json::from_str("\"returned\"").unwrap();
        assert_eq!(back, GuideStatus::Returned);
        assert_eq!(GuideStatus::InTransit.to_string(), "in_transit");
    }
}
