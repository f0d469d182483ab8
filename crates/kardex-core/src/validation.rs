//! # Validation Module
//!
//! Input rules for the Kardex engine.
//!
//! Every stock-changing service runs these checks before it opens a
//! transaction, so a malformed request never waits on (or holds) a product
//! lock.
//!
//! ```text
//! request ──► validation (this module) ──► BEGIN ──► lock ──► plan ──► COMMIT
//!                  │
//!                  └── ValidationError → InvalidInput, nothing locked
//! ```
//!
//! ## Usage
//! ```rust
//! use kardex_core::validation::{validate_product_code, validate_quantity};
//!
//! assert!(validate_product_code("CEM-42").is_ok());
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{
    GuideUpdate, MovementRequest, NewGuide, NewGuideItem, NewProduct, ProductUpdate,
};
use crate::{MAX_MOVEMENT_QUANTITY, MAX_UNIT_COST_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_CODE_LEN: usize = 50;
const MAX_NAME_LEN: usize = 200;
const MAX_REF_LEN: usize = 100;
const MAX_NOTES_LEN: usize = 1000;

// =============================================================================
// String Validators
// =============================================================================

fn required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

fn optional_text(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(value) if value.trim().chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

fn code_chars(field: &str, value: &str, extra: &[char]) -> ValidationResult<()> {
    if value
        .trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || extra.contains(&c))
    {
        Ok(())
    } else {
        Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        })
    }
}

/// Validates a product code.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - ASCII letters, digits, `-`, `_` and `.`
///
/// ## Example
/// ```rust
/// use kardex_core::validation::validate_product_code;
///
/// assert!(validate_product_code("CEM-42.5").is_ok());
/// assert!(validate_product_code("").is_err());
/// assert!(validate_product_code("CEM 42").is_err());
/// ```
pub fn validate_product_code(code: &str) -> ValidationResult<()> {
    required_text("code", code, MAX_CODE_LEN)?;
    code_chars("code", code, &['.'])
}

/// Validates a product name (1-200 characters).
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    required_text("name", name, MAX_NAME_LEN)
}

/// Validates a guide code.
///
/// Guide codes follow the printed series, e.g. `GR-001/2024`, so `/` is
/// accepted alongside the product-code characters.
pub fn validate_guide_code(code: &str) -> ValidationResult<()> {
    required_text("guide code", code, MAX_CODE_LEN)?;
    code_chars("guide code", code, &['/'])
}

/// Validates the originating document of a movement.
pub fn validate_document_ref(document_ref: &str) -> ValidationResult<()> {
    required_text("document_ref", document_ref, MAX_REF_LEN)
}

/// Validates the actor recorded on ledger entries and guide events.
pub fn validate_actor(actor: &str) -> ValidationResult<()> {
    required_text("actor", actor, MAX_REF_LEN)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a movement quantity.
///
/// ## Rules
/// - Must be positive; direction comes from the movement kind
/// - At most [`MAX_MOVEMENT_QUANTITY`]
///
/// ## Example
/// ```rust
/// use kardex_core::validation::validate_quantity;
///
/// assert!(validate_quantity(1).is_ok());
/// assert!(validate_quantity(0).is_err());
/// assert!(validate_quantity(-3).is_err());
/// ```
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if quantity > MAX_MOVEMENT_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_MOVEMENT_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a cost or price in cents.
///
/// Zero is allowed; the ceiling is [`MAX_UNIT_COST_CENTS`].
pub fn validate_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_UNIT_COST_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_UNIT_COST_CENTS,
        });
    }
    Ok(())
}

/// Validates reorder thresholds.
///
/// `min_stock` must be non-negative and `max_stock`, when present, must not
/// be below it.
pub fn validate_thresholds(min_stock: i64, max_stock: Option<i64>) -> ValidationResult<()> {
    if min_stock < 0 {
        return Err(ValidationError::OutOfRange {
            field: "min_stock".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    if let Some(max) = max_stock {
        if max < min_stock {
            return Err(ValidationError::OutOfRange {
                field: "max_stock".to_string(),
                min: min_stock,
                max: i64::MAX,
            });
        }
    }

    Ok(())
}

/// Validates a signed adjustment and its reason.
pub fn validate_adjustment(delta: i64, reason: &str) -> ValidationResult<()> {
    if delta == 0 {
        return Err(ValidationError::InvalidFormat {
            field: "delta".to_string(),
            reason: "adjustment must change the stock".to_string(),
        });
    }
    validate_quantity(delta.saturating_abs())?;
    required_text("reason", reason, MAX_NAME_LEN)
}

/// Validates a manual transfer out to `destination`.
pub fn validate_transfer(quantity: i64, destination: &str) -> ValidationResult<()> {
    validate_quantity(quantity)?;
    required_text("destination", destination, MAX_NAME_LEN)
}

// =============================================================================
// Request Validators
// =============================================================================

/// Validates a movement request as a whole.
pub fn validate_movement(req: &MovementRequest) -> ValidationResult<()> {
    if req.product_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "product_id".to_string(),
        });
    }
    validate_quantity(req.quantity)?;
    if let Some(cost) = req.unit_cost_cents {
        validate_cents("unit_cost", cost)?;
    }
    validate_document_ref(&req.document_ref)?;
    validate_actor(&req.actor)
}

/// Validates product creation input.
pub fn validate_new_product(input: &NewProduct) -> ValidationResult<()> {
    validate_product_code(&input.code)?;
    validate_product_name(&input.name)?;
    validate_cents("purchase_cost", input.purchase_cost_cents)?;
    validate_cents("sale_price", input.sale_price_cents)?;
    validate_thresholds(input.min_stock.unwrap_or(0), input.max_stock)?;

    if input.initial_stock != 0 {
        validate_quantity(input.initial_stock)?;
    }

    Ok(())
}

/// Validates non-stock product edits.
pub fn validate_product_update(update: &ProductUpdate) -> ValidationResult<()> {
    if let Some(name) = &update.name {
        validate_product_name(name)?;
    }
    if let Some(cents) = update.purchase_cost_cents {
        validate_cents("purchase_cost", cents)?;
    }
    if let Some(cents) = update.sale_price_cents {
        validate_cents("sale_price", cents)?;
    }
    if let Some(unit) = &update.unit_of_measure {
        required_text("unit_of_measure", unit, MAX_CODE_LEN)?;
    }
    Ok(())
}

/// Validates one guide line.
///
/// The discount may not exceed the line's gross amount.
pub fn validate_guide_item(item: &NewGuideItem) -> ValidationResult<()> {
    if item.product_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "product_id".to_string(),
        });
    }
    validate_quantity(item.quantity)?;
    validate_cents("discount", item.discount_cents)?;

    let gross = match item.unit_price_cents {
        Some(price) => {
            validate_cents("unit_price", price)?;
            price.saturating_mul(item.quantity)
        }
        None => 0,
    };

    if item.discount_cents > gross {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: gross,
        });
    }

    Ok(())
}

/// Validates guide creation input, including every line.
pub fn validate_new_guide(input: &NewGuide) -> ValidationResult<()> {
    validate_guide_code(&input.code)?;
    optional_text("counterparty", input.counterparty.as_deref(), MAX_NAME_LEN)?;
    optional_text("origin", input.origin.as_deref(), MAX_NAME_LEN)?;
    optional_text("destination", input.destination.as_deref(), MAX_NAME_LEN)?;
    optional_text("notes", input.notes.as_deref(), MAX_NOTES_LEN)?;
    input.items.iter().try_for_each(validate_guide_item)
}

/// Validates a guide header edit. At least one field must be set.
pub fn validate_guide_update(update: &GuideUpdate) -> ValidationResult<()> {
    if update.is_empty() {
        return Err(ValidationError::InvalidFormat {
            field: "guide".to_string(),
            reason: "update sets no fields".to_string(),
        });
    }
    optional_text("counterparty", update.counterparty.as_deref(), MAX_NAME_LEN)?;
    optional_text("origin", update.origin.as_deref(), MAX_NAME_LEN)?;
    optional_text("destination", update.destination.as_deref(), MAX_NAME_LEN)?;
    optional_text("notes", update.notes.as_deref(), MAX_NOTES_LEN)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GuideKind, MovementKind};

    #[test]
    fn test_validate_product_code() {
        assert!(validate_product_code("CEM-42").is_ok());
        assert!(validate_product_code("FIERRO_3/8").is_err());
        assert!(validate_product_code("   ").is_err());
        assert!(validate_product_code(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_guide_code_accepts_series() {
        assert!(validate_guide_code("GR-001/2024").is_ok());
        assert!(validate_guide_code("GR 001").is_err());
    }

    #[test]
    fn test_validate_quantity_bounds() {
        assert!(validate_quantity(MAX_MOVEMENT_QUANTITY).is_ok());
        assert!(matches!(
            validate_quantity(MAX_MOVEMENT_QUANTITY + 1),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            validate_quantity(0),
            Err(ValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_validate_thresholds() {
        assert!(validate_thresholds(10, Some(100)).is_ok());
        assert!(validate_thresholds(10, None).is_ok());
        assert!(validate_thresholds(-1, None).is_err());
        assert!(validate_thresholds(10, Some(5)).is_err());
    }

    #[test]
    fn test_validate_movement() {
        let ok = MovementRequest::new("p-1", MovementKind::Entry, 5)
            .unit_cost(100)
            .document_ref("GR-1")
            .actor("ana");
        assert!(validate_movement(&ok).is_ok());

        let no_actor = ok.clone().actor("");
        assert!(matches!(
            validate_movement(&no_actor),
            Err(ValidationError::Required { field }) if field == "actor"
        ));

        let negative_cost = ok.clone().unit_cost(-1);
        assert!(validate_movement(&negative_cost).is_err());

        let no_doc = MovementRequest::new("p-1", MovementKind::Exit, 1).actor("ana");
        assert!(validate_movement(&no_doc).is_err());
    }

    #[test]
    fn test_unit_cost_ceiling_keeps_values_in_range() {
        assert!(validate_cents("unit_cost", MAX_UNIT_COST_CENTS).is_ok());
        assert!(matches!(
            validate_cents("unit_cost", MAX_UNIT_COST_CENTS + 1),
            Err(ValidationError::OutOfRange { max, .. }) if max == MAX_UNIT_COST_CENTS
        ));
        assert!(MAX_UNIT_COST_CENTS.checked_mul(MAX_MOVEMENT_QUANTITY).is_some());

        let huge = MovementRequest::new("p-1", MovementKind::Entry, MAX_MOVEMENT_QUANTITY)
            .unit_cost(10_000_000_000_000)
            .document_ref("GR-BIG")
            .actor("ana");
        assert!(matches!(
            validate_movement(&huge),
            Err(ValidationError::OutOfRange { ref field, .. }) if field == "unit_cost"
        ));
    }

    #[test]
    fn test_validate_transfer() {
        assert!(validate_transfer(5, "Almacén Cerro Colorado").is_ok());
        assert!(validate_transfer(0, "Almacén Cerro Colorado").is_err());
        assert!(matches!(
            validate_transfer(5, "  "),
            Err(ValidationError::Required { field }) if field == "destination"
        ));
    }

    #[test]
    fn test_validate_adjustment() {
        assert!(validate_adjustment(5, "conteo fisico").is_ok());
        assert!(validate_adjustment(-5, "merma").is_ok());
        assert!(validate_adjustment(0, "nada").is_err());
        assert!(validate_adjustment(3, " ").is_err());
    }

    #[test]
    fn test_validate_guide_item_discount() {
        let item = NewGuideItem::new("p-1", 2).unit_price(500).discount(200);
        assert!(validate_guide_item(&item).is_ok());

        let too_much = NewGuideItem::new("p-1", 2).unit_price(500).discount(1001);
        assert!(validate_guide_item(&too_much).is_err());

        let unpriced_discount = NewGuideItem::new("p-1", 2).discount(1);
        assert!(validate_guide_item(&unpriced_discount).is_err());
    }

    #[test]
    fn test_validate_new_guide_checks_items() {
        let guide = NewGuide::new("GS-10", GuideKind::Outgoing)
            .item(NewGuideItem::new("p-1", 1))
            .item(NewGuideItem::new("p-2", 0));
        assert!(validate_new_guide(&guide).is_err());
    }

    #[test]
    fn test_validate_guide_update() {
        assert!(validate_guide_update(&GuideUpdate::default()).is_err());

        let ok = GuideUpdate {
            counterparty: Some("Constructora Los Andes".to_string()),
            ..Default::default()
        };
        assert!(validate_guide_update(&ok).is_ok());

        let long = GuideUpdate {
            destination: Some("x".repeat(201)),
            ..Default::default()
        };
        assert!(matches!(
            validate_guide_update(&long),
            Err(ValidationError::TooLong { max: 200, .. })
        ));
    }

    #[test]
    fn test_validate_new_product() {
        let input = NewProduct::new("CEM-42", "Cemento").purchase_cost(2500);
        assert!(validate_new_product(&input).is_ok());
        assert!(validate_new_product(&input.clone().initial_stock(-4)).is_err());
        assert!(validate_new_product(&input.purchase_cost(-1)).is_err());
    }
}
