//! Product records and field validation.
//!
//! A [`Product`] is one inventory item. Ids are assigned by the caller before
//! insertion; the store never generates them. [`ProductId::generate`] is a
//! convenience for callers that want random ids.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FieldValue, ProductField, StoreError, StoreResult};

/// Opaque, caller-assigned product identifier.
///
/// # Examples
///
/// ```
/// use inventory_store::ProductId;
///
/// let id = ProductId::from("sku-42");
/// assert_eq!(id.as_str(), "sku-42");
/// assert!(!ProductId::generate().is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Creates an id from any string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates a random RFC 4122 v4 id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the id is the empty string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ProductId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<ProductId> for String {
    fn from(id: ProductId) -> Self {
        id.0
    }
}

impl AsRef<str> for ProductId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ProductId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// One inventory item.
///
/// Serialized with the field names `id, name, price, quantity, category`.
/// Absent fields decode to their zero values and are then subject to
/// validation like any other input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    /// Unique within a store.
    pub id: ProductId,
    /// Display name; must not be empty.
    pub name: String,
    /// Unit price; finite and non-negative.
    pub price: f64,
    /// Units in stock; non-negative.
    pub quantity: i64,
    /// Free-form grouping, matched exactly by filters.
    pub category: String,
}

impl Product {
    /// Creates a product.
    #[must_use]
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        price: f64,
        quantity: i64,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            quantity,
            category: category.into(),
        }
    }

    /// Validates the product's fields. See [`validate`].
    pub fn validate(&self) -> StoreResult<()> {
        validate(self)
    }
}

/// Checks field invariants in order: name, price, quantity.
///
/// Returns the first violation only. The id is not checked here; insertion
/// paths reject empty ids separately because updates take their id from the
/// caller's key instead of the record.
pub fn validate(product: &Product) -> StoreResult<()> {
    if product.name.is_empty() {
        return Err(StoreError::invalid(
            ProductField::Name,
            "cannot be empty",
            FieldValue::Text(product.name.clone()),
        ));
    }
    // `!(x >= 0.0)` also rejects NaN.
    if !(product.price >= 0.0) || !product.price.is_finite() {
        return Err(StoreError::invalid(
            ProductField::Price,
            "must be non-negative",
            FieldValue::Number(product.price),
        ));
    }
    if product.quantity < 0 {
        return Err(StoreError::invalid(
            ProductField::Quantity,
            "must be non-negative",
            FieldValue::Integer(product.quantity),
        ));
    }
    Ok(())
}

/// Validation applied before inserting a new record: non-empty id, then
/// [`validate`].
pub(crate) fn validate_new(product: &Product) -> StoreResult<()> {
    if product.id.is_empty() {
        return Err(StoreError::invalid(
            ProductField::Id,
            "cannot be empty",
            FieldValue::Text(String::new()),
        ));
    }
    validate(product)
}
