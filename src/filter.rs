//! List filtering and ordering.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::product::Product;

/// Field to sort `list` results by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Lexicographic by name.
    Name,
    /// Numeric by price.
    Price,
    /// Numeric by quantity.
    Quantity,
}

impl FromStr for SortKey {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "price" => Ok(Self::Price),
            "quantity" => Ok(Self::Quantity),
            other => Err(StoreError::config(format!(
                "unknown sort key '{other}' (expected name, price or quantity)"
            ))),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Name => "name",
            Self::Price => "price",
            Self::Quantity => "quantity",
        })
    }
}

/// Sort direction. Defaults to ascending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Smallest first.
    #[default]
    #[serde(alias = "asc")]
    Ascending,
    /// Largest first.
    #[serde(alias = "desc")]
    Descending,
}

impl FromStr for SortOrder {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            other => Err(StoreError::config(format!(
                "unknown sort order '{other}' (expected asc or desc)"
            ))),
        }
    }
}

/// Predicate and ordering applied by `list`.
///
/// Every criterion is optional; the default filter returns all records.
///
/// # Examples
///
/// ```
/// use inventory_store::{ListFilter, SortKey, SortOrder};
///
/// let filter = ListFilter::new()
///     .category("Books")
///     .min_price(10.0)
///     .sort_by(SortKey::Price, SortOrder::Descending);
/// assert_eq!(filter.category.as_deref(), Some("Books"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListFilter {
    /// Exact category match.
    pub category: Option<String>,
    /// Inclusive lower price bound.
    pub min_price: Option<f64>,
    /// Inclusive upper price bound.
    pub max_price: Option<f64>,
    /// Field to order by; `None` orders by id.
    pub sort_by: Option<SortKey>,
    /// Direction for `sort_by`.
    pub order: SortOrder,
}

impl ListFilter {
    /// Creates a filter that matches everything, unsorted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps only products in exactly this category.
    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Keeps only products priced at least `min`.
    #[must_use]
    pub fn min_price(mut self, min: f64) -> Self {
        self.min_price = Some(min);
        self
    }

    /// Keeps only products priced at most `max`.
    #[must_use]
    pub fn max_price(mut self, max: f64) -> Self {
        self.max_price = Some(max);
        self
    }

    /// Orders results by `key` in `order`.
    #[must_use]
    pub fn sort_by(mut self, key: SortKey, order: SortOrder) -> Self {
        self.sort_by = Some(key);
        self.order = order;
        self
    }

    /// Returns true if the product passes the category and price criteria.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = &self.category {
            if product.category != *category {
                return false;
            }
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        true
    }

    /// Filters and orders products. See [`sort`](Self::sort).
    pub fn apply<'a, I>(&self, products: I) -> Vec<Product>
    where
        I: IntoIterator<Item = &'a Product>,
    {
        let mut out: Vec<Product> = products
            .into_iter()
            .filter(|p| self.matches(p))
            .cloned()
            .collect();
        self.sort(&mut out);
        out
    }

    /// Orders products by the filter's sort key and direction.
    ///
    /// Ties on the sort key are broken by id ascending, in both directions,
    /// so results are deterministic. Without a sort key the output is ordered
    /// by id ascending.
    pub fn sort(&self, products: &mut [Product]) {
        let Some(key) = self.sort_by else {
            products.sort_by(|a, b| a.id.cmp(&b.id));
            return;
        };

        products.sort_by(|a, b| {
            let primary = compare_by(key, a, b);
            let primary = match self.order {
                SortOrder::Ascending => primary,
                SortOrder::Descending => primary.reverse(),
            };
            primary.then_with(|| a.id.cmp(&b.id))
        });
    }
}

fn compare_by(key: SortKey, a: &Product, b: &Product) -> Ordering {
    match key {
        SortKey::Name => a.name.cmp(&b.name),
        SortKey::Price => a.price.total_cmp(&b.price),
        SortKey::Quantity => a.quantity.cmp(&b.quantity),
    }
}
