use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::constants::{MAX_LINE_QUANTITY, MAX_LONG_TEXT_LEN, MAX_SHORT_TEXT_LEN};
use crate::routes::timestamp_to_rfc3339;

/// Store product record stored in redb
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: u64,
    pub stock: u32,
    pub active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Delivered and cancelled orders are final
    pub fn is_final(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Orders only move forward through pending, paid, shipped, delivered.
    /// Any non-final order may be cancelled.
    pub fn can_move_to(&self, next: OrderStatus) -> bool {
        if self.is_final() {
            return false;
        }
        match next {
            OrderStatus::Cancelled => true,
            _ => next.step() > self.step(),
        }
    }

    fn step(&self) -> u8 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Paid => 1,
            OrderStatus::Shipped => 2,
            OrderStatus::Delivered => 3,
            OrderStatus::Cancelled => 4,
        }
    }
}

/// One priced line of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: String,
    pub name: String,
    pub unit_price_cents: u64,
    pub quantity: u32,
}

/// Store order record stored in redb
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub user_id: String,
    pub lines: Vec<OrderLine>,
    pub total_cents: u64,
    pub shipping_address: String,
    pub status: OrderStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A cart line as submitted by the client
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: u64,
    #[serde(default)]
    pub stock: u32,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<u64>,
    pub stock: Option<u32>,
    pub active: Option<bool>,
}

/// Product model for API responses
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: u64,
    pub stock: u32,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Order model for API responses
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub lines: Vec<OrderLine>,
    pub total_cents: u64,
    pub shipping_address: String,
    pub status: OrderStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl Product {
    pub fn from_record(id: String, record: ProductRecord) -> Self {
        Self {
            id,
            name: record.name,
            description: record.description,
            price_cents: record.price_cents,
            stock: record.stock,
            active: record.active,
            created_at: timestamp_to_rfc3339(record.created_at),
            updated_at: timestamp_to_rfc3339(record.updated_at),
        }
    }
}

impl Order {
    pub fn from_record(id: String, record: OrderRecord) -> Self {
        Self {
            id,
            user_id: record.user_id,
            lines: record.lines,
            total_cents: record.total_cents,
            shipping_address: record.shipping_address,
            status: record.status,
            created_at: timestamp_to_rfc3339(record.created_at),
            updated_at: timestamp_to_rfc3339(record.updated_at),
        }
    }
}

impl NewProduct {
    pub fn into_record(self, now: i64) -> Result<ProductRecord, String> {
        let record = ProductRecord {
            name: self.name.trim().to_string(),
            description: self
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            price_cents: self.price_cents,
            stock: self.stock,
            active: self.active,
            created_at: now,
            updated_at: now,
        };
        validate_product(&record)?;
        Ok(record)
    }
}

impl ProductUpdate {
    pub fn apply(self, record: &mut ProductRecord, now: i64) -> Result<(), String> {
        if let Some(name) = self.name {
            record.name = name.trim().to_string();
        }
        if let Some(description) = self.description {
            let description = description.trim().to_string();
            record.description = (!description.is_empty()).then_some(description);
        }
        if let Some(price_cents) = self.price_cents {
            record.price_cents = price_cents;
        }
        if let Some(stock) = self.stock {
            record.stock = stock;
        }
        if let Some(active) = self.active {
            record.active = active;
        }
        validate_product(record)?;
        record.updated_at = now;
        Ok(())
    }
}

fn validate_product(record: &ProductRecord) -> Result<(), String> {
    if record.name.is_empty() || record.name.chars().count() > MAX_SHORT_TEXT_LEN {
        return Err("Product name is required".to_string());
    }
    if record
        .description
        .as_ref()
        .is_some_and(|d| d.chars().count() > MAX_LONG_TEXT_LEN)
    {
        return Err("Product description is too long".to_string());
    }
    if record.price_cents == 0 {
        return Err("Product price must be positive".to_string());
    }
    Ok(())
}

/// Why a cart could not be priced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    Empty,
    InvalidQuantity(String),
    UnknownProduct(String),
    Unavailable(String),
    InsufficientStock { product: String, available: u32 },
}

impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CartError::Empty => f.write_str("Cart is empty"),
            CartError::InvalidQuantity(id) => write!(
                f,
                "Quantity for product {} must be between 1 and {}",
                id, MAX_LINE_QUANTITY
            ),
            CartError::UnknownProduct(id) => write!(f, "Unknown product: {}", id),
            CartError::Unavailable(name) => write!(f, "Product is not available: {}", name),
            CartError::InsufficientStock { product, available } => {
                write!(f, "Only {} left of {}", available, product)
            }
        }
    }
}

/// Price a cart against the catalogue
///
/// Lines for the same product are merged. Returns the priced lines and the
/// order total; stock is checked but not decremented.
pub fn price_cart(
    cart: &[CartLine],
    catalogue: &HashMap<String, ProductRecord>,
) -> Result<(Vec<OrderLine>, u64), CartError> {
    if cart.is_empty() {
        return Err(CartError::Empty);
    }

    let mut quantities: Vec<(String, u32)> = Vec::new();
    for line in cart {
        if line.quantity == 0 || line.quantity > MAX_LINE_QUANTITY {
            return Err(CartError::InvalidQuantity(line.product_id.clone()));
        }
        match quantities.iter_mut().find(|(id, _)| *id == line.product_id) {
            Some((_, quantity)) => *quantity = quantity.saturating_add(line.quantity),
            None => quantities.push((line.product_id.clone(), line.quantity)),
        }
    }

    let mut lines = Vec::with_capacity(quantities.len());
    let mut total: u64 = 0;
    for (product_id, quantity) in quantities {
        let product = catalogue
            .get(&product_id)
            .ok_or_else(|| CartError::UnknownProduct(product_id.clone()))?;
        if !product.active {
            return Err(CartError::Unavailable(product.name.clone()));
        }
        if product.stock < quantity {
            return Err(CartError::InsufficientStock {
                product: product.name.clone(),
                available: product.stock,
            });
        }
        total = total.saturating_add(product.price_cents.saturating_mul(u64::from(quantity)));
        lines.push(OrderLine {
            product_id,
            name: product.name.clone(),
            unit_price_cents: product.price_cents,
            quantity,
        });
    }

    Ok((lines, total))
}

/// Format cents as a decimal amount, e.g. `1999` -> `19.99`
pub fn format_cents(cents: u64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}
