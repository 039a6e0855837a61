use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::{AdminUser, CurrentUser};
use crate::constants::MAX_LONG_TEXT_LEN;
use crate::db::{self, tables};
use crate::error::{AppError, Result};
use crate::models::{
    format_cents, price_cart, AdminNotificationKind, CartLine, NewProduct, NotificationDetails,
    Order, OrderRecord, OrderStatus, Product, ProductRecord, ProductUpdate,
};
use crate::routes::notifications::{notify_admins, notify_user, NotificationText};
use crate::routes::{bad_json, require_text};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub items: Vec<CartLine>,
    pub shipping_address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}

fn load_product(
    products: &impl redb::ReadableTable<&'static str, &'static [u8]>,
    product_id: &str,
) -> Result<ProductRecord> {
    db::load(products, product_id)?.ok_or(AppError::NotFound("Product"))
}

// =============================================================================
// Products
// =============================================================================

/// Active products, by name
///
/// GET /api/store/products
pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    let products = db::read(&state.db, |txn| {
        let table = txn.open_table(tables::STORE_PRODUCTS)?;
        let mut products: Vec<Product> = db::scan::<ProductRecord, _>(&table)?
            .into_iter()
            .filter(|(_, p)| p.active)
            .map(|(id, record)| Product::from_record(id, record))
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    })
    .await?;

    Ok(Json(products))
}

/// Inactive products are hidden from the public
///
/// GET /api/store/products/:id
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<Product>> {
    let product = db::read(&state.db, move |txn| {
        let table = txn.open_table(tables::STORE_PRODUCTS)?;
        let record = load_product(&table, &product_id)?;
        if !record.active {
            return Err(AppError::NotFound("Product"));
        }
        Ok(Product::from_record(product_id, record))
    })
    .await?;

    Ok(Json(product))
}

/// POST /api/admin/products
pub async fn create_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    payload: std::result::Result<Json<NewProduct>, JsonRejection>,
) -> Result<Json<Product>> {
    let Json(payload) = payload.map_err(bad_json)?;
    let record = payload
        .into_record(db::now())
        .map_err(AppError::InvalidInput)?;

    let product = db::write(&state.db, move |txn| {
        let mut products = txn.open_table(tables::STORE_PRODUCTS)?;
        let id = db::new_id();
        db::store(&mut products, &id, &record)?;
        tracing::info!("Product {} created", id);
        Ok(Product::from_record(id, record))
    })
    .await?;

    Ok(Json(product))
}

/// PUT /api/admin/products/:id
pub async fn update_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(product_id): Path<String>,
    payload: std::result::Result<Json<ProductUpdate>, JsonRejection>,
) -> Result<Json<Product>> {
    let Json(update) = payload.map_err(bad_json)?;

    let product = db::write(&state.db, move |txn| {
        let mut products = txn.open_table(tables::STORE_PRODUCTS)?;
        let mut record = load_product(&products, &product_id)?;
        update
            .apply(&mut record, db::now())
            .map_err(AppError::InvalidInput)?;
        db::store(&mut products, &product_id, &record)?;
        Ok(Product::from_record(product_id, record))
    })
    .await?;

    Ok(Json(product))
}

/// Past orders keep their priced lines, so deleting a product is safe
///
/// DELETE /api/admin/products/:id
pub async fn delete_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(product_id): Path<String>,
) -> Result<Json<Value>> {
    db::write(&state.db, move |txn| {
        let mut products = txn.open_table(tables::STORE_PRODUCTS)?;
        if products.remove(product_id.as_str())?.is_none() {
            return Err(AppError::NotFound("Product"));
        }
        tracing::info!("Product {} deleted", product_id);
        Ok(())
    })
    .await?;

    Ok(Json(json!({ "message": "Product deleted" })))
}

// =============================================================================
// Orders
// =============================================================================

/// Place an order from cart lines
///
/// Prices the cart from the catalogue, decrements stock and inserts the order
/// in one write transaction, then raises an admin notification.
///
/// POST /api/store/orders
pub async fn place_order(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: std::result::Result<Json<PlaceOrderRequest>, JsonRejection>,
) -> Result<Json<Order>> {
    let Json(payload) = payload.map_err(bad_json)?;
    let shipping_address = require_text(
        "shippingAddress",
        payload.shipping_address.as_deref(),
        MAX_LONG_TEXT_LEN,
    )?;

    let i18n = state.i18n.clone();
    let order = db::write(&state.db, move |txn| {
        let mut products = txn.open_table(tables::STORE_PRODUCTS)?;

        let mut catalogue = HashMap::new();
        for line in &payload.items {
            if let Some(product) = db::load::<ProductRecord, _>(&products, &line.product_id)? {
                catalogue.insert(line.product_id.clone(), product);
            }
        }

        let (lines, total_cents) = price_cart(&payload.items, &catalogue)
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;

        let now = db::now();
        for line in &lines {
            if let Some(product) = catalogue.get_mut(&line.product_id) {
                product.stock = product.stock.saturating_sub(line.quantity);
                product.updated_at = now;
                db::store(&mut products, &line.product_id, &*product)?;
            }
        }
        drop(products);

        let order_id = db::new_id();
        let record = OrderRecord {
            user_id: user.id.clone(),
            lines,
            total_cents,
            shipping_address,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        {
            let mut orders = txn.open_table(tables::STORE_ORDERS)?;
            db::store(&mut orders, &order_id, &record)?;
        }

        let text = NotificationText::new("admin.new_order")
            .arg("order", order_id.clone())
            .arg("total", format_cents(total_cents));
        notify_admins(
            txn,
            &i18n,
            AdminNotificationKind::NewOrder,
            &text,
            Some(NotificationDetails::Order {
                order_id: order_id.clone(),
                total_cents,
                status: OrderStatus::Pending,
            }),
        )?;

        tracing::info!(
            "Order {} placed by user {} ({} cents)",
            order_id,
            user.id,
            total_cents
        );
        Ok(Order::from_record(order_id, record))
    })
    .await?;

    Ok(Json(order))
}

fn newest_first(mut orders: Vec<(String, OrderRecord)>) -> Vec<Order> {
    orders.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at));
    orders
        .into_iter()
        .map(|(id, record)| Order::from_record(id, record))
        .collect()
}

/// GET /api/store/orders
pub async fn list_my_orders(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Order>>> {
    let orders = db::read(&state.db, move |txn| {
        let table = txn.open_table(tables::STORE_ORDERS)?;
        let mine = db::scan::<OrderRecord, _>(&table)?
            .into_iter()
            .filter(|(_, o)| o.user_id == user.id)
            .collect();
        Ok(newest_first(mine))
    })
    .await?;

    Ok(Json(orders))
}

/// GET /api/admin/orders
pub async fn list_orders(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<Vec<Order>>> {
    let orders = db::read(&state.db, |txn| {
        let table = txn.open_table(tables::STORE_ORDERS)?;
        Ok(newest_first(db::scan::<OrderRecord, _>(&table)?))
    })
    .await?;

    Ok(Json(orders))
}

/// Move an order to a new status and notify its buyer
///
/// Final orders (delivered, cancelled) cannot change and statuses only move
/// forward. Cancelling returns the ordered quantities to stock.
///
/// PUT /api/admin/orders/:id/status
pub async fn update_order_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(order_id): Path<String>,
    payload: std::result::Result<Json<OrderStatusUpdate>, JsonRejection>,
) -> Result<Json<Order>> {
    let Json(OrderStatusUpdate { status }) = payload.map_err(bad_json)?;

    let i18n = state.i18n.clone();
    let order = db::write(&state.db, move |txn| {
        let record = {
            let mut orders = txn.open_table(tables::STORE_ORDERS)?;
            let mut record: OrderRecord =
                db::load(&orders, &order_id)?.ok_or(AppError::NotFound("Order"))?;
            if record.status.is_final() {
                return Err(AppError::Conflict(format!(
                    "Order is already {}",
                    record.status.as_str()
                )));
            }
            if !record.status.can_move_to(status) {
                return Err(AppError::Conflict(format!(
                    "Order cannot move from {} to {}",
                    record.status.as_str(),
                    status.as_str()
                )));
            }
            record.status = status;
            record.updated_at = db::now();
            db::store(&mut orders, &order_id, &record)?;
            record
        };

        if status == OrderStatus::Cancelled {
            let mut products = txn.open_table(tables::STORE_PRODUCTS)?;
            for line in &record.lines {
                if let Some(mut product) =
                    db::load::<ProductRecord, _>(&products, &line.product_id)?
                {
                    product.stock = product.stock.saturating_add(line.quantity);
                    db::store(&mut products, &line.product_id, &product)?;
                }
            }
        }

        let text = NotificationText::new("notifications.order_status")
            .arg("order", order_id.clone())
            .localized_arg("status", format!("orders.status.{}", status.as_str()));
        notify_user(
            txn,
            &i18n,
            &record.user_id,
            &text,
            Some(NotificationDetails::Order {
                order_id: order_id.clone(),
                total_cents: record.total_cents,
                status,
            }),
        )?;

        tracing::info!("Order {} is now {}", order_id, status.as_str());
        Ok(Order::from_record(order_id, record))
    })
    .await?;

    Ok(Json(order))
}
