use chrono::Utc;
use rand::Rng;
use tracing::{info, warn};

use crate::db::Database;
use crate::error::AppError;
use crate::models::{CreateOrder, Order, OrderLineItem, OrderStatus, PaymentStatus};

const CENT: f64 = 0.005;

/// `ORD-<epoch millis>-<1000..=9999>`
pub fn generate_order_number() -> String {
    let suffix: u16 = rand::thread_rng().gen_range(1000..=9999);
    format!("ORD-{}-{}", Utc::now().timestamp_millis(), suffix)
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Totals are taken from the client as submitted. Mismatches are only
/// reported so they can be followed up.
fn check_totals(order_number: &str, items: &[OrderLineItem], subtotal: f64, tax: f64, total: f64) {
    let line_sum: f64 = items.iter().map(|item| item.item_total).sum();

    if (line_sum - subtotal).abs() > CENT {
        warn!("Order {order_number}: line totals {line_sum:.2} do not match subtotal {subtotal:.2}");
    }
    if (subtotal + tax - total).abs() > CENT {
        warn!("Order {order_number}: subtotal {subtotal:.2} + tax {tax:.2} does not match total {total:.2}");
    }
}

pub fn create_order(db: &Database, payload: CreateOrder) -> Result<Order, AppError> {
    let (Some(customer_name), Some(customer_phone), Some(items), Some(pickup_time)) = (
        required(payload.customer_name),
        required(payload.customer_phone),
        payload.items.filter(|items| !items.is_empty()),
        required(payload.pickup_time),
    ) else {
        return Err(AppError::validation("Please provide all required fields"));
    };

    let mut problems = Vec::new();
    if payload.subtotal.is_none() {
        problems.push("subtotal is required".to_string());
    }
    if payload.total.is_none() {
        problems.push("total is required".to_string());
    }
    for (n, item) in items.iter().enumerate() {
        if item.quantity < 1 {
            problems.push(format!("items[{n}].quantity must be at least 1"));
        }
        if item.item_id.is_empty() || item.item_name.is_empty() {
            problems.push(format!("items[{n}] needs an itemId and itemName"));
        }
    }
    if !problems.is_empty() {
        return Err(AppError::validation(problems.join(", ")));
    }

    let subtotal = payload.subtotal.unwrap_or_default();
    let tax = payload.tax.unwrap_or(0.0);
    let total = payload.total.unwrap_or_default();
    let order_number = generate_order_number();

    check_totals(&order_number, &items, subtotal, tax, total);

    let order = db.insert_order(&Order {
        id: 0,
        order_number,
        customer_name,
        customer_phone,
        customer_email: payload.customer_email.filter(|e| !e.is_empty()),
        items,
        subtotal,
        tax,
        total,
        pickup_time,
        status: OrderStatus::default(),
        notes: payload.notes,
        payment_status: PaymentStatus::default(),
        created_at: String::new(),
        updated_at: String::new(),
    })?;

    info!(
        "Order {} placed for pickup at {} ({} items)",
        order.order_number,
        order.pickup_time,
        order.items.len()
    );

    Ok(order)
}

pub fn get_all_orders(db: &Database, status: Option<&str>) -> Result<Vec<Order>, AppError> {
    db.list_orders(status.filter(|s| !s.is_empty()))
}

/// Order ids are numeric. Anything else cannot name an order.
fn parse_order_id(id: &str) -> Result<i64, AppError> {
    id.parse()
        .map_err(|_| AppError::not_found("Order not found"))
}

pub fn get_order(db: &Database, id: &str) -> Result<Order, AppError> {
    db.find_order(parse_order_id(id)?)?
        .ok_or_else(|| AppError::not_found("Order not found"))
}

pub fn update_order_status(
    db: &Database,
    id: &str,
    status: Option<&str>,
) -> Result<Order, AppError> {
    let status: OrderStatus = status
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| AppError::validation("Invalid status"))?;

    let order = db
        .set_order_status(parse_order_id(id)?, status)?
        .ok_or_else(|| AppError::not_found("Order not found"))?;

    info!("Order {} is now {}", order.order_number, order.status);

    Ok(order)
}

pub fn update_payment_status(
    db: &Database,
    id: &str,
    payment_status: Option<&str>,
) -> Result<Order, AppError> {
    let payment_status: PaymentStatus = payment_status
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| AppError::validation("Invalid payment status"))?;

    db.set_payment_status(parse_order_id(id)?, payment_status)?
        .ok_or_else(|| AppError::not_found("Order not found"))
}
