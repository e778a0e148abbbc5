use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ===== MENU DOCUMENT =====

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Menu {
    pub store: Option<StoreInfo>,
    pub global_options: Option<GlobalOptions>,
    pub categories: Vec<Category>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreInfo {
    pub name: String,
    pub tagline: String,
    pub address_line1: String,
    pub city_state_zip: String,
    pub phone: String,
    pub pickup_note: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalOptions {
    pub breads: Vec<Choice>,
    pub sauces: Vec<Choice>,
    pub dip_extra: Option<Choice>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: String,
    pub items: Vec<MenuItem>,
}

/// `price` has no default: a document item without one does not deserialize.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub options: Vec<OptionGroup>,
    #[serde(default)]
    pub price_variants: Vec<PriceVariant>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default)]
    pub category_id: String,
}

fn default_available() -> bool {
    true
}

impl Default for MenuItem {
    fn default() -> Self {
        MenuItem {
            id: String::new(),
            name: String::new(),
            description: String::new(),
            price: 0.0,
            image: String::new(),
            options: Vec::new(),
            price_variants: Vec::new(),
            tags: Vec::new(),
            available: true,
            category_id: String::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct OptionGroup {
    pub group_id: String,
    pub group_name: String,
    pub required: bool,
    #[serde(rename = "type")]
    pub kind: Option<OptionKind>,
    pub choices: Vec<Choice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices_ref: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Single,
    Multiple,
    Toggle,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Choice {
    pub id: String,
    pub label: String,
    pub price_delta: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct PriceVariant {
    pub label: String,
    pub price: f64,
}

// ===== MENU PAYLOADS =====

/// Body of `POST /api/menu/item`. `price`, `tags` and `priceVariants` stay
/// loosely typed so they can be normalized the same way on create and update.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateMenuItem {
    pub category_id: Option<String>,
    pub category_name: Option<String>,
    pub item_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Value>,
    pub image: Option<String>,
    pub tags: Option<Value>,
    pub available: Option<bool>,
    pub price_variants: Option<Value>,
}

/// Partial update. A field that is absent (or `null`) is left untouched.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateMenuItem {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Value>,
    pub image: Option<String>,
    pub tags: Option<Value>,
    pub available: Option<bool>,
    pub price_variants: Option<Value>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct UpdateAvailability {
    pub available: Option<bool>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreatedMenuItem {
    pub category_id: String,
    pub item: MenuItem,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ItemAvailability {
    pub item_id: String,
    pub available: bool,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DeletedMenuItem {
    pub item_id: String,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SearchGroup {
    pub category_id: String,
    pub category_name: String,
    pub items: Vec<MenuItem>,
}

// ===== ORDERS =====

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown order status: {s}"))
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "paid" => Ok(PaymentStatus::Paid),
            other => Err(format!("Unknown payment status: {other}")),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub items: Vec<OrderLineItem>,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
    pub pickup_time: String,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub payment_status: PaymentStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
    pub item_id: String,
    pub item_name: String,
    pub quantity: i64,
    pub base_price: f64,
    #[serde(default)]
    pub selected_options: Vec<SelectedOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_variant: Option<PriceVariant>,
    pub item_total: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectedOption {
    pub group_id: String,
    pub group_name: String,
    pub choice_id: String,
    pub choice_label: String,
    pub price_delta: f64,
}

/// Body of `POST /api/orders`. Every field is optional at the wire level so
/// missing ones surface as a validation message rather than a parse error.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateOrder {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub items: Option<Vec<OrderLineItem>>,
    pub subtotal: Option<f64>,
    pub tax: Option<f64>,
    pub total: Option<f64>,
    pub pickup_time: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct UpdateOrderStatus {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdatePaymentStatus {
    pub payment_status: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct OrderFilter {
    pub status: Option<String>,
}

// ===== ADMIN =====

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct AdminProfile {
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_item_defaults_to_available() {
        let item: MenuItem = serde_json::from_str(r#"{"id":"blt","name":"BLT","price":6.5}"#).unwrap();

        assert!(item.available);
        assert!(item.tags.is_empty());
        assert!(item.options.is_empty());
    }

    #[test]
    fn test_menu_item_requires_price() {
        let missing = serde_json::from_str::<MenuItem>(r#"{"id":"blt","name":"BLT"}"#);
        assert!(missing.is_err());
    }

    #[test]
    fn test_option_group_type_field() {
        let group: OptionGroup = serde_json::from_str(
            r#"{"groupId":"bread","groupName":"Bread","type":"single","choicesRef":"breads"}"#,
        )
        .unwrap();

        assert_eq!(group.kind, Some(OptionKind::Single));
        assert_eq!(group.choices_ref.as_deref(), Some("breads"));

        let value = serde_json::to_value(&group).unwrap();
        assert_eq!(value["type"], "single");
    }

    #[test]
    fn test_order_status_parsing() {
        assert_eq!("ready".parse::<OrderStatus>(), Ok(OrderStatus::Ready));
        assert!("archived".parse::<OrderStatus>().is_err());
        assert!("Ready".parse::<OrderStatus>().is_err());
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_payment_status_parsing() {
        assert_eq!("paid".parse::<PaymentStatus>(), Ok(PaymentStatus::Paid));
        assert!("refunded".parse::<PaymentStatus>().is_err());
    }
}
