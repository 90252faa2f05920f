use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::ApiError,
    orders::{
        repo::{DeliveryAddress, OrderItem},
        status::{OrderStatus, PaymentMethod},
    },
    response::{default_limit, default_page, PageQuery},
};

/// Flat 5% on the goods subtotal, matching what checkout displays.
pub const TAX_RATE: f64 = 0.05;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderItem {
    pub name: String,
    pub price: f64,
    pub quantity: i32,
    pub special_instructions: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub restaurant_id: Uuid,
    #[serde(default)]
    pub items: Vec<NewOrderItem>,
    pub delivery_address: DeliveryAddress,
    pub phone_number: Option<String>,
    pub notes: Option<String>,
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignDeliveryRequest {
    pub delivery_person_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub status: Option<OrderStatus>,
}

impl OrderListQuery {
    pub fn page(&self) -> PageQuery {
        PageQuery::new(self.page, self.limit)
    }
}

/// Line items with server-computed subtotals. Client-supplied subtotals are
/// ignored.
pub fn build_line_items(items: Vec<NewOrderItem>) -> Result<Vec<OrderItem>, ApiError> {
    items
        .into_iter()
        .map(|item| {
            if item.name.trim().is_empty() {
                return Err(ApiError::Validation("Item name is required".into()));
            }
            if item.price < 0.0 {
                return Err(ApiError::Validation("Item price must not be negative".into()));
            }
            if item.quantity < 1 {
                return Err(ApiError::Validation(
                    "Item quantity must be at least 1".into(),
                ));
            }
            let subtotal = item.price * item.quantity as f64;
            Ok(OrderItem {
                name: item.name,
                price: item.price,
                quantity: item.quantity,
                special_instructions: item.special_instructions,
                subtotal,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderTotals {
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub tax: f64,
    pub discount: f64,
    pub total: f64,
}

impl OrderTotals {
    /// `total = subtotal - discount + delivery_fee + tax`; the discount is
    /// capped at the subtotal so the total never goes negative.
    pub fn compute(items: &[OrderItem], delivery_fee: f64, discount: f64) -> Self {
        let subtotal: f64 = items.iter().map(|i| i.subtotal).sum();
        let discount = discount.clamp(0.0, subtotal);
        let tax = subtotal * TAX_RATE;
        Self {
            subtotal,
            delivery_fee,
            tax,
            discount,
            total: subtotal - discount + delivery_fee + tax,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(price: f64, quantity: i32) -> NewOrderItem {
        NewOrderItem {
            name: "Margherita".into(),
            price,
            quantity,
            special_instructions: None,
        }
    }

    #[test]
    fn line_subtotals_are_price_times_quantity() {
        let items = build_line_items(vec![item(4.5, 2), item(2.0, 3)]).unwrap();
        assert_eq!(items[0].subtotal, 9.0);
        assert_eq!(items[1].subtotal, 6.0);
    }

    #[test]
    fn rejects_bad_lines() {
        assert!(build_line_items(vec![item(-1.0, 1)]).is_err());
        assert!(build_line_items(vec![item(1.0, 0)]).is_err());
        let mut unnamed = item(1.0, 1);
        unnamed.name = "  ".into();
        assert!(build_line_items(vec![unnamed]).is_err());
    }

    #[test]
    fn totals_formula() {
        let items = build_line_items(vec![item(10.0, 2)]).unwrap();
        let totals = OrderTotals::compute(&items, 2.0, 0.0);
        assert_eq!(totals.subtotal, 20.0);
        assert!((totals.tax - 1.0).abs() < 1e-9);
        assert!((totals.total - 23.0).abs() < 1e-9);
    }

    #[test]
    fn discount_never_drives_total_negative() {
        let items = build_line_items(vec![item(5.0, 1)]).unwrap();
        let totals = OrderTotals::compute(&items, 0.0, 100.0);
        assert_eq!(totals.discount, 5.0);
        assert!(totals.total >= 0.0);
    }
}
