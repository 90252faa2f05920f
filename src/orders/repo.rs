use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::orders::status::{OrderStatus, PaymentMethod, PaymentStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub name: String,
    pub price: f64,
    pub quantity: i32,
    #[serde(default)]
    pub special_instructions: Option<String>,
    pub subtotal: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddress {
    pub street: String,
    pub city: String,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRating {
    pub score: i32,
    #[serde(default)]
    pub comment: Option<String>,
    pub rated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub restaurant_id: Uuid,
    pub delivery_person_id: Option<Uuid>,
    pub items: Json<Vec<OrderItem>>,
    pub delivery_address: Json<DeliveryAddress>,
    pub phone_number: Option<String>,
    pub notes: Option<String>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub payment_intent_id: Option<String>,
    pub razorpay_order_id: Option<String>,
    pub razorpay_payment_id: Option<String>,
    pub refund_id: Option<String>,
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub tax: f64,
    pub discount: f64,
    pub total: f64,
    pub rating: Option<Json<OrderRating>>,
    pub delivered_at: Option<OffsetDateTime>,
    pub cancelled_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

const ORDER_COLUMNS: &str = "id, order_number, customer_id, restaurant_id, delivery_person_id, \
    items, delivery_address, phone_number, notes, status, payment_status, payment_method, \
    payment_intent_id, razorpay_order_id, razorpay_payment_id, refund_id, \
    subtotal, delivery_fee, tax, discount, total, rating, delivered_at, cancelled_at, created_at";

/// Human-facing order reference, e.g. `ORD-1719394821532-4821`.
pub fn generate_order_number() -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let random: u16 = rand::thread_rng().gen_range(0..10_000);
    format!("ORD-{millis}-{random:04}")
}

pub struct NewOrder {
    pub customer_id: Uuid,
    pub restaurant_id: Uuid,
    pub items: Vec<OrderItem>,
    pub delivery_address: DeliveryAddress,
    pub phone_number: Option<String>,
    pub notes: Option<String>,
    pub payment_method: PaymentMethod,
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub tax: f64,
    pub discount: f64,
    pub total: f64,
}

impl Order {
    pub async fn create(db: &PgPool, new: NewOrder) -> anyhow::Result<Order> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO orders (order_number, customer_id, restaurant_id, items,
                                delivery_address, phone_number, notes, payment_method,
                                subtotal, delivery_fee, tax, discount, total)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(generate_order_number())
        .bind(new.customer_id)
        .bind(new.restaurant_id)
        .bind(Json(new.items))
        .bind(Json(new.delivery_address))
        .bind(new.phone_number)
        .bind(new.notes)
        .bind(new.payment_method)
        .bind(new.subtotal)
        .bind(new.delivery_fee)
        .bind(new.tax)
        .bind(new.discount)
        .bind(new.total)
        .fetch_one(db)
        .await?;
        Ok(order)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(order)
    }

    pub async fn list_for_customer(
        db: &PgPool,
        customer_id: Uuid,
        status: Option<OrderStatus>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE customer_id = $1 AND ($2::order_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(customer_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(orders)
    }

    pub async fn count_for_customer(
        db: &PgPool,
        customer_id: Uuid,
        status: Option<OrderStatus>,
    ) -> anyhow::Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM orders
            WHERE customer_id = $1 AND ($2::order_status IS NULL OR status = $2)
            "#,
        )
        .bind(customer_id)
        .bind(status)
        .fetch_one(db)
        .await?;
        Ok(count)
    }

    pub async fn list_for_restaurant(
        db: &PgPool,
        restaurant_id: Uuid,
        status: Option<OrderStatus>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE restaurant_id = $1 AND ($2::order_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(restaurant_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(orders)
    }

    pub async fn count_for_restaurant(
        db: &PgPool,
        restaurant_id: Uuid,
        status: Option<OrderStatus>,
    ) -> anyhow::Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM orders
            WHERE restaurant_id = $1 AND ($2::order_status IS NULL OR status = $2)
            "#,
        )
        .bind(restaurant_id)
        .bind(status)
        .fetch_one(db)
        .await?;
        Ok(count)
    }

    /// Persists a status transition, stamping the matching timestamp for the
    /// terminal states.
    pub async fn set_status(db: &PgPool, id: Uuid, status: OrderStatus) -> anyhow::Result<Order> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders SET status = $2,
                delivered_at = CASE WHEN $2 = 'delivered'::order_status THEN NOW()
                                    ELSE delivered_at END,
                cancelled_at = CASE WHEN $2 = 'cancelled'::order_status THEN NOW()
                                    ELSE cancelled_at END
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .fetch_one(db)
        .await?;
        Ok(order)
    }

    /// Assignment and the forced `out_for_delivery` move are one statement,
    /// so there is no window where one is visible without the other.
    pub async fn assign_delivery(
        db: &PgPool,
        id: Uuid,
        delivery_person_id: Uuid,
    ) -> anyhow::Result<Order> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET delivery_person_id = $2, status = 'out_for_delivery'::order_status
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(delivery_person_id)
        .fetch_one(db)
        .await?;
        Ok(order)
    }

    /// Guarded so that replayed success events (webhook plus confirm, webhook
    /// delivered twice) change the row at most once. Returns whether this
    /// call was the first application.
    pub async fn mark_payment_completed(
        db: &PgPool,
        id: Uuid,
        payment_intent_id: Option<&str>,
        razorpay_ids: Option<(&str, &str)>,
    ) -> anyhow::Result<bool> {
        let (rzp_order, rzp_payment) = match razorpay_ids {
            Some((o, p)) => (Some(o), Some(p)),
            None => (None, None),
        };
        let result = sqlx::query(
            r#"
            UPDATE orders SET payment_status = 'completed'::payment_status,
                payment_intent_id = COALESCE($2, payment_intent_id),
                razorpay_order_id = COALESCE($3, razorpay_order_id),
                razorpay_payment_id = COALESCE($4, razorpay_payment_id)
            WHERE id = $1 AND payment_status <> 'completed'::payment_status
            "#,
        )
        .bind(id)
        .bind(payment_intent_id)
        .bind(rzp_order)
        .bind(rzp_payment)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Failure only downgrades a pending payment; it never undoes a
    /// completed one that raced ahead.
    pub async fn mark_payment_failed(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET payment_status = 'failed'::payment_status
            WHERE id = $1 AND payment_status = 'pending'::payment_status
            "#,
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_refunded(
        db: &PgPool,
        id: Uuid,
        refund_id: Option<&str>,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET payment_status = 'refunded'::payment_status,
                refund_id = COALESCE($2, refund_id)
            WHERE id = $1 AND payment_status <> 'refunded'::payment_status
            "#,
        )
        .bind(id)
        .bind(refund_id)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_number_shape() {
        let n = generate_order_number();
        assert!(n.starts_with("ORD-"));
        let parts: Vec<&str> = n.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 4);
    }

    #[test]
    fn order_items_round_trip_camel_case() {
        let item = OrderItem {
            name: "Pad Thai".into(),
            price: 11.5,
            quantity: 2,
            special_instructions: Some("extra spicy".into()),
            subtotal: 23.0,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["specialInstructions"], "extra spicy");
        let back: OrderItem = serde_json::from_value(json).unwrap();
        assert_eq!(back, item);
    }
}
