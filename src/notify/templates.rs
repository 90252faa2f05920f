use uuid::Uuid;

use crate::{
    auth::repo::User,
    orders::{repo::Order, status::OrderStatus},
    restaurants::repo::Restaurant,
};

/// Rendered email, ready for a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub subject: String,
    pub html: String,
}

/// Short human-facing reference: the first eight hex digits of the id.
pub fn short_ref(id: Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

pub fn status_message(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "Your order is pending confirmation",
        OrderStatus::Confirmed => "Your order has been confirmed",
        OrderStatus::Preparing => "Restaurant is preparing your food",
        OrderStatus::Ready => "Your order is ready",
        OrderStatus::OutForDelivery => "Your order is on the way!",
        OrderStatus::Delivered => "Your order has been delivered",
        OrderStatus::Cancelled => "Your order has been cancelled",
    }
}

fn items_html(order: &Order) -> String {
    order
        .items
        .iter()
        .map(|i| format!("<li>{} x {} - ₹{:.2}</li>", i.name, i.quantity, i.price))
        .collect()
}

fn tracking_link(frontend_url: &str, order_id: Uuid) -> String {
    format!("{frontend_url}/orders/{order_id}")
}

pub fn account_created(user: &User, frontend_url: &str) -> Email {
    Email {
        subject: "Welcome to Velobite!".into(),
        html: format!(
            "<h2>Welcome to Velobite!</h2>\
             <p>Hi {first},</p>\
             <p>Your account has been created successfully.</p>\
             <ul><li><strong>Email:</strong> {email}</li>\
             <li><strong>Name:</strong> {first} {last}</li></ul>\
             <p>You can now browse restaurants and place orders.</p>\
             <p><a href=\"{frontend_url}\">Start Ordering</a></p>",
            first = user.first_name,
            last = user.last_name,
            email = user.email,
        ),
    }
}

pub fn order_confirmation(
    user: &User,
    order: &Order,
    restaurant: &Restaurant,
    frontend_url: &str,
) -> Email {
    Email {
        subject: format!("Order Confirmed - #{}", short_ref(order.id)),
        html: format!(
            "<h2>Order Confirmed!</h2>\
             <p>Hi {first},</p>\
             <p>Your order #{order_ref} has been placed!</p>\
             <ul><li><strong>Restaurant:</strong> {restaurant}</li>\
             <li><strong>Total:</strong> ₹{total:.2}</li></ul>\
             <h3>Items:</h3><ul>{items}</ul>\
             <p><a href=\"{link}\">Track your order</a></p>\
             <p>Thank you for ordering!</p>",
            first = user.first_name,
            order_ref = short_ref(order.id),
            restaurant = restaurant.name,
            total = order.total,
            items = items_html(order),
            link = tracking_link(frontend_url, order.id),
        ),
    }
}

pub fn status_update(user: &User, order: &Order, status: OrderStatus, frontend_url: &str) -> Email {
    Email {
        subject: format!(
            "Order Update - #{}: {}",
            short_ref(order.id),
            status_message(status)
        ),
        html: format!(
            "<h2>Order Update</h2>\
             <p>Hi {first},</p>\
             <p>Your order #{order_ref} status has been updated:</p>\
             <h3>New Status: <strong>{status}</strong></h3>\
             <p>{line}</p>\
             <p><a href=\"{link}\">Track your order in real-time</a></p>",
            first = user.first_name,
            order_ref = short_ref(order.id),
            status = status.as_str().to_uppercase(),
            line = status_message(status),
            link = tracking_link(frontend_url, order.id),
        ),
    }
}

pub fn order_delivered(user: &User, order: &Order, frontend_url: &str) -> Email {
    Email {
        subject: format!("Order Delivered - #{}", short_ref(order.id)),
        html: format!(
            "<h2>Order Delivered!</h2>\
             <p>Hi {first},</p>\
             <p>Your order #{order_ref} has been delivered!</p>\
             <p><strong>Total Amount:</strong> ₹{total:.2}</p>\
             <h3>Order Summary:</h3><ul>{items}</ul>\
             <p>We hope you enjoyed your meal! <a href=\"{link}/review\">Leave a review</a>.</p>",
            first = user.first_name,
            order_ref = short_ref(order.id),
            total = order.total,
            items = items_html(order),
            link = tracking_link(frontend_url, order.id),
        ),
    }
}

pub fn order_cancelled(user: &User, order: &Order) -> Email {
    Email {
        subject: format!("Order Cancelled - #{}", short_ref(order.id)),
        html: format!(
            "<h2>Order Cancelled</h2>\
             <p>Hi {first},</p>\
             <p>Your order #{order_ref} has been cancelled.</p>\
             <p>If a payment was captured, the refund will be credited to your original \
             payment method within 3-5 business days.</p>\
             <p>If you have any questions, please contact our support team.</p>",
            first = user.first_name,
            order_ref = short_ref(order.id),
        ),
    }
}

pub fn restaurant_approved(restaurant: &Restaurant, frontend_url: &str) -> Email {
    Email {
        subject: "Your Restaurant is Approved!".into(),
        html: format!(
            "<h2>Restaurant Approved!</h2>\
             <p>Hi {name},</p>\
             <p>Congratulations! Your restaurant has been approved and is now live on Velobite!</p>\
             <ol><li>Add menu items with descriptions and prices</li>\
             <li>Set your operating hours</li>\
             <li>Start receiving orders!</li></ol>\
             <p><a href=\"{frontend_url}/restaurant/dashboard\">Access Your Dashboard</a></p>",
            name = restaurant.name,
        ),
    }
}

pub fn new_restaurant_order(
    restaurant: &Restaurant,
    customer: &User,
    order: &Order,
    frontend_url: &str,
) -> Email {
    Email {
        subject: format!("New Order Received - #{}", short_ref(order.id)),
        html: format!(
            "<h2>New Order Received!</h2>\
             <p>Hi {restaurant},</p>\
             <ul><li><strong>Order ID:</strong> {order_ref}</li>\
             <li><strong>Customer:</strong> {first} {last}</li>\
             <li><strong>Phone:</strong> {phone}</li></ul>\
             <h3>Items to Prepare:</h3><ul>{items}</ul>\
             <p><strong>Special Instructions:</strong> {notes}</p>\
             <p><strong>Total Amount:</strong> ₹{total:.2}</p>\
             <p><a href=\"{frontend_url}/restaurant/dashboard/orders/{order_id}\">Manage Order</a></p>",
            restaurant = restaurant.name,
            order_ref = short_ref(order.id),
            first = customer.first_name,
            last = customer.last_name,
            phone = order
                .phone_number
                .as_deref()
                .or(customer.phone.as_deref())
                .unwrap_or("-"),
            items = items_html(order),
            notes = order.notes.as_deref().unwrap_or("None"),
            total = order.total,
            order_id = order.id,
        ),
    }
}

pub fn sms_order_confirmation(order: &Order, restaurant: &Restaurant, frontend_url: &str) -> String {
    format!(
        "Order confirmed! Order #{} from {}. Track your order: {}",
        short_ref(order.id),
        restaurant.name,
        tracking_link(frontend_url, order.id),
    )
}

pub fn sms_status_update(order: &Order, status: OrderStatus) -> String {
    format!("{} - Order #{}", status_message(status), short_ref(order.id))
}

pub fn sms_delivery_confirmation(order: &Order) -> String {
    format!(
        "Order #{} delivered. Total: ₹{:.2}. Thanks for ordering with Velobite!",
        short_ref(order.id),
        order.total,
    )
}

/// Fixtures shared by the notification tests.
#[cfg(test)]
pub(crate) mod tests_support {
    use super::*;
    use crate::orders::{
        repo::{DeliveryAddress, OrderItem},
        status::{PaymentMethod, PaymentStatus},
    };
    use crate::restaurants::repo::RestaurantAddress;
    use sqlx::types::Json;
    use time::OffsetDateTime;

    pub fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            first_name: "Asha".into(),
            last_name: "Rao".into(),
            email: "asha@example.com".into(),
            password_hash: "x".into(),
            role: crate::auth::repo::Role::Customer,
            phone: Some("+911234567890".into()),
            address: None,
            is_active: true,
            last_login: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn sample_restaurant() -> Restaurant {
        Restaurant {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Spice Route".into(),
            description: None,
            cuisines: vec!["Indian".into()],
            address: Json(RestaurantAddress {
                street: "1 Main St".into(),
                city: "Pune".into(),
                zip_code: None,
                country: None,
                latitude: 18.52,
                longitude: 73.85,
            }),
            phone: None,
            delivery_fee: 2.99,
            min_order: 10.0,
            rating: 4.5,
            review_count: 12,
            is_open: true,
            active: true,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn sample_order() -> Order {
        Order {
            id: Uuid::new_v4(),
            order_number: "ORD-1-0001".into(),
            customer_id: Uuid::new_v4(),
            restaurant_id: Uuid::new_v4(),
            delivery_person_id: None,
            items: Json(vec![OrderItem {
                name: "Dal Makhani".into(),
                price: 8.0,
                quantity: 2,
                special_instructions: None,
                subtotal: 16.0,
            }]),
            delivery_address: Json(DeliveryAddress::default()),
            phone_number: None,
            notes: None,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: PaymentMethod::Stripe,
            payment_intent_id: None,
            razorpay_order_id: None,
            razorpay_payment_id: None,
            refund_id: None,
            subtotal: 16.0,
            delivery_fee: 2.99,
            tax: 0.8,
            discount: 0.0,
            total: 19.79,
            rating: None,
            delivered_at: None,
            cancelled_at: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::tests_support::*;
    use super::*;

    #[test]
    fn short_ref_is_eight_chars() {
        assert_eq!(short_ref(Uuid::new_v4()).len(), 8);
    }

    #[test]
    fn confirmation_email_interpolates_fields() {
        let (user, restaurant, order) = (sample_user(), sample_restaurant(), sample_order());
        let email = order_confirmation(&user, &order, &restaurant, "https://app.example");
        assert!(email.subject.contains(&short_ref(order.id)));
        assert!(email.html.contains("Asha"));
        assert!(email.html.contains("Spice Route"));
        assert!(email.html.contains("Dal Makhani x 2"));
        assert!(email.html.contains(&format!("https://app.example/orders/{}", order.id)));
    }

    #[test]
    fn status_messages_cover_all_states() {
        use OrderStatus::*;
        for status in [Pending, Confirmed, Preparing, Ready, OutForDelivery, Delivered, Cancelled]
        {
            assert!(!status_message(status).is_empty());
        }
    }

    #[test]
    fn sms_status_line_names_the_order() {
        let order = sample_order();
        let body = sms_status_update(&order, OrderStatus::OutForDelivery);
        assert!(body.contains("on the way"));
        assert!(body.contains(&short_ref(order.id)));
    }
}
