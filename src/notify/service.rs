use std::sync::Arc;

use tracing::debug;

use crate::{
    auth::repo::User,
    notify::{
        templates,
        transport::{EmailTransport, SmsTransport},
    },
    orders::{repo::Order, status::OrderStatus},
    restaurants::repo::Restaurant,
};

/// Renders event-keyed templates and pushes them through the transports.
/// Callers dispatch after the triggering mutation is persisted, off the
/// request path; a returned error is for logging only.
pub struct Notifier {
    email: Arc<dyn EmailTransport>,
    sms: Arc<dyn SmsTransport>,
    frontend_url: String,
}

impl Notifier {
    pub fn new(
        email: Arc<dyn EmailTransport>,
        sms: Arc<dyn SmsTransport>,
        frontend_url: impl Into<String>,
    ) -> Self {
        Self {
            email,
            sms,
            frontend_url: frontend_url.into(),
        }
    }

    fn sms_target<'a>(user: &'a User, order: &'a Order) -> Option<&'a str> {
        order.phone_number.as_deref().or(user.phone.as_deref())
    }

    /// Attempts every transport for the event; failures are collected so one
    /// broken channel does not silence the other.
    async fn send_both(
        &self,
        user: &User,
        email: templates::Email,
        sms_body: Option<(&str, String)>,
    ) -> anyhow::Result<()> {
        let mut failures: Vec<String> = Vec::new();
        if let Err(e) = self.email.send(&user.email, &email.subject, &email.html).await {
            failures.push(format!("email: {e}"));
        }
        if let Some((to, body)) = sms_body {
            if let Err(e) = self.sms.send(to, &body).await {
                failures.push(format!("sms: {e}"));
            }
        }
        if failures.is_empty() {
            debug!(user_id = %user.id, "notification dispatched");
            Ok(())
        } else {
            anyhow::bail!("{}", failures.join("; "))
        }
    }

    pub async fn account_created(&self, user: &User) -> anyhow::Result<()> {
        let email = templates::account_created(user, &self.frontend_url);
        self.send_both(user, email, None).await
    }

    pub async fn order_confirmation(
        &self,
        user: &User,
        order: &Order,
        restaurant: &Restaurant,
    ) -> anyhow::Result<()> {
        let email = templates::order_confirmation(user, order, restaurant, &self.frontend_url);
        let sms = Self::sms_target(user, order)
            .map(|to| (to, templates::sms_order_confirmation(order, restaurant, &self.frontend_url)));
        self.send_both(user, email, sms).await
    }

    pub async fn new_order_to_restaurant(
        &self,
        owner: &User,
        customer: &User,
        order: &Order,
        restaurant: &Restaurant,
    ) -> anyhow::Result<()> {
        let email =
            templates::new_restaurant_order(restaurant, customer, order, &self.frontend_url);
        self.email
            .send(&owner.email, &email.subject, &email.html)
            .await
    }

    pub async fn status_update(
        &self,
        user: &User,
        order: &Order,
        status: OrderStatus,
    ) -> anyhow::Result<()> {
        let email = templates::status_update(user, order, status, &self.frontend_url);
        let sms =
            Self::sms_target(user, order).map(|to| (to, templates::sms_status_update(order, status)));
        self.send_both(user, email, sms).await
    }

    pub async fn order_delivered(&self, user: &User, order: &Order) -> anyhow::Result<()> {
        let email = templates::order_delivered(user, order, &self.frontend_url);
        let sms =
            Self::sms_target(user, order).map(|to| (to, templates::sms_delivery_confirmation(order)));
        self.send_both(user, email, sms).await
    }

    pub async fn order_cancelled(&self, user: &User, order: &Order) -> anyhow::Result<()> {
        let email = templates::order_cancelled(user, order);
        self.send_both(user, email, None).await
    }

    pub async fn restaurant_approved(
        &self,
        owner: &User,
        restaurant: &Restaurant,
    ) -> anyhow::Result<()> {
        let email = templates::restaurant_approved(restaurant, &self.frontend_url);
        self.email
            .send(&owner.email, &email.subject, &email.html)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingEmail {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl EmailTransport for RecordingEmail {
        async fn send(&self, to: &str, subject: &str, _html: &str) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("smtp down");
            }
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), subject.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSms {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SmsTransport for RecordingSms {
        async fn send(&self, to: &str, _body: &str) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(to.to_string());
            Ok(())
        }
    }

    fn fixtures() -> (User, Order, Restaurant) {
        use crate::notify::templates::tests_support::*;
        (sample_user(), sample_order(), sample_restaurant())
    }

    #[tokio::test]
    async fn status_update_hits_email_and_sms() {
        let email = Arc::new(RecordingEmail::default());
        let sms = Arc::new(RecordingSms::default());
        let notifier = Notifier::new(email.clone(), sms.clone(), "https://app.example");
        let (user, order, _) = fixtures();

        notifier
            .status_update(&user, &order, OrderStatus::Confirmed)
            .await
            .expect("dispatch should succeed");

        assert_eq!(email.sent.lock().unwrap().len(), 1);
        assert_eq!(sms.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn transport_failure_is_an_error_value_not_a_panic() {
        let email = Arc::new(RecordingEmail {
            fail: true,
            ..Default::default()
        });
        let sms = Arc::new(RecordingSms::default());
        let notifier = Notifier::new(email, sms.clone(), "https://app.example");
        let (user, order, _) = fixtures();

        let err = notifier
            .status_update(&user, &order, OrderStatus::Confirmed)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("email"));
        // SMS still went out despite the email failure.
        assert_eq!(sms.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cancelled_is_email_only() {
        let email = Arc::new(RecordingEmail::default());
        let sms = Arc::new(RecordingSms::default());
        let notifier = Notifier::new(email.clone(), sms.clone(), "https://app.example");
        let (user, order, _) = fixtures();

        notifier.order_cancelled(&user, &order).await.unwrap();
        assert_eq!(email.sent.lock().unwrap().len(), 1);
        assert!(sms.sent.lock().unwrap().is_empty());
    }
}
