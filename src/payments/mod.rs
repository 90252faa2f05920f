use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod gateway;
pub mod handlers;
pub mod razorpay;
pub mod stripe;

pub fn router() -> Router<AppState> {
    handlers::router()
}
