use crate::state::AppState;
use axum::Router;

pub mod hub;
pub mod ws;

pub use hub::{RoomEvent, RoomHub};

pub fn router() -> Router<AppState> {
    ws::router()
}
