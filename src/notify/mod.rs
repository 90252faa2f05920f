pub mod service;
pub mod templates;
pub mod transport;

pub use service::Notifier;
