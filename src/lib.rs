pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod services;
pub mod state;
pub mod websocket;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use services::notification_store::NotificationStore;
pub use state::AppState;
pub use websocket::{ConnectionRegistry, Role, SubscriberId};
