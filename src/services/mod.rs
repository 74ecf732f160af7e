pub mod cache;
pub mod notification_store;

pub use notification_store::NotificationStore;
