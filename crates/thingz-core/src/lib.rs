// Household inventory: containers, items, expiration tracking and reminders
pub mod clock;
pub mod config;
pub mod error;
pub mod expiration;
pub mod models;
pub mod notifications;
pub mod query;
pub mod reminders;
pub mod session;
pub mod stats;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use error::Error;
pub use expiration::ExpirationStatus;
pub use models::{Container, ContainerType, Item, ItemProperties, ItemType};
pub use notifications::{InMemoryNotificationCenter, LocalNotificationCenter, NotificationService};
pub use query::{ContainerQuery, ItemFilters, ItemQuery, ItemSort};
pub use reminders::{RefreshReport, Reminder, ReminderKind, ReminderPolicy, ReminderScheduler};
pub use session::{AuthService, SessionStore};
pub use stats::InventoryStats;
pub use store::{SlotStore, Store};

pub type Result<T> = std::result::Result<T, Error>;
