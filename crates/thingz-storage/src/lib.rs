// SQLite-backed local storage
// Holds the durable collection slots and the pending reminder queue

pub mod storage;

pub use storage::{PendingReminder, StorageManager};
