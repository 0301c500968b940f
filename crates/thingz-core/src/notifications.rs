// Local notification service boundary plus the two centers we ship
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use thingz_storage::{PendingReminder, StorageManager};

use crate::clock::Clock;
use crate::reminders::Reminder;
use crate::{Error, Result};

/// Whatever actually delivers reminders to the user
///
/// The scheduler only needs these three shapes. Each call is independent:
/// a rejected `schedule` must not affect any other registration, and
/// cancelling an id that isn't scheduled is a no-op.
#[cfg_attr(test, mockall::automock)]
pub trait NotificationService: Send + Sync {
    fn schedule(&self, reminder: &Reminder) -> Result<()>;
    fn cancel(&self, ids: &[String]) -> Result<()>;
    fn cancel_all(&self) -> Result<()>;
}

/// Keeps reminders in memory. Handy for previews and tests.
#[derive(Debug, Default)]
pub struct InMemoryNotificationCenter {
    scheduled: Mutex<BTreeMap<String, Reminder>>,
}

impl InMemoryNotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything scheduled, ordered by id
    pub fn pending(&self) -> Vec<Reminder> {
        self.scheduled
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }

    pub fn pending_ids(&self) -> Vec<String> {
        self.scheduled
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }
}

impl NotificationService for InMemoryNotificationCenter {
    fn schedule(&self, reminder: &Reminder) -> Result<()> {
        self.scheduled
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(reminder.id.clone(), reminder.clone());
        Ok(())
    }

    fn cancel(&self, ids: &[String]) -> Result<()> {
        let mut scheduled = self.scheduled.lock().unwrap_or_else(|e| e.into_inner());
        for id in ids {
            scheduled.remove(id);
        }
        Ok(())
    }

    fn cancel_all(&self) -> Result<()> {
        self.scheduled
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        Ok(())
    }
}

/// Durable reminder queue in the local SQLite database
///
/// Like a platform notification center it refuses fire dates that are
/// already in the past.
pub struct LocalNotificationCenter {
    storage: Arc<StorageManager>,
    clock: Arc<dyn Clock>,
}

impl LocalNotificationCenter {
    pub fn new(storage: Arc<StorageManager>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    pub fn pending(&self) -> Result<Vec<PendingReminder>> {
        self.storage
            .pending_reminders()
            .map_err(|e| Error::NotificationError(e.to_string()))
    }

    /// Reminders whose time has come
    pub fn due(&self) -> Result<Vec<PendingReminder>> {
        self.storage
            .due_reminders(self.clock.now())
            .map_err(|e| Error::NotificationError(e.to_string()))
    }
}

impl NotificationService for LocalNotificationCenter {
    fn schedule(&self, reminder: &Reminder) -> Result<()> {
        if reminder.fire_at <= self.clock.now() {
            return Err(Error::NotificationError(format!(
                "fire date {} for {} is in the past",
                reminder.fire_at, reminder.id
            )));
        }

        self.storage
            .schedule_reminder(&PendingReminder {
                id: reminder.id.clone(),
                title: reminder.title.clone(),
                body: reminder.body.clone(),
                fire_at: reminder.fire_at,
            })
            .map_err(|e| Error::NotificationError(e.to_string()))
    }

    fn cancel(&self, ids: &[String]) -> Result<()> {
        self.storage
            .cancel_reminders(ids)
            .map(|_| ())
            .map_err(|e| Error::NotificationError(e.to_string()))
    }

    fn cancel_all(&self) -> Result<()> {
        self.storage
            .cancel_all_reminders()
            .map(|_| ())
            .map_err(|e| Error::NotificationError(e.to_string()))
    }
}
