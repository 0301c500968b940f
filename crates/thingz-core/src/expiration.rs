use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{CosmeticsProperties, FoodProperties, Item, ItemProperties};

/// Food counts as expiring soon within this many whole days
pub const FOOD_SOON_WINDOW_DAYS: i64 = 7;
/// Opened cosmetics count as expiring soon within this many whole days
pub const COSMETICS_SOON_WINDOW_DAYS: i64 = 30;

/// Whole days from `now` until `date`, truncated toward zero
fn whole_days_between(now: DateTime<Utc>, date: DateTime<Utc>) -> i64 {
    (date - now).num_days()
}

fn in_soon_window(days: i64, window: i64) -> bool {
    days > 0 && days <= window
}

impl FoodProperties {
    pub fn days_until_expiration(&self, now: DateTime<Utc>) -> i64 {
        whole_days_between(now, self.expiration_date)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expiration_date
    }

    pub fn is_expiring_soon(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired(now)
            && in_soon_window(self.days_until_expiration(now), FOOD_SOON_WINDOW_DAYS)
    }
}

impl CosmeticsProperties {
    /// Opened date plus the shelf life in calendar months
    ///
    /// Month arithmetic clamps to the last day of shorter months
    /// (opened Jan 31 + 1 month = Feb 28/29).
    pub fn expiration_date(&self) -> Option<DateTime<Utc>> {
        let opened = self.opened_date?;
        opened.checked_add_months(Months::new(self.shelf_life_after_opening))
    }

    pub fn days_until_expiration(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expiration_date()
            .map(|date| whole_days_between(now, date))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_date().is_some_and(|date| now > date)
    }

    pub fn is_expiring_soon(&self, now: DateTime<Utc>) -> bool {
        match self.days_until_expiration(now) {
            Some(days) => !self.is_expired(now) && in_soon_window(days, COSMETICS_SOON_WINDOW_DAYS),
            None => false,
        }
    }
}

/// When the item stops being usable, if it ever does
pub fn expiration_date(item: &Item) -> Option<DateTime<Utc>> {
    match &item.properties {
        ItemProperties::Food(food) => Some(food.expiration_date),
        ItemProperties::Cosmetics(cosmetics) => cosmetics.expiration_date(),
        ItemProperties::Clothing(_) | ItemProperties::Miscellaneous(_) => None,
    }
}

pub fn is_expired(item: &Item, now: DateTime<Utc>) -> bool {
    match &item.properties {
        ItemProperties::Food(food) => food.is_expired(now),
        ItemProperties::Cosmetics(cosmetics) => cosmetics.is_expired(now),
        ItemProperties::Clothing(_) | ItemProperties::Miscellaneous(_) => false,
    }
}

pub fn is_expiring_soon(item: &Item, now: DateTime<Utc>) -> bool {
    match &item.properties {
        ItemProperties::Food(food) => food.is_expiring_soon(now),
        ItemProperties::Cosmetics(cosmetics) => cosmetics.is_expiring_soon(now),
        ItemProperties::Clothing(_) | ItemProperties::Miscellaneous(_) => false,
    }
}

/// Whole days until expiration; negative once expired, `None` if the item never expires
pub fn days_until_expiration(item: &Item, now: DateTime<Utc>) -> Option<i64> {
    expiration_date(item).map(|date| whole_days_between(now, date))
}

/// Items whose expiration falls on or before `now + days_ahead`
///
/// Already-expired items are included, so this doubles as the
/// "needs attention within N days" list. A horizon past the end of the
/// calendar takes every dated item; one before its start takes none.
pub fn expiring_within<'a>(items: &'a [Item], days_ahead: i64, now: DateTime<Utc>) -> Vec<&'a Item> {
    let horizon = Duration::try_days(days_ahead).and_then(|d| now.checked_add_signed(d));
    items
        .iter()
        .filter(|item| {
            expiration_date(item).is_some_and(|date| match horizon {
                Some(horizon) => date <= horizon,
                None => days_ahead > 0,
            })
        })
        .collect()
}

/// Badge shown next to an item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExpirationStatus {
    /// Clothing, miscellaneous, unopened cosmetics
    NoExpiration,
    /// Expires later than the soon-window
    Fresh,
    /// Inside the category's soon-window
    ExpiringSoon,
    /// Not expired yet but less than a whole day left
    DueToday,
    Expired,
}

impl ExpirationStatus {
    pub fn of(item: &Item, now: DateTime<Utc>) -> Self {
        let Some(days) = days_until_expiration(item, now) else {
            return ExpirationStatus::NoExpiration;
        };

        if is_expired(item, now) {
            ExpirationStatus::Expired
        } else if is_expiring_soon(item, now) {
            ExpirationStatus::ExpiringSoon
        } else if days <= 0 {
            ExpirationStatus::DueToday
        } else {
            ExpirationStatus::Fresh
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExpirationStatus::NoExpiration => "",
            ExpirationStatus::Fresh => "Fresh",
            ExpirationStatus::ExpiringSoon => "Expiring soon",
            ExpirationStatus::DueToday => "Due today",
            ExpirationStatus::Expired => "Expired",
        }
    }

    pub fn needs_attention(&self) -> bool {
        matches!(
            self,
            ExpirationStatus::ExpiringSoon | ExpirationStatus::DueToday | ExpirationStatus::Expired
        )
    }
}
