use chrono::{DateTime, Datelike, Duration, FixedOffset, Local, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{Item, ItemProperties, Season};
use crate::notifications::NotificationService;

/// The different reminders an item can have
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    /// Food: the day before it expires
    FoodExpiry,
    /// Food: the moment it expires
    FoodExpiryToday,
    /// Opened cosmetics: a week before they expire
    CosmeticsExpiry,
    /// Opened cosmetics: the moment they expire
    CosmeticsExpiryToday,
    /// Seasonal clothing: first day of the season
    Seasonal,
}

impl ReminderKind {
    pub const ALL: [ReminderKind; 5] = [
        ReminderKind::FoodExpiry,
        ReminderKind::FoodExpiryToday,
        ReminderKind::CosmeticsExpiry,
        ReminderKind::CosmeticsExpiryToday,
        ReminderKind::Seasonal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderKind::FoodExpiry => "food_expiry",
            ReminderKind::FoodExpiryToday => "food_expiry_today",
            ReminderKind::CosmeticsExpiry => "cosmetics_expiry",
            ReminderKind::CosmeticsExpiryToday => "cosmetics_expiry_today",
            ReminderKind::Seasonal => "seasonal",
        }
    }

    /// Stable notification id for this kind of reminder on this item
    pub fn identifier(&self, item_id: Uuid) -> String {
        format!("{}_{}", self.as_str(), item_id)
    }
}

/// Every id an item could possibly have scheduled
pub fn reminder_ids(item_id: Uuid) -> Vec<String> {
    ReminderKind::ALL
        .iter()
        .map(|kind| kind.identifier(item_id))
        .collect()
}

/// One local notification, ready to hand to the notification service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub kind: ReminderKind,
    pub item_id: Uuid,
    pub title: String,
    pub body: String,
    pub fire_at: DateTime<Utc>,
}

impl Reminder {
    fn new(
        kind: ReminderKind,
        item: &Item,
        title: String,
        body: String,
        fire_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: kind.identifier(item.id),
            kind,
            item_id: item.id,
            title,
            body,
            fire_at,
        }
    }
}

/// Knobs for reminder timing
#[derive(Debug, Clone, Copy)]
pub struct ReminderPolicy {
    pub enabled: bool,
    /// Local hour at which seasonal reminders fire
    pub seasonal_hour: u32,
    /// Offset used to find "the first of the month" for seasonal reminders
    pub utc_offset: FixedOffset,
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            seasonal_hour: 9,
            utc_offset: Local::now().offset().fix(),
        }
    }
}

impl ReminderPolicy {
    pub fn with_offset(utc_offset: FixedOffset) -> Self {
        Self {
            utc_offset,
            ..Self::default()
        }
    }
}

/// Work out every reminder the given items should have right now
///
/// Pure: nothing is scheduled. `ReminderScheduler` feeds the result to
/// the notification service.
pub fn plan_reminders(items: &[Item], now: DateTime<Utc>, policy: &ReminderPolicy) -> Vec<Reminder> {
    let mut planned = Vec::new();
    for item in items {
        match &item.properties {
            ItemProperties::Food(food) => {
                plan_food(item, food.expiration_date, now, &mut planned);
            }
            ItemProperties::Cosmetics(cosmetics) => {
                if let Some(expires) = cosmetics.expiration_date() {
                    plan_cosmetics(item, expires, now, &mut planned);
                }
            }
            ItemProperties::Clothing(clothing) => {
                if let Some(reminder) = plan_seasonal(item, clothing.season, now, policy) {
                    planned.push(reminder);
                }
            }
            ItemProperties::Miscellaneous(_) => {}
        }
    }
    planned
}

fn plan_food(item: &Item, expires: DateTime<Utc>, now: DateTime<Utc>, out: &mut Vec<Reminder>) {
    let remaining = expires - now;
    if remaining <= Duration::zero() {
        return;
    }

    let lead = Duration::hours(24);
    if remaining > lead {
        out.push(Reminder::new(
            ReminderKind::FoodExpiry,
            item,
            "食品即将过期".to_string(),
            format!("{} 将在明天过期，请及时食用", item.name),
            expires - lead,
        ));
    }

    out.push(Reminder::new(
        ReminderKind::FoodExpiryToday,
        item,
        "食品今天过期".to_string(),
        format!("{} 今天过期，请尽快食用", item.name),
        expires,
    ));
}

fn plan_cosmetics(item: &Item, expires: DateTime<Utc>, now: DateTime<Utc>, out: &mut Vec<Reminder>) {
    let remaining = expires - now;
    if remaining <= Duration::zero() {
        return;
    }

    let lead = Duration::days(7);
    if remaining > lead {
        out.push(Reminder::new(
            ReminderKind::CosmeticsExpiry,
            item,
            "化妆品即将过期".to_string(),
            format!("{} 将在一周后过期，请注意使用期限", item.name),
            expires - lead,
        ));
    }

    out.push(Reminder::new(
        ReminderKind::CosmeticsExpiryToday,
        item,
        "化妆品今天过期".to_string(),
        format!("{} 今天过期，建议停止使用", item.name),
        expires,
    ));
}

fn plan_seasonal(
    item: &Item,
    season: Season,
    now: DateTime<Utc>,
    policy: &ReminderPolicy,
) -> Option<Reminder> {
    let fire_at = next_season_start(season, now, policy)?;
    let season_word = match season {
        Season::Spring => "春天",
        Season::Summer => "夏天",
        Season::Autumn => "秋天",
        Season::Winter => "冬天",
        Season::AllSeasons => return None,
    };

    Some(Reminder::new(
        ReminderKind::Seasonal,
        item,
        format!("{}衣物提醒", season.display_name()),
        format!(
            "{}到了，该换上 {} 等{}衣物了",
            season_word,
            item.name,
            season.display_name()
        ),
        fire_at,
    ))
}

/// First day of the season's month at the policy hour, local time
///
/// Rolls to next year only when the month is already behind us; during the
/// season's own month the date is this year's (and so already past).
pub fn next_season_start(
    season: Season,
    now: DateTime<Utc>,
    policy: &ReminderPolicy,
) -> Option<DateTime<Utc>> {
    let month = season.reminder_month()?;
    let local_now = now.with_timezone(&policy.utc_offset);

    let mut year = local_now.year();
    if month < local_now.month() {
        year += 1;
    }

    policy
        .utc_offset
        .with_ymd_and_hms(year, month, 1, policy.seasonal_hour, 0, 0)
        .single()
        .map(|local| local.with_timezone(&Utc))
}

/// What a refresh did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub scheduled: usize,
    pub failed: usize,
}

/// Keeps the notification service in sync with the item collection
///
/// Refreshes are full rebuilds: cancel everything, then register the
/// complete plan again. That way an edit can never leave an orphaned or
/// duplicated reminder behind.
pub struct ReminderScheduler {
    service: Arc<dyn NotificationService>,
    policy: ReminderPolicy,
}

impl ReminderScheduler {
    pub fn new(service: Arc<dyn NotificationService>, policy: ReminderPolicy) -> Self {
        Self { service, policy }
    }

    pub fn policy(&self) -> &ReminderPolicy {
        &self.policy
    }

    pub fn refresh_all_reminders(&self, items: &[Item], now: DateTime<Utc>) -> RefreshReport {
        self.cancel_all_reminders();

        let mut report = RefreshReport::default();
        if !self.policy.enabled {
            debug!("Reminders disabled, skipping scheduling");
            return report;
        }

        for reminder in plan_reminders(items, now, &self.policy) {
            match self.service.schedule(&reminder) {
                Ok(()) => {
                    debug!("Scheduled {} at {}", reminder.id, reminder.fire_at);
                    report.scheduled += 1;
                }
                Err(e) => {
                    warn!("Failed to schedule {}: {}", reminder.id, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Refreshed reminders for {} items: {} scheduled, {} failed",
            items.len(),
            report.scheduled,
            report.failed
        );
        report
    }

    /// Cancel every reminder that belongs to `item`
    pub fn cancel_reminders(&self, item: &Item) {
        if let Err(e) = self.service.cancel(&reminder_ids(item.id)) {
            warn!("Failed to cancel reminders for {}: {}", item.id, e);
        }
    }

    pub fn cancel_all_reminders(&self) {
        if let Err(e) = self.service.cancel_all() {
            warn!("Failed to cancel pending reminders: {}", e);
        }
    }
}
