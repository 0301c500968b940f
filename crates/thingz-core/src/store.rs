// The inventory store: owns both collections and keeps storage and
// reminders in step with every change
use chrono::{Duration, Months};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use thingz_storage::StorageManager;

use crate::clock::Clock;
use crate::expiration::{self, ExpirationStatus};
use crate::models::{
    ClothingProperties, ClothingType, Container, ContainerType, CosmeticsProperties,
    CosmeticsType, FoodProperties, FoodType, Item, ItemProperties, ItemType, Season,
};
use crate::query::{self, ContainerQuery, ItemQuery};
use crate::reminders::{RefreshReport, ReminderScheduler};
use crate::stats::InventoryStats;
use crate::{Error, Result};

pub const CONTAINERS_SLOT: &str = "containers";
pub const ITEMS_SLOT: &str = "items";

/// Named-blob persistence the store writes its collections to
#[cfg_attr(test, mockall::automock)]
pub trait SlotStore: Send + Sync {
    fn read_slot(&self, key: &str) -> Result<Option<String>>;
    fn write_slot(&self, key: &str, value: &str) -> Result<()>;
    fn clear_slot(&self, key: &str) -> Result<()>;
    /// Write every entry or none of them
    fn write_slots(&self, entries: &[(String, String)]) -> Result<()>;
    /// Clear every key or none of them
    fn clear_slots(&self, keys: &[String]) -> Result<()>;
}

impl SlotStore for StorageManager {
    fn read_slot(&self, key: &str) -> Result<Option<String>> {
        self.get_slot(key)
            .map_err(|e| Error::StorageError(format!("read {}: {}", key, e)))
    }

    fn write_slot(&self, key: &str, value: &str) -> Result<()> {
        self.set_slot(key, value)
            .map_err(|e| Error::StorageError(format!("write {}: {}", key, e)))
    }

    fn clear_slot(&self, key: &str) -> Result<()> {
        self.remove_slot(key)
            .map_err(|e| Error::StorageError(format!("clear {}: {}", key, e)))
    }

    fn write_slots(&self, entries: &[(String, String)]) -> Result<()> {
        let entries: Vec<(&str, &str)> = entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        self.set_slots(&entries)
            .map_err(|e| Error::StorageError(format!("write slots: {}", e)))
    }

    fn clear_slots(&self, keys: &[String]) -> Result<()> {
        let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
        self.remove_slots(&keys)
            .map_err(|e| Error::StorageError(format!("clear slots: {}", e)))
    }
}

/// Single owner of all containers and items
///
/// Mutations go candidate → storage → memory: the new collections are built
/// aside, written out together in one transaction, and only swapped in once
/// the write succeeded. After every mutation, failed or not, the reminder set
/// is rebuilt from the item list in memory.
pub struct Store {
    slots: Arc<dyn SlotStore>,
    scheduler: ReminderScheduler,
    clock: Arc<dyn Clock>,
    containers: Vec<Container>,
    items: Vec<Item>,
}

impl Store {
    /// Empty store. Nothing is read until `load`.
    pub fn new(
        slots: Arc<dyn SlotStore>,
        scheduler: ReminderScheduler,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            slots,
            scheduler,
            clock,
            containers: Vec::new(),
            items: Vec::new(),
        }
    }

    /// Load persisted data and bring reminders up to date
    pub fn open(
        slots: Arc<dyn SlotStore>,
        scheduler: ReminderScheduler,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut store = Self::new(slots, scheduler, clock);
        store.load();
        store.refresh_reminders();
        store
    }

    /// Replace memory with whatever is persisted
    ///
    /// Unreadable or undecodable slots load as empty collections.
    pub fn load(&mut self) {
        self.containers = self.read_collection(CONTAINERS_SLOT);
        self.items = self.read_collection(ITEMS_SLOT);
        info!(
            "Loaded {} containers and {} items",
            self.containers.len(),
            self.items.len()
        );
    }

    fn read_collection<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let raw = match self.slots.read_slot(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to read {}: {}", key, e);
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(values) => values,
            Err(e) => {
                warn!("Discarding undecodable {} slot: {}", key, e);
                Vec::new()
            }
        }
    }

    /// Write both collections as they are in memory
    pub fn save(&self) -> Result<()> {
        self.persist(&self.containers, &self.items)
    }

    fn persist(&self, containers: &[Container], items: &[Item]) -> Result<()> {
        let entries = [
            (CONTAINERS_SLOT.to_string(), serde_json::to_string(containers)?),
            (ITEMS_SLOT.to_string(), serde_json::to_string(items)?),
        ];
        self.slots.write_slots(&entries)?;
        debug!(
            "Persisted {} containers and {} items",
            containers.len(),
            items.len()
        );
        Ok(())
    }

    fn commit(&mut self, containers: Vec<Container>, items: Vec<Item>) -> Result<()> {
        if let Err(e) = self.persist(&containers, &items) {
            // Deletes cancel before persisting; put back what is still in memory
            warn!("Save failed, restoring reminders: {}", e);
            self.refresh_reminders();
            return Err(e);
        }
        self.containers = containers;
        self.items = items;
        self.refresh_reminders();
        Ok(())
    }

    pub fn refresh_reminders(&self) -> RefreshReport {
        self.scheduler
            .refresh_all_reminders(&self.items, self.clock.now())
    }

    // Containers

    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    pub fn add_container(&mut self, container: Container) -> Result<()> {
        if self.container(container.id).is_some() {
            return Err(Error::InvalidInput(format!(
                "Container {} already exists",
                container.id
            )));
        }

        info!("Adding container {} ({})", container.name, container.id);
        let mut containers = self.containers.clone();
        containers.push(container);
        let items = self.items.clone();
        self.commit(containers, items)
    }

    /// Replace the container with the same id. Returns false (and changes
    /// nothing) when there is no such container.
    pub fn update_container(&mut self, mut container: Container) -> Result<bool> {
        let Some(index) = self.containers.iter().position(|c| c.id == container.id) else {
            debug!("Ignoring update for unknown container {}", container.id);
            return Ok(false);
        };

        container.updated_at = self.clock.now();
        let mut containers = self.containers.clone();
        containers[index] = container;
        let items = self.items.clone();
        self.commit(containers, items)?;
        Ok(true)
    }

    /// Delete a container together with every item inside it
    pub fn delete_container(&mut self, id: Uuid) -> Result<bool> {
        if self.container(id).is_none() {
            return Ok(false);
        }

        let (removed, kept): (Vec<Item>, Vec<Item>) = self
            .items
            .iter()
            .cloned()
            .partition(|item| item.container_id == Some(id));

        for item in &removed {
            self.scheduler.cancel_reminders(item);
        }

        info!(
            "Deleting container {} and {} contained items",
            id,
            removed.len()
        );
        let containers = self
            .containers
            .iter()
            .filter(|c| c.id != id)
            .cloned()
            .collect();
        self.commit(containers, kept)?;
        Ok(true)
    }

    pub fn container(&self, id: Uuid) -> Option<&Container> {
        self.containers.iter().find(|c| c.id == id)
    }

    /// The container an item points at, if it still exists
    pub fn container_for(&self, item: &Item) -> Option<&Container> {
        item.container_id.and_then(|id| self.container(id))
    }

    pub fn containers_of_type(&self, container_type: ContainerType) -> Vec<&Container> {
        self.containers
            .iter()
            .filter(|c| c.container_type == container_type)
            .collect()
    }

    /// Case-insensitive substring match on location
    pub fn containers_in_location(&self, location: &str) -> Vec<&Container> {
        ContainerQuery::new()
            .location(location)
            .apply(&self.containers)
    }

    pub fn container_item_count(&self, id: Uuid) -> usize {
        self.items
            .iter()
            .filter(|item| item.container_id == Some(id))
            .count()
    }

    pub fn container_utilization(&self, id: Uuid) -> Option<f64> {
        self.container(id)
            .map(|c| c.utilization(self.container_item_count(id)))
    }

    // Items

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn add_item(&mut self, item: Item) -> Result<()> {
        if self.item(item.id).is_some() {
            return Err(Error::InvalidInput(format!("Item {} already exists", item.id)));
        }
        item.properties.validate()?;

        info!("Adding item {} ({})", item.name, item.id);
        let containers = self.containers.clone();
        let mut items = self.items.clone();
        items.push(item);
        self.commit(containers, items)
    }

    /// Replace the item with the same id. Returns false when absent. The
    /// category can't change through an update.
    pub fn update_item(&mut self, mut item: Item) -> Result<bool> {
        let Some(index) = self.items.iter().position(|i| i.id == item.id) else {
            debug!("Ignoring update for unknown item {}", item.id);
            return Ok(false);
        };

        let current = self.items[index].item_type();
        if item.item_type() != current {
            return Err(Error::InvalidInput(format!(
                "Cannot change item type from {} to {}",
                current,
                item.item_type()
            )));
        }
        item.properties.validate()?;

        item.updated_at = self.clock.now();
        let containers = self.containers.clone();
        let mut items = self.items.clone();
        items[index] = item;
        self.commit(containers, items)?;
        Ok(true)
    }

    pub fn delete_item(&mut self, id: Uuid) -> Result<bool> {
        let Some(item) = self.item(id) else {
            return Ok(false);
        };
        self.scheduler.cancel_reminders(item);

        info!("Deleting item {}", id);
        let containers = self.containers.clone();
        let items = self.items.iter().filter(|i| i.id != id).cloned().collect();
        self.commit(containers, items)?;
        Ok(true)
    }

    pub fn item(&self, id: Uuid) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn items_in_container(&self, container_id: Uuid) -> Vec<&Item> {
        self.items
            .iter()
            .filter(|item| item.container_id == Some(container_id))
            .collect()
    }

    pub fn items_of_type(&self, item_type: ItemType) -> Vec<&Item> {
        self.items
            .iter()
            .filter(|item| item.item_type() == item_type)
            .collect()
    }

    pub fn items_in_container_of_type(
        &self,
        container_id: Uuid,
        item_type: ItemType,
    ) -> Vec<&Item> {
        self.items
            .iter()
            .filter(|item| item.container_id == Some(container_id) && item.item_type() == item_type)
            .collect()
    }

    /// Most recently added first
    pub fn recent_items(&self, limit: usize) -> Vec<&Item> {
        let mut items: Vec<&Item> = self.items.iter().collect();
        query::sort_items(&mut items, query::ItemSort::DateAdded);
        items.truncate(limit);
        items
    }

    // Queries

    pub fn search_items(&self, query: &str) -> Vec<&Item> {
        query::search_items(&self.items, query)
    }

    pub fn search_containers(&self, query: &str) -> Vec<&Container> {
        query::search_containers(&self.containers, query)
    }

    pub fn query_items(&self, query: &ItemQuery) -> Vec<&Item> {
        query.apply(&self.items, &self.containers)
    }

    pub fn query_containers(&self, query: &ContainerQuery) -> Vec<&Container> {
        query.apply(&self.containers)
    }

    // Expiration

    pub fn expired_items(&self) -> Vec<&Item> {
        let now = self.clock.now();
        self.items
            .iter()
            .filter(|item| expiration::is_expired(item, now))
            .collect()
    }

    pub fn expiring_soon_items(&self) -> Vec<&Item> {
        let now = self.clock.now();
        self.items
            .iter()
            .filter(|item| expiration::is_expiring_soon(item, now))
            .collect()
    }

    pub fn items_needing_attention(&self) -> Vec<&Item> {
        let now = self.clock.now();
        self.items
            .iter()
            .filter(|item| ExpirationStatus::of(item, now).needs_attention())
            .collect()
    }

    pub fn expiring_within(&self, days_ahead: i64) -> Vec<&Item> {
        expiration::expiring_within(&self.items, days_ahead, self.clock.now())
    }

    pub fn expiration_status(&self, item: &Item) -> ExpirationStatus {
        ExpirationStatus::of(item, self.clock.now())
    }

    pub fn stats(&self) -> InventoryStats {
        InventoryStats::compute(&self.containers, &self.items, self.clock.now())
    }

    // Maintenance

    /// Drop every container, item and pending reminder
    pub fn clear_all_data(&mut self) -> Result<()> {
        self.slots
            .clear_slots(&[CONTAINERS_SLOT.to_string(), ITEMS_SLOT.to_string()])?;
        self.containers.clear();
        self.items.clear();
        self.scheduler.cancel_all_reminders();
        info!("Cleared all inventory data");
        Ok(())
    }

    /// Replace everything with a small demo household
    pub fn load_sample_data(&mut self) -> Result<()> {
        let now = self.clock.now();

        let wardrobe = Container::new("主卧衣柜", ContainerType::Wardrobe, "主卧", now);
        let fridge =
            Container::new("厨房冰箱", ContainerType::Refrigerator, "厨房", now).with_capacity(30);
        let drawer =
            Container::new("化妆台抽屉", ContainerType::Drawer, "主卧", now).with_capacity(20);

        let tshirt = Item::with_properties(
            "白色T恤",
            ItemProperties::Clothing(ClothingProperties {
                clothing_type: ClothingType::Top,
                season: Season::Summer,
                color: "白色".to_string(),
                material: "棉质".to_string(),
                brand: "优衣库".to_string(),
            }),
            now,
        )
        .in_container(wardrobe.id);

        let milk = Item::with_properties(
            "牛奶",
            ItemProperties::Food(FoodProperties {
                unit: "盒".to_string(),
                food_type: FoodType::Fresh,
                storage_condition: "冷藏".to_string(),
                ..FoodProperties::expiring_on(now + Duration::days(5))
            }),
            now,
        )
        .in_container(fridge.id);

        let lipstick = Item::with_properties(
            "口红",
            ItemProperties::Cosmetics(CosmeticsProperties {
                cosmetics_type: CosmeticsType::Makeup,
                opened_date: now.checked_sub_months(Months::new(3)),
                shelf_life_after_opening: 12,
                brand: "香奈儿".to_string(),
            }),
            now,
        )
        .in_container(drawer.id);

        info!("Loading sample data");
        self.commit(vec![wardrobe, fridge, drawer], vec![tshirt, milk, lipstick])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::notifications::InMemoryNotificationCenter;
    use crate::reminders::ReminderPolicy;
    use chrono::{DateTime, FixedOffset, TimeZone, Utc};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 10, 12, 0, 0).unwrap()
    }

    struct Harness {
        store: Store,
        center: Arc<InMemoryNotificationCenter>,
        storage: Arc<StorageManager>,
        clock: Arc<FixedClock>,
    }

    fn harness() -> Harness {
        let storage = Arc::new(StorageManager::in_memory().unwrap());
        let center = Arc::new(InMemoryNotificationCenter::new());
        let clock = Arc::new(FixedClock::new(now()));
        let scheduler = ReminderScheduler::new(
            center.clone(),
            ReminderPolicy::with_offset(FixedOffset::east_opt(0).unwrap()),
        );
        let store = Store::open(storage.clone(), scheduler, clock.clone());
        Harness {
            store,
            center,
            storage,
            clock,
        }
    }

    fn milk(days: i64) -> Item {
        Item::with_properties(
            "牛奶",
            ItemProperties::Food(FoodProperties::expiring_on(now() + Duration::days(days))),
            now(),
        )
    }

    #[test]
    fn test_add_item_persists_and_schedules() {
        let mut h = harness();
        let fridge = Container::new("fridge", ContainerType::Refrigerator, "kitchen", now());
        h.store.add_container(fridge.clone()).unwrap();

        let item = milk(5).in_container(fridge.id);
        h.store.add_item(item.clone()).unwrap();

        assert_eq!(h.store.items_in_container(fridge.id).len(), 1);
        assert_eq!(h.center.pending().len(), 2);

        let raw = h.storage.get_slot(ITEMS_SLOT).unwrap().unwrap();
        let saved: Vec<Item> = serde_json::from_str(&raw).unwrap();
        assert_eq!(saved, vec![item]);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut h = harness();
        let item = milk(5);
        h.store.add_item(item.clone()).unwrap();
        assert!(matches!(
            h.store.add_item(item),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(h.store.items().len(), 1);
    }

    #[test]
    fn test_delete_container_cascades() {
        let mut h = harness();
        let fridge = Container::new("fridge", ContainerType::Refrigerator, "kitchen", now());
        let box_ = Container::new("box", ContainerType::Box, "attic", now());
        h.store.add_container(fridge.clone()).unwrap();
        h.store.add_container(box_.clone()).unwrap();

        let inside = milk(5).in_container(fridge.id);
        let elsewhere = milk(3).in_container(box_.id);
        h.store.add_item(inside.clone()).unwrap();
        h.store.add_item(elsewhere.clone()).unwrap();
        assert_eq!(h.center.pending().len(), 4);

        assert!(h.store.delete_container(fridge.id).unwrap());

        assert!(h.store.container(fridge.id).is_none());
        assert!(h.store.item(inside.id).is_none());
        assert!(h.store.item(elsewhere.id).is_some());
        assert!(h
            .center
            .pending()
            .iter()
            .all(|r| r.item_id == elsewhere.id));
        assert_eq!(h.center.pending().len(), 2);

        assert!(!h.store.delete_container(fridge.id).unwrap());
    }

    #[test]
    fn test_update_missing_is_noop() {
        let mut h = harness();
        let ghost = milk(5);
        assert!(!h.store.update_item(ghost).unwrap());
        assert!(h.store.items().is_empty());
        assert!(h.storage.get_slot(ITEMS_SLOT).unwrap().is_none());

        let ghost_container = Container::new("ghost", ContainerType::Box, "", now());
        assert!(!h.store.update_container(ghost_container).unwrap());
    }

    #[test]
    fn test_update_item_stamps_and_reschedules() {
        let mut h = harness();
        let mut item = milk(5);
        h.store.add_item(item.clone()).unwrap();

        h.clock.advance(Duration::hours(1));
        item.set_properties(
            ItemProperties::Food(FoodProperties::expiring_on(now() + Duration::hours(10))),
            now(),
        )
        .unwrap();
        assert!(h.store.update_item(item.clone()).unwrap());

        let stored = h.store.item(item.id).unwrap();
        assert_eq!(stored.updated_at, now() + Duration::hours(1));
        // Under a day left: only the due-today reminder remains
        assert_eq!(h.center.pending().len(), 1);
    }

    #[test]
    fn test_update_item_cannot_change_type() {
        let mut h = harness();
        let item = milk(5);
        h.store.add_item(item.clone()).unwrap();

        let mut changed = item.clone();
        changed.properties = ItemProperties::default_for(ItemType::Clothing, now());
        assert!(matches!(
            h.store.update_item(changed),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(h.store.item(item.id).unwrap().item_type(), ItemType::Food);
    }

    #[test]
    fn test_delete_item_cancels_reminders() {
        let mut h = harness();
        let item = milk(5);
        h.store.add_item(item.clone()).unwrap();
        assert!(h.store.delete_item(item.id).unwrap());
        assert!(h.center.pending().is_empty());
        assert!(!h.store.delete_item(item.id).unwrap());
    }

    #[test]
    fn test_corrupt_slot_loads_empty() {
        let storage = Arc::new(StorageManager::in_memory().unwrap());
        storage.set_slot(ITEMS_SLOT, "{not json").unwrap();
        let container = Container::new("box", ContainerType::Box, "attic", now());
        storage
            .set_slot(
                CONTAINERS_SLOT,
                &serde_json::to_string(&vec![container.clone()]).unwrap(),
            )
            .unwrap();

        let scheduler = ReminderScheduler::new(
            Arc::new(InMemoryNotificationCenter::new()),
            ReminderPolicy::default(),
        );
        let store = Store::open(storage, scheduler, Arc::new(FixedClock::new(now())));

        assert!(store.items().is_empty());
        assert_eq!(store.containers(), &[container]);
    }

    #[test]
    fn test_failed_write_leaves_memory_untouched() {
        let mut slots = MockSlotStore::new();
        slots.expect_read_slot().returning(|_| Ok(None));
        slots
            .expect_write_slots()
            .returning(|_| Err(Error::StorageError("disk full".to_string())));

        let scheduler = ReminderScheduler::new(
            Arc::new(InMemoryNotificationCenter::new()),
            ReminderPolicy::default(),
        );
        let mut store = Store::open(Arc::new(slots), scheduler, Arc::new(FixedClock::new(now())));

        let result = store.add_item(milk(5));
        assert!(matches!(result, Err(Error::StorageError(_))));
        assert!(store.items().is_empty());
    }

    /// Real storage whose writes can be switched off
    struct FlakySlots {
        inner: StorageManager,
        failing: AtomicBool,
    }

    impl FlakySlots {
        fn fail_writes(&self) {
            self.failing.store(true, Ordering::SeqCst);
        }

        fn check(&self) -> Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(Error::StorageError("disk full".to_string()));
            }
            Ok(())
        }
    }

    impl SlotStore for FlakySlots {
        fn read_slot(&self, key: &str) -> Result<Option<String>> {
            self.inner.read_slot(key)
        }

        fn write_slot(&self, key: &str, value: &str) -> Result<()> {
            self.check()?;
            self.inner.write_slot(key, value)
        }

        fn clear_slot(&self, key: &str) -> Result<()> {
            self.check()?;
            self.inner.clear_slot(key)
        }

        fn write_slots(&self, entries: &[(String, String)]) -> Result<()> {
            self.check()?;
            self.inner.write_slots(entries)
        }

        fn clear_slots(&self, keys: &[String]) -> Result<()> {
            self.check()?;
            self.inner.clear_slots(keys)
        }
    }

    fn flaky_harness() -> (Store, Arc<FlakySlots>, Arc<InMemoryNotificationCenter>) {
        let slots = Arc::new(FlakySlots {
            inner: StorageManager::in_memory().unwrap(),
            failing: AtomicBool::new(false),
        });
        let center = Arc::new(InMemoryNotificationCenter::new());
        let scheduler = ReminderScheduler::new(
            center.clone(),
            ReminderPolicy::with_offset(FixedOffset::east_opt(0).unwrap()),
        );
        let store = Store::open(slots.clone(), scheduler, Arc::new(FixedClock::new(now())));
        (store, slots, center)
    }

    fn saved_containers(slots: &FlakySlots) -> Vec<Container> {
        let raw = slots.inner.get_slot(CONTAINERS_SLOT).unwrap().unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn test_failed_container_delete_keeps_reminders_and_disk() {
        let (mut store, slots, center) = flaky_harness();
        let fridge = Container::new("fridge", ContainerType::Refrigerator, "kitchen", now());
        store.add_container(fridge.clone()).unwrap();
        let item = milk(5).in_container(fridge.id);
        store.add_item(item.clone()).unwrap();
        assert_eq!(center.pending().len(), 2);

        slots.fail_writes();
        let result = store.delete_container(fridge.id);

        assert!(matches!(result, Err(Error::StorageError(_))));
        assert!(store.container(fridge.id).is_some());
        assert!(store.item(item.id).is_some());
        assert_eq!(center.pending().len(), 2);
        assert_eq!(saved_containers(&slots), vec![fridge]);
    }

    #[test]
    fn test_failed_item_delete_keeps_reminders() {
        let (mut store, slots, center) = flaky_harness();
        let item = milk(5);
        store.add_item(item.clone()).unwrap();
        assert_eq!(center.pending().len(), 2);

        slots.fail_writes();
        assert!(store.delete_item(item.id).is_err());

        assert!(store.item(item.id).is_some());
        assert_eq!(center.pending().len(), 2);
    }

    #[test]
    fn test_failed_clear_keeps_everything() {
        let (mut store, slots, center) = flaky_harness();
        store.load_sample_data().unwrap();
        let pending = center.pending().len();

        slots.fail_writes();
        assert!(store.clear_all_data().is_err());

        assert_eq!(store.items().len(), 3);
        assert_eq!(saved_containers(&slots).len(), 3);
        assert_eq!(center.pending().len(), pending);
    }

    #[test]
    fn test_invalid_properties_rejected() {
        let mut h = harness();
        let lipstick = Item::with_properties(
            "口红",
            ItemProperties::Cosmetics(CosmeticsProperties {
                opened_date: Some(now()),
                shelf_life_after_opening: 0,
                ..Default::default()
            }),
            now(),
        );
        assert!(matches!(
            h.store.add_item(lipstick),
            Err(Error::InvalidInput(_))
        ));
        assert!(h.store.items().is_empty());

        let mut item = milk(5);
        h.store.add_item(item.clone()).unwrap();
        item.properties = ItemProperties::Food(FoodProperties {
            quantity: 0,
            ..FoodProperties::expiring_on(now() + Duration::days(5))
        });
        assert!(matches!(
            h.store.update_item(item.clone()),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(
            h.store.item(item.id).unwrap().properties,
            milk(5).properties
        );
    }

    #[test]
    fn test_lookups_and_dangling_links() {
        let mut h = harness();
        let wardrobe = Container::new("衣柜", ContainerType::Wardrobe, "Master Bedroom", now())
            .with_capacity(4);
        h.store.add_container(wardrobe.clone()).unwrap();

        let shirt = Item::new("shirt", ItemType::Clothing, now()).in_container(wardrobe.id);
        let orphan = Item::new("orphan", ItemType::Clothing, now()).in_container(Uuid::new_v4());
        h.store.add_item(shirt.clone()).unwrap();
        h.store.add_item(orphan.clone()).unwrap();

        assert_eq!(h.store.container_for(&shirt).map(|c| c.id), Some(wardrobe.id));
        assert!(h.store.container_for(&orphan).is_none());
        assert_eq!(h.store.container_utilization(wardrobe.id), Some(0.25));
        assert_eq!(h.store.containers_in_location("bedroom").len(), 1);
        assert_eq!(h.store.containers_of_type(ContainerType::Drawer).len(), 0);
        assert_eq!(
            h.store
                .items_in_container_of_type(wardrobe.id, ItemType::Clothing)
                .len(),
            1
        );
        assert!(h
            .store
            .items_in_container_of_type(wardrobe.id, ItemType::Food)
            .is_empty());
    }

    #[test]
    fn test_recent_items_newest_first() {
        let mut h = harness();
        let old = Item::new("old", ItemType::Miscellaneous, now() - Duration::days(2));
        let new = Item::new("new", ItemType::Miscellaneous, now());
        h.store.add_item(old).unwrap();
        h.store.add_item(new).unwrap();

        let recent = h.store.recent_items(1);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].name, "new");
    }

    #[test]
    fn test_sample_data_and_clear() {
        let mut h = harness();
        h.store.load_sample_data().unwrap();

        assert_eq!(h.store.containers().len(), 3);
        assert_eq!(h.store.items().len(), 3);
        assert_eq!(h.store.expiring_soon_items().len(), 1);
        assert!(h.store.expired_items().is_empty());

        let stats = h.store.stats();
        assert_eq!(stats.total_items, 3);
        assert_eq!(stats.expiring_soon, 1);

        // milk: day-before + today; lipstick: lead + today; T-shirt: June 1st
        assert_eq!(h.center.pending().len(), 5);

        h.store.clear_all_data().unwrap();
        assert!(h.store.items().is_empty());
        assert!(h.store.containers().is_empty());
        assert!(h.center.pending().is_empty());
        assert!(h.storage.get_slot(ITEMS_SLOT).unwrap().is_none());
    }

    #[test]
    fn test_reload_round_trip() {
        let mut h = harness();
        h.store.load_sample_data().unwrap();
        let containers = h.store.containers().to_vec();
        let items = h.store.items().to_vec();

        h.store.load();
        assert_eq!(h.store.containers(), containers.as_slice());
        assert_eq!(h.store.items(), items.as_slice());
    }
}
