use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::expiration::{is_expired, is_expiring_soon};
use crate::models::{Container, Item};

/// Dashboard numbers for the whole inventory
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InventoryStats {
    pub total_containers: usize,
    pub total_items: usize,
    pub expired: usize,
    pub expiring_soon: usize,
    /// Keyed by the stable type tag so output ordering is deterministic
    pub items_by_type: BTreeMap<String, usize>,
    pub containers_by_type: BTreeMap<String, usize>,
    /// Items whose container link is missing or dangling
    pub unplaced_items: usize,
}

impl InventoryStats {
    pub fn compute(containers: &[Container], items: &[Item], now: DateTime<Utc>) -> Self {
        let mut stats = InventoryStats {
            total_containers: containers.len(),
            total_items: items.len(),
            ..Default::default()
        };

        for container in containers {
            *stats
                .containers_by_type
                .entry(container.container_type.as_str().to_string())
                .or_default() += 1;
        }

        for item in items {
            *stats
                .items_by_type
                .entry(item.item_type().as_str().to_string())
                .or_default() += 1;

            if is_expired(item, now) {
                stats.expired += 1;
            } else if is_expiring_soon(item, now) {
                stats.expiring_soon += 1;
            }

            let placed = item
                .container_id
                .is_some_and(|id| containers.iter().any(|c| c.id == id));
            if !placed {
                stats.unplaced_items += 1;
            }
        }

        stats
    }

    pub fn needs_attention(&self) -> usize {
        self.expired + self.expiring_soon
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContainerType, FoodProperties, ItemProperties, ItemType};
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    #[test]
    fn test_compute_counts() {
        let now = Utc.with_ymd_and_hms(2026, 4, 10, 12, 0, 0).unwrap();
        let fridge = Container::new("fridge", ContainerType::Refrigerator, "kitchen", now);

        let milk = Item::with_properties(
            "milk",
            ItemProperties::Food(FoodProperties::expiring_on(now + Duration::days(3))),
            now,
        )
        .in_container(fridge.id);
        let yogurt = Item::with_properties(
            "yogurt",
            ItemProperties::Food(FoodProperties::expiring_on(now - Duration::days(1))),
            now,
        )
        .in_container(fridge.id);
        let shirt = Item::new("shirt", ItemType::Clothing, now).in_container(Uuid::new_v4());
        let lamp = Item::new("lamp", ItemType::Miscellaneous, now);

        let stats = InventoryStats::compute(&[fridge], &[milk, yogurt, shirt, lamp], now);

        assert_eq!(stats.total_containers, 1);
        assert_eq!(stats.total_items, 4);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.expiring_soon, 1);
        assert_eq!(stats.needs_attention(), 2);
        assert_eq!(stats.items_by_type.get("food"), Some(&2));
        assert_eq!(stats.containers_by_type.get("refrigerator"), Some(&1));
        assert_eq!(stats.unplaced_items, 2);
    }

    #[test]
    fn test_empty_inventory() {
        let stats = InventoryStats::compute(&[], &[], Utc::now());
        assert_eq!(stats, InventoryStats::default());
    }
}
