// Search, filter and sort over the in-memory collections
use uuid::Uuid;

use crate::expiration::expiration_date;
use crate::models::{Container, ContainerType, Item, ItemProperties, ItemType};

/// How item lists get ordered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ItemSort {
    /// Ascending by name
    #[default]
    Name,
    /// By category display order
    Type,
    /// Newest first
    DateAdded,
    /// Soonest expiration first; items that never expire go last
    Expiration,
}

impl std::str::FromStr for ItemSort {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(ItemSort::Name),
            "type" => Ok(ItemSort::Type),
            "added" | "date" | "date_added" | "date-added" => Ok(ItemSort::DateAdded),
            "expiration" | "expiry" => Ok(ItemSort::Expiration),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown sort order: {}",
                other
            ))),
        }
    }
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Does `item` match an already-lowercased query?
///
/// Name and notes always count; beyond that each category exposes its own
/// descriptive fields.
fn item_matches(item: &Item, needle_lower: &str) -> bool {
    if contains_ci(&item.name, needle_lower) || contains_ci(&item.notes, needle_lower) {
        return true;
    }

    match &item.properties {
        ItemProperties::Clothing(p) => [&p.color, &p.brand, &p.material]
            .iter()
            .any(|field| contains_ci(field, needle_lower)),
        ItemProperties::Food(p) => [&p.unit, &p.storage_condition]
            .iter()
            .any(|field| contains_ci(field, needle_lower)),
        ItemProperties::Cosmetics(p) => contains_ci(&p.brand, needle_lower),
        ItemProperties::Miscellaneous(p) => [&p.category, &p.brand, &p.model]
            .iter()
            .any(|field| contains_ci(field, needle_lower)),
    }
}

/// Case-insensitive substring search. An empty query returns everything.
pub fn search_items<'a>(items: &'a [Item], query: &str) -> Vec<&'a Item> {
    narrow_items(items.iter().collect(), query)
}

fn narrow_items<'a>(items: Vec<&'a Item>, query: &str) -> Vec<&'a Item> {
    if query.is_empty() {
        return items;
    }
    let needle = query.to_lowercase();
    items
        .into_iter()
        .filter(|item| item_matches(item, &needle))
        .collect()
}

/// Containers match on name or location
pub fn search_containers<'a>(containers: &'a [Container], query: &str) -> Vec<&'a Container> {
    if query.is_empty() {
        return containers.iter().collect();
    }
    let needle = query.to_lowercase();
    containers
        .iter()
        .filter(|c| contains_ci(&c.name, &needle) || contains_ci(&c.location, &needle))
        .collect()
}

/// Order item references in place. Sorting is stable.
pub fn sort_items(items: &mut [&Item], sort: ItemSort) {
    match sort {
        ItemSort::Name => items.sort_by(|a, b| a.name.cmp(&b.name)),
        ItemSort::Type => items.sort_by_key(|item| item.item_type().display_order()),
        ItemSort::DateAdded => items.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        // (has no expiration, date): items with a date sort first, by date
        ItemSort::Expiration => items.sort_by_key(|item| {
            let date = expiration_date(item);
            (date.is_none(), date)
        }),
    }
}

/// Narrowing filters for item lists. Unset fields pass everything.
#[derive(Debug, Clone, Default)]
pub struct ItemFilters {
    pub item_type: Option<ItemType>,
    pub container_id: Option<Uuid>,
    /// Substring of the owning container's location
    pub location: Option<String>,
}

impl ItemFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item_type(mut self, item_type: ItemType) -> Self {
        self.item_type = Some(item_type);
        self
    }

    pub fn container(mut self, container_id: Uuid) -> Self {
        self.container_id = Some(container_id);
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Location filtering looks the container up in `containers`; an item
    /// whose container can't be found has no location and never matches.
    pub fn matches(&self, item: &Item, containers: &[Container]) -> bool {
        if let Some(item_type) = self.item_type {
            if item.item_type() != item_type {
                return false;
            }
        }

        if let Some(container_id) = self.container_id {
            if item.container_id != Some(container_id) {
                return false;
            }
        }

        if let Some(location) = &self.location {
            let needle = location.to_lowercase();
            let found = item
                .container_id
                .and_then(|id| containers.iter().find(|c| c.id == id))
                .is_some_and(|c| contains_ci(&c.location, &needle));
            if !found {
                return false;
            }
        }

        true
    }

    pub fn apply<'a>(&self, items: &'a [Item], containers: &[Container]) -> Vec<&'a Item> {
        items
            .iter()
            .filter(|item| self.matches(item, containers))
            .collect()
    }
}

/// A full list view: filter, then search, then sort
#[derive(Debug, Clone, Default)]
pub struct ItemQuery {
    pub filters: ItemFilters,
    pub search: String,
    pub sort: Option<ItemSort>,
}

impl ItemQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filters(mut self, filters: ItemFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn search(mut self, query: impl Into<String>) -> Self {
        self.search = query.into();
        self
    }

    pub fn sort_by(mut self, sort: ItemSort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn apply<'a>(&self, items: &'a [Item], containers: &[Container]) -> Vec<&'a Item> {
        let filtered = self.filters.apply(items, containers);
        let mut results = narrow_items(filtered, &self.search);
        if let Some(sort) = self.sort {
            sort_items(&mut results, sort);
        }
        results
    }
}

/// Filters + search for container lists
#[derive(Debug, Clone, Default)]
pub struct ContainerQuery {
    pub container_type: Option<ContainerType>,
    pub location: Option<String>,
    pub search: String,
}

impl ContainerQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn container_type(mut self, container_type: ContainerType) -> Self {
        self.container_type = Some(container_type);
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn search(mut self, query: impl Into<String>) -> Self {
        self.search = query.into();
        self
    }

    pub fn apply<'a>(&self, containers: &'a [Container]) -> Vec<&'a Container> {
        let location = self.location.as_ref().map(|l| l.to_lowercase());
        let needle = self.search.to_lowercase();

        containers
            .iter()
            .filter(|c| self.container_type.map_or(true, |t| c.container_type == t))
            .filter(|c| {
                location
                    .as_deref()
                    .map_or(true, |loc| contains_ci(&c.location, loc))
            })
            .filter(|c| {
                needle.is_empty()
                    || contains_ci(&c.name, &needle)
                    || contains_ci(&c.location, &needle)
            })
            .collect()
    }
}
