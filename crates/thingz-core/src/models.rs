use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Item category. Fixed at creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Clothing,
    Food,
    Cosmetics,
    Miscellaneous,
}

impl ItemType {
    pub fn all() -> Vec<ItemType> {
        vec![
            ItemType::Clothing,
            ItemType::Food,
            ItemType::Cosmetics,
            ItemType::Miscellaneous,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Clothing => "clothing",
            ItemType::Food => "food",
            ItemType::Cosmetics => "cosmetics",
            ItemType::Miscellaneous => "miscellaneous",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ItemType::Clothing => "衣物",
            ItemType::Food => "食品",
            ItemType::Cosmetics => "化妆品",
            ItemType::Miscellaneous => "杂物",
        }
    }

    /// Position in pickers and type-sorted lists
    pub fn display_order(&self) -> u8 {
        match self {
            ItemType::Clothing => 0,
            ItemType::Food => 1,
            ItemType::Cosmetics => 2,
            ItemType::Miscellaneous => 3,
        }
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ItemType {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        ItemType::all()
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| crate::Error::InvalidInput(format!("Unknown item type: {}", s)))
    }
}

/// Kind of storage container
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContainerType {
    Wardrobe,
    Refrigerator,
    Drawer,
    Cabinet,
    Box,
}

impl ContainerType {
    pub fn all() -> Vec<ContainerType> {
        vec![
            ContainerType::Wardrobe,
            ContainerType::Refrigerator,
            ContainerType::Drawer,
            ContainerType::Cabinet,
            ContainerType::Box,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerType::Wardrobe => "wardrobe",
            ContainerType::Refrigerator => "refrigerator",
            ContainerType::Drawer => "drawer",
            ContainerType::Cabinet => "cabinet",
            ContainerType::Box => "box",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ContainerType::Wardrobe => "衣柜",
            ContainerType::Refrigerator => "冰箱",
            ContainerType::Drawer => "抽屉",
            ContainerType::Cabinet => "储物柜",
            ContainerType::Box => "收纳盒",
        }
    }
}

impl std::fmt::Display for ContainerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ContainerType {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        ContainerType::all()
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| crate::Error::InvalidInput(format!("Unknown container type: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClothingType {
    #[default]
    Top,
    Bottom,
    Dress,
    Outerwear,
    Underwear,
    Shoes,
    Accessories,
}

impl ClothingType {
    pub fn all() -> Vec<ClothingType> {
        vec![
            ClothingType::Top,
            ClothingType::Bottom,
            ClothingType::Dress,
            ClothingType::Outerwear,
            ClothingType::Underwear,
            ClothingType::Shoes,
            ClothingType::Accessories,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClothingType::Top => "top",
            ClothingType::Bottom => "bottom",
            ClothingType::Dress => "dress",
            ClothingType::Outerwear => "outerwear",
            ClothingType::Underwear => "underwear",
            ClothingType::Shoes => "shoes",
            ClothingType::Accessories => "accessories",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ClothingType::Top => "上衣",
            ClothingType::Bottom => "裤子",
            ClothingType::Dress => "裙子",
            ClothingType::Outerwear => "外套",
            ClothingType::Underwear => "内衣",
            ClothingType::Shoes => "鞋子",
            ClothingType::Accessories => "配饰",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
    #[default]
    AllSeasons,
}

impl Season {
    pub fn all() -> Vec<Season> {
        vec![
            Season::Spring,
            Season::Summer,
            Season::Autumn,
            Season::Winter,
            Season::AllSeasons,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
            Season::Winter => "winter",
            Season::AllSeasons => "all_seasons",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Season::Spring => "春季",
            Season::Summer => "夏季",
            Season::Autumn => "秋季",
            Season::Winter => "冬季",
            Season::AllSeasons => "四季",
        }
    }

    /// Month whose first day announces the season. `None` for all-season wear.
    pub fn reminder_month(&self) -> Option<u32> {
        match self {
            Season::Spring => Some(3),
            Season::Summer => Some(6),
            Season::Autumn => Some(9),
            Season::Winter => Some(12),
            Season::AllSeasons => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FoodType {
    #[default]
    Fresh,
    Frozen,
    Canned,
    Snacks,
    Beverages,
    Condiments,
}

impl FoodType {
    pub fn all() -> Vec<FoodType> {
        vec![
            FoodType::Fresh,
            FoodType::Frozen,
            FoodType::Canned,
            FoodType::Snacks,
            FoodType::Beverages,
            FoodType::Condiments,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FoodType::Fresh => "fresh",
            FoodType::Frozen => "frozen",
            FoodType::Canned => "canned",
            FoodType::Snacks => "snacks",
            FoodType::Beverages => "beverages",
            FoodType::Condiments => "condiments",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            FoodType::Fresh => "生鲜",
            FoodType::Frozen => "冷冻",
            FoodType::Canned => "罐头",
            FoodType::Snacks => "零食",
            FoodType::Beverages => "饮料",
            FoodType::Condiments => "调料",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CosmeticsType {
    #[default]
    Skincare,
    Makeup,
    Fragrance,
    Haircare,
}

impl CosmeticsType {
    pub fn all() -> Vec<CosmeticsType> {
        vec![
            CosmeticsType::Skincare,
            CosmeticsType::Makeup,
            CosmeticsType::Fragrance,
            CosmeticsType::Haircare,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CosmeticsType::Skincare => "skincare",
            CosmeticsType::Makeup => "makeup",
            CosmeticsType::Fragrance => "fragrance",
            CosmeticsType::Haircare => "haircare",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CosmeticsType::Skincare => "护肤品",
            CosmeticsType::Makeup => "彩妆",
            CosmeticsType::Fragrance => "香水",
            CosmeticsType::Haircare => "护发",
        }
    }
}

impl std::str::FromStr for ClothingType {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        ClothingType::all()
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| crate::Error::InvalidInput(format!("Unknown clothing type: {}", s)))
    }
}

impl std::str::FromStr for Season {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Season::all()
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| crate::Error::InvalidInput(format!("Unknown season: {}", s)))
    }
}

impl std::str::FromStr for FoodType {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        FoodType::all()
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| crate::Error::InvalidInput(format!("Unknown food type: {}", s)))
    }
}

impl std::str::FromStr for CosmeticsType {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        CosmeticsType::all()
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| crate::Error::InvalidInput(format!("Unknown cosmetics type: {}", s)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ClothingProperties {
    #[serde(default)]
    pub clothing_type: ClothingType,
    #[serde(default)]
    pub season: Season,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub material: String,
    #[serde(default)]
    pub brand: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodProperties {
    pub expiration_date: DateTime<Utc>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub food_type: FoodType,
    #[serde(default)]
    pub storage_condition: String,
}

fn default_quantity() -> u32 {
    1
}

impl FoodProperties {
    pub fn expiring_on(expiration_date: DateTime<Utc>) -> Self {
        Self {
            expiration_date,
            quantity: default_quantity(),
            unit: String::new(),
            food_type: FoodType::default(),
            storage_condition: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CosmeticsProperties {
    #[serde(default)]
    pub cosmetics_type: CosmeticsType,
    /// Unopened products never expire
    #[serde(default)]
    pub opened_date: Option<DateTime<Utc>>,
    /// Months the product stays usable once opened
    #[serde(default = "default_shelf_life")]
    pub shelf_life_after_opening: u32,
    #[serde(default)]
    pub brand: String,
}

fn default_shelf_life() -> u32 {
    12
}

impl Default for CosmeticsProperties {
    fn default() -> Self {
        Self {
            cosmetics_type: CosmeticsType::default(),
            opened_date: None,
            shelf_life_after_opening: default_shelf_life(),
            brand: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MiscellaneousProperties {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub purchase_date: Option<DateTime<Utc>>,
}

/// Category-specific data. The variant is the item's type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ItemProperties {
    Clothing(ClothingProperties),
    Food(FoodProperties),
    Cosmetics(CosmeticsProperties),
    Miscellaneous(MiscellaneousProperties),
}

impl ItemProperties {
    /// Blank properties for a freshly created item
    pub fn default_for(item_type: ItemType, now: DateTime<Utc>) -> Self {
        match item_type {
            ItemType::Clothing => ItemProperties::Clothing(ClothingProperties::default()),
            ItemType::Food => ItemProperties::Food(FoodProperties::expiring_on(now)),
            ItemType::Cosmetics => ItemProperties::Cosmetics(CosmeticsProperties::default()),
            ItemType::Miscellaneous => {
                ItemProperties::Miscellaneous(MiscellaneousProperties::default())
            }
        }
    }

    pub fn item_type(&self) -> ItemType {
        match self {
            ItemProperties::Clothing(_) => ItemType::Clothing,
            ItemProperties::Food(_) => ItemType::Food,
            ItemProperties::Cosmetics(_) => ItemType::Cosmetics,
            ItemProperties::Miscellaneous(_) => ItemType::Miscellaneous,
        }
    }

    /// Quantity and shelf life are counts and must be at least 1
    pub fn validate(&self) -> crate::Result<()> {
        match self {
            ItemProperties::Food(food) if food.quantity == 0 => Err(crate::Error::InvalidInput(
                "Quantity must be at least 1".to_string(),
            )),
            ItemProperties::Cosmetics(cosmetics) if cosmetics.shelf_life_after_opening == 0 => {
                Err(crate::Error::InvalidInput(
                    "Shelf life after opening must be at least 1 month".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }
}

/// A physical place things are kept in
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Container {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub container_type: ContainerType,
    pub location: String,
    pub capacity: u32,
    #[serde(default)]
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Container {
    pub const DEFAULT_CAPACITY: u32 = 50;

    pub fn new(
        name: impl Into<String>,
        container_type: ContainerType,
        location: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            container_type,
            location: location.into(),
            capacity: Self::DEFAULT_CAPACITY,
            cover_image: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    /// Fraction of capacity used by `item_count` items. Zero when capacity is zero.
    pub fn utilization(&self, item_count: usize) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        item_count as f64 / self.capacity as f64
    }
}

/// A tracked possession
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub notes: String,
    /// Weak link to a container; may dangle
    #[serde(default)]
    pub container_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub properties: ItemProperties,
}

impl Item {
    pub fn new(name: impl Into<String>, item_type: ItemType, now: DateTime<Utc>) -> Self {
        Self::with_properties(name, ItemProperties::default_for(item_type, now), now)
    }

    pub fn with_properties(
        name: impl Into<String>,
        properties: ItemProperties,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            image: None,
            notes: String::new(),
            container_id: None,
            created_at: now,
            updated_at: now,
            properties,
        }
    }

    pub fn in_container(mut self, container_id: Uuid) -> Self {
        self.container_id = Some(container_id);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn item_type(&self) -> ItemType {
        self.properties.item_type()
    }

    /// Swap in new category properties of the same type
    pub fn set_properties(
        &mut self,
        properties: ItemProperties,
        now: DateTime<Utc>,
    ) -> crate::Result<()> {
        if properties.item_type() != self.item_type() {
            return Err(crate::Error::InvalidInput(format!(
                "Cannot change item type from {} to {}",
                self.item_type(),
                properties.item_type()
            )));
        }
        self.properties = properties;
        self.updated_at = now;
        Ok(())
    }

    pub fn clothing(&self) -> Option<&ClothingProperties> {
        match &self.properties {
            ItemProperties::Clothing(p) => Some(p),
            _ => None,
        }
    }

    pub fn food(&self) -> Option<&FoodProperties> {
        match &self.properties {
            ItemProperties::Food(p) => Some(p),
            _ => None,
        }
    }

    pub fn cosmetics(&self) -> Option<&CosmeticsProperties> {
        match &self.properties {
            ItemProperties::Cosmetics(p) => Some(p),
            _ => None,
        }
    }

    pub fn miscellaneous(&self) -> Option<&MiscellaneousProperties> {
        match &self.properties {
            ItemProperties::Miscellaneous(p) => Some(p),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_new_item_gets_matching_properties() {
        for item_type in ItemType::all() {
            let item = Item::new("thing", item_type, now());
            assert_eq!(item.item_type(), item_type);
        }

        let food = Item::new("milk", ItemType::Food, now());
        assert_eq!(food.food().unwrap().quantity, 1);
        assert!(food.clothing().is_none());

        let cream = Item::new("cream", ItemType::Cosmetics, now());
        assert_eq!(cream.cosmetics().unwrap().shelf_life_after_opening, 12);
        assert!(cream.cosmetics().unwrap().opened_date.is_none());
    }

    #[test]
    fn test_set_properties_rejects_type_change() {
        let mut item = Item::new("shirt", ItemType::Clothing, now());
        let err = item
            .set_properties(ItemProperties::default_for(ItemType::Food, now()), now())
            .unwrap_err();
        assert!(matches!(err, crate::Error::InvalidInput(_)));
        assert_eq!(item.item_type(), ItemType::Clothing);

        let later = now() + chrono::Duration::hours(1);
        let props = ItemProperties::Clothing(ClothingProperties {
            season: Season::Winter,
            ..Default::default()
        });
        item.set_properties(props, later).unwrap();
        assert_eq!(item.clothing().unwrap().season, Season::Winter);
        assert_eq!(item.updated_at, later);
    }

    #[test]
    fn test_validate_counts() {
        assert!(ItemProperties::default_for(ItemType::Food, now()).validate().is_ok());
        assert!(ItemProperties::default_for(ItemType::Cosmetics, now()).validate().is_ok());

        let empty = ItemProperties::Food(FoodProperties {
            quantity: 0,
            ..FoodProperties::expiring_on(now())
        });
        assert!(matches!(empty.validate(), Err(crate::Error::InvalidInput(_))));

        let no_shelf_life = ItemProperties::Cosmetics(CosmeticsProperties {
            shelf_life_after_opening: 0,
            ..Default::default()
        });
        assert!(matches!(
            no_shelf_life.validate(),
            Err(crate::Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_utilization() {
        let container = Container::new("fridge", ContainerType::Refrigerator, "kitchen", now())
            .with_capacity(4);
        assert_eq!(container.utilization(1), 0.25);

        let unbounded = container.clone().with_capacity(0);
        assert_eq!(unbounded.utilization(10), 0.0);
    }

    #[test]
    fn test_stable_string_tags() {
        let mut item = Item::new("lipstick", ItemType::Cosmetics, now());
        item.properties = ItemProperties::Cosmetics(CosmeticsProperties {
            cosmetics_type: CosmeticsType::Makeup,
            opened_date: Some(now()),
            ..Default::default()
        });
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["properties"]["type"], "cosmetics");
        assert_eq!(json["properties"]["data"]["cosmetics_type"], "makeup");

        let back: Item = serde_json::from_value(json).unwrap();
        assert_eq!(back, item);

        let season = serde_json::to_string(&Season::AllSeasons).unwrap();
        assert_eq!(season, "\"all_seasons\"");

        let container = Container::new("box", ContainerType::Box, "attic", now());
        let json = serde_json::to_value(&container).unwrap();
        assert_eq!(json["type"], "box");
        assert!(json["cover_image"].is_null());
    }

    #[test]
    fn test_parse_types() {
        assert_eq!("Food".parse::<ItemType>().unwrap(), ItemType::Food);
        assert_eq!(
            "wardrobe".parse::<ContainerType>().unwrap(),
            ContainerType::Wardrobe
        );
        assert!("spaceship".parse::<ItemType>().is_err());
        assert_eq!("all_seasons".parse::<Season>().unwrap(), Season::AllSeasons);
        assert_eq!("Makeup".parse::<CosmeticsType>().unwrap(), CosmeticsType::Makeup);

        // as_str must agree with the serde tag
        for food_type in FoodType::all() {
            let json = serde_json::to_string(&food_type).unwrap();
            assert_eq!(json, format!("\"{}\"", food_type.as_str()));
        }
        for clothing_type in ClothingType::all() {
            assert_eq!(clothing_type.as_str().parse::<ClothingType>().unwrap(), clothing_type);
        }
    }
}
