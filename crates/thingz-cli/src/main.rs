use anyhow::{bail, Context};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use thingz_api::AuthClient;
use thingz_core::expiration::days_until_expiration;
use thingz_core::models::{
    ClothingProperties, CosmeticsProperties, FoodProperties, MiscellaneousProperties, Season,
};
use thingz_core::{
    AuthService, Clock, Config, Container, ContainerQuery, ContainerType, Item, ItemFilters,
    ItemProperties, ItemQuery, ItemSort, ItemType, LocalNotificationCenter, ReminderPolicy,
    ReminderScheduler, SessionStore, Store, SystemClock,
};
use thingz_storage::StorageManager;

#[derive(Parser)]
#[command(name = "thingz")]
#[command(version, about = "Household inventory with expiration reminders", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// List containers
    Containers {
        #[arg(long = "type")]
        container_type: Option<ContainerType>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    /// Add a container
    AddContainer {
        name: String,
        #[arg(long = "type", default_value = "box")]
        container_type: ContainerType,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long, default_value_t = Container::DEFAULT_CAPACITY)]
        capacity: u32,
    },
    /// Add an item
    AddItem {
        name: String,
        #[arg(long = "type")]
        item_type: ItemType,
        /// Container id, id prefix or exact name
        #[arg(long)]
        container: Option<String>,
        #[arg(long, default_value = "")]
        notes: String,
        /// Food expiration date (YYYY-MM-DD)
        #[arg(long)]
        expires: Option<NaiveDate>,
        /// Cosmetics opened date (YYYY-MM-DD)
        #[arg(long)]
        opened: Option<NaiveDate>,
        /// Cosmetics shelf life after opening, in months
        #[arg(long, default_value_t = 12, value_parser = clap::value_parser!(u32).range(1..))]
        shelf_life: u32,
        /// Clothing season
        #[arg(long)]
        season: Option<Season>,
        #[arg(long, default_value = "")]
        brand: String,
    },
    /// List items
    Items {
        #[arg(long = "type")]
        item_type: Option<ItemType>,
        /// Container id, id prefix or exact name
        #[arg(long)]
        container: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        search: Option<String>,
        /// name, type, added or expiration
        #[arg(long)]
        sort: Option<ItemSort>,
    },
    /// Search items and containers
    Search { query: String },
    /// Items that are expired or about to expire
    Expiring {
        /// Look this many days ahead instead of the per-category windows
        #[arg(long)]
        days: Option<i64>,
    },
    /// Inventory statistics
    Stats,
    /// Show pending reminders
    Reminders,
    /// Rebuild all reminders
    Refresh,
    /// Replace everything with sample data
    Sample,
    /// Delete all containers, items and reminders
    Clear {
        #[arg(long)]
        yes: bool,
    },
    /// Delete an item
    DeleteItem { id: String },
    /// Delete a container and everything in it
    DeleteContainer { id: String },
    /// Sign in with username and password
    Login {
        username: String,
        #[arg(long, env = "THINGZ_PASSWORD")]
        password: String,
    },
    /// Sign in with an SMS verification code
    LoginSms { phone: String, code: String },
    /// Request an SMS verification code
    SendCode { phone: String },
    /// Sign out
    Logout,
    /// Show the signed-in user
    Whoami,
}

struct App {
    store: Store,
    storage: Arc<StorageManager>,
    center: Arc<LocalNotificationCenter>,
    clock: Arc<dyn Clock>,
    policy: ReminderPolicy,
}

fn open_app(config: &Config) -> anyhow::Result<App> {
    let db_path = config.storage.db_path()?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let db_path = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?
        .to_string();

    let storage = Arc::new(StorageManager::new(&db_path)?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let center = Arc::new(LocalNotificationCenter::new(storage.clone(), clock.clone()));
    let policy = config.reminders.policy()?;
    let scheduler = ReminderScheduler::new(center.clone(), policy);
    let store = Store::open(storage.clone(), scheduler, clock.clone());

    Ok(App {
        store,
        storage,
        center,
        clock,
        policy,
    })
}

fn auth_service(config: &Config, app: &App) -> anyhow::Result<AuthService> {
    let client = AuthClient::new(config.auth.api_url.clone(), config.auth.timeout())?;
    let sessions = SessionStore::new(
        app.storage.clone(),
        app.clock.clone(),
        config.auth.session_days,
    );
    Ok(AuthService::new(client, sessions))
}

/// Accept a full id, a unique id prefix, or an exact name
fn resolve<'a, T>(
    candidates: &'a [T],
    key: &str,
    id: impl Fn(&T) -> Uuid,
    name: impl Fn(&T) -> &str,
    what: &str,
) -> anyhow::Result<&'a T> {
    if let Ok(uuid) = key.parse::<Uuid>() {
        if let Some(found) = candidates.iter().find(|c| id(*c) == uuid) {
            return Ok(found);
        }
    }

    let matches: Vec<&T> = candidates
        .iter()
        .filter(|c| id(*c).to_string().starts_with(key) || name(*c) == key)
        .collect();

    match matches.as_slice() {
        [one] => Ok(*one),
        [] => bail!("No {} matches '{}'", what, key),
        _ => bail!("'{}' matches {} {}s, be more specific", key, matches.len(), what),
    }
}

fn resolve_container(store: &Store, key: &str) -> anyhow::Result<Uuid> {
    resolve(store.containers(), key, |c| c.id, |c| &c.name, "container").map(|c| c.id)
}

fn resolve_item(store: &Store, key: &str) -> anyhow::Result<Uuid> {
    resolve(store.items(), key, |i| i.id, |i| &i.name, "item").map(|i| i.id)
}

fn short_id(id: Uuid) -> String {
    id.to_string()[..8].to_string()
}

fn local_midnight(date: NaiveDate, policy: &ReminderPolicy) -> anyhow::Result<DateTime<Utc>> {
    policy
        .utc_offset
        .from_local_datetime(&date.and_hms_opt(0, 0, 0).context("Invalid date")?)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .context("Ambiguous local date")
}

fn print_container(store: &Store, container: &Container) {
    let count = store.container_item_count(container.id);
    println!(
        "{}  {:<16} {:<6} {:<10} {:>3}/{:<3} ({:.0}%)",
        short_id(container.id),
        container.name,
        container.container_type.display_name(),
        container.location,
        count,
        container.capacity,
        container.utilization(count) * 100.0
    );
}

fn print_item(store: &Store, item: &Item, now: DateTime<Utc>) {
    let container = store
        .container_for(item)
        .map(|c| c.name.as_str())
        .unwrap_or("-");
    let status = store.expiration_status(item);
    let expiry = match days_until_expiration(item, now) {
        Some(days) if days < 0 => format!("{} ({} days ago)", status.label(), -days),
        Some(days) => format!("{} ({} days left)", status.label(), days),
        None => String::new(),
    };

    println!(
        "{}  {:<16} {:<6} {:<16} {}",
        short_id(item.id),
        item.name,
        item.item_type().display_name(),
        container,
        expiry
    );
}

#[allow(clippy::too_many_arguments)]
fn build_item(
    name: String,
    item_type: ItemType,
    notes: String,
    expires: Option<NaiveDate>,
    opened: Option<NaiveDate>,
    shelf_life: u32,
    season: Option<Season>,
    brand: String,
    app: &App,
) -> anyhow::Result<Item> {
    let now = app.clock.now();
    let properties = match item_type {
        ItemType::Food => {
            let date = expires.context("Food needs --expires YYYY-MM-DD")?;
            ItemProperties::Food(FoodProperties::expiring_on(local_midnight(
                date,
                &app.policy,
            )?))
        }
        ItemType::Cosmetics => ItemProperties::Cosmetics(CosmeticsProperties {
            opened_date: opened
                .map(|date| local_midnight(date, &app.policy))
                .transpose()?,
            shelf_life_after_opening: shelf_life,
            brand,
            ..Default::default()
        }),
        ItemType::Clothing => ItemProperties::Clothing(ClothingProperties {
            season: season.unwrap_or_default(),
            brand,
            ..Default::default()
        }),
        ItemType::Miscellaneous => ItemProperties::Miscellaneous(MiscellaneousProperties {
            brand,
            ..Default::default()
        }),
    };

    Ok(Item::with_properties(name, properties, now).with_notes(notes))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "thingz=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let mut app = open_app(&config)?;
    let now = app.clock.now();

    match cli.command {
        Some(Commands::Containers {
            container_type,
            location,
            search,
        }) => {
            let mut query = ContainerQuery::new().search(search.unwrap_or_default());
            if let Some(container_type) = container_type {
                query = query.container_type(container_type);
            }
            if let Some(location) = location {
                query = query.location(location);
            }
            for container in app.store.query_containers(&query) {
                print_container(&app.store, container);
            }
        }
        Some(Commands::AddContainer {
            name,
            container_type,
            location,
            capacity,
        }) => {
            let container =
                Container::new(name, container_type, location, now).with_capacity(capacity);
            let id = container.id;
            app.store.add_container(container)?;
            println!("Added container {}", id);
        }
        Some(Commands::AddItem {
            name,
            item_type,
            container,
            notes,
            expires,
            opened,
            shelf_life,
            season,
            brand,
        }) => {
            let mut item = build_item(
                name, item_type, notes, expires, opened, shelf_life, season, brand, &app,
            )?;
            if let Some(key) = container {
                item = item.in_container(resolve_container(&app.store, &key)?);
            }
            let id = item.id;
            app.store.add_item(item)?;
            println!("Added item {}", id);
        }
        Some(Commands::Items {
            item_type,
            container,
            location,
            search,
            sort,
        }) => {
            let mut filters = ItemFilters::new();
            if let Some(item_type) = item_type {
                filters = filters.item_type(item_type);
            }
            if let Some(key) = container {
                filters = filters.container(resolve_container(&app.store, &key)?);
            }
            if let Some(location) = location {
                filters = filters.location(location);
            }

            let query = ItemQuery::new()
                .filters(filters)
                .search(search.unwrap_or_default())
                .sort_by(sort.unwrap_or_default());
            for item in app.store.query_items(&query) {
                print_item(&app.store, item, now);
            }
        }
        Some(Commands::Search { query }) => {
            let containers = app.store.search_containers(&query);
            let items = app.store.search_items(&query);

            if !containers.is_empty() {
                println!("Containers:");
                for container in containers {
                    print_container(&app.store, container);
                }
            }
            if !items.is_empty() {
                println!("Items:");
                for item in items {
                    print_item(&app.store, item, now);
                }
            }
        }
        Some(Commands::Expiring { days }) => {
            let mut items = match days {
                Some(days) => app.store.expiring_within(days),
                None => app.store.items_needing_attention(),
            };
            thingz_core::query::sort_items(&mut items, ItemSort::Expiration);

            if items.is_empty() {
                println!("Nothing is expiring.");
            }
            for item in items {
                print_item(&app.store, item, now);
            }
        }
        Some(Commands::Stats) => {
            let stats = app.store.stats();
            println!("Containers:      {}", stats.total_containers);
            for (tag, count) in &stats.containers_by_type {
                println!("  {:<14} {}", tag, count);
            }
            println!("Items:           {}", stats.total_items);
            for (tag, count) in &stats.items_by_type {
                println!("  {:<14} {}", tag, count);
            }
            println!("Expired:         {}", stats.expired);
            println!("Expiring soon:   {}", stats.expiring_soon);
            println!("Not in a container: {}", stats.unplaced_items);
        }
        Some(Commands::Reminders) => {
            let pending = app.center.pending()?;
            if pending.is_empty() {
                println!("No pending reminders.");
            }
            for reminder in pending {
                println!(
                    "{}  {}  {}",
                    reminder.fire_at.format("%Y-%m-%d %H:%M UTC"),
                    reminder.title,
                    reminder.body
                );
            }
        }
        Some(Commands::Refresh) => {
            let report = app.store.refresh_reminders();
            println!(
                "Scheduled {} reminders ({} failed)",
                report.scheduled, report.failed
            );
        }
        Some(Commands::Sample) => {
            app.store.load_sample_data()?;
            println!("Loaded sample data.");
        }
        Some(Commands::Clear { yes }) => {
            if !yes {
                bail!("This deletes every container and item. Re-run with --yes to confirm.");
            }
            app.store.clear_all_data()?;
            println!("All data cleared.");
        }
        Some(Commands::DeleteItem { id }) => {
            let id = resolve_item(&app.store, &id)?;
            app.store.delete_item(id)?;
            println!("Deleted item {}", id);
        }
        Some(Commands::DeleteContainer { id }) => {
            let id = resolve_container(&app.store, &id)?;
            let contained = app.store.container_item_count(id);
            app.store.delete_container(id)?;
            println!("Deleted container {} and {} items", id, contained);
        }
        Some(Commands::Login { username, password }) => {
            let user = auth_service(&config, &app)?
                .login_with_password(&username, &password)
                .await?;
            println!("Signed in as {}", user.username);
        }
        Some(Commands::LoginSms { phone, code }) => {
            let user = auth_service(&config, &app)?
                .login_with_sms(&phone, &code)
                .await?;
            println!("Signed in as {}", user.username);
        }
        Some(Commands::SendCode { phone }) => {
            auth_service(&config, &app)?.send_sms_code(&phone).await?;
            println!("Verification code sent to {}", phone);
        }
        Some(Commands::Logout) => {
            auth_service(&config, &app)?.logout()?;
            println!("Signed out.");
        }
        Some(Commands::Whoami) => {
            let auth = auth_service(&config, &app)?;
            match auth.current_user() {
                Some(user) => {
                    println!("{} ({})", user.username, user.login_method.display_name());
                    if let Some(days) = auth.sessions().days_remaining() {
                        println!("Session valid for {} more days", days);
                    }
                }
                None => println!("Not signed in."),
            }
        }
        None => {
            println!("No command specified. Try --help");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shelf_life_must_be_positive() {
        let parse = |shelf_life: &str| {
            Cli::try_parse_from([
                "thingz",
                "add-item",
                "口红",
                "--type",
                "cosmetics",
                "--shelf-life",
                shelf_life,
            ])
        };

        assert!(parse("0").is_err());
        match parse("6").unwrap().command {
            Some(Commands::AddItem { shelf_life, .. }) => assert_eq!(shelf_life, 6),
            _ => panic!("expected add-item"),
        }
    }
}
