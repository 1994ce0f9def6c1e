use std::{str::FromStr, time::Duration};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqliteExecutor, SqlitePool,
};

use crate::{
    errors::AppError,
    structs::{InventoryItem, ItemInput, Role, User},
    utils,
};

pub const ADMIN_USERNAME: &str = "admin";

/// Opens the SQLite pool and brings the schema up to date.
pub async fn connect(database_url: &str) -> Result<SqlitePool, AppError> {
    let opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .read_only(false)
        .busy_timeout(Duration::from_secs(5));

    let db_pool = SqlitePoolOptions::new().connect_with(opts).await?;
    sqlx::migrate!().run(&db_pool).await?;
    log::info!("Database migrated successfully");
    Ok(db_pool)
}

pub async fn get_user_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn get_user_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await
}

pub async fn create_user(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    pwd_hash: &str,
    role: Role,
) -> Result<User, sqlx::Error> {
    let created_at = chrono::Utc::now().to_rfc3339();
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (username, email, pwd_hash, role, created_at) VALUES (?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(username)
    .bind(email)
    .bind(pwd_hash)
    .bind(role)
    .bind(&created_at)
    .fetch_one(pool)
    .await?;
    log::info!("User created: {} ({})", user.username, user.role);
    Ok(user)
}

/// Creates the `admin` account on first start. Returns whether one was created.
pub async fn seed_admin(pool: &SqlitePool, email: &str, password: &str) -> Result<bool, AppError> {
    if get_user_by_username(pool, ADMIN_USERNAME).await?.is_some() {
        return Ok(false);
    }
    let pwd_hash = utils::hash_password_blocking(password.to_owned()).await?;
    create_user(pool, ADMIN_USERNAME, email, &pwd_hash, Role::Admin).await?;
    log::info!("Admin user initialized");
    Ok(true)
}

pub async fn get_item<'e, E>(executor: E, part_number: i64) -> Result<Option<InventoryItem>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, InventoryItem>("SELECT * FROM inventory WHERE part_number = ?")
        .bind(part_number)
        .fetch_optional(executor)
        .await
}

pub async fn item_exists<'e, E>(executor: E, part_number: i64) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let found: Option<i64> = sqlx::query_scalar::<_, i64>("SELECT 1 FROM inventory WHERE part_number = ?")
        .bind(part_number)
        .fetch_optional(executor)
        .await?;
    Ok(found.is_some())
}

/// Inserts an item; a `None` part number lets SQLite assign the next rowid.
pub async fn insert_item<'e, E>(
    executor: E,
    part_number: Option<i64>,
    input: &ItemInput,
) -> Result<InventoryItem, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, InventoryItem>(
        "INSERT INTO inventory (part_number, part_name, description, origin_part_number, vendor_part_number, cost, quantity, min_on_hand, location, manufacturer, notes) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(part_number)
    .bind(&input.part_name)
    .bind(&input.description)
    .bind(&input.origin_part_number)
    .bind(&input.vendor_part_number)
    .bind(input.cost)
    .bind(input.quantity)
    .bind(input.min_on_hand)
    .bind(&input.location)
    .bind(&input.manufacturer)
    .bind(&input.notes)
    .fetch_one(executor)
    .await
}

/// Overwrites every editable field of an existing item.
pub async fn update_item<'e, E>(
    executor: E,
    part_number: i64,
    input: &ItemInput,
) -> Result<InventoryItem, AppError>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, InventoryItem>(
        "UPDATE inventory SET part_name = ?, description = ?, origin_part_number = ?, vendor_part_number = ?, cost = ?, \
         quantity = ?, min_on_hand = ?, location = ?, manufacturer = ?, notes = ? WHERE part_number = ? RETURNING *",
    )
    .bind(&input.part_name)
    .bind(&input.description)
    .bind(&input.origin_part_number)
    .bind(&input.vendor_part_number)
    .bind(input.cost)
    .bind(input.quantity)
    .bind(input.min_on_hand)
    .bind(&input.location)
    .bind(&input.manufacturer)
    .bind(&input.notes)
    .bind(part_number)
    .fetch_optional(executor)
    .await?
    .ok_or(AppError::NotFound)
}

pub async fn delete_item<'e, E>(executor: E, part_number: i64) -> Result<(), AppError>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM inventory WHERE part_number = ?")
        .bind(part_number)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

pub async fn all_items<'e, E>(executor: E) -> Result<Vec<InventoryItem>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, InventoryItem>("SELECT * FROM inventory ORDER BY part_number ASC")
        .fetch_all(executor)
        .await
}

pub async fn low_stock_items(pool: &SqlitePool) -> Result<Vec<InventoryItem>, sqlx::Error> {
    sqlx::query_as::<_, InventoryItem>(
        "SELECT * FROM inventory WHERE quantity < min_on_hand ORDER BY part_number ASC",
    )
    .fetch_all(pool)
    .await
}
