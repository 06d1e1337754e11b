use crate::entities::{
    admin_settings, group_members, groups, item_groups, items, sessions, users,
};
use anyhow::Context;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm::{ConnectionTrait, Schema};
use std::env;
use std::time::Duration;
use tracing::info;

pub async fn setup_database() -> anyhow::Result<DatabaseConnection> {
    let db_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    info!("📂 Database: {}", db_url);

    let mut opt = ConnectOptions::new(&db_url);
    opt.max_connections(20)
        .min_connections(2)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;

    info!("✅ Database connected successfully");

    run_migrations(&db).await?;

    Ok(db)
}

/// Single-connection in-memory SQLite database with the schema applied.
/// Every pooled connection to `sqlite::memory:` would otherwise see its own
/// empty database.
pub async fn connect_in_memory() -> anyhow::Result<DatabaseConnection> {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(opt).await?;
    run_migrations(&db).await?;
    Ok(db)
}

pub async fn run_migrations(db: &DatabaseConnection) -> anyhow::Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    info!("🔄 Running auto-migrations...");

    // Order matters for foreign keys: users/groups before the join tables
    let stmts = vec![
        (
            "users",
            schema
                .create_table_from_entity(users::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "groups",
            schema
                .create_table_from_entity(groups::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "group_members",
            schema
                .create_table_from_entity(group_members::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "items",
            schema
                .create_table_from_entity(items::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "item_groups",
            schema
                .create_table_from_entity(item_groups::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "sessions",
            schema
                .create_table_from_entity(sessions::Entity)
                .if_not_exists()
                .to_owned(),
        ),
        (
            "admin_settings",
            schema
                .create_table_from_entity(admin_settings::Entity)
                .if_not_exists()
                .to_owned(),
        ),
    ];

    for (name, stmt) in stmts {
        let stmt = builder.build(&stmt);
        db.execute(stmt).await?;
        info!("   - Table '{}' checked/created", name);
    }

    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_items_creator_id ON items(creator_id)",
        "CREATE INDEX IF NOT EXISTS idx_item_groups_group_id ON item_groups(group_id)",
        "CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id)",
    ];

    for query in indexes {
        match db
            .execute(sea_orm::Statement::from_string(builder, query.to_owned()))
            .await
        {
            Ok(_) => info!("   - Executed schema update: {}", query),
            Err(e) => tracing::warn!("   - Schema update warning: {} -> {}", query, e),
        }
    }

    Ok(())
}
