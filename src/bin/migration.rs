//! Applies the schema migrations to the configured database.
//!
//! Run with: cargo run --bin migration

use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("Starting database migration");

    let database_url = std::env::var("DATABASE_URL")
        .or_else(|_| std::env::var("APP__DATABASE_URL"))
        .unwrap_or_else(|_| "sqlite://shopme.db?mode=rwc".to_string());

    shopme_admin::migrator::run_migration(&database_url).await?;

    info!("Migration completed successfully");
    Ok(())
}
