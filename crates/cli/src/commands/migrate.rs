//! Database migration command.
//!
//! Applies every pending migration from `crates/api/migrations/`:
//!
//! ```text
//! migrations/
//! ├── 20250101000001_create_users.sql
//! ├── 20250101000002_create_addresses.sql
//! ├── 20250101000003_create_products.sql
//! └── 20250101000004_create_orders.sql
//! ```

use freshcart_api::db;

use super::{CommandError, database_url};

/// Run all pending migrations.
pub async fn run() -> Result<(), CommandError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
