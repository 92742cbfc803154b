use sqlx::{Pool, Postgres};

use crate::config::Config;

pub type Db = Pool<Postgres>;

/// Schema migrations, embedded at build time.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub async fn connect(config: &Config) -> anyhow::Result<Db> {
    let pool = Pool::<Postgres>::connect(&config.database_url).await?;
    Ok(pool)
}

/// Apply pending migrations. Safe to call repeatedly; already-applied
/// migrations are skipped.
pub async fn migrate(pool: &Db) -> anyhow::Result<()> {
    MIGRATOR.run(pool).await?;
    Ok(())
}
