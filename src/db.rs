use anyhow::Result;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;

pub type OrmConn = DatabaseConnection;

/// Create a SeaORM connection.
pub async fn create_orm_conn(database_url: &str) -> Result<OrmConn> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .max_connections(20)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    let conn = Database::connect(options).await?;
    Ok(conn)
}

/// Apply the SQL migrations embedded from `migrations/`.
pub async fn run_migrations(conn: &OrmConn) -> Result<()> {
    let pool = conn.get_postgres_connection_pool();
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
