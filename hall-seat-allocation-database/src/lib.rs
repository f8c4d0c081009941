pub mod error;
pub mod models;
mod notice;
mod registry;
pub mod schema;
mod store;

use std::sync::Arc;

use diesel_async::pooled_connection::deadpool::{self, Object};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::{AsyncPgConnection, SimpleAsyncConnection};
pub use error::DatabaseError;
use hall_seat_allocation_core::{AllocationService, HallLayout, NoticeService};
pub use notice::PgNoticeBoard;
pub use registry::PgRegistry;
pub use store::PgAllocationStore;
use tracing::info;

// https://github.com/tokio-rs/axum/tree/main/examples/diesel-async-postgres

pub type Pool = deadpool::Pool<AsyncPgConnection>;

const SCHEMA: &str = include_str!("../migrations/2026-10-01-000000_create_hall/up.sql");

pub fn get_database_connection(database_url: &str, max_size: usize) -> Result<Pool, DatabaseError> {
    let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    Ok(Pool::builder(config).max_size(max_size).build()?)
}

pub(crate) async fn connection(pool: &Pool) -> Result<Object<AsyncPgConnection>, DatabaseError> {
    Ok(pool.get().await?)
}

/// Creates the tables if they don't exist yet.
pub async fn ensure_schema(pool: &Pool) -> Result<(), DatabaseError> {
    let mut pooled = connection(pool).await?;
    let connection: &mut AsyncPgConnection = &mut pooled;
    connection.batch_execute(SCHEMA).await?;
    info!("database schema is ready");
    Ok(())
}

/// Services backed by Postgres.
#[must_use]
pub fn postgres(pool: &Pool, layout: HallLayout) -> (AllocationService, NoticeService) {
    (
        AllocationService::new(
            Arc::new(layout),
            Arc::new(PgRegistry::new(pool.clone())),
            Arc::new(PgAllocationStore::new(pool.clone())),
        ),
        NoticeService::new(Arc::new(PgNoticeBoard::new(pool.clone()))),
    )
}
