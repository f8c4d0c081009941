pub mod error;
pub mod extract;
pub mod retry;
pub mod routes;
pub mod telemetry;

use axum::routing::{get, post, put};
use axum::Router;
use error::AppError;
use hall_seat_allocation_config::{Config, RetryConfig};
use hall_seat_allocation_core::{in_memory, AllocationService, HallLayout, NoticeService};
use hall_seat_allocation_database::{ensure_schema, get_database_connection, postgres};
use routes::{applications, hall, notices, seats};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub allocations: AllocationService,
    pub notices: NoticeService,
    pub retry: RetryConfig,
}

impl AppState {
    /// Picks Postgres storage when a database url is configured and in-memory storage otherwise.
    pub async fn from_config(config: &Config) -> Result<Self, AppError> {
        let layout = HallLayout::from_config(&config.layout)?;
        let (allocations, notices) = match &config.database_url {
            Some(database_url) => {
                let pool = get_database_connection(database_url, config.database_pool_size)?;
                ensure_schema(&pool).await?;
                info!("using postgres storage");
                postgres(&pool, layout)
            }
            None => {
                info!("using in-memory storage, nothing survives a restart");
                in_memory(layout)
            }
        };
        Ok(Self {
            allocations,
            notices,
            retry: config.retry,
        })
    }
}

pub fn router(state: AppState) -> Router {
    let app = Router::new()
        .route("/health", get(hall::health))
        .route("/layout", get(hall::layout))
        .route(
            "/applications",
            get(applications::list).post(applications::submit),
        )
        .route("/applications/approved", get(applications::approved))
        .route("/applications/:id", get(applications::get))
        .route("/applications/:id/allocation", get(applications::allocation))
        .route("/applications/:id/status", put(applications::set_status))
        .route("/floors/:floor", get(seats::floor_map))
        .route("/allocations", post(seats::assign))
        .route(
            "/floors/:floor/rooms/:room/seats/:seat",
            put(seats::reassign).delete(seats::unassign),
        )
        .route("/notices", get(notices::list).post(notices::publish))
        .route("/notices/:id", get(notices::get).delete(notices::remove))
        .with_state(state);

    // layers are in reverse order
    app.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::default().include_headers(true))
                    .on_response(DefaultOnResponse::default().include_headers(true)),
            )
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(CatchPanicLayer::new()),
    )
}
