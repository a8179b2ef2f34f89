use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, Error as AxumError, Header, authorization::Basic},
};
use engine::{Engine, users};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::sync::Arc;

use crate::{budgets, categories, cron, notifications, people, recurring, transactions};

static CRON_HEADER: axum::http::HeaderName = axum::http::HeaderName::from_static("x-cron-token");

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
    /// Shared secret of `POST /cron`. The endpoint is disabled when unset.
    pub cron_token: Option<Arc<str>>,
}

/// `TypedHeader` for the scheduler token.
///
/// Requests to `/cron` must contain the "x-cron-token" entry in the header.
#[derive(Debug)]
pub(crate) struct CronToken(pub(crate) String);

impl Header for CronToken {
    fn name() -> &'static axum::http::HeaderName {
        &CRON_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i axum::http::HeaderValue>,
    {
        let value = values.next().ok_or_else(AxumError::invalid)?;
        let Ok(value) = value.to_str() else {
            return Err(AxumError::invalid());
        };

        Ok(CronToken(value.to_string()))
    }

    fn encode<E: Extend<axum::http::HeaderValue>>(&self, values: &mut E) {
        match axum::http::HeaderValue::from_str(&self.0) {
            Ok(value) => values.extend(std::iter::once(value)),
            Err(_) => tracing::error!("failed to encode x-cron-token header"),
        }
    }
}

async fn auth(
    auth_header: TypedHeader<Authorization<Basic>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user = users::Entity::find()
        .filter(users::Column::Username.eq(auth_header.username()))
        .filter(users::Column::Password.eq(auth_header.password()))
        .one(&state.db)
        .await
        .map_err(|err| {
            tracing::error!("failed to load user: {err}");
            StatusCode::UNAUTHORIZED
        })?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub(crate) fn router(state: ServerState) -> Router {
    let authenticated = Router::new()
        .route("/recurring", get(recurring::list).post(recurring::create))
        .route("/recurring/run", post(recurring::run))
        .route(
            "/recurring/{id}",
            get(recurring::get)
                .patch(recurring::update)
                .delete(recurring::delete),
        )
        .route(
            "/transactions",
            get(transactions::list).post(transactions::create),
        )
        .route(
            "/transactions/{id}",
            get(transactions::get)
                .patch(transactions::update)
                .delete(transactions::delete),
        )
        .route("/transactions/{id}/remind", post(transactions::remind))
        .route("/trash", get(transactions::list_trash))
        .route("/trash/{id}/restore", post(transactions::restore))
        .route("/budgets", get(budgets::list).post(budgets::create))
        .route(
            "/budgets/{id}",
            get(budgets::get)
                .patch(budgets::set_total)
                .delete(budgets::delete),
        )
        .route(
            "/budgets/{id}/categories/{category_id}",
            put(budgets::set_allocation),
        )
        .route(
            "/categories",
            get(categories::list).post(categories::create),
        )
        .route(
            "/categories/{id}",
            axum::routing::patch(categories::update),
        )
        .route("/people", get(people::list).post(people::create))
        .route("/notifications", get(notifications::list))
        .route("/notifications/{id}/read", post(notifications::mark_read))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth));

    Router::new()
        .route("/cron", post(cron::run))
        .merge(authenticated)
        .with_state(state)
}

pub async fn run_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
    cron_token: Option<String>,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state(engine, db, cron_token))).await
}

pub(crate) fn state(
    engine: Engine,
    db: DatabaseConnection,
    cron_token: Option<String>,
) -> ServerState {
    ServerState {
        engine: Arc::new(engine),
        db,
        cron_token: cron_token
            .filter(|token| !token.is_empty())
            .map(Arc::from),
    }
}
