//! # GraphQL gateway
//!
//! Builds the axum router that exposes the ledger over GraphQL.
//!
//! ## Endpoints
//!
//! | Method | Path       | Description                    |
//! |--------|------------|--------------------------------|
//! | POST   | `/graphql` | GraphQL queries and mutations  |
//! | GET    | `/graphql` | GraphiQL explorer              |
//! | GET    | `/health`  | Liveness check                 |

pub mod error;
pub mod schema;

use std::sync::Arc;

use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Method},
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use minibank_core::BankContext;

pub use schema::{build_schema, BankSchema, RequestContext};

/// Shared state for request handlers. Cheap to clone.
#[derive(Clone)]
pub struct GatewayState {
    pub bank: Arc<BankContext>,
    pub schema: BankSchema,
}

impl GatewayState {
    pub fn new(bank: Arc<BankContext>) -> Self {
        let schema = build_schema(Arc::clone(&bank));
        Self { bank, schema }
    }

    /// Resolve the caller from the `Authorization` header. Missing or
    /// invalid tokens yield an anonymous caller.
    fn request_context(&self, headers: &HeaderMap) -> RequestContext {
        let user_id = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|token| self.bank.auth_service.verify_token(token));
        RequestContext { user_id }
    }
}

/// Builds the full axum [`Router`] with GraphQL routes, CORS, and tracing.
pub fn create_router(bank: Arc<BankContext>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/graphql", get(graphiql_handler).post(graphql_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(GatewayState::new(bank))
}

async fn graphql_handler(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    request: GraphQLRequest,
) -> GraphQLResponse {
    let caller = state.request_context(&headers);
    tracing::debug!(authenticated = caller.user_id.is_some(), "graphql request");

    let request = request.into_inner().data(caller);
    state.schema.execute(request).await.into()
}

async fn graphiql_handler() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

async fn health_handler() -> &'static str {
    "ok"
}
