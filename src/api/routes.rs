use crate::api::handlers;
use crate::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/", get(handlers::health_check))
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::get_session)
                .put(handlers::set_session)
                .delete(handlers::clear_session),
        )
        .route("/network", put(handlers::set_network))
}

pub fn governance_routes() -> Router<AppState> {
    Router::new()
        .route("/config", get(handlers::get_governance_config))
        .route("/powers", get(handlers::get_powers))
        .route("/powers/refresh", post(handlers::refresh_powers))
        .route("/delegate", post(handlers::delegate))
        .route("/delegate-by-type", post(handlers::delegate_by_type))
        .route("/delegate-signature", post(handlers::prepare_delegate_signature))
        .route(
            "/delegate-by-type-signature",
            post(handlers::prepare_delegate_by_type_signature),
        )
        .route("/delegate-by-sig", post(handlers::delegate_tokens_by_sig))
        .route(
            "/delegate-by-type-by-sig",
            post(handlers::delegate_tokens_by_type_by_sig),
        )
        .route("/votes", post(handlers::submit_vote))
        .route("/votes/{proposal_id}/{voter}", get(handlers::get_vote_on_proposal))
        .route("/voting-power", get(handlers::get_voting_power_at))
        .route("/nonce", get(handlers::get_token_nonce))
}

pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/api/health", health_routes())
        .nest("/api/session", session_routes())
        .nest("/api/governance", governance_routes())
}
