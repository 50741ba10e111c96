use crate::{
    error::ShieldError,
    handlers::AppState,
    models::{User, UserCreate},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

/// Registers a user, or returns the one already holding this wallet.
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<UserCreate>, JsonRejection>,
) -> Result<Json<User>, ShieldError> {
    let Json(request) = payload.map_err(|e| ShieldError::InvalidRequest(e.body_text()))?;

    if let Some(existing) = state
        .store
        .users
        .find(|user| user.wallet_address == request.wallet_address)
        .await?
    {
        return Ok(Json(existing));
    }

    let user = state
        .store
        .users
        .insert(User::new(request.name, request.wallet_address))
        .await?;
    tracing::info!("Registered user {} ({})", user.id, user.wallet_address);

    Ok(Json(user))
}
