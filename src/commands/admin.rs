use chrono::Utc;
use tracing::{info, warn};

use crate::auth::AdminContext;
use crate::error::AppError;
use crate::models::{AdminProfile, LoginRequest, LoginResponse};
use crate::state::AppState;

pub fn login(state: &AppState, credentials: LoginRequest) -> Result<LoginResponse, AppError> {
    let username = credentials.username.unwrap_or_default();
    let password = credentials.password.unwrap_or_default();

    if !state.admin.verify(&username, &password) {
        warn!("Rejected admin login for {username:?}");
        return Err(AppError::unauthorized("Invalid admin credentials"));
    }

    let session = state.sessions.create(state.admin.username(), Utc::now())?;
    info!("Admin {} signed in", session.username);

    Ok(LoginResponse {
        token: session.token,
        username: session.username,
    })
}

pub fn me(admin: &AdminContext) -> AdminProfile {
    AdminProfile {
        username: admin.username.clone(),
    }
}

pub fn logout(state: &AppState, admin: &AdminContext) -> Result<(), AppError> {
    state.sessions.revoke(&admin.token)?;
    info!("Admin {} signed out", admin.username);
    Ok(())
}
