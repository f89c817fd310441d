//! Session commands
use serde::Serialize;

use emporium_session::{LoginCredentials, SessionSnapshot};

use super::CommandResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub phase: String,
    pub is_authenticated: bool,
    pub loading: bool,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    /// Signed in through a refresh, identity not fetched yet
    pub needs_identity: bool,
}

impl From<SessionSnapshot> for SessionInfo {
    fn from(snapshot: SessionSnapshot) -> Self {
        let needs_identity = snapshot.needs_identity();
        Self {
            phase: snapshot.phase.as_str().to_string(),
            is_authenticated: snapshot.is_authenticated,
            loading: snapshot.loading,
            user_name: snapshot.user.as_ref().map(|u| u.display_name().to_string()),
            user_id: snapshot.user.map(|u| u.id),
            needs_identity,
        }
    }
}

pub fn session_status(state: &AppState) -> CommandResult<SessionInfo> {
    match state.console() {
        Ok(console) => CommandResult::ok(console.session().snapshot().into()),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

pub async fn check_session(state: &AppState) -> CommandResult<SessionInfo> {
    let console = match state.console() {
        Ok(console) => console,
        Err(e) => return CommandResult::err(e.to_string()),
    };

    console.session().check_session().await;
    CommandResult::ok(console.session().snapshot().into())
}

pub async fn login(state: &AppState, email: String, password: String) -> CommandResult<SessionInfo> {
    let console = match state.console() {
        Ok(console) => console,
        Err(e) => return CommandResult::err(e.to_string()),
    };

    let credentials = LoginCredentials::new(email, password);
    match console.session().login(&credentials).await {
        Ok(_) => CommandResult::ok(console.session().snapshot().into()),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

pub async fn logout(state: &AppState) -> CommandResult<SessionInfo> {
    let console = match state.console() {
        Ok(console) => console,
        Err(e) => return CommandResult::err(e.to_string()),
    };

    console.session().logout().await;
    CommandResult::ok(console.session().snapshot().into())
}
