use rocket::{http::Status, response::status::Custom, serde::json::Json, Route, State};

use crate::error::Result;
use crate::model::{
    api::{LoginRequest, LoginResponse, MessageResponse, RegisterRequest},
    auth::BearerToken,
    User,
};
use crate::store::{CredentialStore, SessionStore, Store};

pub fn routes() -> Vec<Route> {
    routes![register, login, logout]
}

#[post("/register", data = "<registration>")]
pub fn register(
    registration: Json<RegisterRequest>,
    store: &State<Store>,
) -> Result<Custom<Json<User>>> {
    let user = store.create_user(
        &registration.username,
        &registration.email,
        &registration.password,
    )?;
    Ok(Custom(Status::Created, Json(user)))
}

#[post("/login", data = "<credentials>")]
pub fn login(credentials: Json<LoginRequest>, store: &State<Store>) -> Result<Json<LoginResponse>> {
    let user = store.authenticate(&credentials.username, &credentials.password)?;
    let token = store.issue_token(user.id)?;
    Ok(Json(LoginResponse { token, user }))
}

/// Always succeeds for a well-formed header, even if the session is
/// already gone.
#[post("/logout")]
pub fn logout(token: BearerToken, store: &State<Store>) -> Json<MessageResponse> {
    store.revoke_token(&token);
    Json(MessageResponse::new("Successfully logged out"))
}
