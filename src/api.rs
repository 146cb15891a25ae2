use rocket::{http::Status, response::status::Custom, serde::json::Json, Catcher, Request, Route};

use crate::error::ErrorBody;

mod auth;
mod election;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(election::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![default_catcher]
}

/// Turn every error Rocket raises on its own (failed guards, bad bodies,
/// unknown routes) into a JSON error body. Bodies that parse as JSON but do
/// not fit the request type are reported as 400 like any other bad body.
#[catch(default)]
fn default_catcher(status: Status, _req: &Request<'_>) -> Custom<Json<ErrorBody>> {
    let status = if status == Status::UnprocessableEntity {
        Status::BadRequest
    } else {
        status
    };
    let message = match status.code {
        400 => "Invalid request body",
        401 => "Authentication required",
        404 => "Not found",
        code if code >= 500 => "Internal server error",
        _ => status.reason().unwrap_or("Request failed"),
    };
    Custom(status, Json(ErrorBody::new(message)))
}
