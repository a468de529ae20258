pub mod settings;

use axum::http::StatusCode;
use loco_rs::Error;

use floorline_core::ErrorKind;

pub use settings::FloorlineSettings;

/// Maps the platform error taxonomy onto loco responses. The upstream
/// message rides along; handlers never build status codes by hand.
pub fn api_error(err: impl Into<floorline_core::Error>) -> Error {
    let err: floorline_core::Error = err.into();
    let message = err.to_string();
    match err.kind() {
        ErrorKind::Validation => Error::BadRequest(message),
        ErrorKind::Unauthenticated => Error::Unauthorized(message),
        ErrorKind::Forbidden => Error::CustomError(
            StatusCode::FORBIDDEN,
            loco_rs::controller::ErrorDetail::new("forbidden", &message),
        ),
        ErrorKind::NotFound => Error::NotFound,
        ErrorKind::Conflict => Error::CustomError(
            StatusCode::CONFLICT,
            loco_rs::controller::ErrorDetail::new("conflict", &message),
        ),
        ErrorKind::RateLimited => Error::CustomError(
            StatusCode::TOO_MANY_REQUESTS,
            loco_rs::controller::ErrorDetail::new("rate_limited", &message),
        ),
        ErrorKind::ExternalService => Error::CustomError(
            StatusCode::BAD_GATEWAY,
            loco_rs::controller::ErrorDetail::new("upstream", &message),
        ),
        ErrorKind::Database | ErrorKind::Internal => Error::InternalServerError,
    }
}
