use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (code, message) = if let Some(err) = err.find::<ApiErrorCode>() {
        (err.clone(), err.to_string())
    } else if err.is_not_found() {
        (ApiErrorCode::NotFound, ApiErrorCode::NotFound.to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (ApiErrorCode::BadRequest, e.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (ApiErrorCode::MethodNotAllowed, ApiErrorCode::MethodNotAllowed.to_string())
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (ApiErrorCode::BadRequest, "expected a JSON body".to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some()
        || err.find::<warp::reject::LengthRequired>().is_some()
    {
        (ApiErrorCode::BadRequest, "request body missing or too large".to_string())
    } else {
        warn!("Unhandled rejection: {:?}", err);
        (ApiErrorCode::InternalError, format!("Unhandled error: {:?}", err))
    };

    let status = code.status();
    let json = warp::reply::json(&ApiResponse::<()>::err(code, message));
    Ok(warp::reply::with_status(json, status))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Invalid credentials or token")]
    Unauthorized,
    #[error("Token signing algorithm is not allowed")]
    Forbidden,
    #[error("Token is not processable")]
    UnprocessableEntity,
    #[error("Token is expired")]
    Expired,
    #[error("Malformed request")]
    BadRequest,
    #[error("Not found")]
    NotFound,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::Unauthorized | ApiErrorCode::Expired => StatusCode::UNAUTHORIZED,
            ApiErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ApiErrorCode::UnprocessableEntity => StatusCode::UNPROCESSABLE_ENTITY,
            ApiErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error.kind() {
            ErrorKind::Unauthorized => ApiErrorCode::Unauthorized,
            ErrorKind::Forbidden => ApiErrorCode::Forbidden,
            ErrorKind::UnprocessableEntity => ApiErrorCode::UnprocessableEntity,
            ErrorKind::Expired => ApiErrorCode::Expired,
            ErrorKind::Internal => {
                warn!("Internal error: {}", error);
                ApiErrorCode::InternalError
            }
        }
    }
}
