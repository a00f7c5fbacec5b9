use super::error::*;
use crate::application_port::*;
use crate::domain_model::Identity;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::{self, reject};

const TOKEN_TYPE: &str = "Bearer";

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthorizeRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthorizeResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expire_in: i64,
    pub refresh_expire_in: i64,
    pub token_type: &'static str,
}

pub async fn authorize(
    body: AuthorizeRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let authorization = auth_service
        .authorize(&body.username, &body.password)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let response = AuthorizeResponse {
        access_token: authorization.tokens.access.value,
        refresh_token: authorization.tokens.refresh.value,
        expire_in: authorization.expire_in.access,
        refresh_expire_in: authorization.expire_in.refresh,
        token_type: TOKEN_TYPE,
    };
    Ok(warp::reply::json(&ApiResponse::ok(response)))
}

#[derive(Debug, Deserialize)]
pub struct AccessTokenRequest {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub user: Identity,
    pub expire_in: i64,
}

pub async fn verify(
    body: AccessTokenRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let verification = auth_service
        .verify(&body.access_token)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let response = VerifyResponse {
        user: verification.identity,
        expire_in: verification.expire_in,
    };
    Ok(warp::reply::json(&ApiResponse::ok(response)))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the new refresh token, not of the access token.
    pub expire_in: i64,
    pub token_type: &'static str,
}

pub async fn refresh(
    body: RefreshRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let refreshed = auth_service
        .refresh(&body.refresh_token)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let response = RefreshResponse {
        access_token: refreshed.tokens.access.value,
        refresh_token: refreshed.tokens.refresh.value,
        expire_in: refreshed.expire_in,
        token_type: TOKEN_TYPE,
    };
    Ok(warp::reply::json(&ApiResponse::ok(response)))
}

#[derive(Debug, Serialize)]
pub struct DeauthorizeResponse {
    pub result: bool,
}

pub async fn deauthorize(
    body: AccessTokenRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = auth_service
        .deauthorize(&body.access_token)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(DeauthorizeResponse { result })))
}
