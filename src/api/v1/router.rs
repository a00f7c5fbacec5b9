use super::handler;
use crate::application_port::AuthService;
use std::convert::Infallible;
use std::sync::Arc;
use warp::Filter;

/// Largest accepted request body; tokens and credentials are well below this.
const MAX_BODY_BYTES: u64 = 16 * 1024;

pub fn routes(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let authorize = warp::post()
        .and(warp::path("authorize"))
        .and(warp::path::end())
        .and(json_body())
        .and(with(auth_service.clone()))
        .and_then(handler::authorize);

    let verify = warp::post()
        .and(warp::path("verify"))
        .and(warp::path::end())
        .and(json_body())
        .and(with(auth_service.clone()))
        .and_then(handler::verify);

    let refresh = warp::post()
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(json_body())
        .and(with(auth_service.clone()))
        .and_then(handler::refresh);

    let deauthorize = warp::post()
        .and(warp::path("deauthorize"))
        .and(warp::path::end())
        .and(json_body())
        .and(with(auth_service))
        .and_then(handler::deauthorize);

    authorize.or(verify).or(refresh).or(deauthorize)
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}
