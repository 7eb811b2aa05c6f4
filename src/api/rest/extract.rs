use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::actor::{Actor, Role};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// JSON body whose rejections render as `AppError::Validation`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct Path<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct Query<T>(pub T);

/// Identity is asserted by the gateway in front of this service.
#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(parts, ACTOR_ID_HEADER)?
            .parse::<Uuid>()
            .map_err(|_| AppError::Unauthorized(format!("malformed {ACTOR_ID_HEADER} header")))?;
        let role = header(parts, ACTOR_ROLE_HEADER)?.parse::<Role>()?;

        Ok(Actor::new(id, role))
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, AppError> {
    parts
        .headers
        .get(name)
        .ok_or_else(|| AppError::Unauthorized(format!("missing {name} header")))?
        .to_str()
        .map_err(|_| AppError::Unauthorized(format!("malformed {name} header")))
}
