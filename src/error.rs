use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::order::OrderStatus;
use crate::models::rating::RaterRole;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("illegal transition from {from} to {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    #[error("order {order_id} cannot be rated while {status}")]
    NotRateable { order_id: Uuid, status: OrderStatus },

    #[error("order {0} is already assigned")]
    OrderAlreadyAssigned(Uuid),

    #[error("courier {0} is unavailable")]
    CourierUnavailable(Uuid),

    #[error("payment for order {0} is not confirmed")]
    PaymentPending(Uuid),

    #[error("order {order_id} was already rated by its {rater}")]
    DuplicateRating { order_id: Uuid, rater: RaterRole },

    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: f64, available: f64 },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code exposed to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidCoordinate(_) => "invalid_coordinate",
            AppError::Validation(_) => "validation",
            AppError::IllegalTransition { .. } | AppError::NotRateable { .. } => {
                "illegal_transition"
            }
            AppError::OrderAlreadyAssigned(_) => "order_already_assigned",
            AppError::CourierUnavailable(_) => "courier_unavailable",
            AppError::PaymentPending(_) => "payment_pending",
            AppError::DuplicateRating { .. } => "duplicate_rating",
            AppError::InsufficientBalance { .. } => "insufficient_balance",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Storage(_) => "storage_error",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidCoordinate(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::IllegalTransition { .. }
            | AppError::NotRateable { .. }
            | AppError::OrderAlreadyAssigned(_)
            | AppError::CourierUnavailable(_)
            | AppError::PaymentPending(_)
            | AppError::DuplicateRating { .. } => StatusCode::CONFLICT,
            AppError::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Faults are failures the caller could not have caused; everything else
    /// is an ordinary rejected request.
    pub fn is_fault(&self) -> bool {
        matches!(self, AppError::Storage(_) | AppError::Internal(_))
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_fault() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "request rejected");
        }

        let body = Json(json!({
            "error": self.body()
        }));

        (self.status_code(), body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}
