use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::actor::Actor;
use crate::models::event::{OrderEvent, OrderEventKind};
use crate::models::order::OrderStatus;
use crate::models::rating::{RaterRole, Rating};
use crate::state::AppState;

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;
const MAX_REVIEW_CHARS: usize = 1000;

#[derive(Debug, Clone, Deserialize)]
pub struct RatingRequest {
    pub score: u8,
    #[serde(default)]
    pub review: Option<String>,
}

/// Incremental mean after adding one more score.
pub fn running_average(old_average: f64, total_ratings: u32, score: u8) -> f64 {
    old_average + (f64::from(score) - old_average) / (f64::from(total_ratings) + 1.0)
}

/// Records one rating for a delivered order and folds it into the rated
/// party's average. Each side may rate an order once.
pub fn record_rating(
    state: &AppState,
    order_id: Uuid,
    actor: &Actor,
    rater_role: RaterRole,
    request: RatingRequest,
) -> Result<Rating, AppError> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&request.score) {
        return Err(AppError::Validation(format!(
            "score must be between {MIN_SCORE} and {MAX_SCORE}"
        )));
    }
    let review = request
        .review
        .map(|review| review.trim().to_string())
        .filter(|review| !review.is_empty());
    if review
        .as_ref()
        .is_some_and(|review| review.chars().count() > MAX_REVIEW_CHARS)
    {
        return Err(AppError::Validation(format!(
            "review cannot exceed {MAX_REVIEW_CHARS} characters"
        )));
    }

    let (rating, event) = {
        let mut order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        if order.status != OrderStatus::Delivered {
            return Err(AppError::NotRateable {
                order_id,
                status: order.status,
            });
        }

        let courier_id = order.courier_id.ok_or_else(|| {
            AppError::Storage(format!("delivered order {order_id} has no courier"))
        })?;

        let (rater_id, rated_id, already_rated) = match rater_role {
            RaterRole::Client => (order.client_id, courier_id, order.courier_rating.is_some()),
            RaterRole::Courier => (courier_id, order.client_id, order.client_rating.is_some()),
        };

        let authorized = match rater_role {
            RaterRole::Client => actor.is_client(rater_id),
            RaterRole::Courier => actor.is_courier(rater_id),
        };
        if !authorized {
            return Err(AppError::Unauthorized(format!(
                "{} {} did not take part in order {order_id} as its {rater_role}",
                actor.role, actor.id
            )));
        }

        if already_rated {
            return Err(AppError::DuplicateRating {
                order_id,
                rater: rater_role,
            });
        }

        match rater_role {
            RaterRole::Client => {
                let mut courier = state.couriers.get_mut(&rated_id).ok_or_else(|| {
                    AppError::Storage(format!("rated courier {rated_id} is missing"))
                })?;
                courier.rating =
                    running_average(courier.rating, courier.total_ratings, request.score);
                courier.total_ratings = courier.total_ratings.saturating_add(1);
                order.courier_rating = Some(request.score);
            }
            RaterRole::Courier => {
                let mut client = state.clients.get_mut(&rated_id).ok_or_else(|| {
                    AppError::Storage(format!("rated client {rated_id} is missing"))
                })?;
                client.rating =
                    running_average(client.rating, client.total_ratings, request.score);
                client.total_ratings = client.total_ratings.saturating_add(1);
                order.client_rating = Some(request.score);
            }
        }

        let now = state.clock.now();
        let rating = Rating {
            id: Uuid::new_v4(),
            order_id,
            rater_id,
            rated_id,
            rater_role,
            score: request.score,
            review,
            created_at: now,
        };
        let event = OrderEvent::for_order(
            &order,
            Some(courier_id),
            OrderEventKind::Rated {
                rater_role,
                score: request.score,
            },
            now,
        );
        (rating, event)
    };

    state.ratings.insert(rating.id, rating.clone());
    state
        .metrics
        .ratings_total
        .with_label_values(&[rater_role.rated_label()])
        .inc();

    info!(
        order_id = %order_id,
        rated_id = %rating.rated_id,
        rater_role = %rater_role,
        score = rating.score,
        "rating recorded"
    );
    state.publish(event);

    Ok(rating)
}

pub fn ratings_for_order(state: &AppState, order_id: Uuid) -> Vec<Rating> {
    let mut ratings: Vec<Rating> = state
        .ratings
        .iter()
        .filter(|entry| entry.order_id == order_id)
        .map(|entry| entry.value().clone())
        .collect();
    ratings.sort_by_key(|rating| rating.created_at);
    ratings
}
