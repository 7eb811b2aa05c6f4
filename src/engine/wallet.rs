use tracing::info;
use uuid::Uuid;

use crate::engine::pricing::round_2;
use crate::error::AppError;
use crate::models::actor::Actor;
use crate::models::withdrawal::{Withdrawal, WithdrawalStatus};
use crate::state::AppState;

/// Debits the wallet straight away so the same balance cannot be withdrawn
/// twice while a request waits for review.
pub fn request_withdrawal(
    state: &AppState,
    courier_id: Uuid,
    actor: &Actor,
    amount: f64,
) -> Result<Withdrawal, AppError> {
    if !actor.is_courier(courier_id) {
        return Err(AppError::Unauthorized(format!(
            "{} {} cannot withdraw for courier {courier_id}",
            actor.role, actor.id
        )));
    }
    if !amount.is_finite() || amount <= 0.0 {
        return Err(AppError::Validation(
            "withdrawal amount must be > 0".to_string(),
        ));
    }
    let amount = round_2(amount);
    let now = state.clock.now();

    {
        let mut courier = state
            .couriers
            .get_mut(&courier_id)
            .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?;

        if amount > courier.wallet_balance {
            return Err(AppError::InsufficientBalance {
                requested: amount,
                available: courier.wallet_balance,
            });
        }
        courier.wallet_balance = round_2(courier.wallet_balance - amount);
        courier.updated_at = now;
    }

    let withdrawal = Withdrawal {
        id: Uuid::new_v4(),
        courier_id,
        amount,
        status: WithdrawalStatus::Pending,
        requested_at: now,
        resolved_at: None,
    };
    state.withdrawals.insert(withdrawal.id, withdrawal.clone());

    info!(
        withdrawal_id = %withdrawal.id,
        courier_id = %courier_id,
        amount,
        "withdrawal requested"
    );
    Ok(withdrawal)
}

/// Admin decision on a pending withdrawal; a rejection re-credits the wallet.
pub fn resolve_withdrawal(
    state: &AppState,
    withdrawal_id: Uuid,
    actor: &Actor,
    approve: bool,
) -> Result<Withdrawal, AppError> {
    actor.require_admin()?;

    let mut withdrawal = state
        .withdrawals
        .get_mut(&withdrawal_id)
        .ok_or_else(|| AppError::NotFound(format!("withdrawal {withdrawal_id} not found")))?;

    if withdrawal.status != WithdrawalStatus::Pending {
        return Err(AppError::Validation(format!(
            "withdrawal {withdrawal_id} is already resolved"
        )));
    }

    let now = state.clock.now();
    if !approve {
        let mut courier = state.couriers.get_mut(&withdrawal.courier_id).ok_or_else(|| {
            AppError::Storage(format!(
                "courier {} for withdrawal {withdrawal_id} is missing",
                withdrawal.courier_id
            ))
        })?;
        courier.wallet_balance = round_2(courier.wallet_balance + withdrawal.amount);
        courier.updated_at = now;
    }

    withdrawal.status = if approve {
        WithdrawalStatus::Approved
    } else {
        WithdrawalStatus::Rejected
    };
    withdrawal.resolved_at = Some(now);

    info!(
        withdrawal_id = %withdrawal_id,
        courier_id = %withdrawal.courier_id,
        approved = approve,
        "withdrawal resolved"
    );
    Ok(withdrawal.clone())
}

pub fn list_withdrawals(
    state: &AppState,
    courier_id: Uuid,
    actor: &Actor,
) -> Result<Vec<Withdrawal>, AppError> {
    if !actor.is_admin() && !actor.is_courier(courier_id) {
        return Err(AppError::Unauthorized(format!(
            "{} {} cannot view withdrawals of courier {courier_id}",
            actor.role, actor.id
        )));
    }

    let mut withdrawals: Vec<Withdrawal> = state
        .withdrawals
        .iter()
        .filter(|entry| entry.courier_id == courier_id)
        .map(|entry| entry.value().clone())
        .collect();
    withdrawals.sort_by_key(|withdrawal| withdrawal.requested_at);
    Ok(withdrawals)
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{request_withdrawal, resolve_withdrawal};
    use crate::config::Config;
    use crate::engine::couriers::{self, NewCourier};
    use crate::error::AppError;
    use crate::models::actor::{Actor, Role};
    use crate::models::courier::{Vehicle, VehicleKind};
    use crate::models::withdrawal::WithdrawalStatus;
    use crate::state::AppState;

    fn courier_with_balance(state: &AppState, balance: f64) -> Uuid {
        let courier = couriers::register(
            state,
            NewCourier {
                name: "Issa".to_string(),
                phone: "+22671111111".to_string(),
                vehicle: Vehicle {
                    kind: VehicleKind::Bicycle,
                    plate_number: None,
                },
                location: None,
            },
        )
        .unwrap();
        state.couriers.get_mut(&courier.id).unwrap().wallet_balance = balance;
        courier.id
    }

    #[test]
    fn withdrawal_debits_and_rejection_recredits() {
        let state = AppState::new(Config::default());
        let courier_id = courier_with_balance(&state, 1000.0);
        let me = Actor::new(courier_id, Role::Courier);
        let admin = Actor::new(Uuid::new_v4(), Role::Admin);

        let withdrawal = request_withdrawal(&state, courier_id, &me, 600.0).unwrap();
        assert_eq!(withdrawal.status, WithdrawalStatus::Pending);
        assert_eq!(state.couriers.get(&courier_id).unwrap().wallet_balance, 400.0);

        let rejected = resolve_withdrawal(&state, withdrawal.id, &admin, false).unwrap();
        assert_eq!(rejected.status, WithdrawalStatus::Rejected);
        assert_eq!(state.couriers.get(&courier_id).unwrap().wallet_balance, 1000.0);

        let again = resolve_withdrawal(&state, withdrawal.id, &admin, true);
        assert!(matches!(again, Err(AppError::Validation(_))));
    }

    #[test]
    fn cannot_withdraw_more_than_balance() {
        let state = AppState::new(Config::default());
        let courier_id = courier_with_balance(&state, 100.0);
        let me = Actor::new(courier_id, Role::Courier);

        let result = request_withdrawal(&state, courier_id, &me, 100.01);
        assert!(matches!(result, Err(AppError::InsufficientBalance { .. })));

        let result = request_withdrawal(&state, courier_id, &me, 0.0);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
