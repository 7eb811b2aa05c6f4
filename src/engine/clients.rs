use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::actor::Actor;
use crate::models::client::Client;
use crate::models::courier::AccountStatus;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct NewClient {
    pub name: String,
    pub phone: String,
}

pub fn register(state: &AppState, request: NewClient) -> Result<Client, AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    if request.phone.trim().is_empty() {
        return Err(AppError::Validation("phone cannot be empty".to_string()));
    }

    let client = Client {
        id: Uuid::new_v4(),
        name: request.name.trim().to_string(),
        phone: request.phone.trim().to_string(),
        account_status: AccountStatus::Active,
        rating: 0.0,
        total_ratings: 0,
        created_at: state.clock.now(),
    };

    state.clients.insert(client.id, client.clone());
    info!(client_id = %client.id, "client registered");
    Ok(client)
}

pub fn get(state: &AppState, client_id: Uuid, actor: &Actor) -> Result<Client, AppError> {
    if !actor.is_admin() && !actor.is_client(client_id) {
        return Err(AppError::Unauthorized(format!(
            "{} {} cannot view client {client_id}",
            actor.role, actor.id
        )));
    }

    state
        .clients
        .get(&client_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("client {client_id} not found")))
}

/// Admin-only. A client that is not active cannot place orders.
pub fn set_account_status(
    state: &AppState,
    client_id: Uuid,
    actor: &Actor,
    status: AccountStatus,
) -> Result<Client, AppError> {
    actor.require_admin()?;

    let mut client = state
        .clients
        .get_mut(&client_id)
        .ok_or_else(|| AppError::NotFound(format!("client {client_id} not found")))?;

    client.account_status = status;
    info!(client_id = %client_id, account_status = ?status, "client account status changed");

    Ok(client.clone())
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::set_account_status;
    use crate::engine::fixtures::{new_order, Fixture};
    use crate::engine::lifecycle;
    use crate::error::AppError;
    use crate::models::courier::AccountStatus;
    use crate::models::order::PaymentMethod;

    #[test]
    fn suspended_client_cannot_place_orders() {
        let fixture = Fixture::new();
        let client = fixture.client();

        let updated =
            set_account_status(&fixture.state, client.id, &fixture.admin, AccountStatus::Suspended)
                .unwrap();
        assert_eq!(updated.account_status, AccountStatus::Suspended);

        let result =
            lifecycle::create_order(&fixture.state, &client, new_order(PaymentMethod::Cash));
        assert!(matches!(result, Err(AppError::Unauthorized(_))));

        set_account_status(&fixture.state, client.id, &fixture.admin, AccountStatus::Active)
            .unwrap();
        assert!(
            lifecycle::create_order(&fixture.state, &client, new_order(PaymentMethod::Cash))
                .is_ok()
        );
    }

    #[test]
    fn only_admins_change_client_status() {
        let fixture = Fixture::new();
        let client = fixture.client();

        let result = set_account_status(&fixture.state, client.id, &client, AccountStatus::Inactive);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));

        let result = set_account_status(
            &fixture.state,
            Uuid::new_v4(),
            &fixture.admin,
            AccountStatus::Inactive,
        );
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
