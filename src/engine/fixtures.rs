use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;

use crate::clock::ManualClock;
use crate::config::Config;
use crate::engine::clients::{self, NewClient};
use crate::engine::couriers::{self, NewCourier};
use crate::engine::lifecycle::{self, NewOrder, Transition};
use crate::engine::{dispatch, payment};
use crate::models::actor::{Actor, Role};
use crate::models::courier::{GeoPoint, Vehicle, VehicleKind};
use crate::models::order::{Order, Package, PackageSize, PaymentMethod, Stop};
use crate::state::AppState;

pub const PICKUP: GeoPoint = GeoPoint {
    lat: 12.3714,
    lng: -1.5197,
};
pub const DROPOFF: GeoPoint = GeoPoint {
    lat: 12.3800,
    lng: -1.5100,
};

pub struct Fixture {
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    pub admin: Actor,
}

impl Fixture {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
        ));
        Self {
            state: AppState::with_clock(Config::default(), clock.clone()),
            clock,
            admin: Actor::new(Uuid::new_v4(), Role::Admin),
        }
    }

    pub fn tick(&self) {
        self.clock.advance(Duration::seconds(30));
    }

    pub fn client(&self) -> Actor {
        let client = clients::register(
            &self.state,
            NewClient {
                name: "Mariam".to_string(),
                phone: "+22675555555".to_string(),
            },
        )
        .unwrap();
        Actor::new(client.id, Role::Client)
    }

    /// An active, online courier parked at `location`.
    pub fn courier_at(&self, location: GeoPoint) -> Actor {
        let courier = couriers::register(
            &self.state,
            NewCourier {
                name: "Boureima".to_string(),
                phone: "+22676666666".to_string(),
                vehicle: Vehicle {
                    kind: VehicleKind::Motorcycle,
                    plate_number: None,
                },
                location: Some(location),
            },
        )
        .unwrap();
        let actor = Actor::new(courier.id, Role::Courier);
        couriers::set_availability(&self.state, courier.id, &actor, true).unwrap();
        actor
    }

    pub fn courier(&self) -> Actor {
        self.courier_at(PICKUP)
    }

    pub fn order(&self, client: &Actor, payment_method: PaymentMethod) -> Order {
        let order = lifecycle::create_order(&self.state, client, new_order(payment_method)).unwrap();
        self.tick();
        order
    }

    pub fn paid_order(&self, client: &Actor) -> Order {
        let order = self.order(client, PaymentMethod::MobileMoney);
        payment::record_payment(
            &self.state,
            order.id,
            &self.admin,
            payment::PaymentOutcome::Paid,
        )
        .unwrap()
    }

    pub fn assigned_order(&self) -> (Order, Actor, Actor) {
        let client = self.client();
        let courier = self.courier();
        let order = self.order(&client, PaymentMethod::Cash);
        let order = dispatch::assign(&self.state, order.id, courier.id, &courier).unwrap();
        self.tick();
        (order, client, courier)
    }

    pub fn delivered_order(&self) -> (Order, Actor, Actor) {
        let (order, client, courier) = self.assigned_order();
        lifecycle::apply_transition(&self.state, order.id, &courier, Transition::PickUp).unwrap();
        self.tick();
        let order =
            lifecycle::apply_transition(&self.state, order.id, &courier, Transition::Deliver)
                .unwrap();
        self.tick();
        (order, client, courier)
    }
}

pub fn new_order(payment_method: PaymentMethod) -> NewOrder {
    NewOrder {
        pickup: Stop {
            location: PICKUP,
            address: "Avenue Kwame Nkrumah, Ouagadougou".to_string(),
            contact_name: Some("Mariam".to_string()),
            contact_phone: None,
        },
        dropoff: Stop {
            location: DROPOFF,
            address: "Rue 15.23, Koulouba".to_string(),
            contact_name: None,
            contact_phone: Some("+22670101010".to_string()),
        },
        package: Package {
            description: "documents".to_string(),
            size: PackageSize::Small,
            weight_kg: Some(0.5),
            fragile: false,
        },
        payment_method,
        notes: None,
    }
}
