use garden_sync::{
    CapacityPurchaseFlow, GardenSession, InMemoryStore, PlacementController, SimulatedGateway,
};
use std::sync::Arc;

pub type Session = GardenSession<InMemoryStore>;

#[derive(Clone)]
pub struct AppState {
    pub controller: PlacementController<InMemoryStore>,
    pub purchases: CapacityPurchaseFlow<InMemoryStore, SimulatedGateway>,
}

impl AppState {
    pub fn new(session: Session, gateway: SimulatedGateway) -> Self {
        Self {
            purchases: CapacityPurchaseFlow::new(session.clone(), Arc::new(gateway)),
            controller: PlacementController::new(session),
        }
    }

    pub fn session(&self) -> &Session {
        self.controller.session()
    }
}
