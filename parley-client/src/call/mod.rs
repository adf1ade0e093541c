mod coordinator;
mod manager;

pub use coordinator::{CallCommand, CallHandle, CoordinatorConfig, NegotiationCoordinator};
pub use manager::PeerConnectionManager;
