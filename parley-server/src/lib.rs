mod relay;
mod room;
mod ws;

pub use relay::RelayServer;
pub use room::{RoomPolicy, RoomRegistry};
pub use ws::router;
