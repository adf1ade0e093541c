mod registry;

pub use registry::{RoomPolicy, RoomRegistry};
