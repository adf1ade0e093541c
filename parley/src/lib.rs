pub use parley_core::ConnectionId;

pub mod model {
    pub use parley_core::model::*;
}

pub mod error {
    pub use parley_core::error::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use parley_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use parley_client::*;
}
