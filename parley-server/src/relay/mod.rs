mod relay;

pub use relay::RelayServer;
