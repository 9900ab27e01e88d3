pub mod control_client;

pub use control_client::ControlClient;
