pub mod bus;
pub mod store;

pub use bus::{BusConfig, OverflowPolicy};
pub use store::StoreConfig;
