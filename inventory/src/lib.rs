#![forbid(unsafe_code)]

mod config;
mod error;
mod inventory;
#[cfg(feature = "pg")]
mod pool;

pub mod wire;

pub use config::*;
pub use error::*;
pub use inventory::*;
#[cfg(feature = "pg")]
pub use pool::*;

pub use inventory_migrator as migrator;
pub use inventory_store as store;
