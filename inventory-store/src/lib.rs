#![forbid(unsafe_code)]

mod arn;
pub mod binding;
mod engine;
mod error;
mod ingest;
mod ip;
mod legacy;
mod lookup;
mod model;
mod partition;
mod store;

pub use arn::*;
pub use engine::*;
pub use error::*;
pub use ingest::*;
pub use ip::*;
pub use legacy::*;
pub use lookup::*;
pub use model::*;
pub use partition::*;
pub use store::*;
