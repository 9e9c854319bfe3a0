pub mod adapters;
pub mod config;
pub mod document;
pub mod error;
pub mod factory;
pub mod partition;
pub mod traits;
pub mod types;

pub use adapters::*;
pub use config::*;
pub use document::*;
pub use error::*;
pub use factory::*;
pub use partition::*;
pub use traits::*;
pub use types::*;
