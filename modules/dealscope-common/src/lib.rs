pub mod analysis;
pub mod config;
pub mod entities;
pub mod error;
pub mod events;
pub mod insights;

pub use analysis::*;
pub use config::{Config, GraphBackendKind};
pub use entities::*;
pub use error::DealScopeError;
pub use events::*;
pub use insights::*;
