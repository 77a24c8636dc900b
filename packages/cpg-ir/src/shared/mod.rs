//! Shared module — data model, utilities, and ports common to every feature.
//!
//! Has no dependency on `features::*`; `features::*` depends on `shared::*`,
//! never the other way around.

#[macro_use]
pub mod macros;
pub mod constants;
pub mod models;
pub mod ports;
pub mod utils;

pub use models::*;
pub use utils::block_on::block_on;
pub use utils::id_generator::{content_hash, IdGenerator};
pub use utils::scope_stack::ScopeStack;
