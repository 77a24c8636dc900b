//! Repository (spec §4.6): the durable in-memory store of CPG engine
//! output — modules, functions, and their lazily-built CFG/DFG/CPG graphs —
//! plus the inverted indexes and memory-bounded cache spec §3/§4.6 describe.
//!
//! `cpg-ir` depends on nothing in this crate; this crate depends on
//! `cpg-ir` and bridges into it by implementing `cpg_ir::shared::ports::RepositoryPort`,
//! so the Populator and Synchronizer in `cpg-ir` can drive an
//! `InMemoryRepository` without knowing it exists.

pub mod cache;
pub mod domain;
pub mod error;
pub mod repository;
pub mod snapshot;

pub use domain::{CallReference, CpgRepository, FunctionFilter, RepositoryStats};
pub use error::{ErrorKind, Result, StorageError};
pub use repository::InMemoryRepository;
pub use snapshot::RepositorySnapshot;
