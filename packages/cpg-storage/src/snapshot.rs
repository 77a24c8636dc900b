//! Optional repository snapshotting (spec §6 "Persistence").
//!
//! Format is deliberately the simplest thing that satisfies the spec's one
//! required property — round-trip equality of queryable fields: a
//! `RepositorySnapshot` is just every stored `Module` (primary record,
//! including raw AST). Indexes and cached CFG/DFG/CPG are derived state;
//! re-importing replays `put_module` for each module, which rebuilds the
//! indexes exactly as a live upsert would and leaves the graph cache cold
//! (graphs are lazy by construction, so nothing is lost by not persisting
//! them).

use serde::{Deserialize, Serialize};

use cpg_ir::shared::models::Module;

use crate::domain::CpgRepository;
use crate::error::Result;
use crate::repository::InMemoryRepository;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    pub modules: Vec<Module>,
}

impl InMemoryRepository {
    /// Captures every stored module. Cheap relative to re-deriving indexes:
    /// the snapshot holds primary records only.
    pub fn export_snapshot(&self) -> RepositorySnapshot {
        RepositorySnapshot { modules: self.modules_snapshot() }
    }

    /// Replays `put_module` for every module in the snapshot, rebuilding
    /// indexes as it goes. Does not clear modules absent from the snapshot
    /// but present in `self` — callers that want a clean restore should
    /// start from a fresh `InMemoryRepository`.
    pub async fn import_snapshot(&self, snapshot: RepositorySnapshot) -> Result<()> {
        for module in snapshot.modules {
            CpgRepository::put_module(self, module).await?;
        }
        Ok(())
    }
}
