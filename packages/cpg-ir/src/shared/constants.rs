//! Centralized configuration constants.
//!
//! Tunable parameters with no natural home in `Config` (spec §6): internal
//! sizing hints and thread-pool defaults, not user-facing settings.

/// Thread pool configuration (Populator/Synchronizer, spec §5).
pub mod thread_pool {
    /// Percentage of available CPU cores to use for the rayon thread pool,
    /// leaving the remainder for OS and other tasks.
    pub const CPU_UTILIZATION_PERCENT: f64 = 0.75;

    /// Minimum number of threads (always use at least 1).
    pub const MIN_THREADS: usize = 1;
}

/// Hash generation configuration.
pub mod hashing {
    /// Length of truncated hash strings used for the `content_hash` id
    /// strategy (spec §4.1).
    pub const HASH_LENGTH: usize = 32;
}

/// Graph construction sizing hints.
pub mod ir_builder {
    /// Initial capacity for node vectors (typical function has tens to a
    /// few hundred nodes).
    pub const INITIAL_NODE_CAPACITY: usize = 64;

    /// Initial capacity for edge vectors.
    pub const INITIAL_EDGE_CAPACITY: usize = 128;

    /// Initial capacity for scope stack (max nesting depth in typical code).
    pub const INITIAL_SCOPE_CAPACITY: usize = 16;
}

/// Populator batch processing (spec §4.7).
pub mod pipeline {
    /// Default per-file analysis timeout in seconds, used when
    /// `Config::analysis_timeout` is not overridden.
    pub const DEFAULT_FILE_TIMEOUT_SECS: u64 = 30;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_utilization() {
        let num_cpus = num_cpus::get();
        let threads = std::cmp::max(
            thread_pool::MIN_THREADS,
            (num_cpus as f64 * thread_pool::CPU_UTILIZATION_PERCENT) as usize,
        );
        assert!(threads >= 1);
        assert!(threads <= num_cpus);
    }
}
