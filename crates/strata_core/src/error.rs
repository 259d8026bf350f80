//! # Error Types
//!
//! Every error that can cross a STRATA API boundary.
//!
//! Only [`StrataError::Configuration`] (and the loader wrappers) is fatal.
//! The rest are transient and recovered locally: busy neighbourhoods are
//! retried, cancelled phases are re-queued, missing components are dropped.

use thiserror::Error;

/// Errors that can occur in world generation and simulation.
#[derive(Error, Debug)]
pub enum StrataError {
    /// Invalid generation or simulation config.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Chunk coordinate beyond the representable range.
    #[error("chunk coordinate ({cx}, {cz}) is out of range")]
    CoordinateOutOfRange {
        /// Chunk X.
        cx: i32,
        /// Chunk Z.
        cz: i32,
    },

    /// The 3x3 neighbourhood is claimed by another worker.
    #[error("neighbourhood of chunk ({cx}, {cz}) is busy")]
    NeighbourhoodBusy {
        /// Chunk X.
        cx: i32,
        /// Chunk Z.
        cz: i32,
    },

    /// Shutdown was requested before a phase completed.
    #[error("generation of chunk ({cx}, {cz}) cancelled before phase {phase}")]
    CancelRequested {
        /// Chunk X.
        cx: i32,
        /// Chunk Z.
        cz: i32,
        /// Name of the phase that did not run.
        phase: &'static str,
    },

    /// An event targeted a cell whose component was removed.
    #[error("no redstone component at ({x}, {y}, {z})")]
    ComponentMissing {
        /// World X.
        x: i32,
        /// World Y.
        y: i32,
        /// World Z.
        z: i32,
    },

    /// Config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for [`crate::WorldConfig`].
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl StrataError {
    /// Returns true for errors the caller should retry rather than report.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::NeighbourhoodBusy { .. } | Self::CancelRequested { .. } | Self::ComponentMissing { .. }
        )
    }
}

/// Result type for STRATA operations.
pub type StrataResult<T> = Result<T, StrataError>;
