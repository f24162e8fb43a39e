//! Custom error types for umivar operations.

use thiserror::Error;

/// Result type alias for umivar operations
pub type Result<T> = std::result::Result<T, UmivarError>;

/// Error type for umivar operations
#[derive(Error, Debug)]
pub enum UmivarError {
    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// Two references in the panel share a sequence or a name
    #[error("Duplicate reference '{name}': {reason}")]
    DuplicateReference {
        /// Name of the offending reference
        name: String,
        /// Explanation of the collision
        reason: String,
    },

    /// The reference panel contains no sequences
    #[error("Reference library is empty")]
    EmptyLibrary,

    /// No reference is long enough to index
    #[error("All {count} reference sequences are shorter than k = {k}; index would be empty")]
    ReferencesTooShort {
        /// Number of references in the library
        count: usize,
        /// The k-mer size requested
        k: usize,
    },

    /// Input record malformed (bad base, length mismatch, missing tag)
    #[error("Invalid {record_type} record '{name}': {reason}")]
    InvalidRecord {
        /// Kind of record (e.g. "FASTA", "FASTQ", "read")
        record_type: String,
        /// Identifier of the offending record
        name: String,
        /// Explanation of the problem
        reason: String,
    },

    /// A requested operation is not supported for this input layout
    #[error("Capability not supported: {capability}")]
    CapabilityNotSupported {
        /// Description of the unsupported capability
        capability: String,
    },

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
