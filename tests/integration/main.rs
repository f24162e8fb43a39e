//! Integration tests for the umivar binary.
//!
//! These tests run the compiled executable end to end on real files,
//! validating the command-line surface and the written outputs.

mod helpers;
mod test_call_command;
mod test_consensus_command;
