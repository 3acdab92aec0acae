//! Conformance harness for the `dumpasn1` and `dumpcbor` decoders.
//!
//! Fixtures are produced by reference encoders, fed to the decoder binaries
//! one file at a time, and the printed decoding is checked for expected
//! substrings.

pub mod assertion;
pub mod cases;
pub mod error;
pub mod fixture;
pub mod format;
pub mod harness;
pub mod locate;
pub mod report;
pub mod runner;

pub use error::HarnessError;
pub use format::{Capabilities, Format};
