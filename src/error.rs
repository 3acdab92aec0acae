use std::path::PathBuf;

use thiserror::Error;

/// Conditions that stop a run before any case executes.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("could not find dumpasn1/dumpcbor binaries (searched {})", display_paths(.searched))]
    BinariesNotFound { searched: Vec<PathBuf> },
    #[error("--asn1-bin and --cbor-bin must be given together")]
    IncompleteOverride,
    #[error("no fixture encoder is available for either format")]
    NoCapabilities,
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
