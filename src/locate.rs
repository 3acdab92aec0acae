use std::path::{Path, PathBuf};

use crate::error::HarnessError;
use crate::format::Format;

pub const ASN1_BINARY: &str = "dumpasn1";
pub const CBOR_BINARY: &str = "dumpcbor";

/// Build output directories checked in order, relative to the search root.
const CANDIDATE_DIRS: [&str; 3] = ["target/release", "target/debug", "."];

/// Resolved decoder executables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binaries {
    pub asn1: PathBuf,
    pub cbor: PathBuf,
}

impl Binaries {
    pub fn for_format(&self, format: Format) -> &Path {
        match format {
            Format::Asn1 => &self.asn1,
            Format::Cbor => &self.cbor,
        }
    }
}

/// Find both decoders. Explicit paths win, then the build directories under
/// `root` in priority order, then `PATH`. A location is used only if both
/// binaries exist there.
pub fn locate(
    root: &Path,
    asn1_override: Option<PathBuf>,
    cbor_override: Option<PathBuf>,
) -> Result<Binaries, HarnessError> {
    let mut searched = Vec::new();
    match (asn1_override, cbor_override) {
        (Some(asn1), Some(cbor)) => {
            let pair = Binaries { asn1, cbor };
            if usable(&pair, &mut searched) {
                return Ok(pair);
            }
            return Err(HarnessError::BinariesNotFound { searched });
        }
        (None, None) => {}
        _ => return Err(HarnessError::IncompleteOverride),
    }

    for dir in CANDIDATE_DIRS {
        let base = root.join(dir);
        let pair = Binaries {
            asn1: base.join(ASN1_BINARY),
            cbor: base.join(CBOR_BINARY),
        };
        if usable(&pair, &mut searched) {
            return Ok(pair);
        }
    }

    if let (Ok(asn1), Ok(cbor)) = (which::which(ASN1_BINARY), which::which(CBOR_BINARY)) {
        tracing::debug!(asn1 = %asn1.display(), cbor = %cbor.display(), "decoders found on PATH");
        return Ok(Binaries { asn1, cbor });
    }
    Err(HarnessError::BinariesNotFound { searched })
}

fn usable(pair: &Binaries, searched: &mut Vec<PathBuf>) -> bool {
    let found = pair.asn1.is_file() && pair.cbor.is_file();
    tracing::debug!(asn1 = %pair.asn1.display(), cbor = %pair.cbor.display(), found, "checked");
    searched.push(pair.asn1.clone());
    searched.push(pair.cbor.clone());
    found
}
