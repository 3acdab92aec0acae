use std::fmt;

use clap::ValueEnum;

/// Encoding a fixture is written in, and therefore which decoder reads it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum)]
pub enum Format {
    Asn1,
    Cbor,
}

impl Format {
    pub const ALL: [Format; 2] = [Format::Asn1, Format::Cbor];

    /// File suffix used for fixtures of this format.
    pub fn suffix(self) -> &'static str {
        match self {
            Format::Asn1 => ".der",
            Format::Cbor => ".cbor",
        }
    }

    /// Whether expected substrings must match decoder output exactly.
    /// Keyed on format only; cases cannot override it.
    pub fn case_sensitive(self) -> bool {
        matches!(self, Format::Asn1)
    }

    pub fn encoder_name(self) -> &'static str {
        match self {
            Format::Asn1 => "bcder",
            Format::Cbor => "minicbor",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Asn1 => "ASN.1",
            Format::Cbor => "CBOR",
        })
    }
}

/// Which reference encoders this run may use. Computed once at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub asn1: bool,
    pub cbor: bool,
}

impl Capabilities {
    /// Encoders compiled into this binary.
    pub fn detect() -> Self {
        Self {
            asn1: cfg!(feature = "asn1"),
            cbor: cfg!(feature = "cbor"),
        }
    }

    pub fn without(mut self, format: Format) -> Self {
        match format {
            Format::Asn1 => self.asn1 = false,
            Format::Cbor => self.cbor = false,
        }
        self
    }

    pub fn supports(&self, format: Format) -> bool {
        match format {
            Format::Asn1 => self.asn1,
            Format::Cbor => self.cbor,
        }
    }

    pub fn any(&self) -> bool {
        self.asn1 || self.cbor
    }
}
