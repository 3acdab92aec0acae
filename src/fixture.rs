use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use crate::format::Format;

/// ASN.1 value to be DER-encoded.
#[derive(Clone, Debug, PartialEq)]
pub enum Asn1Value {
    Integer(i64),
    Boolean(bool),
    Null,
    OctetString(&'static [u8]),
    Utf8String(&'static str),
    Sequence(Vec<Asn1Value>),
    /// Dotted decimal form, e.g. `2.5.4.3`.
    ObjectIdentifier(&'static str),
}

/// CBOR data item. Map keys are text, kept in insertion order.
#[derive(Clone, Debug, PartialEq)]
pub enum CborValue {
    Integer(i64),
    Text(&'static str),
    Bytes(&'static [u8]),
    Array(Vec<CborValue>),
    Map(Vec<(&'static str, CborValue)>),
    Bool(bool),
    Null,
    Float(f64),
}

#[derive(Clone, Debug, PartialEq)]
pub enum FixtureValue {
    Asn1(Asn1Value),
    Cbor(CborValue),
}

impl FixtureValue {
    pub fn format(&self) -> Format {
        match self {
            FixtureValue::Asn1(_) => Format::Asn1,
            FixtureValue::Cbor(_) => Format::Cbor,
        }
    }
}

/// Encode `value` with the reference encoder for its format.
pub fn encode(value: &FixtureValue) -> Result<Vec<u8>> {
    match value {
        FixtureValue::Asn1(v) => der::encode(v),
        FixtureValue::Cbor(v) => cbor::encode(v),
    }
}

#[cfg(feature = "asn1")]
mod der {
    use anyhow::{anyhow, Result};
    use bcder::encode::{sequence, PrimitiveContent, Values};
    use bcder::{Captured, Mode, OctetString, Oid, Utf8String};
    use bytes::Bytes;

    use super::Asn1Value;

    pub fn encode(value: &Asn1Value) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        capture(value)?.write_encoded(Mode::Der, &mut out)?;
        Ok(out)
    }

    fn capture(value: &Asn1Value) -> Result<Captured> {
        let captured = match value {
            Asn1Value::Integer(v) => (*v).encode().to_captured(Mode::Der),
            Asn1Value::Boolean(v) => (*v).encode().to_captured(Mode::Der),
            Asn1Value::Null => ().encode().to_captured(Mode::Der),
            Asn1Value::OctetString(data) => OctetString::new(Bytes::from_static(*data))
                .encode()
                .to_captured(Mode::Der),
            Asn1Value::Utf8String(text) => {
                let content = OctetString::new(Bytes::from_static(text.as_bytes()));
                Utf8String::new(content)
                    .map_err(|_| anyhow!("not a valid UTF8String: {text:?}"))?
                    .encode()
                    .to_captured(Mode::Der)
            }
            Asn1Value::Sequence(items) => {
                let inner = items.iter().map(capture).collect::<Result<Vec<_>>>()?;
                sequence(inner).to_captured(Mode::Der)
            }
            Asn1Value::ObjectIdentifier(dotted) => dotted
                .parse::<Oid<Bytes>>()
                .map_err(|_| anyhow!("invalid object identifier {dotted:?}"))?
                .encode()
                .to_captured(Mode::Der),
        };
        Ok(captured)
    }
}

#[cfg(not(feature = "asn1"))]
mod der {
    use anyhow::{bail, Result};

    use super::Asn1Value;

    pub fn encode(_value: &Asn1Value) -> Result<Vec<u8>> {
        bail!("built without the asn1 feature")
    }
}

#[cfg(feature = "cbor")]
mod cbor {
    use anyhow::{anyhow, Result};
    use minicbor::encode::{Error, Write};
    use minicbor::Encoder;

    use super::CborValue;

    pub fn encode(value: &CborValue) -> Result<Vec<u8>> {
        let mut encoder = Encoder::new(Vec::new());
        write(&mut encoder, value).map_err(|err| anyhow!("cbor encoding failed: {err}"))?;
        Ok(encoder.into_writer())
    }

    fn write<W: Write>(e: &mut Encoder<W>, value: &CborValue) -> Result<(), Error<W::Error>> {
        match value {
            CborValue::Integer(v) => {
                e.i64(*v)?;
            }
            CborValue::Text(s) => {
                e.str(s)?;
            }
            CborValue::Bytes(b) => {
                e.bytes(b)?;
            }
            CborValue::Array(items) => {
                e.array(items.len() as u64)?;
                for item in items {
                    write(e, item)?;
                }
            }
            CborValue::Map(entries) => {
                e.map(entries.len() as u64)?;
                for (key, item) in entries {
                    e.str(key)?;
                    write(e, item)?;
                }
            }
            CborValue::Bool(b) => {
                e.bool(*b)?;
            }
            CborValue::Null => {
                e.null()?;
            }
            CborValue::Float(f) => {
                e.f64(*f)?;
            }
        }
        Ok(())
    }
}

#[cfg(not(feature = "cbor"))]
mod cbor {
    use anyhow::{bail, Result};

    use super::CborValue;

    pub fn encode(_value: &CborValue) -> Result<Vec<u8>> {
        bail!("built without the cbor feature")
    }
}

/// Encoded bytes on disk for the duration of one invocation.
///
/// The file is removed by [`Fixture::remove`], or on drop if the caller
/// unwinds first.
pub struct Fixture {
    file: NamedTempFile,
}

impl Fixture {
    pub fn write(format: Format, bytes: &[u8]) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("fixture-")
            .suffix(format.suffix())
            .tempfile()
            .context("creating fixture file")?;
        file.write_all(bytes).context("writing fixture")?;
        file.flush()?;
        tracing::debug!(path = %file.path().display(), len = bytes.len(), "fixture written");
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn remove(self) {
        let path = self.file.path().to_path_buf();
        match self.file.close() {
            Ok(()) => tracing::debug!(path = %path.display(), "fixture removed"),
            Err(err) => tracing::warn!(path = %path.display(), "failed to remove fixture: {err}"),
        }
    }
}
