use crate::fixture::{Asn1Value, CborValue, FixtureValue};
use crate::format::Format;

/// One fixture plus the text its decoding must contain.
#[derive(Clone, Debug, PartialEq)]
pub struct TestCase {
    pub name: &'static str,
    pub fixture: FixtureValue,
    pub expected: &'static [&'static str],
}

impl TestCase {
    fn asn1(name: &'static str, value: Asn1Value, expected: &'static [&'static str]) -> Self {
        Self {
            name,
            fixture: FixtureValue::Asn1(value),
            expected,
        }
    }

    fn cbor(name: &'static str, value: CborValue, expected: &'static [&'static str]) -> Self {
        Self {
            name,
            fixture: FixtureValue::Cbor(value),
            expected,
        }
    }

    pub fn format(&self) -> Format {
        self.fixture.format()
    }

    /// File-name friendly form of the case name.
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.name.len());
        for ch in self.name.chars() {
            if ch.is_ascii_alphanumeric() {
                slug.push(ch.to_ascii_lowercase());
            } else if !slug.is_empty() && !slug.ends_with('-') {
                slug.push('-');
            }
        }
        slug.trim_end_matches('-').to_string()
    }

    pub fn matches(&self, filter: Option<&str>) -> bool {
        filter.map_or(true, |f| self.name.contains(f))
    }
}

/// The full catalog: every ASN.1 case, then every CBOR case.
pub fn catalog() -> Vec<TestCase> {
    let mut cases = asn1_cases();
    cases.extend(cbor_cases());
    cases
}

fn asn1_cases() -> Vec<TestCase> {
    use Asn1Value::*;
    vec![
        TestCase::asn1("ASN.1 Integer (42)", Integer(42), &["INTEGER", "42"]),
        TestCase::asn1("ASN.1 Integer (-100)", Integer(-100), &["INTEGER", "-100"]),
        TestCase::asn1("ASN.1 Boolean (true)", Boolean(true), &["BOOLEAN", "TRUE"]),
        TestCase::asn1("ASN.1 Boolean (false)", Boolean(false), &["BOOLEAN", "FALSE"]),
        TestCase::asn1("ASN.1 NULL", Null, &["NULL"]),
        TestCase::asn1(
            "ASN.1 OCTET STRING",
            OctetString(b"Hello, World!"),
            &["OCTET STRING", "Hello"],
        ),
        TestCase::asn1(
            "ASN.1 UTF8String",
            Utf8String("Testing"),
            &["UTF8String", "Testing"],
        ),
        TestCase::asn1(
            "ASN.1 SEQUENCE",
            Sequence(vec![Integer(1), Integer(2), Integer(3)]),
            &["SEQUENCE", "INTEGER"],
        ),
        TestCase::asn1(
            "ASN.1 Nested SEQUENCE",
            Sequence(vec![Sequence(vec![Integer(42)])]),
            &["SEQUENCE", "INTEGER"],
        ),
        TestCase::asn1(
            "ASN.1 OBJECT IDENTIFIER",
            ObjectIdentifier("2.5.4.3"),
            &["OBJECT IDENTIFIER", "2.5.4.3"],
        ),
    ]
}

#[allow(clippy::approx_constant)]
fn cbor_cases() -> Vec<TestCase> {
    use CborValue::*;
    vec![
        TestCase::cbor("CBOR Unsigned Integer (42)", Integer(42), &["unsigned", "42"]),
        TestCase::cbor(
            "CBOR Negative Integer (-100)",
            Integer(-100),
            &["negative", "-100"],
        ),
        TestCase::cbor("CBOR Text String", Text("Hello, World!"), &["text", "Hello"]),
        TestCase::cbor("CBOR Byte String", Bytes(&[1, 2, 3, 4]), &["bytes"]),
        TestCase::cbor(
            "CBOR Array",
            Array((1..=5).map(Integer).collect()),
            &["array", "5"],
        ),
        TestCase::cbor(
            "CBOR Map",
            Map(vec![("name", Text("Alice")), ("age", Integer(30))]),
            &["map", "name", "Alice"],
        ),
        TestCase::cbor(
            "CBOR Nested Structure",
            Map(vec![(
                "user",
                Map(vec![
                    ("name", Text("Bob")),
                    ("roles", Array(vec![Text("admin"), Text("user")])),
                ]),
            )]),
            &["map", "user", "name", "Bob", "array"],
        ),
        TestCase::cbor("CBOR Boolean (true)", Bool(true), &["true"]),
        TestCase::cbor("CBOR Boolean (false)", Bool(false), &["false"]),
        TestCase::cbor("CBOR Null", Null, &["null"]),
        TestCase::cbor("CBOR Float", Float(3.14159), &["float", "3.14"]),
        TestCase::cbor(
            "CBOR Mixed Array",
            Array(vec![Integer(1), Text("hello"), Bool(true), Null, Float(3.14)]),
            &["array", "text", "hello", "true", "null"],
        ),
        TestCase::cbor("CBOR Empty Array", Array(vec![]), &["array", "0"]),
        TestCase::cbor("CBOR Empty Map", Map(vec![]), &["map", "0"]),
    ]
}
