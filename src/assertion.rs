use crate::format::Format;
use crate::harness::InvocationOutcome;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail(String),
}

/// Decide whether a decoder run satisfied a case.
///
/// A non-zero exit fails regardless of what was printed. Otherwise every
/// expected substring has to appear in stdout, compared case-insensitively
/// for CBOR.
pub fn judge(outcome: &InvocationOutcome, expected: &[&str], format: Format) -> Verdict {
    if outcome.exit_code != 0 {
        return Verdict::Fail(format!(
            "Non-zero exit code: {}\n  stderr: {}",
            outcome.exit_code,
            outcome.stderr.trim_end()
        ));
    }

    let missing = missing_substrings(&outcome.stdout, expected, format);
    if missing.is_empty() {
        return Verdict::Pass;
    }
    Verdict::Fail(format!(
        "Expected strings: {expected:?}\n  Missing: {missing:?}\n  Got output:\n{}",
        outcome.stdout
    ))
}

fn missing_substrings<'a>(stdout: &str, expected: &[&'a str], format: Format) -> Vec<&'a str> {
    if format.case_sensitive() {
        expected
            .iter()
            .copied()
            .filter(|needle| !stdout.contains(needle))
            .collect()
    } else {
        let haystack = stdout.to_lowercase();
        expected
            .iter()
            .copied()
            .filter(|needle| !haystack.contains(&needle.to_lowercase()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(stdout: &str) -> InvocationOutcome {
        InvocationOutcome {
            stdout: stdout.to_owned(),
            stderr: String::new(),
            exit_code: 0,
            timed_out: false,
        }
    }

    #[test]
    fn all_substrings_present() {
        let out = ok("INTEGER 42\n");
        assert_eq!(judge(&out, &["INTEGER", "42"], Format::Asn1), Verdict::Pass);
    }

    #[test]
    fn one_missing_substring_fails() {
        let out = ok("SEQUENCE {\n}\n");
        let Verdict::Fail(diag) = judge(&out, &["SEQUENCE", "INTEGER"], Format::Asn1) else {
            panic!("expected failure");
        };
        assert!(diag.contains("Missing: [\"INTEGER\"]"), "{diag}");
        assert!(diag.contains("SEQUENCE {"), "{diag}");
    }

    #[test]
    fn asn1_is_case_sensitive() {
        let out = ok("BOOLEAN true\n");
        assert!(matches!(
            judge(&out, &["BOOLEAN", "TRUE"], Format::Asn1),
            Verdict::Fail(_)
        ));
    }

    #[test]
    fn cbor_is_case_insensitive() {
        let out = ok("TEXT(13) \"HELLO, WORLD!\"\n");
        assert_eq!(judge(&out, &["text", "Hello"], Format::Cbor), Verdict::Pass);
    }

    #[test]
    fn nonzero_exit_fails_despite_output() {
        let out = InvocationOutcome {
            exit_code: 2,
            stderr: "trailing garbage\n".into(),
            ..ok("INTEGER 42\n")
        };
        let Verdict::Fail(diag) = judge(&out, &["INTEGER", "42"], Format::Asn1) else {
            panic!("expected failure");
        };
        assert!(diag.contains("Non-zero exit code: 2"), "{diag}");
        assert!(diag.contains("trailing garbage"), "{diag}");
    }

    #[test]
    fn timeout_mentions_timeout() {
        let Verdict::Fail(diag) = judge(&InvocationOutcome::timeout(), &[], Format::Cbor) else {
            panic!("expected failure");
        };
        assert!(diag.contains("Timeout"), "{diag}");
    }

    #[test]
    fn no_expectations_pass_on_clean_exit() {
        assert_eq!(judge(&ok(""), &[], Format::Cbor), Verdict::Pass);
    }
}
