use std::io::Write;
use std::time::Duration;

use anyhow::Result;

use crate::assertion::{judge, Verdict};
use crate::cases::TestCase;
use crate::error::HarnessError;
use crate::fixture;
use crate::format::{Capabilities, Format};
use crate::harness::{self, DEFAULT_TIMEOUT};
use crate::locate::Binaries;
use crate::report::{Reporter, Summary, TestResult};

/// Everything a run needs, resolved up front.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub binaries: Binaries,
    pub capabilities: Capabilities,
    pub timeout: Duration,
    pub filter: Option<String>,
}

impl RunConfig {
    pub fn new(binaries: Binaries, capabilities: Capabilities) -> Self {
        Self {
            binaries,
            capabilities,
            timeout: DEFAULT_TIMEOUT,
            filter: None,
        }
    }
}

/// Run the selected cases in catalog order, one section per format, and
/// print the summary.
///
/// Only a run with no usable encoder at all is an error; everything that
/// goes wrong inside a case becomes that case's result.
pub fn run_suite<W: Write>(
    cases: &[TestCase],
    config: &RunConfig,
    reporter: &mut Reporter<W>,
) -> Result<Summary> {
    if !config.capabilities.any() {
        return Err(HarnessError::NoCapabilities.into());
    }
    for format in Format::ALL {
        reporter.section(&format!("{format} Tests"))?;
        let selected = cases
            .iter()
            .filter(|case| case.format() == format)
            .filter(|case| case.matches(config.filter.as_deref()));
        for case in selected {
            reporter.starting(case.name)?;
            let result = run_case(case, config);
            reporter.record(result)?;
        }
    }
    Ok(reporter.finish()?)
}

/// Encode, invoke and judge a single case.
pub fn run_case(case: &TestCase, config: &RunConfig) -> TestResult {
    let format = case.format();
    if !config.capabilities.supports(format) {
        return TestResult::skip(case.name, format!("{} not available", format.encoder_name()));
    }

    let bytes = match fixture::encode(&case.fixture) {
        Ok(bytes) => bytes,
        Err(err) => return TestResult::fail(case.name, format!("Encoding failed: {err:#}")),
    };
    let binary = config.binaries.for_format(format);
    tracing::debug!(case = case.name, binary = %binary.display(), len = bytes.len(), "invoking");
    let outcome = harness::invoke(binary, format, &bytes, config.timeout);

    match judge(&outcome, case.expected, format) {
        Verdict::Pass => TestResult::pass(case.name),
        Verdict::Fail(diagnostic) => TestResult::fail(case.name, diagnostic),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::catalog;
    use crate::report::Status;
    use std::path::PathBuf;

    fn nowhere() -> Binaries {
        Binaries {
            asn1: PathBuf::from("/nonexistent/dumpasn1"),
            cbor: PathBuf::from("/nonexistent/dumpcbor"),
        }
    }

    #[test]
    fn unavailable_format_is_skipped_without_invoking() {
        let caps = Capabilities { asn1: false, cbor: true };
        let config = RunConfig::new(nowhere(), caps);
        let case = &catalog()[0];
        let result = run_case(case, &config);
        assert_eq!(result.status, Status::Skip);
        assert_eq!(result.diagnostic.as_deref(), Some("bcder not available"));
    }

    #[test]
    fn no_capabilities_aborts() {
        let caps = Capabilities { asn1: false, cbor: false };
        let mut reporter = Reporter::new(Vec::new(), false, false);
        let err = run_suite(&catalog(), &RunConfig::new(nowhere(), caps), &mut reporter)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HarnessError>(),
            Some(HarnessError::NoCapabilities)
        ));
        assert!(reporter.results().is_empty());
    }

    #[test]
    fn missing_binary_fails_every_executed_case() {
        let caps = Capabilities { asn1: false, cbor: true };
        let mut reporter = Reporter::new(Vec::new(), false, false);
        let cases = catalog();
        let summary = run_suite(&cases, &RunConfig::new(nowhere(), caps), &mut reporter).unwrap();
        assert_eq!(summary.total(), cases.len());
        assert_eq!(summary.skipped, 10);
        assert_eq!(summary.failed, 14);
        assert_eq!(summary.exit_code(), 1);
    }

    #[test]
    fn filter_limits_the_run() {
        let caps = Capabilities { asn1: true, cbor: true }.without(Format::Cbor);
        let mut config = RunConfig::new(nowhere(), caps);
        config.filter = Some("Boolean".into());
        let mut reporter = Reporter::new(Vec::new(), false, false);
        let summary = run_suite(&catalog(), &config, &mut reporter).unwrap();
        assert_eq!(summary.total(), 4);
        assert_eq!(summary.skipped, 2);
    }
}
