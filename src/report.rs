use std::io::{self, Write};

use owo_colors::OwoColorize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Pass,
    Fail,
    Skip,
}

/// Final judgement for one case. Never changed once recorded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestResult {
    pub case_name: String,
    pub status: Status,
    pub diagnostic: Option<String>,
}

impl TestResult {
    pub fn pass(case_name: &str) -> Self {
        Self::new(case_name, Status::Pass, None)
    }

    pub fn fail(case_name: &str, diagnostic: impl Into<String>) -> Self {
        Self::new(case_name, Status::Fail, Some(diagnostic.into()))
    }

    pub fn skip(case_name: &str, reason: impl Into<String>) -> Self {
        Self::new(case_name, Status::Skip, Some(reason.into()))
    }

    fn new(case_name: &str, status: Status, diagnostic: Option<String>) -> Self {
        Self {
            case_name: case_name.to_owned(),
            status,
            diagnostic,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl Summary {
    pub fn from_results(results: &[TestResult]) -> Self {
        results.iter().fold(Self::default(), |mut s, r| {
            match r.status {
                Status::Pass => s.passed += 1,
                Status::Fail => s.failed += 1,
                Status::Skip => s.skipped += 1,
            }
            s
        })
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }

    /// Skips never fail a run.
    pub fn success(&self) -> bool {
        self.failed == 0
    }

    pub fn exit_code(&self) -> i32 {
        if self.success() {
            0
        } else {
            1
        }
    }
}

/// Prints results as they arrive and keeps the ordered result log.
pub struct Reporter<W: Write> {
    out: W,
    color: bool,
    verbose: bool,
    results: Vec<TestResult>,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, color: bool, verbose: bool) -> Self {
        Self {
            out,
            color,
            verbose,
            results: Vec::new(),
        }
    }

    pub fn section(&mut self, title: &str) -> io::Result<()> {
        let title = self.paint(&format!("=== {title} ==="), Paint::Blue);
        writeln!(self.out, "\n{title}\n")
    }

    pub fn starting(&mut self, case_name: &str) -> io::Result<()> {
        if self.verbose {
            writeln!(self.out, "[RUN ] {case_name}")?;
        }
        Ok(())
    }

    pub fn record(&mut self, result: TestResult) -> io::Result<()> {
        let tag = match result.status {
            Status::Pass => self.paint("PASS", Paint::Green),
            Status::Fail => self.paint("FAIL", Paint::Red),
            Status::Skip => self.paint("SKIP", Paint::Yellow),
        };
        match (&result.status, &result.diagnostic) {
            (Status::Fail, Some(diag)) => {
                writeln!(self.out, "[{tag}] {}", result.case_name)?;
                writeln!(self.out, "  {diag}")?;
            }
            (Status::Skip, Some(reason)) => {
                writeln!(self.out, "[{tag}] {} ({reason})", result.case_name)?;
            }
            _ => writeln!(self.out, "[{tag}] {}", result.case_name)?,
        }
        self.results.push(result);
        Ok(())
    }

    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    pub fn summary(&self) -> Summary {
        Summary::from_results(&self.results)
    }

    /// Print the closing summary block and return the counts.
    pub fn finish(&mut self) -> io::Result<Summary> {
        let summary = self.summary();
        self.section("Summary")?;
        let passed = self.paint(&summary.passed.to_string(), Paint::Green);
        let failed = self.paint(&summary.failed.to_string(), Paint::Red);
        let skipped = self.paint(&summary.skipped.to_string(), Paint::Yellow);
        writeln!(self.out, "Passed:  {passed}")?;
        writeln!(self.out, "Failed:  {failed}")?;
        writeln!(self.out, "Skipped: {skipped}")?;
        writeln!(self.out, "Total:   {}", summary.total())?;
        self.out.flush()?;
        Ok(summary)
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, text: &str, paint: Paint) -> String {
        if !self.color {
            return text.to_owned();
        }
        match paint {
            Paint::Green => text.green().to_string(),
            Paint::Red => text.red().to_string(),
            Paint::Yellow => text.yellow().to_string(),
            Paint::Blue => text.blue().to_string(),
        }
    }
}

#[derive(Clone, Copy)]
enum Paint {
    Green,
    Red,
    Yellow,
    Blue,
}
