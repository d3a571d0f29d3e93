//! Registration and execution of codec suites.
//!
//! Each registered family carries its list of [`TestCase`]s. Cases run in
//! registration order, every one on a freshly set up [`CodecHarness`], so a
//! discarded codec pair never leaks into the next case.

use crate::config::HarnessConfig;
use crate::error::{HarnessError, TestFailure};
use crate::family::CodecFamily;
use crate::harness::{CodecHarness, RoundTripReport, TestCase};
use logging::Logger;
use media::h264;
use std::fmt;

/// Why a case did not pass
#[derive(Debug)]
pub enum CaseError {
    /// The codec pair could not be built or initialized
    SetUp(HarnessError),
    /// The round trip ran and violated a check
    RoundTrip(TestFailure),
}

impl fmt::Display for CaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseError::SetUp(e) => write!(f, "set up failed: {}", e),
            CaseError::RoundTrip(failure) => write!(f, "{}", failure),
        }
    }
}

#[derive(Debug)]
pub enum CaseOutcome {
    Passed(RoundTripReport),
    Failed(CaseError),
    /// The suite is switched off in configuration or unavailable in this build
    Disabled,
}

#[derive(Debug)]
pub struct CaseResult {
    pub family: String,
    pub case: String,
    pub outcome: CaseOutcome,
}

/// Results of a registry run, in execution order
#[derive(Debug, Default)]
pub struct SuiteReport {
    pub results: Vec<CaseResult>,
}

impl SuiteReport {
    pub fn passed(&self) -> usize {
        self.count(|outcome| matches!(outcome, CaseOutcome::Passed(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, CaseOutcome::Failed(_)))
    }

    pub fn disabled(&self) -> usize {
        self.count(|outcome| matches!(outcome, CaseOutcome::Disabled))
    }

    /// True if nothing failed. Disabled cases do not count against the run.
    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, predicate: impl Fn(&CaseOutcome) -> bool) -> usize {
        self.results
            .iter()
            .filter(|result| predicate(&result.outcome))
            .count()
    }
}

struct Suite {
    family: CodecFamily,
    cases: Vec<TestCase>,
    enabled: bool,
}

/// Registered codec suites
#[derive(Default)]
pub struct TestRegistry {
    suites: Vec<Suite>,
}

impl TestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a family and its cases. Disabled suites are reported, not run.
    pub fn register(&mut self, family: CodecFamily, cases: Vec<TestCase>, enabled: bool) -> &mut Self {
        self.suites.push(Suite {
            family,
            cases,
            enabled,
        });
        self
    }

    /// Registry with the quantized and H.264 suites.
    ///
    /// The QP case is only registered for families whose decoder recovers
    /// QP. The H.264 suite is disabled unless FFmpeg support is compiled in
    /// and usable.
    pub fn with_builtin_suites(config: &HarnessConfig) -> Self {
        let quantized = CodecFamily::quantized();
        let h264_family = CodecFamily::h264();
        let quantized_cases = builtin_cases(&quantized, config);
        let h264_cases = builtin_cases(&h264_family, config);

        let mut registry = TestRegistry::new();
        registry
            .register(quantized, quantized_cases, config.codecs.quantized)
            .register(
                h264_family,
                h264_cases,
                config.codecs.h264 && h264::is_available(),
            );
        registry
    }

    /// Number of registered cases across all suites.
    pub fn case_count(&self) -> usize {
        self.suites.iter().map(|suite| suite.cases.len()).sum()
    }

    /// Runs every registered case on its own harness.
    pub fn run_all(&self, config: &HarnessConfig, logger: &Logger) -> SuiteReport {
        let logger = logger.for_component("Registry");
        let mut report = SuiteReport::default();

        for suite in &self.suites {
            if !suite.enabled {
                logger.info(&format!("Suite {} disabled, skipping", suite.family.name));
            }
            for case in &suite.cases {
                let outcome = if suite.enabled {
                    run_case(&suite.family, case, config, &logger)
                } else {
                    CaseOutcome::Disabled
                };
                report.results.push(CaseResult {
                    family: suite.family.name.clone(),
                    case: case.name.clone(),
                    outcome,
                });
            }
        }

        logger.info(&format!(
            "Finished: {} passed, {} failed, {} disabled",
            report.passed(),
            report.failed(),
            report.disabled()
        ));
        report
    }
}

fn builtin_cases(family: &CodecFamily, config: &HarnessConfig) -> Vec<TestCase> {
    let mut cases = vec![TestCase::encode_decode(config.psnr_threshold_db)];
    if family.supports_qp_recovery {
        cases.push(TestCase::decoded_qp_equals_encoded_qp());
    }
    cases
}

fn run_case(
    family: &CodecFamily,
    case: &TestCase,
    config: &HarnessConfig,
    logger: &Logger,
) -> CaseOutcome {
    let mut harness = match CodecHarness::set_up(family, config, logger) {
        Ok(harness) => harness,
        Err(e) => {
            logger.error(&format!("{}/{}: {}", family.name, case.name, e));
            return CaseOutcome::Failed(CaseError::SetUp(e));
        }
    };

    let result = harness.run(case);
    if let Err(e) = harness.tear_down() {
        logger.warn(&format!("{}/{}: tear down failed: {}", family.name, case.name, e));
    }

    match result {
        Ok(report) => CaseOutcome::Passed(report),
        Err(failure) => CaseOutcome::Failed(CaseError::RoundTrip(failure)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodecToggles;
    use std::time::Duration;

    fn config() -> HarnessConfig {
        HarnessConfig::default()
            .with_timeouts(Duration::from_millis(1000), Duration::from_millis(1000))
    }

    #[test]
    fn test_builtin_cases_per_family() {
        let registry = TestRegistry::with_builtin_suites(&config());
        assert_eq!(registry.case_count(), 4);
        assert_eq!(registry.suites[0].cases[0].name, "EncodeDecode");
        assert_eq!(registry.suites[0].cases[1].name, "DecodedQpEqualsEncodedQp");
    }

    #[test]
    fn test_qp_case_skipped_without_recovery() {
        let family = CodecFamily::quantized().with_qp_recovery(false);
        let cases = builtin_cases(&family, &config());
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].checks.min_psnr_db, Some(36.0));
    }

    #[test]
    fn test_quantized_suite_passes() {
        let mut config = config();
        config.codecs = CodecToggles {
            quantized: true,
            h264: false,
        };

        let report = TestRegistry::with_builtin_suites(&config).run_all(&config, &Logger::disabled());

        assert_eq!(report.passed(), 2);
        assert_eq!(report.disabled(), 2);
        assert!(report.all_passed());
    }

    #[test]
    fn test_disabled_suite_not_run() {
        let mut registry = TestRegistry::new();
        registry.register(
            CodecFamily::quantized(),
            vec![TestCase::encode_decode(36.0)],
            false,
        );

        let report = registry.run_all(&config(), &Logger::disabled());
        assert_eq!(report.results.len(), 1);
        assert!(matches!(report.results[0].outcome, CaseOutcome::Disabled));
    }
}
