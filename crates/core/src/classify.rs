//! Classification of free-text probe errors into reason codes.
//!
//! Probe implementations that wrap external tools only get an error string
//! back. This table maps those strings onto the closed [`ReasonCode`] set:
//! an ordered list of (pattern, reason) rules, evaluated top to bottom,
//! first match wins, with `cant_open_file` as the catch-all. The table is
//! deliberately outside the lifecycle engine, which only ever consumes an
//! already-classified reason.

use regex_lite::Regex;

use crate::probe::ReasonCode;

/// One classification rule.
#[derive(Debug)]
struct ClassifierRule {
    pattern: Regex,
    reason: ReasonCode,
}

/// Ordered error-message classifier.
#[derive(Debug)]
pub struct ClassifierTable {
    rules: Vec<ClassifierRule>,
    fallback: ReasonCode,
}

impl Default for ClassifierTable {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

impl ClassifierTable {
    /// An empty table that classifies everything as `fallback`.
    pub fn new(fallback: ReasonCode) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
        }
    }

    /// The stock rule set, matching the error strings the probe tooling is
    /// known to emit.
    pub fn with_default_rules() -> Self {
        let mut table = Self::new(ReasonCode::CantOpenFile);
        table
            .add_rule(r"(?i)format .* is not supported", ReasonCode::UnsupportedFormat)
            .add_rule(r"(?i)extension .* is not supported", ReasonCode::UnsupportedFormat)
            .add_rule(r"(?i)timed? ?out", ReasonCode::Timeout)
            .add_rule(r"(?i)no granule", ReasonCode::NoGranuleFound)
            .add_rule(r"(?i)could not extract .* (url|variables)", ReasonCode::FailedToExtractUrl)
            .add_rule(r"(?i)tile generation", ReasonCode::TileGenerationFailed)
            .add_rule(r"(?i)error testing tile", ReasonCode::TileGenerationFailed);
        table
    }

    /// Append a rule. Invalid patterns are skipped with a warning rather
    /// than failing table construction; a bad rule should not take the
    /// classifier down.
    pub fn add_rule(&mut self, pattern: &str, reason: ReasonCode) -> &mut Self {
        match Regex::new(pattern) {
            Ok(regex) => self.rules.push(ClassifierRule {
                pattern: regex,
                reason,
            }),
            Err(e) => tracing::warn!("Skipping invalid classifier pattern {:?}: {}", pattern, e),
        }
        self
    }

    /// Classify an error message. First matching rule wins.
    pub fn classify(&self, message: &str) -> ReasonCode {
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(message))
            .map(|rule| rule.reason)
            .unwrap_or(self.fallback)
    }
}
