//! Safety interceptor: crisis-language detection.

use regex::{RegexSet, RegexSetBuilder};

/// Compiled, case-insensitive crisis pattern set. Compiled once at startup
/// and shared by every session.
#[derive(Debug, Clone)]
pub struct SafetyInterceptor {
    patterns: RegexSet,
}

impl SafetyInterceptor {
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = RegexSetBuilder::new(patterns)
            .case_insensitive(true)
            .build()?;
        Ok(Self { patterns })
    }

    /// Whether `text` contains crisis language.
    pub fn scan(&self, text: &str) -> bool {
        self.patterns.is_match(text)
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}
