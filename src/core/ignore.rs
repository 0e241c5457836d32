//! Ignore rules: shell-glob patterns matched against a single path segment.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// An ordered, immutable set of ignore patterns.
///
/// Patterns are matched against a basename only, never against a full path,
/// and matching is case-sensitive. Operations that need the rules take a
/// snapshot (a clone, or an `Arc` clone) when they start, so editing the rule
/// text afterwards does not affect them.
#[derive(Debug, Clone)]
pub struct IgnoreRuleSet {
    patterns: Vec<String>,
    matcher: GlobSet,
}

impl Default for IgnoreRuleSet {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            matcher: GlobSet::empty(),
        }
    }
}

impl IgnoreRuleSet {
    /// Builds a rule set from individual patterns.
    ///
    /// Surrounding whitespace is trimmed and empty patterns are dropped. A
    /// pattern that is not a valid glob is logged and skipped.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        let mut kept = Vec::new();

        for pattern in patterns {
            let trimmed = pattern.as_ref().trim();
            if trimmed.is_empty() {
                continue;
            }

            match GlobBuilder::new(trimmed).literal_separator(true).build() {
                Ok(glob) => {
                    builder.add(glob);
                    kept.push(trimmed.to_string());
                }
                Err(e) => {
                    tracing::warn!("Skipping invalid ignore pattern '{}': {}", trimmed, e);
                }
            }
        }

        let matcher = builder.build().unwrap_or_else(|e| {
            tracing::error!("Failed to build glob set from patterns: {}", e);
            GlobSet::empty()
        });

        Self {
            patterns: kept,
            matcher,
        }
    }

    /// Parses free-form rule text where entries are separated by `;` or line breaks.
    pub fn parse(text: &str) -> Self {
        Self::new(text.split(|c| c == ';' || c == '\n' || c == '\r'))
    }

    /// Returns `true` if `name` matches any pattern.
    pub fn matches(&self, name: &str) -> bool {
        !self.patterns.is_empty() && self.matcher.is_match(name)
    }

    /// The accepted patterns, in input order.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Renders the rules back into the `;`-separated text form.
    pub fn to_text(&self) -> String {
        self.patterns.join(";")
    }
}

/// Returns `true` if the basename `name` matches any of `patterns`.
pub fn matches<S: AsRef<str>>(name: &str, patterns: &[S]) -> bool {
    IgnoreRuleSet::new(patterns).matches(name)
}
