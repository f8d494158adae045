//! Content comparison against a string argument.

use super::{CheckCounters, Condition, Config};
use crate::SieveError;
use crate::manager::Manager;
use crate::message::Locked;
use crate::metrics::Metrics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::Span;

/// Section for the `text` condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// One of the operator names accepted by [`TextOperator::parse`].
    pub operator: String,
    /// Index of the part to test. Negative values count from the end.
    pub part: i64,
    /// The string to compare against.
    pub arg: String,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            operator: "equals_cs".to_string(),
            part: 0,
            arg: String::new(),
        }
    }
}

/// Comparison applied by the `text` condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOperator {
    EqualsCs,
    Equals,
    ContainsCs,
    Contains,
    PrefixCs,
    Prefix,
    SuffixCs,
    Suffix,
}

impl TextOperator {
    /// Parse an operator name.
    pub fn parse(name: &str) -> Result<Self, SieveError> {
        match name {
            "equals_cs" => Ok(Self::EqualsCs),
            "equals" => Ok(Self::Equals),
            "contains_cs" => Ok(Self::ContainsCs),
            "contains" => Ok(Self::Contains),
            "prefix_cs" => Ok(Self::PrefixCs),
            "prefix" => Ok(Self::Prefix),
            "suffix_cs" => Ok(Self::SuffixCs),
            "suffix" => Ok(Self::Suffix),
            other => Err(SieveError::InvalidConfig(format!(
                "text operator '{}' was not recognised",
                other
            ))),
        }
    }

    fn case_sensitive(self) -> bool {
        matches!(
            self,
            Self::EqualsCs | Self::ContainsCs | Self::PrefixCs | Self::SuffixCs
        )
    }

    fn apply(self, haystack: &[u8], needle: &[u8]) -> bool {
        match self {
            Self::EqualsCs | Self::Equals => haystack == needle,
            Self::ContainsCs | Self::Contains => {
                needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
            }
            Self::PrefixCs | Self::Prefix => haystack.starts_with(needle),
            Self::SuffixCs | Self::Suffix => haystack.ends_with(needle),
        }
    }
}

/// Tests the content of one part against `arg`.
pub struct Text {
    operator: TextOperator,
    part: i64,
    /// Lowercased up front for the case-insensitive operators.
    arg: Vec<u8>,
    log: Span,
    counters: CheckCounters,
}

impl Condition for Text {
    fn check(&self, msg: Locked<'_>) -> bool {
        let Some(part) = msg.get(self.part) else {
            tracing::debug!(parent: &self.log, index = self.part, "part index out of range");
            return self.counters.record(false);
        };

        let result = if self.operator.case_sensitive() {
            self.operator.apply(part.content(), &self.arg)
        } else {
            let lowered = part.as_str().to_lowercase();
            self.operator.apply(lowered.as_bytes(), &self.arg)
        };
        self.counters.record(result)
    }
}

pub(super) fn new(
    conf: &Config,
    _mgr: &dyn Manager,
    log: &Span,
    stats: Arc<dyn Metrics>,
) -> Result<Arc<dyn Condition>, SieveError> {
    let operator = TextOperator::parse(&conf.text.operator)?;
    let arg = if operator.case_sensitive() {
        conf.text.arg.clone().into_bytes()
    } else {
        conf.text.arg.to_lowercase().into_bytes()
    };

    Ok(Arc::new(Text {
        operator,
        part: conf.text.part,
        arg,
        log: tracing::debug_span!(parent: log, "condition", kind = "text"),
        counters: CheckCounters::register(stats.as_ref(), "text"),
    }))
}
