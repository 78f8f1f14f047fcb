//! Substitution statistics for one conversion.

use serde::Serialize;
use std::collections::HashMap;

/// Counts how many substitutions each rule performed during one conversion.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionStats {
    /// Rule name mapped to the number of substitutions it made.
    pub substitutions: HashMap<String, usize>,
}

impl ConversionStats {
    pub fn record(&mut self, rule: &str, count: usize) {
        *self.substitutions.entry(rule.to_string()).or_insert(0) += count;
    }

    /// Total substitutions across all rules.
    pub fn total(&self) -> usize {
        self.substitutions.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.substitutions.is_empty()
    }

    /// Human-readable listing, busiest rules first.
    pub fn to_text(&self) -> String {
        let mut entries: Vec<_> = self.substitutions.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));

        let mut out = String::new();
        for (rule, count) in entries {
            out.push_str(&format!("{}: {}\n", rule, count));
        }
        out
    }
}
