//! Jira wiki markup to GitHub-flavored Markdown converter
//!
//! The converter is a fixed, ordered table of regex rewrite rules applied
//! strictly in sequence over the whole document. It is total: any string in,
//! a string out, with unrecognized markup passed through untouched. Rule
//! ordering is load-bearing, since later rules operate on the text shape
//! earlier rules produce.

mod rules;
mod stats;

pub use rules::MarkupConverter;
pub use stats::ConversionStats;

/// Convert one ticket field to Markdown. A missing field converts to the
/// empty string.
pub fn jira_to_markdown(text: Option<&str>) -> String {
    MarkupConverter::new().convert(text)
}
