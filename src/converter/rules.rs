//! The rewrite rule table and its driver.

use regex::{Captures, Regex};

use super::stats::ConversionStats;

/// How a rule rewrites its matches.
enum Rewrite {
    /// Expansion template using `${n}` capture references.
    Template(&'static str),
    /// Replacement computed from the captures.
    Replacer(fn(&Captures) -> String),
}

struct RewriteRule {
    name: &'static str,
    pattern: Regex,
    rewrite: Rewrite,
}

impl RewriteRule {
    fn template(name: &'static str, pattern: &str, template: &'static str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).unwrap(),
            rewrite: Rewrite::Template(template),
        }
    }

    fn replacer(name: &'static str, pattern: &str, replace: fn(&Captures) -> String) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).unwrap(),
            rewrite: Rewrite::Replacer(replace),
        }
    }
}

/// Jira wiki markup to Markdown translator.
///
/// Holds the compiled rule table; build once and reuse. Conversion touches no
/// shared state, so a converter can be used from multiple threads at once.
pub struct MarkupConverter {
    rules: Vec<RewriteRule>,
}

impl MarkupConverter {
    pub fn new() -> Self {
        Self {
            rules: rule_table(),
        }
    }

    /// Convert one document. `None` converts to the empty string without
    /// touching the rule table.
    pub fn convert(&self, text: Option<&str>) -> String {
        self.convert_with_stats(text).0
    }

    /// Convert one document and report how many substitutions each rule made.
    pub fn convert_with_stats(&self, text: Option<&str>) -> (String, ConversionStats) {
        let mut stats = ConversionStats::default();
        let Some(text) = text else {
            return (String::new(), stats);
        };

        let mut current = text.to_string();
        for rule in &self.rules {
            let mut hits = 0usize;
            current = rule
                .pattern
                .replace_all(&current, |caps: &Captures| {
                    hits += 1;
                    match rule.rewrite {
                        Rewrite::Template(template) => {
                            let mut expanded = String::new();
                            caps.expand(template, &mut expanded);
                            expanded
                        }
                        Rewrite::Replacer(replace) => replace(caps),
                    }
                })
                .into_owned();
            if hits > 0 {
                stats.record(rule.name, hits);
            }
        }
        (current, stats)
    }
}

impl Default for MarkupConverter {
    fn default() -> Self {
        Self::new()
    }
}

/// The rule table. Order is an invariant: list markers before inline styles,
/// code extraction before bold, bare links before labeled links, table
/// indentation last.
fn rule_table() -> Vec<RewriteRule> {
    vec![
        RewriteRule::replacer("bullet-list", r"(?m)^[ \t]*(\*+)\s+", bullet_list),
        RewriteRule::replacer("numbered-list", r"(?m)^[ \t]*(#+)\s+", numbered_list),
        RewriteRule::replacer("heading", r"(?m)^h([0-6])\.(.*)$", heading),
        RewriteRule::replacer(
            "table-header",
            r"(?m)^[ \t]*((?:\|\|.*?)+\|\|)[ \t]*$",
            table_header,
        ),
        RewriteRule::template(
            "code-block",
            r"(?s)\{code(:([a-z]+))?([:|]?(title|borderStyle|borderColor|borderWidth|bgColor|titleBGColor)=.+?)*\}(.*?)\{code\}",
            "```${2}\n${5}\n```",
        ),
        RewriteRule::template("bold", r"\*(\S.*)\*", "**${1}**"),
        RewriteRule::template("italic", r"_(\S.*)_", "*${1}*"),
        RewriteRule::template("monospace", r"\{\{([^}]+)\}\}", "`${1}`"),
        // The whole match, delimiters included, goes inside the tag; the plus
        // signs survive in the output.
        RewriteRule::template("inserted-text", r"\+([^+]*)\+", "<ins>${0}</ins>"),
        RewriteRule::template("superscript", r"\^([^^]*)\^", "<sup>${1}</sup>"),
        RewriteRule::template("subscript", r"~([^~]*)~", "<sub>${1}</sub>"),
        RewriteRule::template(
            "strikethrough",
            r"(\s+)-(\S+.*?\S)-(\s+)",
            "${1}~~${2}~~${3}",
        ),
        RewriteRule::template("preformatted", r"\{noformat\}", "```"),
        RewriteRule::template("bare-link", r"\[([^|]+)\]", "<${1}>"),
        RewriteRule::template("image", r"!(.+)!", "![](${1})"),
        RewriteRule::template("labeled-link", r"\[(.+?)\|(.+)\]", "[${1}](${2})"),
        RewriteRule::template("blockquote", r"(?m)^bq\.\s+", "> "),
        RewriteRule::template("color-span", r"(?s)\{color:[^}]+\}(.*)\{color\}", "${1}"),
        RewriteRule::template(
            "panel",
            r"(?s)\{panel:title=([^}]*)\}\n?(.*?)\n?\{panel\}",
            "\n| ${1} |\n| --- |\n| ${2} |",
        ),
        RewriteRule::template("table-indent", r"(?m)^[ \t]*\|", "|"),
    ]
}

fn bullet_list(caps: &Captures) -> String {
    let depth = caps[1].len();
    format!("{}* ", "  ".repeat(depth))
}

fn numbered_list(caps: &Captures) -> String {
    let depth = caps[1].len();
    format!("{}1. ", "  ".repeat(depth))
}

fn heading(caps: &Captures) -> String {
    // Level h0-h6 maps to one through seven hashes, uncapped.
    let level = (caps[1].as_bytes()[0] - b'0') as usize;
    format!("{}{}", "#".repeat(level + 1), &caps[2])
}

fn table_header(caps: &Captures) -> String {
    let row = caps[1].replace("||", "|");
    let markers = Regex::new(r"\|[^|]+")
        .unwrap()
        .replace_all(&row, "| --- ");
    format!("\n{}\n{}", row, markers)
}
