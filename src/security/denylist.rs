//! Denylist of dangerous command patterns.
//!
//! Every pattern is a regex search anywhere in the command text unless the
//! pattern anchors itself with `^`. This is best-effort hardening, not a
//! sandbox: the filter does not parse shell grammar, so variable expansion,
//! quoting tricks, aliases or `eval` walk straight past it.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Built-in rules as `(label, pattern)`.
const BUILTIN_RULES: &[(&str, &str)] = &[
    (
        "recursive or forced delete",
        r"\brm\b[^;&|]*\s(-[A-Za-z]*[rRf]|--recursive\b|--force\b)",
    ),
    ("privilege escalation", r"\bsudo\b"),
    ("multiplexer escape", r"^\s*:?\s*!"),
    ("backgrounded line", r"^\s*&"),
    ("leading command chain", r"^\s*(&&|\|\s*[&|])"),
    ("redirect to absolute path", r"^\s*[<>]\s*/"),
];

/// A single named deny pattern.
#[derive(Debug, Clone)]
pub struct DenyRule {
    label: String,
    pattern: Regex,
}

impl DenyRule {
    /// Compile a rule from a label and a regex.
    pub fn new(label: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            label: label.into(),
            pattern: Regex::new(pattern)?,
        })
    }

    /// Human-readable name of what this rule blocks.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the rule fires on `command`.
    pub fn matches(&self, command: &str) -> bool {
        self.pattern.is_match(command)
    }
}

/// Why a command was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockReason {
    /// Label of the first rule that matched.
    pub rule: String,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rule)
    }
}

fn builtin_rules() -> &'static [DenyRule] {
    static RULES: OnceLock<Vec<DenyRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        BUILTIN_RULES
            .iter()
            .map(|(label, pattern)| {
                DenyRule::new(*label, pattern).expect("built-in deny pattern must compile")
            })
            .collect()
    })
}

/// Command safety filter: the built-in denylist plus optional extras.
#[derive(Debug, Clone, Default)]
pub struct SafetyFilter {
    extra: Vec<DenyRule>,
}

impl SafetyFilter {
    /// Filter with only the built-in rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter with additional user-supplied regexes.
    ///
    /// Each extra pattern is labelled with its own source text.
    pub fn with_patterns<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extra = patterns
            .into_iter()
            .map(|p| DenyRule::new(p.as_ref(), p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { extra })
    }

    /// Check a command, returning the first rule it trips.
    pub fn check(&self, command: &str) -> Result<(), BlockReason> {
        match builtin_rules()
            .iter()
            .chain(self.extra.iter())
            .find(|rule| rule.matches(command))
        {
            Some(rule) => Err(BlockReason {
                rule: rule.label().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// `true` when no rule matches.
    pub fn is_safe(&self, command: &str) -> bool {
        self.check(command).is_ok()
    }
}

/// Check a command against the built-in denylist only.
pub fn is_safe(command: &str) -> bool {
    !builtin_rules().iter().any(|rule| rule.matches(command))
}

/// Strip control characters and bound the length, for log output.
pub fn sanitize_for_display(command: &str) -> String {
    command
        .chars()
        .filter(|c| !c.is_control() || *c == '\t')
        .take(200)
        .collect()
}
