//! Attack signature catalog
//!
//! Fixed, case-insensitive pattern families matched against every
//! string-valued input. Families are evaluated in declaration order.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::ViolationKind;

/// Family an attack signature belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackFamily {
    SqlInjection,
    ScriptInjection,
    PathTraversal,
    CommandInjection,
}

impl AttackFamily {
    pub const ALL: [AttackFamily; 4] = [
        AttackFamily::SqlInjection,
        AttackFamily::ScriptInjection,
        AttackFamily::PathTraversal,
        AttackFamily::CommandInjection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttackFamily::SqlInjection => "sql_injection",
            AttackFamily::ScriptInjection => "xss",
            AttackFamily::PathTraversal => "path_traversal",
            AttackFamily::CommandInjection => "command_injection",
        }
    }

    pub fn violation(&self) -> ViolationKind {
        match self {
            AttackFamily::SqlInjection => ViolationKind::SqlInjection,
            AttackFamily::ScriptInjection => ViolationKind::ScriptInjection,
            AttackFamily::PathTraversal => ViolationKind::PathTraversal,
            AttackFamily::CommandInjection => ViolationKind::CommandInjection,
        }
    }

    /// Compiled patterns of this family
    pub fn patterns(&self) -> &'static [Regex] {
        match self {
            AttackFamily::SqlInjection => SignatureRegistry::sql_injection(),
            AttackFamily::ScriptInjection => SignatureRegistry::script_injection(),
            AttackFamily::PathTraversal => SignatureRegistry::path_traversal(),
            AttackFamily::CommandInjection => SignatureRegistry::command_injection(),
        }
    }

    /// First pattern of this family matching `value`
    pub fn first_match(&self, value: &str) -> Option<&'static Regex> {
        self.patterns().iter().find(|re| re.is_match(value))
    }
}

impl fmt::Display for AttackFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[allow(clippy::unwrap_used)]
fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!("(?i){p}")).unwrap())
        .collect()
}

/// Centralized registry of signature and content-marker patterns.
///
/// All patterns are vetted literals compiled once on first use.
pub struct SignatureRegistry;

impl SignatureRegistry {
    pub fn sql_injection() -> &'static [Regex] {
        static SQL: LazyLock<Vec<Regex>> = LazyLock::new(|| {
            compile(&[
                r"(\bor\b|\band\b)\s+\d+\s*=\s*\d+",
                r"union\s+select",
                r"drop\s+table",
                r"insert\s+into",
                r"delete\s+from",
                r"update\s+set",
                r"exec\s*\(",
                r"script\s*>",
            ])
        });
        &SQL
    }

    pub fn script_injection() -> &'static [Regex] {
        static SCRIPT: LazyLock<Vec<Regex>> = LazyLock::new(|| {
            compile(&[
                r"<script[^>]*>.*?</script>",
                r"javascript:",
                r"on\w+\s*=",
                r"<iframe[^>]*>",
                r"<object[^>]*>",
                r"<embed[^>]*>",
            ])
        });
        &SCRIPT
    }

    pub fn path_traversal() -> &'static [Regex] {
        static TRAVERSAL: LazyLock<Vec<Regex>> =
            LazyLock::new(|| compile(&[r"\.\./", r"\.\.\\", r"\.\.%2f", r"\.\.%5c"]));
        &TRAVERSAL
    }

    pub fn command_injection() -> &'static [Regex] {
        static COMMAND: LazyLock<Vec<Regex>> = LazyLock::new(|| {
            compile(&[
                r";\s*(rm|del|cat|type|echo|wget|curl)",
                r"\|\s*(nc|netcat|telnet)",
                r"`[^`]*`",
                r"\$\([^)]*\)",
            ])
        });
        &COMMAND
    }

    /// Interpreter and script markers looked for in uploaded content
    pub fn file_markers() -> &'static [Regex] {
        static MARKERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
            compile(&[
                r"<\?php",
                r"<script",
                r"eval\s*\(",
                r"exec\s*\(",
                r"shell_exec",
                r"system\s*\(",
            ])
        });
        &MARKERS
    }

    /// Characters that have no business in proxy or client headers
    pub fn suspicious_header() -> &'static Regex {
        static HEADER: LazyLock<Regex> = LazyLock::new(|| {
            #[allow(clippy::unwrap_used)]
            Regex::new(r#"(?i)<script|javascript:|[<>"']"#).unwrap()
        });
        &HEADER
    }
}
