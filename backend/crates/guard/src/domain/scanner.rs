//! Input scanner
//!
//! Walks request inputs and matches every string against the signature
//! catalog. Nested JSON is visited recursively, keys rendered as
//! `outer[inner]`, and anything nested deeper than the configured limit is
//! skipped.

use serde_json::Value;

use super::signatures::AttackFamily;

/// One signature hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub family: AttackFamily,
    /// Source of the matching pattern
    pub pattern: &'static str,
    /// Input key, nested keys as `a[b][c]`
    pub key: String,
    pub value: String,
}

/// Signature scanner with a recursion limit
#[derive(Debug, Clone, Copy)]
pub struct InputScanner {
    max_depth: usize,
}

impl InputScanner {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Match one string against every family
    ///
    /// Each family contributes at most its first matching pattern.
    pub fn scan_str(&self, key: &str, value: &str, findings: &mut Vec<Finding>) {
        for family in AttackFamily::ALL {
            if let Some(re) = family.first_match(value) {
                findings.push(Finding {
                    family,
                    pattern: re.as_str(),
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
        }
    }

    /// Scan a JSON value found under `key`
    pub fn scan_value(&self, key: &str, value: &Value, findings: &mut Vec<Finding>) {
        self.visit(key, value, 0, findings);
    }

    /// Scan flat key/value pairs (query string, form body, cookies)
    pub fn scan_pairs<'a, I>(&self, pairs: I) -> Vec<Finding>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut findings = Vec::new();
        for (key, value) in pairs {
            self.scan_str(key, value, &mut findings);
        }
        findings
    }

    /// Scan a JSON document; top-level object members keep their own names
    pub fn scan_json(&self, root: &Value) -> Vec<Finding> {
        let mut findings = Vec::new();
        match root {
            Value::Object(map) => {
                for (key, value) in map {
                    self.scan_value(key, value, &mut findings);
                }
            }
            other => self.scan_value("body", other, &mut findings),
        }
        findings
    }

    fn visit(&self, key: &str, value: &Value, depth: usize, findings: &mut Vec<Finding>) {
        match value {
            Value::String(s) => self.scan_str(key, s, findings),
            Value::Object(map) => {
                if depth >= self.max_depth {
                    return;
                }
                for (sub, value) in map {
                    self.visit(&format!("{key}[{sub}]"), value, depth + 1, findings);
                }
            }
            Value::Array(items) => {
                if depth >= self.max_depth {
                    return;
                }
                for (index, value) in items.iter().enumerate() {
                    self.visit(&format!("{key}[{index}]"), value, depth + 1, findings);
                }
            }
            _ => {}
        }
    }
}

/// Number of input fields a JSON document contributes
///
/// Top-level members of an object count once each; any other document is
/// a single field.
pub fn json_field_count(root: &Value) -> usize {
    match root {
        Value::Object(map) => map.len(),
        Value::Null => 0,
        _ => 1,
    }
}
