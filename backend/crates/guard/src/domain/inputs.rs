//! Collected request inputs

use percent_encoding::percent_decode_str;
use serde_json::Value;

use super::scanner::{Finding, InputScanner, json_field_count};
use super::upload::UploadedFile;

/// Parsed request body
#[derive(Debug, Clone, Default)]
pub enum BodyInput {
    #[default]
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
    Multipart {
        fields: Vec<(String, String)>,
        files: Vec<UploadedFile>,
    },
    /// Body of a type we do not inspect
    Opaque,
}

/// Everything user-controlled the guard inspects
#[derive(Debug, Clone, Default)]
pub struct RequestInputs {
    pub query: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    pub body: BodyInput,
}

impl RequestInputs {
    /// Number of distinct fields across query, body and cookies
    pub fn field_count(&self) -> usize {
        let body = match &self.body {
            BodyInput::Json(value) => json_field_count(value),
            BodyInput::Form(pairs) => pairs.len(),
            BodyInput::Multipart { fields, files } => fields.len() + files.len(),
            BodyInput::Empty | BodyInput::Opaque => 0,
        };
        self.query.len() + self.cookies.len() + body
    }

    /// Scan every string value in query, body and cookies
    pub fn scan(&self, scanner: &InputScanner) -> Vec<Finding> {
        let pairs = |list: &[(String, String)]| -> Vec<Finding> {
            scanner.scan_pairs(list.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        };

        let mut findings = pairs(self.query.as_slice());
        match &self.body {
            BodyInput::Json(value) => findings.extend(scanner.scan_json(value)),
            BodyInput::Form(fields) | BodyInput::Multipart { fields, .. } => {
                findings.extend(pairs(fields.as_slice()))
            }
            BodyInput::Empty | BodyInput::Opaque => {}
        }
        findings.extend(pairs(self.cookies.as_slice()));
        findings
    }

    pub fn files(&self) -> &[UploadedFile] {
        match &self.body {
            BodyInput::Multipart { files, .. } => files,
            _ => &[],
        }
    }
}

/// Split a `Cookie` header value into percent-decoded name/value pairs
///
/// Values are scanned the way cookie readers will see them, so an encoded
/// payload cannot slip past the signature catalogs.
pub fn parse_cookie_pairs<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<(String, String)> {
    values
        .into_iter()
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            Some((decode_cookie(name), decode_cookie(value)))
        })
        .collect()
}

fn decode_cookie(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}
