//! Domain Layer
//!
//! Signature catalog, input scanning, upload checks, CSRF tokens and
//! hardening headers. Nothing here touches the network or a store.

pub mod csrf;
pub mod headers;
pub mod incident;
pub mod inputs;
pub mod scanner;
pub mod signatures;
pub mod upload;

pub use csrf::{CsrfProtector, CsrfToken};
pub use incident::{RequestOrigin, SecurityIncident};
pub use inputs::{BodyInput, RequestInputs};
pub use scanner::{Finding, InputScanner};
pub use signatures::{AttackFamily, SignatureRegistry};
pub use upload::{UploadPolicy, UploadReport, UploadedFile, validate_upload};
