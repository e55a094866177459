//! URL safety: the SSRF gate every outbound request passes through.
//!
//! - `validate` decides from the URL alone whether it may be contacted
//! - `SafeResolver` re-checks resolved addresses at connect time when the
//!   reqwest transport is built with DNS pinning enabled

mod safe_resolver;
mod types;
mod url_validation;

pub use safe_resolver::SafeResolver;
pub use types::{SafeUrl, ValidationError};
pub use url_validation::{is_hostname_blocked, parse_and_check_structure, validate};
