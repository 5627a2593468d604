pub mod error_codes;
pub mod log_redact;
pub mod params;

// Re-export commonly used functions
pub use error_codes::{ErrorCode, ErrorResponse};
pub use log_redact::{redact_address, redact_descriptor};
