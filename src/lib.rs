pub mod error;
pub mod record;
pub mod severity;
pub mod timestamp;
pub mod http_request;
pub mod formatter;

pub mod sink;
pub mod layer;
pub mod init;
pub mod env;
pub mod noop_sink;
pub mod stdout_sink;

pub use error::FormatError;
pub use formatter::{Formatter, FormatterConfig};
pub use http_request::{HttpRequest, RequestInfo};
pub use record::{FieldValue, Level, LogRecord};
pub use severity::SeverityMap;
