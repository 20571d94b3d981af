mod error;
mod handler;
mod outcome;

pub use error::ReportError;
pub use handler::{manufacture_query_string, RequestHandler};
pub use outcome::SendOutcome;
