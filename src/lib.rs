//! Visitor counter: each invocation atomically adds one to a single counter
//! record in a key-value store and returns the new total.
//!
//! The handler can be run under the AWS Lambda runtime or served over HTTP
//! with Dropshot.  Both share one store client per process.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod lambda;
pub mod model;
pub mod schema;
pub mod store;

pub use error::CounterError;
pub use handler::Handler;
pub use handler::ReadMode;
pub use model::CounterResponse;
