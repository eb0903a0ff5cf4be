//! Top-level coordination for folio: configuration, single-flight
//! cancellation, and the query session tying retrieval to generation.

pub mod config;
pub mod cursor;
pub mod error;
pub mod flight;
pub mod session;

pub use config::Config;
pub use cursor::PageCursor;
pub use error::CoreError;
pub use flight::FlightGuard;
pub use session::{Answer, QuerySession};
