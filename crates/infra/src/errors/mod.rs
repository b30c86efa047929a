//! Infrastructure error conversions

mod conversions;

pub use conversions::{classify_transport_error, InfraError};
