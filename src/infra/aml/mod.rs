//! AML provider implementations.

pub mod metasleuth;

pub use metasleuth::{DEFAULT_METASLEUTH_API_URL, MetaSleuthProvider};
