//! Token acquisition on top of the shared cache

pub mod service;

pub use service::SilentTokenService;
