//! Service Layer
//!
//! Business logic that sits between the route handlers and the repository.

mod album_service;

pub use album_service::*;
