//! Middleware modules for the Vinyl API
//!
//! - `client_context`: creates the per-request call ledger
//! - `json_logger`: emits one structured log event per request from the ledger
//! - `error_responder`: renders errors attached by handlers
//!
//! # Middleware Order
//!
//! Outermost first, as assembled by [`crate::routes::create_api_router`]:
//!
//! ```text
//! trace_middleware          server span, W3C traceparent
//! client_context_middleware ledger in request extensions
//! json_logger_middleware    status + latency into ledger, log event
//! error_responder_middleware
//! timeout
//! handler
//! ```
//!
//! The logger sits outside the responder so it sees the final status.

mod client_context;
mod error_responder;
mod json_logger;

pub use client_context::{client_context_middleware, ClientContextState};
pub use error_responder::{error_responder_middleware, handle_middleware_error};
pub use json_logger::json_logger_middleware;
