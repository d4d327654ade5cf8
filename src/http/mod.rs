//! Public HTTP surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum router, timeout and trace layers)
//!     → request.rs (assign or keep X-Request-ID)
//!     → booking service (fallback chain per category)
//!     → response.rs (JSON body plus provenance headers)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{request_id, X_REQUEST_ID};
pub use server::{serve, AppState, HttpServer};
