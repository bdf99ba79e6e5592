//! # Mist Server
//!
//! REST resource handlers for Mist.
//!
//! This crate provides:
//! - Note and contact endpoints, scoped to the caller
//! - User registration, login and profile endpoints
//! - Import and export endpoints negotiated by content type
//! - Authentication (HMAC-SHA256 signed tokens)
//! - Configuration loading and store bootstrap
//!
//! # Routes
//!
//! | method | path | action |
//! |---|---|---|
//! | OPTIONS | any | CORS preflight |
//! | POST | `/user/login` | log in, returns a token |
//! | POST | `/user` | register |
//! | GET, PUT, PATCH, DELETE | `/user` | current user |
//! | GET, POST | `/note`, `/contact` | list, insert |
//! | GET | `/note/{id}`, `/contact/{id}` | find |
//! | PUT, PATCH | `/note/{id}`, `/contact/{id}` | merge fields, 409 when nothing changed |
//! | DELETE | `/note/{id}`, `/contact/{id}` | remove |
//! | POST | `/note/import`, `/contact/import` | import by `Content-Type` |
//! | GET | `/note/export`, `/contact/export` | export by `Accept` |
//!
//! Every route but login, register and preflight needs a token, sent as
//! `Authorization: Bearer <token>` or `Api-Token: <token>`.
//!
//! # Hosting
//!
//! The crate binds no socket. A host converts its requests into
//! `http::Request<Vec<u8>>` and calls [`ApiServer::handle`].

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod auth;
mod config;
mod error;
mod handler;
mod router;
mod server;

pub use auth::{
    token_from_headers, AuthConfig, Claims, IssuedToken, TokenValidator, API_TOKEN_HEADER,
    DEFAULT_TOKEN_EXPIRY,
};
pub use config::{AuthSection, HttpConfig, ServerConfig, DEFAULT_CONFIG_FILE};
pub use error::{ServerError, ServerResult};
pub use handler::{error_reply, HandlerContext, Reply, RequestHandler};
pub use router::{Action, Resource, Route};
pub use server::{ApiServer, ALLOWED_HEADERS, ALLOWED_METHODS, ALLOWED_ORIGIN};
