//! API Module
//!
//! HTTP handlers and routing for the cache server REST API.
//!
//! # Endpoints
//! - `PUT /set`, `GET /get/:key`, `DELETE /del/:key` - Default store entries
//! - `PUT /expire/:key` - Reset the TTL of a default store entry
//! - `GET /keys`, `DELETE /clear` - Default store listing and reset
//! - `GET|POST /caches`, `DELETE /caches/:name` - Named cache lifecycle
//! - `/caches/:name/items[/:key]` - Items of a named cache
//! - `GET /caches/:name/search`, `POST /caches/:name/find` - Search
//! - `GET|DELETE /caches/:name/stats`, `GET /stats` - Statistics
//! - `POST /caches/:name/backup`, `GET|DELETE /backups`, `POST /backups/restore` - Backups
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
