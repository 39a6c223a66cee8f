//! Request and Response models for the cache server API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{
    validate_cache_name, BackupCleanupQuery, BackupListQuery, CreateCacheRequest, ExpireRequest,
    FindRequest,
    RestoreRequest, SearchQuery, SetRequest,
};
pub use responses::{
    BackupListResponse, BackupResponse, CacheListResponse, CacheStatsResponse, CleanupResponse,
    ClearResponse, DeleteResponse, FindResponse, GetResponse, HealthResponse, ItemsResponse,
    KeysResponse, MessageResponse, RestoreResponse, SearchMatch, SearchResponse, SetResponse,
    StatsResponse,
};
