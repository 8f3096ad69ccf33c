//! mapserve: serve files, directories, archives, uploads and proxies from
//! `endpoint:source` mappings.

pub mod adapters;
pub mod archive;
pub mod compression;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod mapping;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::schema::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
