pub mod api;
pub mod auth;
pub mod config;
pub mod engine;
pub mod entities;
pub mod error;
pub mod external;
pub mod fare;
pub mod geo;
pub mod notify;
pub mod server;
pub mod tracking;
