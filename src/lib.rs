pub mod api;
pub mod config;
pub mod engine;
pub mod entities;
pub mod error;
pub mod external;
pub mod geo;
pub mod notify;
pub mod pubsub;
pub mod realtime;
pub mod registry;
pub mod server;
pub mod store;
