pub mod api;
pub mod boards;
pub mod changelog;
pub mod comments;
pub mod config;
pub mod database;
pub mod error;
pub mod feedback;
pub mod pipeline;
pub mod roadmap;
pub mod telemetry;
pub mod utils;
pub mod votes;
