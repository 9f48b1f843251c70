pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod fetch;
pub mod ingest;
pub mod parser;
pub mod record;
pub mod synthetic;
