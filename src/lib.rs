pub mod chart;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod state;
