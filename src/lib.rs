pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod ordering;
pub mod progress;
pub mod repository;
pub mod routes;
pub mod session;
pub mod stats;
