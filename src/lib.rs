pub mod config;
pub mod db;
pub mod monitor;
pub mod notifications;
pub mod probes;
pub mod settings;
pub mod targets;
pub mod web;
