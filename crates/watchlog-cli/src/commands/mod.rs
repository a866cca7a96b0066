pub mod clear;
pub mod config;
pub mod context;
pub mod history;
pub mod import;
pub mod metadata;
pub mod progress;
pub mod recommend;
pub mod stats;
