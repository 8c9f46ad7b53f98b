pub mod app;
pub mod auth;
pub mod composer;
pub mod config;
pub mod deadline;
pub mod error;
pub mod graph;
pub mod images;
pub mod posts;
pub mod relations;
pub mod state;
pub mod storage;
pub mod users;
