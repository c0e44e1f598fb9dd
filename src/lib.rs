pub mod admin;
pub mod agents;
pub mod app;
pub mod assist;
pub mod auth;
pub mod config;
pub mod error;
pub mod guard;
pub mod interactions;
pub mod moderation;
pub mod profiles;
pub mod session;
pub mod state;
pub mod store;
