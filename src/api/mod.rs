pub mod auth;
pub mod home;
pub mod jobs;
pub mod middleware;
pub mod notice;
pub mod profile;
pub mod server;
pub mod views;
