// Library root for the keeper secret storage service

pub mod api;
pub mod auth;
pub mod config;
pub mod core;
pub mod metadata;
pub mod service;
pub mod storage;
