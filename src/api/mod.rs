//! API client module

pub mod cache;
pub mod client;
pub mod dispatch;
#[cfg(test)]
pub mod memory;
pub mod response;
mod service;

pub use client::ApiClient;
pub use service::ConfigService;
