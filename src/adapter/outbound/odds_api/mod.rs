//! REST odds provider adapter.

pub mod client;
pub mod dto;

pub use client::OddsApiClient;
