//! HTTP request handlers

pub mod health;
pub mod research;
pub mod types;

pub use health::*;
pub use research::*;
