//! HTTP request handlers.

pub mod accounts;
pub mod billing;
pub mod credits;
pub mod health;
pub mod webhooks;
