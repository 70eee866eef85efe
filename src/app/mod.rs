pub mod auth;
pub mod bidder;
pub mod chat;
pub mod dashboard;
pub mod metrics;
pub mod seed;
