pub mod activity;
pub mod admin_user;
pub mod bidder;
pub mod chat;
pub mod finance;
pub mod flag;
pub mod moderation;
pub mod service;
pub mod ticket;
pub mod validate;
