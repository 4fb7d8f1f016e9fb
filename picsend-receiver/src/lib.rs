//! # picsend-receiver: image receiver service
//!
//! Listens for picsend senders, reads one length-prefixed frame per
//! connection, and stores each received image under
//! `<save_root>/<YYYY-MM-DD>/<HHMMSS>.jpg`.

pub mod config;
pub mod service;
pub mod store;
