//! # picsend: image sender
//!
//! Desktop counterpart of the mobile capture clients: takes an image
//! file as the "capture", re-encodes it (or sends it raw), and pushes it
//! to a picsend receiver as one length-prefixed frame.

pub mod config;
pub mod send;
