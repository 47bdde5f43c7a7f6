//! skybus Module SDK - client side of the broker protocol
//!
//! A module binds its own UDP socket, announces its identity to the broker
//! (declaring the message types it wants), and then exchanges envelopes over
//! the chunked transport. The broker learns the module's address from the
//! identity announcements, so a module must announce before it can receive.

pub mod client;

pub use client::*;
