//! # Service Layer
//!
//! The connection handler collaborators around the codec core: a TCP
//! server running one task per accepted connection, and a client wrapping
//! a framed stream with request/acknowledgement round trips.

pub mod client;
pub mod server;
