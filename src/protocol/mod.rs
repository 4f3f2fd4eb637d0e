//! # Protocol Layer
//!
//! Request routing above the codecs: a tag-keyed dispatcher mapping each
//! packet variant to a handler that produces the response packet.

pub mod dispatcher;
