//! Wire protocol — JSON bodies, header names, and the content codec.

pub mod codec;
pub mod protocol;
