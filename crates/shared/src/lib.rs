//! Types shared between the voice agent client and its front ends.

pub mod domain;
pub mod error;
pub mod protocol;
