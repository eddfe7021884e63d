//! Reader and writer for Spine 3.5 binary skeleton data (`.skel`).
//!
//! The crate is IO-free: decoding takes `&[u8]`, encoding returns `Vec<u8>`. Renderer
//! resources are attached through an [`AttachmentLoader`].

#![forbid(unsafe_code)]

mod arena;
mod attachment;
mod cursor;
mod decode;
mod encode;
mod error;
mod model;
mod timeline;
mod version;

pub use arena::*;
pub use attachment::*;
pub use cursor::*;
pub use decode::SkeletonDecoder;
pub use encode::{EncodeOptions, SkeletonEncoder};
pub use error::Error;
pub use model::*;
pub use timeline::*;
pub use version::*;

#[cfg(test)]
mod test_bytes;

#[cfg(test)]
mod decode_tests;
