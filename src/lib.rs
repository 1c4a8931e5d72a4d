#![forbid(unsafe_code)]

//! Static page generator for a yt-dlp video archive.
//!
//! The library turns `.info.json` sidecars and the media files next to them
//! into one HTML page per video; the `build_pages` binary wires it to the
//! site configuration.

pub mod channels;
pub mod comments;
pub mod config;
pub mod error;
pub mod metadata;
pub mod templates;
pub mod util;
pub mod videos;
