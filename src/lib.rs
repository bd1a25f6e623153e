//! iframe-carrier: hide still images inside the I-frames of an H.264 stream.
//!
//! Facade over the workspace crates; the `iframe-carrier` binary lives in
//! `crates/carrier-cli`.

pub use carrier_codec as codec;
pub use carrier_common as common;
pub use carrier_core as engine;
pub use carrier_nal as nal;
pub use carrier_transcode as transcode;

pub use carrier_common::{CarrierError, Result, StreamStats};
pub use carrier_core::{Carrier, Config};
