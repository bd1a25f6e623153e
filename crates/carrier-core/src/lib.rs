//! Hides still images inside the I-frames of an H.264 stream and restores
//! a playable video from such a carrier.
//!
//! Encode picks every Nth frame, re-encodes the video so that exactly those
//! frames are IDR units, and overwrites each IDR payload with a compressed
//! still of its frame. Decode reads each hidden still back, re-encodes it on
//! its own, and splices the resulting I-frame in place of the hidden bytes.

pub mod config;
pub mod payload;
pub mod pipeline;
pub mod recover;
pub mod regenerate;
pub mod scratch;
pub mod select;
pub mod substitute;

pub use config::{default_config_path, load_config, Config};
pub use payload::{encode_payload, is_carrier_payload, parse_payload, PayloadHeader};
pub use pipeline::{
    inspect_stream, Carrier, DecodeReport, EncodeReport, ExtractReport, StreamReport,
    VerifyReport, CARRIER_EXTENSION,
};
pub use recover::RecoveryEngine;
pub use regenerate::{first_idr_payload, PayloadRegenerator, SingleFrameEncoder};
pub use scratch::ScratchFiles;
pub use select::{select_frames, FrameBlob};
pub use substitute::{read_unit_payload, substitute, write_unit_payload};
