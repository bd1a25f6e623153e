//! Frame selection: every Nth frame becomes a hidden blob

use carrier_codec::FrameCodec;
use carrier_common::{CarrierError, Result};
use carrier_transcode::{FrameSink, TranscodeError};
use image::RgbImage;
use tracing::{debug, info};

/// Compressed still image of one selected frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBlob {
    /// Source frame index
    pub index: u64,
    pub bytes: Vec<u8>,
}

/// Pack every `interval`th frame and forward the whole sequence to `sink`
///
/// A selected frame is replaced in the forwarded sequence by the image its
/// blob decodes to, so the encoder sees what decode will recover.
pub fn select_frames<I, S>(
    frames: I,
    sink: &mut S,
    interval: u32,
    codec: &FrameCodec,
) -> Result<Vec<FrameBlob>>
where
    I: IntoIterator<Item = std::result::Result<RgbImage, TranscodeError>>,
    S: FrameSink + ?Sized,
{
    if interval == 0 {
        return Err(CarrierError::InvalidConfig(
            "interval must be at least 1".to_string(),
        ));
    }

    let mut blobs = Vec::new();
    let mut total = 0u64;
    for (index, frame) in frames.into_iter().enumerate() {
        let frame = frame?;
        let index = index as u64;
        total += 1;

        if index % u64::from(interval) == 0 {
            let (bytes, round_tripped) = codec.round_trip(&frame)?;
            debug!("Selected frame {}: {} byte blob", index, bytes.len());
            sink.push(&round_tripped)?;
            blobs.push(FrameBlob { index, bytes });
        } else {
            sink.push(&frame)?;
        }
    }

    info!(
        "Selected {} of {} frames (interval {})",
        blobs.len(),
        total,
        interval
    );
    Ok(blobs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use carrier_codec::{Compression, JpegCodec, PngCodec};
    use image::Rgb;

    fn frames(count: u8) -> Vec<std::result::Result<RgbImage, TranscodeError>> {
        (0..count)
            .map(|i| Ok(RgbImage::from_pixel(8, 8, Rgb([i * 20, 255 - i * 20, 77]))))
            .collect()
    }

    #[test]
    fn test_interval_one_selects_every_frame() {
        let codec = FrameCodec::new(Box::new(PngCodec), Compression::Deflate);
        let mut sink: Vec<RgbImage> = Vec::new();
        let blobs = select_frames(frames(3), &mut sink, 1, &codec).unwrap();

        assert_eq!(blobs.len(), 3);
        assert_eq!(
            blobs.iter().map(|b| b.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(sink.len(), 3);
    }

    #[test]
    fn test_interval_larger_than_video_selects_first_frame() {
        let codec = FrameCodec::default();
        let mut sink: Vec<RgbImage> = Vec::new();
        let blobs = select_frames(frames(4), &mut sink, 10, &codec).unwrap();

        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].index, 0);
        assert_eq!(sink.len(), 4);
    }

    #[test]
    fn test_every_nth_frame() {
        let codec = FrameCodec::default();
        let mut sink: Vec<RgbImage> = Vec::new();
        let blobs = select_frames(frames(7), &mut sink, 3, &codec).unwrap();
        assert_eq!(
            blobs.iter().map(|b| b.index).collect::<Vec<_>>(),
            vec![0, 3, 6]
        );
    }

    #[test]
    fn test_selected_frames_are_forwarded_round_tripped() {
        let codec = FrameCodec::new(Box::new(JpegCodec::new(40).unwrap()), Compression::None);
        let source = frames(4);
        let mut sink: Vec<RgbImage> = Vec::new();
        let blobs = select_frames(source, &mut sink, 2, &codec).unwrap();

        for blob in &blobs {
            let forwarded = &sink[blob.index as usize];
            assert_eq!(&codec.unpack(&blob.bytes).unwrap(), forwarded);
        }
        // Unselected frames pass through untouched
        assert_eq!(sink[1], RgbImage::from_pixel(8, 8, Rgb([20, 235, 77])));
    }

    #[test]
    fn test_zero_interval_and_empty_source() {
        let codec = FrameCodec::default();
        let mut sink: Vec<RgbImage> = Vec::new();
        assert!(matches!(
            select_frames(frames(2), &mut sink, 0, &codec),
            Err(CarrierError::InvalidConfig(_))
        ));
        assert!(select_frames(frames(0), &mut sink, 5, &codec)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_source_error_propagates() {
        let codec = FrameCodec::default();
        let mut sink: Vec<RgbImage> = Vec::new();
        let source = vec![Err(TranscodeError::FfmpegError("decoder died".into()))];
        assert!(matches!(
            select_frames(source, &mut sink, 1, &codec),
            Err(CarrierError::FFmpegError(_))
        ));
    }
}
