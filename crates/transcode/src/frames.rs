//! Raw rgb24 frames piped in and out of ffmpeg

use crate::{x264_args, EncoderSettings, TranscodeError, Transcoder, VideoInfo};
use image::RgbImage;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use tracing::{debug, warn};

/// Destination for a sequence of decoded frames
pub trait FrameSink {
    fn push(&mut self, frame: &RgbImage) -> Result<(), TranscodeError>;
}

impl FrameSink for Vec<RgbImage> {
    fn push(&mut self, frame: &RgbImage) -> Result<(), TranscodeError> {
        Vec::push(self, frame.clone());
        Ok(())
    }
}

fn spawn_error(e: std::io::Error) -> TranscodeError {
    TranscodeError::FfmpegError(format!("Failed to execute ffmpeg: {e}"))
}

fn stderr_of(child: &mut Child) -> String {
    let mut stderr = String::new();
    if let Some(pipe) = child.stderr.as_mut() {
        let _ = pipe.read_to_string(&mut stderr);
    }
    stderr.trim().to_string()
}

/// Decoded frames of a video, one [`RgbImage`] per frame
pub struct RawFrameReader {
    child: Child,
    stdout: ChildStdout,
    width: u32,
    height: u32,
    frame_len: usize,
    frames: u64,
    done: bool,
}

impl RawFrameReader {
    fn finish(&mut self) -> Result<(), TranscodeError> {
        self.done = true;
        let stderr = stderr_of(&mut self.child);
        let status = self.child.wait()?;
        if !status.success() {
            return Err(TranscodeError::FfmpegError(format!(
                "ffmpeg decode exited with {status}: {stderr}"
            )));
        }
        debug!("Decoded {} frames", self.frames);
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<RgbImage>, TranscodeError> {
        let frame_len = self.frame_len;
        let mut buf = vec![0u8; frame_len];
        let mut filled = 0;
        while filled < frame_len {
            match self.stdout.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if filled == 0 {
            self.finish()?;
            return Ok(None);
        }
        if filled < frame_len {
            self.finish()?;
            return Err(TranscodeError::FfmpegError(format!(
                "truncated frame {}: got {filled} of {frame_len} bytes",
                self.frames
            )));
        }

        self.frames += 1;
        RgbImage::from_raw(self.width, self.height, buf)
            .map(Some)
            .ok_or_else(|| TranscodeError::FfmpegError("frame buffer size mismatch".to_string()))
    }
}

impl Iterator for RawFrameReader {
    type Item = Result<RgbImage, TranscodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => None,
            Err(e) => {
                if !self.done {
                    let _ = self.child.kill();
                    self.done = true;
                }
                Some(Err(e))
            }
        }
    }
}

impl Drop for RawFrameReader {
    fn drop(&mut self) {
        if !self.done {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

/// Encoder fed with raw frames over stdin
pub struct RawFrameWriter {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    width: u32,
    height: u32,
    frames: u64,
}

impl RawFrameWriter {
    /// Close the pipe and wait for the encoder to finish
    pub fn finish(mut self) -> Result<u64, TranscodeError> {
        drop(self.stdin.take());
        let child = self
            .child
            .take()
            .ok_or_else(|| TranscodeError::FfmpegError("encoder already finished".to_string()))?;
        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscodeError::FfmpegError(format!(
                "ffmpeg encode exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        debug!("Encoded {} frames", self.frames);
        Ok(self.frames)
    }
}

impl FrameSink for RawFrameWriter {
    fn push(&mut self, frame: &RgbImage) -> Result<(), TranscodeError> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(TranscodeError::InvalidConfig(format!(
                "frame is {}x{}, encoder expects {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| TranscodeError::FfmpegError("encoder input closed".to_string()))?;

        if let Err(e) = stdin.write_all(frame.as_raw()) {
            if e.kind() == ErrorKind::BrokenPipe {
                drop(self.stdin.take());
                let stderr = self.child.as_mut().map(stderr_of).unwrap_or_default();
                return Err(TranscodeError::FfmpegError(format!(
                    "ffmpeg encoder stopped reading: {stderr}"
                )));
            }
            return Err(e.into());
        }
        self.frames += 1;
        Ok(())
    }
}

impl Drop for RawFrameWriter {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if self.stdin.take().is_some() {
                warn!("Frame writer dropped before finish; stopping ffmpeg");
                let _ = child.kill();
            }
            let _ = child.wait();
        }
    }
}

impl Transcoder {
    /// Stream every frame of `input`'s first video stream as rgb24
    pub fn read_frames(
        &self,
        input: &Path,
        info: &VideoInfo,
    ) -> Result<RawFrameReader, TranscodeError> {
        if !input.exists() {
            return Err(TranscodeError::FileNotFound(input.display().to_string()));
        }

        let mut cmd = Command::new(self.ffmpeg());
        cmd.args(["-v", "error", "-nostdin", "-i"])
            .arg(input)
            .args([
                "-map",
                "0:v:0",
                "-fps_mode",
                "passthrough",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgb24",
                "-",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        debug!("FFmpeg command: {:?}", cmd);

        let mut child = cmd.spawn().map_err(spawn_error)?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TranscodeError::FfmpegError("ffmpeg stdout unavailable".to_string()))?;

        Ok(RawFrameReader {
            child,
            stdout,
            width: info.width,
            height: info.height,
            frame_len: info.frame_len(),
            frames: 0,
            done: false,
        })
    }

    /// Start an encoder writing `output` from frames of `info`'s geometry and rate
    pub fn write_frames(
        &self,
        output: &Path,
        info: &VideoInfo,
        settings: &EncoderSettings,
    ) -> Result<RawFrameWriter, TranscodeError> {
        let mut cmd = Command::new(self.ffmpeg());
        cmd.args(["-y", "-v", "error", "-f", "rawvideo", "-pix_fmt", "rgb24", "-s"])
            .arg(format!("{}x{}", info.width, info.height))
            .args(["-framerate", info.frame_rate.as_str(), "-i", "-"])
            .args(x264_args(settings, None))
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        debug!("FFmpeg command: {:?}", cmd);

        let mut child = cmd.spawn().map_err(spawn_error)?;
        let stdin = child.stdin.take();

        Ok(RawFrameWriter {
            child: Some(child),
            stdin,
            width: info.width,
            height: info.height,
            frames: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect<S: FrameSink>(sink: &mut S, frames: &[RgbImage]) -> Result<(), TranscodeError> {
        for frame in frames {
            sink.push(frame)?;
        }
        Ok(())
    }

    #[test]
    fn test_vec_sink_keeps_order() {
        let frames: Vec<RgbImage> = (0..3u8)
            .map(|i| RgbImage::from_pixel(2, 2, image::Rgb([i, i, i])))
            .collect();
        let mut sink: Vec<RgbImage> = Vec::new();
        collect(&mut sink, &frames).unwrap();
        assert_eq!(sink, frames);
    }

    #[test]
    fn test_read_frames_missing_input() {
        let info = VideoInfo {
            width: 2,
            height: 2,
            frame_rate: "25/1".to_string(),
            codec_name: None,
            frame_count: None,
        };
        let result = Transcoder::default().read_frames(Path::new("/nonexistent.mp4"), &info);
        assert!(matches!(result, Err(TranscodeError::FileNotFound(_))));
    }
}
