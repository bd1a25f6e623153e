//! Encode pipeline against stand-in ffmpeg / ffprobe scripts
//!
//! The scripts log every ffmpeg command line, refuse to write over their own
//! input, and emit three black 2x2 frames or a three-IDR elementary stream.
#![cfg(unix)]

use carrier_codec::FrameCodec;
use carrier_core::Carrier;
use carrier_nal::Backend;
use carrier_transcode::{EncoderSettings, Transcoder, X264Preset};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

// Writing an executable while another test forks can fail with ETXTBSY
static SCRIPTS: Mutex<()> = Mutex::new(());

const FFPROBE: &str = r#"#!/bin/sh
echo '{"streams":[{"codec_name":"h264","width":2,"height":2,"r_frame_rate":"10/1","nb_frames":"3"}]}'
"#;

const FFMPEG: &str = r#"#!/bin/sh
echo "$*" >> "$(dirname "$0")/ffmpeg.log"
prev=""
for arg in "$@"; do
    if [ "$prev" = "-i" ]; then input="$arg"; fi
    prev="$arg"
    output="$arg"
done
if [ "$input" = "$output" ]; then
    echo "Output $output same as Input #0 - exiting" >&2
    exit 1
fi
if [ "$input" = "-" ]; then cat > /dev/null; fi
case "$output" in
    -) head -c 36 /dev/zero ;;
    *.264)
        printf '\000\000\000\001\147\102\000\036' > "$output"
        for i in 1 2 3; do printf '\000\000\001\145\210\204\200' >> "$output"; done
        ;;
    *) : > "$output" ;;
esac
"#;

struct Tools {
    bin: TempDir,
    transcoder: Transcoder,
}

impl Tools {
    fn install() -> Self {
        let bin = TempDir::new().unwrap();
        let ffmpeg = script(bin.path(), "ffmpeg", FFMPEG);
        let ffprobe = script(bin.path(), "ffprobe", FFPROBE);
        Self {
            transcoder: Transcoder::new(ffmpeg, ffprobe),
            bin,
        }
    }

    /// Logged ffmpeg command lines, keyed by their output path
    fn commands(&self) -> Vec<(String, String)> {
        std::fs::read_to_string(self.bin.path().join("ffmpeg.log"))
            .unwrap()
            .lines()
            .map(|line| {
                let output = line.split_whitespace().last().unwrap().to_string();
                (output, line.to_string())
            })
            .collect()
    }

    fn command_writing(&self, name: &str) -> String {
        self.commands()
            .into_iter()
            .find(|(output, _)| output.ends_with(name))
            .map(|(_, line)| line)
            .unwrap_or_else(|| panic!("no ffmpeg command wrote {name}"))
    }
}

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn carrier(tools: &Tools) -> Carrier {
    let settings = EncoderSettings::new(X264Preset::Ultrafast, 23).unwrap();
    Carrier::new(
        tools.transcoder.clone(),
        FrameCodec::default(),
        settings,
        Backend::Streaming,
    )
}

#[test]
fn test_elementary_stream_input_gets_distinct_plain_stream() {
    let _guard = SCRIPTS.lock().unwrap_or_else(|e| e.into_inner());
    let tools = Tools::install();
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("clip.264");
    std::fs::write(&input, [0, 0, 0, 1, 0x65, 0x88]).unwrap();

    let report = carrier(&tools).encode(&input, 1, false).unwrap();

    assert_eq!(report.plain_stream, dir.path().join("clip_enc_2.264"));
    assert!(report.plain_stream.exists());
    assert!(!dir.path().join("clip_enc.264").exists());
    assert_eq!(report.carrier, dir.path().join("clip.lrc"));
    assert_eq!(report.source_frames, 3);
    assert_eq!(report.blobs, 3);
    assert_eq!(
        (report.stats.total, report.stats.frames, report.stats.iframes),
        (4, 3, 3)
    );

    let transcode = tools.command_writing("clip_enc_2.264");
    assert!(transcode.contains("clip_enc.264"));
}

#[test]
fn test_first_pass_is_lossless_on_both_paths() {
    let _guard = SCRIPTS.lock().unwrap_or_else(|e| e.into_inner());
    let tools = Tools::install();
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("v.mp4");
    std::fs::write(&input, b"container").unwrap();

    let report = carrier(&tools).encode(&input, 1, true).unwrap();
    assert_eq!(report.verify.unwrap().images, 3);

    // Encode: rgb frames -> v_enc.mp4 at crf 0 -> v_enc.264 at the carried crf
    assert!(tools.command_writing("v_enc.mp4").contains("-crf 0 "));
    let keyframed = tools.command_writing("v_enc.264");
    assert!(keyframed.contains("-crf 23 "));
    assert!(keyframed.contains("keyint=1:min-keyint=1"));

    // Single-frame path: still.png -> still.mp4 at crf 0 -> still.264 at the carried crf
    let still_clip = tools.command_writing("still.mp4");
    assert!(still_clip.contains("-preset ultrafast -crf 0 "));
    assert!(tools
        .command_writing("still.264")
        .contains("-preset ultrafast -crf 23 "));
}
