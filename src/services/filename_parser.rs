//! Release metadata extraction from scene-style filenames
//!
//! Parses tokens like:
//! - "The.Wire.S03E04.720p.HDTV.x264-LOL.mkv" (720p, hdtv, x264, LOL)
//! - "Show.S01E01.1080p.BluRay.DTS.x265-SPARKS.mkv"
//!
//! Each category is a dictionary scanned in declared order; the first token
//! contained in the filename wins. Longer tokens are listed before tokens
//! they contain ("eac3" before "ac3", "dvdrip" before "dvd").

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Release metadata for one file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Original-case filename
    pub name: String,
    /// Directory portion of the path
    pub path: String,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub source: Option<String>,
    pub resolution: Option<String>,
    pub release_group: Option<String>,
}

pub const VIDEO_CODECS: &[&str] = &[
    "x264", "h264", "h.264", "x265", "h265", "h.265", "hevc", "avc", "xvid", "divx", "vp9",
    "av1", "mpeg2",
];

pub const AUDIO_CODECS: &[&str] = &[
    "truehd", "atmos", "dts-hd", "dtshd", "dts", "eac3", "ddp5.1", "dd5.1", "ac3", "aac2.0",
    "aac", "flac", "mp3", "opus", "vorbis",
];

pub const SOURCES: &[&str] = &[
    "bluray", "blu-ray", "bdrip", "brrip", "web-dl", "webdl", "webrip", "hdtv", "pdtv", "sdtv",
    "dsr", "hdrip", "dvdrip", "dvdscr", "dvd", "vhsrip",
];

pub const RESOLUTIONS: &[&str] = &[
    "2160p", "1080p", "1080i", "720p", "576p", "540p", "480p", "360p", "4k",
];

/// Known release groups, matched case-sensitively after a dash
pub const RELEASE_GROUPS: &[&str] = &[
    "DIMENSION", "KILLERS", "IMMERSE", "SPARKS", "EVOLVE", "CtrlHD", "DEFLATE", "REWARD",
    "FLEET", "CAKES", "EZTVx", "RARBG", "ETHEL", "EDITH", "BATV", "MiNX", "ASAP", "2HD",
    "LOL", "FQM", "SVA", "AVS", "TLA", "TBS", "NTb", "QOQ", "XOR", "FoV",
];

/// Token dictionaries used for metadata extraction
#[derive(Debug, Clone)]
pub struct MetadataDictionaries {
    pub video_codecs: Vec<String>,
    pub audio_codecs: Vec<String>,
    pub sources: Vec<String>,
    pub resolutions: Vec<String>,
    pub release_groups: Vec<String>,
}

impl Default for MetadataDictionaries {
    fn default() -> Self {
        let owned =
            |tokens: &[&str]| -> Vec<String> { tokens.iter().map(|t| t.to_string()).collect() };
        Self {
            video_codecs: owned(VIDEO_CODECS),
            audio_codecs: owned(AUDIO_CODECS),
            sources: owned(SOURCES),
            resolutions: owned(RESOLUTIONS),
            release_groups: owned(RELEASE_GROUPS),
        }
    }
}

impl MetadataDictionaries {
    /// Extract metadata from a filename.
    ///
    /// Codec, source and resolution are compared case-insensitively against
    /// lower-case dictionary entries. Release groups keep their case.
    pub fn parse(&self, filename: &str, dir: &str) -> FileMetadata {
        let lower = filename.to_lowercase();

        let metadata = FileMetadata {
            name: filename.to_string(),
            path: dir.to_string(),
            video_codec: first_contained(&self.video_codecs, &lower),
            audio_codec: first_contained(&self.audio_codecs, &lower),
            source: first_contained(&self.sources, &lower),
            resolution: first_contained(&self.resolutions, &lower),
            release_group: self
                .release_groups
                .iter()
                .find(|group| filename.contains(&format!("-{}", group)))
                .cloned(),
        };

        debug!(
            filename = filename,
            video_codec = ?metadata.video_codec,
            audio_codec = ?metadata.audio_codec,
            source = ?metadata.source,
            resolution = ?metadata.resolution,
            release_group = ?metadata.release_group,
            "Parsed file metadata"
        );

        metadata
    }
}

fn first_contained(tokens: &[String], haystack: &str) -> Option<String> {
    tokens.iter().find(|t| haystack.contains(t.as_str())).cloned()
}

/// Parse with the built-in dictionaries
pub fn parse_metadata(filename: &str, dir: &str) -> FileMetadata {
    MetadataDictionaries::default().parse(filename, dir)
}
