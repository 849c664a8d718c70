//! INI configuration for the chopper.
//!
//! ```ini
//! [sound]
//! silence_threshold = -40
//! chunk_min_length = 60000
//! loudness_peak = 20
//! fade_in_out = 2000
//!
//! [path]
//! source_dir = source/
//! target_dir = chopped/
//! source_file = live.wav
//!
//! [export]
//! format = wav
//! bitrate = 192k
//! tag_artist = Unknown Artist
//! tag_album = {0} (live)
//! ```
//!
//! Every section and key is optional; missing values fall back to the defaults above.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::segmenter::{DEFAULT_SEGMENTER_OPTS, SegmenterOpts};
use crate::{Error, Result};

/// File name used when no config path is given.
pub const DEFAULT_CONFIG_FILE: &str = "default.ini";

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sound: SoundSettings,
    pub path: PathSettings,
    pub export: ExportSettings,
}

/// `[sound]`: segmentation thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundSettings {
    pub silence_threshold: f64,
    pub chunk_min_length: f64,
    pub loudness_peak: f64,
    pub fade_in_out: u64,
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self {
            silence_threshold: DEFAULT_SEGMENTER_OPTS.silence_threshold,
            chunk_min_length: DEFAULT_SEGMENTER_OPTS.chunk_min_length_ms,
            loudness_peak: DEFAULT_SEGMENTER_OPTS.loudness_peak,
            fade_in_out: DEFAULT_SEGMENTER_OPTS.fade_in_out_ms,
        }
    }
}

/// `[path]`: where recordings are read from and chunks are written to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub source_dir: PathBuf,
    pub target_dir: PathBuf,
    pub source_file: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("source/"),
            target_dir: PathBuf::from("chopped/"),
            source_file: "nonexistingfile.wav".to_owned(),
        }
    }
}

/// `[export]`: output container and tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub format: String,
    pub bitrate: String,
    pub tag_artist: String,
    pub tag_album: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: "wav".to_owned(),
            bitrate: "192k".to_owned(),
            tag_artist: "Unknown Artist".to_owned(),
            tag_album: "Unknown Album".to_owned(),
        }
    }
}

impl Settings {
    /// Load settings from an INI file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }

        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Ini))
            .build()?
            .try_deserialize::<Settings>()?;

        tracing::debug!(path = %path.display(), ?settings, "loaded settings");
        Ok(settings.with_blank_fields_defaulted())
    }

    /// Parse settings from INI text.
    pub fn from_ini_str(ini: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from_str(ini, FileFormat::Ini))
            .build()?
            .try_deserialize::<Settings>()?;
        Ok(settings.with_blank_fields_defaulted())
    }

    /// Segmentation options from `[sound]`.
    pub fn segmenter_opts(&self) -> SegmenterOpts {
        SegmenterOpts {
            silence_threshold: self.sound.silence_threshold,
            chunk_min_length_ms: self.sound.chunk_min_length,
            loudness_peak: self.sound.loudness_peak,
            fade_in_out_ms: self.sound.fade_in_out,
            ..DEFAULT_SEGMENTER_OPTS
        }
    }

    /// Tags for chunks cut from `source_name`.
    ///
    /// `{0}` or `{}` in the album tag is replaced by the source name.
    pub fn export_tags(&self, source_name: &str) -> BTreeMap<String, String> {
        let album = self
            .export
            .tag_album
            .replace("{0}", source_name)
            .replace("{}", source_name);

        BTreeMap::from([
            ("artist".to_owned(), self.export.tag_artist.clone()),
            ("album".to_owned(), album),
        ])
    }

    /// Path of `file` inside the configured source directory.
    pub fn source_path(&self, file: &str) -> PathBuf {
        self.path.source_dir.join(file)
    }

    // `key =` in an INI file deserializes to an empty string rather than a missing key.
    fn with_blank_fields_defaulted(mut self) -> Self {
        let defaults = ExportSettings::default();
        if self.export.format.trim().is_empty() {
            self.export.format = defaults.format;
        }
        if self.export.bitrate.trim().is_empty() {
            self.export.bitrate = defaults.bitrate;
        }
        if self.path.source_file.trim().is_empty() {
            self.path.source_file = PathSettings::default().source_file;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ini_uses_defaults() -> anyhow::Result<()> {
        let settings = Settings::from_ini_str("")?;
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.segmenter_opts(), SegmenterOpts::default());
        Ok(())
    }

    #[test]
    fn parses_all_sections() -> anyhow::Result<()> {
        let ini = "\
[sound]
silence_threshold = -45.5
chunk_min_length = 90000
loudness_peak = 15
fade_in_out = 500

[path]
source_dir = rec
target_dir = out
source_file = gig.flac

[export]
format = wav
bitrate = 320k
tag_artist = The Band
tag_album = {0} live
";
        let settings = Settings::from_ini_str(ini)?;
        let opts = settings.segmenter_opts();
        assert_eq!(opts.silence_threshold, -45.5);
        assert_eq!(opts.chunk_min_length_ms, 90_000.0);
        assert_eq!(opts.loudness_peak, 15.0);
        assert_eq!(opts.fade_in_out_ms, 500);
        assert_eq!(opts.analysis_step_ms, 1000);

        assert_eq!(settings.source_path("x.wav"), PathBuf::from("rec/x.wav"));
        assert_eq!(settings.path.target_dir, PathBuf::from("out"));
        assert_eq!(settings.path.source_file, "gig.flac");
        assert_eq!(settings.export.bitrate, "320k");

        let tags = settings.export_tags("gig");
        assert_eq!(tags["artist"], "The Band");
        assert_eq!(tags["album"], "gig live");
        Ok(())
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() -> anyhow::Result<()> {
        let settings = Settings::from_ini_str("[sound]\nloudness_peak = 30\n")?;
        assert_eq!(settings.sound.loudness_peak, 30.0);
        assert_eq!(settings.sound.silence_threshold, -40.0);
        assert_eq!(settings.export, ExportSettings::default());
        Ok(())
    }

    #[test]
    fn blank_bitrate_falls_back() -> anyhow::Result<()> {
        let settings = Settings::from_ini_str("[export]\nbitrate =\n")?;
        assert_eq!(settings.export.bitrate, "192k");
        Ok(())
    }

    #[test]
    fn non_numeric_threshold_is_a_config_error() {
        let err = Settings::from_ini_str("[sound]\nsilence_threshold = loud\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = Settings::load("surely/not/here.ini").unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound(_)));
    }
}
