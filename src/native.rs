//! Native driver: runs the page behaviors over a saved page fragment.
//!
//! Images are measured from the local filesystem. Remote images cannot be
//! measured and count as failed unless a width is supplied for them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use feedview_dom::{Document, DomError, Event};
use web_time::{Duration, Instant};

use crate::config::{AppConfig, ConfigError};
use crate::highlight::ClassHighlighter;
use crate::media::{ImageSource, LoadStatus, PageMetrics};
use crate::page::{BootReport, Environment, Page, PageError};

#[derive(Debug, thiserror::Error)]
pub enum NativeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Could not parse page: {0}")]
    Parse(#[from] DomError),

    #[error("Page error: {0}")]
    Page(#[from] PageError),

    #[error("Invalid width override {0:?}, expected SRC=WIDTH")]
    InvalidOverride(String),
}

/// Image measurements backed by files next to the page.
#[derive(Debug, Clone, Default)]
pub struct FsImages {
    base: PathBuf,
    overrides: HashMap<String, u32>,
}

impl FsImages {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            overrides: HashMap::new(),
        }
    }

    /// Use a fixed natural width for `src` instead of measuring it.
    pub fn assume_width(&mut self, src: &str, width: u32) {
        self.overrides.insert(src.to_string(), width);
    }

    fn local_path(&self, src: &str) -> Option<PathBuf> {
        let is_remote = src.starts_with("//")
            || src
                .split_once(':')
                .is_some_and(|(scheme, _)| {
                    // A single letter is a drive, as in `C:\img.png`
                    scheme.len() > 1 && scheme.chars().all(|c| c.is_ascii_alphabetic())
                });
        if is_remote {
            return None;
        }
        Some(self.base.join(src.trim_start_matches('/')))
    }
}

impl ImageSource for FsImages {
    fn status(&mut self, src: &str) -> LoadStatus {
        if let Some(&natural_width) = self.overrides.get(src) {
            return LoadStatus::Complete { natural_width };
        }
        let Some(path) = self.local_path(src) else {
            log::debug!("Cannot measure remote image {}", src);
            return LoadStatus::Failed;
        };
        match image::image_dimensions(&path) {
            Ok((natural_width, _)) => LoadStatus::Complete { natural_width },
            Err(e) => {
                log::warn!("Could not read image {:?}: {}", path, e);
                LoadStatus::Failed
            }
        }
    }
}

/// Parse `SRC=WIDTH`.
pub fn parse_override(value: &str) -> Result<(String, u32), NativeError> {
    let (src, width) = value
        .rsplit_once('=')
        .ok_or_else(|| NativeError::InvalidOverride(value.to_string()))?;
    let width = width
        .trim()
        .parse()
        .map_err(|_| NativeError::InvalidOverride(value.to_string()))?;
    Ok((src.trim().to_string(), width))
}

/// Settings for one driver run.
#[derive(Debug, Clone)]
pub struct Options {
    pub input: PathBuf,
    pub base_dir: Option<PathBuf>,
    pub column_width: Option<f32>,
    pub device_pixel_ratio: f32,
    pub assumed_widths: Vec<(String, u32)>,
    /// Simulated taps on every viewer image
    pub taps: usize,
}

/// Result of a run.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub html: String,
    pub report: BootReport,
    pub signals: Vec<String>,
}

/// Bootstrap the page, play the requested taps and let the overlay settle.
pub fn run(options: &Options, config: &AppConfig) -> Result<Outcome, NativeError> {
    let started = Instant::now();
    let markup = std::fs::read_to_string(&options.input)?;
    let doc = Document::parse_fragment(&markup)?;

    let base = options
        .base_dir
        .clone()
        .or_else(|| options.input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    let mut images = FsImages::new(base);
    for (src, width) in &options.assumed_widths {
        images.assume_width(src, *width);
    }

    let env = Environment {
        metrics: PageMetrics {
            column_width: options.column_width,
            device_pixel_ratio: options.device_pixel_ratio,
        },
        touch_device: false,
    };
    let mut highlighter = ClassHighlighter::new();
    let (mut page, report) = Page::bootstrap(
        doc,
        config,
        env,
        &mut highlighter,
        &mut images,
        Duration::ZERO,
    )?;

    // Page time advances on a virtual clock from here on
    let mut now = Duration::ZERO;
    let step = Duration::from_millis(100);
    let targets: Vec<_> = page
        .media()
        .viewers()
        .iter()
        .flat_map(|v| v.images.first().copied())
        .collect();
    for _ in 0..options.taps {
        for &target in &targets {
            now += step;
            page.handle_event(&Event::Click { target }, now)?;
        }
    }

    let settle_at = now + config.media.overlay_hide_delay().max(config.media.load_timeout());
    while now < settle_at {
        now += step;
        page.tick(now)?;
    }

    let signals = page
        .take_signals()
        .iter()
        .map(|s| s.name().to_string())
        .collect();
    let doc = page.into_document();
    log::info!(
        "Processed {:?} in {:?}",
        options.input,
        started.elapsed()
    );
    Ok(Outcome {
        html: doc.inner_html(doc.root()),
        report,
        signals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_override() {
        assert_eq!(
            parse_override("img/wide.png=2400").unwrap(),
            ("img/wide.png".to_string(), 2400)
        );
        assert!(parse_override("wide.png").is_err());
        assert!(parse_override("wide.png=abc").is_err());
    }

    #[test]
    fn test_remote_images_fail_without_override() {
        let mut images = FsImages::new("/nonexistent");
        assert_eq!(images.status("https://example.com/a.png"), LoadStatus::Failed);
        assert_eq!(images.status("//cdn.example.com/a.png"), LoadStatus::Failed);

        images.assume_width("https://example.com/a.png", 1200);
        assert_eq!(
            images.status("https://example.com/a.png"),
            LoadStatus::Complete {
                natural_width: 1200
            }
        );
    }

    #[test]
    fn test_drive_letter_paths_are_local() {
        let images = FsImages::new("/pages");
        assert_eq!(
            images.local_path(r"C:\img\wide.png"),
            Some(PathBuf::from("/pages").join(r"C:\img\wide.png"))
        );
        assert_eq!(images.local_path("https://example.com/a.png"), None);
        assert_eq!(images.local_path("data:image/png;base64,AAAA"), None);
    }

    #[test]
    fn test_missing_local_file_fails() {
        let mut images = FsImages::new("/nonexistent");
        assert_eq!(images.status("/img/missing.png"), LoadStatus::Failed);
    }

    #[test]
    fn test_run_over_saved_page() {
        let dir = std::env::temp_dir().join(format!("feedview-native-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("page.html");
        std::fs::write(
            &input,
            r#"<div class="media-viewers"></div><div class="content"><a href="https://example.com/photo"><img src="https://example.com/photo.jpg"></a></div>"#,
        )
        .unwrap();

        let options = Options {
            input,
            base_dir: None,
            column_width: Some(600.0),
            device_pixel_ratio: 2.0,
            assumed_widths: vec![("https://example.com/photo.jpg".to_string(), 2000)],
            taps: 2,
        };
        let outcome = run(&options, &AppConfig::default()).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(outcome.report.images.viewers, 1);
        assert!(outcome.html.contains("media-viewer"));
        assert!(outcome.html.contains("width: 1000px"));
        assert!(outcome.html.contains("fade-out"));
        assert_eq!(outcome.signals[0], "content-images-settled");
        assert_eq!(
            outcome
                .signals
                .iter()
                .filter(|s| *s == "image-tapped")
                .count(),
            2
        );
    }
}
