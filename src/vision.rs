//! Image capture and lightweight scene description.

use crate::config::VisionConfig;
use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{info, warn};

/// Source of screen and webcam frames.
#[async_trait]
pub trait ImageCapture: Send + Sync {
    /// Capture the screen and return the saved image path.
    async fn capture_screen(&self) -> Result<PathBuf>;

    /// Capture a webcam frame. `None` means no webcam is available.
    async fn capture_webcam(&self) -> Result<Option<PathBuf>>;
}

/// Backend that has no capture device.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCapture;

#[async_trait]
impl ImageCapture for NoCapture {
    async fn capture_screen(&self) -> Result<PathBuf> {
        Err(AssistantError::Vision(
            "no screen capture backend configured".to_owned(),
        ))
    }

    async fn capture_webcam(&self) -> Result<Option<PathBuf>> {
        Ok(None)
    }
}

/// Capture by running an external program that writes the image file.
///
/// Each `{path}` argument is replaced with the destination path.
#[derive(Debug, Clone)]
pub struct CommandCapture {
    dir: PathBuf,
    screen: Option<Vec<String>>,
    webcam: Option<Vec<String>>,
}

impl CommandCapture {
    #[must_use]
    pub fn new(config: &VisionConfig) -> Self {
        Self {
            dir: config.capture_dir.clone(),
            screen: config.screen_command.clone(),
            webcam: config.webcam_command.clone(),
        }
    }

    async fn run(&self, argv: &[String], file_name: &str) -> Result<PathBuf> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| AssistantError::Vision("empty capture command".to_owned()))?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(file_name);
        let path_arg = path.to_string_lossy();

        let status = Command::new(program)
            .args(args.iter().map(|a| a.replace("{path}", &path_arg)))
            .status()
            .await
            .map_err(|e| AssistantError::Vision(format!("{program}: {e}")))?;
        if !status.success() {
            return Err(AssistantError::Vision(format!(
                "{program} exited with {status}"
            )));
        }
        info!(path = %path.display(), "image captured");
        Ok(path)
    }
}

#[async_trait]
impl ImageCapture for CommandCapture {
    async fn capture_screen(&self) -> Result<PathBuf> {
        match &self.screen {
            Some(argv) => self.run(argv, "screencap.png").await,
            None => NoCapture.capture_screen().await,
        }
    }

    async fn capture_webcam(&self) -> Result<Option<PathBuf>> {
        let Some(argv) = &self.webcam else {
            return Ok(None);
        };
        match self.run(argv, "webcam.png").await {
            Ok(path) => Ok(Some(path)),
            Err(e) => {
                warn!(error = %e, "webcam capture failed");
                Ok(None)
            }
        }
    }
}

/// Summary statistics of an image's value channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneStats {
    /// Mean of max(r, g, b), 0..=255.
    pub brightness: f64,
    /// Standard deviation of the value channel.
    pub contrast: f64,
    /// Fraction of pixels on a strong gradient.
    pub edge_density: f64,
}

const EDGE_THRESHOLD: f64 = 200.0;

impl SceneStats {
    /// Compute statistics for an RGB image.
    #[must_use]
    pub fn from_rgb(image: &image::RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let (w, h) = (width as usize, height as usize);
        if w == 0 || h == 0 {
            return Self {
                brightness: 0.0,
                contrast: 0.0,
                edge_density: 0.0,
            };
        }

        let value: Vec<f64> = image
            .pixels()
            .map(|p| f64::from(p.0[0].max(p.0[1]).max(p.0[2])))
            .collect();
        let n = value.len() as f64;
        let mean = value.iter().sum::<f64>() / n;
        let variance = value.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        let mut edges = 0usize;
        if w > 2 && h > 2 {
            let at = |x: usize, y: usize| value[y * w + x];
            for y in 1..h - 1 {
                for x in 1..w - 1 {
                    let gx = at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1)
                        - at(x - 1, y - 1)
                        - 2.0 * at(x - 1, y)
                        - at(x - 1, y + 1);
                    let gy = at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1)
                        - at(x - 1, y - 1)
                        - 2.0 * at(x, y - 1)
                        - at(x + 1, y - 1);
                    if gx.hypot(gy) > EDGE_THRESHOLD {
                        edges += 1;
                    }
                }
            }
        }

        Self {
            brightness: mean,
            contrast: variance.sqrt(),
            edge_density: edges as f64 / n,
        }
    }

    /// Spoken description of the scene.
    #[must_use]
    pub fn describe(&self) -> String {
        let brightness = if self.brightness < 80.0 {
            "dim"
        } else if self.brightness < 170.0 {
            "balanced"
        } else {
            "bright"
        };
        let contrast = if self.contrast < 40.0 {
            "soft"
        } else if self.contrast < 80.0 {
            "defined"
        } else {
            "high contrast"
        };
        let detail = if self.edge_density < 0.01 {
            "minimal detail"
        } else if self.edge_density < 0.03 {
            "moderate detail"
        } else {
            "high detail"
        };
        format!(
            "The scene appears {brightness} with {contrast} lighting and {detail}. \
I can provide a closer analysis if you need specifics."
        )
    }
}

/// Describe the image at `path`, or explain that it could not be analysed.
pub async fn describe_image(path: &Path) -> String {
    let path = path.to_path_buf();
    let analysed = tokio::task::spawn_blocking(move || {
        image::open(&path).map(|img| SceneStats::from_rgb(&img.to_rgb8()))
    })
    .await;
    match analysed {
        Ok(Ok(stats)) => stats.describe(),
        Ok(Err(e)) => {
            warn!(error = %e, "image analysis failed");
            "However, I couldn't analyze the image content.".to_owned()
        }
        Err(e) => {
            warn!(error = %e, "image analysis task failed");
            "However, I couldn't analyze the image content.".to_owned()
        }
    }
}
