use anyhow::{anyhow, Result};
use url::Url;

use super::http::HttpCameraSource;
use crate::frame::Frame;

/// Configuration for a camera source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Stream URL. Supported schemes: `stub://` (synthetic), `http(s)://`
    /// (MJPEG multipart or JPEG snapshot).
    pub url: String,
    /// Target frame rate; the source decimates faster streams to this rate.
    pub target_fps: u32,
    /// Frame width for synthetic sources.
    pub width: u32,
    /// Frame height for synthetic sources.
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            url: "stub://camera".to_string(),
            target_fps: 15,
            width: 640,
            height: 480,
        }
    }
}

/// Camera frame source, dispatching on the URL scheme.
pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCameraSource),
    Http(HttpCameraSource),
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Result<Self> {
        if config.url.starts_with("stub://") {
            return Ok(Self {
                backend: CameraBackend::Synthetic(SyntheticCameraSource::new(config)),
            });
        }
        let url = Url::parse(&config.url)
            .map_err(|e| anyhow!("invalid camera url {}: {}", config.url, e))?;
        match url.scheme() {
            "http" | "https" => Ok(Self {
                backend: CameraBackend::Http(HttpCameraSource::new(config)),
            }),
            other => Err(anyhow!(
                "unsupported camera scheme '{}'; expected stub or http(s)",
                other
            )),
        }
    }

    /// Connect to the stream. Synthetic sources are always connected.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.connect(),
            CameraBackend::Http(source) => source.connect(),
        }
    }

    /// Read the next frame. An error here means the stream is exhausted or
    /// unreadable; callers terminate their loop and drop the source.
    pub fn next_frame(&mut self) -> Result<Frame> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.next_frame(),
            CameraBackend::Http(source) => source.next_frame(),
        }
    }

    /// Check if the source is healthy.
    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.is_healthy(),
            CameraBackend::Http(source) => source.is_healthy(),
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> CameraStats {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.stats(),
            CameraBackend::Http(source) => source.stats(),
        }
    }
}

/// Statistics for a camera source.
#[derive(Clone, Debug)]
pub struct CameraStats {
    pub frames_captured: u64,
    pub source: String,
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests and demos
// ----------------------------------------------------------------------------

struct SyntheticCameraSource {
    config: CameraConfig,
    frame_count: u64,
}

impl SyntheticCameraSource {
    fn new(config: CameraConfig) -> Self {
        Self {
            config,
            frame_count: 0,
        }
    }

    fn connect(&mut self) -> Result<()> {
        log::info!("CameraSource: connected to {} (synthetic)", self.config.url);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        let pixel_count = (self.config.width as usize)
            .checked_mul(self.config.height as usize)
            .and_then(|n| n.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        self.frame_count += 1;
        let pixels = self.generate_synthetic_pixels(pixel_count);
        Frame::new(pixels, self.config.width, self.config.height)
    }

    /// Generate a drifting gradient with a little noise, so frames differ
    /// from one another the way a live scene would.
    fn generate_synthetic_pixels(&mut self, pixel_count: usize) -> Vec<u8> {
        let mut pixels = vec![0u8; pixel_count];
        let drift = self.frame_count;
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + drift) % 256) as u8;
        }
        // Sparse noise keeps consecutive frames from being byte-identical.
        for _ in 0..16 {
            let idx = rand::random::<usize>() % pixel_count;
            pixels[idx] = rand::random::<u8>();
        }
        pixels
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            source: self.config.url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config() -> CameraConfig {
        CameraConfig {
            url: "stub://test".to_string(),
            target_fps: 15,
            width: 64,
            height: 48,
        }
    }

    #[test]
    fn synthetic_source_produces_frames() -> Result<()> {
        let mut source = CameraSource::new(stub_config())?;
        source.connect()?;

        let frame = source.next_frame()?;
        assert_eq!(frame.width, 64);
        assert_eq!(frame.height, 48);
        assert_eq!(frame.pixels.len(), 64 * 48 * 3);

        assert!(source.is_healthy());
        assert_eq!(source.stats().frames_captured, 1);
        Ok(())
    }

    #[test]
    fn consecutive_synthetic_frames_differ() -> Result<()> {
        let mut source = CameraSource::new(stub_config())?;
        source.connect()?;

        let a = source.next_frame()?;
        let b = source.next_frame()?;
        assert_ne!(a.pixels, b.pixels);
        Ok(())
    }

    #[test]
    fn oversized_synthetic_dimensions_error_instead_of_panicking() {
        let config = CameraConfig {
            width: u32::MAX,
            height: u32::MAX,
            ..stub_config()
        };
        let mut source = CameraSource::new(config).unwrap();
        assert!(source.next_frame().is_err());
    }

    #[test]
    fn unknown_schemes_are_rejected() {
        let config = CameraConfig {
            url: "rtsp://camera/stream".to_string(),
            ..stub_config()
        };
        assert!(CameraSource::new(config).is_err());

        let config = CameraConfig {
            url: "not a url".to_string(),
            ..stub_config()
        };
        assert!(CameraSource::new(config).is_err());
    }
}
