//! HTTP IP-camera source.
//!
//! Handles both delivery modes common on cheap IP cameras and phone
//! streaming apps: a `multipart/x-mixed-replace` MJPEG stream, or a plain
//! JPEG snapshot endpoint polled once per frame. JPEG frames are decoded
//! in memory and decimated to the configured target rate.

use std::io::Read;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use image::GenericImageView;

use super::camera::{CameraConfig, CameraStats};
use crate::frame::Frame;

const MAX_JPEG_BYTES: usize = 5 * 1024 * 1024;

pub(super) struct HttpCameraSource {
    config: CameraConfig,
    stream: Option<HttpStream>,
    last_frame_at: Option<Instant>,
    connected_at: Option<Instant>,
    frame_count: u64,
}

enum HttpStream {
    Mjpeg(MjpegStream),
    SingleJpeg,
}

impl HttpCameraSource {
    pub(super) fn new(config: CameraConfig) -> Self {
        Self {
            config,
            stream: None,
            last_frame_at: None,
            connected_at: None,
            frame_count: 0,
        }
    }

    pub(super) fn connect(&mut self) -> Result<()> {
        let response = ureq::get(&self.config.url)
            .call()
            .with_context(|| format!("connect to camera stream at {}", self.config.url))?;
        let content_type = response.header("Content-Type").unwrap_or("");
        if content_type.to_lowercase().contains("multipart") {
            let reader = response.into_reader();
            self.stream = Some(HttpStream::Mjpeg(MjpegStream::new(reader)));
            log::info!("CameraSource: connected to {} (mjpeg)", self.config.url);
        } else {
            self.stream = Some(HttpStream::SingleJpeg);
            log::info!("CameraSource: connected to {} (snapshot)", self.config.url);
        }
        self.connected_at = Some(Instant::now());
        Ok(())
    }

    pub(super) fn next_frame(&mut self) -> Result<Frame> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| anyhow!("http camera source not connected; call connect() first"))?;
        let min_interval = frame_interval(self.config.target_fps);
        loop {
            let jpeg_bytes = match stream {
                HttpStream::Mjpeg(stream) => stream.read_next_jpeg(),
                HttpStream::SingleJpeg => fetch_single_jpeg(&self.config.url),
            }?;

            let now = Instant::now();
            if let Some(last) = self.last_frame_at {
                if now.duration_since(last) < min_interval {
                    continue;
                }
            }

            let (pixels, width, height) = decode_jpeg(&jpeg_bytes)?;
            self.frame_count += 1;
            self.last_frame_at = Some(now);

            return Frame::new(pixels, width, height);
        }
    }

    pub(super) fn is_healthy(&self) -> bool {
        let Some(connected_at) = self.connected_at else {
            return false;
        };
        let Some(last_frame_at) = self.last_frame_at else {
            return connected_at.elapsed() <= Duration::from_secs(5);
        };
        last_frame_at.elapsed() <= health_grace(self.config.target_fps)
    }

    pub(super) fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            source: self.config.url.clone(),
        }
    }
}

struct MjpegStream {
    reader: Box<dyn Read + Send>,
    buffer: Vec<u8>,
}

impl MjpegStream {
    fn new(reader: Box<dyn Read + Send>) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(64 * 1024),
        }
    }

    /// Scan the multipart byte stream for the next complete JPEG
    /// (SOI..EOI), reading more data as needed.
    fn read_next_jpeg(&mut self) -> Result<Vec<u8>> {
        let mut chunk = vec![0u8; 8192];
        loop {
            if let Some((start, end)) = find_jpeg_bounds(&self.buffer) {
                let frame = self.buffer[start..end].to_vec();
                self.buffer.drain(..end);
                return Ok(frame);
            }

            let read = self.reader.read(&mut chunk).context("read mjpeg chunk")?;
            if read == 0 {
                return Err(anyhow!("mjpeg stream ended"));
            }
            self.buffer.extend_from_slice(&chunk[..read]);

            if self.buffer.len() > MAX_JPEG_BYTES * 2 {
                let keep = 2.min(self.buffer.len());
                let drain_len = self.buffer.len() - keep;
                self.buffer.drain(..drain_len);
            }
        }
    }
}

fn fetch_single_jpeg(url: &str) -> Result<Vec<u8>> {
    let response = ureq::get(url)
        .call()
        .with_context(|| format!("fetch jpeg snapshot from {}", url))?;
    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .context("read jpeg snapshot")?;
    if bytes.is_empty() {
        return Err(anyhow!("empty jpeg snapshot"));
    }
    Ok(bytes)
}

fn decode_jpeg(bytes: &[u8]) -> Result<(Vec<u8>, u32, u32)> {
    let image = image::load_from_memory(bytes).context("decode jpeg")?;
    let (width, height) = image.dimensions();
    let rgb = image.into_rgb8();
    Ok((rgb.into_raw(), width, height))
}

fn find_jpeg_bounds(buffer: &[u8]) -> Option<(usize, usize)> {
    let mut start = None;
    let mut i = 0;
    while i + 1 < buffer.len() {
        if buffer[i] == 0xFF && buffer[i + 1] == 0xD8 {
            start = Some(i);
            break;
        }
        i += 1;
    }
    let start = start?;
    let mut j = start + 2;
    while j + 1 < buffer.len() {
        if buffer[j] == 0xFF && buffer[j + 1] == 0xD9 {
            return Some((start, j + 2));
        }
        j += 1;
    }
    None
}

fn frame_interval(target_fps: u32) -> Duration {
    if target_fps == 0 {
        Duration::from_millis(0)
    } else {
        Duration::from_millis((1000 / target_fps).max(1) as u64)
    }
}

fn health_grace(target_fps: u32) -> Duration {
    let base_ms = if target_fps == 0 {
        2_000
    } else {
        (1000 / target_fps).saturating_mul(6)
    };
    Duration::from_millis(base_ms.max(2_000) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jpeg_bounds_found_across_multipart_noise() {
        let mut buffer = b"--boundary\r\nContent-Type: image/jpeg\r\n\r\n".to_vec();
        let start = buffer.len();
        buffer.extend_from_slice(&[0xFF, 0xD8, 0x01, 0x02, 0x03, 0xFF, 0xD9]);
        let end = buffer.len();
        buffer.extend_from_slice(b"\r\n--boundary");

        assert_eq!(find_jpeg_bounds(&buffer), Some((start, end)));
    }

    #[test]
    fn jpeg_bounds_require_a_complete_frame() {
        assert_eq!(find_jpeg_bounds(&[0xFF, 0xD8, 0x01, 0x02]), None);
        assert_eq!(find_jpeg_bounds(b"no markers here"), None);
    }

    #[test]
    fn frame_interval_honors_target_fps() {
        assert_eq!(frame_interval(10), Duration::from_millis(100));
        assert_eq!(frame_interval(0), Duration::from_millis(0));
    }

    #[test]
    fn health_grace_has_a_floor() {
        assert!(health_grace(30) >= Duration::from_secs(2));
        assert_eq!(health_grace(1), Duration::from_secs(6));
    }
}
