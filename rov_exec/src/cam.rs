//! # Camera Module
//!
//! Relays encoded camera frames to the surface station over the control
//! link. Frames are produced by a [`CamSource`] and pushed from a dedicated
//! thread at the configured interval, independent of the actuation cycle, so
//! a stalled camera can never hold up thruster demands.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use log::{debug, info, warn};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// Internal
use comms_if::{net::NetSock, packet::Packet};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// JPEG quality used for frames sent to the surface.
const JPEG_QUALITY: u8 = 65;

/// Dimensions of the generated test pattern.
const TEST_PATTERN_SIZE: (u32, u32) = (640, 480);

/// Consecutive capture failures tolerated before the relay gives up.
const MAX_CAPTURE_ERROR_LIMIT: u32 = 10;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A source of encoded camera frames.
///
/// Capture backends plug in here, the relay only needs bytes it can put on
/// the wire.
pub trait CamSource: Send {
    /// Name of this source, for logging.
    fn name(&self) -> &str;

    /// Capture one frame, encoded and ready for transmission.
    fn capture(&mut self) -> Result<Vec<u8>, CamError>;
}

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Synthetic frame source used when no camera is fitted.
///
/// Produces a scrolling checkerboard so frozen or dropped frames are visible
/// at the surface.
pub struct TestPattern {
    frame_count: u32,

    size: (u32, u32),
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur in a [`CamSource`].
#[derive(Debug, thiserror::Error)]
pub enum CamError {
    #[error("Could not encode the frame: {0}")]
    EncodeError(image::ImageError),
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Spawn the camera relay thread.
///
/// The thread captures and sends one frame every `frame_interval` until the
/// link closes or the source fails repeatedly.
pub fn spawn_relay(
    sock: Arc<NetSock>,
    mut source: Box<dyn CamSource>,
    frame_interval: Duration,
) -> JoinHandle<()> {
    thread::spawn(move || {
        info!("Camera relay started with source \"{}\"", source.name());

        let mut num_consec_errors = 0u32;

        while sock.is_open() {
            let frame_start = Instant::now();

            match source.capture() {
                Ok(frame) => {
                    num_consec_errors = 0;

                    if let Err(e) = sock.send(&Packet::Camera(frame)) {
                        // The socket tracks link failures itself
                        debug!("Could not send camera frame: {}", e);
                    }
                }
                Err(e) => {
                    warn!("Camera capture failed: {}", e);

                    num_consec_errors += 1;
                    if num_consec_errors >= MAX_CAPTURE_ERROR_LIMIT {
                        warn!(
                            "Stopping the camera relay after {} consecutive capture failures",
                            num_consec_errors
                        );
                        break;
                    }
                }
            }

            if let Some(d) = frame_interval.checked_sub(frame_start.elapsed()) {
                thread::sleep(d);
            }
        }

        info!("Camera relay stopped");
    })
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl TestPattern {
    /// Create a new test pattern source.
    pub fn new() -> Self {
        Self {
            frame_count: 0,
            size: TEST_PATTERN_SIZE,
        }
    }
}

impl Default for TestPattern {
    fn default() -> Self {
        Self::new()
    }
}

impl CamSource for TestPattern {
    fn name(&self) -> &str {
        "test_pattern"
    }

    fn capture(&mut self) -> Result<Vec<u8>, CamError> {
        let (width, height) = self.size;
        let shift = self.frame_count % 64;

        let image = RgbImage::from_fn(width, height, |x, y| {
            match (((x + shift) / 32) + (y / 32)) % 2 {
                0 => Rgb([0x10, 0x20, 0x40]),
                _ => Rgb([0xc8, 0xc8, 0xc8]),
            }
        });

        let mut data = Vec::<u8>::new();

        DynamicImage::ImageRgb8(image)
            .write_to(&mut data, ImageOutputFormat::Jpeg(JPEG_QUALITY))
            .map_err(CamError::EncodeError)?;

        self.frame_count = self.frame_count.wrapping_add(1);

        Ok(data)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pattern_produces_jpeg() {
        let mut source = TestPattern::new();

        let frame = source.capture().expect("capture failed");

        // JPEG start and end of image markers
        assert_eq!(&frame[0..2], &[0xff, 0xd8]);
        assert_eq!(&frame[frame.len() - 2..], &[0xff, 0xd9]);
    }

    #[test]
    fn test_pattern_moves_between_frames() {
        let mut source = TestPattern::new();

        let first = source.capture().expect("capture failed");
        let second = source.capture().expect("capture failed");

        assert_ne!(first, second);
    }
}
