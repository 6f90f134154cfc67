//! Photo-library export gate.
//!
//! # Invariants
//! - Nothing is handed to the exporter unless authorization is granted.
//! - An undetermined authorization is requested at most once per export.

use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Photo-library authorization state reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoAuthorization {
    /// Full access granted.
    Authorized,
    /// Add-only or limited access; enough to save an image.
    Limited,
    /// User refused access.
    Denied,
    /// Access blocked by device policy.
    Restricted,
    /// User has not been asked yet.
    NotDetermined,
}

impl PhotoAuthorization {
    /// Returns whether saving an image is allowed.
    pub fn allows_export(self) -> bool {
        matches!(self, Self::Authorized | Self::Limited)
    }
}

/// Rasterized drawing produced by the platform renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    /// Encoded image bytes (PNG as produced by the platform renderer).
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Errors surfaced by the export flow.
#[derive(Debug)]
pub enum ExportError {
    /// Authorization is denied or restricted; the UI should show a notice.
    PermissionDenied(PhotoAuthorization),
    /// The platform exporter reported a failure.
    Platform(String),
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied(status) => {
                write!(f, "photo library access not granted: {status:?}")
            }
            Self::Platform(message) => write!(f, "image export failed: {message}"),
        }
    }
}

impl Error for ExportError {}

/// Platform photo-library exporter.
pub trait ImageExporter {
    /// Current authorization without prompting.
    fn authorization(&self) -> PhotoAuthorization;
    /// Prompts the user and returns the resulting authorization.
    fn request_authorization(&mut self) -> PhotoAuthorization;
    /// Saves one image to the photo library.
    fn export(&mut self, image: &RenderedImage) -> Result<(), ExportError>;
}

/// Checks authorization, prompting once if undetermined, then exports.
pub fn export_with_authorization<E: ImageExporter + ?Sized>(
    exporter: &mut E,
    image: &RenderedImage,
) -> Result<(), ExportError> {
    let mut status = exporter.authorization();
    if status == PhotoAuthorization::NotDetermined {
        status = exporter.request_authorization();
    }

    if !status.allows_export() {
        warn!("event=image_export module=capability status=denied authorization={status:?}");
        return Err(ExportError::PermissionDenied(status));
    }

    exporter.export(image)?;
    info!(
        "event=image_export module=capability status=ok width={} height={} bytes={}",
        image.width,
        image.height,
        image.bytes.len()
    );
    Ok(())
}
