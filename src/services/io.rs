//! Image preparation service
//!
//! Decodes an uploaded file, downscales it to fit a tier's bounding box and
//! re-encodes it for upload. Also loads uploads from disk for the CLI.

use crate::{
    config::{OutputFormat, TierProfile},
    error::{RelayError, Result},
    services::OutputFormatHandler,
    types::{EncodedImage, UploadedFile},
};
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, instrument};

/// Service that turns an uploaded file into an upload-ready image
pub struct ImagePreparer;

impl ImagePreparer {
    /// Load an image file from disk into an in-memory upload
    ///
    /// The MIME type is guessed from the file content first, then from the extension.
    ///
    /// # Errors
    /// - File does not exist or cannot be read
    pub fn load_upload<P: AsRef<Path>>(path: P) -> Result<UploadedFile> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(RelayError::file_io_error(
                "read image file",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        let data = std::fs::read(path_ref)
            .map_err(|e| RelayError::file_io_error("read image data", path_ref, &e))?;

        let mime_type = image::guess_format(&data)
            .ok()
            .or_else(|| ImageFormat::from_path(path_ref).ok())
            .map(|format| format.to_mime_type().to_string())
            .unwrap_or_default();

        let file_name = path_ref
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("upload")
            .to_string();

        Ok(UploadedFile::new(data, mime_type, file_name))
    }

    /// Compute the target size for an image so it fits inside `max` pixels
    ///
    /// Landscape images are bounded by width, everything else by height. Images
    /// already within the bound keep their size; fractional results truncate.
    ///
    /// # Examples
    /// ```rust
    /// use bgremove_relay::services::ImagePreparer;
    ///
    /// assert_eq!(ImagePreparer::fit_dimensions(2000, 1000, 1024), (1024, 512));
    /// assert_eq!(ImagePreparer::fit_dimensions(400, 300, 600), (400, 300));
    /// ```
    #[must_use]
    pub fn fit_dimensions(width: u32, height: u32, max: u32) -> (u32, u32) {
        let scale = |side: u32, num: u32, den: u32| -> u32 {
            (u64::from(side) * u64::from(num) / u64::from(den).max(1)) as u32
        };

        let (new_w, new_h) = if width > height {
            if width > max {
                (max, scale(height, max, width))
            } else {
                (width, height)
            }
        } else if height > max {
            (scale(width, max, height), max)
        } else {
            (width, height)
        };

        (new_w.max(1), new_h.max(1))
    }

    /// Decode the upload, downscale it and encode it per the profile
    ///
    /// # Errors
    /// - The upload cannot be decoded as an image
    /// - Encoding the resized image fails
    #[instrument(skip(upload, profile), fields(file = %upload.file_name, mode = ?profile.mode))]
    pub fn prepare(upload: &UploadedFile, profile: &TierProfile) -> Result<EncodedImage> {
        let image = Self::decode(upload)?;
        let (width, height) =
            Self::fit_dimensions(image.width(), image.height(), profile.max_dimension);

        debug!(
            "Resizing {}x{} -> {}x{}",
            image.width(),
            image.height(),
            width,
            height
        );

        let resized = if (width, height) == (image.width(), image.height()) {
            image
        } else {
            image.resize_exact(width, height, FilterType::Triangle)
        };

        let bytes = Self::encode(resized, profile.output_format, profile.jpeg_quality)?;

        Ok(EncodedImage {
            bytes: bytes.into(),
            mime_type: OutputFormatHandler::mime_type(profile.output_format),
            file_name: profile.upload_name.clone(),
            width,
            height,
            size_hint: profile.size_hint,
        })
    }

    /// [`Self::prepare`] on the blocking thread pool
    ///
    /// # Errors
    /// Same as [`Self::prepare`], plus a panicked worker
    pub async fn prepare_async(upload: UploadedFile, profile: TierProfile) -> Result<EncodedImage> {
        tokio::task::spawn_blocking(move || Self::prepare(&upload, &profile))
            .await
            .map_err(|e| RelayError::internal(format!("Image preparation task failed: {}", e)))?
    }

    fn decode(upload: &UploadedFile) -> Result<DynamicImage> {
        match image::load_from_memory(&upload.bytes) {
            Ok(img) => Ok(img),
            Err(content_err) => {
                // Content sniffing failed; retry with the declared MIME type
                let Some(format) = ImageFormat::from_mime_type(&upload.mime_type) else {
                    return Err(RelayError::processing(format!(
                        "Failed to decode '{}' ({} bytes): {}",
                        upload.file_name,
                        upload.bytes.len(),
                        content_err
                    )));
                };
                log::debug!(
                    "Content-based detection failed for {}: {}. Retrying as {:?}.",
                    upload.file_name,
                    content_err,
                    format
                );
                Ok(image::load_from_memory_with_format(&upload.bytes, format)?)
            },
        }
    }

    fn encode(image: DynamicImage, format: OutputFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
        let image = OutputFormatHandler::convert_format(image, format);
        let mut buffer = Vec::new();

        match OutputFormatHandler::image_format(format) {
            ImageFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut buffer, jpeg_quality);
                image.write_with_encoder(encoder)?;
            },
            other => image.write_to(&mut Cursor::new(&mut buffer), other)?,
        }

        Ok(buffer)
    }
}
