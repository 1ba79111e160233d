//! Output format handling service
//!
//! Maps the prepared-upload formats to pixel layouts, MIME types and file
//! extensions, and reconciles download names with the result's content type.

use crate::config::OutputFormat;
use image::{DynamicImage, ImageFormat};

/// Service for handling output format conversions
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Convert a decoded image to the pixel layout the format can encode
    ///
    /// PNG keeps the alpha channel; JPEG drops it.
    ///
    /// # Examples
    /// ```rust
    /// use bgremove_relay::{services::OutputFormatHandler, config::OutputFormat};
    /// use image::{DynamicImage, RgbaImage};
    ///
    /// let image = DynamicImage::ImageRgba8(RgbaImage::new(4, 4));
    /// let converted = OutputFormatHandler::convert_format(image, OutputFormat::Jpeg);
    /// assert!(matches!(converted, DynamicImage::ImageRgb8(_)));
    /// ```
    #[must_use]
    pub fn convert_format(image: DynamicImage, format: OutputFormat) -> DynamicImage {
        match format {
            OutputFormat::Png => match image {
                DynamicImage::ImageRgba8(_) => image,
                other => DynamicImage::ImageRgba8(other.to_rgba8()),
            },
            OutputFormat::Jpeg => match image {
                DynamicImage::ImageRgb8(_) => image,
                other => DynamicImage::ImageRgb8(other.to_rgb8()),
            },
        }
    }

    #[must_use]
    pub fn mime_type(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }

    /// Encoder format of the prepared upload
    #[must_use]
    pub fn image_format(format: OutputFormat) -> ImageFormat {
        match format {
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::Jpeg => ImageFormat::Jpeg,
        }
    }

    /// File extension matching a result content type, if it is a known image type
    #[must_use]
    pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        ImageFormat::from_mime_type(&essence).and_then(|format| match format {
            ImageFormat::Jpeg => Some("jpg"),
            other => other.extensions_str().first().copied(),
        })
    }

    /// Replace the extension of `download_name` with one that matches `content_type`
    ///
    /// Unknown content types leave the name untouched.
    ///
    /// # Examples
    /// ```rust
    /// use bgremove_relay::services::OutputFormatHandler;
    ///
    /// assert_eq!(
    ///     OutputFormatHandler::download_name_for("background-removed.png", "image/jpeg"),
    ///     "background-removed.jpg"
    /// );
    /// ```
    #[must_use]
    pub fn download_name_for(download_name: &str, content_type: &str) -> String {
        let Some(extension) = Self::extension_for_content_type(content_type) else {
            return download_name.to_string();
        };
        let stem = std::path::Path::new(download_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(download_name);
        format!("{}.{}", stem, extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_convert_format_png_keeps_alpha() {
        let rgba_image = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 128]));
        let converted =
            OutputFormatHandler::convert_format(DynamicImage::ImageRgba8(rgba_image), OutputFormat::Png);
        match converted {
            DynamicImage::ImageRgba8(img) => assert_eq!(img.get_pixel(0, 0)[3], 128),
            _ => panic!("Expected RGBA8 image for PNG format"),
        }
    }

    #[test]
    fn test_convert_format_jpeg() {
        let rgba_image = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 128]));
        let converted =
            OutputFormatHandler::convert_format(DynamicImage::ImageRgba8(rgba_image), OutputFormat::Jpeg);
        assert_eq!(converted.width(), 2);
        match converted {
            DynamicImage::ImageRgb8(_) => {},
            _ => panic!("Expected RGB8 image for JPEG format"),
        }
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(OutputFormatHandler::mime_type(OutputFormat::Png), "image/png");
        assert_eq!(OutputFormatHandler::mime_type(OutputFormat::Jpeg), "image/jpeg");
        assert_eq!(OutputFormatHandler::image_format(OutputFormat::Png), ImageFormat::Png);
        assert_eq!(OutputFormatHandler::image_format(OutputFormat::Jpeg), ImageFormat::Jpeg);
    }

    #[test]
    fn test_extension_for_content_type() {
        assert_eq!(
            OutputFormatHandler::extension_for_content_type("image/png"),
            Some("png")
        );
        assert_eq!(
            OutputFormatHandler::extension_for_content_type("IMAGE/JPEG; charset=binary"),
            Some("jpg")
        );
        assert_eq!(
            OutputFormatHandler::extension_for_content_type("application/octet-stream"),
            None
        );
    }

    #[test]
    fn test_download_name_reconciled() {
        assert_eq!(
            OutputFormatHandler::download_name_for("background-removed-preview.png", "image/png"),
            "background-removed-preview.png"
        );
        assert_eq!(
            OutputFormatHandler::download_name_for("background-removed.png", "text/plain"),
            "background-removed.png"
        );
    }
}
