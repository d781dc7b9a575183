use std::io::Cursor;

use certigenie_core::region::PixelBuffer;

use super::RasterImage;
use crate::error::Error;

/// An uploaded image decoded to RGBA8.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl DecodedImage {
    pub fn pixels(&self) -> Result<PixelBuffer<'_>, Error> {
        PixelBuffer::new(self.width, self.height, &self.rgba)
            .map_err(|e| Error::ImageDecodeFailure(e.to_string()))
    }

    fn to_png(&self) -> Result<Vec<u8>, Error> {
        let buffer = image::RgbaImage::from_raw(self.width, self.height, self.rgba.clone())
            .ok_or_else(|| Error::ImageDecodeFailure("pixel buffer size mismatch".to_string()))?;
        let mut png = Vec::new();
        image::DynamicImage::ImageRgba8(buffer)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| Error::ImageDecodeFailure(e.to_string()))?;
        Ok(png)
    }
}

/// Decode any supported raster format to RGBA8.
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage, Error> {
    let image =
        image::load_from_memory(bytes).map_err(|e| Error::ImageDecodeFailure(e.to_string()))?;
    let rgba = image.to_rgba8();
    Ok(DecodedImage {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}

/// Decode an uploaded image off the async runtime.
///
/// Returns the pixels for color detection and a PNG copy that serves as the
/// template image.
pub async fn decode_upload(bytes: Vec<u8>) -> Result<(DecodedImage, RasterImage), Error> {
    tokio::task::spawn_blocking(move || {
        let decoded = decode_image(&bytes)?;
        let raster = RasterImage {
            png: decoded.to_png()?,
            width: decoded.width,
            height: decoded.height,
        };
        Ok((decoded, raster))
    })
    .await
    .map_err(|e| Error::ImageDecodeFailure(format!("Task join error: {e}")))?
}

/// Wrap a rendered PNG, reading its dimensions.
pub async fn raster_from_png(png: Vec<u8>) -> Result<RasterImage, Error> {
    tokio::task::spawn_blocking(move || {
        let image = image::load_from_memory_with_format(&png, image::ImageFormat::Png)
            .map_err(|e| Error::RasterizationFailure(format!("unreadable page image: {e}")))?;
        Ok(RasterImage {
            width: image.width(),
            height: image.height(),
            png,
        })
    })
    .await
    .map_err(|e| Error::RasterizationFailure(format!("Task join error: {e}")))?
}
