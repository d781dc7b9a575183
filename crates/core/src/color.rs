//! Color-marker token detection on raster templates.
//!
//! Designers paint placeholder boxes in a saturated magenta. Every connected
//! magenta blob larger than [`MIN_REGION_SIDE`] on both axes becomes a field
//! named `TOKEN_1`, `TOKEN_2`, ... in raster scan order.

use crate::field::{Bounds, FieldSource, RawField};
use crate::ids::IdSource;
use crate::normalize::LINE_HEIGHT_FACTOR;
use crate::region::{scan_region, PixelBuffer, Region, VisitedMask};

/// Regions must be strictly larger than this many pixels on both axes.
pub const MIN_REGION_SIDE: u32 = 10;

/// Marker color test: high red, near-zero green, high blue. Alpha ignored.
pub fn is_marker_pixel(px: [u8; 4]) -> bool {
    px[0] > 240 && px[1] < 20 && px[2] > 240
}

/// Marker regions in raster order (row-major, top-left first), size-filtered.
pub fn find_marker_regions(buffer: &PixelBuffer<'_>) -> Vec<Region> {
    let mut visited = VisitedMask::for_buffer(buffer);
    let mut regions = Vec::new();

    for y in 0..buffer.height() {
        for x in 0..buffer.width() {
            if visited.is_visited(x, y) || !is_marker_pixel(buffer.rgba(x, y)) {
                continue;
            }
            let region = scan_region(buffer, (x, y), is_marker_pixel, &mut visited);
            if region.width > MIN_REGION_SIDE && region.height > MIN_REGION_SIDE {
                regions.push(region);
            }
        }
    }

    regions
}

/// One `color` field per marker region.
///
/// Font size equals the region height. Names count only the regions that
/// survive the size filter.
pub fn detect_color_tokens(buffer: &PixelBuffer<'_>, mut ids: impl IdSource) -> Vec<RawField> {
    find_marker_regions(buffer)
        .into_iter()
        .enumerate()
        .map(|(i, region)| {
            let bounds = Bounds::new(
                region.x as f32,
                region.y as f32,
                region.width as f32,
                region.height as f32,
            );
            let mut field = RawField::new(
                ids.next_id(),
                format!("TOKEN_{}", i + 1),
                FieldSource::Color,
                bounds,
            );
            field.font_size = Some(bounds.height);
            field.line_height = Some(bounds.height * LINE_HEIGHT_FACTOR);
            field
        })
        .collect()
}
