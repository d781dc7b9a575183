//! Connected-region scanning over RGBA pixel buffers.

use std::collections::VecDeque;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PixelBufferError {
    #[error("Pixel buffer holds {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Borrowed view over tightly packed 8-bit RGBA rows, top row first.
#[derive(Debug, Clone, Copy)]
pub struct PixelBuffer<'a> {
    width: u32,
    height: u32,
    data: &'a [u8],
}

impl<'a> PixelBuffer<'a> {
    pub fn new(width: u32, height: u32, data: &'a [u8]) -> Result<Self, PixelBufferError> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(PixelBufferError::SizeMismatch {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// RGBA of the pixel at (`x`, `y`). Caller guarantees bounds.
    pub fn rgba(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }
}

/// Integer pixel box. Inclusive of both edge pixels: a single pixel is 1x1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One bit per pixel: has the pixel been claimed by a region yet?
#[derive(Debug, Clone)]
pub struct VisitedMask {
    width: u32,
    bits: Vec<bool>,
}

impl VisitedMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            bits: vec![false; width as usize * height as usize],
        }
    }

    pub fn for_buffer(buffer: &PixelBuffer<'_>) -> Self {
        Self::new(buffer.width(), buffer.height())
    }

    pub fn is_visited(&self, x: u32, y: u32) -> bool {
        self.bits[y as usize * self.width as usize + x as usize]
    }

    /// Marks the pixel. Returns `false` if it was already marked.
    pub fn mark(&mut self, x: u32, y: u32) -> bool {
        let slot = &mut self.bits[y as usize * self.width as usize + x as usize];
        if *slot {
            return false;
        }
        *slot = true;
        true
    }
}

const NEIGHBOURS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Bounding box of the 8-connected set of matching pixels containing `start`.
///
/// `start` is assumed to match. Every pixel reached is marked in `visited`
/// so an outer scan can skip it later. Pixels are marked when enqueued, so
/// each pixel enters the queue at most once.
pub fn scan_region<F>(
    buffer: &PixelBuffer<'_>,
    start: (u32, u32),
    matches: F,
    visited: &mut VisitedMask,
) -> Region
where
    F: Fn([u8; 4]) -> bool,
{
    let (sx, sy) = start;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (sx, sy, sx, sy);

    visited.mark(sx, sy);
    let mut queue = VecDeque::new();
    queue.push_back((sx, sy));

    let w = buffer.width() as i64;
    let h = buffer.height() as i64;

    while let Some((x, y)) = queue.pop_front() {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);

        for (dx, dy) in NEIGHBOURS {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx < 0 || ny < 0 || nx >= w || ny >= h {
                continue;
            }
            let (nx, ny) = (nx as u32, ny as u32);
            if visited.is_visited(nx, ny) || !matches(buffer.rgba(nx, ny)) {
                continue;
            }
            visited.mark(nx, ny);
            queue.push_back((nx, ny));
        }
    }

    Region {
        x: min_x,
        y: min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
    }
}
