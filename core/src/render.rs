//! Thread-per-tile render loop scaffolding (spec §5).
//!
//! Design Notes §9: "Global scratch arrays → explicit per-thread context
//! passed as the first parameter of every hot function." [`render_tiles`]
//! is that redesign applied to the outermost loop: each tile gets its own
//! freshly-built [`TraceContext`], never shared or reused across threads,
//! and `rayon`'s work-stealing pool decides how many tiles run at once.
//! What happens inside a tile (camera ray generation, pixel output) is
//! outside this crate's scope; callers supply that as `trace_tile`.

use crate::context::TraceContext;
use rayon::prelude::*;

/// One rectangular tile of the output image, in pixel coordinates.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Tile {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl Tile {
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        debug_assert!(x0 <= x1 && y0 <= y1, "tile bounds must be ordered");
        Self { x0, y0, x1, y1 }
    }
}

/// Splits a `width x height` image into tiles of at most `tile_size x
/// tile_size` pixels, row-major.
pub fn tile_image(width: u32, height: u32, tile_size: u32) -> Vec<Tile> {
    let mut tiles = Vec::new();
    let mut y0 = 0;
    while y0 < height {
        let y1 = (y0 + tile_size).min(height);
        let mut x0 = 0;
        while x0 < width {
            let x1 = (x0 + tile_size).min(width);
            tiles.push(Tile::new(x0, y0, x1, y1));
            x0 = x1;
        }
        y0 = y1;
    }
    tiles
}

/// Runs `trace_tile` once per tile in `tiles`, in parallel, handing each
/// invocation a fresh per-thread [`TraceContext`] seeded from `base_seed`
/// mixed with the tile's index. No context is shared across threads or
/// reused across tiles.
pub fn render_tiles<F>(tiles: &[Tile], base_seed: u64, trace_tile: F)
where
    F: Fn(&Tile, &mut TraceContext) + Send + Sync,
{
    tiles.par_iter().enumerate().for_each(|(i, tile)| {
        let mut ctx = TraceContext::new(base_seed.wrapping_add(i as u64));
        trace_tile(tile, &mut ctx);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn tile_image_covers_the_whole_frame_without_overlap() {
        let tiles = tile_image(10, 7, 4);
        let mut pixels = vec![0u8; 10 * 7];
        for t in &tiles {
            for y in t.y0..t.y1 {
                for x in t.x0..t.x1 {
                    let idx = (y * 10 + x) as usize;
                    assert_eq!(pixels[idx], 0, "pixel ({x},{y}) covered by more than one tile");
                    pixels[idx] = 1;
                }
            }
        }
        assert!(pixels.iter().all(|&p| p == 1));
    }

    #[test]
    fn render_tiles_visits_every_tile_exactly_once() {
        let tiles = tile_image(20, 20, 5);
        let visits = AtomicU64::new(0);
        render_tiles(&tiles, 42, |_tile, ctx| {
            ctx.begin_ray();
            visits.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(visits.load(Ordering::SeqCst), tiles.len() as u64);
    }
}
