// ============================================================================
// CHANNEL OPERATIONS — plane extraction, swap, and wraparound compositing
// ============================================================================
//
// All functions here are pure with respect to application state: they take
// flat RGBA images and produce flat RGBA images. The pipeline module owns
// when they run; the GUI and CLI never call into pixel loops directly.

use image::RgbaImage;
use rayon::prelude::*;

use crate::EditError;

/// One of the three color channels of an RGBA pixel.
///
/// The discriminant doubles as the byte offset of the channel's sample
/// within a 4-byte pixel tuple.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelIndex {
    Red = 0,
    Green = 1,
    Blue = 2,
}

impl ChannelIndex {
    /// All channels in compositing order. Render passes must composite in
    /// exactly this order since the planes accumulate additively onto one
    /// destination.
    pub fn all() -> [ChannelIndex; 3] {
        [ChannelIndex::Red, ChannelIndex::Green, ChannelIndex::Blue]
    }

    /// Byte offset of this channel's sample within a 4-byte RGBA pixel.
    pub fn offset(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            ChannelIndex::Red => "Red",
            ChannelIndex::Green => "Green",
            ChannelIndex::Blue => "Blue",
        }
    }

    /// Parse a CLI channel name ("red", "g", "2", ...). Case-insensitive.
    pub fn parse(s: &str) -> Option<ChannelIndex> {
        match s.trim().to_lowercase().as_str() {
            "red" | "r" | "0" => Some(ChannelIndex::Red),
            "green" | "g" | "1" => Some(ChannelIndex::Green),
            "blue" | "b" | "2" => Some(ChannelIndex::Blue),
            _ => None,
        }
    }
}

/// Per-channel toroidal translation, clamped to [0, dimension] inclusive.
///
/// A shift equal to the full dimension is representable on purpose: by
/// periodicity it renders identically to (0, 0), which keeps the slider
/// range symmetric instead of stopping one pixel short of a full cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShiftVector {
    pub dx: u32,
    pub dy: u32,
}

impl ShiftVector {
    pub fn new(dx: u32, dy: u32) -> Self {
        Self { dx, dy }
    }

    pub fn is_zero(self) -> bool {
        self.dx == 0 && self.dy == 0
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Split a source raster into its three channel planes.
///
/// Each output plane carries the source's samples for exactly one channel at
/// that channel's byte offset; the other two channel bytes are zero and
/// alpha is forced to 255 regardless of the source's alpha. Additively
/// recompositing the three planes with zero shift therefore reconstructs
/// the source's RGB bytes exactly.
///
/// Fails with [`EditError::InvalidDimensions`] on a zero-size raster or a
/// pixel buffer that does not match width×height×4.
pub fn extract_planes(source: &RgbaImage) -> Result<[RgbaImage; 3], EditError> {
    let w = source.width();
    let h = source.height();
    let expected = w as usize * h as usize * 4;
    if w == 0 || h == 0 || source.as_raw().len() != expected {
        return Err(EditError::InvalidDimensions {
            width: w,
            height: h,
            buffer_len: source.as_raw().len(),
        });
    }

    let src_raw = source.as_raw();
    let stride = w as usize * 4;

    let planes = ChannelIndex::all().map(|channel| {
        let c = channel.offset();
        let mut dst_raw = vec![0u8; expected];
        dst_raw
            .par_chunks_mut(stride)
            .enumerate()
            .for_each(|(y, row_out)| {
                let row_in = &src_raw[y * stride..(y + 1) * stride];
                for x in 0..w as usize {
                    let pi = x * 4;
                    row_out[pi + c] = row_in[pi + c];
                    row_out[pi + 3] = 255;
                }
            });
        RgbaImage::from_raw(w, h, dst_raw).unwrap()
    });

    Ok(planes)
}

// ============================================================================
// Swap
// ============================================================================

/// Exchange the per-pixel intensity values of two channel planes.
///
/// `source == target` is the no-swap default and returns the input
/// unchanged. Otherwise the new source-indexed plane carries, at every
/// pixel, the intensity previously stored in the target plane's channel
/// byte — written into the *source* channel's byte position, so a plane's
/// channel offset keeps its visual meaning while the content crosses over.
/// Alpha is forced to 255 in both rebuilt planes; the third plane passes
/// through untouched. Applying the same swap twice restores the input.
pub fn swap_planes(
    planes: &[RgbaImage; 3],
    source: ChannelIndex,
    target: ChannelIndex,
) -> [RgbaImage; 3] {
    if source == target {
        return planes.clone();
    }

    let w = planes[0].width();
    let h = planes[0].height();
    let stride = w as usize * 4;
    let len = w as usize * h as usize * 4;
    let s = source.offset();
    let t = target.offset();
    let source_raw = planes[s].as_raw();
    let target_raw = planes[t].as_raw();

    // (read offset in the other plane, write offset in the new plane)
    let rebuild = |from_raw: &Vec<u8>, read: usize, write: usize| -> RgbaImage {
        let mut dst_raw = vec![0u8; len];
        dst_raw
            .par_chunks_mut(stride)
            .enumerate()
            .for_each(|(y, row_out)| {
                let row_in = &from_raw[y * stride..(y + 1) * stride];
                for x in 0..w as usize {
                    let pi = x * 4;
                    row_out[pi + write] = row_in[pi + read];
                    row_out[pi + 3] = 255;
                }
            });
        RgbaImage::from_raw(w, h, dst_raw).unwrap()
    };

    let mut out = planes.clone();
    out[s] = rebuild(target_raw, t, s);
    out[t] = rebuild(source_raw, s, t);
    out
}

// ============================================================================
// Wraparound compositing
// ============================================================================

/// Additively blit a rectangle of `src` onto `dest`.
///
/// Every sample in the rectangle becomes `saturating_add(dest, src)`.
/// Zero-area rectangles are skipped, which is what lets the 4-tile
/// decomposition in [`composite_shifted`] degenerate cleanly at
/// dx ∈ {0, W} and dy ∈ {0, H}.
fn blit_add(
    dest: &mut RgbaImage,
    src: &RgbaImage,
    src_x: u32,
    src_y: u32,
    dst_x: u32,
    dst_y: u32,
    rect_w: u32,
    rect_h: u32,
) {
    if rect_w == 0 || rect_h == 0 {
        return;
    }

    let src_stride = src.width() as usize * 4;
    let dst_stride = dest.width() as usize * 4;
    let row_bytes = rect_w as usize * 4;
    let src_raw = src.as_raw();
    let dst_raw: &mut [u8] = dest;

    for row in 0..rect_h as usize {
        let si = (src_y as usize + row) * src_stride + src_x as usize * 4;
        let di = (dst_y as usize + row) * dst_stride + dst_x as usize * 4;
        let src_row = &src_raw[si..si + row_bytes];
        let dst_row = &mut dst_raw[di..di + row_bytes];
        for (d, s) in dst_row.iter_mut().zip(src_row) {
            *d = d.saturating_add(*s);
        }
    }
}

/// Composite a channel plane onto `dest` with a toroidal (dx, dy) shift.
///
/// The plane is treated as periodic in both axes: shifted content re-enters
/// from the opposite edge instead of leaving an empty border. With W, H the
/// plane dimensions and 0 ≤ dx ≤ W, 0 ≤ dy ≤ H, the plane decomposes into
/// up to four rectangular tiles that exactly tile the destination:
///
///   1. main tile:        src (0, 0)        size (W-dx, H-dy) → dst (dx, dy)
///   2. horizontal wrap:  src (W-dx, 0)     size (dx,   H-dy) → dst (0,  dy)
///   3. vertical wrap:    src (0, H-dy)     size (W-dx, dy)   → dst (dx, 0)
///   4. corner wrap:      src (W-dx, H-dy)  size (dx,   dy)   → dst (0,  0)
///
/// Each tile copy is an additive blend, never an overwrite, so successive
/// channels accumulate onto the same destination. The destination must be
/// pre-cleared before the first channel of a render pass.
pub fn composite_shifted(dest: &mut RgbaImage, plane: &RgbaImage, shift: ShiftVector) {
    let w = plane.width();
    let h = plane.height();
    debug_assert_eq!((w, h), (dest.width(), dest.height()));

    let dx = shift.dx.min(w);
    let dy = shift.dy.min(h);

    blit_add(dest, plane, 0, 0, dx, dy, w - dx, h - dy);
    blit_add(dest, plane, w - dx, 0, 0, dy, dx, h - dy);
    blit_add(dest, plane, 0, h - dy, dx, 0, w - dx, dy);
    blit_add(dest, plane, w - dx, h - dy, 0, 0, dx, dy);
}

/// Run one full render pass: composite all three planes, each with its own
/// shift vector, onto a freshly cleared destination in RED→GREEN→BLUE order.
pub fn composite_planes(planes: &[RgbaImage; 3], shifts: &[ShiftVector; 3]) -> RgbaImage {
    let mut dest = RgbaImage::new(planes[0].width(), planes[0].height());
    for channel in ChannelIndex::all() {
        let i = channel.offset();
        composite_shifted(&mut dest, &planes[i], shifts[i]);
    }
    dest
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// Deterministic test image with a distinct value in every channel byte.
    fn test_image(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            let base = (y * w + x) as u8;
            Rgba([
                base.wrapping_mul(3),
                base.wrapping_mul(5).wrapping_add(7),
                base.wrapping_mul(11).wrapping_add(1),
                base.wrapping_mul(2).wrapping_add(9),
            ])
        })
    }

    fn zero_shifts() -> [ShiftVector; 3] {
        [ShiftVector::default(); 3]
    }

    #[test]
    fn extract_isolates_channels_and_forces_alpha() {
        let img = test_image(5, 4);
        let planes = extract_planes(&img).unwrap();

        for channel in ChannelIndex::all() {
            let c = channel.offset();
            let plane = &planes[c];
            for (x, y, px) in plane.enumerate_pixels() {
                let src = img.get_pixel(x, y);
                for k in 0..3 {
                    let expected = if k == c { src[k] } else { 0 };
                    assert_eq!(px[k], expected, "channel {} at ({}, {})", k, x, y);
                }
                assert_eq!(px[3], 255);
            }
        }
    }

    #[test]
    fn extract_rejects_zero_size() {
        let img = RgbaImage::new(0, 0);
        match extract_planes(&img) {
            Err(EditError::InvalidDimensions { .. }) => {}
            other => panic!("expected InvalidDimensions, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn zero_shift_recomposition_reconstructs_rgb() {
        let img = test_image(7, 3);
        let planes = extract_planes(&img).unwrap();
        let out = composite_planes(&planes, &zero_shifts());

        for (x, y, px) in out.enumerate_pixels() {
            let src = img.get_pixel(x, y);
            assert_eq!(&px.0[..3], &src.0[..3], "RGB mismatch at ({}, {})", x, y);
            assert_eq!(px[3], 255);
        }
    }

    #[test]
    fn swap_same_channel_is_identity() {
        let planes = extract_planes(&test_image(4, 4)).unwrap();
        for channel in ChannelIndex::all() {
            let swapped = swap_planes(&planes, channel, channel);
            for i in 0..3 {
                assert_eq!(swapped[i].as_raw(), planes[i].as_raw());
            }
        }
    }

    #[test]
    fn swap_is_an_involution() {
        let planes = extract_planes(&test_image(6, 5)).unwrap();
        let pairs = [
            (ChannelIndex::Red, ChannelIndex::Green),
            (ChannelIndex::Red, ChannelIndex::Blue),
            (ChannelIndex::Green, ChannelIndex::Blue),
        ];
        for (a, b) in pairs {
            let twice = swap_planes(&swap_planes(&planes, a, b), a, b);
            for i in 0..3 {
                assert_eq!(twice[i].as_raw(), planes[i].as_raw(), "pair {:?}/{:?}", a, b);
            }
        }
    }

    #[test]
    fn swap_crosses_content_over() {
        // Pure red source; swapping red↔blue must render pure blue.
        let img = RgbaImage::from_pixel(3, 3, Rgba([255, 0, 0, 255]));
        let planes = extract_planes(&img).unwrap();
        let swapped = swap_planes(&planes, ChannelIndex::Red, ChannelIndex::Blue);
        let out = composite_planes(&swapped, &zero_shifts());

        for (_, _, px) in out.enumerate_pixels() {
            assert_eq!(px.0, [0, 0, 255, 255]);
        }
    }

    #[test]
    fn swap_leaves_third_plane_untouched() {
        let img = test_image(4, 4);
        let planes = extract_planes(&img).unwrap();
        let swapped = swap_planes(&planes, ChannelIndex::Red, ChannelIndex::Blue);
        assert_eq!(
            swapped[ChannelIndex::Green.offset()].as_raw(),
            planes[ChannelIndex::Green.offset()].as_raw()
        );
    }

    #[test]
    fn composite_zero_shift_is_byte_exact_copy() {
        let planes = extract_planes(&test_image(8, 8)).unwrap();
        let plane = &planes[0];
        let mut dest = RgbaImage::new(8, 8);
        composite_shifted(&mut dest, plane, ShiftVector::default());
        assert_eq!(dest.as_raw(), plane.as_raw());
    }

    #[test]
    fn full_dimension_shift_equals_zero_shift() {
        let planes = extract_planes(&test_image(6, 4)).unwrap();
        let plane = &planes[1];

        let mut a = RgbaImage::new(6, 4);
        composite_shifted(&mut a, plane, ShiftVector::default());
        let mut b = RgbaImage::new(6, 4);
        composite_shifted(&mut b, plane, ShiftVector::new(6, 4));

        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn wraparound_round_trip_restores_identity() {
        let planes = extract_planes(&test_image(9, 5)).unwrap();
        let plane = &planes[2];

        for dx in 0..=9u32 {
            // Onto a zeroed dest the additive blend is a plain copy, so the
            // shifted result can itself be shifted again.
            let mut once = RgbaImage::new(9, 5);
            composite_shifted(&mut once, plane, ShiftVector::new(dx, 0));
            let mut back = RgbaImage::new(9, 5);
            composite_shifted(&mut back, &once, ShiftVector::new(9 - dx, 0));
            assert_eq!(back.as_raw(), plane.as_raw(), "dx = {}", dx);
        }
    }

    #[test]
    fn red_shift_moves_last_column_to_left_edge() {
        // 4×4 gradient; shift RED by (1, 0): every red sample moves one
        // column right, the rightmost column wraps to x = 0, rows unchanged.
        // Green/blue stay at their original positions.
        let img = test_image(4, 4);
        let planes = extract_planes(&img).unwrap();
        let shifts = [
            ShiftVector::new(1, 0),
            ShiftVector::default(),
            ShiftVector::default(),
        ];
        let out = composite_planes(&planes, &shifts);

        for (x, y, px) in out.enumerate_pixels() {
            let red_src_x = if x == 0 { 3 } else { x - 1 };
            assert_eq!(px[0], img.get_pixel(red_src_x, y)[0], "red at ({}, {})", x, y);
            assert_eq!(px[1], img.get_pixel(x, y)[1], "green at ({}, {})", x, y);
            assert_eq!(px[2], img.get_pixel(x, y)[2], "blue at ({}, {})", x, y);
        }
    }

    #[test]
    fn diagonal_shift_uses_all_four_tiles() {
        let planes = extract_planes(&test_image(5, 5)).unwrap();
        let plane = &planes[0];
        let mut dest = RgbaImage::new(5, 5);
        composite_shifted(&mut dest, plane, ShiftVector::new(2, 3));

        for (x, y, px) in dest.enumerate_pixels() {
            let sx = (x + 5 - 2) % 5;
            let sy = (y + 5 - 3) % 5;
            assert_eq!(px.0, plane.get_pixel(sx, sy).0, "at ({}, {})", x, y);
        }
    }

    #[test]
    fn additive_blend_saturates() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([200, 0, 0, 255]));
        let planes = extract_planes(&img).unwrap();
        let plane = &planes[0];
        let mut dest = RgbaImage::new(2, 2);
        composite_shifted(&mut dest, plane, ShiftVector::default());
        composite_shifted(&mut dest, plane, ShiftVector::default());
        // 200 + 200 saturates at 255, never wraps.
        assert_eq!(dest.get_pixel(0, 0).0, [255, 0, 0, 255]);
    }
}
