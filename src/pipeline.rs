// ============================================================================
// EDIT PIPELINE — the non-destructive channel-edit state machine
// ============================================================================
//
// Holds the committed baseline (three cached channel planes extracted from
// the last loaded or confirmed image) plus the current edit parameters
// (three shift vectors, one swap selection). `render` is a pure function of
// that state; `confirm` is the only operation besides `load_image` that
// replaces the baseline.

use image::RgbaImage;

use crate::EditError;
use crate::MAX_CANVAS_PIXELS;
use crate::ops::channels::{
    ChannelIndex, ShiftVector, composite_planes, extract_planes, swap_planes,
};

/// Which two channels exchange their content. Equal source/target means
/// no swap (the default), not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelSelection {
    pub source: ChannelIndex,
    pub target: ChannelIndex,
}

impl Default for ChannelSelection {
    fn default() -> Self {
        Self {
            source: ChannelIndex::Red,
            target: ChannelIndex::Red,
        }
    }
}

impl ChannelSelection {
    /// True when the selection names two different channels.
    pub fn is_swap(self) -> bool {
        self.source != self.target
    }
}

/// Snapshot of everything a render pass depends on.
///
/// `planes` is the committed baseline: replaced wholesale only by
/// `load_image` or `confirm`. `shifts` and `selection` are the only
/// mutable edit parameters between those checkpoints.
struct EditState {
    planes: [RgbaImage; 3],
    width: u32,
    height: u32,
    shifts: [ShiftVector; 3],
    selection: ChannelSelection,
}

/// The edit controller. `None` state means no image has been loaded yet
/// (every query returns its empty default and every trigger is a no-op).
#[derive(Default)]
pub struct EditPipeline {
    state: Option<EditState>,
}

impl EditPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.state.is_some()
    }

    /// Dimensions of the loaded image, used by the UI for slider bounds.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.state.as_ref().map(|s| (s.width, s.height))
    }

    /// Load a new source image, replacing any previous edit session.
    ///
    /// Validates dimensions and the canvas pixel limit, extracts fresh
    /// channel planes, and resets all edit parameters to their defaults.
    /// All validation happens here — once an image is loaded, rendering
    /// cannot fail.
    pub fn load_image(&mut self, source: &RgbaImage) -> Result<(), EditError> {
        let (width, height) = source.dimensions();
        check_canvas_limit(width, height)?;
        let planes = extract_planes(source)?;
        self.state = Some(EditState {
            planes,
            width,
            height,
            shifts: [ShiftVector::default(); 3],
            selection: ChannelSelection::default(),
        });
        Ok(())
    }

    /// Set one channel's shift vector. Out-of-range values are clamped to
    /// [0, width] × [0, height] inclusive — never rejected.
    pub fn set_shift(&mut self, channel: ChannelIndex, dx: u32, dy: u32) {
        if let Some(state) = self.state.as_mut() {
            state.shifts[channel.offset()] = ShiftVector::new(dx.min(state.width), dy.min(state.height));
        }
    }

    /// Current shift vector for a channel ((0,0) when nothing is loaded).
    pub fn shift(&self, channel: ChannelIndex) -> ShiftVector {
        self.state
            .as_ref()
            .map(|s| s.shifts[channel.offset()])
            .unwrap_or_default()
    }

    pub fn set_selection(&mut self, source: ChannelIndex, target: ChannelIndex) {
        if let Some(state) = self.state.as_mut() {
            state.selection = ChannelSelection { source, target };
        }
    }

    pub fn selection(&self) -> ChannelSelection {
        self.state
            .as_ref()
            .map(|s| s.selection)
            .unwrap_or_default()
    }

    /// True when any shift vector differs from (0, 0). Pure query — drives
    /// confirm/reset enablement in the UI.
    pub fn shift_modified(&self) -> bool {
        self.state
            .as_ref()
            .is_some_and(|s| s.shifts.iter().any(|v| !v.is_zero()))
    }

    /// True when the swap selection names two different channels.
    pub fn swap_modified(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.selection.is_swap())
    }

    pub fn modified(&self) -> bool {
        self.shift_modified() || self.swap_modified()
    }

    /// Render the current preview. Pure function of the edit state:
    /// recomputes the preview planes (swap applied only when the selection
    /// differs), then composites all three with their shift vectors in
    /// RED→GREEN→BLUE order. Idempotent for an unchanged state; `None`
    /// when no image is loaded.
    pub fn render(&self) -> Option<RgbaImage> {
        let state = self.state.as_ref()?;
        let planes = if state.selection.is_swap() {
            swap_planes(&state.planes, state.selection.source, state.selection.target)
        } else {
            state.planes.clone()
        };
        Some(composite_planes(&planes, &state.shifts))
    }

    /// Clear shifts and selection back to their defaults. The committed
    /// baseline planes are untouched.
    pub fn reset(&mut self) {
        if let Some(state) = self.state.as_mut() {
            state.shifts = [ShiftVector::default(); 3];
            state.selection = ChannelSelection::default();
        }
    }

    /// Bake the current preview into the new baseline, then reset the edit
    /// parameters. With defaults already in place this is a content no-op:
    /// the re-extracted planes render back to the same image.
    pub fn confirm(&mut self) {
        let Some(rendered) = self.render() else {
            return;
        };
        if let Some(state) = self.state.as_mut() {
            // Dimensions are unchanged from the validated load, so
            // re-extraction cannot fail here.
            if let Ok(planes) = extract_planes(&rendered) {
                state.planes = planes;
            }
        }
        self.reset();
    }
}

/// Reject images whose pixel count the platform cannot allocate a canvas
/// for. Surfaced as a distinct error rather than clamping the image, so the
/// caller can tell the user instead of showing a silently truncated result.
pub fn check_canvas_limit(width: u32, height: u32) -> Result<(), EditError> {
    let pixels = width as u64 * height as u64;
    if pixels > MAX_CANVAS_PIXELS {
        return Err(EditError::CanvasLimit {
            pixels,
            max: MAX_CANVAS_PIXELS,
        });
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            Rgba([
                (x * 40) as u8,
                (y * 40) as u8,
                ((x + y) * 20) as u8,
                255,
            ])
        })
    }

    fn loaded_pipeline(w: u32, h: u32) -> EditPipeline {
        let mut p = EditPipeline::new();
        p.load_image(&gradient(w, h)).unwrap();
        p
    }

    #[test]
    fn idle_pipeline_answers_defaults() {
        let p = EditPipeline::new();
        assert!(!p.is_loaded());
        assert_eq!(p.dimensions(), None);
        assert!(p.render().is_none());
        assert!(!p.shift_modified());
        assert!(!p.swap_modified());
    }

    #[test]
    fn canvas_limit_is_a_distinct_error() {
        // Checked on dimensions alone, so no 256M-pixel allocation is needed.
        assert!(check_canvas_limit(4096, 4096).is_ok());
        match check_canvas_limit(100_000, 100_000) {
            Err(EditError::CanvasLimit { pixels, max }) => {
                assert_eq!(pixels, 10_000_000_000);
                assert_eq!(max, crate::MAX_CANVAS_PIXELS);
            }
            other => panic!("expected CanvasLimit, got {:?}", other),
        }
    }

    #[test]
    fn load_resets_parameters() {
        let mut p = loaded_pipeline(4, 4);
        p.set_shift(ChannelIndex::Red, 2, 1);
        p.set_selection(ChannelIndex::Red, ChannelIndex::Blue);
        assert!(p.modified());

        p.load_image(&gradient(6, 6)).unwrap();
        assert_eq!(p.dimensions(), Some((6, 6)));
        assert!(!p.modified());
        assert_eq!(p.shift(ChannelIndex::Red), ShiftVector::default());
    }

    #[test]
    fn set_shift_clamps_inclusive() {
        let mut p = loaded_pipeline(4, 3);
        p.set_shift(ChannelIndex::Green, 99, 99);
        assert_eq!(p.shift(ChannelIndex::Green), ShiftVector::new(4, 3));

        // Full-dimension shift is representable, not clamped to dim-1.
        p.set_shift(ChannelIndex::Green, 4, 3);
        assert_eq!(p.shift(ChannelIndex::Green), ShiftVector::new(4, 3));
    }

    #[test]
    fn reset_clears_modification_flags() {
        let mut p = loaded_pipeline(5, 5);
        p.set_shift(ChannelIndex::Red, 1, 0);
        p.set_shift(ChannelIndex::Blue, 0, 3);
        p.set_selection(ChannelIndex::Green, ChannelIndex::Blue);
        assert!(p.shift_modified());
        assert!(p.swap_modified());

        p.reset();
        assert!(!p.shift_modified());
        assert!(!p.swap_modified());
        // Baseline untouched: render still produces the original image.
        let out = p.render().unwrap();
        let src = gradient(5, 5);
        for (x, y, px) in out.enumerate_pixels() {
            assert_eq!(&px.0[..3], &src.get_pixel(x, y).0[..3]);
        }
    }

    #[test]
    fn render_is_idempotent_for_unchanged_state() {
        let mut p = loaded_pipeline(6, 4);
        p.set_shift(ChannelIndex::Red, 2, 1);
        p.set_selection(ChannelIndex::Red, ChannelIndex::Green);
        let a = p.render().unwrap();
        let b = p.render().unwrap();
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn selection_only_swaps_when_channels_differ() {
        let mut p = loaded_pipeline(3, 3);
        p.set_selection(ChannelIndex::Blue, ChannelIndex::Blue);
        assert!(!p.swap_modified());
        p.set_selection(ChannelIndex::Blue, ChannelIndex::Red);
        assert!(p.swap_modified());
    }

    #[test]
    fn confirm_bakes_preview_and_resets() {
        let mut p = loaded_pipeline(6, 6);
        p.set_shift(ChannelIndex::Red, 3, 2);
        p.set_selection(ChannelIndex::Green, ChannelIndex::Blue);

        let before = p.render().unwrap();
        p.confirm();

        assert!(!p.modified());
        // confirm → (implicit reset) → render reproduces the pre-confirm
        // preview exactly.
        let after = p.render().unwrap();
        assert_eq!(after.as_raw(), before.as_raw());
    }

    #[test]
    fn confirm_without_image_is_a_no_op() {
        let mut p = EditPipeline::new();
        p.confirm();
        assert!(!p.is_loaded());
    }

    #[test]
    fn confirm_then_reset_keeps_committed_content() {
        let mut p = loaded_pipeline(4, 4);
        p.set_shift(ChannelIndex::Blue, 1, 1);
        let committed = p.render().unwrap();
        p.confirm();

        // Further edits after the confirm...
        p.set_shift(ChannelIndex::Red, 2, 0);
        assert!(p.shift_modified());
        // ...are discarded by reset, falling back to the confirmed baseline.
        p.reset();
        let out = p.render().unwrap();
        assert_eq!(out.as_raw(), committed.as_raw());
    }
}
