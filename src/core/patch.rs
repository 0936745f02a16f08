use ndarray::{s, Array2, ArrayView2};
use num_traits::Zero;

/// Extract a fixed-size square patch centered at (center_row, center_col).
///
/// The requested window is `center ± patch_size / 2` on each axis. Where it
/// overruns the source bounds the patch is zero-filled; the copied region is
/// offset inside the patch by the amount the window was clipped on the low
/// side. The output is always exactly patch_size x patch_size and keeps the
/// source cell type, even when the window lies entirely outside the source.
pub fn extract_patch<T: Zero + Clone>(
    source: ArrayView2<'_, T>,
    center_row: usize,
    center_col: usize,
    patch_size: usize,
) -> Array2<T> {
    let half = (patch_size / 2) as isize;
    let (height, width) = source.dim();

    let r0 = center_row as isize - half;
    let r1 = center_row as isize + half + 1;
    let c0 = center_col as isize - half;
    let c1 = center_col as isize + half + 1;

    let mut patch = Array2::zeros((patch_size, patch_size));

    // Clip the window to the source bounds
    let r0_clip = r0.max(0);
    let r1_clip = r1.min(height as isize);
    let c0_clip = c0.max(0);
    let c1_clip = c1.min(width as isize);

    if r0_clip < r1_clip && c0_clip < c1_clip {
        let rows = (r1_clip - r0_clip) as usize;
        let cols = (c1_clip - c0_clip) as usize;
        let pr0 = (r0_clip - r0) as usize;
        let pc0 = (c0_clip - c0) as usize;

        patch
            .slice_mut(s![pr0..pr0 + rows, pc0..pc0 + cols])
            .assign(&source.slice(s![
                r0_clip as usize..r1_clip as usize,
                c0_clip as usize..c1_clip as usize
            ]));
    }

    patch
}

/// Compute a patch center that keeps a full extraction in-bounds.
///
/// Returns the array midpoint clamped into [half, dim - half - 1] per axis.
/// For dimensions smaller than patch_size the clamp still yields a valid
/// in-bounds coordinate; the subsequent extraction then clips and zero-pads.
pub fn safe_center(height: usize, width: usize, patch_size: usize) -> (usize, usize) {
    let half = patch_size / 2;
    (clamp_axis(height, half), clamp_axis(width, half))
}

fn clamp_axis(dim: usize, half: usize) -> usize {
    let low = half.min(dim.saturating_sub(1));
    let high = dim.saturating_sub(half + 1).max(low);
    (dim / 2).clamp(low, high)
}
