use std::convert::Infallible;

use rayon::prelude::*;
use rgb::RGBA8;

use super::Axis;
use crate::process::frame::AnimatedImage;

/// Reflects the kept half of every frame onto the other half.
///
/// An odd dimension along the reflection axis is cropped to the largest even
/// size first, dropping the last column or row. Timing and loop count are
/// left untouched.
pub fn mirror(image: &AnimatedImage, axis: Axis) -> AnimatedImage {
	match mirror_with(image, axis, false, |_| Ok::<_, Infallible>(())) {
		Ok(image) => image,
		Err(never) => match never {},
	}
}

/// [`mirror`], optionally fanning the frames out over the rayon pool.
///
/// `between_frames` runs after every reflected frame and may abort the walk.
#[tracing::instrument(skip(image, between_frames), fields(name = "transform::mirror"))]
pub fn mirror_with<E: Send>(
	image: &AnimatedImage,
	axis: Axis,
	parallel: bool,
	between_frames: impl Fn(usize) -> Result<(), E> + Sync,
) -> Result<AnimatedImage, E> {
	let (width, height) = (image.width(), image.height());

	// A single column or row is its own reflection.
	let (out_width, out_height) = match axis {
		Axis::Left | Axis::Right => (even(width), height),
		Axis::Top | Axis::Bottom => (width, even(height)),
	};

	// Only the axis being reflected is remapped, the other one reads straight through.
	let (columns, rows) = match axis {
		Axis::Left | Axis::Right => (
			source_indices(out_width, matches!(axis, Axis::Right)),
			(0..out_height).collect::<Vec<_>>(),
		),
		Axis::Top | Axis::Bottom => (
			(0..out_width).collect::<Vec<_>>(),
			source_indices(out_height, matches!(axis, Axis::Bottom)),
		),
	};

	let in_len = image.frame_len();
	let out_len = out_width * out_height;

	let mut pixels = vec![RGBA8::default(); out_len * image.frame_count()];

	let reflect = |(idx, (dst, src)): (usize, (&mut [RGBA8], &[RGBA8]))| {
		for (dst_row, src_y) in dst.chunks_exact_mut(out_width).zip(rows.iter()) {
			let src_row = &src[src_y * width..][..width];
			for (dst_px, src_x) in dst_row.iter_mut().zip(columns.iter()) {
				*dst_px = src_row[*src_x];
			}
		}

		between_frames(idx + 1)
	};

	if parallel {
		pixels
			.par_chunks_exact_mut(out_len)
			.zip(image.pixels().par_chunks_exact(in_len))
			.enumerate()
			.try_for_each(reflect)?;
	} else {
		pixels
			.chunks_exact_mut(out_len)
			.zip(image.pixels().chunks_exact(in_len))
			.enumerate()
			.try_for_each(reflect)?;
	}

	if out_width != width || out_height != height {
		tracing::debug!(width, height, out_width, out_height, "cropped odd dimension before mirroring");
	}

	Ok(AnimatedImage::from_parts(
		out_width,
		out_height,
		image.format(),
		image.loop_count(),
		pixels,
		image.delays().to_vec(),
	))
}

fn even(len: usize) -> usize {
	if len > 1 {
		len & !1
	} else {
		len
	}
}

/// For every output position along one axis, the source position it reads.
///
/// With `keep_far` unset the first half is kept and mirrored onto the second,
/// otherwise the second half is kept and mirrored onto the first.
fn source_indices(len: usize, keep_far: bool) -> Vec<usize> {
	let half = len / 2;

	(0..len)
		.map(|idx| {
			let reflected = len - 1 - idx;
			match (keep_far, idx < half) {
				(false, true) | (true, false) => idx,
				_ => reflected,
			}
		})
		.collect()
}
