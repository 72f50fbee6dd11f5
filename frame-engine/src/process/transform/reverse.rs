use std::convert::Infallible;

use crate::process::frame::AnimatedImage;

/// Plays the animation backwards. Each delay stays with its frame.
pub fn reverse(image: &AnimatedImage) -> AnimatedImage {
	match reverse_with(image, |_| Ok::<_, Infallible>(())) {
		Ok(image) => image,
		Err(never) => match never {},
	}
}

/// [`reverse`], calling `between_frames` after every copied frame.
#[tracing::instrument(skip_all, fields(name = "transform::reverse", frame_count = image.frame_count()))]
pub fn reverse_with<E>(
	image: &AnimatedImage,
	mut between_frames: impl FnMut(usize) -> Result<(), E>,
) -> Result<AnimatedImage, E> {
	if !image.is_animated() {
		return Ok(image.clone());
	}

	let mut pixels = Vec::with_capacity(image.pixels().len());
	for (idx, frame) in image.pixels().chunks_exact(image.frame_len()).rev().enumerate() {
		pixels.extend_from_slice(frame);
		between_frames(idx + 1)?;
	}

	let delays = image.delays().iter().rev().copied().collect();

	Ok(AnimatedImage::from_parts(
		image.width(),
		image.height(),
		image.format(),
		image.loop_count(),
		pixels,
		delays,
	))
}
