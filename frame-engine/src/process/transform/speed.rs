use super::TransformError;
use crate::process::frame::AnimatedImage;

/// The shortest delay, in centiseconds, a frame is emitted with when speeding up.
///
/// Most renderers bump anything shorter to a default of around 10cs, which
/// would slow the animation down instead.
pub const MIN_DELAY: u32 = 2;

/// Plays the animation `factor` times as fast.
///
/// Slowing down (`factor <= 1`) scales every delay and keeps every frame.
/// Speeding up accumulates the scaled delays and only emits a frame once the
/// running total reaches [`MIN_DELAY`], so frames get dropped instead of
/// ending up with delays too short to render. A still image is returned as is.
pub fn remap_speed(image: &AnimatedImage, factor: f64) -> Result<AnimatedImage, TransformError> {
	remap_speed_with(image, factor, |_| Ok(()))
}

/// [`remap_speed`], calling `between_frames` after every frame a speed up keeps.
#[tracing::instrument(skip(image, between_frames), fields(name = "transform::remap_speed", frame_count = image.frame_count()))]
pub fn remap_speed_with<E: From<TransformError>>(
	image: &AnimatedImage,
	factor: f64,
	mut between_frames: impl FnMut(usize) -> Result<(), E>,
) -> Result<AnimatedImage, E> {
	if !factor.is_finite() || factor <= 0.0 {
		return Err(TransformError::InvalidFactor(factor).into());
	}

	if !image.is_animated() {
		return Ok(image.clone());
	}

	let (pixels, delays) = if factor <= 1.0 {
		let delays = image
			.delays()
			.iter()
			.map(|delay| (round(*delay as f64 / factor)).max(1))
			.collect();

		(image.pixels().to_vec(), delays)
	} else {
		let keep = drop_frames(image.delays(), factor);

		let frame_len = image.frame_len();
		let mut pixels = Vec::with_capacity(frame_len * keep.len());
		let mut delays = Vec::with_capacity(keep.len());
		for (done, (idx, delay)) in keep.into_iter().enumerate() {
			pixels.extend_from_slice(&image.pixels()[idx * frame_len..][..frame_len]);
			delays.push(delay);
			between_frames(done + 1)?;
		}

		(pixels, delays)
	};

	tracing::debug!(
		factor,
		input_frames = image.frame_count(),
		output_frames = delays.len(),
		input_duration_cs = image.total_delay_cs(),
		output_duration_cs = delays.iter().map(|d| *d as u64).sum::<u64>(),
		"remapped speed"
	);

	Ok(AnimatedImage::from_parts(
		image.width(),
		image.height(),
		image.format(),
		image.loop_count(),
		pixels,
		delays,
	))
}

/// Picks which frames survive a speed up and the delay each is shown for.
fn drop_frames(delays: &[u32], factor: f64) -> Vec<(usize, u32)> {
	// Emitted frames with their unrounded delay, so the tail can be folded in.
	let mut emitted: Vec<(usize, f64)> = Vec::with_capacity(delays.len());
	let mut accumulated = 0.0;

	for (idx, delay) in delays.iter().enumerate() {
		accumulated += *delay as f64 / factor;

		if emitted.is_empty() || accumulated >= MIN_DELAY as f64 {
			emitted.push((idx, accumulated));
			accumulated = 0.0;
		}
	}

	match emitted.last_mut() {
		Some((_, last)) => *last += accumulated,
		None => {
			let total = delays.iter().map(|d| *d as f64).sum::<f64>();
			emitted.push((0, total / factor));
		}
	}

	emitted
		.into_iter()
		.map(|(idx, delay)| (idx, round(delay).max(MIN_DELAY)))
		.collect()
}

fn round(delay: f64) -> u32 {
	delay.round().clamp(0.0, u32::MAX as f64) as u32
}
