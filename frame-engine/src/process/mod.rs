use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;

use self::decoder::{drain, Decoder, DecoderError, DecoderFrontend};
use self::encoder::{encode_format, EncoderError, OutputFormat, StillFormat};
use self::transform::{mirror_with, remap_speed_with, reverse_with, Transform, TransformError};
use crate::config::EngineConfig;

pub mod decoder;
pub mod encoder;
pub mod frame;
mod libwebp;
mod smart_object;
pub mod transform;

pub use self::decoder::{ContainerFormat, LoopCount};
pub use self::frame::AnimatedImage;

/// The broad class of a [`ProcessError`], for callers that only need to
/// pick a user facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	Decode,
	Encode,
	InvalidArgument,
	ResourceLimitExceeded,
	Cancelled,
	Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
	#[error("decoder: {0}")]
	Decoder(#[from] DecoderError),
	#[error("encoder: {0}")]
	Encoder(#[from] EncoderError),
	#[error("invalid argument: {0}")]
	InvalidArgument(#[from] TransformError),
	#[error("cancelled")]
	Cancelled,
	#[error("join error: {0}")]
	Join(#[from] tokio::task::JoinError),
	#[error("{0}")]
	Internal(&'static str),
}

impl ProcessError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Decoder(DecoderError::Limit(_)) => ErrorKind::ResourceLimitExceeded,
			Self::Decoder(_) => ErrorKind::Decode,
			Self::Encoder(_) => ErrorKind::Encode,
			Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
			Self::Cancelled => ErrorKind::Cancelled,
			Self::Join(_) | Self::Internal(_) => ErrorKind::Internal,
		}
	}
}

/// A cooperative cancellation flag, checked between frames.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
	cancelled: Arc<AtomicBool>,
}

impl CancelToken {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::Relaxed);
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::Relaxed)
	}

	/// Returns a guard that cancels the token once dropped.
	pub fn drop_guard(&self) -> CancelOnDrop {
		CancelOnDrop(self.clone())
	}

	fn check(&self) -> Result<(), ProcessError> {
		if self.is_cancelled() {
			Err(ProcessError::Cancelled)
		} else {
			Ok(())
		}
	}
}

#[derive(Debug)]
pub struct CancelOnDrop(CancelToken);

impl Drop for CancelOnDrop {
	fn drop(&mut self) {
		self.0.cancel();
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
	pub buffer: Bytes,
	pub content_type: &'static str,
	pub width: usize,
	pub height: usize,
	pub frame_count: usize,
}

/// Decode, transform and re-encode an image in one blocking call.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
	config: EngineConfig,
}

impl Pipeline {
	pub fn new(config: EngineConfig) -> Self {
		Self { config }
	}

	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	pub fn process(&self, input: &[u8], transform: &Transform) -> Result<Output, ProcessError> {
		self.process_with_cancel(input, transform, &CancelToken::new())
	}

	pub fn process_with_cancel(
		&self,
		input: &[u8],
		transform: &Transform,
		cancel: &CancelToken,
	) -> Result<Output, ProcessError> {
		self.run(input, transform, None, cancel)
	}

	/// Like [`Pipeline::process_with_cancel`] but always encodes into `target`.
	///
	/// An encode failure is returned as is instead of degrading to png.
	pub fn process_into(
		&self,
		input: &[u8],
		transform: &Transform,
		target: ContainerFormat,
		cancel: &CancelToken,
	) -> Result<Output, ProcessError> {
		self.run(input, transform, Some(target), cancel)
	}

	#[tracing::instrument(skip(self, input, cancel), fields(name = "Pipeline::run", size = input.len()))]
	fn run(
		&self,
		input: &[u8],
		transform: &Transform,
		target: Option<ContainerFormat>,
		cancel: &CancelToken,
	) -> Result<Output, ProcessError> {
		let start = std::time::Instant::now();

		transform.validate()?;
		cancel.check()?;

		let frontend = DecoderFrontend::from_bytes(input)?;
		let mut decoder = frontend.build(&self.config.limits, Cow::Borrowed(input))?;
		let image = drain(&mut decoder, &self.config.limits, |_| cancel.check())?;
		drop(decoder);

		let source = image.format();

		if transform.is_temporal() && !image.is_animated() && target.map_or(true, |target| target == source) {
			tracing::info!(format = ?source, "still image, returning input unchanged");
			return Ok(Output {
				buffer: Bytes::copy_from_slice(input),
				content_type: source.media_type(),
				width: image.width(),
				height: image.height(),
				frame_count: 1,
			});
		}

		let image = match transform {
			Transform::Mirror(axis) => mirror_with(&image, *axis, self.config.parallel_frames, |_| cancel.check())?,
			Transform::Speed(factor) => remap_speed_with(&image, *factor, |_| cancel.check())?,
			Transform::Reverse => reverse_with(&image, |_| cancel.check())?,
		};

		let image = image.merge_repeated_frames().unwrap_or(image);
		let format = OutputFormat::for_image(&image, target.unwrap_or(source));

		let (buffer, format) = match encode_format(&image, &format, &self.config, |_| cancel.check()) {
			Ok(buffer) => (buffer, format),
			Err(ProcessError::Encoder(err)) if target.is_none() => {
				tracing::warn!(content_type = format.content_type(), "encode failed, falling back to png: {err}");
				let fallback = OutputFormat::Still(StillFormat::Png);
				let buffer = encode_format(&image, &fallback, &self.config, |_| cancel.check())?;
				(buffer, fallback)
			}
			Err(err) => return Err(err),
		};

		let frame_count = match format {
			// Lossy webp may still fold frames it finds close enough to their predecessor.
			OutputFormat::Webp { .. } => DecoderFrontend::LibWebp
				.build(&self.config.limits, Cow::Borrowed(&buffer[..]))?
				.info()
				.frame_count
				.unwrap_or(1),
			OutputFormat::Gif { .. } => image.frame_count(),
			OutputFormat::Still(_) => 1,
		};

		tracing::info!(
			transform = transform.name(),
			content_type = format.content_type(),
			frame_count,
			size = buffer.len(),
			"processed in {:?}",
			start.elapsed()
		);

		Ok(Output {
			buffer: Bytes::from(buffer),
			content_type: format.content_type(),
			width: image.width(),
			height: image.height(),
			frame_count,
		})
	}
}
