use super::decoder::{ContainerFormat, LoopCount};
use super::frame::{AnimatedImage, FrameRef};
use super::libwebp::WebPError;
use crate::config::{EngineConfig, OutputQuality};

mod gif;
mod jpeg;
mod libwebp;
mod png;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderBackend {
	Gif,
	Png,
	LibWebp,
	Jpeg,
}

#[derive(Debug, Clone, Copy)]
pub struct EncoderSettings {
	pub quality: OutputQuality,
	pub jpeg_quality: u8,
	pub loop_count: LoopCount,
	pub static_image: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct EncoderInfo {
	pub backend: EncoderBackend,
	pub width: usize,
	pub height: usize,
	pub duration_cs: u64,
	pub frame_count: usize,
}

impl EncoderInfo {
	fn new(backend: EncoderBackend) -> Self {
		Self {
			backend,
			width: 0,
			height: 0,
			duration_cs: 0,
			frame_count: 0,
		}
	}
}

#[derive(Debug, thiserror::Error)]
pub enum EncoderError {
	#[error("gif: {0}")]
	Gif(#[from] ::gif::EncodingError),
	#[error("webp: {0}")]
	Webp(#[from] WebPError),
	#[error("png: {0}")]
	Png(#[from] ::png::EncodingError),
	#[error("jpeg: {0}")]
	Jpeg(#[from] ::image::ImageError),
	#[error("no frames added")]
	NoFrames,
	#[error("static image has multiple frames")]
	MultipleFrames,
	#[error("cannot encode a {width}x{height} image as {format}")]
	UnsupportedDimensions {
		width: usize,
		height: usize,
		format: &'static str,
	},
	#[error("{delays} delays given for {frame_count} frames")]
	MismatchedDelays { delays: usize, frame_count: usize },
}

impl EncoderBackend {
	pub fn build(&self, settings: EncoderSettings) -> Result<AnyEncoder, EncoderError> {
		match self {
			Self::Png => Ok(AnyEncoder::Png(png::PngEncoder::new(settings)?)),
			Self::Gif => Ok(AnyEncoder::Gif(gif::GifEncoder::new(settings)?)),
			Self::LibWebp => Ok(AnyEncoder::LibWebp(libwebp::WebpEncoder::new(settings)?)),
			Self::Jpeg => Ok(AnyEncoder::Jpeg(jpeg::JpegEncoder::new(settings)?)),
		}
	}

	/// The largest width or height the backend can store.
	pub const fn max_dimension(&self) -> usize {
		match self {
			Self::Gif => u16::MAX as usize,
			Self::Jpeg => u16::MAX as usize,
			Self::LibWebp => 16383,
			Self::Png => u32::MAX as usize,
		}
	}
}

pub enum AnyEncoder {
	Gif(gif::GifEncoder),
	Png(png::PngEncoder),
	LibWebp(libwebp::WebpEncoder),
	Jpeg(jpeg::JpegEncoder),
}

pub trait Encoder {
	fn info(&self) -> &EncoderInfo;
	fn add_frame(&mut self, frame: FrameRef<'_>) -> Result<(), EncoderError>;
	fn finish(self) -> Result<Vec<u8>, EncoderError>;
}

impl Encoder for AnyEncoder {
	fn info(&self) -> &EncoderInfo {
		match self {
			Self::Gif(encoder) => encoder.info(),
			Self::Png(encoder) => encoder.info(),
			Self::LibWebp(encoder) => encoder.info(),
			Self::Jpeg(encoder) => encoder.info(),
		}
	}

	fn add_frame(&mut self, frame: FrameRef<'_>) -> Result<(), EncoderError> {
		match self {
			Self::Gif(encoder) => encoder.add_frame(frame),
			Self::Png(encoder) => encoder.add_frame(frame),
			Self::LibWebp(encoder) => encoder.add_frame(frame),
			Self::Jpeg(encoder) => encoder.add_frame(frame),
		}
	}

	fn finish(self) -> Result<Vec<u8>, EncoderError> {
		match self {
			Self::Gif(encoder) => encoder.finish(),
			Self::Png(encoder) => encoder.finish(),
			Self::LibWebp(encoder) => encoder.finish(),
			Self::Jpeg(encoder) => encoder.finish(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StillFormat {
	Png,
	Jpeg,
	Gif,
	Webp,
}

impl StillFormat {
	pub const fn from_container(format: ContainerFormat) -> Self {
		match format {
			ContainerFormat::Gif => Self::Gif,
			ContainerFormat::Webp => Self::Webp,
			ContainerFormat::Png => Self::Png,
			ContainerFormat::Jpeg => Self::Jpeg,
		}
	}
}

/// What to encode and with which timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
	Gif { delays: Vec<u32>, loop_count: LoopCount },
	Webp { delays: Vec<u32>, loop_count: LoopCount },
	Still(StillFormat),
}

impl OutputFormat {
	/// Picks the richest output `target` can express for `image`.
	///
	/// Animated images keep their frames when the target can animate,
	/// everything else collapses to the first frame.
	pub fn for_image(image: &AnimatedImage, target: ContainerFormat) -> Self {
		if !image.is_animated() || !target.supports_animation() {
			return Self::Still(StillFormat::from_container(target));
		}

		// A zero delay is shown differently by every renderer.
		let delays = image.delays().iter().map(|delay| (*delay).max(1)).collect();
		let loop_count = image.loop_count();

		match target {
			ContainerFormat::Gif => Self::Gif { delays, loop_count },
			_ => Self::Webp { delays, loop_count },
		}
	}

	pub const fn backend(&self) -> EncoderBackend {
		match self {
			Self::Gif { .. } | Self::Still(StillFormat::Gif) => EncoderBackend::Gif,
			Self::Webp { .. } | Self::Still(StillFormat::Webp) => EncoderBackend::LibWebp,
			Self::Still(StillFormat::Png) => EncoderBackend::Png,
			Self::Still(StillFormat::Jpeg) => EncoderBackend::Jpeg,
		}
	}

	pub const fn content_type(&self) -> &'static str {
		match self {
			Self::Gif { .. } | Self::Still(StillFormat::Gif) => "image/gif",
			Self::Webp { .. } | Self::Still(StillFormat::Webp) => "image/webp",
			Self::Still(StillFormat::Png) => "image/png",
			Self::Still(StillFormat::Jpeg) => "image/jpeg",
		}
	}

	pub const fn is_animated(&self) -> bool {
		!matches!(self, Self::Still(_))
	}
}

/// Encodes `image` into `target`, see [`OutputFormat::for_image`].
///
/// Runs of identical frames are merged first, see
/// [`AnimatedImage::merge_repeated_frames`].
pub fn encode(image: &AnimatedImage, target: ContainerFormat, config: &EngineConfig) -> Result<Vec<u8>, EncoderError> {
	let merged = image.merge_repeated_frames();
	let image = merged.as_ref().unwrap_or(image);

	encode_format(image, &OutputFormat::for_image(image, target), config, |_| Ok::<_, EncoderError>(()))
}

/// Feeds the frames `format` asks for to a freshly built encoder.
///
/// `between_frames` runs after every frame handed to the encoder and may
/// abort the walk.
#[tracing::instrument(skip_all, fields(name = "encoder::encode_format", backend = ?format.backend()))]
pub fn encode_format<E: From<EncoderError>>(
	image: &AnimatedImage,
	format: &OutputFormat,
	config: &EngineConfig,
	mut between_frames: impl FnMut(usize) -> Result<(), E>,
) -> Result<Vec<u8>, E> {
	let backend = format.backend();

	let (width, height) = (image.width(), image.height());
	if width == 0 || height == 0 || width > backend.max_dimension() || height > backend.max_dimension() {
		return Err(EncoderError::UnsupportedDimensions {
			width,
			height,
			format: format.content_type(),
		}
		.into());
	}

	let (delays, loop_count) = match format {
		OutputFormat::Gif { delays, loop_count } | OutputFormat::Webp { delays, loop_count } => {
			if delays.len() != image.frame_count() {
				return Err(EncoderError::MismatchedDelays {
					delays: delays.len(),
					frame_count: image.frame_count(),
				}
				.into());
			}

			(Some(delays.as_slice()), *loop_count)
		}
		OutputFormat::Still(_) => (None, image.loop_count()),
	};

	let mut encoder = backend.build(EncoderSettings {
		quality: config.quality,
		jpeg_quality: config.jpeg_quality,
		loop_count,
		static_image: !format.is_animated(),
	})?;

	match delays {
		Some(delays) => {
			for (idx, (frame, delay)) in image.frames().zip(delays).enumerate() {
				encoder.add_frame(FrameRef {
					delay_cs: (*delay).max(1),
					..frame
				})?;
				between_frames(idx + 1)?;
			}
		}
		None => {
			let frame = image.frame(0).ok_or(EncoderError::NoFrames)?;
			encoder.add_frame(frame)?;
			between_frames(1)?;
		}
	}

	let info = *encoder.info();
	let data = encoder.finish()?;

	tracing::debug!(
		backend = ?info.backend,
		width = info.width,
		height = info.height,
		frame_count = info.frame_count,
		duration_cs = info.duration_cs,
		size = data.len(),
		"encoded image"
	);

	Ok(data)
}
