use std::borrow::Cow;

use file_format::FileFormat;

use super::frame::{AnimatedImage, FrameError, FrameRef};
use super::libwebp::WebPError;
use crate::config::{LimitError, Limits};

mod gif;
mod jpeg;
mod libwebp;
mod png;

#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
	#[error("gif: {0}")]
	Gif(#[from] ::gif::DecodingError),
	#[error("libwebp: {0}")]
	LibWebp(#[from] WebPError),
	#[error("png: {0}")]
	Png(#[from] ::png::DecodingError),
	#[error("jpeg: {0}")]
	Jpeg(#[from] ::image::ImageError),
	#[error("unsupported input format: {0}")]
	UnsupportedInputFormat(FileFormat),
	#[error("frame: {0}")]
	Frame(#[from] FrameError),
	#[error("{0}")]
	Limit(#[from] LimitError),
	#[error("unsupported pixel layout: {0}")]
	UnsupportedPixelLayout(String),
	#[error("declared {declared} frames but decoded {decoded}")]
	MismatchedFrameCount { declared: usize, decoded: usize },
}

/// The container an image was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerFormat {
	Gif,
	Webp,
	Png,
	Jpeg,
}

impl ContainerFormat {
	pub const fn media_type(&self) -> &'static str {
		match self {
			Self::Gif => "image/gif",
			Self::Webp => "image/webp",
			Self::Png => "image/png",
			Self::Jpeg => "image/jpeg",
		}
	}

	pub const fn supports_animation(&self) -> bool {
		matches!(self, Self::Gif | Self::Webp)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderFrontend {
	Gif,
	LibWebp,
	Png,
	Jpeg,
}

impl DecoderFrontend {
	pub const fn from_format(format: FileFormat) -> Result<Self, DecoderError> {
		match format {
			FileFormat::GraphicsInterchangeFormat => Ok(Self::Gif), // .gif
			FileFormat::Webp => Ok(Self::LibWebp),                  // .webp
			FileFormat::PortableNetworkGraphics // .png
			| FileFormat::AnimatedPortableNetworkGraphics => Ok(Self::Png), // .apng
			FileFormat::JointPhotographicExpertsGroup => Ok(Self::Jpeg), // .jpg
			_ => Err(DecoderError::UnsupportedInputFormat(format)),
		}
	}

	pub fn from_bytes(data: &[u8]) -> Result<Self, DecoderError> {
		Self::from_format(FileFormat::from_bytes(data))
	}

	pub const fn container(&self) -> ContainerFormat {
		match self {
			Self::Gif => ContainerFormat::Gif,
			Self::LibWebp => ContainerFormat::Webp,
			Self::Png => ContainerFormat::Png,
			Self::Jpeg => ContainerFormat::Jpeg,
		}
	}

	pub fn build<'a>(&self, limits: &Limits, data: Cow<'a, [u8]>) -> Result<AnyDecoder<'a>, DecoderError> {
		match self {
			Self::Gif => Ok(AnyDecoder::Gif(gif::GifDecoder::new(limits, data)?)),
			Self::LibWebp => Ok(AnyDecoder::LibWebp(libwebp::WebpDecoder::new(limits, data)?)),
			Self::Png => Ok(AnyDecoder::Png(png::PngDecoder::new(limits, data)?)),
			Self::Jpeg => Ok(AnyDecoder::Jpeg(jpeg::JpegDecoder::new(limits, data)?)),
		}
	}
}

pub enum AnyDecoder<'a> {
	Gif(gif::GifDecoder<'a>),
	LibWebp(libwebp::WebpDecoder<'a>),
	Png(png::PngDecoder),
	Jpeg(jpeg::JpegDecoder),
}

pub trait Decoder {
	fn backend(&self) -> DecoderFrontend;
	fn info(&self) -> DecoderInfo;
	fn decode(&mut self) -> Result<Option<FrameRef<'_>>, DecoderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderInfo {
	pub width: usize,
	pub height: usize,
	pub loop_count: LoopCount,
	/// `None` for streaming containers which only learn their frame count
	/// once every frame has been read.
	pub frame_count: Option<usize>,
}

/// The repeat count stored by the container, carried through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCount {
	Infinite,
	Finite(usize),
}

impl LoopCount {
	/// The integer form, where 0 means infinite.
	pub fn as_raw(self) -> usize {
		match self {
			LoopCount::Infinite => 0,
			LoopCount::Finite(count) => count,
		}
	}

	pub fn from_raw(count: usize) -> Self {
		match count {
			0 => LoopCount::Infinite,
			count => LoopCount::Finite(count),
		}
	}
}

impl Decoder for AnyDecoder<'_> {
	fn backend(&self) -> DecoderFrontend {
		match self {
			Self::Gif(decoder) => decoder.backend(),
			Self::LibWebp(decoder) => decoder.backend(),
			Self::Png(decoder) => decoder.backend(),
			Self::Jpeg(decoder) => decoder.backend(),
		}
	}

	fn info(&self) -> DecoderInfo {
		match self {
			Self::Gif(decoder) => decoder.info(),
			Self::LibWebp(decoder) => decoder.info(),
			Self::Png(decoder) => decoder.info(),
			Self::Jpeg(decoder) => decoder.info(),
		}
	}

	fn decode(&mut self) -> Result<Option<FrameRef<'_>>, DecoderError> {
		match self {
			Self::Gif(decoder) => decoder.decode(),
			Self::LibWebp(decoder) => decoder.decode(),
			Self::Png(decoder) => decoder.decode(),
			Self::Jpeg(decoder) => decoder.decode(),
		}
	}
}

/// Decodes every frame of `data` into an [`AnimatedImage`].
pub fn decode(data: &[u8], limits: &Limits) -> Result<AnimatedImage, DecoderError> {
	let mut decoder = DecoderFrontend::from_bytes(data)?.build(limits, Cow::Borrowed(data))?;
	drain(&mut decoder, limits, |_| Ok::<_, DecoderError>(()))
}

/// Pulls frames out of `decoder` into a fresh arena.
///
/// `between_frames` runs after every decoded frame and may abort the walk.
/// The limits are re-checked before each frame is copied so containers that
/// do not declare a frame count upfront still cannot outgrow the budget.
#[tracing::instrument(skip_all, fields(name = "decoder::drain", backend = ?decoder.backend()))]
pub fn drain<E: From<DecoderError>>(
	decoder: &mut AnyDecoder<'_>,
	limits: &Limits,
	mut between_frames: impl FnMut(usize) -> Result<(), E>,
) -> Result<AnimatedImage, E> {
	let info = decoder.info();
	let container = decoder.backend().container();

	let mut image = AnimatedImage::with_capacity(
		info.width,
		info.height,
		container,
		info.loop_count,
		info.frame_count.unwrap_or(1),
	)
	.map_err(DecoderError::from)?;

	let mut idx = 0;
	while let Some(frame) = decoder.decode()? {
		limits
			.check(info.width as u64, info.height as u64, idx as u64 + 1)
			.map_err(DecoderError::from)?;
		image.push_frame(frame).map_err(DecoderError::from)?;
		idx += 1;
		between_frames(idx)?;
	}

	image.ensure_frames().map_err(DecoderError::from)?;

	if let Some(declared) = info.frame_count {
		if declared != idx {
			return Err(DecoderError::MismatchedFrameCount { declared, decoded: idx }.into());
		}
	}

	// Some containers only reveal the repeat count after the first frame.
	image.set_loop_count(decoder.info().loop_count);

	tracing::debug!(
		width = image.width(),
		height = image.height(),
		frame_count = image.frame_count(),
		loop_count = ?image.loop_count(),
		"decoded image"
	);

	Ok(image)
}
