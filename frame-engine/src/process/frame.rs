use imgref::{Img, ImgVec};
use rgb::RGBA8;

use super::decoder::{ContainerFormat, LoopCount};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
	pub image: ImgVec<RGBA8>,
	pub delay_cs: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRef<'a> {
	pub image: Img<&'a [RGBA8]>,
	pub delay_cs: u32,
}

impl FrameRef<'_> {
	pub fn to_owned(&self) -> Frame {
		Frame {
			image: Img::new(self.image.buf().to_vec(), self.image.width(), self.image.height()),
			delay_cs: self.delay_cs,
		}
	}
}

impl Frame {
	pub fn new(width: usize, height: usize) -> Self {
		Self {
			image: ImgVec::new(vec![RGBA8::default(); width * height], width, height),
			delay_cs: 0,
		}
	}

	pub fn as_ref(&self) -> FrameRef<'_> {
		FrameRef {
			image: self.image.as_ref(),
			delay_cs: self.delay_cs,
		}
	}
}

impl<'a> FrameRef<'a> {
	pub fn new(buf: &'a [RGBA8], width: usize, height: usize, delay_cs: u32) -> Self {
		Self {
			delay_cs,
			image: Img::new(buf, width, height),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
	#[error("zero sized canvas: {width}x{height}")]
	ZeroSized { width: usize, height: usize },
	#[error("canvas too large: {width}x{height}")]
	Overflow { width: usize, height: usize },
	#[error("frame {idx} is {width}x{height}, canvas is {canvas_width}x{canvas_height}")]
	MismatchedFrame {
		idx: usize,
		width: usize,
		height: usize,
		canvas_width: usize,
		canvas_height: usize,
	},
	#[error("buffer holds {len} bytes, expected a multiple of {frame_len}")]
	MismatchedBuffer { len: usize, frame_len: usize },
	#[error("page height {page_height} does not divide canvas height {height}")]
	InvalidPageHeight { page_height: usize, height: usize },
	#[error("image has no frames")]
	NoFrames,
}

/// An ordered sequence of equally sized RGBA frames.
///
/// Pixels of every frame live in a single arena, frame `i` occupying
/// `width * height` pixels starting at `i * width * height`. Delays are kept
/// alongside in playback order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimatedImage {
	width: usize,
	height: usize,
	format: ContainerFormat,
	loop_count: LoopCount,
	pixels: Vec<RGBA8>,
	delays: Vec<u32>,
}

impl AnimatedImage {
	pub const CHANNELS: usize = 4;

	pub fn new(width: usize, height: usize, format: ContainerFormat, loop_count: LoopCount) -> Result<Self, FrameError> {
		Self::with_capacity(width, height, format, loop_count, 1)
	}

	pub fn with_capacity(
		width: usize,
		height: usize,
		format: ContainerFormat,
		loop_count: LoopCount,
		frame_count: usize,
	) -> Result<Self, FrameError> {
		let frame_len = frame_len(width, height)?;

		Ok(Self {
			width,
			height,
			format,
			loop_count,
			pixels: Vec::with_capacity(frame_len.saturating_mul(frame_count)),
			delays: Vec::with_capacity(frame_count),
		})
	}

	/// Slices a canvas holding every frame stacked top to bottom.
	///
	/// When `page_height` is known it decides the frame boundaries, otherwise
	/// the canvas is split evenly into `delays.len()` pages.
	pub fn from_stacked(
		raw: &[u8],
		width: usize,
		total_height: usize,
		page_height: Option<usize>,
		delays: &[u32],
		format: ContainerFormat,
		loop_count: LoopCount,
	) -> Result<Self, FrameError> {
		let pages = delays.len().max(1);
		let page_height = match page_height {
			Some(page_height) => page_height,
			None => total_height / pages,
		};

		if page_height == 0 || total_height % page_height != 0 || total_height / page_height != pages {
			return Err(FrameError::InvalidPageHeight {
				page_height,
				height: total_height,
			});
		}

		let frame_bytes = frame_len(width, page_height)? * Self::CHANNELS;
		if raw.len() != frame_bytes * pages {
			return Err(FrameError::MismatchedBuffer {
				len: raw.len(),
				frame_len: frame_bytes,
			});
		}

		let mut image = Self::with_capacity(width, page_height, format, loop_count, pages)?;
		image.pixels.extend(
			raw.chunks_exact(Self::CHANNELS)
				.map(|px| RGBA8::new(px[0], px[1], px[2], px[3])),
		);
		image.delays = if delays.is_empty() { vec![0] } else { delays.to_vec() };

		Ok(image)
	}

	pub fn push_frame(&mut self, frame: FrameRef<'_>) -> Result<(), FrameError> {
		if frame.image.width() != self.width || frame.image.height() != self.height {
			return Err(FrameError::MismatchedFrame {
				idx: self.delays.len(),
				width: frame.image.width(),
				height: frame.image.height(),
				canvas_width: self.width,
				canvas_height: self.height,
			});
		}

		self.pixels.extend(frame.image.rows().flatten().copied());
		self.delays.push(frame.delay_cs);

		Ok(())
	}

	pub fn width(&self) -> usize {
		self.width
	}

	pub fn height(&self) -> usize {
		self.height
	}

	pub fn format(&self) -> ContainerFormat {
		self.format
	}

	pub fn loop_count(&self) -> LoopCount {
		self.loop_count
	}

	pub(crate) fn set_loop_count(&mut self, loop_count: LoopCount) {
		self.loop_count = loop_count;
	}

	pub fn frame_count(&self) -> usize {
		self.delays.len()
	}

	pub fn is_animated(&self) -> bool {
		self.delays.len() > 1
	}

	pub fn delays(&self) -> &[u32] {
		&self.delays
	}

	pub fn total_delay_cs(&self) -> u64 {
		self.delays.iter().map(|d| *d as u64).sum()
	}

	/// Number of pixels in a single frame.
	pub fn frame_len(&self) -> usize {
		self.width * self.height
	}

	pub fn frame(&self, idx: usize) -> Option<FrameRef<'_>> {
		let delay_cs = *self.delays.get(idx)?;
		let len = self.frame_len();
		let buf = &self.pixels[idx * len..(idx + 1) * len];
		Some(FrameRef::new(buf, self.width, self.height, delay_cs))
	}

	pub fn frames(&self) -> impl ExactSizeIterator<Item = FrameRef<'_>> + DoubleEndedIterator + '_ {
		self.pixels
			.chunks_exact(self.frame_len())
			.zip(self.delays.iter())
			.map(|(buf, delay)| FrameRef::new(buf, self.width, self.height, *delay))
	}

	/// Fails if the image never received a frame.
	pub fn ensure_frames(&self) -> Result<(), FrameError> {
		if self.delays.is_empty() {
			Err(FrameError::NoFrames)
		} else {
			Ok(())
		}
	}

	/// Folds runs of pixel identical frames into one frame showing for the sum
	/// of their delays. Returns `None` when no two neighbours are equal.
	///
	/// libwebp collapses such runs while encoding, so this is applied before
	/// any animated output to keep the written frame count known.
	pub fn merge_repeated_frames(&self) -> Option<Self> {
		let len = self.frame_len();
		let repeats = self
			.pixels
			.chunks_exact(len)
			.zip(self.pixels.chunks_exact(len).skip(1))
			.any(|(prev, next)| prev == next);

		if !repeats {
			return None;
		}

		let mut pixels: Vec<RGBA8> = Vec::with_capacity(self.pixels.len());
		let mut delays: Vec<u32> = Vec::with_capacity(self.delays.len());

		for (buf, delay) in self.pixels.chunks_exact(len).zip(self.delays.iter()) {
			match delays.last_mut() {
				Some(last) if pixels[pixels.len() - len..] == *buf => *last = last.saturating_add(*delay),
				_ => {
					pixels.extend_from_slice(buf);
					delays.push(*delay);
				}
			}
		}

		Some(Self::from_parts(
			self.width,
			self.height,
			self.format,
			self.loop_count,
			pixels,
			delays,
		))
	}

	/// Raw RGBA bytes of every frame, stacked top to bottom.
	pub fn as_bytes(&self) -> &[u8] {
		use rgb::ComponentBytes;
		self.pixels.as_bytes()
	}

	pub(crate) fn pixels(&self) -> &[RGBA8] {
		&self.pixels
	}

	pub(crate) fn from_parts(
		width: usize,
		height: usize,
		format: ContainerFormat,
		loop_count: LoopCount,
		pixels: Vec<RGBA8>,
		delays: Vec<u32>,
	) -> Self {
		debug_assert_eq!(pixels.len(), width * height * delays.len(), "arena size mismatch");

		Self {
			width,
			height,
			format,
			loop_count,
			pixels,
			delays,
		}
	}
}

fn frame_len(width: usize, height: usize) -> Result<usize, FrameError> {
	if width == 0 || height == 0 {
		return Err(FrameError::ZeroSized { width, height });
	}

	width
		.checked_mul(height)
		.filter(|len| len.checked_mul(AnimatedImage::CHANNELS).is_some())
		.ok_or(FrameError::Overflow { width, height })
}
