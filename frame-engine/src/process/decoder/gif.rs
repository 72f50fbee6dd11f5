use std::borrow::Cow;
use std::io::Cursor;

use rgb::RGBA8;

use super::{Decoder, DecoderError, DecoderFrontend, DecoderInfo, LoopCount};
use crate::config::Limits;
use crate::process::frame::FrameRef;

#[derive(Debug, Clone, Copy)]
struct Rect {
	left: usize,
	top: usize,
	width: usize,
	height: usize,
}

pub struct GifDecoder<'data> {
	decoder: gif::Decoder<Cursor<Cow<'data, [u8]>>>,
	width: usize,
	height: usize,
	canvas: Vec<RGBA8>,
	previous: Vec<RGBA8>,
	dispose: Option<(gif::DisposalMethod, Rect)>,
}

impl<'data> GifDecoder<'data> {
	#[tracing::instrument(skip(limits, data), fields(name = "GifDecoder::new"))]
	pub fn new(limits: &Limits, data: Cow<'data, [u8]>) -> Result<Self, DecoderError> {
		let mut options = gif::DecodeOptions::new();
		options.set_color_output(gif::ColorOutput::RGBA);
		// Our own limits are the budget, the crate default would reject canvases they allow.
		options.set_memory_limit(gif::MemoryLimit::Bytes(std::num::NonZeroU64::new(limits.max_decoded_bytes.max(1)).unwrap()));

		let decoder = options.read_info(Cursor::new(data))?;

		let width = decoder.width() as usize;
		let height = decoder.height() as usize;

		// The frame count is unknown until the stream is walked, so only the
		// canvas is checked here.
		limits.check(width as u64, height as u64, 1)?;

		Ok(Self {
			decoder,
			width,
			height,
			canvas: vec![RGBA8::default(); width * height],
			previous: Vec::new(),
			dispose: None,
		})
	}

	fn apply_dispose(&mut self) {
		match self.dispose.take() {
			Some((gif::DisposalMethod::Background, rect)) => {
				for y in rect.top..rect.top + rect.height {
					let row = y * self.width;
					self.canvas[row + rect.left..row + rect.left + rect.width].fill(RGBA8::default());
				}
			}
			Some((gif::DisposalMethod::Previous, _)) => {
				std::mem::swap(&mut self.canvas, &mut self.previous);
			}
			_ => {}
		}
	}
}

impl Decoder for GifDecoder<'_> {
	fn backend(&self) -> DecoderFrontend {
		DecoderFrontend::Gif
	}

	fn info(&self) -> DecoderInfo {
		DecoderInfo {
			width: self.width,
			height: self.height,
			loop_count: match self.decoder.repeat() {
				gif::Repeat::Infinite => LoopCount::Infinite,
				gif::Repeat::Finite(count) => LoopCount::Finite(count as usize),
			},
			frame_count: None,
		}
	}

	#[tracing::instrument(skip(self), fields(name = "GifDecoder::decode"))]
	fn decode(&mut self) -> Result<Option<FrameRef<'_>>, DecoderError> {
		self.apply_dispose();

		let Some(frame) = self.decoder.read_next_frame()? else {
			return Ok(None);
		};

		let frame_width = frame.width as usize;
		let left = (frame.left as usize).min(self.width);
		let top = (frame.top as usize).min(self.height);
		let rect = Rect {
			left,
			top,
			width: frame_width.min(self.width - left),
			height: (frame.height as usize).min(self.height - top),
		};

		if frame.dispose == gif::DisposalMethod::Previous {
			self.previous.clone_from(&self.canvas);
		}

		// Transparent pixels leave whatever the previous frames left behind.
		for y in 0..rect.height {
			let src = &frame.buffer[y * frame_width * 4..][..rect.width * 4];
			let row = (rect.top + y) * self.width + rect.left;
			for (dst, px) in self.canvas[row..row + rect.width].iter_mut().zip(src.chunks_exact(4)) {
				if px[3] != 0 {
					*dst = RGBA8::new(px[0], px[1], px[2], px[3]);
				}
			}
		}

		self.dispose = Some((frame.dispose, rect));

		Ok(Some(FrameRef::new(&self.canvas, self.width, self.height, frame.delay as u32)))
	}
}
