use std::borrow::Cow;

use rgb::RGBA8;

use super::{Decoder, DecoderError, DecoderFrontend, DecoderInfo, LoopCount};
use crate::config::Limits;
use crate::process::frame::FrameRef;

/// Decodes the default image of a png. Animation chunks are ignored.
pub struct PngDecoder {
	info: DecoderInfo,
	pixels: Vec<RGBA8>,
	done: bool,
}

impl PngDecoder {
	#[tracing::instrument(skip(limits, data), fields(name = "PngDecoder::new"))]
	pub fn new(limits: &Limits, data: Cow<'_, [u8]>) -> Result<Self, DecoderError> {
		let mut decoder = png::Decoder::new(data.as_ref());
		decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);

		let mut reader = decoder.read_info()?;

		let (width, height) = {
			let info = reader.info();
			(info.width, info.height)
		};

		limits.check(width as u64, height as u64, 1)?;

		let mut buf = vec![0; reader.output_buffer_size()];
		let output = reader.next_frame(&mut buf)?;
		let buf = &buf[..output.buffer_size()];

		let pixels: Vec<RGBA8> = match output.color_type {
			png::ColorType::Rgba => buf.chunks_exact(4).map(|px| RGBA8::new(px[0], px[1], px[2], px[3])).collect(),
			png::ColorType::Rgb => buf.chunks_exact(3).map(|px| RGBA8::new(px[0], px[1], px[2], 255)).collect(),
			png::ColorType::GrayscaleAlpha => buf.chunks_exact(2).map(|px| RGBA8::new(px[0], px[0], px[0], px[1])).collect(),
			png::ColorType::Grayscale => buf.iter().map(|g| RGBA8::new(*g, *g, *g, 255)).collect(),
			png::ColorType::Indexed => {
				return Err(DecoderError::UnsupportedPixelLayout("indexed png after expansion".into()));
			}
		};

		if pixels.len() != width as usize * height as usize {
			return Err(DecoderError::UnsupportedPixelLayout(format!(
				"{}x{} png produced {} pixels",
				width,
				height,
				pixels.len()
			)));
		}

		Ok(Self {
			info: DecoderInfo {
				width: width as usize,
				height: height as usize,
				loop_count: LoopCount::Infinite,
				frame_count: Some(1),
			},
			pixels,
			done: false,
		})
	}
}

impl Decoder for PngDecoder {
	fn backend(&self) -> DecoderFrontend {
		DecoderFrontend::Png
	}

	fn info(&self) -> DecoderInfo {
		self.info
	}

	fn decode(&mut self) -> Result<Option<FrameRef<'_>>, DecoderError> {
		if std::mem::replace(&mut self.done, true) {
			return Ok(None);
		}

		Ok(Some(FrameRef::new(&self.pixels, self.info.width, self.info.height, 0)))
	}
}
