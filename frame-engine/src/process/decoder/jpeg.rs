use std::borrow::Cow;
use std::io::Cursor;

use image::ImageDecoder;
use rgb::RGBA8;

use super::{Decoder, DecoderError, DecoderFrontend, DecoderInfo, LoopCount};
use crate::config::Limits;
use crate::process::frame::FrameRef;

pub struct JpegDecoder {
	info: DecoderInfo,
	pixels: Vec<RGBA8>,
	done: bool,
}

impl JpegDecoder {
	#[tracing::instrument(skip(limits, data), fields(name = "JpegDecoder::new"))]
	pub fn new(limits: &Limits, data: Cow<'_, [u8]>) -> Result<Self, DecoderError> {
		let decoder = image::codecs::jpeg::JpegDecoder::new(Cursor::new(data.as_ref()))?;
		let (width, height) = decoder.dimensions();

		limits.check(width as u64, height as u64, 1)?;

		// Gray and CMYK sources are expanded to rgb by the decoder, alpha is opaque.
		let pixels = image::DynamicImage::from_decoder(decoder)?
			.into_rgba8()
			.into_raw()
			.chunks_exact(4)
			.map(|px| RGBA8::new(px[0], px[1], px[2], px[3]))
			.collect();

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

impl Decoder for JpegDecoder {
	fn backend(&self) -> DecoderFrontend {
		DecoderFrontend::Jpeg
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
