use image::ExtendedColorType;

use super::{Encoder, EncoderBackend, EncoderError, EncoderInfo, EncoderSettings};
use crate::process::frame::FrameRef;

pub struct JpegEncoder {
	quality: u8,
	result: Option<Vec<u8>>,
	info: EncoderInfo,
}

impl JpegEncoder {
	#[tracing::instrument(skip(settings), fields(name = "JpegEncoder::new"))]
	pub fn new(settings: EncoderSettings) -> Result<Self, EncoderError> {
		Ok(Self {
			quality: settings.jpeg_quality.clamp(1, 100),
			result: None,
			info: EncoderInfo::new(EncoderBackend::Jpeg),
		})
	}
}

impl Encoder for JpegEncoder {
	fn info(&self) -> &EncoderInfo {
		&self.info
	}

	#[tracing::instrument(skip_all, fields(name = "JpegEncoder::add_frame"))]
	fn add_frame(&mut self, frame: FrameRef<'_>) -> Result<(), EncoderError> {
		if self.result.is_some() {
			return Err(EncoderError::MultipleFrames);
		}

		let (width, height) = (frame.image.width(), frame.image.height());

		self.info.height = height;
		self.info.width = width;
		self.info.frame_count += 1;

		// Jpeg has no alpha channel, it is dropped.
		let rgb: Vec<u8> = frame.image.pixels().flat_map(|px| [px.r, px.g, px.b]).collect();

		let mut result = Vec::new();
		image::codecs::jpeg::JpegEncoder::new_with_quality(&mut result, self.quality).encode(
			&rgb,
			width as u32,
			height as u32,
			ExtendedColorType::Rgb8,
		)?;

		self.result = Some(result);

		Ok(())
	}

	#[tracing::instrument(skip(self), fields(name = "JpegEncoder::finish"))]
	fn finish(self) -> Result<Vec<u8>, EncoderError> {
		self.result.ok_or(EncoderError::NoFrames)
	}
}
