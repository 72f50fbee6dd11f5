use rgb::ComponentBytes;

use super::{Encoder, EncoderBackend, EncoderError, EncoderInfo, EncoderSettings};
use crate::process::frame::FrameRef;

pub struct PngEncoder {
	result: Option<Vec<u8>>,
	info: EncoderInfo,
}

impl PngEncoder {
	#[tracing::instrument(skip(_settings), fields(name = "PngEncoder::new"))]
	pub fn new(_settings: EncoderSettings) -> Result<Self, EncoderError> {
		Ok(Self {
			result: None,
			info: EncoderInfo::new(EncoderBackend::Png),
		})
	}
}

impl Encoder for PngEncoder {
	fn info(&self) -> &EncoderInfo {
		&self.info
	}

	#[tracing::instrument(skip_all, fields(name = "PngEncoder::add_frame"))]
	fn add_frame(&mut self, frame: FrameRef<'_>) -> Result<(), EncoderError> {
		if self.result.is_some() {
			return Err(EncoderError::MultipleFrames);
		}

		let (width, height) = (frame.image.width(), frame.image.height());
		let (Ok(png_width), Ok(png_height)) = (u32::try_from(width), u32::try_from(height)) else {
			return Err(EncoderError::UnsupportedDimensions {
				width,
				height,
				format: "image/png",
			});
		};

		self.info.height = height;
		self.info.width = width;
		self.info.frame_count += 1;

		let mut result = Vec::new();

		let mut encoder = png::Encoder::new(&mut result, png_width, png_height);
		encoder.set_color(png::ColorType::Rgba);
		encoder.set_depth(png::BitDepth::Eight);

		// Rows of a frame view may be strided, the writer wants them packed.
		let data: Vec<u8> = frame.image.rows().flat_map(|row| row.as_bytes().iter().copied()).collect();
		encoder.write_header()?.write_image_data(&data)?;

		self.result = Some(result);

		Ok(())
	}

	#[tracing::instrument(skip(self), fields(name = "PngEncoder::finish"))]
	fn finish(self) -> Result<Vec<u8>, EncoderError> {
		self.result.ok_or(EncoderError::NoFrames)
	}
}
