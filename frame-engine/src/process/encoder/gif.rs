use rgb::ComponentBytes;

use super::{Encoder, EncoderBackend, EncoderError, EncoderInfo, EncoderSettings};
use crate::config::OutputQuality;
use crate::process::decoder::LoopCount;
use crate::process::frame::FrameRef;

pub struct GifEncoder {
	encoder: Option<gif::Encoder<Vec<u8>>>,
	settings: EncoderSettings,
	info: EncoderInfo,
}

impl GifEncoder {
	#[tracing::instrument(skip(settings), fields(name = "GifEncoder::new"))]
	pub fn new(settings: EncoderSettings) -> Result<Self, EncoderError> {
		Ok(Self {
			encoder: None,
			settings,
			info: EncoderInfo::new(EncoderBackend::Gif),
		})
	}

	fn start(&mut self, width: u16, height: u16) -> Result<(), EncoderError> {
		let mut encoder = gif::Encoder::new(Vec::new(), width, height, &[])?;

		// Without a NETSCAPE block a gif plays once, a stored 0 would mean forever.
		match self.settings.loop_count {
			_ if self.settings.static_image => {}
			LoopCount::Infinite => encoder.set_repeat(gif::Repeat::Infinite)?,
			LoopCount::Finite(0) => {}
			LoopCount::Finite(count) => encoder.set_repeat(gif::Repeat::Finite(count.min(u16::MAX as usize) as u16))?,
		}

		self.encoder = Some(encoder);

		Ok(())
	}
}

/// Quantizer speed for [`gif::Frame::from_rgba_speed`], 1 is the slowest and best.
const fn quantizer_speed(quality: OutputQuality) -> i32 {
	match quality {
		OutputQuality::Lossless | OutputQuality::High => 1,
		OutputQuality::Auto => 10,
		OutputQuality::Medium => 20,
		OutputQuality::Low => 30,
	}
}

impl Encoder for GifEncoder {
	fn info(&self) -> &EncoderInfo {
		&self.info
	}

	#[tracing::instrument(skip_all, fields(name = "GifEncoder::add_frame"))]
	fn add_frame(&mut self, frame: FrameRef<'_>) -> Result<(), EncoderError> {
		if self.settings.static_image && self.info.frame_count > 0 {
			return Err(EncoderError::MultipleFrames);
		}

		let (width, height) = (frame.image.width(), frame.image.height());
		let (Ok(gif_width), Ok(gif_height)) = (u16::try_from(width), u16::try_from(height)) else {
			return Err(EncoderError::UnsupportedDimensions {
				width,
				height,
				format: "image/gif",
			});
		};

		if self.info.frame_count > 0 && (width != self.info.width || height != self.info.height) {
			return Err(EncoderError::UnsupportedDimensions {
				width,
				height,
				format: "image/gif",
			});
		}

		let mut data: Vec<u8> = frame.image.rows().flat_map(|row| row.as_bytes().iter().copied()).collect();
		let mut gif_frame = gif::Frame::from_rgba_speed(gif_width, gif_height, &mut data, quantizer_speed(self.settings.quality));
		gif_frame.delay = frame.delay_cs.min(u16::MAX as u32) as u16;
		// Every frame covers the whole canvas, transparent pixels must not show the previous one.
		gif_frame.dispose = gif::DisposalMethod::Background;

		if self.encoder.is_none() {
			self.start(gif_width, gif_height)?;
		}

		self.encoder
			.as_mut()
			.ok_or(EncoderError::NoFrames)?
			.write_frame(&gif_frame)?;

		self.info.frame_count += 1;
		self.info.duration_cs += frame.delay_cs as u64;
		self.info.width = width;
		self.info.height = height;

		Ok(())
	}

	#[tracing::instrument(skip(self), fields(name = "GifEncoder::finish"))]
	fn finish(self) -> Result<Vec<u8>, EncoderError> {
		let encoder = self.encoder.ok_or(EncoderError::NoFrames)?;
		Ok(encoder.into_inner().map_err(gif::EncodingError::from)?)
	}
}
