use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
	/// Limits applied while decoding input images
	pub limits: Limits,
	/// The quality used by the gif and webp encoders
	pub quality: OutputQuality,
	/// The jpeg encoder quality, between 1 and 100
	pub jpeg_quality: u8,
	/// Mirror frames on the rayon thread pool instead of the calling thread
	pub parallel_frames: bool,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			limits: Limits::default(),
			quality: OutputQuality::default(),
			jpeg_quality: 90,
			parallel_frames: false,
		}
	}
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Limits {
	/// The maximum width of an input frame in pixels
	pub max_input_width: u32,
	/// The maximum height of an input frame in pixels
	pub max_input_height: u32,
	/// The maximum number of frames in an input image
	pub max_input_frame_count: u32,
	/// The maximum size of all decoded frames together, in bytes
	pub max_decoded_bytes: u64,
}

impl Default for Limits {
	fn default() -> Self {
		Self {
			max_input_width: 4096,
			max_input_height: 4096,
			max_input_frame_count: 2048,
			max_decoded_bytes: 1 << 30,
		}
	}
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LimitError {
	#[error("exceeded maximum input width: {width} > {max}")]
	TooWide { width: u64, max: u32 },
	#[error("exceeded maximum input height: {height} > {max}")]
	TooHigh { height: u64, max: u32 },
	#[error("exceeded maximum input frame count: {frame_count} > {max}")]
	TooManyFrames { frame_count: u64, max: u32 },
	#[error("decoded frames need {bytes} bytes, budget is {max}")]
	TooLarge { bytes: u64, max: u64 },
}

impl Limits {
	/// Checks the canvas size and the memory `frame_count` frames of it
	/// would need. Called before any frame buffer is allocated.
	pub fn check(&self, width: u64, height: u64, frame_count: u64) -> Result<(), LimitError> {
		if width > self.max_input_width as u64 {
			return Err(LimitError::TooWide {
				width,
				max: self.max_input_width,
			});
		}

		if height > self.max_input_height as u64 {
			return Err(LimitError::TooHigh {
				height,
				max: self.max_input_height,
			});
		}

		if frame_count > self.max_input_frame_count as u64 {
			return Err(LimitError::TooManyFrames {
				frame_count,
				max: self.max_input_frame_count,
			});
		}

		let bytes = width
			.saturating_mul(height)
			.saturating_mul(4)
			.saturating_mul(frame_count);

		if bytes > self.max_decoded_bytes {
			return Err(LimitError::TooLarge {
				bytes,
				max: self.max_decoded_bytes,
			});
		}

		Ok(())
	}
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputQuality {
	#[default]
	Auto,
	High,
	Lossless,
	Medium,
	Low,
}
