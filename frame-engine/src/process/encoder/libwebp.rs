use std::ptr::NonNull;

use libwebp_sys::WebPMuxAnimParams;

use super::{Encoder, EncoderBackend, EncoderError, EncoderInfo, EncoderSettings};
use crate::config::OutputQuality;
use crate::process::decoder::LoopCount;
use crate::process::frame::FrameRef;
use crate::process::libwebp::{check, zero_memory_default, WebPError};
use crate::process::smart_object::{SmartObject, SmartPtr};

pub struct WebpEncoder {
	config: libwebp_sys::WebPConfig,
	settings: EncoderSettings,
	picture: SmartObject<libwebp_sys::WebPPicture>,
	encoder: Option<SmartPtr<libwebp_sys::WebPAnimEncoder>>,
	first_delay: Option<u32>,
	timestamp_ms: u64,
	info: EncoderInfo,
}

impl WebpEncoder {
	#[tracing::instrument(skip(settings), fields(name = "WebpEncoder::new"))]
	pub fn new(settings: EncoderSettings) -> Result<Self, EncoderError> {
		let mut config = zero_memory_default::<libwebp_sys::WebPConfig>();

		// Safety: config is a valid pointer.
		check(unsafe { libwebp_sys::WebPConfigInit(&mut config) }, "WebPConfigInit")?;

		config.thread_level = 1;

		match settings.quality {
			OutputQuality::Lossless => {
				config.lossless = 1;
				config.quality = 100.0;
			}
			OutputQuality::High => config.quality = 95.0,
			OutputQuality::Auto => config.quality = 90.0,
			OutputQuality::Medium => config.quality = 75.0,
			OutputQuality::Low => config.quality = 50.0,
		}

		let mut picture = SmartObject::new(zero_memory_default::<libwebp_sys::WebPPicture>(), |ptr| unsafe {
			libwebp_sys::WebPPictureFree(ptr);
		});

		// Safety: picture is a valid pointer.
		check(unsafe { libwebp_sys::WebPPictureInit(&mut *picture) }, "WebPPictureInit")?;

		picture.use_argb = 1;

		Ok(Self {
			config,
			settings,
			picture,
			encoder: None,
			first_delay: None,
			timestamp_ms: 0,
			info: EncoderInfo::new(EncoderBackend::LibWebp),
		})
	}

	fn flush_frame(&mut self, delay_cs: u32) -> Result<(), EncoderError> {
		let encoder = self.encoder.as_ref().ok_or(WebPError::CallFailed("WebPAnimEncoderNew"))?;

		// Safety: the encoder, picture and config are valid.
		check(
			unsafe {
				libwebp_sys::WebPAnimEncoderAdd(encoder.as_ptr(), &mut *self.picture, self.timestamp_ms as _, &self.config)
			},
			"WebPAnimEncoderAdd",
		)?;

		self.timestamp_ms += delay_cs as u64 * 10;

		Ok(())
	}

	fn start_animation(&mut self) -> Result<(), EncoderError> {
		let loop_count = match self.settings.loop_count {
			LoopCount::Infinite => 0,
			// 0 means forever in webp, a gif without repeats plays once.
			LoopCount::Finite(count) => count.clamp(1, u16::MAX as usize) as _,
		};

		// Safety: the options struct is fully initialized.
		let encoder = NonNull::new(unsafe {
			libwebp_sys::WebPAnimEncoderNew(
				self.picture.width,
				self.picture.height,
				&libwebp_sys::WebPAnimEncoderOptions {
					// Mixed mode may pick lossy frames even for a lossless config.
					allow_mixed: (self.config.lossless == 0) as _,
					anim_params: WebPMuxAnimParams { bgcolor: 0, loop_count },
					kmax: 0,
					kmin: 0,
					verbose: 0,
					minimize_size: 0,
					padding: [0; 4],
				},
			)
		})
		.ok_or(WebPError::OutOfMemory)?;

		self.encoder = Some(SmartPtr::new(encoder, |encoder| {
			// Safety: The encoder is valid.
			unsafe {
				libwebp_sys::WebPAnimEncoderDelete(encoder.as_ptr());
			}
		}));

		Ok(())
	}

	fn assemble(&mut self) -> Result<Vec<u8>, EncoderError> {
		let encoder = self.encoder.as_ref().ok_or(WebPError::CallFailed("WebPAnimEncoderNew"))?;

		// A null frame marks the end timestamp of the last frame.
		// Safety: the encoder is valid, a null picture is allowed here.
		check(
			unsafe {
				libwebp_sys::WebPAnimEncoderAdd(encoder.as_ptr(), std::ptr::null_mut(), self.timestamp_ms as _, std::ptr::null())
			},
			"WebPAnimEncoderAdd",
		)?;

		let mut webp_data = SmartObject::new(zero_memory_default::<libwebp_sys::WebPData>(), |ptr| unsafe {
			libwebp_sys::WebPDataClear(ptr);
		});

		// Safety: The data is valid.
		unsafe { libwebp_sys::WebPDataInit(&mut *webp_data) };

		// Safety: the encoder and data are valid.
		check(
			unsafe { libwebp_sys::WebPAnimEncoderAssemble(encoder.as_ptr(), &mut *webp_data) },
			"WebPAnimEncoderAssemble",
		)?;

		let data = NonNull::new(webp_data.bytes as *mut u8).ok_or(WebPError::OutOfMemory)?;

		// Safety: libwebp owns `size` bytes at `data` until the data is cleared on drop.
		Ok(unsafe { std::slice::from_raw_parts(data.as_ptr(), webp_data.size) }.to_vec())
	}

	fn encode_still(&mut self) -> Result<Vec<u8>, EncoderError> {
		let mut memory_writer = SmartObject::new(zero_memory_default::<libwebp_sys::WebPMemoryWriter>(), |ptr| unsafe {
			libwebp_sys::WebPMemoryWriterClear(ptr);
		});

		// Safety: The functions are correct, but the library requires picture.writer to
		// be a "safe" function and we only have a "unsafe" function.
		self.picture.writer = Some(unsafe { std::mem::transmute(libwebp_sys::WebPMemoryWrite as *const ()) });
		self.picture.custom_ptr = &mut *memory_writer as *mut _ as _;

		// Safety: The picture is valid.
		check(
			unsafe { libwebp_sys::WebPEncode(&self.config, &mut *self.picture) },
			"WebPEncode",
		)?;

		let data = NonNull::new(memory_writer.mem).ok_or(WebPError::OutOfMemory)?;

		// Safety: the writer owns `size` bytes at `mem` until it is cleared on drop.
		Ok(unsafe { std::slice::from_raw_parts(data.as_ptr(), memory_writer.size) }.to_vec())
	}
}

impl Encoder for WebpEncoder {
	fn info(&self) -> &EncoderInfo {
		&self.info
	}

	#[tracing::instrument(skip_all, fields(name = "WebpEncoder::add_frame"))]
	fn add_frame(&mut self, frame: FrameRef<'_>) -> Result<(), EncoderError> {
		let (width, height) = (frame.image.width(), frame.image.height());

		if self.first_delay.is_none() && self.encoder.is_none() {
			self.picture.width = width as _;
			self.picture.height = height as _;
			self.first_delay = Some(frame.delay_cs);
		} else if let Some(first_delay) = self.first_delay.take() {
			if self.settings.static_image {
				return Err(EncoderError::MultipleFrames);
			}

			// The first frame is still in the picture, it is flushed once we know
			// the output is animated.
			self.start_animation()?;
			self.flush_frame(first_delay)?;
		}

		if width != self.picture.width as usize || height != self.picture.height as usize {
			return Err(EncoderError::UnsupportedDimensions {
				width,
				height,
				format: "image/webp",
			});
		}

		let packed;
		let buf = if frame.image.stride() == width {
			&frame.image.buf()[..]
		} else {
			packed = frame.image.pixels().collect::<Vec<_>>();
			packed.as_slice()
		};

		// Safety: buf holds width * height tightly packed rgba pixels.
		check(
			unsafe { libwebp_sys::WebPPictureImportRGBA(&mut *self.picture, buf.as_ptr() as _, width as i32 * 4) },
			"WebPPictureImportRGBA",
		)?;

		if self.encoder.is_some() {
			self.flush_frame(frame.delay_cs)?;
		}

		self.info.frame_count += 1;
		self.info.duration_cs += frame.delay_cs as u64;
		self.info.width = width;
		self.info.height = height;

		Ok(())
	}

	#[tracing::instrument(skip(self), fields(name = "WebpEncoder::finish"))]
	fn finish(mut self) -> Result<Vec<u8>, EncoderError> {
		if self.encoder.is_some() {
			self.assemble()
		} else if self.first_delay.is_some() {
			self.encode_still()
		} else {
			Err(EncoderError::NoFrames)
		}
	}
}
