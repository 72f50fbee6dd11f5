use std::borrow::Cow;
use std::ptr::NonNull;

use super::{Decoder, DecoderError, DecoderFrontend, DecoderInfo, LoopCount};
use crate::config::Limits;
use crate::process::frame::FrameRef;
use crate::process::libwebp::{zero_memory_default, WebPError};
use crate::process::smart_object::SmartPtr;

pub struct WebpDecoder<'data> {
	info: DecoderInfo,
	decoder: SmartPtr<libwebp_sys::WebPAnimDecoder>,
	_data: Cow<'data, [u8]>,
	timestamp: i32,
}

impl<'data> WebpDecoder<'data> {
	#[tracing::instrument(skip(limits, data), fields(name = "WebpDecoder::new"))]
	pub fn new(limits: &Limits, data: Cow<'data, [u8]>) -> Result<Self, DecoderError> {
		let mut options = zero_memory_default::<libwebp_sys::WebPAnimDecoderOptions>();

		// Safety: options is a valid pointer.
		if unsafe { libwebp_sys::WebPAnimDecoderOptionsInit(&mut options) } == 0 {
			return Err(WebPError::CallFailed("WebPAnimDecoderOptionsInit").into());
		}

		options.color_mode = libwebp_sys::MODE_RGBA;
		options.use_threads = 0;

		// Safety: data outlives the decoder, both are owned by this struct.
		let decoder = NonNull::new(unsafe {
			libwebp_sys::WebPAnimDecoderNew(
				&libwebp_sys::WebPData {
					bytes: data.as_ptr(),
					size: data.len(),
				},
				&options,
			)
		})
		.ok_or(WebPError::InvalidData)?;

		let decoder = SmartPtr::new(decoder, |decoder| {
			// Safety: The decoder is valid.
			unsafe {
				libwebp_sys::WebPAnimDecoderDelete(decoder.as_ptr());
			}
		});

		let mut info = zero_memory_default::<libwebp_sys::WebPAnimInfo>();

		// Safety: both pointers are valid and the decoder is valid.
		if unsafe { libwebp_sys::WebPAnimDecoderGetInfo(decoder.as_ptr(), &mut info) } == 0 {
			return Err(DecoderError::LibWebp(WebPError::InvalidData));
		}

		limits.check(info.canvas_width as u64, info.canvas_height as u64, info.frame_count as u64)?;

		Ok(Self {
			info: DecoderInfo {
				width: info.canvas_width as _,
				height: info.canvas_height as _,
				loop_count: LoopCount::from_raw(info.loop_count as usize),
				frame_count: Some(info.frame_count as _),
			},
			decoder,
			_data: data,
			timestamp: 0,
		})
	}
}

impl Decoder for WebpDecoder<'_> {
	fn backend(&self) -> DecoderFrontend {
		DecoderFrontend::LibWebp
	}

	fn info(&self) -> DecoderInfo {
		self.info
	}

	#[tracing::instrument(skip(self), fields(name = "WebpDecoder::decode"))]
	fn decode(&mut self) -> Result<Option<FrameRef<'_>>, DecoderError> {
		// Safety: The decoder is valid.
		if unsafe { libwebp_sys::WebPAnimDecoderHasMoreFrames(self.decoder.as_ptr()) } == 0 {
			return Ok(None);
		}

		let mut buf = std::ptr::null_mut();
		let previous_timestamp = self.timestamp;

		// Safety: The buffer is a valid pointer to a null ptr, timestamp is a valid
		// pointer to i32, and the decoder is valid.
		let result = unsafe { libwebp_sys::WebPAnimDecoderGetNext(self.decoder.as_ptr(), &mut buf, &mut self.timestamp) };

		if result == 0 {
			return Err(WebPError::InvalidData.into());
		}

		let buf = NonNull::new(buf).ok_or(WebPError::OutOfMemory)?;

		// Safety: libwebp hands out a canvas sized RGBA buffer which stays valid
		// until the next call into the decoder, which needs &mut self.
		let buf =
			unsafe { std::slice::from_raw_parts(buf.as_ptr() as *const rgb::RGBA8, self.info.width * self.info.height) };

		// Timestamps mark the end of each frame in milliseconds.
		let duration_ms = (self.timestamp - previous_timestamp).max(0) as u32;
		let delay_cs = (duration_ms + 5) / 10;

		Ok(Some(FrameRef::new(buf, self.info.width, self.info.height, delay_cs)))
	}
}
