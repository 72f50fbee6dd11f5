use rgb::RGBA8;

use crate::config::{EngineConfig, OutputQuality};
use crate::process::encoder::encode;
use crate::process::frame::FrameRef;
use crate::process::{AnimatedImage, ContainerFormat, LoopCount};

pub const RED: RGBA8 = RGBA8 { r: 255, g: 0, b: 0, a: 255 };
pub const GREEN: RGBA8 = RGBA8 { r: 0, g: 255, b: 0, a: 255 };
pub const BLUE: RGBA8 = RGBA8 { r: 0, g: 0, b: 255, a: 255 };
pub const WHITE: RGBA8 = RGBA8 { r: 255, g: 255, b: 255, a: 255 };

/// Solid colored frames, one per `(color, delay_cs)`.
pub fn solid_image(
	width: usize,
	height: usize,
	frames: &[(RGBA8, u32)],
	format: ContainerFormat,
	loop_count: LoopCount,
) -> AnimatedImage {
	let mut image = AnimatedImage::new(width, height, format, loop_count).unwrap();
	for (color, delay_cs) in frames {
		let buf = vec![*color; width * height];
		image.push_frame(FrameRef::new(&buf, width, height, *delay_cs)).unwrap();
	}
	image
}

/// A single 4x4 frame with a different color in every quadrant.
pub fn quadrants() -> Vec<RGBA8> {
	(0..16)
		.map(|idx| match (idx % 4 < 2, idx / 4 < 2) {
			(true, true) => RED,
			(false, true) => GREEN,
			(true, false) => BLUE,
			(false, false) => WHITE,
		})
		.collect()
}

pub fn gif_bytes(width: u16, height: u16, frames: &[(RGBA8, u16)], repeat: gif::Repeat) -> Vec<u8> {
	let mut out = Vec::new();
	{
		let mut encoder = gif::Encoder::new(&mut out, width, height, &[]).unwrap();
		encoder.set_repeat(repeat).unwrap();
		for (color, delay) in frames {
			let mut pixels = vec![*color; width as usize * height as usize]
				.into_iter()
				.flat_map(|px| [px.r, px.g, px.b, px.a])
				.collect::<Vec<_>>();
			let mut frame = gif::Frame::from_rgba_speed(width, height, &mut pixels, 10);
			frame.delay = *delay;
			encoder.write_frame(&frame).unwrap();
		}
	}
	out
}

pub fn png_bytes(width: u32, height: u32, pixels: &[RGBA8]) -> Vec<u8> {
	let mut out = Vec::new();
	{
		let mut encoder = png::Encoder::new(&mut out, width, height);
		encoder.set_color(png::ColorType::Rgba);
		encoder.set_depth(png::BitDepth::Eight);
		let mut writer = encoder.write_header().unwrap();
		let data = pixels.iter().flat_map(|px| [px.r, px.g, px.b, px.a]).collect::<Vec<_>>();
		writer.write_image_data(&data).unwrap();
	}
	out
}

pub fn webp_bytes(image: &AnimatedImage) -> Vec<u8> {
	encode(image, ContainerFormat::Webp, &lossless()).unwrap()
}

pub fn lossless() -> EngineConfig {
	EngineConfig {
		quality: OutputQuality::Lossless,
		..Default::default()
	}
}
