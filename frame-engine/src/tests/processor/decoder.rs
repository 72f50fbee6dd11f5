use crate::config::{LimitError, Limits};
use crate::process::decoder::{decode, DecoderError, DecoderFrontend};
use crate::process::{ContainerFormat, LoopCount};
use crate::tests::utils::{gif_bytes, png_bytes, quadrants, solid_image, webp_bytes, BLUE, GREEN, RED};

#[test]
fn decode_gif_test() {
	let data = gif_bytes(4, 3, &[(RED, 5), (GREEN, 10), (BLUE, 15)], gif::Repeat::Finite(3));

	assert_eq!(DecoderFrontend::from_bytes(&data).unwrap(), DecoderFrontend::Gif);

	let image = decode(&data, &Limits::default()).expect("failed to decode");

	assert_eq!(image.format(), ContainerFormat::Gif, "format mismatch");
	assert_eq!((image.width(), image.height()), (4, 3), "dimensions mismatch");
	assert_eq!(image.frame_count(), 3, "frame count mismatch");
	assert_eq!(image.delays(), [5, 10, 15], "delays mismatch");
	assert_eq!(image.loop_count(), LoopCount::Finite(3), "loop count mismatch");

	for (idx, (frame, color)) in image.frames().zip([RED, GREEN, BLUE]).enumerate() {
		assert!(frame.image.pixels().all(|px| px == color), "frame {idx} color mismatch");
	}
}

#[test]
fn decode_gif_infinite_loop_test() {
	let data = gif_bytes(2, 2, &[(RED, 4), (BLUE, 4)], gif::Repeat::Infinite);
	let image = decode(&data, &Limits::default()).expect("failed to decode");

	assert_eq!(image.loop_count(), LoopCount::Infinite);
	assert_eq!(image.loop_count().as_raw(), 0);
}

#[test]
fn decode_png_test() {
	let data = png_bytes(4, 4, &quadrants());
	let image = decode(&data, &Limits::default()).expect("failed to decode");

	assert_eq!(image.format(), ContainerFormat::Png);
	assert_eq!(image.frame_count(), 1);
	assert!(!image.is_animated());
	assert_eq!(image.frame(0).unwrap().image.buf().to_vec(), quadrants());
}

#[test]
fn decode_webp_test() {
	let source = solid_image(
		3,
		2,
		&[(RED, 7), (GREEN, 3), (BLUE, 12)],
		ContainerFormat::Webp,
		LoopCount::Finite(2),
	);
	let image = decode(&webp_bytes(&source), &Limits::default()).expect("failed to decode");

	assert_eq!(image.format(), ContainerFormat::Webp);
	assert_eq!(image.frame_count(), 3, "frame count mismatch");
	assert_eq!(image.delays(), [7, 3, 12], "delays mismatch");
	assert_eq!(image.loop_count(), LoopCount::Finite(2), "loop count mismatch");
	assert_eq!(image.as_bytes(), source.as_bytes(), "pixel mismatch");
}

#[test]
fn decode_garbage_test() {
	let err = decode(&[0x13, 0x37, 0x42], &Limits::default()).unwrap_err();
	assert!(matches!(err, DecoderError::UnsupportedInputFormat(_)), "{err}");

	let mut truncated = gif_bytes(2, 2, &[(RED, 4), (BLUE, 4)], gif::Repeat::Infinite);
	truncated.truncate(16);
	assert!(decode(&truncated, &Limits::default()).is_err());
}

#[test]
fn decode_limits_test() {
	let data = gif_bytes(2, 2, &[(RED, 4), (GREEN, 4), (BLUE, 4)], gif::Repeat::Infinite);
	let limits = Limits {
		max_input_frame_count: 2,
		..Default::default()
	};

	let err = decode(&data, &limits).unwrap_err();
	assert!(
		matches!(err, DecoderError::Limit(LimitError::TooManyFrames { frame_count: 3, max: 2 })),
		"{err}"
	);

	let data = png_bytes(4, 4, &quadrants());
	let limits = Limits {
		max_input_width: 2,
		..Default::default()
	};

	let err = decode(&data, &limits).unwrap_err();
	assert!(matches!(err, DecoderError::Limit(LimitError::TooWide { width: 4, max: 2 })), "{err}");

	let limits = Limits {
		max_decoded_bytes: 63,
		..Default::default()
	};

	let err = decode(&data, &limits).unwrap_err();
	assert!(matches!(err, DecoderError::Limit(LimitError::TooLarge { bytes: 64, max: 63 })), "{err}");
}

#[test]
fn decode_large_gif_test() {
	// 4000x4000 RGBA is 64MB, above the gif crate's own default memory limit.
	let (width, height) = (4000_u16, 4000_u16);
	let mut data = Vec::new();
	{
		let mut encoder = gif::Encoder::new(&mut data, width, height, &[255, 0, 0]).unwrap();
		let frame = gif::Frame {
			width,
			height,
			buffer: std::borrow::Cow::Owned(vec![0; width as usize * height as usize]),
			..Default::default()
		};
		encoder.write_frame(&frame).unwrap();
	}

	let limits = Limits::default();
	assert!(limits.check(width as u64, height as u64, 1).is_ok());

	let image = decode(&data, &limits).expect("failed to decode");
	assert_eq!((image.width(), image.height()), (4000, 4000));
	assert_eq!(image.frame(0).unwrap().image.buf()[0], RED);

	let limits = Limits {
		max_decoded_bytes: 1 << 20,
		..Default::default()
	};
	let err = decode(&data, &limits).unwrap_err();
	assert!(matches!(err, DecoderError::Limit(LimitError::TooLarge { .. })), "{err}");
}
