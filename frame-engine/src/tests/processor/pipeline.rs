use crate::config::{EngineConfig, Limits};
use crate::process::decoder::decode;
use crate::process::encoder::encode;
use crate::process::frame::FrameRef;
use crate::process::transform::{Axis, Transform};
use crate::process::{AnimatedImage, CancelToken, ContainerFormat, ErrorKind, LoopCount, Pipeline};
use crate::tests::utils::{gif_bytes, lossless, png_bytes, quadrants, solid_image, webp_bytes, BLUE, GREEN, RED, WHITE};

#[test]
fn mirror_png_test() {
	let pipeline = Pipeline::default();
	let output = pipeline
		.process(&png_bytes(4, 4, &quadrants()), &Transform::Mirror(Axis::Left))
		.expect("failed to process");

	assert_eq!(output.content_type, "image/png");
	assert_eq!((output.width, output.height, output.frame_count), (4, 4, 1));

	let image = decode(&output.buffer, &Limits::default()).expect("failed to decode output");
	let frame = image.frame(0).unwrap();

	// Left quadrants stay, right quadrants are replaced by their reflection.
	for (y, row) in frame.image.rows().enumerate() {
		let expected = if y < 2 { RED } else { BLUE };
		assert!(row.iter().all(|px| *px == expected), "row {y} mismatch");
	}
}

#[test]
fn mirror_odd_width_gif_test() {
	let data = gif_bytes(5, 2, &[(RED, 6), (GREEN, 6)], gif::Repeat::Infinite);

	let output = Pipeline::default()
		.process(&data, &Transform::Mirror(Axis::Right))
		.expect("failed to process");

	assert_eq!(output.content_type, "image/gif");
	assert_eq!((output.width, output.height, output.frame_count), (4, 2, 2));

	let image = decode(&output.buffer, &Limits::default()).expect("failed to decode output");
	assert_eq!((image.width(), image.height()), (4, 2));
	assert_eq!(image.frame_count(), 2);
	assert_eq!(image.loop_count(), LoopCount::Infinite);
}

#[test]
fn reverse_webp_test() {
	let source = solid_image(
		2,
		2,
		&[(RED, 4), (GREEN, 8), (BLUE, 12)],
		ContainerFormat::Webp,
		LoopCount::Finite(5),
	);

	let output = Pipeline::new(lossless())
		.process(&webp_bytes(&source), &Transform::Reverse)
		.expect("failed to process");

	assert_eq!(output.content_type, "image/webp");

	let image = decode(&output.buffer, &Limits::default()).expect("failed to decode output");
	assert_eq!(image.delays(), [12, 8, 4], "delays mismatch");
	assert_eq!(image.loop_count(), LoopCount::Finite(5), "loop count mismatch");

	let colors = image.frames().map(|frame| frame.image.buf()[0]).collect::<Vec<_>>();
	assert_eq!(colors, [BLUE, GREEN, RED]);
}

#[test]
fn speed_webp_test() {
	let source = solid_image(
		2,
		2,
		&[(RED, 10), (GREEN, 10), (BLUE, 10)],
		ContainerFormat::Webp,
		LoopCount::Infinite,
	);

	let output = Pipeline::new(lossless())
		.process(&webp_bytes(&source), &Transform::Speed(3.0))
		.expect("failed to process");

	let image = decode(&output.buffer, &Limits::default()).expect("failed to decode output");
	assert!(image.frame_count() <= 3);
	assert!(image.delays().iter().all(|delay| *delay >= 2), "{:?}", image.delays());
	assert!(image.total_delay_cs().abs_diff(10) <= image.frame_count() as u64);
}

#[test]
fn speed_drops_frames_test() {
	let frames = [RED, GREEN, BLUE, WHITE, BLUE, GREEN, RED, WHITE]
		.iter()
		.map(|color| (*color, 2))
		.collect::<Vec<_>>();
	let source = solid_image(2, 2, &frames, ContainerFormat::Webp, LoopCount::Infinite);

	let output = Pipeline::new(lossless())
		.process(&webp_bytes(&source), &Transform::Speed(4.0))
		.expect("failed to process");

	assert_eq!(output.frame_count, 2);

	// Half a centisecond per frame: the first frame, then the fifth once 2cs piled up.
	let image = decode(&output.buffer, &Limits::default()).expect("failed to decode output");
	assert_eq!(image.delays(), [2, 4], "delays mismatch");
	let colors = image.frames().map(|frame| frame.image.buf()[0]).collect::<Vec<_>>();
	assert_eq!(colors, [RED, BLUE]);
}

#[test]
fn reverse_gif_test() {
	let data = gif_bytes(
		3,
		2,
		&[(RED, 10), (GREEN, 20), (BLUE, 30), (WHITE, 40)],
		gif::Repeat::Finite(3),
	);

	let output = Pipeline::default()
		.process(&data, &Transform::Reverse)
		.expect("failed to process");

	assert_eq!(output.content_type, "image/gif");
	assert_eq!(output.frame_count, 4);

	let image = decode(&output.buffer, &Limits::default()).expect("failed to decode output");
	assert_eq!(image.delays(), [40, 30, 20, 10], "delays mismatch");
	assert_eq!(image.loop_count(), LoopCount::Finite(3), "loop count mismatch");

	let colors = image.frames().map(|frame| frame.image.buf()[0]).collect::<Vec<_>>();
	assert_eq!(colors, [WHITE, BLUE, GREEN, RED]);
}

#[test]
fn speed_gif_test() {
	let data = gif_bytes(2, 2, &[(RED, 10), (GREEN, 20), (BLUE, 30)], gif::Repeat::Infinite);

	let output = Pipeline::default()
		.process(&data, &Transform::Speed(2.0))
		.expect("failed to process");

	let image = decode(&output.buffer, &Limits::default()).expect("failed to decode output");
	assert_eq!(image.delays(), [5, 10, 15], "delays mismatch");
	assert_eq!(image.total_delay_cs(), 30);

	let output = Pipeline::default()
		.process(&data, &Transform::Speed(0.5))
		.expect("failed to process");

	let image = decode(&output.buffer, &Limits::default()).expect("failed to decode output");
	assert_eq!(image.delays(), [20, 40, 60], "delays mismatch");
}

#[test]
fn repeated_frames_collapse_test() {
	// Mirroring the left column over the right one leaves both frames solid red.
	let mut source = AnimatedImage::new(2, 1, ContainerFormat::Webp, LoopCount::Infinite).unwrap();
	source.push_frame(FrameRef::new(&[RED, GREEN], 2, 1, 2)).unwrap();
	source.push_frame(FrameRef::new(&[RED, BLUE], 2, 1, 4)).unwrap();

	for target in [ContainerFormat::Webp, ContainerFormat::Gif] {
		let data = encode(&source, target, &lossless()).expect("failed to encode");

		let output = Pipeline::new(lossless())
			.process(&data, &Transform::Mirror(Axis::Left))
			.expect("failed to process");

		assert_eq!(output.content_type, target.media_type());
		assert_eq!(output.frame_count, 1, "{target:?} frame count mismatch");

		let image = decode(&output.buffer, &Limits::default()).expect("failed to decode output");
		assert_eq!(image.frame_count(), 1, "{target:?} frame count mismatch");
		assert!(image.frame(0).unwrap().image.pixels().all(|px| px == RED));

		// Only gif can store a delay on a single frame.
		if target == ContainerFormat::Gif {
			assert_eq!(image.delays(), [6]);
		}
	}
}

#[test]
fn still_image_temporal_passthrough_test() {
	let data = png_bytes(4, 4, &quadrants());
	let pipeline = Pipeline::default();

	for transform in [Transform::Reverse, Transform::Speed(2.0)] {
		let output = pipeline.process(&data, &transform).expect("failed to process");
		assert_eq!(output.content_type, "image/png");
		assert_eq!(output.buffer.as_ref(), data.as_slice(), "{transform:?} changed the input");
	}
}

#[test]
fn explicit_still_target_test() {
	let data = gif_bytes(3, 3, &[(RED, 5), (BLUE, 5)], gif::Repeat::Infinite);

	let output = Pipeline::default()
		.process_into(&data, &Transform::Reverse, ContainerFormat::Png, &CancelToken::new())
		.expect("failed to process");

	assert_eq!(output.content_type, "image/png");
	assert_eq!(output.frame_count, 1);

	let image = decode(&output.buffer, &Limits::default()).expect("failed to decode output");
	assert!(image.frame(0).unwrap().image.pixels().all(|px| px == BLUE), "reversed first frame");
}

#[test]
fn invalid_input_test() {
	let err = Pipeline::default()
		.process(&[0x13, 0x37, 0x42], &Transform::Reverse)
		.unwrap_err();
	assert_eq!(err.kind(), ErrorKind::Decode, "{err}");
}

#[test]
fn invalid_factor_test() {
	// Garbage input shows the factor is rejected before anything is decoded.
	for factor in [0.0, -1.0, f64::NAN] {
		let err = Pipeline::default()
			.process(&[0x13, 0x37, 0x42], &Transform::Speed(factor))
			.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{err}");
	}
}

#[test]
fn resource_limit_test() {
	let pipeline = Pipeline::new(EngineConfig {
		limits: Limits {
			max_input_frame_count: 1,
			..Default::default()
		},
		..Default::default()
	});

	let data = gif_bytes(2, 2, &[(RED, 5), (BLUE, 5)], gif::Repeat::Infinite);
	let err = pipeline.process(&data, &Transform::Reverse).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::ResourceLimitExceeded, "{err}");
}

#[test]
fn cancelled_test() {
	let cancel = CancelToken::new();
	cancel.cancel();

	let err = Pipeline::default()
		.process_with_cancel(&png_bytes(4, 4, &quadrants()), &Transform::Mirror(Axis::Top), &cancel)
		.unwrap_err();
	assert_eq!(err.kind(), ErrorKind::Cancelled);
}

#[test]
fn parallel_mirror_test() {
	let source = solid_image(
		6,
		5,
		&[(RED, 5), (GREEN, 5), (BLUE, 5)],
		ContainerFormat::Webp,
		LoopCount::Finite(2),
	);
	let data = webp_bytes(&source);

	let sequential = Pipeline::new(lossless())
		.process(&data, &Transform::Mirror(Axis::Bottom))
		.expect("failed to process");
	let parallel = Pipeline::new(EngineConfig {
		parallel_frames: true,
		..lossless()
	})
	.process(&data, &Transform::Mirror(Axis::Bottom))
	.expect("failed to process");

	assert_eq!((parallel.width, parallel.height, parallel.frame_count), (6, 4, 3));

	let sequential = decode(&sequential.buffer, &Limits::default()).expect("failed to decode output");
	let parallel = decode(&parallel.buffer, &Limits::default()).expect("failed to decode output");
	assert_eq!(sequential, parallel);
}
