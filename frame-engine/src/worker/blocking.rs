use std::sync::Arc;

use bytes::Bytes;

use crate::process::transform::Transform;
use crate::process::{CancelToken, Output, Pipeline, ProcessError};

/// Runs `pipeline` on the blocking pool.
///
/// Dropping the returned future cancels the job at its next frame boundary,
/// the blocking thread itself cannot be interrupted.
pub async fn spawn(pipeline: Arc<Pipeline>, input: Bytes, transform: Transform) -> Result<Output, ProcessError> {
	let cancel_token = CancelToken::new();
	let _cancel_guard = cancel_token.drop_guard();

	let span = tracing::Span::current();

	tokio::task::spawn_blocking(move || {
		let _span = span.enter();
		pipeline.process_with_cancel(&input, &transform, &cancel_token)
	})
	.await?
}
