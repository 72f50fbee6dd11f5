#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WebPError {
	#[error("{0} failed")]
	CallFailed(&'static str),
	#[error("out of memory")]
	OutOfMemory,
	#[error("invalid data")]
	InvalidData,
}

/// Zeroed storage for libwebp structs which are filled in by an init call.
pub fn zero_memory_default<T>() -> T {
	// Safety: only used for plain C structs where all-zero is a valid bit pattern.
	unsafe { std::mem::zeroed() }
}

/// Maps a libwebp status (0 is failure) to a result.
pub fn check(status: i32, call: &'static str) -> Result<(), WebPError> {
	if status == 0 {
		Err(WebPError::CallFailed(call))
	} else {
		Ok(())
	}
}
