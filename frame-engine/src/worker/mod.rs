use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

mod blocking;

pub use self::blocking::spawn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
	#[error("another job is already running")]
	Busy,
	#[error("gate is closed")]
	Closed,
}

/// Lets a single job run at a time and turns everyone else away.
///
/// Callers never wait for the running job: [`JobGate::try_acquire`] either
/// hands out the only permit or fails with [`GateError::Busy`].
#[derive(Debug, Clone)]
pub struct JobGate {
	semaphore: Arc<Semaphore>,
}

/// Held for as long as the job runs, releases the gate on drop.
#[derive(Debug)]
pub struct JobPermit {
	_permit: OwnedSemaphorePermit,
}

impl Default for JobGate {
	fn default() -> Self {
		Self::new()
	}
}

impl JobGate {
	pub fn new() -> Self {
		Self {
			semaphore: Arc::new(Semaphore::new(1)),
		}
	}

	pub fn try_acquire(&self) -> Result<JobPermit, GateError> {
		match self.semaphore.clone().try_acquire_owned() {
			Ok(permit) => Ok(JobPermit { _permit: permit }),
			Err(TryAcquireError::NoPermits) => {
				tracing::debug!("rejected job, gate is busy");
				Err(GateError::Busy)
			}
			Err(TryAcquireError::Closed) => Err(GateError::Closed),
		}
	}

	pub fn is_busy(&self) -> bool {
		self.semaphore.available_permits() == 0
	}

	/// Rejects every future acquire, running jobs keep their permit.
	pub fn close(&self) {
		self.semaphore.close();
	}
}
