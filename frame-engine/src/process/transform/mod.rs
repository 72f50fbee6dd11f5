use std::str::FromStr;

use serde::Deserialize;

mod mirror;
mod reverse;
mod speed;

pub use self::mirror::{mirror, mirror_with};
pub use self::reverse::{reverse, reverse_with};
pub use self::speed::{remap_speed, remap_speed_with, MIN_DELAY};

/// Factor used when a speed change does not name one.
pub const DEFAULT_SPEED_FACTOR: f64 = 2.0;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TransformError {
	#[error("speed factor must be a finite number greater than 0, got {0}")]
	InvalidFactor(f64),
	#[error("unknown mirror axis: {0:?}, expected left, right, top or bottom")]
	UnknownAxis(String),
	#[error("unknown transform: {0:?}, expected mirror, speed or reverse")]
	UnknownKind(String),
	#[error("mirror needs an axis")]
	MissingAxis,
}

/// Which half of the frame is kept and reflected onto the other half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
	Left,
	Right,
	Top,
	Bottom,
}

impl FromStr for Axis {
	type Err = TransformError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"left" => Ok(Self::Left),
			"right" => Ok(Self::Right),
			"top" => Ok(Self::Top),
			"bottom" => Ok(Self::Bottom),
			_ => Err(TransformError::UnknownAxis(s.to_owned())),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
	Mirror(Axis),
	Speed(f64),
	Reverse,
}

impl Transform {
	/// Rejects parameters outside their domain. Runs before any decoding.
	pub fn validate(&self) -> Result<(), TransformError> {
		match self {
			Self::Speed(factor) if !factor.is_finite() || *factor <= 0.0 => Err(TransformError::InvalidFactor(*factor)),
			_ => Ok(()),
		}
	}

	/// Transforms which only touch timing and are meaningless on a still image.
	pub const fn is_temporal(&self) -> bool {
		matches!(self, Self::Speed(_) | Self::Reverse)
	}

	pub const fn name(&self) -> &'static str {
		match self {
			Self::Mirror(_) => "mirror",
			Self::Speed(_) => "speed",
			Self::Reverse => "reverse",
		}
	}
}

/// The loosely typed form of a [`Transform`], as handed over by callers.
///
/// ```json
/// { "kind": "mirror", "axis": "left" }
/// { "kind": "speed", "factor": 1.5 }
/// { "kind": "reverse" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TransformRequest {
	pub kind: String,
	#[serde(default)]
	pub axis: Option<String>,
	#[serde(default)]
	pub factor: Option<f64>,
}

impl TryFrom<TransformRequest> for Transform {
	type Error = TransformError;

	fn try_from(value: TransformRequest) -> Result<Self, Self::Error> {
		let transform = match value.kind.trim().to_ascii_lowercase().as_str() {
			"mirror" | "symmetry" => Transform::Mirror(value.axis.as_deref().ok_or(TransformError::MissingAxis)?.parse()?),
			"speed" => Transform::Speed(value.factor.unwrap_or(DEFAULT_SPEED_FACTOR)),
			"reverse" | "backwards" => Transform::Reverse,
			_ => return Err(TransformError::UnknownKind(value.kind)),
		};

		transform.validate()?;

		Ok(transform)
	}
}
