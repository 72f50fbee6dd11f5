use std::ptr::NonNull;

pub type SmartPtr<T> = SmartObject<NonNull<T>>;

/// Owns a value from a C library and runs its destructor on drop.
#[derive(Debug)]
pub struct SmartObject<T> {
	value: T,
	destructor: fn(&mut T),
}

impl<T> SmartObject<T> {
	pub fn new(value: T, destructor: fn(&mut T)) -> Self {
		Self { value, destructor }
	}
}

impl<T> SmartPtr<T> {
	pub fn as_ptr(&self) -> *mut T {
		self.value.as_ptr()
	}
}

impl<T> Drop for SmartObject<T> {
	fn drop(&mut self) {
		(self.destructor)(&mut self.value);
	}
}

impl<T> std::ops::Deref for SmartObject<T> {
	type Target = T;

	fn deref(&self) -> &Self::Target {
		&self.value
	}
}

impl<T> std::ops::DerefMut for SmartObject<T> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.value
	}
}
