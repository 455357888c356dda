use std::sync::Mutex;
use std::sync::PoisonError;

use derive_more::Deref;
use derive_more::DerefMut;

/// Number of idle buffers a [`BufferPool`] keeps by default.
pub const DEFAULT_POOL_SIZE: usize = 64;

/// A bounded pool of reusable output buffers.
///
/// Buffers are handed out wrapped in a [`PooledBuffer`] which clears the
/// buffer and returns it to the pool when dropped. When the pool is full the
/// buffer is discarded instead.
#[derive(Debug)]
pub struct BufferPool {
	capacity: usize,
	idle: Mutex<Vec<Vec<u8>>>,
}

impl Default for BufferPool {
	fn default() -> Self {
		Self::new(DEFAULT_POOL_SIZE)
	}
}

impl BufferPool {
	pub fn new(capacity: usize) -> Self {
		Self {
			capacity,
			idle: Mutex::new(Vec::with_capacity(capacity)),
		}
	}

	/// Take an idle buffer, or allocate one when none are idle.
	pub fn get(&self) -> PooledBuffer<'_> {
		let buffer = self
			.idle
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.pop()
			.unwrap_or_default();

		PooledBuffer { pool: self, buffer }
	}

	/// Number of buffers waiting to be reused.
	pub fn idle(&self) -> usize {
		self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	fn put(&self, mut buffer: Vec<u8>) {
		buffer.clear();
		let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
		if idle.len() < self.capacity {
			idle.push(buffer);
		}
	}
}

/// A buffer borrowed from a [`BufferPool`].
#[derive(Debug, Deref, DerefMut)]
pub struct PooledBuffer<'a> {
	pool: &'a BufferPool,
	#[deref]
	#[deref_mut]
	buffer: Vec<u8>,
}

impl Drop for PooledBuffer<'_> {
	fn drop(&mut self) {
		self.pool.put(std::mem::take(&mut self.buffer));
	}
}
