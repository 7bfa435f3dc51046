//! Frame guard shared by typed and keyed scopes.

use parking_lot::Mutex;

/// Pops the frame it pushed when dropped.
///
/// The stack is truncated back to the depth observed before the push, so the
/// frame is released on normal return and while unwinding alike, and any
/// frames a misbehaving body left behind are released with it.
pub(crate) struct FrameGuard<'a, T> {
    stack: &'a Mutex<Vec<T>>,
    depth: usize,
}

impl<'a, T> FrameGuard<'a, T> {
    pub(crate) fn push(stack: &'a Mutex<Vec<T>>, value: T) -> Self {
        let mut frames = stack.lock();
        let depth = frames.len();
        frames.push(value);
        Self { stack, depth }
    }
}

impl<T> Drop for FrameGuard<'_, T> {
    fn drop(&mut self) {
        self.stack.lock().truncate(self.depth);
    }
}
