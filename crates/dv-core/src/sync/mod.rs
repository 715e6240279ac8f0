//! Exclusive access for values that are recomputed in place

use std::cell::RefCell;
use std::fmt;

use parking_lot::ReentrantMutex;

use crate::CoreError;

/// A value that is mutated by at most one caller at a time.
///
/// Callers on other threads queue behind the lock. A caller on the thread
/// that is already inside [`ExclusiveCell::mutate`] (for example a listener
/// reacting to a notification) gets [`CoreError::Reentrant`] instead of a
/// deadlock or an interleaved mutation.
pub struct ExclusiveCell<T> {
    inner: ReentrantMutex<RefCell<T>>,
}

impl<T> ExclusiveCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: ReentrantMutex::new(RefCell::new(value)),
        }
    }

    /// Run `f` with shared access.
    ///
    /// Fails only when this thread is currently mutating the value.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, CoreError> {
        let guard = self.inner.lock();
        let value = guard.try_borrow().map_err(|_| CoreError::Reentrant)?;
        Ok(f(&value))
    }

    /// Run `f` with exclusive access
    pub fn mutate<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, CoreError> {
        let guard = self.inner.lock();
        let mut value = guard.try_borrow_mut().map_err(|_| CoreError::Reentrant)?;
        Ok(f(&mut value))
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner().into_inner()
    }
}

impl<T: Default> Default for ExclusiveCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for ExclusiveCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExclusiveCell").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_reentrant_mutation_is_rejected() {
        let cell = ExclusiveCell::new(0u32);

        let nested = cell.mutate(|value| {
            *value += 1;
            cell.mutate(|inner| *inner += 1)
        });

        assert!(matches!(nested, Ok(Err(CoreError::Reentrant))));
        assert_eq!(cell.read(|v| *v).unwrap(), 1);
    }

    #[test]
    fn test_read_during_mutation_is_rejected() {
        let cell = ExclusiveCell::new(String::from("a"));

        let nested = cell.mutate(|_| cell.read(|v| v.len()));

        assert!(matches!(nested, Ok(Err(CoreError::Reentrant))));
    }

    #[test]
    fn test_nested_reads_are_allowed() {
        let cell = ExclusiveCell::new(5u32);

        let nested = cell.read(|outer| cell.read(|inner| outer + inner));

        assert_eq!(nested.unwrap().unwrap(), 10);
    }

    #[test]
    fn test_cross_thread_mutations_are_serialised() {
        let cell = Arc::new(ExclusiveCell::new(0u64));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cell = cell.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        cell.mutate(|v| *v += 1).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cell.read(|v| *v).unwrap(), 4000);
    }
}
