use core::{cell::UnsafeCell, fmt};

use crate::{hw::Hardware, trap::IrqLockGuard};

/// Cell type that can only be accessed while interrupts are masked, i.e.,
/// with an [`IrqLockGuard`] in hand.
///
/// The contents are only ever copied in and out, so no reference to the
/// interior escapes even if an interrupt handler reenters the driver.
#[repr(transparent)]
pub struct IrqLockCell<T>(UnsafeCell<T>);

// Safety: All accesses require `IrqLockGuard`, and `Hardware` guarantees the
//         trap handler doesn't run while one exists. Cross-thread sharing is
//         only possible if the owning `Hardware` is `Sync`, in which case it
//         represents a single hart.
unsafe impl<T: Send> Sync for IrqLockCell<T> {}

impl<T> IrqLockCell<T> {
    pub const fn new(x: T) -> Self {
        Self(UnsafeCell::new(x))
    }
}

impl<T: Copy> IrqLockCell<T> {
    #[inline]
    pub fn get<H: Hardware + ?Sized>(&self, _lock: &IrqLockGuard<'_, H>) -> T {
        // Safety: Interrupts are masked, and no references to the contents
        //         exist
        unsafe { *self.0.get() }
    }

    #[inline]
    pub fn set<H: Hardware + ?Sized>(&self, _lock: &IrqLockGuard<'_, H>, value: T) {
        // Safety: Ditto.
        unsafe { *self.0.get() = value };
    }

    #[inline]
    pub fn replace<H: Hardware + ?Sized>(&self, lock: &IrqLockGuard<'_, H>, value: T) -> T {
        let old = self.get(lock);
        self.set(lock, value);
        old
    }

    /// Update the contents with `f`. `f` gets a copy, so it may safely
    /// reenter.
    #[inline]
    pub fn update<H: Hardware + ?Sized>(
        &self,
        lock: &IrqLockGuard<'_, H>,
        f: impl FnOnce(T) -> T,
    ) -> T {
        let new = f(self.get(lock));
        self.set(lock, new);
        new
    }
}

impl<T: Copy, const N: usize> IrqLockCell<[T; N]> {
    /// Get the `i`-th element. Returns `None` if `i` is out of bounds.
    #[inline]
    pub fn get_at<H: Hardware + ?Sized>(&self, _lock: &IrqLockGuard<'_, H>, i: usize) -> Option<T> {
        // Safety: Interrupts are masked, and the reference doesn't outlive
        //         this statement
        unsafe { (*self.0.get()).get(i).copied() }
    }

    /// Replace the `i`-th element, returning the old one. Returns `None` and
    /// leaves the contents untouched if `i` is out of bounds.
    #[inline]
    pub fn replace_at<H: Hardware + ?Sized>(
        &self,
        _lock: &IrqLockGuard<'_, H>,
        i: usize,
        value: T,
    ) -> Option<T> {
        // Safety: Ditto.
        unsafe { (*self.0.get()).get_mut(i).map(|x| core::mem::replace(x, value)) }
    }
}

impl<T> fmt::Debug for IrqLockCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("IrqLockCell(< locked >)")
    }
}
