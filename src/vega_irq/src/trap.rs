//! Machine-mode trap enablement
use core::fmt;

use crate::hw::Hardware;

/// Enable the delivery of external interrupts to the hart.
///
/// Sets `mie.MEIE` and `mstatus.MIE`, and points `mtvec` at `trap_vector`,
/// the platform's trap entry point, which is expected to call
/// [`Board::handle_trap`](crate::Board::handle_trap). Calling this repeatedly
/// is harmless.
pub fn enable<H: Hardware + ?Sized>(hw: &H, trap_vector: usize) {
    log::trace!("enabling machine external interrupts, mtvec = {trap_vector:#x}");
    hw.write_mtvec(trap_vector);
    hw.set_mie_meie();
    hw.set_mstatus_mie();
}

/// The counterpart of [`enable`]. Clears `mstatus.MIE` and `mie.MEIE`. `mtvec`
/// is left intact.
pub fn disable<H: Hardware + ?Sized>(hw: &H) {
    log::trace!("disabling machine external interrupts");
    hw.fetch_clear_mstatus_mie();
    hw.clear_mie_meie();
}

/// Mask interrupts and get an RAII guard that restores the previous
/// `mstatus.MIE` when dropped.
///
/// Guards nest freely; only the outermost one re-enables interrupts. In the
/// trap handler, where the hart has already cleared `mstatus.MIE`, taking a
/// guard has no effect on the interrupt state.
#[inline]
pub fn lock<H: Hardware + ?Sized>(hw: &H) -> IrqLockGuard<'_, H> {
    let was_enabled = hw.fetch_clear_mstatus_mie();
    IrqLockGuard { hw, was_enabled }
}

/// RAII guard for a critical section with `mstatus.MIE` cleared. Created by
/// [`lock`] or [`Board::lock_irq`](crate::Board::lock_irq).
#[must_use = "interrupts are unmasked as soon as the guard is dropped"]
pub struct IrqLockGuard<'a, H: Hardware + ?Sized> {
    hw: &'a H,
    was_enabled: bool,
}

impl<H: Hardware + ?Sized> IrqLockGuard<'_, H> {
    /// Get a flag indicating whether this guard will unmask interrupts when
    /// dropped.
    #[inline]
    pub fn is_outermost(&self) -> bool {
        self.was_enabled
    }
}

impl<H: Hardware + ?Sized> Drop for IrqLockGuard<'_, H> {
    #[inline]
    fn drop(&mut self) {
        if self.was_enabled {
            self.hw.set_mstatus_mie();
        }
    }
}

impl<H: Hardware + ?Sized> fmt::Debug for IrqLockGuard<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("IrqLockGuard")
            .field("was_enabled", &self.was_enabled)
            .finish()
    }
}
