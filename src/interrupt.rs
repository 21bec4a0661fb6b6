//! Interrupt-to-poll bridge.
//!
//! The AXP202 IRQ pin is open-drain and pulled low while any enabled status bit is set.
//! The host attaches a falling-edge handler that calls [`InterruptFlag::signal`]; the
//! controller consumes the flag from its cooperative `service()` tick.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::registers::{IRQ_ENABLE_MASKS, IRQ_STATUS_COUNT, Irq1Bits, Irq2Bits, Irq3Bits};

/// Single-word flag shared between the interrupt handler and the poll loop.
///
/// The handler only ever stores `true`; the poll loop only ever stores `false`. Neither
/// side needs atomic read-modify-write, so the flag works on cores without CAS
/// (Cortex-M0+). The poll loop clears the flag before it reads the IC's status, so an
/// edge that lands while it is busy leaves the flag set for the next tick.
#[derive(Debug)]
pub struct InterruptFlag {
    pending: AtomicBool,
}

impl InterruptFlag {
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
        }
    }

    /// Called from the falling-edge interrupt handler.
    #[inline]
    pub fn signal(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Peek without consuming.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Consume a pending interrupt. Must run before the status registers are read.
    pub fn take(&self) -> bool {
        if !self.pending.load(Ordering::Acquire) {
            return false;
        }
        self.pending.store(false, Ordering::Release);
        true
    }
}

impl Default for InterruptFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// What a set of IRQ status groups asks the controller to refresh.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PendingEvents {
    /// VBUS inserted or removed.
    pub usb_changed: bool,
    /// Charge state needs a recheck.
    pub charging_changed: bool,
    /// Power key short or long press.
    pub button_pressed: bool,
}

impl PendingEvents {
    /// Decode IRQ_STATUS1..3, read in address order.
    ///
    /// A VBUS transition forces a charge recheck: plugging or unplugging can change the
    /// charger decision without IRQ2 reporting it in the same pass.
    pub fn from_status(status: [u8; 3]) -> Self {
        let [irq1, irq2, irq3] = status;
        let usb_changed = Irq1Bits::from_bits_truncate(irq1).intersects(Irq1Bits::VBUS_EVENTS);
        let charge_event = Irq2Bits::from_bits_truncate(irq2).intersects(Irq2Bits::CHARGE_EVENTS);
        let button_pressed = Irq3Bits::from_bits_truncate(irq3).intersects(Irq3Bits::PEK_EVENTS);
        Self {
            usb_changed,
            charging_changed: charge_event || usb_changed,
            button_pressed,
        }
    }
}

/// Write-1-to-clear pattern for IRQ_STATUS1..5 after servicing `status`.
///
/// Clears what was read plus every source outside the enable masks in groups 1..3, and all
/// of groups 4 and 5. An enabled bit that latched after the status read stays set.
pub fn acknowledge(status: [u8; 3]) -> [u8; IRQ_STATUS_COUNT] {
    let mut ack = [0xFF; IRQ_STATUS_COUNT];
    for ((slot, read), mask) in ack.iter_mut().zip(status).zip(IRQ_ENABLE_MASKS) {
        *slot = read | !mask;
    }
    ack
}
