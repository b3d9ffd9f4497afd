//! The shared radio state machine.
//!
//! Exactly one [`StateCell`] exists per driver; it is the single source of
//! truth for what the chip is doing. Reads are lock-free single-word loads
//! (used for fast "packet pending" style checks and for busy-wait loops);
//! every write requires a [`CriticalSection`] token, so a state transition
//! is atomic with the chip command issued next to it.

use core::sync::atomic::{AtomicU8, Ordering};

use critical_section::CriticalSection;

use crate::regs::IrqStatus;

#[cfg_attr(feature = "std", derive(Debug))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RadioState {
    /// Radio quiesced, interrupts masked.
    Idle = 0,
    /// A mode change is in progress; blocks concurrent transitions.
    Busy = 1,
    /// A transmission is on the air.
    Transmitting = 2,
    /// The transfer-end interrupt confirmed the transmission.
    TransmitDone = 3,
    /// Receiver armed, waiting for a frame.
    Listening = 4,
    /// A frame preamble was detected, reception ongoing.
    Receiving = 5,
    /// A complete frame sits in the FIFO, waiting to be drained.
    ReceiveDone = 6,
    /// A caller or the worker is draining the FIFO.
    ReceiveReading = 7,
}

impl RadioState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => RadioState::Idle,
            1 => RadioState::Busy,
            2 => RadioState::Transmitting,
            3 => RadioState::TransmitDone,
            4 => RadioState::Listening,
            5 => RadioState::Receiving,
            6 => RadioState::ReceiveDone,
            // The raw value only ever comes from `StateCell::set`.
            _ => RadioState::ReceiveReading,
        }
    }
}

/// The atomically accessed state word shared between interrupt and task
/// context.
pub struct StateCell {
    raw: AtomicU8,
}

impl StateCell {
    pub const fn new(initial: RadioState) -> Self {
        Self {
            raw: AtomicU8::new(initial as u8),
        }
    }

    /// Lock-free read, callable from any context.
    pub fn get(&self) -> RadioState {
        RadioState::from_raw(self.raw.load(Ordering::Acquire))
    }

    /// Write the state. Requiring the critical-section token keeps every
    /// transition inside a region that excludes interrupt delivery.
    pub fn set(&self, _cs: CriticalSection<'_>, state: RadioState) {
        self.raw.store(state as u8, Ordering::Release);
    }
}

/// What the interrupt handler must do after a latch read.
#[cfg_attr(feature = "std", derive(Debug))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct IrqTransition {
    pub next: RadioState,
    /// Command the chip out of receive-armed mode so it cannot start a
    /// second reception before the frame is drained.
    pub disarm_receiver: bool,
    /// Schedule the worker task to drain the FIFO.
    pub wake_worker: bool,
}

impl IrqTransition {
    fn to(next: RadioState) -> Self {
        Self {
            next,
            disarm_receiver: false,
            wake_worker: false,
        }
    }

    fn frame_received() -> Self {
        Self {
            next: RadioState::ReceiveDone,
            disarm_receiver: true,
            wake_worker: true,
        }
    }
}

/// The interrupt state transition, as a pure function from (current state,
/// latch bits) to what should happen. Called identically from the real
/// handler and from simulated interrupts in tests.
///
/// `None` means the event does not apply to the current state (a stale or
/// late interrupt); the handler ignores it.
pub fn advance(current: RadioState, irq: IrqStatus) -> Option<IrqTransition> {
    let mut state = current;

    // A frame preamble was detected while listening.
    if irq.rx_start() && state == RadioState::Listening {
        state = RadioState::Receiving;
    }

    // A transfer finished, in either direction. RX_START and TRX_END may
    // arrive in the same latch read for a short frame.
    if irq.trx_end() {
        match state {
            RadioState::Transmitting => return Some(IrqTransition::to(RadioState::TransmitDone)),
            RadioState::Receiving | RadioState::Listening => {
                return Some(IrqTransition::frame_received())
            }
            _ => {}
        }
    }

    if state != current {
        return Some(IrqTransition::to(state));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regs::{IRQ_RX_START, IRQ_TRX_END};

    #[test]
    fn state_cell_round_trip() {
        let cell = StateCell::new(RadioState::Idle);
        assert_eq!(cell.get(), RadioState::Idle);
        critical_section::with(|cs| cell.set(cs, RadioState::ReceiveReading));
        assert_eq!(cell.get(), RadioState::ReceiveReading);
    }

    #[test]
    fn rx_start_only_applies_while_listening() {
        let irq = IrqStatus(IRQ_RX_START);

        let t = advance(RadioState::Listening, irq).unwrap();
        assert_eq!(t.next, RadioState::Receiving);
        assert!(!t.disarm_receiver);
        assert!(!t.wake_worker);

        assert_eq!(advance(RadioState::Transmitting, irq), None);
        assert_eq!(advance(RadioState::Receiving, irq), None);
    }

    #[test]
    fn trx_end_finishes_transmission() {
        let t = advance(RadioState::Transmitting, IrqStatus(IRQ_TRX_END)).unwrap();
        assert_eq!(t.next, RadioState::TransmitDone);
        assert!(!t.disarm_receiver);
        assert!(!t.wake_worker);
    }

    #[test]
    fn trx_end_finishes_reception_and_wakes_worker() {
        for from in [RadioState::Receiving, RadioState::Listening] {
            let t = advance(from, IrqStatus(IRQ_TRX_END)).unwrap();
            assert_eq!(t.next, RadioState::ReceiveDone);
            assert!(t.disarm_receiver);
            assert!(t.wake_worker);
        }
    }

    #[test]
    fn combined_latch_read_completes_reception() {
        // A short frame can deliver RX_START and TRX_END in one read.
        let t = advance(RadioState::Listening, IrqStatus(IRQ_RX_START | IRQ_TRX_END)).unwrap();
        assert_eq!(t.next, RadioState::ReceiveDone);
        assert!(t.wake_worker);
    }

    #[test]
    fn empty_latch_is_ignored() {
        for state in [
            RadioState::Transmitting,
            RadioState::Listening,
            RadioState::Receiving,
        ] {
            assert_eq!(advance(state, IrqStatus(0)), None);
        }
    }

    #[test]
    fn stale_events_are_ignored() {
        let irq = IrqStatus(IRQ_RX_START | IRQ_TRX_END);
        for state in [
            RadioState::Idle,
            RadioState::Busy,
            RadioState::TransmitDone,
            RadioState::ReceiveDone,
            RadioState::ReceiveReading,
        ] {
            assert_eq!(advance(state, irq), None);
        }
    }
}
