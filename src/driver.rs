//! The driver core: mode control, transmit/receive paths, carrier sense
//! and the interrupt entry point.
//!
//! Concurrency model: caller threads invoke the public operations, which
//! mutate the state machine under `critical_section` and may busy-wait on
//! transitions driven by [`Rf2xx::handle_interrupt`]. The interrupt entry
//! point only advances the state machine and reports whether the worker
//! should run; it never copies frame payload. [`Rf2xx::rx_worker`] does the
//! actual FIFO drain and hands the frame to the upper layer. No critical
//! section is held across a busy-wait.

use core::cell::RefCell;
use core::hint;
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::Mutex;
use heapless::Vec;

use crate::bus::RadioBus;
use crate::{debug, error, info, warn};
use crate::config::{RadioConfig, FCS_LEN, MAX_PAYLOAD};
use crate::regs::{
    IrqStatus, Reg, TrxCmd, IRQ_RX_START, IRQ_TRX_END, PHY_CC_CCA_REQUEST, PHY_RSSI_RX_CRC_VALID,
    TRX_CTRL_0_CLKM_OFF, TRX_CTRL_0_CLKM_SHA_SEL, TRX_CTRL_0_PAD_IO_CLKM_2MA,
    TRX_CTRL_1_PA_EXT_EN, TRX_CTRL_2_RX_SAFE_MODE, TRX_STATUS_CCA_DONE, TRX_STATUS_CCA_STATUS,
    TRX_STATUS_MASK, TRX_STATUS_PLL_ON, XOSC_CTRL_XTAL_MODE_CRYSTAL,
};
use crate::state::{advance, RadioState, StateCell};
use crate::time::Monotonic;

#[cfg_attr(feature = "std", derive(Debug))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The payload handed to `prepare` exceeds [`MAX_PAYLOAD`].
    PayloadTooLarge,
    /// `transmit` was called with a length other than the prepared one.
    LengthMismatch,
    /// Another transmission or reception is in progress; retry or drop.
    Collision,
    /// The chip never reported PLL lock before the transmit deadline.
    TxTimeout,
    /// The transmission started but the transfer-end event never came.
    TxFailed,
}

/// The upper layer's frame input. Called exactly once per successfully
/// drained frame; the frame slice is only valid for the duration of the
/// call.
pub trait UpperLayer {
    fn frame_input(&mut self, frame: &[u8]);
}

/// Driver for an AT86RF2xx transceiver behind a [`RadioBus`].
///
/// All operations take `&self`; the driver is meant to be shared between
/// the host's interrupt handler, a worker task and caller threads. Wire
/// the chip interrupt to [`Self::handle_interrupt`] and schedule a task
/// running [`Self::rx_worker`] whenever it returns `true`.
pub struct Rf2xx<B, M> {
    bus: Mutex<RefCell<B>>,
    clock: M,
    config: RadioConfig,
    state: StateCell,
    /// The logical on/off intent, independent of what the chip is doing
    /// right now. The state machine converges to Listening while set and
    /// to Idle while clear.
    enabled: AtomicBool,
    tx: Mutex<RefCell<Vec<u8, MAX_PAYLOAD>>>,
}

/// Puts the radio back to its on/off baseline on every exit path of the
/// enclosing operation.
struct RestartGuard<'a, B: RadioBus, M: Monotonic>(&'a Rf2xx<B, M>);

impl<B: RadioBus, M: Monotonic> Drop for RestartGuard<'_, B, M> {
    fn drop(&mut self) {
        self.0.restart();
    }
}

impl<B, M> Rf2xx<B, M>
where
    B: RadioBus,
    M: Monotonic,
{
    pub fn new(bus: B, clock: M, config: RadioConfig) -> Self {
        Self {
            bus: Mutex::new(RefCell::new(bus)),
            clock,
            config,
            state: StateCell::new(RadioState::Idle),
            enabled: AtomicBool::new(false),
            tx: Mutex::new(RefCell::new(Vec::new())),
        }
    }

    /// Access the bus with interrupts excluded. The chip interrupt handler
    /// shares the bus, so every access must exclude it.
    fn with_bus<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
        critical_section::with(|cs| f(&mut *self.bus.borrow_ref_mut(cs)))
    }

    /// Reset the chip and assert the configuration registers. Must not be
    /// called while a transfer is pending.
    fn reset_chip(&self) {
        self.with_bus(|bus| {
            bus.fifo_access_cancel();
            bus.irq_disable();
            if bus.has_dig2() {
                bus.dig2_disable();
            }
            bus.slp_tr_clear();
            bus.chip_reset();

            // Dynamic frame buffer protection, standard data rate.
            bus.reg_write(Reg::TrxCtrl2, TRX_CTRL_2_RX_SAFE_MODE);
            bus.reg_write(Reg::PhyTxPwr, u8::from(self.config.tx_power));
            // CLKM output disabled.
            bus.reg_write(
                Reg::TrxCtrl0,
                TRX_CTRL_0_PAD_IO_CLKM_2MA | TRX_CTRL_0_CLKM_SHA_SEL | TRX_CTRL_0_CLKM_OFF,
            );
            bus.reg_write(
                Reg::XoscCtrl,
                XOSC_CTRL_XTAL_MODE_CRYSTAL | (self.config.xtal_trim & 0x0F),
            );
            bus.reg_write(Reg::PhyCcCca, self.config.phy_cc_cca());
            bus.reg_write(Reg::IrqMask, IRQ_TRX_END | IRQ_RX_START);
        });
    }

    /// Quiesce the chip: interrupts masked, transfers cancelled, trigger
    /// line released, forced to the PLL-locked idle state.
    fn idle(&self) {
        self.with_bus(|bus| {
            bus.irq_disable();
            bus.fifo_access_cancel();
            bus.slp_tr_clear();
            bus.trx_command(TrxCmd::ForcePllOn);
            if bus.has_pa() {
                bus.pa_disable();
                let reg = bus.reg_read(Reg::TrxCtrl1);
                bus.reg_write(Reg::TrxCtrl1, reg & !TRX_CTRL_1_PA_EXT_EN);
            }
        });
    }

    /// Arm the receiver. The state update and the RX_ON command happen in
    /// one critical section, so the handler can never observe an armed
    /// chip with a stale state.
    fn listen(&self) {
        critical_section::with(|cs| {
            let mut bus = self.bus.borrow_ref_mut(cs);
            bus.reg_read(Reg::IrqStatus); // clear the latch
            if bus.has_pa() {
                bus.pa_enable();
                let reg = bus.reg_read(Reg::TrxCtrl1);
                bus.reg_write(Reg::TrxCtrl1, reg | TRX_CTRL_1_PA_EXT_EN);
            }
            bus.irq_enable();
            self.state.set(cs, RadioState::Listening);
            bus.trx_command(TrxCmd::RxOn);
        });
    }

    /// Return to the baseline implied by the on/off intent.
    fn restart(&self) {
        self.idle();
        if self.enabled.load(Ordering::Acquire) {
            self.listen();
        } else {
            critical_section::with(|cs| self.state.set(cs, RadioState::Idle));
        }
    }

    /// Initialize the driver and quiesce the chip.
    pub fn init(&self) -> bool {
        info!("rf2xx init (channel {})", u8::from(self.config.channel));

        self.enabled.store(false, Ordering::Release);
        critical_section::with(|cs| {
            self.tx.borrow_ref_mut(cs).clear();
            self.state.set(cs, RadioState::Idle);
        });

        self.reset_chip();
        self.idle();
        true
    }

    /// Turn the radio on. Idempotent; arming the receiver happens outside
    /// the critical section, with a `Busy` marker blocking concurrent
    /// transitions until it completes.
    pub fn on(&self) -> bool {
        debug!("rf2xx on");

        let arm = critical_section::with(|cs| {
            if self.enabled.load(Ordering::Acquire) {
                return false;
            }
            self.enabled.store(true, Ordering::Release);
            if self.state.get() == RadioState::Idle {
                self.state.set(cs, RadioState::Busy);
                true
            } else {
                false
            }
        });

        if arm {
            self.listen();
        }
        true
    }

    /// Turn the radio off. An in-flight operation is not interrupted; it
    /// observes the cleared intent when it restarts to baseline.
    pub fn off(&self) -> bool {
        debug!("rf2xx off");

        let quiesce = critical_section::with(|cs| {
            if !self.enabled.load(Ordering::Acquire) {
                return false;
            }
            self.enabled.store(false, Ordering::Release);
            if self.state.get() == RadioState::Listening {
                self.state.set(cs, RadioState::Busy);
                true
            } else {
                false
            }
        });

        if quiesce {
            self.idle();
            critical_section::with(|cs| self.state.set(cs, RadioState::Idle));
        }
        true
    }

    /// Stage a payload for transmission. On failure the staged length is
    /// reset to zero.
    pub fn prepare(&self, payload: &[u8]) -> Result<(), Error> {
        debug!("rf2xx prepare {}", payload.len());

        critical_section::with(|cs| {
            let mut tx = self.tx.borrow_ref_mut(cs);
            tx.clear();
            tx.extend_from_slice(payload).map_err(|()| {
                error!("payload is too big ({})", payload.len());
                Error::PayloadTooLarge
            })
        })
    }

    /// Transmit the prepared payload and block until the chip confirms
    /// the transfer or a deadline passes. Every exit after the state claim
    /// returns the chip to its on/off baseline.
    pub fn transmit(&self, len: usize) -> Result<(), Error> {
        info!("rf2xx transmit {}", len);

        let staged = critical_section::with(|cs| self.tx.borrow_ref(cs).len());
        if staged != len {
            error!("length has changed (was {} now {})", staged, len);
            return Err(Error::LengthMismatch);
        }

        // Claim the chip. The critical section ensures no reception can
        // start between the check and the state change.
        let was_listening = critical_section::with(|cs| match self.state.get() {
            RadioState::Listening => {
                self.state.set(cs, RadioState::Transmitting);
                Ok(true)
            }
            RadioState::Idle => {
                self.state.set(cs, RadioState::Transmitting);
                Ok(false)
            }
            _ => Err(Error::Collision),
        })?;

        if was_listening {
            // Silence the receiver before driving the transmit sequence.
            self.idle();
        }

        let _restart = RestartGuard(self);

        self.with_bus(|bus| {
            bus.reg_read(Reg::IrqStatus); // clear the latch
            if bus.has_pa() {
                bus.pa_enable();
                let reg = bus.reg_read(Reg::TrxCtrl1);
                bus.reg_write(Reg::TrxCtrl1, reg | TRX_CTRL_1_PA_EXT_EN);
            }
        });

        // Wait for PLL lock.
        let deadline = self.clock.now() + self.config.tx_ready_timeout;
        loop {
            let status = self.with_bus(|bus| bus.reg_read(Reg::TrxStatus)) & TRX_STATUS_MASK;
            if status == TRX_STATUS_PLL_ON {
                break;
            }
            if self.clock.now() > deadline {
                error!("failed to enter tx");
                return Err(Error::TxTimeout);
            }
            hint::spin_loop();
        }

        // Stage the frame and pull the trigger line.
        critical_section::with(|cs| {
            let mut bus = self.bus.borrow_ref_mut(cs);
            bus.irq_enable();
            let tx = self.tx.borrow_ref(cs);
            bus.fifo_write_first(tx.len() as u8 + FCS_LEN);
            bus.fifo_write_remaining(tx.as_slice());
            bus.slp_tr_set();
        });

        // Wait until the handler moves the state off Transmitting.
        let deadline = self.clock.now() + self.config.tx_done_timeout;
        while self.state.get() == RadioState::Transmitting {
            if self.clock.now() > deadline {
                error!("transmission did not complete");
                return Err(Error::TxFailed);
            }
            hint::spin_loop();
        }

        if self.state.get() == RadioState::TransmitDone {
            Ok(())
        } else {
            Err(Error::TxFailed)
        }
    }

    /// Prepare and transmit in one call.
    pub fn send(&self, payload: &[u8]) -> Result<(), Error> {
        debug!("rf2xx send {}", payload.len());
        self.prepare(payload)?;
        self.transmit(payload.len())
    }

    /// Non-blocking poll for a completed reception. Returns the number of
    /// bytes copied into `buf`, 0 when nothing is pending or the frame was
    /// dropped.
    pub fn read(&self, buf: &mut [u8]) -> usize {
        debug!("rf2xx read {}", buf.len());

        if !self.claim_pending_frame() {
            return 0;
        }

        let _restart = RestartGuard(self);
        self.drain(buf)
    }

    /// Worker task body. Drains a completed reception into a driver-side
    /// buffer and forwards it upward. Tolerates being woken with nothing
    /// to do; a concurrent `read` may have drained the frame already.
    pub fn rx_worker<U: UpperLayer>(&self, upper: &mut U) {
        if !self.claim_pending_frame() {
            return;
        }

        let mut frame = [0u8; MAX_PAYLOAD];
        let len = {
            let _restart = RestartGuard(self);
            self.drain(&mut frame)
        };

        if len > 0 {
            upper.frame_input(&frame[..len]);
        }
    }

    /// Move ReceiveDone to ReceiveReading, claiming the pending frame for
    /// the calling context.
    fn claim_pending_frame(&self) -> bool {
        critical_section::with(|cs| {
            if self.state.get() != RadioState::ReceiveDone {
                return false;
            }
            self.state.set(cs, RadioState::ReceiveReading);
            true
        })
    }

    /// Copy the received frame out of the FIFO. Frames with a bad FCS or
    /// larger than `buf` are dropped and reported as length 0; dropped
    /// frames are expected on a lossy channel and never surface as errors.
    fn drain(&self, buf: &mut [u8]) -> usize {
        let rssi = self.with_bus(|bus| bus.reg_read(Reg::PhyRssi));
        if rssi & PHY_RSSI_RX_CRC_VALID == 0 {
            warn!("received frame with bad crc");
            return 0;
        }

        let len = self
            .with_bus(|bus| bus.fifo_read_first())
            .saturating_sub(FCS_LEN) as usize;
        info!("received frame of length {}", len);

        if len > buf.len() {
            warn!("received frame is too big ({})", len);
            // Zero-length drain ends the transfer without leaving stale
            // data in the device.
            self.with_bus(|bus| bus.fifo_read_remaining(&mut []));
            return 0;
        }

        self.with_bus(|bus| bus.fifo_read_remaining(&mut buf[..len]));
        len
    }

    /// Clear-channel assessment. Only meaningful while listening; while
    /// receiving the channel is busy by definition, and in any other state
    /// no assessment is possible and the channel is conservatively
    /// reported clear.
    pub fn channel_clear(&self) -> bool {
        debug!("rf2xx channel clear");

        match self.state.get() {
            RadioState::Listening => {
                self.with_bus(|bus| {
                    bus.reg_write(
                        Reg::PhyCcCca,
                        self.config.phy_cc_cca() | PHY_CC_CCA_REQUEST,
                    );
                });

                // The chip bounds the assessment itself; the poll also
                // ends when an incoming frame moves us out of Listening.
                let mut status;
                loop {
                    status = self.with_bus(|bus| bus.reg_read(Reg::TrxStatus));
                    if self.state.get() != RadioState::Listening
                        || status & TRX_STATUS_CCA_DONE != 0
                    {
                        break;
                    }
                    hint::spin_loop();
                }

                status & TRX_STATUS_CCA_STATUS != 0
            }
            RadioState::Receiving => false,
            _ => true,
        }
    }

    /// Whether a reception is in progress right now. Lock-free fast path.
    pub fn receiving_packet(&self) -> bool {
        self.state.get() == RadioState::Receiving
    }

    /// Whether a completed frame is waiting to be drained. Lock-free fast
    /// path.
    pub fn pending_packet(&self) -> bool {
        self.state.get() == RadioState::ReceiveDone
    }

    /// Interrupt entry point. Reads the IRQ latch once (the read clears
    /// it) and advances the state machine. Returns whether the worker
    /// task should be scheduled. Never copies payload.
    pub fn handle_interrupt(&self) -> bool {
        critical_section::with(|cs| {
            let current = self.state.get();
            match current {
                RadioState::Transmitting | RadioState::Listening | RadioState::Receiving => {}
                _ => {
                    // Can happen while transitioning from listen to idle.
                    warn!("unexpected interrupt while state {}", current as u8);
                    return false;
                }
            }

            let mut bus = self.bus.borrow_ref_mut(cs);
            let irq = IrqStatus(bus.reg_read(Reg::IrqStatus));
            let Some(transition) = advance(current, irq) else {
                return false;
            };

            self.state.set(cs, transition.next);
            if transition.disarm_receiver {
                bus.trx_command(TrxCmd::PllOn);
            }
            transition.wake_worker
        })
    }
}
