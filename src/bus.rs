//! Register/FIFO access abstraction.
//!
//! The synchronous bus layer (SPI transactions, IRQ line, SLP_TR pin, the
//! optional external power amplifier) is platform glue and lives outside
//! this crate. The driver only requires this trait; every call is made with
//! interrupts excluded, so implementations do not need their own locking.

use crate::regs::{Reg, TrxCmd};

pub trait RadioBus {
    /// Read a register. Reading `IRQ_STATUS` clears the hardware latch.
    fn reg_read(&mut self, reg: Reg) -> u8;

    /// Write a register.
    fn reg_write(&mut self, reg: Reg, value: u8);

    /// Read the PHR length byte of the frame in the receive FIFO.
    fn fifo_read_first(&mut self) -> u8;

    /// Read `buf.len()` payload bytes following a `fifo_read_first`. A
    /// zero-length read ends the FIFO transaction without copying.
    fn fifo_read_remaining(&mut self, buf: &mut [u8]);

    /// Write the PHR length byte of an outgoing frame.
    fn fifo_write_first(&mut self, len: u8);

    /// Write the payload following a `fifo_write_first`. May complete
    /// asynchronously on the bus; the chip paces the over-the-air bits.
    fn fifo_write_remaining(&mut self, payload: &[u8]);

    /// Abort any in-flight FIFO transaction.
    fn fifo_access_cancel(&mut self);

    /// Hardware reset of the chip.
    fn chip_reset(&mut self);

    /// Issue a state-change command.
    fn trx_command(&mut self, cmd: TrxCmd) {
        self.reg_write(Reg::TrxState, cmd as u8);
    }

    /// Unmask the chip interrupt line towards the host.
    fn irq_enable(&mut self);

    /// Mask the chip interrupt line.
    fn irq_disable(&mut self);

    /// Assert the SLP_TR trigger line, starting a staged transmission.
    fn slp_tr_set(&mut self);

    /// Release the SLP_TR trigger line.
    fn slp_tr_clear(&mut self);

    /// Whether the board has an external power amplifier on DIG3/DIG4.
    fn has_pa(&self) -> bool;

    /// Power the external amplifier up.
    fn pa_enable(&mut self);

    /// Power the external amplifier down.
    fn pa_disable(&mut self);

    /// Whether the board routes the RX timestamp to the DIG2 pin.
    fn has_dig2(&self) -> bool;

    /// Disable the DIG2 timestamp output.
    fn dig2_disable(&mut self);
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::FCS_LEN;
    use crate::regs::{PHY_RSSI_RX_CRC_VALID, TRX_STATUS_PLL_ON};

    use std::sync::{Arc, Mutex};
    use std::vec::Vec;

    /// Everything the fake chip did, in call order.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum BusEvent {
        RegWrite(Reg, u8),
        TrxCommand(TrxCmd),
        FifoWriteFirst(u8),
        FifoWrite(Vec<u8>),
        FifoReadRemaining(usize),
        FifoCancel,
        ChipReset,
        IrqEnable,
        IrqDisable,
        SlpTrSet,
        SlpTrClear,
        PaEnable,
        PaDisable,
        Dig2Disable,
    }

    pub struct TestBusInner {
        pub regs: [u8; 0x40],
        /// Pending IRQ_STATUS latch, cleared by reading it.
        pub irq_status: u8,
        /// Value returned for TRX_STATUS reads.
        pub trx_status: u8,
        /// Frame waiting in the receive FIFO: PHR length byte + payload.
        pub rx_len_byte: u8,
        pub rx_payload: Vec<u8>,
        pub crc_ok: bool,
        pub has_pa: bool,
        pub has_dig2: bool,
        pub events: Vec<BusEvent>,
    }

    impl Default for TestBusInner {
        fn default() -> Self {
            Self {
                regs: [0; 0x40],
                irq_status: 0,
                trx_status: TRX_STATUS_PLL_ON,
                rx_len_byte: 0,
                rx_payload: Vec::new(),
                crc_ok: true,
                has_pa: false,
                has_dig2: false,
                events: Vec::new(),
            }
        }
    }

    /// Shared-handle fake bus: the driver owns one clone, the test keeps
    /// another to inject interrupts and inspect the event log.
    #[derive(Clone, Default)]
    pub struct TestBus {
        inner: Arc<Mutex<TestBusInner>>,
    }

    impl TestBus {
        pub fn inner<R>(&self, f: impl FnOnce(&mut TestBusInner) -> R) -> R {
            f(&mut self.inner.lock().unwrap())
        }

        /// Stage a received frame in the FIFO with a valid FCS.
        pub fn push_frame(&self, payload: &[u8]) {
            self.inner(|i| {
                i.rx_len_byte = payload.len() as u8 + FCS_LEN;
                i.rx_payload = payload.to_vec();
                i.crc_ok = true;
            });
        }

        /// Latch interrupt bits as the chip would.
        pub fn raise_irq(&self, bits: u8) {
            self.inner(|i| i.irq_status |= bits);
        }

        pub fn events(&self) -> Vec<BusEvent> {
            self.inner(|i| i.events.clone())
        }

        pub fn has_event(&self, event: &BusEvent) -> bool {
            self.inner(|i| i.events.contains(event))
        }

        pub fn clear_events(&self) {
            self.inner(|i| i.events.clear());
        }
    }

    impl RadioBus for TestBus {
        fn reg_read(&mut self, reg: Reg) -> u8 {
            self.inner(|i| match reg {
                Reg::IrqStatus => {
                    let latch = i.irq_status;
                    i.irq_status = 0;
                    latch
                }
                Reg::TrxStatus => i.trx_status,
                Reg::PhyRssi => {
                    if i.crc_ok {
                        PHY_RSSI_RX_CRC_VALID
                    } else {
                        0
                    }
                }
                _ => i.regs[reg as usize],
            })
        }

        fn reg_write(&mut self, reg: Reg, value: u8) {
            self.inner(|i| {
                i.regs[reg as usize] = value;
                i.events.push(BusEvent::RegWrite(reg, value));
            });
        }

        fn fifo_read_first(&mut self) -> u8 {
            self.inner(|i| i.rx_len_byte)
        }

        fn fifo_read_remaining(&mut self, buf: &mut [u8]) {
            self.inner(|i| {
                i.events.push(BusEvent::FifoReadRemaining(buf.len()));
                let n = buf.len().min(i.rx_payload.len());
                buf[..n].copy_from_slice(&i.rx_payload[..n]);
            });
        }

        fn fifo_write_first(&mut self, len: u8) {
            self.inner(|i| i.events.push(BusEvent::FifoWriteFirst(len)));
        }

        fn fifo_write_remaining(&mut self, payload: &[u8]) {
            self.inner(|i| i.events.push(BusEvent::FifoWrite(payload.to_vec())));
        }

        fn fifo_access_cancel(&mut self) {
            self.inner(|i| i.events.push(BusEvent::FifoCancel));
        }

        fn chip_reset(&mut self) {
            self.inner(|i| i.events.push(BusEvent::ChipReset));
        }

        fn trx_command(&mut self, cmd: TrxCmd) {
            self.inner(|i| i.events.push(BusEvent::TrxCommand(cmd)));
        }

        fn irq_enable(&mut self) {
            self.inner(|i| i.events.push(BusEvent::IrqEnable));
        }

        fn irq_disable(&mut self) {
            self.inner(|i| i.events.push(BusEvent::IrqDisable));
        }

        fn slp_tr_set(&mut self) {
            self.inner(|i| i.events.push(BusEvent::SlpTrSet));
        }

        fn slp_tr_clear(&mut self) {
            self.inner(|i| i.events.push(BusEvent::SlpTrClear));
        }

        fn has_pa(&self) -> bool {
            self.inner(|i| i.has_pa)
        }

        fn pa_enable(&mut self) {
            self.inner(|i| i.events.push(BusEvent::PaEnable));
        }

        fn pa_disable(&mut self) {
            self.inner(|i| i.events.push(BusEvent::PaDisable));
        }

        fn has_dig2(&self) -> bool {
            self.inner(|i| i.has_dig2)
        }

        fn dig2_disable(&mut self) {
            self.inner(|i| i.events.push(BusEvent::Dig2Disable));
        }
    }
}
