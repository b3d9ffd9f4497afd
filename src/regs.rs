//! AT86RF2xx register map and bit masks.
//!
//! Only the registers the driver actually touches are listed; the full map
//! lives in the chip datasheet (AT86RF231/233, section 7).

#![allow(dead_code)]

/// Registers addressable over the bus.
#[cfg_attr(feature = "std", derive(Debug))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Reg {
    TrxStatus = 0x01,
    TrxState = 0x02,
    TrxCtrl0 = 0x03,
    TrxCtrl1 = 0x04,
    PhyTxPwr = 0x05,
    PhyRssi = 0x06,
    PhyEdLevel = 0x07,
    PhyCcCca = 0x08,
    TrxCtrl2 = 0x0C,
    IrqMask = 0x0E,
    IrqStatus = 0x0F,
    XoscCtrl = 0x12,
}

/// State-change commands written to `TRX_STATE`.
#[cfg_attr(feature = "std", derive(Debug))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TrxCmd {
    Nop = 0x00,
    TxStart = 0x02,
    ForceTrxOff = 0x03,
    ForcePllOn = 0x04,
    RxOn = 0x06,
    TrxOff = 0x08,
    PllOn = 0x09,
}

// TRX_STATUS
/// Low five bits of `TRX_STATUS` hold the chip state.
pub const TRX_STATUS_MASK: u8 = 0x1F;
/// Chip state: frequency synthesizer locked, ready to transmit or receive.
pub const TRX_STATUS_PLL_ON: u8 = 0x09;
/// Set once a requested clear-channel assessment has finished.
pub const TRX_STATUS_CCA_DONE: u8 = 0x80;
/// CCA verdict: set when the channel was assessed idle.
pub const TRX_STATUS_CCA_STATUS: u8 = 0x40;

// PHY_CC_CCA
/// Writing this bit starts a clear-channel assessment.
pub const PHY_CC_CCA_REQUEST: u8 = 0x80;
/// Channel number field.
pub const PHY_CC_CCA_CHANNEL_MASK: u8 = 0x1F;
/// CCA mode field position.
pub const PHY_CC_CCA_MODE_SHIFT: u8 = 5;

// PHY_RSSI
/// Set when the FCS of the last received frame was valid.
pub const PHY_RSSI_RX_CRC_VALID: u8 = 0x80;

// TRX_CTRL_0, reset defaults with the CLKM clock output disabled.
pub const TRX_CTRL_0_PAD_IO_CLKM_2MA: u8 = 0x10;
pub const TRX_CTRL_0_CLKM_SHA_SEL: u8 = 0x08;
pub const TRX_CTRL_0_CLKM_OFF: u8 = 0x00;

// TRX_CTRL_1
/// Route TX/RX indication to the DIG3/DIG4 pins for an external PA.
pub const TRX_CTRL_1_PA_EXT_EN: u8 = 0x80;

// TRX_CTRL_2
/// Dynamic frame buffer protection: keep a received frame until read out.
pub const TRX_CTRL_2_RX_SAFE_MODE: u8 = 0x80;

// XOSC_CTRL
/// Internal oscillator with external crystal, the board default.
pub const XOSC_CTRL_XTAL_MODE_CRYSTAL: u8 = 0xF0;

// IRQ_MASK / IRQ_STATUS bits
/// A frame preamble was detected while in receive mode.
pub const IRQ_RX_START: u8 = 0x04;
/// A frame transfer (either direction) completed.
pub const IRQ_TRX_END: u8 = 0x08;

/// One read of the `IRQ_STATUS` latch. Reading the register clears it on
/// the chip, so a value is consumed by at most one handler invocation.
#[cfg_attr(feature = "std", derive(Debug))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct IrqStatus(pub u8);

impl IrqStatus {
    pub fn rx_start(&self) -> bool {
        self.0 & IRQ_RX_START != 0
    }

    pub fn trx_end(&self) -> bool {
        self.0 & IRQ_TRX_END != 0
    }
}
