//! Build-time radio configuration.

use crate::time::Duration;

/// Maximum payload handed to [`prepare`](crate::Rf2xx::prepare), in octets.
/// The PHY frame adds the [`FCS_LEN`] trailer on top of this.
pub const MAX_PAYLOAD: usize = 125;

/// Frame trailer appended by the chip (the 16-bit FCS). Excluded from the
/// payload length reported to callers.
pub const FCS_LEN: u8 = 2;

/// IEEE 802.15.4 channels
#[cfg_attr(feature = "std", derive(Debug))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// 2_405 MHz
    _11,
    /// 2_410 MHz
    _12,
    /// 2_415 MHz
    _13,
    /// 2_420 MHz
    _14,
    /// 2_425 MHz
    _15,
    /// 2_430 MHz
    _16,
    /// 2_435 MHz
    _17,
    /// 2_440 MHz
    _18,
    /// 2_445 MHz
    _19,
    /// 2_450 MHz
    _20,
    /// 2_455 MHz
    _21,
    /// 2_460 MHz
    _22,
    /// 2_465 MHz
    _23,
    /// 2_470 MHz
    _24,
    /// 2_475 MHz
    _25,
    /// 2_480 MHz
    _26,
}

impl From<Channel> for u8 {
    fn from(ch: Channel) -> u8 {
        match ch {
            Channel::_11 => 11,
            Channel::_12 => 12,
            Channel::_13 => 13,
            Channel::_14 => 14,
            Channel::_15 => 15,
            Channel::_16 => 16,
            Channel::_17 => 17,
            Channel::_18 => 18,
            Channel::_19 => 19,
            Channel::_20 => 20,
            Channel::_21 => 21,
            Channel::_22 => 22,
            Channel::_23 => 23,
            Channel::_24 => 24,
            Channel::_25 => 25,
            Channel::_26 => 26,
        }
    }
}

impl TryFrom<i32> for Channel {
    type Error = ();

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            11 => Ok(Channel::_11),
            12 => Ok(Channel::_12),
            13 => Ok(Channel::_13),
            14 => Ok(Channel::_14),
            15 => Ok(Channel::_15),
            16 => Ok(Channel::_16),
            17 => Ok(Channel::_17),
            18 => Ok(Channel::_18),
            19 => Ok(Channel::_19),
            20 => Ok(Channel::_20),
            21 => Ok(Channel::_21),
            22 => Ok(Channel::_22),
            23 => Ok(Channel::_23),
            24 => Ok(Channel::_24),
            25 => Ok(Channel::_25),
            26 => Ok(Channel::_26),
            _ => Err(()),
        }
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::_11
    }
}

/// Transmit power, written to the `PHY_TX_PWR.TX_PWR` field.
#[cfg_attr(feature = "std", derive(Debug))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub enum TxPower {
    /// +3 dBm
    #[default]
    Dbm3,
    /// 0 dBm
    Dbm0,
    /// -3 dBm
    DbmNeg3,
    /// -7 dBm
    DbmNeg7,
    /// -17 dBm
    DbmNeg17,
}

impl From<TxPower> for u8 {
    fn from(pwr: TxPower) -> u8 {
        match pwr {
            TxPower::Dbm3 => 0x0,
            TxPower::Dbm0 => 0x6,
            TxPower::DbmNeg3 => 0x9,
            TxPower::DbmNeg7 => 0xC,
            TxPower::DbmNeg17 => 0xF,
        }
    }
}

/// Clear-channel assessment mode, `PHY_CC_CCA.CCA_MODE`.
#[cfg_attr(feature = "std", derive(Debug))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub enum CcaMode {
    /// Carrier sense or energy above threshold.
    CarrierSenseOrEnergy,
    /// Energy above threshold.
    #[default]
    EnergyDetection,
    /// Carrier sense only.
    CarrierSense,
    /// Carrier sense and energy above threshold.
    CarrierSenseAndEnergy,
}

impl From<CcaMode> for u8 {
    fn from(mode: CcaMode) -> u8 {
        match mode {
            CcaMode::CarrierSenseOrEnergy => 0,
            CcaMode::EnergyDetection => 1,
            CcaMode::CarrierSense => 2,
            CcaMode::CarrierSenseAndEnergy => 3,
        }
    }
}

/// Fixed configuration asserted at reset, not mutated at runtime.
#[cfg_attr(feature = "std", derive(Debug))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RadioConfig {
    pub channel: Channel,
    pub tx_power: TxPower,
    pub cca_mode: CcaMode,
    /// Crystal trim capacitor setting, board dependent.
    pub xtal_trim: u8,
    /// How long to wait for the chip to report PLL lock before a transmit.
    pub tx_ready_timeout: Duration,
    /// How long a started transmission may stay on the air before the
    /// driver gives up on the transfer-end interrupt.
    pub tx_done_timeout: Duration,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            channel: Channel::default(),
            tx_power: TxPower::default(),
            cca_mode: CcaMode::default(),
            xtal_trim: 0x0,
            tx_ready_timeout: Duration::from_ms(1),
            tx_done_timeout: Duration::from_ms(10),
        }
    }
}

impl RadioConfig {
    /// The `PHY_CC_CCA` value for this channel and CCA mode, without the
    /// request bit.
    pub(crate) fn phy_cc_cca(&self) -> u8 {
        (u8::from(self.cca_mode) << crate::regs::PHY_CC_CCA_MODE_SHIFT)
            | (u8::from(self.channel) & crate::regs::PHY_CC_CCA_CHANNEL_MASK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_channel_is_11() {
        assert_eq!(u8::from(Channel::default()), 11);
    }

    #[test]
    fn phy_cc_cca_encoding() {
        let config = RadioConfig::default();
        // Energy detection (mode 1) on channel 11.
        assert_eq!(config.phy_cc_cca(), 0x20 | 11);
    }

    #[test]
    fn channel_round_trip() {
        for ch in 11..=26 {
            let parsed = Channel::try_from(ch).unwrap();
            assert_eq!(u8::from(parsed) as i32, ch);
        }
        assert!(Channel::try_from(10).is_err());
        assert!(Channel::try_from(27).is_err());
    }
}
