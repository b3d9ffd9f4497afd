#![no_std]
//! PHY driver for AT86RF2xx IEEE 802.15.4 transceivers.
//!
//! The driver reconciles three concurrent actors around one radio chip:
//! an interrupt handler ([`Rf2xx::handle_interrupt`]), a worker task that
//! drains received frames ([`Rf2xx::rx_worker`]), and caller threads that
//! request transmissions or mode changes. All shared state transitions go
//! through a single state machine protected by `critical-section`.
//!
//! The register/FIFO access layer is abstracted behind [`bus::RadioBus`]
//! and the clock behind [`time::Monotonic`], so the whole driver runs on a
//! host for testing with a fake bus and clock.

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

#[macro_use]
pub(crate) mod utils;

pub mod bus;
pub mod config;
pub mod driver;
pub mod regs;
pub mod state;
pub mod time;

pub use bus::RadioBus;
pub use config::RadioConfig;
pub use driver::{Error, Rf2xx, UpperLayer};
pub use state::RadioState;
pub use time::Monotonic;
