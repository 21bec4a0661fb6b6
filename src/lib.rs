//! AXP202 Rust Driver
//!
//! `no_std` driver for the X-Powers AXP202 power management IC as found on
//! ESP32 handhelds: battery/VBUS presence, ADC readings, fuel gauge, power key
//! and auxiliary rail control over I2C.
//!
//! The host drives two entry points:
//! - [`Axp202::sample`] on a slow periodic schedule, publishing voltages, current
//!   and battery level through a [`Publisher`];
//! - [`Axp202::service`] on every cooperative tick, draining the [`InterruptFlag`]
//!   signalled by the IRQ line's falling-edge handler and running the power key
//!   debounce window.
//!
//! ```no_run
//! use axp202_rs::{Axp202, Config, InterruptFlag};
//! # fn example<I: embedded_hal::i2c::I2c>(i2c: I) -> Result<(), axp202_rs::Error<I::Error>> {
//! static IRQ: InterruptFlag = InterruptFlag::new();
//!
//! let mut pmic = Axp202::new(i2c, (), Config::default()).with_interrupt(&IRQ);
//! pmic.initialize()?;
//! loop {
//!     pmic.service()?;
//!     let sample = pmic.sample()?;
//!     if let Some(volts) = sample.battery_voltage {
//!         // ...
//! #       let _ = volts;
//!     }
//! }
//! # }
//! ```
//!
//! Optional features: `async` (embedded-hal-async mirror with `_async` methods) and
//! `defmt` (logging and `defmt::Format` derives).

#![no_std]

mod fmt;

pub mod button;
pub mod data_types;
pub mod driver;
pub mod error;
pub mod interrupt;
pub mod publish;
pub mod registers;

pub use data_types::{BinarySensor, Channels, Config, Rail, Sample, Sensor};
pub use driver::Axp202;
pub use error::Error;
pub use interrupt::InterruptFlag;
pub use publish::Publisher;
pub use registers::DEFAULT_I2C_ADDRESS;
