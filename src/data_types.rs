//! Data types for the AXP202 driver: configuration, channels, rails and sample snapshots.

use crate::registers::PowerOutput;

/// Default number of service ticks a button press stays "held".
pub const DEFAULT_BUTTON_HOLD_TICKS: u8 = 5;

/// Numeric outputs published by [`crate::Axp202::sample`].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Sensor {
    /// VBUS voltage (V).
    BusVoltage,
    /// Battery voltage (V).
    BatteryVoltage,
    /// Battery discharge current (mA), only while not charging.
    DischargeCurrent,
    /// Fuel gauge (%).
    BatteryLevel,
    /// Die temperature (°C).
    InternalTemperature,
}

/// Boolean outputs published on interrupts and at initialization.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BinarySensor {
    /// VBUS usable (POWER_STATUS bit 4). Presence alone does not count.
    Usb,
    /// Battery present and charging.
    Charging,
    /// Power key pressed (debounced).
    Button,
}

/// Per-channel presence flags. A disabled channel is neither read nor published.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Channels {
    pub bus_voltage: bool,
    pub battery_voltage: bool,
    pub discharge_current: bool,
    pub battery_level: bool,
    pub internal_temperature: bool,
    pub usb: bool,
    pub charging: bool,
    pub button: bool,
}

impl Channels {
    /// Every channel disabled.
    pub const NONE: Self = Self {
        bus_voltage: false,
        battery_voltage: false,
        discharge_current: false,
        battery_level: false,
        internal_temperature: false,
        usb: false,
        charging: false,
        button: false,
    };

    pub fn sensor(&self, sensor: Sensor) -> bool {
        match sensor {
            Sensor::BusVoltage => self.bus_voltage,
            Sensor::BatteryVoltage => self.battery_voltage,
            Sensor::DischargeCurrent => self.discharge_current,
            Sensor::BatteryLevel => self.battery_level,
            Sensor::InternalTemperature => self.internal_temperature,
        }
    }

    pub fn binary(&self, sensor: BinarySensor) -> bool {
        match sensor {
            BinarySensor::Usb => self.usb,
            BinarySensor::Charging => self.charging,
            BinarySensor::Button => self.button,
        }
    }

    /// True when `sample()` has at least one numeric channel to read.
    pub fn any_sensor(&self) -> bool {
        self.bus_voltage
            || self.battery_voltage
            || self.discharge_current
            || self.battery_level
            || self.internal_temperature
    }
}

impl Default for Channels {
    fn default() -> Self {
        Self {
            bus_voltage: true,
            battery_voltage: true,
            discharge_current: true,
            battery_level: true,
            internal_temperature: false,
            usb: true,
            charging: true,
            button: true,
        }
    }
}

/// Construction-time configuration.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    /// Leave LDO2 (backlight) off after initialization.
    pub disable_ldo2: bool,
    /// Leave LDO3 (audio) off after initialization.
    pub disable_ldo3: bool,
    /// Initial backlight level, 0.0..=1.0.
    pub brightness: f32,
    /// Service ticks a button press stays held. Zero behaves like one.
    pub button_hold_ticks: u8,
    pub channels: Channels,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            disable_ldo2: false,
            disable_ldo3: false,
            brightness: 1.0,
            button_hold_ticks: DEFAULT_BUTTON_HOLD_TICKS,
            channels: Channels::default(),
        }
    }
}

/// Auxiliary rails that can be switched at runtime.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Rail {
    /// Display backlight.
    Ldo2,
    /// Audio module.
    Ldo3,
    /// Unused on most boards.
    Ldo4,
}

impl Rail {
    /// Enable bit in the POWER_OUTPUT register.
    pub fn mask(self) -> u8 {
        match self {
            Rail::Ldo2 => PowerOutput::LDO2.bits(),
            Rail::Ldo3 => PowerOutput::LDO3.bits(),
            Rail::Ldo4 => PowerOutput::LDO4.bits(),
        }
    }
}

/// One `sample()` pass. `None` means the value is unavailable (source absent, bus error,
/// invalid reading or channel disabled).
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Sample {
    pub bus_voltage: Option<f32>,
    pub battery_voltage: Option<f32>,
    pub discharge_current: Option<f32>,
    pub battery_level: Option<f32>,
    pub internal_temperature: Option<f32>,
}

impl Sample {
    pub fn get(&self, sensor: Sensor) -> Option<f32> {
        match sensor {
            Sensor::BusVoltage => self.bus_voltage,
            Sensor::BatteryVoltage => self.battery_voltage,
            Sensor::DischargeCurrent => self.discharge_current,
            Sensor::BatteryLevel => self.battery_level,
            Sensor::InternalTemperature => self.internal_temperature,
        }
    }
}

/// Both presence registers read in one burst.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PresenceStatus {
    pub battery_present: bool,
    pub vbus_present: bool,
    pub vbus_usable: bool,
    pub charging: bool,
}
