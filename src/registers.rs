//! Register map, bit layouts and conversion helpers for the AXP202.
//! Addresses, scale factors and initial values follow the datasheet register tables.

/// Default 7-bit I2C address of the AXP202.
pub const DEFAULT_I2C_ADDRESS: u8 = 0x35;

/// Register addresses.
pub mod addr {
    /// Input power status (ACIN/VBUS presence, battery current direction).
    pub const POWER_STATUS: u8 = 0x00;
    /// Power mode / charge status (charging indication, battery presence).
    pub const CHARGE_STATUS: u8 = 0x01;
    /// Output rail enable (LDO2/3/4, DCDC2/3, EXTEN).
    pub const POWER_OUTPUT: u8 = 0x12;
    /// LDO2 (high nibble) and LDO4 (low nibble) voltage.
    pub const LDO24_VOLTAGE: u8 = 0x28;
    /// LDO3 voltage and tracking mode.
    pub const LDO3_VOLTAGE: u8 = 0x29;
    /// Shutdown, battery detection and CHGLED control.
    pub const SHUTDOWN_BATTERY_DETECT: u8 = 0x32;
    /// Charge target voltage and charge current.
    pub const CHARGE_CONTROL1: u8 = 0x33;
    /// Power-enable key (PEK) timing.
    pub const PEK_CONFIG: u8 = 0x36;
    /// Battery temperature protection threshold.
    pub const TEMPERATURE_THRESHOLD: u8 = 0x39;
    /// IRQ enable registers 1..5 (0x40..0x44).
    pub const IRQ_ENABLE1: u8 = 0x40;
    pub const IRQ_ENABLE2: u8 = 0x41;
    pub const IRQ_ENABLE3: u8 = 0x42;
    pub const IRQ_ENABLE4: u8 = 0x43;
    pub const IRQ_ENABLE5: u8 = 0x44;
    /// IRQ status registers 1..5 (0x48..0x4C), write 1 to clear.
    pub const IRQ_STATUS1: u8 = 0x48;
    pub const IRQ_STATUS2: u8 = 0x49;
    pub const IRQ_STATUS3: u8 = 0x4A;
    /// ACIN voltage ADC (12-bit, 2 registers).
    pub const ACIN_VOLTAGE: u8 = 0x56;
    /// ACIN current ADC (12-bit).
    pub const ACIN_CURRENT: u8 = 0x58;
    /// VBUS voltage ADC (12-bit).
    pub const VBUS_VOLTAGE: u8 = 0x5A;
    /// VBUS current ADC (12-bit).
    pub const VBUS_CURRENT: u8 = 0x5C;
    /// Internal die temperature ADC (12-bit).
    pub const INTERNAL_TEMPERATURE: u8 = 0x5E;
    /// Instantaneous battery power (24-bit, 3 registers).
    pub const BATTERY_POWER: u8 = 0x70;
    /// Battery voltage ADC (12-bit).
    pub const BATTERY_VOLTAGE: u8 = 0x78;
    /// Battery charge current ADC (13-bit).
    pub const CHARGE_CURRENT: u8 = 0x7A;
    /// Battery discharge current ADC (13-bit).
    pub const DISCHARGE_CURRENT: u8 = 0x7C;
    /// APS (IPSOUT) voltage ADC (12-bit).
    pub const APS_VOLTAGE: u8 = 0x7E;
    /// ADC channel enable 1.
    pub const ADC_ENABLE1: u8 = 0x82;
    /// ADC sample rate and TS pin control.
    pub const ADC_SPEED: u8 = 0x84;
    /// VBUS validation and session detection.
    pub const VBUS_VALIDATION: u8 = 0x8B;
    /// Fuel gauge percentage.
    pub const FUEL_GAUGE: u8 = 0xB9;
}

/// Number of IRQ status registers, all cleared together.
pub const IRQ_STATUS_COUNT: usize = 5;

/// Fixed configuration written by `initialize`, in programming order (before the rail-enable step).
pub const INIT_SEQUENCE: [(u8, u8); 8] = [
    // LDO2 and LDO4 at 3.0 V.
    (addr::LDO24_VOLTAGE, 0xCC),
    // LDO3 follows LDO3IN.
    (addr::LDO3_VOLTAGE, 0x80),
    // 25 Hz sample rate, 80 uA TS current, TS input while sampling.
    (addr::ADC_SPEED, 0b0011_0010),
    (addr::ADC_ENABLE1, AdcEnable1::DEFAULT.bits()),
    // Battery detection on, CHGLED off.
    (addr::SHUTDOWN_BATTERY_DETECT, 0x46),
    // Charge target 4.2 V, 300 mA.
    (addr::CHARGE_CONTROL1, 0xC0),
    // 128 ms boot, 1 s long press, PWROK after 64 ms, shutdown after 4 s.
    (addr::PEK_CONFIG, 0x02),
    (addr::TEMPERATURE_THRESHOLD, 0xFC),
];

/// VBUS valid at 4.45 V, session detection and discharge resistor off.
pub const VBUS_VALIDATION_VALUE: u8 = 0x20;

/// IRQ enable masks for IRQ_ENABLE1..5: VBUS in/out, charge start/finish, PEK short/long.
pub const IRQ_ENABLE_MASKS: [u8; IRQ_STATUS_COUNT] = [
    Irq1Bits::VBUS_EVENTS.bits(),
    Irq2Bits::CHARGE_EVENTS.bits(),
    Irq3Bits::PEK_EVENTS.bits(),
    0x00,
    0x00,
];

/// ADC scale factors.
pub const ACIN_VOLTAGE_LSB_V: f32 = 1.7 / 1000.0;
pub const ACIN_CURRENT_LSB_MA: f32 = 0.625;
pub const VBUS_VOLTAGE_LSB_V: f32 = 1.7 / 1000.0;
pub const VBUS_CURRENT_LSB_MA: f32 = 0.375;
pub const BATTERY_VOLTAGE_LSB_V: f32 = 1.1 / 1000.0;
pub const BATTERY_CURRENT_LSB_MA: f32 = 0.5;
pub const APS_VOLTAGE_LSB_V: f32 = 1.4 / 1000.0;
pub const TEMPERATURE_LSB_C: f32 = 0.1;
pub const TEMPERATURE_OFFSET_C: f32 = -144.7;

/// Fuel gauge upper bound and invalid flag.
pub const FUEL_GAUGE_MAX: u8 = 100;
pub const FUEL_GAUGE_INVALID: u8 = 1 << 7;

/// LDO2 range used for the backlight (high nibble of LDO24_VOLTAGE).
pub const BRIGHTNESS_CODE_MIN: u8 = 7;
pub const BRIGHTNESS_CODE_MAX: u8 = 12;

/// Charge current DAC (low nibble of CHARGE_CONTROL1).
pub const CHARGE_CURRENT_MIN_MA: u16 = 300;
pub const CHARGE_CURRENT_MAX_MA: u16 = 1_800;
pub const CHARGE_CURRENT_STEP_MA: u16 = 100;

bitflags::bitflags! {
    /// POWER_STATUS register bits (0x00).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PowerStatus: u8 {
        const ACIN_PRESENT     = 1 << 7;
        const ACIN_USABLE      = 1 << 6;
        const VBUS_PRESENT     = 1 << 5;
        const VBUS_USABLE      = 1 << 4;
        const VBUS_ABOVE_VHOLD = 1 << 3;
        /// Battery current direction (1 = charging).
        const BATTERY_CHARGING = 1 << 2;
        const ACIN_VBUS_SHORT  = 1 << 1;
        const BOOT_FROM_ACIN   = 1 << 0;
    }

    /// CHARGE_STATUS register bits (0x01).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ChargeStatus: u8 {
        const OVER_TEMPERATURE = 1 << 7;
        const CHARGING         = 1 << 6;
        const BATTERY_PRESENT  = 1 << 5;
        const BATTERY_ACTIVE   = 1 << 3;
        const CURRENT_LOW      = 1 << 2;
    }

    /// POWER_OUTPUT register bits (0x12).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PowerOutput: u8 {
        const LDO3  = 1 << 6;
        const DCDC2 = 1 << 4;
        const LDO4  = 1 << 3;
        const LDO2  = 1 << 2;
        /// Powers the host MCU, never touched by this driver.
        const DCDC3 = 1 << 1;
        const EXTEN = 1 << 0;
    }

    /// ADC_ENABLE1 register bits (0x82).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct AdcEnable1: u8 {
        const BATTERY_VOLTAGE = 1 << 7;
        const BATTERY_CURRENT = 1 << 6;
        const ACIN_VOLTAGE    = 1 << 5;
        const ACIN_CURRENT    = 1 << 4;
        const VBUS_VOLTAGE    = 1 << 3;
        const VBUS_CURRENT    = 1 << 2;
        const APS_VOLTAGE     = 1 << 1;
        const TS_PIN          = 1 << 0;

        /// Battery current is required by the fuel gauge.
        const DEFAULT = Self::BATTERY_VOLTAGE.bits()
            | Self::BATTERY_CURRENT.bits()
            | Self::VBUS_VOLTAGE.bits()
            | Self::APS_VOLTAGE.bits()
            | Self::TS_PIN.bits();
    }

    /// IRQ_STATUS1 / IRQ_ENABLE1 bits (0x48 / 0x40).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Irq1Bits: u8 {
        const VBUS_INSERTED = 1 << 3;
        const VBUS_REMOVED  = 1 << 2;

        const VBUS_EVENTS = Self::VBUS_INSERTED.bits() | Self::VBUS_REMOVED.bits();
    }

    /// IRQ_STATUS2 / IRQ_ENABLE2 bits (0x49 / 0x41).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Irq2Bits: u8 {
        const CHARGE_STARTED  = 1 << 3;
        const CHARGE_FINISHED = 1 << 2;

        const CHARGE_EVENTS = Self::CHARGE_STARTED.bits() | Self::CHARGE_FINISHED.bits();
    }

    /// IRQ_STATUS3 / IRQ_ENABLE3 bits (0x4A / 0x42).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Irq3Bits: u8 {
        const PEK_SHORT_PRESS = 1 << 1;
        const PEK_LONG_PRESS  = 1 << 0;

        const PEK_EVENTS = Self::PEK_SHORT_PRESS.bits() | Self::PEK_LONG_PRESS.bits();
    }
}

impl PowerStatus {
    /// Build from the raw register value, keeping unknown bits out.
    pub fn from_raw(raw: u8) -> Self {
        Self::from_bits_truncate(raw)
    }

    pub fn vbus_present(&self) -> bool {
        self.contains(Self::VBUS_PRESENT)
    }

    pub fn vbus_usable(&self) -> bool {
        self.contains(Self::VBUS_USABLE)
    }
}

impl ChargeStatus {
    pub fn from_raw(raw: u8) -> Self {
        Self::from_bits_truncate(raw)
    }

    pub fn battery_present(&self) -> bool {
        self.contains(Self::BATTERY_PRESENT)
    }

    /// Charging only counts while a battery is actually attached.
    pub fn charging(&self) -> bool {
        self.battery_present() && self.contains(Self::CHARGING)
    }
}

/// 12-bit ADC field: 8 high bits in the first register, 4 low bits in the second.
pub fn decode12(hi: u8, lo: u8) -> u16 {
    ((hi as u16) << 4) | (lo & 0x0F) as u16
}

/// 13-bit ADC field: 8 high bits in the first register, 5 low bits in the second.
pub fn decode13(hi: u8, lo: u8) -> u16 {
    ((hi as u16) << 5) | (lo & 0x1F) as u16
}

/// Big-endian 16-bit value spread across two consecutive registers.
pub fn decode16(bytes: [u8; 2]) -> u16 {
    u16::from_be_bytes(bytes)
}

/// Big-endian 24-bit value spread across three consecutive registers.
pub fn decode24(bytes: [u8; 3]) -> u32 {
    u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]])
}

/// Big-endian 32-bit value spread across four consecutive registers.
pub fn decode32(bytes: [u8; 4]) -> u32 {
    u32::from_be_bytes(bytes)
}

/// VBUS voltage in volts from the 12-bit ADC code.
pub fn bus_voltage_from_raw(raw: u16) -> f32 {
    raw as f32 * VBUS_VOLTAGE_LSB_V
}

/// VBUS current in milliamps.
pub fn bus_current_from_raw(raw: u16) -> f32 {
    raw as f32 * VBUS_CURRENT_LSB_MA
}

/// ACIN voltage in volts.
pub fn acin_voltage_from_raw(raw: u16) -> f32 {
    raw as f32 * ACIN_VOLTAGE_LSB_V
}

/// ACIN current in milliamps.
pub fn acin_current_from_raw(raw: u16) -> f32 {
    raw as f32 * ACIN_CURRENT_LSB_MA
}

/// Battery voltage in volts from the 12-bit ADC code.
pub fn battery_voltage_from_raw(raw: u16) -> f32 {
    raw as f32 * BATTERY_VOLTAGE_LSB_V
}

/// Battery charge or discharge current in milliamps from the 13-bit ADC code.
pub fn battery_current_from_raw(raw: u16) -> f32 {
    raw as f32 * BATTERY_CURRENT_LSB_MA
}

/// APS voltage in volts.
pub fn aps_voltage_from_raw(raw: u16) -> f32 {
    raw as f32 * APS_VOLTAGE_LSB_V
}

/// Die temperature in degrees Celsius.
pub fn temperature_from_raw(raw: u16) -> f32 {
    TEMPERATURE_OFFSET_C + raw as f32 * TEMPERATURE_LSB_C
}

/// Battery power in milliwatts from the 24-bit product register.
pub fn battery_power_from_raw(raw: u32) -> f32 {
    raw as f32 * 1.1 * BATTERY_CURRENT_LSB_MA / 1000.0
}

/// Fuel gauge percentage, or `None` when the invalid bit is set or the value exceeds 100.
pub fn decode_fuel_gauge(raw: u8) -> Option<u8> {
    if raw & FUEL_GAUGE_INVALID != 0 {
        return None;
    }
    let percent = raw & !FUEL_GAUGE_INVALID;
    (percent <= FUEL_GAUGE_MAX).then_some(percent)
}

/// Compute the rail-enable register written during initialization.
///
/// DCDC2, LDO4 and EXTEN are always switched off; LDO2 and LDO3 are on unless disabled.
/// DCDC3 and reserved bits keep their current state.
pub fn rail_enable_value(current: u8, disable_ldo2: bool, disable_ldo3: bool) -> u8 {
    let always_off = PowerOutput::DCDC2 | PowerOutput::LDO4 | PowerOutput::EXTEN;
    let mut bits = (current & !always_off.bits()) | (PowerOutput::LDO2 | PowerOutput::LDO3).bits();
    if disable_ldo3 {
        bits &= !PowerOutput::LDO3.bits();
    }
    if disable_ldo2 {
        bits &= !PowerOutput::LDO2.bits();
    }
    bits
}

/// Map a normalized backlight level onto the LDO2 code range (7..=12), clamping the top end.
/// Returns `None` for negative or non-finite levels.
pub fn brightness_to_code(level: f32) -> Option<u8> {
    if !level.is_finite() || level < 0.0 {
        return None;
    }
    let span = (BRIGHTNESS_CODE_MAX - BRIGHTNESS_CODE_MIN) as f32;
    let steps = (level * span).min(span) as u8;
    Some((BRIGHTNESS_CODE_MIN + steps).min(BRIGHTNESS_CODE_MAX))
}

/// Replace the LDO2 nibble of LDO24_VOLTAGE, preserving the LDO4 nibble.
pub fn with_brightness_code(current: u8, code: u8) -> u8 {
    (current & 0x0F) | ((code & 0x0F) << 4)
}

/// Convert charge current (mA) to the 4-bit DAC code. Clamps to datasheet limits.
pub fn charge_current_ma_to_code(ma: u16) -> u8 {
    let ma = ma.clamp(CHARGE_CURRENT_MIN_MA, CHARGE_CURRENT_MAX_MA);
    ((ma - CHARGE_CURRENT_MIN_MA) / CHARGE_CURRENT_STEP_MA) as u8
}

/// Convert the charge current DAC code back to milliamps.
pub fn code_to_charge_current_ma(code: u8) -> u16 {
    let code = (code & 0x0F) as u16;
    (CHARGE_CURRENT_MIN_MA + code * CHARGE_CURRENT_STEP_MA).min(CHARGE_CURRENT_MAX_MA)
}
