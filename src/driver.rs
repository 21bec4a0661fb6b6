//! AXP202 power controller.
//!
//! Blocking I2C implementation; the async version mirrors this API behind the `async`
//! feature with `_async` suffixed methods.

use crate::button::{ButtonEdge, ButtonState, Debouncer};
use crate::data_types::{BinarySensor, Config, PresenceStatus, Rail, Sample, Sensor};
use crate::error::Error;
use crate::interrupt::{InterruptFlag, PendingEvents, acknowledge};
use crate::publish::Publisher;
use crate::registers::{
    ChargeStatus, DEFAULT_I2C_ADDRESS, INIT_SEQUENCE, IRQ_ENABLE_MASKS, IRQ_STATUS_COUNT, PowerStatus,
    VBUS_VALIDATION_VALUE, acin_current_from_raw, acin_voltage_from_raw, addr, aps_voltage_from_raw,
    battery_current_from_raw, battery_power_from_raw, battery_voltage_from_raw, brightness_to_code,
    bus_current_from_raw, bus_voltage_from_raw, charge_current_ma_to_code, decode12, decode13, decode24,
    decode_fuel_gauge, rail_enable_value, temperature_from_raw, with_brightness_code,
};

/// Value written across the IRQ status range to acknowledge every source.
const IRQ_CLEAR: [u8; IRQ_STATUS_COUNT] = [0xFF; IRQ_STATUS_COUNT];

/// AXP202 power controller.
///
/// Owns the bus handle and the publisher. All register access goes through `&mut self`,
/// so initialization, sampling and interrupt servicing never overlap on the bus.
pub struct Axp202<'a, I2C, P = ()> {
    i2c: I2C,
    address: u8,
    publisher: P,
    config: Config,
    interrupt: Option<&'a InterruptFlag>,
    button: Debouncer,
    /// Last brightness level written to the IC.
    brightness: Option<f32>,
    failed: bool,
}

impl<'a, I2C, P> Axp202<'a, I2C, P> {
    /// Create a new driver instance with the default I2C address (0x35).
    pub fn new(i2c: I2C, publisher: P, config: Config) -> Self {
        Self::with_address(i2c, DEFAULT_I2C_ADDRESS, publisher, config)
    }

    /// Create a new driver instance with a custom I2C address.
    pub fn with_address(i2c: I2C, address: u8, publisher: P, config: Config) -> Self {
        Self {
            i2c,
            address,
            publisher,
            config,
            interrupt: None,
            button: Debouncer::new(config.button_hold_ticks),
            brightness: None,
            failed: false,
        }
    }

    /// Attach the flag signalled by the IRQ line's falling-edge handler.
    /// Without it `service()` only advances the button hold window.
    pub fn with_interrupt(mut self, flag: &'a InterruptFlag) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Return the 7-bit I2C address configured for this instance.
    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// True once the rail-enable step of `initialize` has failed.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn button_state(&self) -> ButtonState {
        self.button.state()
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn publisher_mut(&mut self) -> &mut P {
        &mut self.publisher
    }

    /// Release the bus and the publisher.
    pub fn free(self) -> (I2C, P) {
        (self.i2c, self.publisher)
    }

    fn check_operational<E>(&self) -> Result<(), Error<E>> {
        if self.failed {
            Err(Error::InitializationFailed)
        } else {
            Ok(())
        }
    }

    fn mark_failed(&mut self) {
        error!("axp202: rail enable write failed, controller disabled");
        self.failed = true;
    }
}

impl<'a, I2C, P> Axp202<'a, I2C, P>
where
    P: Publisher,
{
    fn emit_reading(&mut self, sensor: Sensor, value: Option<f32>) {
        if self.config.channels.sensor(sensor) {
            self.publisher.publish_reading(sensor, value);
        }
    }

    fn emit_state(&mut self, sensor: BinarySensor, state: bool) {
        if self.config.channels.binary(sensor) {
            self.publisher.publish_state(sensor, state);
        }
    }

    fn emit_sample(&mut self, sample: &Sample) {
        for sensor in [
            Sensor::BusVoltage,
            Sensor::BatteryVoltage,
            Sensor::DischargeCurrent,
            Sensor::BatteryLevel,
            Sensor::InternalTemperature,
        ] {
            self.emit_reading(sensor, sample.get(sensor));
        }
    }

    fn emit_presence(&mut self, presence: &PresenceStatus, usb: bool, charging: bool) {
        if usb {
            debug!("axp202: usb={}", presence.vbus_usable);
            self.emit_state(BinarySensor::Usb, presence.vbus_usable);
        }
        if charging {
            debug!("axp202: charging={}", presence.charging);
            self.emit_state(BinarySensor::Charging, presence.charging);
        }
    }

    fn emit_button(&mut self, edge: Option<ButtonEdge>) {
        match edge {
            Some(ButtonEdge::Pressed) => {
                debug!("axp202: button pressed");
                self.emit_state(BinarySensor::Button, true);
            }
            Some(ButtonEdge::Released) => {
                debug!("axp202: button released");
                self.emit_state(BinarySensor::Button, false);
            }
            None => {}
        }
    }

    fn press_button(&mut self) {
        let edge = self.button.press();
        self.emit_button(edge);
    }

    fn tick_button(&mut self) {
        let edge = self.button.tick();
        self.emit_button(edge);
    }

    /// Interrupt consumed by this tick, if any.
    fn take_interrupt(&self) -> bool {
        self.interrupt.is_some_and(|flag| flag.take())
    }

    /// Hand a consumed interrupt back so the next tick retries it.
    fn restore_interrupt(&self) {
        if let Some(flag) = self.interrupt {
            flag.signal();
        }
    }

    /// Apply a serviced interrupt to the button window, or hand it back on failure.
    fn finish_service<E>(&mut self, serviced: Result<PendingEvents, Error<E>>) -> Result<(), Error<E>> {
        match serviced {
            Ok(events) => {
                if events.button_pressed {
                    self.press_button();
                } else {
                    self.tick_button();
                }
                Ok(())
            }
            Err(e) => {
                warn!("axp202: interrupt service failed, retrying next tick");
                self.restore_interrupt();
                self.tick_button();
                Err(e)
            }
        }
    }

    fn log_config(&self) {
        info!(
            "axp202: address={=u8:#x} interrupt={} channels={}",
            self.address,
            self.interrupt.is_some(),
            self.config.channels
        );
    }

    fn wants_presence(&self, usb: bool, charging: bool) -> bool {
        let channels = &self.config.channels;
        (usb && channels.usb) || (charging && channels.charging)
    }
}

fn decode_presence(raw: [u8; 2]) -> PresenceStatus {
    let [power, charge] = raw;
    let power = PowerStatus::from_raw(power);
    let charge = ChargeStatus::from_raw(charge);
    PresenceStatus {
        battery_present: charge.battery_present(),
        vbus_present: power.vbus_present(),
        vbus_usable: power.vbus_usable(),
        charging: charge.charging(),
    }
}

/// First register and byte count backing a sample channel.
fn sensor_source(sensor: Sensor) -> (u8, usize) {
    match sensor {
        Sensor::BusVoltage => (addr::VBUS_VOLTAGE, 2),
        Sensor::BatteryVoltage => (addr::BATTERY_VOLTAGE, 2),
        Sensor::DischargeCurrent => (addr::DISCHARGE_CURRENT, 2),
        Sensor::BatteryLevel => (addr::FUEL_GAUGE, 1),
        Sensor::InternalTemperature => (addr::INTERNAL_TEMPERATURE, 2),
    }
}

/// Physical value of a sample channel, `None` when the IC flags it invalid.
fn decode_sensor(sensor: Sensor, raw: [u8; 2]) -> Option<f32> {
    let [hi, lo] = raw;
    match sensor {
        Sensor::BusVoltage => Some(bus_voltage_from_raw(decode12(hi, lo))),
        Sensor::BatteryVoltage => Some(battery_voltage_from_raw(decode12(hi, lo))),
        Sensor::DischargeCurrent => Some(battery_current_from_raw(decode13(hi, lo))),
        Sensor::BatteryLevel => decode_fuel_gauge(hi).map(f32::from),
        Sensor::InternalTemperature => Some(temperature_from_raw(decode12(hi, lo))),
    }
}

/// Whether a channel may be read given the current presence bits.
fn sensor_available(sensor: Sensor, presence: Option<&PresenceStatus>) -> bool {
    match sensor {
        Sensor::InternalTemperature => true,
        Sensor::BusVoltage => presence.is_some_and(|p| p.vbus_present),
        Sensor::BatteryVoltage | Sensor::BatteryLevel => presence.is_some_and(|p| p.battery_present),
        Sensor::DischargeCurrent => presence.is_some_and(|p| p.battery_present && !p.charging),
    }
}

fn set_sample(sample: &mut Sample, sensor: Sensor, value: Option<f32>) {
    let slot = match sensor {
        Sensor::BusVoltage => &mut sample.bus_voltage,
        Sensor::BatteryVoltage => &mut sample.battery_voltage,
        Sensor::DischargeCurrent => &mut sample.discharge_current,
        Sensor::BatteryLevel => &mut sample.battery_level,
        Sensor::InternalTemperature => &mut sample.internal_temperature,
    };
    *slot = value;
}

const SAMPLE_ORDER: [Sensor; 5] = [
    Sensor::BusVoltage,
    Sensor::BatteryVoltage,
    Sensor::DischargeCurrent,
    Sensor::BatteryLevel,
    Sensor::InternalTemperature,
];

impl<'a, I2C, P> Axp202<'a, I2C, P>
where
    I2C: embedded_hal::i2c::I2c,
    P: Publisher,
{
    /// Program the IC: fixed configuration, rails, interrupt sources. Publishes USB and
    /// charging state once and applies the configured brightness.
    ///
    /// Only the rail-enable step is fatal; every other failed write is logged and skipped.
    pub fn initialize(&mut self) -> Result<(), Error<I2C::Error>> {
        self.check_operational()?;

        debug!("axp202: programming configuration registers");
        for (reg, value) in INIT_SEQUENCE {
            self.write_byte(reg, value);
        }

        self.enable_rails()?;

        self.write_byte(addr::VBUS_VALIDATION, VBUS_VALIDATION_VALUE);

        debug!("axp202: enabling VBUS, charge and PEK interrupts");
        for (reg, mask) in (addr::IRQ_ENABLE1..).zip(IRQ_ENABLE_MASKS) {
            self.write_byte(reg, mask);
        }
        if self.clear_interrupts().is_err() {
            warn!("axp202: clearing interrupt status failed");
        }

        if self.publish_presence(true, true).is_err() {
            warn!("axp202: initial usb/charging read failed");
        }

        let brightness = self.config.brightness;
        if self.update_brightness(brightness).is_err() {
            warn!("axp202: initial brightness not applied");
        }

        info!("axp202: initialized");
        self.log_config();
        Ok(())
    }

    fn enable_rails(&mut self) -> Result<(), Error<I2C::Error>> {
        if self.program_rails().is_err() {
            self.mark_failed();
            return Err(Error::InitializationFailed);
        }
        Ok(())
    }

    fn program_rails(&mut self) -> Result<(), Error<I2C::Error>> {
        let current = self.read_byte(addr::POWER_OUTPUT)?;
        let value = rail_enable_value(current, self.config.disable_ldo2, self.config.disable_ldo3);
        debug!("axp202: power output {=u8:#x} -> {=u8:#x}", current, value);
        self.write_reg(addr::POWER_OUTPUT, value)
    }

    /// Read the presence registers and publish the requested binary states.
    fn publish_presence(&mut self, usb: bool, charging: bool) -> Result<(), Error<I2C::Error>> {
        if !self.wants_presence(usb, charging) {
            return Ok(());
        }
        let presence = self.read_presence()?;
        self.emit_presence(&presence, usb, charging);
        Ok(())
    }

    /// Acknowledge every IRQ source, not only the enabled ones.
    pub fn clear_interrupts(&mut self) -> Result<(), Error<I2C::Error>> {
        self.write_regs(addr::IRQ_STATUS1, &IRQ_CLEAR)
    }

    /// Periodic poll: read and publish every enabled numeric channel.
    ///
    /// Channels whose source is absent, whose read fails, or whose value the IC flags as
    /// invalid are published as unavailable. Only a failed controller returns an error.
    pub fn sample(&mut self) -> Result<Sample, Error<I2C::Error>> {
        self.check_operational()?;

        let mut sample = Sample::default();
        if !self.config.channels.any_sensor() {
            return Ok(sample);
        }

        let presence = match self.read_presence() {
            Ok(presence) => Some(presence),
            Err(_) => {
                warn!("axp202: presence read failed, readings unavailable");
                None
            }
        };

        for sensor in SAMPLE_ORDER {
            if !self.config.channels.sensor(sensor) {
                continue;
            }
            let value = if sensor_available(sensor, presence.as_ref()) {
                self.measure(sensor)
            } else {
                debug!("axp202: {} source not present", sensor);
                None
            };
            set_sample(&mut sample, sensor, value);
        }

        self.emit_sample(&sample);
        Ok(sample)
    }

    fn measure(&mut self, sensor: Sensor) -> Option<f32> {
        let (reg, len) = sensor_source(sensor);
        let mut raw = [0u8; 2];
        if self.read_regs(reg, &mut raw[..len]).is_err() {
            warn!("axp202: reading {} failed", sensor);
            return None;
        }
        let value = decode_sensor(sensor, raw);
        match value {
            Some(v) => debug!("axp202: {}={}", sensor, v),
            None => debug!("axp202: {} reported invalid", sensor),
        }
        value
    }

    /// Cooperative tick: drain a pending interrupt and advance the button hold window.
    ///
    /// On a bus failure the interrupt is handed back for the next tick and the error is
    /// returned; the hold window still advances.
    pub fn service(&mut self) -> Result<(), Error<I2C::Error>> {
        self.check_operational()?;

        if !self.take_interrupt() {
            self.tick_button();
            return Ok(());
        }

        trace!("axp202: servicing interrupt");
        let serviced = self.service_pending();
        self.finish_service(serviced)
    }

    fn service_pending(&mut self) -> Result<PendingEvents, Error<I2C::Error>> {
        // Groups 1..3 in one burst, before anything is cleared.
        let status = self.read_bytes::<3>(addr::IRQ_STATUS1)?;
        let events = PendingEvents::from_status(status);
        trace!(
            "axp202: irq1={=u8:#x} irq2={=u8:#x} irq3={=u8:#x}",
            status[0],
            status[1],
            status[2]
        );

        self.publish_presence(events.usb_changed, events.charging_changed)?;
        // Enabled bits latched after the read stay set for the next tick.
        self.write_regs(addr::IRQ_STATUS1, &acknowledge(status))?;
        Ok(events)
    }

    /// Switch one auxiliary rail, leaving every other bit of POWER_OUTPUT untouched.
    pub fn set_rail(&mut self, rail: Rail, enabled: bool) -> Result<(), Error<I2C::Error>> {
        self.check_operational()?;
        debug!("axp202: {} enabled={}", rail, enabled);
        let mask = rail.mask();
        self.update_reg(addr::POWER_OUTPUT, mask, if enabled { mask } else { 0 })
    }

    /// Display backlight rail.
    pub fn set_ldo2(&mut self, enabled: bool) -> Result<(), Error<I2C::Error>> {
        self.set_rail(Rail::Ldo2, enabled)
    }

    /// Audio rail.
    pub fn set_ldo3(&mut self, enabled: bool) -> Result<(), Error<I2C::Error>> {
        self.set_rail(Rail::Ldo3, enabled)
    }

    pub fn set_ldo4(&mut self, enabled: bool) -> Result<(), Error<I2C::Error>> {
        self.set_rail(Rail::Ldo4, enabled)
    }

    /// Set the backlight level (0.0..=1.0, clamped at the top) through the LDO2 voltage.
    /// Skips the bus when `level` equals the last applied level.
    pub fn update_brightness(&mut self, level: f32) -> Result<(), Error<I2C::Error>> {
        self.check_operational()?;
        if self.brightness == Some(level) {
            return Ok(());
        }
        let code = brightness_to_code(level).ok_or(Error::OutOfRange)?;
        let current = self.read_byte(addr::LDO24_VOLTAGE)?;
        debug!("axp202: brightness {} -> code {=u8}", level, code);
        self.write_reg(addr::LDO24_VOLTAGE, with_brightness_code(current, code))?;
        self.brightness = Some(level);
        Ok(())
    }

    /// Read both presence registers in one transaction.
    pub fn read_presence(&mut self) -> Result<PresenceStatus, Error<I2C::Error>> {
        self.read_bytes::<2>(addr::POWER_STATUS).map(decode_presence)
    }

    pub fn is_battery_present(&mut self) -> Result<bool, Error<I2C::Error>> {
        let raw = self.read_byte(addr::CHARGE_STATUS)?;
        Ok(ChargeStatus::from_raw(raw).battery_present())
    }

    pub fn is_charging(&mut self) -> Result<bool, Error<I2C::Error>> {
        let raw = self.read_byte(addr::CHARGE_STATUS)?;
        Ok(ChargeStatus::from_raw(raw).charging())
    }

    pub fn is_vbus_present(&mut self) -> Result<bool, Error<I2C::Error>> {
        let raw = self.read_byte(addr::POWER_STATUS)?;
        Ok(PowerStatus::from_raw(raw).vbus_present())
    }

    pub fn is_vbus_usable(&mut self) -> Result<bool, Error<I2C::Error>> {
        let raw = self.read_byte(addr::POWER_STATUS)?;
        Ok(PowerStatus::from_raw(raw).vbus_usable())
    }

    /// Battery voltage (V).
    pub fn battery_voltage(&mut self) -> Result<f32, Error<I2C::Error>> {
        self.read_adc12(addr::BATTERY_VOLTAGE).map(battery_voltage_from_raw)
    }

    /// VBUS voltage (V).
    pub fn bus_voltage(&mut self) -> Result<f32, Error<I2C::Error>> {
        self.read_adc12(addr::VBUS_VOLTAGE).map(bus_voltage_from_raw)
    }

    /// VBUS current (mA).
    pub fn bus_current(&mut self) -> Result<f32, Error<I2C::Error>> {
        self.read_adc12(addr::VBUS_CURRENT).map(bus_current_from_raw)
    }

    /// ACIN voltage (V).
    pub fn acin_voltage(&mut self) -> Result<f32, Error<I2C::Error>> {
        self.read_adc12(addr::ACIN_VOLTAGE).map(acin_voltage_from_raw)
    }

    /// ACIN current (mA).
    pub fn acin_current(&mut self) -> Result<f32, Error<I2C::Error>> {
        self.read_adc12(addr::ACIN_CURRENT).map(acin_current_from_raw)
    }

    /// Battery charge current (mA).
    pub fn charge_current(&mut self) -> Result<f32, Error<I2C::Error>> {
        self.read_adc13(addr::CHARGE_CURRENT).map(battery_current_from_raw)
    }

    /// Battery discharge current (mA).
    pub fn discharge_current(&mut self) -> Result<f32, Error<I2C::Error>> {
        self.read_adc13(addr::DISCHARGE_CURRENT).map(battery_current_from_raw)
    }

    /// Net battery current (mA), positive while charging.
    pub fn battery_current(&mut self) -> Result<f32, Error<I2C::Error>> {
        let charge = self.charge_current()?;
        let discharge = self.discharge_current()?;
        Ok(charge - discharge)
    }

    /// IPSOUT voltage (V).
    pub fn aps_voltage(&mut self) -> Result<f32, Error<I2C::Error>> {
        self.read_adc12(addr::APS_VOLTAGE).map(aps_voltage_from_raw)
    }

    /// Die temperature (°C).
    pub fn internal_temperature(&mut self) -> Result<f32, Error<I2C::Error>> {
        self.read_adc12(addr::INTERNAL_TEMPERATURE).map(temperature_from_raw)
    }

    /// Instantaneous battery power (mW).
    pub fn battery_power(&mut self) -> Result<f32, Error<I2C::Error>> {
        let raw = self.read_bytes::<3>(addr::BATTERY_POWER)?;
        Ok(battery_power_from_raw(decode24(raw)))
    }

    /// Fuel gauge (%). Fails with `InvalidReading` when the IC marks the value invalid.
    pub fn battery_level(&mut self) -> Result<u8, Error<I2C::Error>> {
        let raw = self.read_byte(addr::FUEL_GAUGE)?;
        decode_fuel_gauge(raw).ok_or(Error::InvalidReading)
    }

    /// Set the charge current (mA), clamped to 300..=1800 in 100 mA steps.
    pub fn set_charge_current_ma(&mut self, ma: u16) -> Result<(), Error<I2C::Error>> {
        let code = charge_current_ma_to_code(ma);
        self.update_reg(addr::CHARGE_CONTROL1, 0x0F, code)
    }

    /// Enable or disable every ADC channel in ADC_ENABLE1.
    pub fn set_adc_enabled(&mut self, enabled: bool) -> Result<(), Error<I2C::Error>> {
        self.write_reg(addr::ADC_ENABLE1, if enabled { 0xFF } else { 0x00 })
    }

    /// Cut all outputs. The host loses power if it runs from DCDC3.
    pub fn power_off(&mut self) -> Result<(), Error<I2C::Error>> {
        info!("axp202: powering off");
        self.update_reg(addr::SHUTDOWN_BATTERY_DETECT, 0x80, 0x80)
    }

    /// Read a single register.
    pub fn read_byte(&mut self, reg: u8) -> Result<u8, Error<I2C::Error>> {
        let [value] = self.read_bytes::<1>(reg)?;
        Ok(value)
    }

    /// Write a single register, reporting success instead of an error so callers can
    /// decide whether the failure matters.
    pub fn write_byte(&mut self, reg: u8, value: u8) -> bool {
        let ok = self.write_reg(reg, value).is_ok();
        if !ok {
            warn!("axp202: write {=u8:#x} to reg {=u8:#x} failed", value, reg);
        }
        ok
    }

    /// Read `N` consecutive registers. All or nothing.
    pub fn read_bytes<const N: usize>(&mut self, reg: u8) -> Result<[u8; N], Error<I2C::Error>> {
        let mut buf = [0u8; N];
        self.read_regs(reg, &mut buf)?;
        Ok(buf)
    }

    /// 12-bit ADC field across two registers.
    pub fn read_adc12(&mut self, reg: u8) -> Result<u16, Error<I2C::Error>> {
        let [hi, lo] = self.read_bytes::<2>(reg)?;
        Ok(decode12(hi, lo))
    }

    /// 13-bit ADC field across two registers.
    pub fn read_adc13(&mut self, reg: u8) -> Result<u16, Error<I2C::Error>> {
        let [hi, lo] = self.read_bytes::<2>(reg)?;
        Ok(decode13(hi, lo))
    }

    /// Write a single register.
    pub fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), Error<I2C::Error>> {
        self.check_operational()?;
        self.i2c
            .write(self.address, &[reg, value])
            .map_err(Error::I2c)
    }

    /// Update masked bits in a register (read-modify-write).
    pub fn update_reg(&mut self, reg: u8, mask: u8, value: u8) -> Result<(), Error<I2C::Error>> {
        let cur = self.read_byte(reg)?;
        let new = (cur & !mask) | (value & mask);
        self.write_reg(reg, new)
    }

    /// Write a burst starting at a register.
    pub fn write_regs(&mut self, start_reg: u8, data: &[u8]) -> Result<(), Error<I2C::Error>> {
        self.check_operational()?;
        let mut buf = [0u8; 8];
        if data.len() + 1 > buf.len() {
            return Err(Error::OutOfRange);
        }
        buf[0] = start_reg;
        buf[1..=data.len()].copy_from_slice(data);
        self.i2c
            .write(self.address, &buf[..=data.len()])
            .map_err(Error::I2c)
    }

    /// Read a burst starting at a register.
    pub fn read_regs(&mut self, start_reg: u8, data: &mut [u8]) -> Result<(), Error<I2C::Error>> {
        self.check_operational()?;
        self.i2c
            .write_read(self.address, &[start_reg], data)
            .map_err(Error::I2c)
    }
}

#[cfg(feature = "async")]
impl<'a, I2C, P> Axp202<'a, I2C, P>
where
    I2C: embedded_hal_async::i2c::I2c,
    P: Publisher,
{
    /// Async version of [`Self::initialize`].
    pub async fn initialize_async(&mut self) -> Result<(), Error<I2C::Error>> {
        self.check_operational()?;

        debug!("axp202: programming configuration registers");
        for (reg, value) in INIT_SEQUENCE {
            self.write_byte_async(reg, value).await;
        }

        self.enable_rails_async().await?;

        self.write_byte_async(addr::VBUS_VALIDATION, VBUS_VALIDATION_VALUE).await;

        debug!("axp202: enabling VBUS, charge and PEK interrupts");
        for (reg, mask) in (addr::IRQ_ENABLE1..).zip(IRQ_ENABLE_MASKS) {
            self.write_byte_async(reg, mask).await;
        }
        if self.clear_interrupts_async().await.is_err() {
            warn!("axp202: clearing interrupt status failed");
        }

        if self.publish_presence_async(true, true).await.is_err() {
            warn!("axp202: initial usb/charging read failed");
        }

        let brightness = self.config.brightness;
        if self.update_brightness_async(brightness).await.is_err() {
            warn!("axp202: initial brightness not applied");
        }

        info!("axp202: initialized");
        self.log_config();
        Ok(())
    }

    async fn enable_rails_async(&mut self) -> Result<(), Error<I2C::Error>> {
        if self.program_rails_async().await.is_err() {
            self.mark_failed();
            return Err(Error::InitializationFailed);
        }
        Ok(())
    }

    async fn program_rails_async(&mut self) -> Result<(), Error<I2C::Error>> {
        let current = self.read_byte_async(addr::POWER_OUTPUT).await?;
        let value = rail_enable_value(current, self.config.disable_ldo2, self.config.disable_ldo3);
        debug!("axp202: power output {=u8:#x} -> {=u8:#x}", current, value);
        self.write_reg_async(addr::POWER_OUTPUT, value).await
    }

    async fn publish_presence_async(&mut self, usb: bool, charging: bool) -> Result<(), Error<I2C::Error>> {
        if !self.wants_presence(usb, charging) {
            return Ok(());
        }
        let presence = self.read_presence_async().await?;
        self.emit_presence(&presence, usb, charging);
        Ok(())
    }

    pub async fn clear_interrupts_async(&mut self) -> Result<(), Error<I2C::Error>> {
        self.write_regs_async(addr::IRQ_STATUS1, &IRQ_CLEAR).await
    }

    /// Async version of [`Self::sample`].
    pub async fn sample_async(&mut self) -> Result<Sample, Error<I2C::Error>> {
        self.check_operational()?;

        let mut sample = Sample::default();
        if !self.config.channels.any_sensor() {
            return Ok(sample);
        }

        let presence = match self.read_presence_async().await {
            Ok(presence) => Some(presence),
            Err(_) => {
                warn!("axp202: presence read failed, readings unavailable");
                None
            }
        };

        for sensor in SAMPLE_ORDER {
            if !self.config.channels.sensor(sensor) {
                continue;
            }
            let value = if sensor_available(sensor, presence.as_ref()) {
                self.measure_async(sensor).await
            } else {
                debug!("axp202: {} source not present", sensor);
                None
            };
            set_sample(&mut sample, sensor, value);
        }

        self.emit_sample(&sample);
        Ok(sample)
    }

    async fn measure_async(&mut self, sensor: Sensor) -> Option<f32> {
        let (reg, len) = sensor_source(sensor);
        let mut raw = [0u8; 2];
        if self.read_regs_async(reg, &mut raw[..len]).await.is_err() {
            warn!("axp202: reading {} failed", sensor);
            return None;
        }
        decode_sensor(sensor, raw)
    }

    /// Async version of [`Self::service`].
    pub async fn service_async(&mut self) -> Result<(), Error<I2C::Error>> {
        self.check_operational()?;

        if !self.take_interrupt() {
            self.tick_button();
            return Ok(());
        }

        trace!("axp202: servicing interrupt");
        let serviced = self.service_pending_async().await;
        self.finish_service(serviced)
    }

    async fn service_pending_async(&mut self) -> Result<PendingEvents, Error<I2C::Error>> {
        let status = self.read_bytes_async::<3>(addr::IRQ_STATUS1).await?;
        let events = PendingEvents::from_status(status);
        self.publish_presence_async(events.usb_changed, events.charging_changed)
            .await?;
        self.write_regs_async(addr::IRQ_STATUS1, &acknowledge(status))
            .await?;
        Ok(events)
    }

    /// Async version of [`Self::set_rail`].
    pub async fn set_rail_async(&mut self, rail: Rail, enabled: bool) -> Result<(), Error<I2C::Error>> {
        self.check_operational()?;
        debug!("axp202: {} enabled={}", rail, enabled);
        let mask = rail.mask();
        self.update_reg_async(addr::POWER_OUTPUT, mask, if enabled { mask } else { 0 })
            .await
    }

    /// Async version of [`Self::update_brightness`].
    pub async fn update_brightness_async(&mut self, level: f32) -> Result<(), Error<I2C::Error>> {
        self.check_operational()?;
        if self.brightness == Some(level) {
            return Ok(());
        }
        let code = brightness_to_code(level).ok_or(Error::OutOfRange)?;
        let current = self.read_byte_async(addr::LDO24_VOLTAGE).await?;
        self.write_reg_async(addr::LDO24_VOLTAGE, with_brightness_code(current, code))
            .await?;
        self.brightness = Some(level);
        Ok(())
    }

    pub async fn read_presence_async(&mut self) -> Result<PresenceStatus, Error<I2C::Error>> {
        self.read_bytes_async::<2>(addr::POWER_STATUS)
            .await
            .map(decode_presence)
    }

    pub async fn read_byte_async(&mut self, reg: u8) -> Result<u8, Error<I2C::Error>> {
        let [value] = self.read_bytes_async::<1>(reg).await?;
        Ok(value)
    }

    pub async fn write_byte_async(&mut self, reg: u8, value: u8) -> bool {
        let ok = self.write_reg_async(reg, value).await.is_ok();
        if !ok {
            warn!("axp202: write {=u8:#x} to reg {=u8:#x} failed", value, reg);
        }
        ok
    }

    pub async fn read_bytes_async<const N: usize>(&mut self, reg: u8) -> Result<[u8; N], Error<I2C::Error>> {
        let mut buf = [0u8; N];
        self.read_regs_async(reg, &mut buf).await?;
        Ok(buf)
    }

    pub async fn write_reg_async(&mut self, reg: u8, value: u8) -> Result<(), Error<I2C::Error>> {
        self.check_operational()?;
        self.i2c
            .write(self.address, &[reg, value])
            .await
            .map_err(Error::I2c)
    }

    pub async fn update_reg_async(&mut self, reg: u8, mask: u8, value: u8) -> Result<(), Error<I2C::Error>> {
        let cur = self.read_byte_async(reg).await?;
        let new = (cur & !mask) | (value & mask);
        self.write_reg_async(reg, new).await
    }

    pub async fn write_regs_async(&mut self, start_reg: u8, data: &[u8]) -> Result<(), Error<I2C::Error>> {
        self.check_operational()?;
        let mut buf = [0u8; 8];
        if data.len() + 1 > buf.len() {
            return Err(Error::OutOfRange);
        }
        buf[0] = start_reg;
        buf[1..=data.len()].copy_from_slice(data);
        self.i2c
            .write(self.address, &buf[..=data.len()])
            .await
            .map_err(Error::I2c)
    }

    pub async fn read_regs_async(&mut self, start_reg: u8, data: &mut [u8]) -> Result<(), Error<I2C::Error>> {
        self.check_operational()?;
        self.i2c
            .write_read(self.address, &[start_reg], data)
            .await
            .map_err(Error::I2c)
    }
}
