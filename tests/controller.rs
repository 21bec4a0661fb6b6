mod common;

use axp202_rs::button::ButtonState;
use axp202_rs::{Axp202, BinarySensor, Config, Error, InterruptFlag, Rail, Sensor};
use common::{Event, FakeAxp, Recorder, approx};
use embedded_hal::i2c::ErrorKind;

type Driver = Axp202<'static, FakeAxp, Recorder>;

/// Initialize over `fake` and drop the events published during setup.
fn initialized(fake: &FakeAxp, flag: Option<&'static InterruptFlag>) -> Driver {
    let mut driver = Axp202::new(fake.clone(), Recorder::default(), Config::default());
    if let Some(flag) = flag {
        driver = driver.with_interrupt(flag);
    }
    driver.initialize().unwrap();
    driver.publisher_mut().clear();
    driver
}

fn button_states(driver: &Driver) -> Vec<bool> {
    driver.publisher().states(BinarySensor::Button)
}

#[test]
fn initialize_enables_rails_and_clears_every_irq_group() {
    let fake = FakeAxp::new();
    fake.set_reg(0x12, 0x1B);
    fake.set_reg(0x28, 0x0C);
    for group in 0..5 {
        fake.raise_irq(group, 0xFF);
    }

    let _driver = initialized(&fake, None);

    assert_eq!(fake.reg(0x12), 0x46);
    assert_eq!(fake.reg(0x28), 0xCC);
    let enables: Vec<u8> = (0x40..=0x44).map(|r| fake.reg(r)).collect();
    assert_eq!(enables, vec![0x0C, 0x0C, 0x03, 0x00, 0x00]);
    for reg in 0x48..=0x4C {
        assert_eq!(fake.reg(reg), 0, "IRQ status {reg:#x} not cleared");
    }
}

#[test]
fn initialize_honours_disabled_rails() {
    let fake = FakeAxp::new();
    fake.set_reg(0x12, 0xFF);
    let config = Config {
        disable_ldo2: true,
        disable_ldo3: true,
        ..Config::default()
    };
    let mut driver = Axp202::new(fake.clone(), (), config);
    driver.initialize().unwrap();
    // Only DCDC3 and reserved bits 7/5 survive.
    assert_eq!(fake.reg(0x12), 0xA2);
}

#[test]
fn initialize_publishes_usb_and_charging_once() {
    let fake = FakeAxp::new();
    fake.set_vbus(true, true);
    fake.set_battery(true, false);
    let mut driver = Axp202::new(fake.clone(), Recorder::default(), Config::default());
    driver.initialize().unwrap();
    assert_eq!(
        driver.publisher().events,
        vec![
            Event::State(BinarySensor::Usb, true),
            Event::State(BinarySensor::Charging, false),
        ]
    );
}

#[test]
fn battery_absent_always_samples_unavailable() {
    let fake = FakeAxp::new();
    fake.set_vbus(true, true);
    fake.set_battery(false, false);
    // Stale ADC contents must never leak through.
    fake.set_reg(0x5A, 0x3E);
    fake.set_reg(0x5B, 0x08);
    fake.set_reg(0x78, 0x3E);
    fake.set_reg(0x79, 0x08);
    fake.set_reg(0x7C, 0x1F);
    fake.set_reg(0x7D, 0x08);
    fake.set_reg(0xB9, 0x55);
    let mut driver = initialized(&fake, None);

    for _ in 0..3 {
        let sample = driver.sample().unwrap();
        assert_eq!(sample.battery_voltage, None);
        assert_eq!(sample.discharge_current, None);
        assert_eq!(sample.battery_level, None);
        assert!(approx(sample.bus_voltage.unwrap(), 1.7));
    }
    assert_eq!(driver.publisher().readings(Sensor::BatteryVoltage), vec![None; 3]);
    assert_eq!(driver.publisher().readings(Sensor::BatteryLevel), vec![None; 3]);

    fake.set_battery(true, false);
    let sample = driver.sample().unwrap();
    assert!(approx(sample.battery_voltage.unwrap(), 1.1));
    assert!(approx(sample.discharge_current.unwrap(), 500.0));
    assert_eq!(sample.battery_level, Some(85.0));
}

#[test]
fn bus_absent_reports_bus_voltage_unavailable() {
    let fake = FakeAxp::new();
    fake.set_vbus(false, false);
    fake.set_reg(0x5A, 0xFF);
    let mut driver = initialized(&fake, None);
    assert_eq!(driver.sample().unwrap().bus_voltage, None);
}

#[test]
fn discharge_current_hidden_while_charging() {
    let fake = FakeAxp::new();
    fake.set_battery(true, true);
    fake.set_reg(0x78, 0x3E);
    fake.set_reg(0x79, 0x08);
    fake.set_reg(0x7C, 0x1F);
    let mut driver = initialized(&fake, None);
    let sample = driver.sample().unwrap();
    assert!(approx(sample.battery_voltage.unwrap(), 1.1));
    assert_eq!(sample.discharge_current, None);
}

#[test]
fn invalid_fuel_gauge_values_are_unavailable() {
    let fake = FakeAxp::new();
    fake.set_battery(true, false);
    let mut driver = initialized(&fake, None);

    for (raw, expected) in [(0x00, Some(0.0)), (0x64, Some(100.0)), (0xFF, None), (0x65, None), (0x80, None)] {
        fake.set_reg(0xB9, raw);
        assert_eq!(driver.sample().unwrap().battery_level, expected, "raw {raw:#x}");
    }
}

#[test]
fn single_press_yields_one_press_and_one_release() {
    static FLAG: InterruptFlag = InterruptFlag::new();
    let fake = FakeAxp::new();
    let mut driver = initialized(&fake, Some(&FLAG));
    let hold = Config::default().button_hold_ticks;

    fake.raise_irq(2, 0x02);
    FLAG.signal();
    driver.service().unwrap();
    assert_eq!(button_states(&driver), vec![true]);
    assert_eq!(driver.button_state(), ButtonState::Held { remaining: hold });
    assert_eq!(fake.reg(0x4A), 0);

    let before = fake.transactions();
    for _ in 1..hold {
        driver.service().unwrap();
        assert_eq!(button_states(&driver), vec![true]);
    }
    driver.service().unwrap();
    assert_eq!(button_states(&driver), vec![true, false]);
    assert_eq!(driver.button_state(), ButtonState::Idle);

    for _ in 0..3 {
        driver.service().unwrap();
    }
    assert_eq!(button_states(&driver), vec![true, false]);
    // Ticks without an interrupt never touch the bus.
    assert_eq!(fake.transactions(), before);
}

#[test]
fn press_while_held_rearms_without_second_press() {
    static FLAG: InterruptFlag = InterruptFlag::new();
    let fake = FakeAxp::new();
    let mut driver = initialized(&fake, Some(&FLAG));
    let hold = Config::default().button_hold_ticks;

    fake.raise_irq(2, 0x02);
    FLAG.signal();
    driver.service().unwrap();
    driver.service().unwrap();
    driver.service().unwrap();

    // Long press edge while still held.
    fake.raise_irq(2, 0x01);
    FLAG.signal();
    driver.service().unwrap();
    assert_eq!(driver.button_state(), ButtonState::Held { remaining: hold });

    for _ in 0..hold {
        driver.service().unwrap();
    }
    assert_eq!(button_states(&driver), vec![true, false]);
}

#[test]
fn service_without_interrupt_line_only_ticks() {
    let fake = FakeAxp::new();
    let mut driver = initialized(&fake, None);
    fake.raise_irq(2, 0x02);
    let before = fake.transactions();
    for _ in 0..10 {
        driver.service().unwrap();
    }
    assert_eq!(fake.transactions(), before);
    assert!(button_states(&driver).is_empty());
}

#[test]
fn usb_transition_forces_charging_recheck() {
    static FLAG: InterruptFlag = InterruptFlag::new();
    let fake = FakeAxp::new();
    let mut driver = initialized(&fake, Some(&FLAG));

    fake.set_vbus(true, true);
    fake.set_battery(true, true);
    fake.raise_irq(0, 0x08);
    FLAG.signal();
    driver.service().unwrap();

    assert_eq!(
        driver.publisher().events,
        vec![
            Event::State(BinarySensor::Usb, true),
            Event::State(BinarySensor::Charging, true),
        ]
    );
    assert_eq!(fake.reg(0x48), 0);
    assert!(!FLAG.is_pending());
}

#[test]
fn charge_event_publishes_only_charging() {
    static FLAG: InterruptFlag = InterruptFlag::new();
    let fake = FakeAxp::new();
    let mut driver = initialized(&fake, Some(&FLAG));

    fake.set_battery(true, false);
    fake.raise_irq(1, 0x04);
    FLAG.signal();
    driver.service().unwrap();

    assert_eq!(
        driver.publisher().events,
        vec![Event::State(BinarySensor::Charging, false)]
    );
    assert_eq!(fake.reg(0x49), 0);
}

#[test]
fn charging_requires_battery_presence() {
    static FLAG: InterruptFlag = InterruptFlag::new();
    let fake = FakeAxp::new();
    let mut driver = initialized(&fake, Some(&FLAG));

    // Charge bit without a battery.
    fake.set_reg(0x01, 0x40);
    fake.raise_irq(1, 0x08);
    FLAG.signal();
    driver.service().unwrap();
    assert_eq!(driver.publisher().states(BinarySensor::Charging), vec![false]);
}

#[test]
fn unrelated_irq_groups_are_cleared_too() {
    static FLAG: InterruptFlag = InterruptFlag::new();
    let fake = FakeAxp::new();
    let mut driver = initialized(&fake, Some(&FLAG));

    fake.raise_irq(0, 0xF3);
    fake.raise_irq(2, 0xFC);
    fake.raise_irq(3, 0x80);
    fake.raise_irq(4, 0x01);
    FLAG.signal();
    driver.service().unwrap();

    for reg in 0x48..=0x4C {
        assert_eq!(fake.reg(reg), 0, "IRQ status {reg:#x} not cleared");
    }
    assert!(driver.publisher().events.is_empty());
}

#[test]
fn edge_during_service_is_seen_next_tick() {
    static FLAG: InterruptFlag = InterruptFlag::new();
    let fake = FakeAxp::new();
    let mut driver = initialized(&fake, Some(&FLAG));
    fake.signal_on_irq_read(&FLAG);

    FLAG.signal();
    driver.service().unwrap();
    assert!(FLAG.is_pending());

    let before = fake.transactions();
    driver.service().unwrap();
    assert!(fake.transactions() > before);
}

#[test]
fn press_latched_after_status_read_is_kept_for_next_tick() {
    static FLAG: InterruptFlag = InterruptFlag::new();
    let fake = FakeAxp::new();
    let mut driver = initialized(&fake, Some(&FLAG));

    fake.set_battery(true, false);
    fake.raise_irq(1, 0x04);
    fake.latch_after_irq_read(&FLAG, 2, 0x02);
    FLAG.signal();
    driver.service().unwrap();

    // The charge event was acknowledged, the late press was not.
    assert_eq!(fake.reg(0x49), 0);
    assert_eq!(fake.reg(0x4A), 0x02);
    assert!(FLAG.is_pending());
    assert!(button_states(&driver).is_empty());

    driver.service().unwrap();
    assert_eq!(button_states(&driver), vec![true]);
    assert_eq!(fake.reg(0x4A), 0);
    assert!(!FLAG.is_pending());
}

#[test]
fn usb_state_follows_usable_bit_only() {
    static FLAG: InterruptFlag = InterruptFlag::new();
    let fake = FakeAxp::new();
    let mut driver = initialized(&fake, Some(&FLAG));

    fake.set_vbus(true, false);
    fake.raise_irq(0, 0x08);
    FLAG.signal();
    driver.service().unwrap();
    assert_eq!(driver.publisher().states(BinarySensor::Usb), vec![false]);

    fake.set_vbus(true, true);
    fake.raise_irq(0, 0x08);
    FLAG.signal();
    driver.service().unwrap();
    assert_eq!(driver.publisher().states(BinarySensor::Usb), vec![false, true]);
}

#[test]
fn failed_service_keeps_interrupt_pending() {
    static FLAG: InterruptFlag = InterruptFlag::new();
    let fake = FakeAxp::new();
    let mut driver = initialized(&fake, Some(&FLAG));

    fake.raise_irq(2, 0x02);
    fake.fail_reg(Some(0x48));
    FLAG.signal();
    assert_eq!(driver.service(), Err(Error::I2c(ErrorKind::Other)));
    assert!(FLAG.is_pending());
    assert!(button_states(&driver).is_empty());

    fake.fail_reg(None);
    driver.service().unwrap();
    assert!(!FLAG.is_pending());
    assert_eq!(button_states(&driver), vec![true]);
}

#[test]
fn rail_toggle_preserves_other_bits() {
    let fake = FakeAxp::new();
    let mut driver = initialized(&fake, None);
    fake.set_reg(0x12, 0xA3);

    driver.set_ldo2(true).unwrap();
    assert_eq!(fake.reg(0x12), 0xA7);
    driver.set_ldo2(false).unwrap();
    assert_eq!(fake.reg(0x12), 0xA3);

    driver.set_rail(Rail::Ldo3, true).unwrap();
    assert_eq!(fake.reg(0x12), 0xE3);
    driver.set_rail(Rail::Ldo3, false).unwrap();
    assert_eq!(fake.reg(0x12), 0xA3);

    driver.set_ldo4(true).unwrap();
    assert_eq!(fake.reg(0x12), 0xAB);
    driver.set_ldo4(false).unwrap();
    assert_eq!(fake.reg(0x12), 0xA3);
}

#[test]
fn brightness_writes_only_ldo2_nibble_and_skips_repeats() {
    let fake = FakeAxp::new();
    fake.set_reg(0x28, 0x0C);
    let mut driver = initialized(&fake, None);
    assert_eq!(fake.reg(0x28), 0xCC);

    driver.update_brightness(0.0).unwrap();
    assert_eq!(fake.reg(0x28), 0x7C);

    let before = fake.transactions();
    driver.update_brightness(0.0).unwrap();
    assert_eq!(fake.transactions(), before);

    driver.update_brightness(0.5).unwrap();
    assert_eq!(fake.reg(0x28), 0x9C);

    driver.update_brightness(7.0).unwrap();
    assert_eq!(fake.reg(0x28), 0xCC);

    assert_eq!(driver.update_brightness(f32::NAN), Err(Error::OutOfRange));
    assert_eq!(driver.update_brightness(-0.1), Err(Error::OutOfRange));
    assert_eq!(fake.reg(0x28), 0xCC);
}

#[test]
fn disabled_channels_are_not_read_or_published() {
    let fake = FakeAxp::new();
    fake.set_battery(true, false);
    let mut config = Config::default();
    config.channels.bus_voltage = false;
    config.channels.battery_level = false;
    config.channels.usb = false;
    let mut driver = Axp202::new(fake.clone(), Recorder::default(), config);
    driver.initialize().unwrap();
    assert_eq!(driver.publisher().states(BinarySensor::Usb), Vec::<bool>::new());

    driver.sample().unwrap();
    assert!(driver.publisher().readings(Sensor::BusVoltage).is_empty());
    assert!(driver.publisher().readings(Sensor::BatteryLevel).is_empty());
    assert_eq!(driver.publisher().readings(Sensor::BatteryVoltage).len(), 1);
}
