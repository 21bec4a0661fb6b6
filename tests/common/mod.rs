#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use axp202_rs::{BinarySensor, InterruptFlag, Publisher, Sensor};
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};

pub const ADDR: u8 = 0x35;

/// Register file behind a [`FakeAxp`] handle.
pub struct Registers {
    pub regs: [u8; 256],
    pub transactions: usize,
    /// Signalled whenever IRQ_STATUS1 is read, to model an edge arriving mid-service.
    pub irq_during_read: Option<&'static InterruptFlag>,
    /// Fail every transaction addressing this register.
    pub fail_reg: Option<u8>,
    /// One-shot: after the next IRQ_STATUS1 burst read, latch `bits` in `reg` and signal.
    pub latch_after_irq_read: Option<(&'static InterruptFlag, u8, u8)>,
}

/// Register-file stand-in for the AXP202. IRQ status registers are write-1-to-clear.
/// Clones share the same registers, so a test keeps one handle while the driver owns another.
#[derive(Clone)]
pub struct FakeAxp {
    inner: Rc<RefCell<Registers>>,
}

impl FakeAxp {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Registers {
                regs: [0; 256],
                transactions: 0,
                irq_during_read: None,
                fail_reg: None,
                latch_after_irq_read: None,
            })),
        }
    }

    pub fn reg(&self, reg: u8) -> u8 {
        self.inner.borrow().regs[reg as usize]
    }

    pub fn set_reg(&self, reg: u8, value: u8) {
        self.inner.borrow_mut().regs[reg as usize] = value;
    }

    pub fn transactions(&self) -> usize {
        self.inner.borrow().transactions
    }

    pub fn fail_reg(&self, reg: Option<u8>) {
        self.inner.borrow_mut().fail_reg = reg;
    }

    pub fn signal_on_irq_read(&self, flag: &'static InterruptFlag) {
        self.inner.borrow_mut().irq_during_read = Some(flag);
    }

    /// Model an edge whose status bit latches just after the driver's status read.
    pub fn latch_after_irq_read(&self, flag: &'static InterruptFlag, group: u8, bits: u8) {
        self.inner.borrow_mut().latch_after_irq_read = Some((flag, 0x48 + group, bits));
    }

    pub fn set_battery(&self, present: bool, charging: bool) {
        let mut status = self.reg(0x01) & !0x60;
        if present {
            status |= 0x20;
        }
        if charging {
            status |= 0x40;
        }
        self.set_reg(0x01, status);
    }

    pub fn set_vbus(&self, present: bool, usable: bool) {
        let mut status = self.reg(0x00) & !0x30;
        if present {
            status |= 0x20;
        }
        if usable {
            status |= 0x10;
        }
        self.set_reg(0x00, status);
    }

    /// Latch bits in IRQ_STATUS{group + 1}.
    pub fn raise_irq(&self, group: u8, bits: u8) {
        let reg = 0x48 + group;
        self.set_reg(reg, self.reg(reg) | bits);
    }
}

impl ErrorType for FakeAxp {
    type Error = ErrorKind;
}

impl I2c for FakeAxp {
    fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
        assert_eq!(address, ADDR);
        let mut state = self.inner.borrow_mut();
        state.transactions += 1;
        let mut pointer: Option<u8> = None;
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => {
                    let (&reg, data) = bytes.split_first().expect("register address");
                    if state.fail_reg == Some(reg) {
                        return Err(ErrorKind::Other);
                    }
                    for (i, value) in data.iter().enumerate() {
                        let target = reg as usize + i;
                        if (0x48..=0x4C).contains(&target) {
                            state.regs[target] &= !value;
                        } else {
                            state.regs[target] = *value;
                        }
                    }
                    pointer = Some(reg);
                }
                Operation::Read(buf) => {
                    let reg = pointer.expect("read without register pointer");
                    for (i, slot) in buf.iter_mut().enumerate() {
                        *slot = state.regs[reg as usize + i];
                    }
                    if reg == 0x48 {
                        if let Some(flag) = state.irq_during_read {
                            flag.signal();
                        }
                        if let Some((flag, target, bits)) = state.latch_after_irq_read.take() {
                            state.regs[target as usize] |= bits;
                            flag.signal();
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Event {
    Reading(Sensor, Option<f32>),
    State(BinarySensor, bool),
}

#[derive(Default)]
pub struct Recorder {
    pub events: Vec<Event>,
}

impl Recorder {
    pub fn states(&self, sensor: BinarySensor) -> Vec<bool> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::State(s, v) if *s == sensor => Some(*v),
                _ => None,
            })
            .collect()
    }

    pub fn readings(&self, sensor: Sensor) -> Vec<Option<f32>> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Reading(s, v) if *s == sensor => Some(*v),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Publisher for Recorder {
    fn publish_reading(&mut self, sensor: Sensor, value: Option<f32>) {
        self.events.push(Event::Reading(sensor, value));
    }

    fn publish_state(&mut self, sensor: BinarySensor, state: bool) {
        self.events.push(Event::State(sensor, state));
    }
}

pub fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}
