//! Output sinks fed by the controller.

use crate::data_types::{BinarySensor, Sensor};

/// Receives decoded readings and state changes.
///
/// Implemented by the host framework (sensor entities, channels, a display task...).
/// Only channels enabled in [`crate::data_types::Channels`] are ever published.
pub trait Publisher {
    /// Publish a numeric reading. `None` is the "unavailable" state and must not be
    /// shown as a number.
    fn publish_reading(&mut self, sensor: Sensor, value: Option<f32>);

    /// Publish a boolean state.
    fn publish_state(&mut self, sensor: BinarySensor, state: bool);
}

/// Discards everything.
impl Publisher for () {
    fn publish_reading(&mut self, _sensor: Sensor, _value: Option<f32>) {}

    fn publish_state(&mut self, _sensor: BinarySensor, _state: bool) {}
}

impl<P: Publisher + ?Sized> Publisher for &mut P {
    fn publish_reading(&mut self, sensor: Sensor, value: Option<f32>) {
        (**self).publish_reading(sensor, value)
    }

    fn publish_state(&mut self, sensor: BinarySensor, state: bool) {
        (**self).publish_state(sensor, state)
    }
}
