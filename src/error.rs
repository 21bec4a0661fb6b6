//! Error definitions for the AXP202 driver.

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<I2cError> {
    /// Underlying I2C transaction failed (NACK, arbitration loss, timeout...).
    I2c(I2cError),
    /// The rail-enable register could not be programmed during initialization.
    /// The controller stays failed and refuses further bus traffic.
    InitializationFailed,
    /// Provided parameter was outside its valid domain.
    OutOfRange,
    /// The IC flagged the reading as invalid (fuel gauge above 100 % or invalid bit set).
    InvalidReading,
}

impl<I2cError: core::fmt::Debug> core::fmt::Display for Error<I2cError> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::I2c(e) => write!(f, "I2C error: {:?}", e),
            Error::InitializationFailed => write!(f, "controller failed to initialize"),
            Error::OutOfRange => write!(f, "parameter out of range"),
            Error::InvalidReading => write!(f, "IC reported an invalid reading"),
        }
    }
}
