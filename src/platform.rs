use embedded_hal::digital::PinState;

/// The analog unit a sensor is wired to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdcUnit {
    /// The first analog unit, index 0.
    Unit1,
    /// The second analog unit, index 1.
    Unit2,
}

impl AdcUnit {
    /// Maps a zero-based unit index to a unit. Index 0 is [`AdcUnit::Unit1`]; any other index
    /// selects [`AdcUnit::Unit2`].
    pub fn from_index(index: u8) -> AdcUnit {
        if index == 0 {
            AdcUnit::Unit1
        } else {
            AdcUnit::Unit2
        }
    }

    /// The zero-based index of this unit.
    pub fn index(&self) -> u8 {
        match self {
            AdcUnit::Unit1 => 0,
            AdcUnit::Unit2 => 1,
        }
    }
}

/// Input attenuation of an analog channel. Higher attenuation widens the measurable voltage
/// range at the cost of resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attenuation {
    /// No attenuation.
    Db0,
    /// 2.5 dB attenuation.
    Db2_5,
    /// 6 dB attenuation.
    Db6,
    /// 11 dB attenuation. Covers the full output swing of the sensor on a 3.3V board.
    Db11,
}

/// Services the air quality driver needs from the board.
///
/// Implementations own the actual peripherals. Every fallible call reports the platform's own
/// error type, which the driver hands back to the caller untouched inside
/// [`crate::grove_aqs::Error::Wrapped`].
pub trait Platform {
    /// Error reported by any platform call.
    type Error: core::fmt::Debug;
    /// An acquired analog unit. Released with [`Platform::delete_unit`].
    type Unit;
    /// An acquired calibration scheme. Released with [`Platform::delete_calibration`].
    type Calibration;

    /// Configures `pin` as a push-pull output with pull-up, pull-down and interrupts disabled.
    fn configure_output(&mut self, pin: u8) -> Result<(), Self::Error>;

    /// Drives an output configured by [`Platform::configure_output`].
    fn set_output(&mut self, pin: u8, state: PinState) -> Result<(), Self::Error>;

    /// Acquires `unit` for one-shot conversions.
    fn new_unit(&mut self, unit: AdcUnit) -> Result<Self::Unit, Self::Error>;

    /// Configures `channel` of an acquired unit with the given attenuation and the platform's
    /// default bit width.
    fn configure_channel(
        &mut self,
        unit: &mut Self::Unit,
        channel: u8,
        attenuation: Attenuation,
    ) -> Result<(), Self::Error>;

    /// Starts or polls a one-shot conversion. Returns `nb::Error::WouldBlock` until the
    /// conversion completes.
    fn read_raw(&mut self, unit: &mut Self::Unit, channel: u8) -> nb::Result<u16, Self::Error>;

    /// Releases an acquired unit. The handle is only borrowed so a failed release can be retried.
    fn delete_unit(&mut self, unit: &mut Self::Unit) -> Result<(), Self::Error>;

    /// Builds a calibration scheme for the unit at the given attenuation and the default bit
    /// width.
    fn create_calibration(
        &mut self,
        unit: AdcUnit,
        attenuation: Attenuation,
    ) -> Result<Self::Calibration, Self::Error>;

    /// Converts a raw reading to millivolts using a calibration scheme.
    fn raw_to_millivolts(
        &mut self,
        calibration: &Self::Calibration,
        raw: u16,
    ) -> Result<u32, Self::Error>;

    /// Releases a calibration scheme.
    fn delete_calibration(&mut self, calibration: Self::Calibration) -> Result<(), Self::Error>;
}
