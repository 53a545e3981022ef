use core::convert::TryFrom;
use core::fmt;
use embedded_hal::digital::PinState;
use log::{error, info, warn};

use crate::platform::{AdcUnit, Attenuation, Platform};

/// The largest raw value of a 12-bit conversion. Used to scale readings when no calibration
/// scheme is available.
pub const FULL_SCALE: u32 = 4095;

#[derive(Debug, PartialEq)]
pub enum Error<TIoError> {
    /// Wrapped error from the platform.
    Wrapped(TIoError),
    /// Invalid argument was provided.
    InvalidArgument,
    /// The driver is not in a state that allows this operation. Check that it was initialized.
    InvalidState,
    /// Power control was requested, but no power pin is configured.
    NotSupported,
}

impl<TIoError> From<TIoError> for Error<TIoError> {
    fn from(error: TIoError) -> Error<TIoError> {
        Error::Wrapped(error)
    }
}

/// Air quality bands, ordered from cleanest to most polluted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Quality {
    /// At or below the fresh threshold.
    Fresh = 0,
    /// Above fresh, at or below the good threshold.
    Good,
    /// Above good, at or below the moderate threshold.
    Moderate,
    /// Above moderate, at or below the poor threshold.
    Poor,
    /// Above the poor threshold.
    VeryPoor,
}

const UNKNOWN_LABEL: &str = "Unknown";

impl Quality {
    /// A short human-readable name for this band.
    pub fn label(&self) -> &'static str {
        match self {
            Quality::Fresh => "Fresh",
            Quality::Good => "Good",
            Quality::Moderate => "Moderate",
            Quality::Poor => "Poor",
            Quality::VeryPoor => "Very Poor",
        }
    }

    /// A suggestion for the occupants of the room, suitable for display next to a reading.
    pub fn advice(&self) -> &'static str {
        match self {
            Quality::Fresh => "Air is fresh and clean!",
            Quality::Good => "Air quality is good, no action needed.",
            Quality::Moderate => "Consider ventilation to improve air quality.",
            Quality::Poor => "Poor air quality. Open windows or use air purifier.",
            Quality::VeryPoor => "Very poor air quality! Immediate ventilation needed.",
        }
    }

    /// The zero-based position of this band, with [`Quality::Fresh`] at 0.
    pub fn index(&self) -> u8 {
        *self as u8
    }
}

impl TryFrom<u8> for Quality {
    type Error = u8;

    /// Maps a band index back to its band. Unmapped indices are returned as the error.
    fn try_from(value: u8) -> Result<Quality, u8> {
        match value {
            0 => Ok(Quality::Fresh),
            1 => Ok(Quality::Good),
            2 => Ok(Quality::Moderate),
            3 => Ok(Quality::Poor),
            4 => Ok(Quality::VeryPoor),
            _ => Err(value),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Returns the label of the band with the given index, or `"Unknown"` if no band has that index.
pub fn quality_to_label(index: u8) -> &'static str {
    match Quality::try_from(index) {
        Ok(quality) => quality.label(),
        Err(_) => UNKNOWN_LABEL,
    }
}

/// Inclusive upper bounds, in millivolts, of the first four quality bands. Anything above
/// `poor_mv` is [`Quality::VeryPoor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Thresholds {
    /// Upper bound of [`Quality::Fresh`].
    pub fresh_mv: u32,
    /// Upper bound of [`Quality::Good`].
    pub good_mv: u32,
    /// Upper bound of [`Quality::Moderate`].
    pub moderate_mv: u32,
    /// Upper bound of [`Quality::Poor`].
    pub poor_mv: u32,
}

impl Thresholds {
    /// Whether each bound is at least as large as the one before it.
    pub fn is_ascending(&self) -> bool {
        self.fresh_mv <= self.good_mv
            && self.good_mv <= self.moderate_mv
            && self.moderate_mv <= self.poor_mv
    }
}

/// Options to configure the air quality driver.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Options {
    /// The analog unit the sensor output is wired to.
    pub unit: AdcUnit,
    /// The channel of `unit` the sensor output is wired to.
    pub channel: u8,
    /// Input attenuation of the channel.
    pub attenuation: Attenuation,
    /// Reference voltage in millivolts. Only used when the platform cannot provide a calibration
    /// scheme, in which case readings are scaled linearly against [`FULL_SCALE`]. Must not be 0.
    pub reference_mv: u32,
    /// Band boundaries. Must be non-decreasing.
    pub thresholds: Thresholds,
    /// Whether the sensor's supply is switched by a digital output.
    pub power_control: bool,
    /// The digital output switching the sensor's supply. Ignored unless `power_control` is set.
    pub power_pin: Option<u8>,
}

impl Options {
    /// The pin used for power control, if power control is enabled and a pin is set.
    pub fn power_pin(&self) -> Option<u8> {
        if self.power_control {
            self.power_pin
        } else {
            None
        }
    }

    fn is_valid(&self) -> bool {
        self.reference_mv > 0 && self.thresholds.is_ascending()
    }
}

/// Options for a Grove sensor on channel 6 of the first analog unit of a 3.3V board, powered
/// permanently.
pub const DEFAULT_OPTIONS: Options = Options {
    unit: AdcUnit::Unit1,
    channel: 6,
    attenuation: Attenuation::Db11,
    reference_mv: 3300,
    thresholds: Thresholds {
        fresh_mv: 700,
        good_mv: 1000,
        moderate_mv: 1500,
        poor_mv: 2000,
    },
    power_control: false,
    power_pin: None,
};

impl Default for Options {
    fn default() -> Options {
        DEFAULT_OPTIONS
    }
}

/// A single sample read from the sensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reading {
    /// The raw conversion result.
    pub raw: u16,
    /// The sensor output voltage in millivolts.
    pub millivolts: u32,
    pub quality: Quality,
}

/// Scales a raw 12-bit reading linearly to millivolts, truncating.
///
/// `millivolts = raw * reference_mv / 4095`
pub fn raw_to_millivolts(raw: u16, reference_mv: u32) -> u32 {
    let millivolts = raw as u64 * reference_mv as u64 / FULL_SCALE as u64;
    u32::try_from(millivolts).unwrap_or(u32::MAX)
}

/// Finds the first band whose inclusive upper bound is at least `millivolts`.
pub fn classify(millivolts: u32, thresholds: &Thresholds) -> Quality {
    if millivolts <= thresholds.fresh_mv {
        Quality::Fresh
    } else if millivolts <= thresholds.good_mv {
        Quality::Good
    } else if millivolts <= thresholds.moderate_mv {
        Quality::Moderate
    } else if millivolts <= thresholds.poor_mv {
        Quality::Poor
    } else {
        Quality::VeryPoor
    }
}

/// How readings are converted to millivolts.
#[derive(Debug)]
pub enum Calibration<TCalibration> {
    /// Readings are converted by the platform's calibration scheme.
    Calibrated(TCalibration),
    /// Readings are scaled linearly with [`raw_to_millivolts`].
    Uncalibrated,
}

struct Session<TUnit, TCalibration> {
    options: Options,
    unit: TUnit,
    calibration: Calibration<TCalibration>,
}

/// A driver for the Grove analog air quality sensor.
///
/// The driver owns its platform. It starts uninitialized; call [`GroveAqs::init`] before reading,
/// and [`GroveAqs::deinit`] to release the analog unit and calibration scheme again.
pub struct GroveAqs<TPlatform>
where
    TPlatform: Platform,
{
    platform: TPlatform,
    power_pin: Option<u8>,
    session: Option<Session<TPlatform::Unit, TPlatform::Calibration>>,
}

impl<TPlatform, TIoError> GroveAqs<TPlatform>
where
    TPlatform: Platform<Error = TIoError>,
    TIoError: fmt::Debug,
{
    /// Constructs an uninitialized driver on top of the given platform.
    pub fn new(platform: TPlatform) -> GroveAqs<TPlatform> {
        GroveAqs {
            platform: platform,
            power_pin: None,
            session: None,
        }
    }

    /// Initializes the sensor.
    ///
    /// Resources are acquired in this order:
    ///
    /// 1. If power control is enabled and a pin is set, the pin is configured as an output and
    ///    driven high.
    /// 2. The analog unit is acquired and the channel is configured.
    /// 3. A calibration scheme is requested. If the platform cannot provide one, a warning is
    ///    logged and readings fall back to linear scaling against `options.reference_mv`.
    ///
    /// If step 2 fails, the unit is released and the power pin is driven low again before the
    /// platform error is returned.
    ///
    /// Initializing an already-initialized driver deinitializes it first. A failure to do so is
    /// logged and the old resources are abandoned.
    ///
    /// This returns [`Error::InvalidArgument`] if `options.reference_mv` is 0 or the thresholds
    /// are not in non-decreasing order. The driver is left untouched in that case.
    pub fn init(&mut self, options: Options) -> Result<(), Error<TIoError>> {
        if !options.is_valid() {
            error!("Invalid options: {:?}", options);
            return Err(Error::InvalidArgument);
        }

        if self.session.is_some() {
            warn!("Sensor already initialized, deinitializing first");
            if let Err(err) = self.deinit() {
                warn!("Failed to deinitialize previous session: {:?}", err);
                self.session = None;
            }
        }

        info!(
            "Initializing with ADC unit {}, channel {}",
            options.unit.index(),
            options.channel
        );

        self.power_pin = None;
        if let Some(pin) = options.power_pin() {
            if let Err(err) = self.platform.configure_output(pin) {
                error!("Failed to configure power pin {}: {:?}", pin, err);
                return Err(Error::Wrapped(err));
            }
            self.power_pin = Some(pin);
            self.power_on()?;
        }

        let mut unit = match self.platform.new_unit(options.unit) {
            Ok(unit) => unit,
            Err(err) => {
                error!("Failed to create ADC unit: {:?}", err);
                self.power_down_after_failure();
                return Err(Error::Wrapped(err));
            }
        };

        if let Err(err) =
            self.platform
                .configure_channel(&mut unit, options.channel, options.attenuation)
        {
            error!("Failed to configure ADC channel: {:?}", err);
            if let Err(delete_err) = self.platform.delete_unit(&mut unit) {
                warn!("Failed to delete ADC unit: {:?}", delete_err);
            }
            self.power_down_after_failure();
            return Err(Error::Wrapped(err));
        }

        let calibration = match self
            .platform
            .create_calibration(options.unit, options.attenuation)
        {
            Ok(calibration) => {
                info!("ADC calibration enabled");
                Calibration::Calibrated(calibration)
            }
            Err(err) => {
                warn!("ADC calibration disabled due to error: {:?}", err);
                Calibration::Uncalibrated
            }
        };

        self.session = Some(Session {
            options: options,
            unit: unit,
            calibration: calibration,
        });
        info!("Grove analog air quality sensor initialized");
        Ok(())
    }

    /// Releases the sensor's resources in the reverse order of [`GroveAqs::init`].
    ///
    /// The sensor is powered off if power control is enabled; a failure to do so is only logged.
    /// A failure to release the calibration scheme is also only logged. A failure to release the
    /// analog unit is returned, and the driver stays initialized so that this can be retried.
    ///
    /// Returns [`Error::InvalidState`] if the driver is not initialized.
    pub fn deinit(&mut self) -> Result<(), Error<TIoError>> {
        let session = match self.session.as_mut() {
            Some(session) => session,
            None => {
                warn!("Sensor not initialized");
                return Err(Error::InvalidState);
            }
        };

        if self.power_pin.is_some() {
            // Failures are logged by `drive_power`.
            let _ = Self::drive_power(&mut self.platform, self.power_pin, PinState::Low);
        }

        let calibration = core::mem::replace(&mut session.calibration, Calibration::Uncalibrated);
        if let Calibration::Calibrated(calibration) = calibration {
            if let Err(err) = self.platform.delete_calibration(calibration) {
                warn!("Failed to delete ADC calibration scheme: {:?}", err);
            }
        }

        if let Err(err) = self.platform.delete_unit(&mut session.unit) {
            error!("Failed to delete ADC unit: {:?}", err);
            return Err(Error::Wrapped(err));
        }

        self.session = None;
        info!("Grove analog air quality sensor deinitialized");
        Ok(())
    }

    /// Reads a single sample from the sensor and classifies it.
    ///
    /// This blocks until the platform finishes the conversion. Platform errors from the read or
    /// from the calibrated conversion are returned as-is inside [`Error::Wrapped`].
    ///
    /// Returns [`Error::InvalidState`] if the driver is not initialized.
    pub fn read(&mut self) -> Result<Reading, Error<TIoError>> {
        let session = match self.session.as_mut() {
            Some(session) => session,
            None => {
                error!("Sensor not initialized");
                return Err(Error::InvalidState);
            }
        };

        let channel = session.options.channel;
        let raw = nb::block!(self.platform.read_raw(&mut session.unit, channel)).map_err(|err| {
            error!("Failed to read ADC: {:?}", err);
            Error::Wrapped(err)
        })?;

        let millivolts = match &session.calibration {
            Calibration::Calibrated(calibration) => self
                .platform
                .raw_to_millivolts(calibration, raw)
                .map_err(|err| {
                    error!("Failed to convert ADC reading to voltage: {:?}", err);
                    Error::Wrapped(err)
                })?,
            Calibration::Uncalibrated => raw_to_millivolts(raw, session.options.reference_mv),
        };

        let quality = classify(millivolts, &session.options.thresholds);
        info!(
            "Air quality reading: raw={}, voltage={}mV, quality={}",
            raw, millivolts, quality
        );

        Ok(Reading {
            raw: raw,
            millivolts: millivolts,
            quality: quality,
        })
    }

    /// Drives the power pin high.
    ///
    /// Uses the pin from the most recent call to [`GroveAqs::init`], so this keeps working after
    /// [`GroveAqs::deinit`]. Returns [`Error::NotSupported`] if that call did not enable power
    /// control with a pin, or if the driver was never initialized.
    pub fn power_on(&mut self) -> Result<(), Error<TIoError>> {
        self.set_power(PinState::High)
    }

    /// Drives the power pin low. See [`GroveAqs::power_on`].
    pub fn power_off(&mut self) -> Result<(), Error<TIoError>> {
        self.set_power(PinState::Low)
    }

    /// Whether [`GroveAqs::init`] succeeded and [`GroveAqs::deinit`] has not since completed.
    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    /// Whether readings are converted by a platform calibration scheme. Always `false` while
    /// uninitialized.
    pub fn is_calibrated(&self) -> bool {
        match &self.session {
            Some(session) => match session.calibration {
                Calibration::Calibrated(_) => true,
                Calibration::Uncalibrated => false,
            },
            None => false,
        }
    }

    /// The options the driver is currently initialized with.
    pub fn options(&self) -> Option<&Options> {
        self.session.as_ref().map(|session| &session.options)
    }

    /// The platform the driver runs on.
    pub fn platform(&self) -> &TPlatform {
        &self.platform
    }

    /// Mutable access to the platform. Releasing the driver's unit or calibration scheme
    /// through it leaves the driver holding stale handles.
    pub fn platform_mut(&mut self) -> &mut TPlatform {
        &mut self.platform
    }

    /// Gives back the platform. Call [`GroveAqs::deinit`] first, or the analog unit and
    /// calibration scheme are never released.
    pub fn release(self) -> TPlatform {
        self.platform
    }

    fn set_power(&mut self, state: PinState) -> Result<(), Error<TIoError>> {
        Self::drive_power(&mut self.platform, self.power_pin, state)
    }

    fn drive_power(
        platform: &mut TPlatform,
        power_pin: Option<u8>,
        state: PinState,
    ) -> Result<(), Error<TIoError>> {
        let pin = match power_pin {
            Some(pin) => pin,
            None => {
                warn!("GPIO power control not enabled");
                return Err(Error::NotSupported);
            }
        };

        if let Err(err) = platform.set_output(pin, state) {
            error!("Failed to drive power pin {} {:?}: {:?}", pin, state, err);
            return Err(Error::Wrapped(err));
        }

        match state {
            PinState::High => info!("Sensor powered on"),
            PinState::Low => info!("Sensor powered off"),
        }
        Ok(())
    }

    fn power_down_after_failure(&mut self) {
        if let Some(pin) = self.power_pin {
            if let Err(err) = self.platform.set_output(pin, PinState::Low) {
                warn!("Failed to power off sensor after failed init: {:?}", err);
            }
        }
    }
}
