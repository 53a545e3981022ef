#![no_std]

/// Driver for the Grove analog air quality sensor.
///
/// Reads one sample from an analog input, converts it to millivolts and classifies it into a
/// [`grove_aqs::Quality`] band.
pub mod grove_aqs;
/// The board services the air quality driver is built on: analog units, calibration and digital
/// outputs.
pub mod platform;
