//! Audio input: frame sources and WAV encoding.

#[cfg(feature = "cpal-audio")]
pub mod capture;
pub mod source;
pub mod wav;
