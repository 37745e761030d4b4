//! Errors returned by the PCA9685 driver.

use std::fmt::Debug;

/// An error raised by a [`crate::Pca9685`] operation.
///
/// The driver performs no retries, so a failed bus transaction is reported exactly as the
/// transport produced it.
#[derive(thiserror::Error, Debug)]
pub enum Error<E: Debug> {
    #[error("An I2C transaction with the PCA9685 failed: {0:?}")]
    I2c(E),
}
