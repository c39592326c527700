/*
 *  sensor.rs
 *
 *  WxMatrix - ambient temperature and UV display
 *	(c) 2020-26 Stuart Hunter
 *
 *  VEML7700 ambient light sensor over embedded-hal I2C
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use embedded_hal::i2c::I2c;
use linux_embedded_hal::I2cdev;
use log::info;
use thiserror::Error;

pub const VEML7700_ADDR: u8 = 0x10;

const REG_ALS_CONF: u8 = 0x00;
const REG_ALS: u8 = 0x04;

/// Gain x1, 100ms integration, interrupts off, powered on.
const ALS_CONF_DEFAULT: u16 = 0x0000;

/// Lux per count at gain x1 / 100ms.
pub const LUX_PER_COUNT: f64 = 0.0576;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("light sensor bus unavailable: {0}")]
    Unavailable(String),
    #[error("light sensor I2C error: {0}")]
    Bus(String),
}

/// Anything that reports ambient light as a raw count.
pub trait LightSensor: Send {
    fn read_light(&mut self) -> Result<f64, SensorError>;
}

/// Raw count to lux at the fixed gain and integration time.
pub fn count_to_lux(count: f64) -> f64 {
    count * LUX_PER_COUNT
}

pub struct Veml7700<I2C> {
    i2c: I2C,
}

impl<I2C: I2c> Veml7700<I2C> {
    /// Configures the sensor; fails if nothing answers at 0x10.
    pub fn new(mut i2c: I2C) -> Result<Self, SensorError> {
        let [lo, hi] = ALS_CONF_DEFAULT.to_le_bytes();
        i2c.write(VEML7700_ADDR, &[REG_ALS_CONF, lo, hi])
            .map_err(|e| SensorError::Bus(format!("{e:?}")))?;
        Ok(Self { i2c })
    }

    fn read_register(&mut self, reg: u8) -> Result<u16, SensorError> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(VEML7700_ADDR, &[reg], &mut buf)
            .map_err(|e| SensorError::Bus(format!("{e:?}")))?;
        Ok(u16::from_le_bytes(buf))
    }

    #[cfg(test)]
    fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c + Send> LightSensor for Veml7700<I2C> {
    fn read_light(&mut self) -> Result<f64, SensorError> {
        Ok(f64::from(self.read_register(REG_ALS)?))
    }
}

/// Probe the sensor on a Linux I2C bus.
pub fn open_veml7700(bus: &str) -> Result<Veml7700<I2cdev>, SensorError> {
    let dev = I2cdev::new(bus).map_err(|e| SensorError::Unavailable(format!("{bus}: {e}")))?;
    let sensor = Veml7700::new(dev)?;
    info!("VEML7700 light sensor found on {bus}");
    Ok(sensor)
}
