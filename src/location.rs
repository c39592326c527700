/*
 *  location.rs
 *
 *  WxMatrix - ambient temperature and UV display
 *	(c) 2020-26 Stuart Hunter
 *
 *  Observer position for the sun calculations
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

use std::fmt;

use crate::config::LocationConfig;

/// Location with the horizon the display's owner actually sees
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub horizon_deg: f64,
    pub sun_offset_minutes: u32,
}

impl From<&LocationConfig> for Location {
    fn from(cfg: &LocationConfig) -> Self {
        Self {
            latitude: cfg.latitude,
            longitude: cfg.longitude,
            horizon_deg: cfg.horizon_deg,
            sun_offset_minutes: cfg.sun_offset_minutes,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4}) horizon {:.3}°", self.latitude, self.longitude, self.horizon_deg)?;
        if self.sun_offset_minutes > 0 {
            write!(f, " offset {}m", self.sun_offset_minutes)?;
        }
        Ok(())
    }
}
