/*
 *  highlow.rs
 *
 *  WxMatrix - ambient temperature and UV display
 *	(c) 2020-26 Stuart Hunter
 *
 *  Day-keyed high/low record, persisted as `day high low` on one line
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

use log::{debug, warn};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Written in place of an unset high so older readers see "no observation".
const HIGH_SENTINEL: f64 = -999.0;
const LOW_SENTINEL: f64 = 999.0;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("high/low file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("high/low file is malformed: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighLowRecord {
    /// Local day of the year, 1..=366
    pub day_ordinal: u32,
    pub high: Option<f64>,
    pub low: Option<f64>,
}

impl HighLowRecord {
    pub fn empty(day_ordinal: u32) -> Self {
        Self { day_ordinal, high: None, low: None }
    }

    /// Clears the record when `today` is a different day. Returns true if it did.
    pub fn roll_day(&mut self, today: u32) -> bool {
        if self.day_ordinal == today {
            return false;
        }
        *self = Self::empty(today);
        true
    }

    /// Folds one temperature into the record. Returns true if high or low moved.
    pub fn observe(&mut self, temp: f64) -> bool {
        let mut changed = false;
        if self.high.is_none_or(|h| temp > h) {
            self.high = Some(temp);
            changed = true;
        }
        if self.low.is_none_or(|l| temp < l) {
            self.low = Some(temp);
            changed = true;
        }
        changed
    }

    pub fn parse(line: &str) -> Result<Self, StoreError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(StoreError::Malformed(format!("expected 3 fields, found {}", fields.len())));
        }
        let num = |s: &str| {
            s.parse::<f64>()
                .map_err(|_| StoreError::Malformed(format!("'{s}' is not a number")))
        };
        let day = num(fields[0])?;
        let high = num(fields[1])?;
        let low = num(fields[2])?;
        if !(0.0..=366.0).contains(&day) {
            return Err(StoreError::Malformed(format!("day ordinal {day} out of range")));
        }
        Ok(Self {
            day_ordinal: day as u32,
            high: (high > HIGH_SENTINEL).then_some(high),
            low: (low < LOW_SENTINEL).then_some(low),
        })
    }

    pub fn to_line(&self) -> String {
        format!(
            "{} {} {}",
            self.day_ordinal,
            self.high.unwrap_or(HIGH_SENTINEL),
            self.low.unwrap_or(LOW_SENTINEL)
        )
    }
}

/// The record plus the file backing it. Owned by the acquisition engine.
#[derive(Debug)]
pub struct HighLowStore {
    path: PathBuf,
    record: HighLowRecord,
}

impl HighLowStore {
    /// Loads the record; a missing or unreadable file is treated as stale by one day.
    pub fn load(path: impl Into<PathBuf>, today: u32) -> Self {
        let path = path.into();
        let yesterday = HighLowRecord::empty(today.saturating_sub(1));
        let record = match fs::read_to_string(&path) {
            Ok(s) => HighLowRecord::parse(s.trim()).unwrap_or_else(|e| {
                warn!("Ignoring {}: {}", path.display(), e);
                yesterday
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No high/low file at {}, starting fresh", path.display());
                yesterday
            }
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                yesterday
            }
        };
        Self { path, record }
    }

    pub fn in_memory(path: impl Into<PathBuf>, record: HighLowRecord) -> Self {
        Self { path: path.into(), record }
    }

    pub fn record(&self) -> &HighLowRecord {
        &self.record
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Day reset then min/max against `temp`; persists only if something changed.
    pub fn update(&mut self, today: u32, temp: Option<f64>) -> Result<bool, StoreError> {
        let rolled = self.record.roll_day(today);
        let observed = temp.is_some_and(|t| self.record.observe(t));
        if rolled || observed {
            self.persist()?;
        }
        Ok(rolled || observed)
    }

    /// Replaces today's values with ones maintained upstream.
    pub fn replace(&mut self, today: u32, high: f64, low: f64) -> Result<bool, StoreError> {
        let next = HighLowRecord { day_ordinal: today, high: Some(high), low: Some(low) };
        if next == self.record {
            return Ok(false);
        }
        self.record = next;
        self.persist()?;
        Ok(true)
    }

    fn persist(&self) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, self.record.to_line())?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
