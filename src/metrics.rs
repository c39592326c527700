/*
 *  metrics.rs
 *
 *  WxMatrix - ambient temperature and UV display
 *	(c) 2020-26 Stuart Hunter
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
//! Host health figures from /proc and /sys for the monitoring feed.

use std::fs;

use crate::sensor::count_to_lux;

const THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";
const MEMINFO: &str = "/proc/meminfo";
const UPTIME: &str = "/proc/uptime";

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct MachineMetrics {
    /// Celsius
    pub cpu_temp: f64,
    pub mem_used_pct: f64,
    pub up_days: u64,
}

impl MachineMetrics {
    /// Reads the live system. Unreadable sources report 0.
    pub fn read() -> Self {
        let read = |path| fs::read_to_string(path).unwrap_or_default();
        Self::parse(&read(THERMAL_ZONE), &read(MEMINFO), &read(UPTIME))
    }

    pub fn parse(thermal: &str, meminfo: &str, uptime: &str) -> Self {
        Self {
            cpu_temp: first_number(thermal).map_or(0.0, |milli| milli / 1000.0),
            mem_used_pct: mem_used_pct(meminfo).unwrap_or(0.0),
            up_days: first_number(uptime).map_or(0, |secs| (secs / 86_400.0) as u64),
        }
    }
}

fn first_number(content: &str) -> Option<f64> {
    content.split_whitespace().next()?.parse().ok()
}

/// 100 * (MemTotal - MemAvailable) / MemTotal
fn mem_used_pct(meminfo: &str) -> Option<f64> {
    let field = |name: &str| {
        meminfo
            .lines()
            .find_map(|line| line.strip_prefix(name))
            .and_then(|rest| first_number(rest.trim_start_matches(':')))
    };
    let total = field("MemTotal")?;
    let avail = field("MemAvailable")?;
    (total > 0.0).then(|| 100.0 * (total - avail) / total)
}

/// The monitoring status line.
pub fn status_line(m: &MachineMetrics, lifetime_errors: u32, brightness: u8, light: Option<f64>) -> String {
    let lux = light.map_or(-1, |l| count_to_lux(l) as i64);
    let light = match light {
        Some(l) if l > 999.0 => format!("{:2}k", (l / 1000.0) as i64),
        Some(l) => format!("{:3}", l as i64),
        None => format!("{:3}", -1),
    };
    format!(
        "CPU T:{:4.1} Err:{:3} Up: {:3} Mem Use {:2} Set to:{:3} Lux:{:4} Light:{}",
        m.cpu_temp, lifetime_errors, m.up_days, m.mem_used_pct as u32, brightness, lux, light
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMINFO_SAMPLE: &str = "MemTotal:        3884360 kB\n\
                                  MemFree:          212000 kB\n\
                                  MemAvailable:    2913270 kB\n\
                                  Buffers:           81000 kB\n";

    #[test]
    fn test_parse_sources() {
        let m = MachineMetrics::parse("48312\n", MEMINFO_SAMPLE, "190000.55 350000.10\n");
        assert!((m.cpu_temp - 48.312).abs() < 1e-9);
        assert!((m.mem_used_pct - 25.0).abs() < 0.01);
        assert_eq!(m.up_days, 2);
    }

    #[test]
    fn test_missing_sources_are_zero() {
        assert_eq!(MachineMetrics::parse("", "", ""), MachineMetrics::default());
        assert_eq!(MachineMetrics::parse("x", "MemTotal: 0 kB\nMemAvailable: 0 kB", "").mem_used_pct, 0.0);
    }

    #[test]
    fn test_status_line() {
        let m = MachineMetrics { cpu_temp: 51.26, mem_used_pct: 24.9, up_days: 12 };
        assert_eq!(
            status_line(&m, 7, 60, Some(1500.0)),
            "CPU T:51.3 Err:  7 Up:  12 Mem Use 24 Set to: 60 Lux:  86 Light: 1k"
        );
        assert_eq!(
            status_line(&m, 0, 100, None),
            "CPU T:51.3 Err:  0 Up:  12 Mem Use 24 Set to:100 Lux:  -1 Light: -1"
        );
    }
}
