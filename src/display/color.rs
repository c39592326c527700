/*
 *  display/color.rs
 *
 *  WxMatrix - ambient temperature and UV display
 *	(c) 2020-26 Stuart Hunter
 *
 *  Temperature hue on the RYB wheel, UV index bands
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

use embedded_graphics::pixelcolor::Rgb888;

/// Titles and placeholders
pub const GREY: Rgb888 = Rgb888::new(150, 150, 150);

/// Corners of the RYB cube in RGB, indexed 4*blue + 2*red + yellow:
/// white, yellow, red, orange, blue, green, purple, black.
const RYB_CORNERS: [[f64; 3]; 8] = [
    [1.0, 1.0, 1.0],
    [1.0, 1.0, 0.0],
    [1.0, 0.0, 0.0],
    [1.0, 0.5, 0.0],
    [0.163, 0.373, 0.6],
    [0.0, 0.66, 0.2],
    [0.5, 0.0, 0.5],
    [0.2, 0.094, 0.0],
];

#[inline]
fn cubic(t: f64, a: f64, b: f64) -> f64 {
    let w = t * t * (3.0 - 2.0 * t);
    a + w * (b - a)
}

/// RYB bytes to RGB, trilinear over the cube with a smoothstep weight.
pub fn ryb_to_rgb(r: u8, y: u8, b: u8) -> Rgb888 {
    let (r, y, b) = (f64::from(r) / 255.0, f64::from(y) / 255.0, f64::from(b) / 255.0);
    let channel = |c: usize| {
        let x0 = cubic(b, RYB_CORNERS[0][c], RYB_CORNERS[4][c]);
        let x1 = cubic(b, RYB_CORNERS[1][c], RYB_CORNERS[5][c]);
        let x2 = cubic(b, RYB_CORNERS[2][c], RYB_CORNERS[6][c]);
        let x3 = cubic(b, RYB_CORNERS[3][c], RYB_CORNERS[7][c]);
        let v = cubic(r, cubic(y, x0, x1), cubic(y, x2, x3));
        (v * 255.0).ceil().clamp(0.0, 255.0) as u8
    };
    Rgb888::new(channel(0), channel(1), channel(2))
}

/// Fully saturated HSV, hue in [0,1).
fn hue_to_rgb(h: f64) -> (f64, f64, f64) {
    let h6 = h * 6.0;
    let i = h6.floor();
    let f = h6 - i;
    let (q, t) = (1.0 - f, f);
    match (i as i64).rem_euclid(6) {
        0 => (1.0, t, 0.0),
        1 => (q, 1.0, 0.0),
        2 => (0.0, 1.0, t),
        3 => (0.0, q, 1.0),
        4 => (t, 0.0, 1.0),
        _ => (1.0, 0.0, q),
    }
}

/// Hot end red through yellow and green to blue at freezing, then on to purple.
pub fn temperature_color(temp: f64, really_hot: f64, really_cold: f64) -> Rgb888 {
    let temp = temp.clamp(really_cold, really_hot);
    let hue = if temp >= 0.0 {
        (really_hot - temp) / really_hot * 210.0
    } else {
        210.0 + (-temp) / (-really_cold) * 90.0
    };
    let (r, y, b) = hue_to_rgb(hue / 360.0);
    ryb_to_rgb((255.0 * r) as u8, (255.0 * y) as u8, (255.0 * b) as u8)
}

/// Environment Canada UV index colours.
pub fn uv_color(uv: f64) -> Rgb888 {
    match uv {
        u if u < 3.0 => Rgb888::new(79, 179, 0),   // low
        u if u < 6.0 => Rgb888::new(253, 205, 0),  // moderate
        u if u < 8.0 => Rgb888::new(255, 102, 0),  // high
        u if u < 11.0 => Rgb888::new(255, 0, 0),   // very high
        _ => Rgb888::new(206, 49, 254),            // extreme
    }
}
