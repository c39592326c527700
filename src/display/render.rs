/*
 *  display/render.rs
 *
 *  WxMatrix - ambient temperature and UV display
 *	(c) 2020-26 Stuart Hunter
 *
 *  The render boundary: what the engine hands to whatever draws the panel
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
use std::sync::{Arc, Mutex};
use thiserror::Error;

use super::color::{GREY, temperature_color, uv_color};
use crate::config::{LocationConfig, TempUnits};
use crate::highlow::HighLowRecord;
use crate::weather::Reading;

const PLACEHOLDER: &str = "---";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot draw on a {0}x{1} canvas")]
    Size(u32, u32),
}

/// Right-hand side of the readings screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    HighLow,
    Uv,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub text: String,
    pub color: Rgb888,
}

impl Field {
    fn placeholder() -> Self {
        Self { text: PLACEHOLDER.to_string(), color: GREY }
    }
}

/// One readings screen, fully formatted.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub temperature: Field,
    pub high: Field,
    pub low: Field,
    pub uv: Field,
    pub panel: Panel,
}

/// Unit and colour-scale settings for formatting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Presentation {
    pub units: TempUnits,
    pub really_hot: f64,
    pub really_cold: f64,
}

impl Presentation {
    pub fn new(units: TempUnits, location: &LocationConfig) -> Self {
        Self { units, really_hot: location.really_hot, really_cold: location.really_cold }
    }

    /// Celsius in; colour is always picked on the Celsius scale.
    fn temperature(&self, celsius: Option<f64>) -> Field {
        let Some(c) = celsius else { return Field::placeholder() };
        let shown = match self.units {
            TempUnits::Celsius => c,
            TempUnits::Fahrenheit => c * 9.0 / 5.0 + 32.0,
        };
        Field {
            text: format!("{shown:.1}"),
            color: temperature_color(c, self.really_hot, self.really_cold),
        }
    }
}

impl Frame {
    pub fn compose(reading: &Reading, record: &HighLowRecord, panel: Panel, pres: &Presentation) -> Self {
        let uv = match reading.uv_index {
            Some(u) => Field { text: format!("{u:.1}"), color: uv_color(u) },
            None => Field::placeholder(),
        };
        Self {
            temperature: pres.temperature(reading.temperature),
            high: pres.temperature(record.high),
            low: pres.temperature(record.low),
            uv,
            panel,
        }
    }
}

/// Whatever draws the panel. Implementations log their own failures.
pub trait Renderer: Send {
    fn show_readings(&mut self, frame: &Frame);
    fn show_message(&mut self, text: &str);
    fn set_indicator(&mut self, on: bool);
    fn clear(&mut self);
    fn set_brightness(&mut self, percent: u8);
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    Readings(Frame),
    Message(String),
    Indicator(bool),
    Clear,
    Brightness(u8),
}

/// Keeps every call, shared so a test can inspect it while the engine owns the renderer.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    calls: Arc<Mutex<Vec<RenderCall>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// The last readings/message/clear call, ignoring brightness and indicator updates.
    pub fn last_screen(&self) -> Option<RenderCall> {
        self.calls()
            .into_iter()
            .rev()
            .find(|c| matches!(c, RenderCall::Readings(_) | RenderCall::Message(_) | RenderCall::Clear))
    }

    fn push(&self, call: RenderCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl Renderer for RecordingRenderer {
    fn show_readings(&mut self, frame: &Frame) {
        self.push(RenderCall::Readings(frame.clone()));
    }

    fn show_message(&mut self, text: &str) {
        self.push(RenderCall::Message(text.to_string()));
    }

    fn set_indicator(&mut self, on: bool) {
        self.push(RenderCall::Indicator(on));
    }

    fn clear(&mut self) {
        self.push(RenderCall::Clear);
    }

    fn set_brightness(&mut self, percent: u8) {
        self.push(RenderCall::Brightness(percent));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pres(units: TempUnits) -> Presentation {
        Presentation { units, really_hot: 40.0, really_cold: -30.0 }
    }

    #[test]
    fn test_placeholders_for_absent_values() {
        let frame = Frame::compose(
            &Reading::default(),
            &HighLowRecord::empty(3),
            Panel::HighLow,
            &pres(TempUnits::Celsius),
        );
        for field in [&frame.temperature, &frame.high, &frame.low, &frame.uv] {
            assert_eq!(field.text, "---");
            assert_eq!(field.color, GREY);
        }
    }

    #[test]
    fn test_one_decimal_and_units() {
        let reading = Reading { temperature: Some(21.0), uv_index: Some(6.3), sampled_at: None };
        let record = HighLowRecord { day_ordinal: 3, high: Some(25.5), low: Some(-4.0) };

        let c = Frame::compose(&reading, &record, Panel::Uv, &pres(TempUnits::Celsius));
        assert_eq!(c.temperature.text, "21.0");
        assert_eq!(c.high.text, "25.5");
        assert_eq!(c.low.text, "-4.0");
        assert_eq!(c.uv.text, "6.3");
        assert_eq!(c.uv.color, Rgb888::new(255, 102, 0));

        let f = Frame::compose(&reading, &record, Panel::Uv, &pres(TempUnits::Fahrenheit));
        assert_eq!(f.temperature.text, "69.8");
        assert_eq!(f.low.text, "24.8");
        // colour follows the Celsius value either way
        assert_eq!(f.temperature.color, c.temperature.color);
    }

    #[test]
    fn test_recording_renderer_is_shared() {
        let probe = RecordingRenderer::new();
        let mut boxed: Box<dyn Renderer> = Box::new(probe.clone());
        boxed.set_brightness(40);
        boxed.show_message("hello");
        boxed.set_indicator(true);
        assert_eq!(probe.calls().len(), 3);
        assert_eq!(probe.last_screen(), Some(RenderCall::Message("hello".into())));
    }
}
