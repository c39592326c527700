/*
 *  display/canvas.rs
 *
 *  WxMatrix - ambient temperature and UV display
 *	(c) 2020-26 Stuart Hunter
 *
 *  In-memory RGB matrix and the embedded-graphics renderer that draws on it
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

use core::convert::Infallible;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::ascii::{FONT_4X6, FONT_7X13, FONT_8X13_BOLD, FONT_10X20};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Alignment, Text};
use embedded_text::alignment::{HorizontalAlignment, VerticalAlignment};
use embedded_text::{TextBox, style::TextBoxStyleBuilder};
use log::debug;

use super::color::GREY;
use super::render::{Frame, Panel, RenderError, Renderer};
use crate::config::MAX_PANEL_DIMENSION;

const HIGH_LOW_TITLE: &str = "High-Low";
const UV_TITLE: &str = "UV";

/// A runtime-sized RGB framebuffer.
#[derive(Debug, Clone)]
pub struct MatrixCanvas {
    buf: Vec<Rgb888>,
    w: u32,
    h: u32,
}

impl MatrixCanvas {
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        if width == 0 || height == 0 || width > MAX_PANEL_DIMENSION || height > MAX_PANEL_DIMENSION {
            return Err(RenderError::Size(width, height));
        }
        Ok(Self { buf: vec![Rgb888::BLACK; width as usize * height as usize], w: width, h: height })
    }

    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb888> {
        self.idx(Point::new(x as i32, y as i32)).map(|i| self.buf[i])
    }

    #[cfg(test)]
    pub fn lit_pixels(&self) -> usize {
        self.buf.iter().filter(|&&c| c != Rgb888::BLACK).count()
    }

    #[cfg(test)]
    pub fn as_slice(&self) -> &[Rgb888] {
        &self.buf
    }

    #[inline]
    fn idx(&self, p: Point) -> Option<usize> {
        let (x, y) = (u32::try_from(p.x).ok()?, u32::try_from(p.y).ok()?);
        (x < self.w && y < self.h).then(|| y as usize * self.w as usize + x as usize)
    }
}

impl OriginDimensions for MatrixCanvas {
    fn size(&self) -> Size {
        Size::new(self.w, self.h)
    }
}

impl DrawTarget for MatrixCanvas {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.buf.fill(color);
        Ok(())
    }
}

/// Draws frames onto a `MatrixCanvas` laid out for a 32-row panel.
pub struct CanvasRenderer {
    canvas: MatrixCanvas,
    brightness: u8,
}

impl CanvasRenderer {
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        Ok(Self { canvas: MatrixCanvas::new(width, height)?, brightness: 100 })
    }

    #[cfg(test)]
    fn canvas(&self) -> &MatrixCanvas {
        &self.canvas
    }

    #[cfg(test)]
    fn brightness(&self) -> u8 {
        self.brightness
    }

    fn draw_readings(&mut self, frame: &Frame) -> Result<(), Infallible> {
        let w = self.canvas.w as i32;
        let h = self.canvas.h as i32;
        let right = w - 1;
        let small = MonoTextStyle::new(&FONT_4X6, GREY);
        let title = MonoTextStyle::new(&FONT_8X13_BOLD, GREY);
        let char_w = FONT_8X13_BOLD.character_size.width as i32;

        self.canvas.clear(Rgb888::BLACK)?;

        Text::new(
            &frame.temperature.text,
            Point::new(0, h - 3),
            MonoTextStyle::new(&FONT_10X20, frame.temperature.color),
        )
        .draw(&mut self.canvas)?;

        match frame.panel {
            Panel::HighLow => {
                // title centred over the wider of the two values
                let column = frame.high.text.len().max(frame.low.text.len()) as i32 * char_w;
                let centre = (right - column / 2).min(right - (HIGH_LOW_TITLE.len() as i32 * 4) / 2);
                Text::with_alignment(HIGH_LOW_TITLE, Point::new(centre, 6), small, Alignment::Center)
                    .draw(&mut self.canvas)?;
                Text::with_alignment(
                    &frame.high.text,
                    Point::new(right, h - 13),
                    MonoTextStyle::new(&FONT_8X13_BOLD, frame.high.color),
                    Alignment::Right,
                )
                .draw(&mut self.canvas)?;
                Text::with_alignment(
                    &frame.low.text,
                    Point::new(right, h - 1),
                    MonoTextStyle::new(&FONT_8X13_BOLD, frame.low.color),
                    Alignment::Right,
                )
                .draw(&mut self.canvas)?;
            }
            Panel::Uv => {
                let column = frame.uv.text.len() as i32 * char_w;
                Text::with_alignment(UV_TITLE, Point::new(right - column / 2, h - 18), title, Alignment::Center)
                    .draw(&mut self.canvas)?;
                Text::with_alignment(
                    &frame.uv.text,
                    Point::new(right, h - 4),
                    MonoTextStyle::new(&FONT_8X13_BOLD, frame.uv.color),
                    Alignment::Right,
                )
                .draw(&mut self.canvas)?;
            }
        }
        Ok(())
    }

    fn draw_message(&mut self, text: &str) -> Result<(), Infallible> {
        self.canvas.clear(Rgb888::BLACK)?;
        let bounds = Rectangle::new(Point::zero(), self.canvas.size());
        let character_style = MonoTextStyle::new(&FONT_7X13, GREY);
        let textbox_style = TextBoxStyleBuilder::new()
            .alignment(HorizontalAlignment::Left)
            .vertical_alignment(VerticalAlignment::Top)
            .build();
        TextBox::with_textbox_style(text, bounds, character_style, textbox_style).draw(&mut self.canvas)?;
        Ok(())
    }

    fn draw_indicator(&mut self, on: bool) -> Result<(), Infallible> {
        self.canvas.clear(Rgb888::BLACK)?;
        let size = self.canvas.size();
        let color = if on { GREY } else { Rgb888::BLACK };
        Rectangle::new(Point::new(size.width as i32 - 2, size.height as i32 - 2), Size::new(2, 2))
            .into_styled(PrimitiveStyle::with_fill(color))
            .draw(&mut self.canvas)
    }
}

impl Renderer for CanvasRenderer {
    fn show_readings(&mut self, frame: &Frame) {
        let Ok(()) = self.draw_readings(frame);
    }

    fn show_message(&mut self, text: &str) {
        let Ok(()) = self.draw_message(text);
    }

    fn set_indicator(&mut self, on: bool) {
        let Ok(()) = self.draw_indicator(on);
    }

    fn clear(&mut self) {
        let Ok(()) = self.canvas.clear(Rgb888::BLACK);
    }

    fn set_brightness(&mut self, percent: u8) {
        let percent = percent.min(100);
        if percent != self.brightness {
            debug!("Brightness {}% -> {}%", self.brightness, percent);
            self.brightness = percent;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::render::Field;

    fn frame(panel: Panel) -> Frame {
        let field = |t: &str, c| Field { text: t.to_string(), color: c };
        Frame {
            temperature: field("21.4", Rgb888::new(255, 128, 0)),
            high: field("25.0", Rgb888::RED),
            low: field("-3.5", Rgb888::BLUE),
            uv: field("4.0", Rgb888::new(253, 205, 0)),
            panel,
        }
    }

    fn has_color(canvas: &MatrixCanvas, color: Rgb888) -> bool {
        canvas.as_slice().contains(&color)
    }

    #[test]
    fn test_bad_canvas_size_rejected() {
        assert!(matches!(CanvasRenderer::new(0, 32), Err(RenderError::Size(0, 32))));
        assert!(matches!(
            CanvasRenderer::new(100_000, 100_000),
            Err(RenderError::Size(100_000, 100_000))
        ));
    }

    #[test]
    fn test_high_low_panel_uses_field_colours() {
        let mut r = CanvasRenderer::new(128, 32).unwrap();
        r.show_readings(&frame(Panel::HighLow));
        let c = r.canvas();
        assert!(has_color(c, Rgb888::new(255, 128, 0)));
        assert!(has_color(c, Rgb888::RED));
        assert!(has_color(c, Rgb888::BLUE));
        assert!(!has_color(c, Rgb888::new(253, 205, 0)));
        // temperature sits on the left half, values on the right
        assert!((0..32).any(|y| (0..40).any(|x| c.pixel(x, y) == Some(Rgb888::new(255, 128, 0)))));
        assert!((0..32).any(|y| (96..128).any(|x| c.pixel(x, y) == Some(Rgb888::RED))));
    }

    #[test]
    fn test_uv_panel() {
        let mut r = CanvasRenderer::new(128, 32).unwrap();
        r.show_readings(&frame(Panel::Uv));
        assert!(has_color(r.canvas(), Rgb888::new(253, 205, 0)));
        assert!(!has_color(r.canvas(), Rgb888::RED));
    }

    #[test]
    fn test_message_replaces_readings() {
        let mut r = CanvasRenderer::new(128, 32).unwrap();
        r.show_readings(&frame(Panel::HighLow));
        r.show_message("Network HTTP error: 503");
        assert!(r.canvas().lit_pixels() > 0);
        assert!(r.canvas().as_slice().iter().all(|&p| p == Rgb888::BLACK || p == GREY));
    }

    #[test]
    fn test_indicator_is_two_by_two_lower_right() {
        let mut r = CanvasRenderer::new(128, 32).unwrap();
        r.set_indicator(true);
        assert_eq!(r.canvas().lit_pixels(), 4);
        for (x, y) in [(126, 30), (127, 30), (126, 31), (127, 31)] {
            assert_eq!(r.canvas().pixel(x, y), Some(GREY));
        }
        r.set_indicator(false);
        assert_eq!(r.canvas().lit_pixels(), 0);
    }

    #[test]
    fn test_brightness_and_clear() {
        let mut r = CanvasRenderer::new(64, 32).unwrap();
        r.set_brightness(35);
        assert_eq!(r.brightness(), 35);
        r.show_message("x");
        r.clear();
        assert_eq!(r.canvas().lit_pixels(), 0);
    }
}
