/*
 *  display/mod.rs
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

// Temperature / UV colour maps
pub mod color;

// Render boundary and frame composition
pub mod render;

// embedded-graphics canvas implementation of the render boundary
pub mod canvas;

// Display mode state machine
pub mod mode_controller;

pub use canvas::{CanvasRenderer, MatrixCanvas};
pub use mode_controller::{DisplayModeController, ModeControllerConfig};
pub use render::{Field, Frame, Panel, Presentation, RecordingRenderer, RenderCall, RenderError, Renderer};

/// What the panel is showing
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DisplayMode {
    HighLow, // current temperature + today's high/low
    Uv,      // current temperature + UV index
    Error,   // word-wrapped failure message
    Blink,   // after hours, blinking indicator only
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayState {
    pub mode: DisplayMode,
    pub after_hours: bool,
    pub error_message: Option<String>,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self { mode: DisplayMode::HighLow, after_hours: false, error_message: None }
    }
}
