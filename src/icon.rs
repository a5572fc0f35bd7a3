//! Tray icons, drawn at runtime so nothing has to ship beside the binary.

use anyhow::Context;
use image::{Rgba, RgbaImage};

use soundboard_core::SessionState;

const ICON_SIZE: u32 = 32;
const COLOR_IDLE: Rgba<u8> = Rgba([70, 110, 220, 255]);
const COLOR_RECORDING: Rgba<u8> = Rgba([220, 40, 40, 255]);
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

fn color(state: SessionState) -> Rgba<u8> {
    match state {
        SessionState::Idle => COLOR_IDLE,
        SessionState::Recording => COLOR_RECORDING,
    }
}

/// A filled disc in the state's colour.
pub fn render(state: SessionState) -> RgbaImage {
    let fill = color(state);
    let center = (ICON_SIZE as f32 - 1.0) / 2.0;
    let radius = ICON_SIZE as f32 / 2.0 - 1.0;
    RgbaImage::from_fn(ICON_SIZE, ICON_SIZE, |x, y| {
        let dx = x as f32 - center;
        let dy = y as f32 - center;
        if dx * dx + dy * dy <= radius * radius {
            fill
        } else {
            TRANSPARENT
        }
    })
}

pub fn icon(state: SessionState) -> anyhow::Result<tray_icon::Icon> {
    let image = render(state);
    let (width, height) = image.dimensions();
    tray_icon::Icon::from_rgba(image.into_raw(), width, height).context("Failed to build tray icon")
}

pub fn tooltip(state: SessionState) -> &'static str {
    match state {
        SessionState::Idle => "soundboard",
        SessionState::Recording => "soundboard - recording",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_colours_by_state() {
        let idle = render(SessionState::Idle);
        let recording = render(SessionState::Recording);
        let mid = ICON_SIZE / 2;

        assert_eq!(idle.dimensions(), (ICON_SIZE, ICON_SIZE));
        assert_eq!(*idle.get_pixel(mid, mid), COLOR_IDLE);
        assert_eq!(*recording.get_pixel(mid, mid), COLOR_RECORDING);
    }

    #[test]
    fn test_render_corners_are_transparent() {
        let image = render(SessionState::Idle);
        assert_eq!(*image.get_pixel(0, 0), TRANSPARENT);
        assert_eq!(*image.get_pixel(ICON_SIZE - 1, ICON_SIZE - 1), TRANSPARENT);
    }
}
