use crate::cpu::{Cpu, HEIGHT, WIDTH};
use crate::error::Error;
use minifb::{Key, Window};
use std::sync::{Arc, Mutex};
use tinyaudio::prelude::*;

const PIXEL_ON: u32 = 0xFFFFFFFF; // White with full opacity
const PIXEL_OFF: u32 = 0xFF000000; // Black with full opacity
const TONE_HZ: f32 = 440.0;

/// Convert the one-byte-per-pixel framebuffer into the ARGB buffer minifb
/// expects.
pub fn display_buffer_to_rgb(buffer: &[u8]) -> Vec<u32> {
    let mut pixels = Vec::with_capacity(WIDTH * HEIGHT);
    for &pixel in buffer {
        pixels.push(if pixel != 0 { PIXEL_ON } else { PIXEL_OFF });
    }
    pixels
}

/// COSMAC VIP hex keypad laid over the left side of a QWERTY keyboard.
pub fn keypad_index(key: Key) -> Option<u8> {
    match key {
        Key::Key1 => Some(0x1),
        Key::Key2 => Some(0x2),
        Key::Key3 => Some(0x3),
        Key::Key4 => Some(0xC),
        Key::Q => Some(0x4),
        Key::W => Some(0x5),
        Key::E => Some(0x6),
        Key::R => Some(0xD),
        Key::A => Some(0x7),
        Key::S => Some(0x8),
        Key::D => Some(0x9),
        Key::F => Some(0xE),
        Key::Z => Some(0xA),
        Key::X => Some(0x0),
        Key::C => Some(0xB),
        Key::V => Some(0xF),
        _ => None,
    }
}

pub fn update_cpu_keyboard(cpu: &mut Cpu, window: &Window) {
    cpu.keyboard.clear();
    for key in window.get_keys() {
        if let Some(index) = keypad_index(key) {
            cpu.keyboard.key_down(index);
        }
    }
}

/// Start a continuous sine tone. Its loudness follows `volume`, which the
/// host sets to zero whenever the sound timer is.
pub fn prepare_audio(volume: Arc<Mutex<f32>>) -> Result<OutputDevice, Error> {
    let params = OutputDeviceParameters {
        channels_count: 2,
        sample_rate: 44100,
        channel_sample_count: 4410,
    };

    let device = run_output_device(params, {
        let vol_clone = Arc::clone(&volume);
        let mut clock = 0f32;
        move |data| {
            // a poisoned lock means the host is gone, go quiet
            let vol = vol_clone.lock().map(|v| *v).unwrap_or(0.0);
            for samples in data.chunks_mut(params.channels_count) {
                clock = (clock + 1.0) % params.sample_rate as f32;
                let value =
                    (clock * TONE_HZ * 2.0 * std::f32::consts::PI / params.sample_rate as f32).sin();
                for sample in samples {
                    *sample = value * vol;
                }
            }
        }
    })
    .map_err(|e| Error::Audio(format!("{}", e)))?;

    Ok(device)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framebuffer_to_pixels() {
        let mut buffer = [0u8; WIDTH * HEIGHT];
        buffer[0] = 1;
        buffer[WIDTH + 1] = 0xFF;

        let pixels = display_buffer_to_rgb(&buffer);
        assert_eq!(pixels.len(), WIDTH * HEIGHT);
        assert_eq!(pixels[0], PIXEL_ON);
        assert_eq!(pixels[1], PIXEL_OFF);
        assert_eq!(pixels[WIDTH + 1], PIXEL_ON);
        assert_eq!(pixels.iter().filter(|&&p| p == PIXEL_ON).count(), 2);
    }

    #[test]
    fn keypad_layout() {
        assert_eq!(keypad_index(Key::X), Some(0x0));
        assert_eq!(keypad_index(Key::Key4), Some(0xC));
        assert_eq!(keypad_index(Key::V), Some(0xF));
        assert_eq!(keypad_index(Key::Escape), None);

        let mapped: Vec<u8> = [
            Key::Key1, Key::Key2, Key::Key3, Key::Key4,
            Key::Q, Key::W, Key::E, Key::R,
            Key::A, Key::S, Key::D, Key::F,
            Key::Z, Key::X, Key::C, Key::V,
        ]
        .into_iter()
        .filter_map(keypad_index)
        .collect();
        let mut sorted = mapped.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..16).collect::<Vec<u8>>());
    }
}
