use chip8_interpreter::config::Config;
use chip8_interpreter::cpu::{Cpu, HEIGHT, WIDTH};
use chip8_interpreter::error::Error;
use chip8_interpreter::helper::{display_buffer_to_rgb, prepare_audio, update_cpu_keyboard};
use chip8_interpreter::rom::Rom;
use chip8_interpreter::runner::spawn_cpu_thread;
use clap::Parser;
use log::{error, info, warn};
use minifb::{Key, ScaleMode, Window, WindowOptions};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

fn main() {
    env_logger::init();

    let config = Config::parse();
    if let Err(e) = run(&config) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(config: &Config) -> Result<(), Error> {
    let rom = Rom::open(&config.rom)?;

    let mut cpu = match config.seed {
        Some(seed) => Cpu::with_seed(seed),
        None => Cpu::default(),
    };
    cpu.load_program(rom.instructions())?;

    // Wrap CPU in an Arc<Mutex<>> to share it between threads.
    let cpu = Arc::new(Mutex::new(cpu));
    let running = Arc::new(AtomicBool::new(true));

    // Keep the device alive for the whole session; no audio is not fatal.
    let volume = Arc::new(Mutex::new(0.0f32));
    let _audio = match prepare_audio(Arc::clone(&volume)) {
        Ok(device) => Some(device),
        Err(e) => {
            warn!("{}, continuing without sound", e);
            None
        }
    };

    let cpu_thread = spawn_cpu_thread(Arc::clone(&cpu), Arc::clone(&running), config.hz);

    // Set up the minifb window.
    let mut window = Window::new(
        "CHIP-8",
        WIDTH,
        HEIGHT,
        WindowOptions {
            resize: true,
            scale: config.window_scale(),
            scale_mode: ScaleMode::AspectRatioStretch,
            ..WindowOptions::default()
        },
    )?;

    // Limit to max ~60 fps update rate.
    window.set_target_fps(60);
    info!("running {}", config.rom.display());

    let presented = present(&cpu, &running, &volume, &mut window, config.volume);

    running.store(false, Ordering::Relaxed);
    let cpu_result = cpu_thread
        .join()
        .map_err(|_| Error::Poison("cpu thread panicked".to_string()))?;

    presented?;
    cpu_result
}

/// Present frames and feed input until the window closes or the CPU stops.
fn present(
    cpu: &Mutex<Cpu>,
    running: &AtomicBool,
    volume: &Mutex<f32>,
    window: &mut Window,
    loudness: f32,
) -> Result<(), Error> {
    while window.is_open() && !window.is_key_down(Key::Escape) && running.load(Ordering::Relaxed) {
        // Snapshot between CPU frames and hand over the latest keys.
        let (display_buffer, beeping) = {
            let mut cpu_lock = cpu.lock()?;
            update_cpu_keyboard(&mut cpu_lock, window);
            (*cpu_lock.read_display(), cpu_lock.sound_timer() > 0)
        };

        *volume.lock()? = if beeping { loudness } else { 0.0 };

        let window_buffer = display_buffer_to_rgb(&display_buffer);

        // Update the window with the current display buffer.
        window.update_with_buffer(&window_buffer, WIDTH, HEIGHT)?;
    }
    Ok(())
}
