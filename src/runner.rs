use crate::cpu::{Cpu, Cycle};
use crate::error::Error;
use log::{error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Timer cadence, and the rate frames are scheduled at.
pub const TIMER_HZ: u32 = 60;

/// Instructions per 60 Hz frame for a target instruction rate. Never zero.
pub fn cycles_per_frame(hz: u32) -> usize {
    ((hz + TIMER_HZ / 2) / TIMER_HZ).max(1) as usize
}

/// Run up to `cycles` instructions, then count the timers down once.
///
/// Stops early (still ticking the timers) while FX0A is waiting, since
/// further cycles would only re-run the same instruction.
pub fn run_frame(cpu: &mut Cpu, cycles: usize) -> Result<(), Error> {
    for _ in 0..cycles {
        if cpu.cycle()? == Cycle::AwaitingKey {
            break;
        }
    }
    cpu.tick_timers();
    Ok(())
}

/// Drive `cpu` on its own thread at `hz` instructions per second until
/// `running` is cleared or a fatal error occurs. The lock is held for one
/// frame at a time, so other threads see the machine between cycles.
pub fn spawn_cpu_thread(
    cpu: Arc<Mutex<Cpu>>,
    running: Arc<AtomicBool>,
    hz: u32,
) -> JoinHandle<Result<(), Error>> {
    thread::spawn(move || {
        let per_frame = cycles_per_frame(hz);
        let frame = Duration::from_secs(1) / TIMER_HZ;
        info!("cpu thread started, {} cycles per frame", per_frame);

        let mut next = Instant::now();
        let result = loop {
            if !running.load(Ordering::Relaxed) {
                break Ok(());
            }

            let step = match cpu.lock() {
                Ok(mut cpu) => run_frame(&mut cpu, per_frame),
                Err(e) => Err(e.into()),
            };
            if let Err(e) = step {
                error!("{}", e);
                break Err(e);
            }

            next += frame;
            let now = Instant::now();
            if next > now {
                thread::sleep(next - now);
            } else {
                // fell behind, don't try to catch up
                next = now;
            }
        };

        running.store(false, Ordering::Relaxed);
        info!("cpu thread stopped");
        result
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_budget() {
        assert_eq!(cycles_per_frame(700), 12);
        assert_eq!(cycles_per_frame(540), 9);
        assert_eq!(cycles_per_frame(60), 1);
        assert_eq!(cycles_per_frame(1), 1);
    }

    #[test]
    fn frame_ticks_timers_once() -> Result<(), Error> {
        let mut cpu = Cpu::default();
        cpu.write_instructions_batch(&[(0x200, 0x6005), (0x202, 0xF015), (0x204, 0x1204)])?;

        run_frame(&mut cpu, 10)?;
        assert_eq!(cpu.delay_timer(), 4);
        run_frame(&mut cpu, 10)?;
        assert_eq!(cpu.delay_timer(), 3);

        Ok(())
    }

    #[test]
    fn frame_stops_while_waiting_for_a_key() -> Result<(), Error> {
        let mut cpu = Cpu::default();
        cpu.write_instructions_batch(&[(0x200, 0xF00A), (0x202, 0x7001)])?;

        run_frame(&mut cpu, 12)?;
        assert_eq!(cpu.program_counter(), 0x200);

        cpu.keyboard.key_down(0x3);
        run_frame(&mut cpu, 2)?;
        assert_eq!(cpu.read_register(0), Some(0x4));

        Ok(())
    }

    #[test]
    fn thread_reports_fatal_errors() -> Result<(), Error> {
        let mut cpu = Cpu::default();
        cpu.write_instructions_batch(&[(0x200, 0x00EE)])?;

        let cpu = Arc::new(Mutex::new(cpu));
        let running = Arc::new(AtomicBool::new(true));
        let handle = spawn_cpu_thread(Arc::clone(&cpu), Arc::clone(&running), 700);

        let result = handle.join().unwrap();
        assert!(matches!(result, Err(Error::StackUnderflow { .. })));
        assert!(!running.load(Ordering::Relaxed));

        Ok(())
    }

    #[test]
    fn thread_stops_when_asked() -> Result<(), Error> {
        let mut cpu = Cpu::default();
        cpu.write_instructions_batch(&[(0x200, 0x1200)])?;

        let cpu = Arc::new(Mutex::new(cpu));
        let running = Arc::new(AtomicBool::new(true));
        let handle = spawn_cpu_thread(Arc::clone(&cpu), Arc::clone(&running), 700);

        thread::sleep(Duration::from_millis(50));
        running.store(false, Ordering::Relaxed);
        assert!(handle.join().unwrap().is_ok());
        assert_eq!(cpu.lock()?.program_counter(), 0x200);

        Ok(())
    }
}
