use crate::error::Error;
use crate::keyboard::Keyboard;
use crate::opcode::Instruction;
use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

pub const MEMORY_SIZE: usize = 4096;
pub const WIDTH: usize = 64;
pub const HEIGHT: usize = 32;

/// Where programs are loaded and where execution starts.
pub const PROGRAM_START: u16 = 0x200;
pub const FONT_START: u16 = 0x000;

const FONT_GLYPH_SIZE: u16 = 5;
const FONT_END: u16 = FONT_START + FONT_DATA.len() as u16;
const STACK_SIZE: usize = 16;
const ADDRESS_MASK: u16 = 0x0FFF;
const FLAG: usize = 0xF;

// CHIP-8 fonts consist of 16 characters, each defined by 5 bytes.
const FONT_DATA: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// Complete machine state. One instance per emulation session; the host
/// owns it exclusively and drives it one `cycle()` at a time.
pub struct Cpu {
    registers: [u8; 16],
    memory: [u8; MEMORY_SIZE],
    stack: [u16; STACK_SIZE],
    display: [u8; WIDTH * HEIGHT],
    stack_pointer: usize,
    program_counter: u16,
    index: u16,
    delay_timer: u8,
    sound_timer: u8,
    opcode: u16,
    rng: StdRng,
    pub keyboard: Keyboard,
}

/// Result of executing one instruction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Cycle {
    Executed,
    /// FX0A saw no key down; the same instruction runs again next cycle.
    AwaitingKey,
    /// The opcode matched nothing (or was a 0NNN machine call) and was
    /// skipped over.
    Unrecognized(u16),
}

/// How a handler leaves the program counter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Advance {
    Next,
    Skip,
    Jump(u16),
    Stay,
}

impl Advance {
    fn skip_if(condition: bool) -> Self {
        if condition {
            Advance::Skip
        } else {
            Advance::Next
        }
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl Cpu {
    /// Same as `Cpu::default()` but with a deterministic CXNN sequence.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let mut cpu = Self {
            registers: [0; 16],
            memory: [0; MEMORY_SIZE],
            stack: [0; STACK_SIZE],
            display: [0; WIDTH * HEIGHT],
            stack_pointer: 0,
            program_counter: PROGRAM_START,
            index: 0,
            delay_timer: 0,
            sound_timer: 0,
            opcode: 0,
            rng,
            keyboard: Keyboard::default(),
        };

        cpu.write_fonts_to_memory();

        cpu
    }

    fn read_opcode(&self) -> u16 {
        let pc = self.program_counter;
        let op_high_byte = self.memory[(pc & ADDRESS_MASK) as usize] as u16;
        let op_low_byte = self.memory[(pc.wrapping_add(1) & ADDRESS_MASK) as usize] as u16;

        op_high_byte << 8 | op_low_byte
    }

    /// Fetch, decode and execute exactly one instruction.
    ///
    /// Stack overflow and underflow are returned as errors and leave the
    /// program counter on the offending instruction. Everything else,
    /// including unknown opcodes, completes the cycle.
    pub fn cycle(&mut self) -> Result<Cycle, Error> {
        let pc = self.program_counter;
        self.opcode = self.read_opcode();
        let instruction = Instruction::decode(self.opcode);
        trace!("{:03x}: {:04x}  {}", pc, self.opcode, instruction);

        let advance = self.execute(instruction)?;

        self.program_counter = match advance {
            Advance::Next => pc.wrapping_add(2) & ADDRESS_MASK,
            Advance::Skip => pc.wrapping_add(4) & ADDRESS_MASK,
            Advance::Jump(addr) => addr & ADDRESS_MASK,
            Advance::Stay => pc,
        };

        Ok(match (instruction, advance) {
            (Instruction::Sys { .. } | Instruction::Unknown(_), _) => {
                Cycle::Unrecognized(self.opcode)
            }
            (_, Advance::Stay) => Cycle::AwaitingKey,
            _ => Cycle::Executed,
        })
    }

    /// Run up to `cycles` instructions, stopping at the first fatal error.
    pub fn run(&mut self, cycles: usize) -> Result<(), Error> {
        for _ in 0..cycles {
            self.cycle()?;
        }
        Ok(())
    }

    /// Count both timers down by one, stopping at zero. Called by the host at
    /// 60 Hz, never by `cycle()`.
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    fn execute(&mut self, instruction: Instruction) -> Result<Advance, Error> {
        use Instruction::*;
        let advance = match instruction {
            Cls => self.cls(),
            Ret => self.ret()?,
            Jp { addr } => Advance::Jump(addr),
            Call { addr } => self.call(addr)?,
            SeImm { x, kk } => Advance::skip_if(self.v(x) == kk),
            SneImm { x, kk } => Advance::skip_if(self.v(x) != kk),
            SeReg { x, y } => Advance::skip_if(self.v(x) == self.v(y)),
            LdImm { x, kk } => self.set_v(x, kk),
            AddImm { x, kk } => self.set_v(x, self.v(x).wrapping_add(kk)),
            LdReg { x, y } => self.set_v(x, self.v(y)),
            Or { x, y } => self.set_v(x, self.v(x) | self.v(y)),
            And { x, y } => self.set_v(x, self.v(x) & self.v(y)),
            Xor { x, y } => self.set_v(x, self.v(x) ^ self.v(y)),
            AddReg { x, y } => self.add_xy(x, y),
            Sub { x, y } => self.sub_xy(x, y),
            Shr { x, .. } => self.shr(x),
            Subn { x, y } => self.subn_xy(x, y),
            Shl { x, .. } => self.shl(x),
            SneReg { x, y } => Advance::skip_if(self.v(x) != self.v(y)),
            LdI { addr } => {
                self.index = addr;
                Advance::Next
            }
            JpV0 { addr } => Advance::Jump(addr.wrapping_add(self.registers[0] as u16)),
            Rnd { x, kk } => {
                let byte = self.rng.next_u32() as u8;
                self.set_v(x, byte & kk)
            }
            Drw { x, y, n } => self.draw(x, y, n),
            Skp { x } => Advance::skip_if(self.keyboard.is_pressed(self.v(x))),
            Sknp { x } => Advance::skip_if(!self.keyboard.is_pressed(self.v(x))),
            LdVxDt { x } => self.set_v(x, self.delay_timer),
            LdVxK { x } => self.wait_for_key(x),
            LdDtVx { x } => {
                self.delay_timer = self.v(x);
                Advance::Next
            }
            LdStVx { x } => {
                self.sound_timer = self.v(x);
                Advance::Next
            }
            AddI { x } => {
                self.index = self.index.wrapping_add(self.v(x) as u16) & ADDRESS_MASK;
                Advance::Next
            }
            LdF { x } => {
                self.index = (FONT_START + self.v(x) as u16 * FONT_GLYPH_SIZE) & ADDRESS_MASK;
                Advance::Next
            }
            Bcd { x } => self.bcd(x),
            Store { x } => self.store_registers(x),
            Load { x } => self.load_registers(x),
            Sys { .. } | Unknown(_) => {
                warn!(
                    "unrecognized opcode {:04x} at {:03x}, skipping",
                    self.opcode, self.program_counter
                );
                Advance::Next
            }
        };
        Ok(advance)
    }

    fn v(&self, x: u8) -> u8 {
        self.registers[(x & 0xF) as usize]
    }

    fn set_v(&mut self, x: u8, val: u8) -> Advance {
        self.registers[(x & 0xF) as usize] = val;
        Advance::Next
    }

    // VF is always written after Vx so the flag wins when x == 0xF.
    fn set_v_with_flag(&mut self, x: u8, val: u8, flag: bool) -> Advance {
        self.registers[(x & 0xF) as usize] = val;
        self.registers[FLAG] = flag as u8;
        Advance::Next
    }

    /// (00e0) CLS clear the framebuffer
    fn cls(&mut self) -> Advance {
        self.display.fill(0);
        Advance::Next
    }

    /// (2nnn) CALL sub-routine at `addr`
    fn call(&mut self, addr: u16) -> Result<Advance, Error> {
        if self.stack_pointer >= self.stack.len() {
            return Err(Error::StackOverflow {
                pc: self.program_counter,
            });
        }

        let return_addr = self.program_counter.wrapping_add(2) & ADDRESS_MASK;
        self.stack[self.stack_pointer] = return_addr;
        self.stack_pointer += 1;
        debug!(
            "call {:03x} from {:03x}, depth {}",
            addr, self.program_counter, self.stack_pointer
        );
        Ok(Advance::Jump(addr))
    }

    /// (00ee) RET return from the current sub-routine
    fn ret(&mut self) -> Result<Advance, Error> {
        if self.stack_pointer == 0 {
            return Err(Error::StackUnderflow {
                pc: self.program_counter,
            });
        }

        self.stack_pointer -= 1;
        let return_addr = self.stack[self.stack_pointer];
        debug!("return to {:03x}, depth {}", return_addr, self.stack_pointer);
        Ok(Advance::Jump(return_addr))
    }

    /// (8xy4) ADD Vy to Vx, VF is the carry
    fn add_xy(&mut self, x: u8, y: u8) -> Advance {
        let (val, overflow) = self.v(x).overflowing_add(self.v(y));
        self.set_v_with_flag(x, val, overflow)
    }

    /// (8xy5) SUB Vy from Vx, VF is set when there is no borrow
    fn sub_xy(&mut self, x: u8, y: u8) -> Advance {
        let (vx, vy) = (self.v(x), self.v(y));
        self.set_v_with_flag(x, vx.wrapping_sub(vy), vx >= vy)
    }

    /// (8xy7) SUBN Vx := Vy - Vx, VF is set when there is no borrow
    fn subn_xy(&mut self, x: u8, y: u8) -> Advance {
        let (vx, vy) = (self.v(x), self.v(y));
        self.set_v_with_flag(x, vy.wrapping_sub(vx), vy >= vx)
    }

    /// (8xy6) SHR Vx, VF takes the bit shifted out
    fn shr(&mut self, x: u8) -> Advance {
        let vx = self.v(x);
        self.set_v_with_flag(x, vx >> 1, vx & 0x01 != 0)
    }

    /// (8xye) SHL Vx, VF takes the bit shifted out
    fn shl(&mut self, x: u8) -> Advance {
        let vx = self.v(x);
        self.set_v_with_flag(x, vx << 1, vx & 0x80 != 0)
    }

    /// (dxyn) DRW XOR an 8 x `n` sprite from memory[I] onto the framebuffer at
    /// (Vx, Vy), wrapping on both axes. VF is set if any lit pixel was erased.
    fn draw(&mut self, x: u8, y: u8, n: u8) -> Advance {
        let origin_x = self.v(x) as usize;
        let origin_y = self.v(y) as usize;
        let mut collision = false;

        for row in 0..n as u16 {
            let sprite = self.memory[(self.index.wrapping_add(row) & ADDRESS_MASK) as usize];
            let py = (origin_y + row as usize) % HEIGHT;

            for col in 0..8 {
                if sprite & (0x80 >> col) == 0 {
                    continue;
                }
                let px = (origin_x + col) % WIDTH;
                let pixel = &mut self.display[py * WIDTH + px];
                if *pixel != 0 {
                    collision = true;
                    *pixel = 0;
                } else {
                    *pixel = 1;
                }
            }
        }

        self.registers[FLAG] = collision as u8;
        Advance::Next
    }

    /// (fx0a) LD Vx, K block until a key is down
    fn wait_for_key(&mut self, x: u8) -> Advance {
        match self.keyboard.first_pressed() {
            Some(key) => {
                debug!("key {:x} pressed, stored in V{:X}", key, x);
                self.set_v(x, key)
            }
            None => Advance::Stay,
        }
    }

    /// (fx33) LD B, Vx hundreds, tens and ones of Vx into memory[I..I+3]
    fn bcd(&mut self, x: u8) -> Advance {
        let vx = self.v(x);
        let digits = [vx / 100, (vx / 10) % 10, vx % 10];
        for (offset, digit) in (0u16..).zip(digits) {
            self.store_byte(self.index.wrapping_add(offset), digit);
        }
        Advance::Next
    }

    /// (fx55) LD [I], Vx store V0..=Vx from memory[I]. I is left unchanged.
    fn store_registers(&mut self, x: u8) -> Advance {
        for reg in 0..=(x & 0xF) {
            self.store_byte(self.index.wrapping_add(reg as u16), self.v(reg));
        }
        Advance::Next
    }

    /// (fx65) LD Vx, [I] load V0..=Vx from memory[I]. I is left unchanged.
    fn load_registers(&mut self, x: u8) -> Advance {
        for reg in 0..=(x & 0xF) {
            let addr = self.index.wrapping_add(reg as u16) & ADDRESS_MASK;
            self.registers[reg as usize] = self.memory[addr as usize];
        }
        Advance::Next
    }

    // Program writes wrap to 12 bits and may not touch the font table.
    fn store_byte(&mut self, address: u16, val: u8) {
        let address = address & ADDRESS_MASK;
        if address < FONT_END {
            warn!(
                "write of {:02x} to font area {:03x} at {:03x} ignored",
                val, address, self.program_counter
            );
            return;
        }
        self.memory[address as usize] = val;
    }

    pub fn read_register(&self, address: u8) -> Option<u8> {
        self.registers.get(address as usize).copied()
    }

    pub fn write_register(&mut self, address: u8, val: u8) -> Result<(), Error> {
        let address_usize = address as usize;
        if address_usize < self.registers.len() {
            self.registers[address_usize] = val;
            Ok(())
        } else {
            Err(Error::RegisterOutOfBounds(address))
        }
    }

    pub fn read_memory(&self, address: u16) -> Option<u8> {
        self.memory.get(address as usize).copied()
    }

    pub fn write_memory(&mut self, address: u16, val: u8) -> Result<(), Error> {
        let index = address as usize;
        if index < self.memory.len() {
            self.memory[index] = val;
            Ok(())
        } else {
            Err(Error::AddressOutOfBounds(address))
        }
    }

    pub fn write_memory_batch(&mut self, writes: &[(u16, u8)]) -> Result<(), Error> {
        for &(address, value) in writes {
            self.write_memory(address, value)?;
        }
        Ok(())
    }

    /// Write big-endian 16-bit instructions, e.g. `(0x200, 0x00E0)`.
    pub fn write_instructions_batch(&mut self, instructions: &[(u16, u16)]) -> Result<(), Error> {
        for &(address, instruction) in instructions {
            let [high, low] = instruction.to_be_bytes();
            self.write_memory(address, high)?;
            self.write_memory(address.wrapping_add(1), low)?;
        }
        Ok(())
    }

    /// Copy a program image to 0x200. Nothing below 0x200 is touched.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), Error> {
        let start = PROGRAM_START as usize;
        let capacity = MEMORY_SIZE - start;
        if program.len() > capacity {
            return Err(Error::RomTooLarge {
                size: program.len(),
                capacity,
            });
        }
        self.memory[start..start + program.len()].copy_from_slice(program);
        Ok(())
    }

    /// Row-major 64x32 framebuffer, one byte per pixel, nonzero is lit.
    pub fn read_display(&self) -> &[u8; WIDTH * HEIGHT] {
        &self.display
    }

    pub fn program_counter(&self) -> u16 {
        self.program_counter
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn stack_depth(&self) -> usize {
        self.stack_pointer
    }

    /// The opcode fetched by the most recent cycle.
    pub fn opcode(&self) -> u16 {
        self.opcode
    }

    fn write_fonts_to_memory(&mut self) {
        // The font data occupies the first 80 bytes of memory.
        // We don't use write_memory_batch here as that would be slower
        let start = FONT_START as usize;
        let end = start + FONT_DATA.len();
        self.memory[start..end].copy_from_slice(&FONT_DATA);
    }
}
