use crate::cpu::{MEMORY_SIZE, PROGRAM_START};
use crate::error::Error;
use log::info;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Largest image that fits between the program entry point and the end of
/// memory.
pub const MAX_ROM_SIZE: usize = MEMORY_SIZE - PROGRAM_START as usize;

/// A program image ready to be copied to 0x200.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Rom {
    instructions: Vec<u8>,
}

impl Rom {
    pub fn open(file: &Path) -> Result<Self, Error> {
        let mut buffer = BufReader::new(File::open(file)?);
        let mut instructions = Vec::new();
        buffer.read_to_end(&mut instructions)?;

        let rom = Self::from_bytes(instructions)?;
        info!("loaded {} ({} bytes)", file.display(), rom.len());
        Ok(rom)
    }

    pub fn from_bytes(instructions: Vec<u8>) -> Result<Self, Error> {
        if instructions.len() > MAX_ROM_SIZE {
            return Err(Error::RomTooLarge {
                size: instructions.len(),
                capacity: MAX_ROM_SIZE,
            });
        }
        Ok(Self { instructions })
    }

    pub fn instructions(&self) -> &[u8] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::Cpu;
    use std::fs;

    #[test]
    fn open() -> Result<(), Error> {
        let path = std::env::temp_dir().join(format!("chip8-rom-{}.ch8", std::process::id()));
        fs::write(&path, [0x00, 0xE0, 0x12, 0x02])?;

        let rom = Rom::open(&path);
        fs::remove_file(&path)?;
        let rom = rom?;

        assert_eq!(rom.instructions(), &[0x00, 0xE0, 0x12, 0x02]);

        let mut cpu = Cpu::default();
        cpu.load_program(rom.instructions())?;
        assert_eq!(cpu.read_memory(0x200), Some(0x00));
        assert_eq!(cpu.read_memory(0x203), Some(0x02));
        assert_eq!(cpu.read_memory(0x1FF), Some(0x00));

        Ok(())
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = Rom::open(Path::new("./roms/does-not-exist.ch8"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn oversized_image_is_rejected() {
        assert!(Rom::from_bytes(vec![0; MAX_ROM_SIZE]).is_ok());
        assert!(matches!(
            Rom::from_bytes(vec![0; MAX_ROM_SIZE + 1]),
            Err(Error::RomTooLarge { .. })
        ));
    }
}
