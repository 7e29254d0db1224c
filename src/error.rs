use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::sync;

// Import the minifb error type and rename it to avoid name conflicts
use minifb::Error as MinifbError;

/// A custom error type for the CHIP‑8 interpreter
#[derive(Debug)]
pub enum Error {
    /// I/O errors (e.g. reading a ROM file)
    Io(io::Error),
    /// CALL with all 16 return slots in use. Fatal to the session.
    StackOverflow { pc: u16 },
    /// RET with nothing on the stack. Fatal to the session.
    StackUnderflow { pc: u16 },
    /// Host-side memory access outside the 4K address space
    AddressOutOfBounds(u16),
    /// Host-side register access outside V0..=VF
    RegisterOutOfBounds(u8),
    /// Program image does not fit between 0x200 and the end of memory
    RomTooLarge { size: usize, capacity: usize },
    /// Errors resulting from poisoned mutex locks
    Poison(String),
    /// Errors from the minifb graphics library
    Minifb(MinifbError),
    /// Errors from the tinyaudio output device
    Audio(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "IO Error: {}", e),
            Error::StackOverflow { pc } => {
                write!(f, "CPU Error: stack overflow at {:#05x}", pc)
            }
            Error::StackUnderflow { pc } => {
                write!(f, "CPU Error: stack underflow at {:#05x}", pc)
            }
            Error::AddressOutOfBounds(addr) => {
                write!(f, "CPU Error: memory address {:#06x} out of bounds", addr)
            }
            Error::RegisterOutOfBounds(reg) => {
                write!(f, "CPU Error: register index {:#x} out of bounds", reg)
            }
            Error::RomTooLarge { size, capacity } => write!(
                f,
                "ROM Error: program is {} bytes, only {} bytes available",
                size, capacity
            ),
            Error::Poison(msg) => write!(f, "Mutex Poison Error: {}", msg),
            Error::Minifb(e) => write!(f, "Minifb Error: {}", e),
            Error::Audio(msg) => write!(f, "Audio Error: {}", msg),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl<T> From<sync::PoisonError<T>> for Error {
    fn from(err: sync::PoisonError<T>) -> Self {
        Error::Poison(format!("Mutex poisoned: {}", err))
    }
}

impl From<MinifbError> for Error {
    fn from(err: MinifbError) -> Self {
        Error::Minifb(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_errors_name_the_address() {
        let err = Error::StackOverflow { pc: 0x2A4 };
        assert_eq!(err.to_string(), "CPU Error: stack overflow at 0x2a4");

        let err = Error::StackUnderflow { pc: 0x200 };
        assert_eq!(err.to_string(), "CPU Error: stack underflow at 0x200");
    }

    #[test]
    fn io_errors_keep_their_source() {
        let err: Error = io::Error::new(io::ErrorKind::NotFound, "missing.ch8").into();
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("IO Error"));
    }

    #[test]
    fn poisoned_mutex_converts() {
        let lock = std::sync::Arc::new(std::sync::Mutex::new(0u8));
        let clone = std::sync::Arc::clone(&lock);
        let _ = std::thread::spawn(move || {
            let _guard = clone.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        let err: Error = lock.lock().unwrap_err().into();
        assert!(matches!(err, Error::Poison(_)));
    }
}
