use clap::Parser;
use minifb::Scale;
use std::path::PathBuf;

/// Command line options for the windowed interpreter.
#[derive(Parser, Debug, Clone)]
#[command(name = "chip8", version, about = "Run a CHIP-8 program in a window")]
pub struct Config {
    /// Program image to load at 0x200
    pub rom: PathBuf,

    /// Instructions executed per second
    #[arg(long, default_value_t = 700, value_parser = clap::value_parser!(u32).range(60..=100_000))]
    pub hz: u32,

    /// Window scale factor (1, 2, 4, 8, 16 or 32)
    #[arg(long, default_value_t = 8, value_parser = parse_scale)]
    pub scale: u8,

    /// Tone volume while the sound timer runs, 0.0 to 1.0
    #[arg(long, default_value_t = 0.2, value_parser = parse_volume)]
    pub volume: f32,

    /// Seed for the random number opcode
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Config {
    pub fn window_scale(&self) -> Scale {
        match self.scale {
            1 => Scale::X1,
            2 => Scale::X2,
            4 => Scale::X4,
            16 => Scale::X16,
            32 => Scale::X32,
            _ => Scale::X8,
        }
    }
}

fn parse_scale(s: &str) -> Result<u8, String> {
    let scale: u8 = s.parse().map_err(|e| format!("{}", e))?;
    match scale {
        1 | 2 | 4 | 8 | 16 | 32 => Ok(scale),
        _ => Err(format!("{} is not one of 1, 2, 4, 8, 16, 32", scale)),
    }
}

fn parse_volume(s: &str) -> Result<f32, String> {
    let volume: f32 = s.parse().map_err(|e| format!("{}", e))?;
    if (0.0..=1.0).contains(&volume) {
        Ok(volume)
    } else {
        Err(format!("{} is outside 0.0..=1.0", volume))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["chip8", "pong.ch8"]).unwrap();
        assert_eq!(config.rom, PathBuf::from("pong.ch8"));
        assert_eq!(config.hz, 700);
        assert_eq!(config.scale, 8);
        assert_eq!(config.volume, 0.2);
        assert_eq!(config.seed, None);
        assert!(matches!(config.window_scale(), Scale::X8));
    }

    #[test]
    fn overrides() {
        let config = Config::try_parse_from([
            "chip8", "--hz", "1000", "--scale", "4", "--volume", "0", "--seed", "42", "ibm.ch8",
        ])
        .unwrap();
        assert_eq!(config.hz, 1000);
        assert!(matches!(config.window_scale(), Scale::X4));
        assert_eq!(config.volume, 0.0);
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Config::try_parse_from(["chip8", "--scale", "3", "a.ch8"]).is_err());
        assert!(Config::try_parse_from(["chip8", "--volume", "1.5", "a.ch8"]).is_err());
        assert!(Config::try_parse_from(["chip8", "--hz", "0", "a.ch8"]).is_err());
        assert!(Config::try_parse_from(["chip8"]).is_err());
    }
}
