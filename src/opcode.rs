use std::fmt;

/// A decoded CHIP-8 instruction.
///
/// Operand fields keep their conventional names: `x`/`y` are register
/// indices (always 0..=0xF), `kk` is an 8-bit immediate, `n` a 4-bit
/// immediate and `addr` a 12-bit address.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// (0nnn) SYS, machine code call on the COSMAC VIP
    Sys { addr: u16 },
    /// (00e0) CLS
    Cls,
    /// (00ee) RET
    Ret,
    /// (1nnn) JP addr
    Jp { addr: u16 },
    /// (2nnn) CALL addr
    Call { addr: u16 },
    /// (3xkk) SE Vx, kk
    SeImm { x: u8, kk: u8 },
    /// (4xkk) SNE Vx, kk
    SneImm { x: u8, kk: u8 },
    /// (5xy0) SE Vx, Vy
    SeReg { x: u8, y: u8 },
    /// (6xkk) LD Vx, kk
    LdImm { x: u8, kk: u8 },
    /// (7xkk) ADD Vx, kk
    AddImm { x: u8, kk: u8 },
    /// (8xy0) LD Vx, Vy
    LdReg { x: u8, y: u8 },
    /// (8xy1) OR Vx, Vy
    Or { x: u8, y: u8 },
    /// (8xy2) AND Vx, Vy
    And { x: u8, y: u8 },
    /// (8xy3) XOR Vx, Vy
    Xor { x: u8, y: u8 },
    /// (8xy4) ADD Vx, Vy
    AddReg { x: u8, y: u8 },
    /// (8xy5) SUB Vx, Vy
    Sub { x: u8, y: u8 },
    /// (8xy6) SHR Vx
    Shr { x: u8, y: u8 },
    /// (8xy7) SUBN Vx, Vy
    Subn { x: u8, y: u8 },
    /// (8xye) SHL Vx
    Shl { x: u8, y: u8 },
    /// (9xy0) SNE Vx, Vy
    SneReg { x: u8, y: u8 },
    /// (annn) LD I, addr
    LdI { addr: u16 },
    /// (bnnn) JP V0, addr
    JpV0 { addr: u16 },
    /// (cxkk) RND Vx, kk
    Rnd { x: u8, kk: u8 },
    /// (dxyn) DRW Vx, Vy, n
    Drw { x: u8, y: u8, n: u8 },
    /// (ex9e) SKP Vx
    Skp { x: u8 },
    /// (exa1) SKNP Vx
    Sknp { x: u8 },
    /// (fx07) LD Vx, DT
    LdVxDt { x: u8 },
    /// (fx0a) LD Vx, K
    LdVxK { x: u8 },
    /// (fx15) LD DT, Vx
    LdDtVx { x: u8 },
    /// (fx18) LD ST, Vx
    LdStVx { x: u8 },
    /// (fx1e) ADD I, Vx
    AddI { x: u8 },
    /// (fx29) LD F, Vx
    LdF { x: u8 },
    /// (fx33) LD B, Vx
    Bcd { x: u8 },
    /// (fx55) LD [I], Vx
    Store { x: u8 },
    /// (fx65) LD Vx, [I]
    Load { x: u8 },
    /// Anything that matches no pattern above
    Unknown(u16),
}

impl Instruction {
    /// Classify a raw 16-bit opcode. Total: every value maps to exactly one
    /// variant, with `Unknown` catching malformed sub-opcodes.
    pub fn decode(opcode: u16) -> Self {
        // 0x73EE
        // 73 = High Byte, EE = Low Byte
        // 7 = High Nibble, 3 = Low Nibble, same for EE
        let c = ((opcode & 0xF000) >> 12) as u8;
        let x = ((opcode & 0x0F00) >> 8) as u8;
        let y = ((opcode & 0x00F0) >> 4) as u8;
        let n = (opcode & 0x000F) as u8;
        let kk = (opcode & 0x00FF) as u8;
        let addr = opcode & 0x0FFF;

        use Instruction::*;
        match (c, x, y, n) {
            (0x0, 0x0, 0xE, 0x0) => Cls,
            (0x0, 0x0, 0xE, 0xE) => Ret,
            (0x0, _, _, _) => Sys { addr },
            (0x1, _, _, _) => Jp { addr },
            (0x2, _, _, _) => Call { addr },
            (0x3, _, _, _) => SeImm { x, kk },
            (0x4, _, _, _) => SneImm { x, kk },
            (0x5, _, _, 0x0) => SeReg { x, y },
            (0x6, _, _, _) => LdImm { x, kk },
            (0x7, _, _, _) => AddImm { x, kk },
            (0x8, _, _, 0x0) => LdReg { x, y },
            (0x8, _, _, 0x1) => Or { x, y },
            (0x8, _, _, 0x2) => And { x, y },
            (0x8, _, _, 0x3) => Xor { x, y },
            (0x8, _, _, 0x4) => AddReg { x, y },
            (0x8, _, _, 0x5) => Sub { x, y },
            (0x8, _, _, 0x6) => Shr { x, y },
            (0x8, _, _, 0x7) => Subn { x, y },
            (0x8, _, _, 0xE) => Shl { x, y },
            (0x9, _, _, 0x0) => SneReg { x, y },
            (0xA, _, _, _) => LdI { addr },
            (0xB, _, _, _) => JpV0 { addr },
            (0xC, _, _, _) => Rnd { x, kk },
            (0xD, _, _, _) => Drw { x, y, n },
            (0xE, _, 0x9, 0xE) => Skp { x },
            (0xE, _, 0xA, 0x1) => Sknp { x },
            (0xF, _, 0x0, 0x7) => LdVxDt { x },
            (0xF, _, 0x0, 0xA) => LdVxK { x },
            (0xF, _, 0x1, 0x5) => LdDtVx { x },
            (0xF, _, 0x1, 0x8) => LdStVx { x },
            (0xF, _, 0x1, 0xE) => AddI { x },
            (0xF, _, 0x2, 0x9) => LdF { x },
            (0xF, _, 0x3, 0x3) => Bcd { x },
            (0xF, _, 0x5, 0x5) => Store { x },
            (0xF, _, 0x6, 0x5) => Load { x },
            _ => Unknown(opcode),
        }
    }
}

impl From<u16> for Instruction {
    fn from(opcode: u16) -> Self {
        Instruction::decode(opcode)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;
        match *self {
            Sys { addr } => write!(f, "SYS {:#05x}", addr),
            Cls => write!(f, "CLS"),
            Ret => write!(f, "RET"),
            Jp { addr } => write!(f, "JP {:#05x}", addr),
            Call { addr } => write!(f, "CALL {:#05x}", addr),
            SeImm { x, kk } => write!(f, "SE V{:X}, {:#04x}", x, kk),
            SneImm { x, kk } => write!(f, "SNE V{:X}, {:#04x}", x, kk),
            SeReg { x, y } => write!(f, "SE V{:X}, V{:X}", x, y),
            LdImm { x, kk } => write!(f, "LD V{:X}, {:#04x}", x, kk),
            AddImm { x, kk } => write!(f, "ADD V{:X}, {:#04x}", x, kk),
            LdReg { x, y } => write!(f, "LD V{:X}, V{:X}", x, y),
            Or { x, y } => write!(f, "OR V{:X}, V{:X}", x, y),
            And { x, y } => write!(f, "AND V{:X}, V{:X}", x, y),
            Xor { x, y } => write!(f, "XOR V{:X}, V{:X}", x, y),
            AddReg { x, y } => write!(f, "ADD V{:X}, V{:X}", x, y),
            Sub { x, y } => write!(f, "SUB V{:X}, V{:X}", x, y),
            Shr { x, .. } => write!(f, "SHR V{:X}", x),
            Subn { x, y } => write!(f, "SUBN V{:X}, V{:X}", x, y),
            Shl { x, .. } => write!(f, "SHL V{:X}", x),
            SneReg { x, y } => write!(f, "SNE V{:X}, V{:X}", x, y),
            LdI { addr } => write!(f, "LD I, {:#05x}", addr),
            JpV0 { addr } => write!(f, "JP V0, {:#05x}", addr),
            Rnd { x, kk } => write!(f, "RND V{:X}, {:#04x}", x, kk),
            Drw { x, y, n } => write!(f, "DRW V{:X}, V{:X}, {}", x, y, n),
            Skp { x } => write!(f, "SKP V{:X}", x),
            Sknp { x } => write!(f, "SKNP V{:X}", x),
            LdVxDt { x } => write!(f, "LD V{:X}, DT", x),
            LdVxK { x } => write!(f, "LD V{:X}, K", x),
            LdDtVx { x } => write!(f, "LD DT, V{:X}", x),
            LdStVx { x } => write!(f, "LD ST, V{:X}", x),
            AddI { x } => write!(f, "ADD I, V{:X}", x),
            LdF { x } => write!(f, "LD F, V{:X}", x),
            Bcd { x } => write!(f, "LD B, V{:X}", x),
            Store { x } => write!(f, "LD [I], V{:X}", x),
            Load { x } => write!(f, "LD V{:X}, [I]", x),
            Unknown(opcode) => write!(f, "DW {:#06x}", opcode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_operand_fields() {
        assert_eq!(Instruction::decode(0x1ABC), Instruction::Jp { addr: 0xABC });
        assert_eq!(
            Instruction::decode(0x3A42),
            Instruction::SeImm { x: 0xA, kk: 0x42 }
        );
        assert_eq!(
            Instruction::decode(0xD12F),
            Instruction::Drw { x: 1, y: 2, n: 0xF }
        );
        assert_eq!(Instruction::decode(0xF733), Instruction::Bcd { x: 7 });
    }

    #[test]
    fn zero_page_group() {
        assert_eq!(Instruction::decode(0x00E0), Instruction::Cls);
        assert_eq!(Instruction::decode(0x00EE), Instruction::Ret);
        assert_eq!(Instruction::decode(0x0000), Instruction::Sys { addr: 0 });
        assert_eq!(
            Instruction::decode(0x0123),
            Instruction::Sys { addr: 0x123 }
        );
    }

    #[test]
    fn malformed_sub_opcodes_are_unknown() {
        for opcode in [0x5121, 0x8AB8, 0x8ABF, 0x9011, 0xE19F, 0xE0A2, 0xF0FF, 0xF130] {
            assert_eq!(
                Instruction::decode(opcode),
                Instruction::Unknown(opcode),
                "{:04x}",
                opcode
            );
        }
    }

    #[test]
    fn every_alu_sub_opcode() {
        let expected = [
            (0x0, Instruction::LdReg { x: 3, y: 4 }),
            (0x1, Instruction::Or { x: 3, y: 4 }),
            (0x2, Instruction::And { x: 3, y: 4 }),
            (0x3, Instruction::Xor { x: 3, y: 4 }),
            (0x4, Instruction::AddReg { x: 3, y: 4 }),
            (0x5, Instruction::Sub { x: 3, y: 4 }),
            (0x6, Instruction::Shr { x: 3, y: 4 }),
            (0x7, Instruction::Subn { x: 3, y: 4 }),
            (0xE, Instruction::Shl { x: 3, y: 4 }),
        ];
        for (n, instruction) in expected {
            assert_eq!(Instruction::decode(0x8340 | n), instruction);
        }
    }

    #[test]
    fn mnemonics() {
        assert_eq!(Instruction::decode(0x6105).to_string(), "LD V1, 0x05");
        assert_eq!(Instruction::decode(0xD013).to_string(), "DRW V0, V1, 3");
        assert_eq!(Instruction::decode(0xA123).to_string(), "LD I, 0x123");
        assert_eq!(Instruction::decode(0xFF65).to_string(), "LD VF, [I]");
        assert_eq!(Instruction::decode(0x5121).to_string(), "DW 0x5121");
    }
}
