//! Built-in smoke tests, runnable from the command line.
//!
//! These are not the test suite (`cargo test` covers far more), just
//! quick pass/fail checks a packaged binary can run on any machine:
//! a tiny CPU program executed out of work RAM, the PPUDATA address
//! increment rules, nametable mirroring through the register file,
//! and MMC1 bank switching. Each returns `true` on pass.

use cpu_2a03::Bus;

use crate::console::Console;

/// Run a 10-instruction program at $0000 and verify its memory
/// results. With no cartridge the reset vector reads as $0000, so the
/// CPU starts right on the program.
///
/// ```text
/// LDX #$10; TXS; LDA #$05; STA $10; LDA #$03; ADC $10; STA $11;
/// INX; STX $12; BRK
/// ```
///
/// Expects $10=$05, $11=$08, $12=$11.
pub fn cpu_tiny() -> bool {
    let program: [u8; 17] = [
        0xA2, 0x10, // LDX #$10
        0x9A, // TXS
        0xA9, 0x05, // LDA #$05
        0x85, 0x10, // STA $10
        0xA9, 0x03, // LDA #$03
        0x65, 0x10, // ADC $10
        0x85, 0x11, // STA $11
        0xE8, // INX
        0x86, 0x12, // STX $12
        0x00, // BRK
    ];

    let mut console = Console::new();
    let bus = console.bus_mut();
    bus.ram[..program.len()].copy_from_slice(&program);
    bus.ram[0x10] = 0;
    bus.ram[0x11] = 0;
    bus.ram[0x12] = 0;

    console.reset_cpu();
    for _ in 0..10 {
        console.step_instruction();
    }

    let bus = console.bus();
    bus.peek_ram(0x10) == 0x05 && bus.peek_ram(0x11) == 0x08 && bus.peek_ram(0x12) == 0x11
}

/// PPUDATA must advance `v` by 1 or 32 purely on PPUCTRL bit 2, in
/// both the palette and nametable ranges.
pub fn ppu_vram_increment() -> bool {
    let mut console = Console::new();
    let bus = console.bus_mut();

    let mut case = |ctrl: u8, hi: u8, lo: u8, expect: u16| -> bool {
        bus.write(0x2000, ctrl);
        bus.write(0x2006, hi);
        bus.write(0x2006, lo);
        bus.write(0x2007, 0x00);
        bus.ppu.v() & 0x3FFF == expect
    };

    case(0x00, 0x3F, 0x00, 0x3F01)
        && case(0x04, 0x3F, 0x04, 0x3F24)
        && case(0x04, 0x20, 0x00, 0x2020)
        && case(0x00, 0x23, 0xFF, 0x2400)
}

/// Write through $2006/$2007 and confirm the byte lands at the
/// mirrored nametable address for both header mirroring modes.
pub fn ppu_mirroring() -> bool {
    let horizontal = {
        let mut console = Console::new();
        if console.insert_cartridge(&mirror_test_rom(false)).is_err() {
            return false;
        }
        let bus = console.bus_mut();
        write_vram(bus, 0x2000, 0x12);
        write_vram(bus, 0x2C10, 0x34);
        bus.peek_nametable(0x2400) == 0x12 && bus.peek_nametable(0x2810) == 0x34
    };

    let vertical = {
        let mut console = Console::new();
        if console.insert_cartridge(&mirror_test_rom(true)).is_err() {
            return false;
        }
        let bus = console.bus_mut();
        write_vram(bus, 0x2000, 0x56);
        write_vram(bus, 0x2410, 0x78);
        bus.peek_nametable(0x2800) == 0x56 && bus.peek_nametable(0x2C10) == 0x78
    };

    horizontal && vertical
}

/// MMC1 basics: power-on maps the last PRG bank high, serial writes
/// switch the $8000 window.
pub fn mapper_mmc1_basic() -> bool {
    let mut console = Console::new();
    if console.insert_cartridge(&mmc1_test_rom()).is_err() {
        return false;
    }
    let bus = console.bus_mut();

    // Reset vector lives in the fixed last bank.
    if bus.read(0xFFFC) != 0x34 || bus.read(0xFFFD) != 0x12 {
        return false;
    }
    if bus.read(0x8000) != 0xA0 {
        return false;
    }

    // Select PRG bank 1: value 1, LSB first, spaced two cycles so the
    // MMC1 write filter accepts every bit.
    let mut cycle = bus.cycles();
    for bit in 0..5 {
        bus.mapper.cpu_write(0xE000, (0x01 >> bit) & 1, cycle);
        cycle += 2;
    }

    bus.read(0x8000) == 0xB0 && bus.read(0xC000) == 0xB0
}

fn write_vram(bus: &mut crate::bus::NesBus, addr: u16, value: u8) {
    bus.write(0x2006, (addr >> 8) as u8);
    bus.write(0x2006, addr as u8);
    bus.write(0x2007, value);
}

/// Mapper-0 image, 1×16 KiB PRG + 1×8 KiB CHR, chosen mirroring.
fn mirror_test_rom(vertical: bool) -> Vec<u8> {
    let mut rom = vec![0u8; 16 + 16 * 1024 + 8 * 1024];
    rom[0..4].copy_from_slice(b"NES\x1A");
    rom[4] = 1;
    rom[5] = 1;
    rom[6] = u8::from(vertical);
    rom
}

/// Mapper-1 image, 2×16 KiB PRG banks filled $A0/$B0, reset vector
/// $1234 at the end of the last bank.
fn mmc1_test_rom() -> Vec<u8> {
    let prg = 2 * 16 * 1024;
    let mut rom = vec![0u8; 16 + prg + 8 * 1024];
    rom[0..4].copy_from_slice(b"NES\x1A");
    rom[4] = 2;
    rom[5] = 1;
    rom[6] = 0x10; // mapper 1, horizontal
    rom[16..16 + 16 * 1024].fill(0xA0);
    rom[16 + 16 * 1024..16 + prg].fill(0xB0);
    rom[16 + prg - 4] = 0x34; // $FFFC
    rom[16 + prg - 3] = 0x12; // $FFFD
    rom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_self_tests_pass() {
        assert!(cpu_tiny());
        assert!(ppu_vram_increment());
        assert!(ppu_mirroring());
        assert!(mapper_mmc1_basic());
    }
}
