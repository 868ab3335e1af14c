//! End-to-end scenarios against the public console surface.

use cpu_2a03::Bus;
use nes_core::{Button, Console};

/// Mapper-0 image: 32 KiB of NOPs, reset vector $8000.
fn nop_rom() -> Vec<u8> {
    let mut rom = vec![0u8; 16 + 32 * 1024 + 8 * 1024];
    rom[0..4].copy_from_slice(b"NES\x1A");
    rom[4] = 2;
    rom[5] = 1;
    rom[16..16 + 32 * 1024].fill(0xEA);
    rom[16 + 0x7FFC] = 0x00;
    rom[16 + 0x7FFD] = 0x80;
    rom
}

#[test]
fn cpu_program_in_work_ram() {
    // LDX #$10 / TXS / LDA #$05 / STA $10 / LDA #$03 / ADC $10 /
    // STA $11 / INX / STX $12 / BRK. Expect $10=$05 $11=$08 $12=$11.
    let program: [u8; 17] = [
        0xA2, 0x10, 0x9A, 0xA9, 0x05, 0x85, 0x10, 0xA9, 0x03, 0x65, 0x10, 0x85, 0x11, 0xE8, 0x86,
        0x12, 0x00,
    ];
    let mut console = Console::new();
    console.bus_mut().ram[..program.len()].copy_from_slice(&program);
    console.reset_cpu(); // no cartridge: vector reads $0000
    for _ in 0..10 {
        console.step_instruction();
    }
    assert_eq!(console.bus().peek_ram(0x10), 0x05);
    assert_eq!(console.bus().peek_ram(0x11), 0x08);
    assert_eq!(console.bus().peek_ram(0x12), 0x11);
}

#[test]
fn ppudata_increment_modes() {
    let mut console = Console::new();
    let bus = console.bus_mut();

    bus.write(0x2000, 0x00);
    bus.write(0x2006, 0x3F);
    bus.write(0x2006, 0x00);
    bus.write(0x2007, 0x12);
    assert_eq!(bus.ppu.v() & 0x3FFF, 0x3F01);

    bus.write(0x2000, 0x04);
    bus.write(0x2006, 0x20);
    bus.write(0x2006, 0x00);
    bus.write(0x2007, 0x34);
    assert_eq!(bus.ppu.v() & 0x3FFF, 0x2020);
}

#[test]
fn ppudata_write_then_read_back() {
    let mut console = Console::new();
    console.insert_cartridge(&nop_rom()).unwrap();
    let bus = console.bus_mut();

    bus.write(0x2000, 0x00);
    bus.write(0x2006, 0x21);
    bus.write(0x2006, 0x00);
    for value in [0x11u8, 0x22, 0x33, 0x44] {
        bus.write(0x2007, value);
    }

    bus.write(0x2006, 0x21);
    bus.write(0x2006, 0x00);
    bus.read(0x2007); // buffer priming read
    for value in [0x11u8, 0x22, 0x33, 0x44] {
        assert_eq!(bus.read(0x2007), value);
    }
}

fn mirror_rom(vertical: bool) -> Vec<u8> {
    let mut rom = vec![0u8; 16 + 16 * 1024 + 8 * 1024];
    rom[0..4].copy_from_slice(b"NES\x1A");
    rom[4] = 1;
    rom[5] = 1;
    rom[6] = u8::from(vertical);
    rom
}

fn write_vram(bus: &mut nes_core::bus::NesBus, addr: u16, value: u8) {
    bus.write(0x2006, (addr >> 8) as u8);
    bus.write(0x2006, addr as u8);
    bus.write(0x2007, value);
}

#[test]
fn horizontal_mirroring_pairs_left_right() {
    let mut console = Console::new();
    console.insert_cartridge(&mirror_rom(false)).unwrap();
    let bus = console.bus_mut();
    write_vram(bus, 0x2000, 0x12);
    assert_eq!(bus.peek_nametable(0x2400), 0x12);
    write_vram(bus, 0x2C10, 0x34);
    assert_eq!(bus.peek_nametable(0x2810), 0x34);
}

#[test]
fn vertical_mirroring_pairs_top_bottom() {
    let mut console = Console::new();
    console.insert_cartridge(&mirror_rom(true)).unwrap();
    let bus = console.bus_mut();
    write_vram(bus, 0x2000, 0x56);
    assert_eq!(bus.peek_nametable(0x2800), 0x56);
    write_vram(bus, 0x2410, 0x78);
    assert_eq!(bus.peek_nametable(0x2C10), 0x78);
}

#[test]
fn mmc1_bank_switch_scenario() {
    // 2×16 KiB PRG (fills $A0/$B0), reset vector $1234 in the last
    // bank.
    let prg = 2 * 16 * 1024;
    let mut rom = vec![0u8; 16 + prg + 8 * 1024];
    rom[0..4].copy_from_slice(b"NES\x1A");
    rom[4] = 2;
    rom[5] = 1;
    rom[6] = 0x10; // mapper 1
    rom[16..16 + 16 * 1024].fill(0xA0);
    rom[16 + 16 * 1024..16 + prg].fill(0xB0);
    rom[16 + prg - 4] = 0x34;
    rom[16 + prg - 3] = 0x12;

    let mut console = Console::new();
    console.insert_cartridge(&rom).unwrap();
    let bus = console.bus_mut();

    assert_eq!(bus.read(0xFFFC), 0x34);
    assert_eq!(bus.read(0x8000), 0xA0);

    // Serial-write PRG bank = 1 to $E000, bits spaced 2 cycles apart.
    let mut cycle = bus.cycles();
    for bit in 0..5 {
        bus.mapper.cpu_write(0xE000, (0x01 >> bit) & 1, cycle);
        cycle += 2;
    }

    assert_eq!(bus.read(0x8000), 0xB0);
    assert_eq!(bus.read(0xC000), 0xB0);
}

#[test]
fn mmc1_write_spacing_boundary() {
    // Two writes at cycles C and C+1: only the first lands. At C and
    // C+2: both land.
    let mut rom = vec![0u8; 16 + 32 * 1024 + 8 * 1024];
    rom[0..4].copy_from_slice(b"NES\x1A");
    rom[4] = 2;
    rom[5] = 1;
    rom[6] = 0x10;
    let mut console = Console::new();
    console.insert_cartridge(&rom).unwrap();
    let mapper = &mut console.bus_mut().mapper;

    mapper.cpu_write(0x8000, 1, 100);
    mapper.cpu_write(0x8000, 1, 101); // rejected
    mapper.cpu_write(0x8000, 1, 103);
    mapper.cpu_write(0x8000, 1, 105);
    mapper.cpu_write(0x8000, 1, 107);
    // Four accepted bits: no commit yet, mirroring still the default.
    // A fifth accepted write commits control = %11111.
    mapper.cpu_write(0x8000, 1, 109);
    assert_eq!(mapper.mirroring(), nes_core::Mirroring::Horizontal);
}

#[test]
fn controller_strobe_scenario() {
    let mut console = Console::new();
    console.press_button(Button::A);
    console.press_button(Button::Start);
    let bus = console.bus_mut();
    bus.write(0x4016, 1);
    bus.write(0x4016, 0);
    let bits: Vec<u8> = (0..8).map(|_| bus.read(0x4016) & 1).collect();
    assert_eq!(bits, [1, 0, 0, 1, 0, 0, 0, 0]);
    assert_eq!(bus.read(0x4016) & 1, 1); // ninth read
}

#[test]
fn silent_apu_emits_a_frame_of_zero_samples() {
    let mut console = Console::new();
    console.insert_cartridge(&nop_rom()).unwrap();
    let mut sink = [0.0f32; 1024];
    console.drain_apu_samples(&mut sink); // discard reset-time samples
    console.next_frame();
    let mut out = [1.0f32; 1024];
    let count = console.drain_apu_samples(&mut out);
    assert!((700..=760).contains(&count), "got {count}");
    assert!(out[..count].iter().all(|&s| s == 0.0));
}

#[test]
fn oam_dma_costs_513_stall_cycles() {
    // STA $4014 with A=$02: 4 instruction cycles + 513 stall.
    let mut console = Console::new();
    let program = [0xA9, 0x02, 0x8D, 0x14, 0x40]; // LDA #$02 / STA $4014
    console.bus_mut().ram[..program.len()].copy_from_slice(&program);
    console.reset_cpu();
    assert_eq!(console.step_instruction(), 2);
    assert_eq!(console.step_instruction(), 4 + 513);
}

#[test]
fn ppu_advances_three_dots_per_cpu_cycle() {
    let mut console = Console::new();
    console.insert_cartridge(&nop_rom()).unwrap();
    for _ in 0..50 {
        let before = dot_index(&console);
        let cycles = console.step_instruction();
        let after = dot_index(&console);
        assert_eq!(after - before, 3 * u64::from(cycles));
    }
}

fn dot_index(console: &Console) -> u64 {
    let ppu = &console.bus().ppu;
    (ppu.scanline() + 1) as u64 * 341 + u64::from(ppu.dot())
}

#[test]
fn frame_buffer_has_expected_dimensions() {
    let console = Console::new();
    assert_eq!(console.frame_buffer().len(), 256 * 240);
}

#[test]
fn loader_errors_surface_through_insert() {
    let mut console = Console::new();
    assert!(matches!(
        console.insert_cartridge(b"NESx"),
        Err(nes_core::LoadError::HeaderInvalid)
    ));

    let mut rom = mirror_rom(false);
    rom[6] = 0x60; // mapper 6
    assert!(matches!(
        console.insert_cartridge(&rom),
        Err(nes_core::LoadError::UnsupportedMapper(6))
    ));
}
