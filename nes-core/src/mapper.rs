//! Cartridge mappers.
//!
//! A mapper serves the whole cartridge side of both buses: CPU
//! $4020–$FFFF and PPU $0000–$1FFF (plus the nametables for boards
//! that route them, i.e. MMC5). Each mapper owns its PRG ROM and CHR
//! data outright; bank registers live next to the bytes they select.
//! Out-of-range bank indices wrap by modulo: a bad write glitches the
//! picture, it never faults.
//!
//! This module holds the trait, the dispatch constructor, and the
//! discrete-logic boards (NROM, UxROM, CNROM, AxROM). The ASIC boards
//! live in their own modules: [`crate::mmc1`], [`crate::mmc3`],
//! [`crate::mmc5`].

use crate::cartridge::{Cartridge, Mirroring};
use crate::mmc1::Mmc1;
use crate::mmc3::Mmc3;
use crate::mmc5::Mmc5;

/// Cartridge hardware as seen from the two buses.
pub trait Mapper {
    /// CPU read in $4020–$FFFF.
    fn cpu_read(&mut self, addr: u16) -> u8;

    /// CPU write in $4020–$FFFF. `cpu_cycle` is the bus clock at the
    /// time of the write; MMC1 uses it to reject back-to-back serial
    /// writes.
    fn cpu_write(&mut self, addr: u16, value: u8, cpu_cycle: u64);

    /// PPU read. Pattern tables for every board; MMC3 watches A12
    /// here; MMC5 also serves $2000–$3EFF.
    fn ppu_read(&mut self, addr: u16) -> u8;

    /// PPU write (CHR RAM and, for MMC5, nametables).
    fn ppu_write(&mut self, addr: u16, value: u8);

    /// Effective nametable mirroring right now.
    fn mirroring(&self) -> Mirroring;

    /// Return to power-on register state. ROM/RAM contents persist.
    fn reset(&mut self);

    /// Level of the cartridge IRQ line (MMC3, MMC5).
    fn irq_pending(&self) -> bool {
        false
    }

    /// True when the mapper routes the $2000–$3EFF range itself and
    /// the PPU must not apply its own mirroring (MMC5).
    fn handles_nametables(&self) -> bool {
        false
    }

    // PPU → mapper timing callbacks. Only MMC5 listens; everything
    // else keeps the no-ops.

    /// Dots 257–320 fetch sprite patterns; the flag is raised at dot
    /// 257 and dropped at dots 1 and 321.
    fn set_fetching_sprites(&mut self, _fetching: bool) {}

    /// Mirror of PPUCTRL bit 5.
    fn set_sprite_size_8x16(&mut self, _is_8x16: bool) {}

    /// Dot 340 of each visible scanline.
    fn on_scanline_end(&mut self, _scanline: u16) {}

    /// Scanline 241, dot 1.
    fn start_vblank(&mut self) {}

    /// A background nametable fetch is about to read `addr`.
    fn notify_nametable_fetch(&mut self, _addr: u16) {}
}

/// Build the mapper for a decoded image, consuming it.
///
/// The loader has already rejected unsupported mapper ids.
pub fn create(cart: Cartridge) -> Box<dyn Mapper> {
    match cart.mapper_id {
        0 => Box::new(Nrom::new(cart)),
        1 => Box::new(Mmc1::new(cart)),
        2 => Box::new(Uxrom::new(cart)),
        3 => Box::new(Cnrom::new(cart)),
        4 => Box::new(Mmc3::new(cart)),
        5 => Box::new(Mmc5::new(cart)),
        7 => Box::new(Axrom::new(cart)),
        id => unreachable!("loader admitted mapper {id}"),
    }
}

/// Stand-in mapper for an empty cartridge slot: every read floats to
/// zero, writes vanish.
pub(crate) struct NoCartridge;

impl Mapper for NoCartridge {
    fn cpu_read(&mut self, _addr: u16) -> u8 {
        0
    }

    fn cpu_write(&mut self, _addr: u16, _value: u8, _cpu_cycle: u64) {}

    fn ppu_read(&mut self, _addr: u16) -> u8 {
        0
    }

    fn ppu_write(&mut self, _addr: u16, _value: u8) {}

    fn mirroring(&self) -> Mirroring {
        Mirroring::Horizontal
    }

    fn reset(&mut self) {}
}

/// Mapper 0 (NROM): no banking at all.
///
/// 16 KiB PRG mirrors across $8000–$FFFF; 32 KiB fills it. CHR is one
/// fixed 8 KiB bank of ROM or RAM.
pub struct Nrom {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    mirroring: Mirroring,
}

impl Nrom {
    pub fn new(cart: Cartridge) -> Self {
        Self {
            prg_rom: cart.prg_rom,
            chr: cart.chr,
            chr_is_ram: cart.chr_is_ram,
            mirroring: cart.mirroring,
        }
    }
}

impl Mapper for Nrom {
    fn cpu_read(&mut self, addr: u16) -> u8 {
        if addr < 0x8000 || self.prg_rom.is_empty() {
            return 0;
        }
        self.prg_rom[(addr as usize - 0x8000) % self.prg_rom.len()]
    }

    fn cpu_write(&mut self, _addr: u16, _value: u8, _cpu_cycle: u64) {}

    fn ppu_read(&mut self, addr: u16) -> u8 {
        self.chr[(addr as usize & 0x1FFF) % self.chr.len().max(1)]
    }

    fn ppu_write(&mut self, addr: u16, value: u8) {
        if self.chr_is_ram {
            let index = (addr as usize & 0x1FFF) % self.chr.len().max(1);
            self.chr[index] = value;
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn reset(&mut self) {}
}

/// Mapper 2 (UxROM): 16 KiB switchable PRG at $8000, last bank fixed
/// at $C000, 8 KiB unbanked CHR (usually RAM).
pub struct Uxrom {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    mirroring: Mirroring,
    prg_bank: u8,
}

impl Uxrom {
    pub fn new(cart: Cartridge) -> Self {
        Self {
            prg_rom: cart.prg_rom,
            chr: cart.chr,
            chr_is_ram: cart.chr_is_ram,
            mirroring: cart.mirroring,
            prg_bank: 0,
        }
    }

    fn bank_count(&self) -> usize {
        (self.prg_rom.len() / (16 * 1024)).max(1)
    }
}

impl Mapper for Uxrom {
    fn cpu_read(&mut self, addr: u16) -> u8 {
        if addr < 0x8000 {
            return 0;
        }
        let bank = if addr < 0xC000 {
            self.prg_bank as usize % self.bank_count()
        } else {
            self.bank_count() - 1
        };
        let offset = bank * 16 * 1024 + (addr as usize & 0x3FFF);
        self.prg_rom[offset % self.prg_rom.len()]
    }

    fn cpu_write(&mut self, addr: u16, value: u8, _cpu_cycle: u64) {
        if addr >= 0x8000 {
            self.prg_bank = value & 0x0F;
        }
    }

    fn ppu_read(&mut self, addr: u16) -> u8 {
        self.chr[(addr as usize & 0x1FFF) % self.chr.len().max(1)]
    }

    fn ppu_write(&mut self, addr: u16, value: u8) {
        if self.chr_is_ram {
            let index = (addr as usize & 0x1FFF) % self.chr.len().max(1);
            self.chr[index] = value;
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn reset(&mut self) {
        self.prg_bank = 0;
    }
}

/// Mapper 3 (CNROM): fixed PRG, 8 KiB switchable CHR ROM.
pub struct Cnrom {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    mirroring: Mirroring,
    chr_bank: u8,
}

impl Cnrom {
    pub fn new(cart: Cartridge) -> Self {
        Self {
            prg_rom: cart.prg_rom,
            chr: cart.chr,
            mirroring: cart.mirroring,
            chr_bank: 0,
        }
    }
}

impl Mapper for Cnrom {
    fn cpu_read(&mut self, addr: u16) -> u8 {
        if addr < 0x8000 || self.prg_rom.is_empty() {
            return 0;
        }
        self.prg_rom[(addr as usize - 0x8000) % self.prg_rom.len()]
    }

    fn cpu_write(&mut self, addr: u16, value: u8, _cpu_cycle: u64) {
        if addr >= 0x8000 {
            self.chr_bank = value & 0x03;
        }
    }

    fn ppu_read(&mut self, addr: u16) -> u8 {
        let offset = self.chr_bank as usize * 8 * 1024 + (addr as usize & 0x1FFF);
        self.chr[offset % self.chr.len().max(1)]
    }

    fn ppu_write(&mut self, _addr: u16, _value: u8) {
        // CHR ROM only on this board.
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn reset(&mut self) {
        self.chr_bank = 0;
    }
}

/// Mapper 7 (AxROM): 32 KiB switchable PRG, CHR RAM, and software
/// single-screen selection.
pub struct Axrom {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    prg_bank: u8,
    nametable_page: u8,
}

impl Axrom {
    pub fn new(cart: Cartridge) -> Self {
        Self {
            prg_rom: cart.prg_rom,
            chr: cart.chr,
            prg_bank: 0,
            nametable_page: 0,
        }
    }

    fn bank_count(&self) -> usize {
        (self.prg_rom.len() / (32 * 1024)).max(1)
    }
}

impl Mapper for Axrom {
    fn cpu_read(&mut self, addr: u16) -> u8 {
        if addr < 0x8000 || self.prg_rom.is_empty() {
            return 0;
        }
        let bank = self.prg_bank as usize % self.bank_count();
        self.prg_rom[(bank * 32 * 1024 + (addr as usize & 0x7FFF)) % self.prg_rom.len()]
    }

    fn cpu_write(&mut self, addr: u16, value: u8, _cpu_cycle: u64) {
        if addr >= 0x8000 {
            self.prg_bank = value & 0x07;
            self.nametable_page = (value >> 4) & 1;
        }
    }

    fn ppu_read(&mut self, addr: u16) -> u8 {
        self.chr[(addr as usize & 0x1FFF) % self.chr.len().max(1)]
    }

    fn ppu_write(&mut self, addr: u16, value: u8) {
        // AxROM boards carry CHR RAM.
        let index = (addr as usize & 0x1FFF) % self.chr.len().max(1);
        self.chr[index] = value;
    }

    fn mirroring(&self) -> Mirroring {
        if self.nametable_page == 0 {
            Mirroring::SingleScreenA
        } else {
            Mirroring::SingleScreenB
        }
    }

    fn reset(&mut self) {
        self.prg_bank = 0;
        self.nametable_page = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::Cartridge;

    pub(crate) fn cart_with_banked_prg(
        mapper_id: u8,
        prg_banks_16k: usize,
        chr_banks_8k: usize,
    ) -> Cartridge {
        let mut prg = vec![0u8; prg_banks_16k * 16 * 1024];
        for (bank, chunk) in prg.chunks_mut(16 * 1024).enumerate() {
            chunk.fill(0xA0 + bank as u8);
        }
        let chr_is_ram = chr_banks_8k == 0;
        let chr_len = if chr_is_ram { 8 * 1024 } else { chr_banks_8k * 8 * 1024 };
        let mut chr = vec![0u8; chr_len];
        if !chr_is_ram {
            for (bank, chunk) in chr.chunks_mut(8 * 1024).enumerate() {
                chunk.fill(0x10 + bank as u8);
            }
        }
        Cartridge {
            prg_rom: prg,
            chr,
            chr_is_ram,
            mapper_id,
            mirroring: Mirroring::Horizontal,
        }
    }

    #[test]
    fn nrom_16k_mirrors_upper_half() {
        let mut m = Nrom::new(cart_with_banked_prg(0, 1, 1));
        assert_eq!(m.cpu_read(0x8000), 0xA0);
        assert_eq!(m.cpu_read(0xC000), 0xA0);
    }

    #[test]
    fn nrom_32k_is_linear() {
        let mut m = Nrom::new(cart_with_banked_prg(0, 2, 1));
        assert_eq!(m.cpu_read(0x8000), 0xA0);
        assert_eq!(m.cpu_read(0xC000), 0xA1);
    }

    #[test]
    fn nrom_chr_ram_is_writable_chr_rom_is_not() {
        let mut ram = Nrom::new(cart_with_banked_prg(0, 1, 0));
        ram.ppu_write(0x0123, 0x99);
        assert_eq!(ram.ppu_read(0x0123), 0x99);

        let mut rom = Nrom::new(cart_with_banked_prg(0, 1, 1));
        let before = rom.ppu_read(0x0123);
        rom.ppu_write(0x0123, 0x99);
        assert_eq!(rom.ppu_read(0x0123), before);
    }

    #[test]
    fn uxrom_switches_low_window_only() {
        let mut m = Uxrom::new(cart_with_banked_prg(2, 4, 0));
        assert_eq!(m.cpu_read(0x8000), 0xA0);
        assert_eq!(m.cpu_read(0xC000), 0xA3); // last bank fixed
        m.cpu_write(0x8000, 2, 0);
        assert_eq!(m.cpu_read(0x8000), 0xA2);
        assert_eq!(m.cpu_read(0xC000), 0xA3);
    }

    #[test]
    fn uxrom_bank_wraps_to_available_banks() {
        let mut m = Uxrom::new(cart_with_banked_prg(2, 2, 0));
        m.cpu_write(0x8000, 5, 0);
        assert_eq!(m.cpu_read(0x8000), 0xA1); // 5 % 2
    }

    #[test]
    fn cnrom_switches_chr() {
        let mut m = Cnrom::new(cart_with_banked_prg(3, 1, 4));
        assert_eq!(m.ppu_read(0x0000), 0x10);
        m.cpu_write(0x8000, 3, 0);
        assert_eq!(m.ppu_read(0x0000), 0x13);
    }

    #[test]
    fn axrom_selects_bank_and_nametable() {
        let mut prg = vec![0u8; 4 * 32 * 1024];
        for (bank, chunk) in prg.chunks_mut(32 * 1024).enumerate() {
            chunk.fill(0xB0 + bank as u8);
        }
        let cart = Cartridge {
            prg_rom: prg,
            chr: vec![0; 8 * 1024],
            chr_is_ram: true,
            mapper_id: 7,
            mirroring: Mirroring::Vertical,
        };
        let mut m = Axrom::new(cart);
        assert_eq!(m.cpu_read(0x8000), 0xB0);
        assert_eq!(m.mirroring(), Mirroring::SingleScreenA);
        m.cpu_write(0x8000, 0x12, 0);
        assert_eq!(m.cpu_read(0x8000), 0xB2);
        assert_eq!(m.mirroring(), Mirroring::SingleScreenB);
    }
}
