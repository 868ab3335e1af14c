//! Mapper 4 (MMC3).
//!
//! Eight bank registers selected by $8000: R0/R1 pick 2 KiB CHR banks,
//! R2–R5 pick 1 KiB CHR banks (halves swapped by CHR inversion),
//! R6/R7 pick 8 KiB PRG banks with the other two PRG slots fixed to
//! the last and second-to-last banks. The IRQ counter is clocked by
//! rising edges of PPU address line A12: in practice once per
//! scanline, when fetching flips from the background pattern table at
//! $0000 to the sprite table at $1000. Both reads and writes on the
//! PPU bus feed the edge detector.

use crate::cartridge::{Cartridge, Mirroring};
use crate::mapper::Mapper;

const PRG_BANK: usize = 8 * 1024;

pub struct Mmc3 {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    prg_ram: [u8; 8 * 1024],

    /// R0–R7, set through $8001.
    registers: [u8; 8],
    /// Which register the next $8001 write lands in.
    target: u8,
    /// $8000 bit 6: swap the switchable/fixed PRG slots.
    prg_mode: bool,
    /// $8000 bit 7: swap the 2 KiB and 1 KiB CHR halves.
    chr_inversion: bool,

    mirroring: Mirroring,
    prg_ram_enabled: bool,
    prg_ram_writable: bool,

    irq_latch: u8,
    irq_counter: u8,
    irq_reload: bool,
    irq_enabled: bool,
    irq_pending: bool,
    /// Last observed level of PPU A12.
    last_a12: bool,
}

impl Mmc3 {
    pub fn new(cart: Cartridge) -> Self {
        Self {
            prg_rom: cart.prg_rom,
            chr: cart.chr,
            chr_is_ram: cart.chr_is_ram,
            prg_ram: [0; 8 * 1024],
            registers: [0; 8],
            target: 0,
            prg_mode: false,
            chr_inversion: false,
            mirroring: cart.mirroring,
            prg_ram_enabled: true,
            prg_ram_writable: true,
            irq_latch: 0,
            irq_counter: 0,
            irq_reload: false,
            irq_enabled: false,
            irq_pending: false,
            last_a12: false,
        }
    }

    fn prg_bank_count(&self) -> usize {
        (self.prg_rom.len() / PRG_BANK).max(2)
    }

    fn prg_offset(&self, addr: u16) -> usize {
        let banks = self.prg_bank_count();
        let bank = match (addr, self.prg_mode) {
            (0x8000..=0x9FFF, false) => self.registers[6] as usize,
            (0x8000..=0x9FFF, true) => banks - 2,
            (0xA000..=0xBFFF, _) => self.registers[7] as usize,
            (0xC000..=0xDFFF, false) => banks - 2,
            (0xC000..=0xDFFF, true) => self.registers[6] as usize,
            _ => banks - 1,
        };
        ((bank % banks) * PRG_BANK + (addr as usize & 0x1FFF)) % self.prg_rom.len().max(1)
    }

    /// CHR offset: R0/R1 cover two 2 KiB slots, R2–R5 four 1 KiB
    /// slots; inversion swaps which half of the pattern space each
    /// group serves.
    fn chr_offset(&self, addr: u16) -> usize {
        let addr = addr as usize & 0x1FFF;
        // Fold the inversion away: with bit 7 set the two halves swap.
        let folded = if self.chr_inversion { addr ^ 0x1000 } else { addr };
        let bank = match folded >> 10 {
            0 => (self.registers[0] & 0xFE) as usize,
            1 => (self.registers[0] | 0x01) as usize,
            2 => (self.registers[1] & 0xFE) as usize,
            3 => (self.registers[1] | 0x01) as usize,
            slot => self.registers[2 + (slot - 4)] as usize,
        };
        (bank * 1024 + (folded & 0x03FF)) % self.chr.len().max(1)
    }

    /// Feed the A12 edge detector; a 0→1 transition clocks the IRQ
    /// counter.
    fn watch_a12(&mut self, addr: u16) {
        let a12 = addr & 0x1000 != 0;
        if a12 && !self.last_a12 {
            self.clock_irq_counter();
        }
        self.last_a12 = a12;
    }

    fn clock_irq_counter(&mut self) {
        if self.irq_counter == 0 || self.irq_reload {
            self.irq_counter = self.irq_latch;
            self.irq_reload = false;
        } else {
            self.irq_counter -= 1;
        }
        if self.irq_counter == 0 && self.irq_enabled {
            self.irq_pending = true;
        }
    }
}

impl Mapper for Mmc3 {
    fn cpu_read(&mut self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => {
                if self.prg_ram_enabled {
                    self.prg_ram[(addr - 0x6000) as usize]
                } else {
                    0
                }
            }
            0x8000..=0xFFFF => {
                if self.prg_rom.is_empty() {
                    0
                } else {
                    self.prg_rom[self.prg_offset(addr)]
                }
            }
            _ => 0,
        }
    }

    fn cpu_write(&mut self, addr: u16, value: u8, _cpu_cycle: u64) {
        match addr {
            0x6000..=0x7FFF => {
                if self.prg_ram_enabled && self.prg_ram_writable {
                    self.prg_ram[(addr - 0x6000) as usize] = value;
                }
            }
            0x8000..=0x9FFF => {
                if addr & 1 == 0 {
                    self.target = value & 0x07;
                    self.prg_mode = value & 0x40 != 0;
                    self.chr_inversion = value & 0x80 != 0;
                } else {
                    self.registers[self.target as usize] = value;
                }
            }
            0xA000..=0xBFFF => {
                if addr & 1 == 0 {
                    // Ignored on four-screen boards.
                    if self.mirroring != Mirroring::FourScreen {
                        self.mirroring = if value & 1 == 0 {
                            Mirroring::Vertical
                        } else {
                            Mirroring::Horizontal
                        };
                    }
                } else {
                    self.prg_ram_enabled = value & 0x80 != 0;
                    self.prg_ram_writable = value & 0x40 == 0;
                }
            }
            0xC000..=0xDFFF => {
                if addr & 1 == 0 {
                    self.irq_latch = value;
                } else {
                    self.irq_counter = 0;
                    self.irq_reload = true;
                }
            }
            0xE000..=0xFFFF => {
                if addr & 1 == 0 {
                    self.irq_enabled = false;
                    self.irq_pending = false;
                } else {
                    self.irq_enabled = true;
                }
            }
            _ => {}
        }
    }

    fn ppu_read(&mut self, addr: u16) -> u8 {
        let addr = addr & 0x1FFF;
        self.watch_a12(addr);
        self.chr[self.chr_offset(addr)]
    }

    fn ppu_write(&mut self, addr: u16, value: u8) {
        let addr = addr & 0x1FFF;
        self.watch_a12(addr);
        if self.chr_is_ram {
            let offset = self.chr_offset(addr);
            self.chr[offset] = value;
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    fn reset(&mut self) {
        self.registers = [0; 8];
        self.target = 0;
        self.prg_mode = false;
        self.chr_inversion = false;
        self.prg_ram_enabled = true;
        self.prg_ram_writable = true;
        self.irq_latch = 0;
        self.irq_counter = 0;
        self.irq_reload = false;
        self.irq_enabled = false;
        self.irq_pending = false;
        self.last_a12 = false;
    }
}
