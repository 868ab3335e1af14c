//! CPU-side address decoding and the system clock.
//!
//! The bus is where the cycle coupling lives: every CPU bus access
//! (and every internal CPU cycle) advances the shared clock by one,
//! which steps the PPU three dots and the APU one cycle before the
//! access decodes. OAM DMA happens entirely inside the $4014 write:
//! 256 copied bytes, 513 clock advances, and 513 stall cycles billed
//! to the instruction that triggered it.
//!
//! Memory map:
//! - $0000-$1FFF: 2 KiB work RAM, mirrored
//! - $2000-$3FFF: PPU registers, mirrored every 8 bytes
//! - $4000-$4017: APU and I/O
//! - $4018-$401F: disabled test registers (read 0)
//! - $4020-$FFFF: cartridge (mapper)

use crate::apu::Apu;
use crate::controller::ControllerPort;
use crate::mapper::{Mapper, NoCartridge};
use crate::ppu::Ppu;

pub struct NesBus {
    /// 2 KiB work RAM.
    pub ram: [u8; 2048],
    pub ppu: Ppu,
    pub apu: Apu,
    pub mapper: Box<dyn Mapper>,
    pub controller1: ControllerPort,
    pub controller2: ControllerPort,

    /// Monotonic CPU-cycle clock. Every read, write, or internal tick
    /// advances it by exactly one.
    cycles: u64,
    /// Stall cycles accumulated by DMA, drained by the CPU at the end
    /// of the instruction.
    stall: u32,
    /// NMI latched from the PPU, consumed at instruction boundaries.
    nmi_pending: bool,
}

impl NesBus {
    pub fn new() -> Self {
        Self {
            ram: [0; 2048],
            ppu: Ppu::new(),
            apu: Apu::new(),
            mapper: Box::new(NoCartridge),
            controller1: ControllerPort::new(),
            controller2: ControllerPort::new(),
            cycles: 0,
            stall: 0,
            nmi_pending: false,
        }
    }

    /// Current bus clock in CPU cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Take the latched NMI edge.
    pub fn take_nmi(&mut self) -> bool {
        std::mem::take(&mut self.nmi_pending)
    }

    /// Level of the cartridge IRQ line.
    pub fn irq_line(&self) -> bool {
        self.mapper.irq_pending()
    }

    /// One CPU cycle of system time: three PPU dots, one APU cycle.
    fn clock(&mut self) {
        self.cycles += 1;
        for _ in 0..3 {
            self.ppu.tick(self.mapper.as_mut());
        }
        self.apu.tick();
        if self.ppu.take_nmi() {
            self.nmi_pending = true;
        }
    }

    /// Decode a read without advancing the clock.
    fn read_decoded(&mut self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize],
            0x2000..=0x3FFF => self.ppu.read_register(addr & 0x07, self.mapper.as_mut()),
            0x4015 => self.apu.read_status(),
            0x4016 => self.controller1.read_serial(),
            0x4017 => self.controller2.read_serial(),
            0x4000..=0x401F => 0,
            0x4020..=0xFFFF => self.mapper.cpu_read(addr),
        }
    }

    /// Decode a write without advancing the clock.
    fn write_decoded(&mut self, addr: u16, value: u8) {
        match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize] = value,
            0x2000..=0x3FFF => {
                self.ppu
                    .write_register(addr & 0x07, value, self.mapper.as_mut());
            }
            0x4014 => self.oam_dma(value),
            0x4016 => {
                let level = value & 1 != 0;
                self.controller1.set_strobe(level);
                self.controller2.set_strobe(level);
            }
            0x4000..=0x4013 | 0x4015 | 0x4017 => self.apu.write(addr, value),
            0x4018..=0x401F => {}
            0x4020..=0xFFFF => self.mapper.cpu_write(addr, value, self.cycles),
        }
    }

    /// $4014: copy a 256-byte page into OAM, then halt the CPU for
    /// 513 cycles while the PPU and APU keep running.
    fn oam_dma(&mut self, page: u8) {
        let base = u16::from(page) << 8;
        for offset in 0..256 {
            let byte = self.read_decoded(base | offset);
            self.ppu.oam_dma_write(byte);
        }
        self.stall += 513;
        for _ in 0..513 {
            self.clock();
        }
    }

    // -----------------------------------------------------------------
    // Test observation
    // -----------------------------------------------------------------

    /// RAM byte without side effects.
    pub fn peek_ram(&self, addr: u16) -> u8 {
        self.ram[(addr & 0x07FF) as usize]
    }

    /// Underlying nametable byte under the current mirroring, without
    /// touching the register file. MMC5 routes nametables itself, in
    /// which case the mapper answers.
    pub fn peek_nametable(&mut self, addr: u16) -> u8 {
        if self.mapper.handles_nametables() {
            self.mapper.ppu_read(addr)
        } else {
            self.ppu.nametable_byte(addr, self.mapper.mirroring())
        }
    }
}

impl Default for NesBus {
    fn default() -> Self {
        Self::new()
    }
}

impl cpu_2a03::Bus for NesBus {
    fn read(&mut self, addr: u16) -> u8 {
        self.clock();
        self.read_decoded(addr)
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.clock();
        self.write_decoded(addr, value);
    }

    fn tick(&mut self, cycles: u32) {
        for _ in 0..cycles {
            self.clock();
        }
    }

    fn take_stall(&mut self) -> u32 {
        std::mem::take(&mut self.stall)
    }
}
