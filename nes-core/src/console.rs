//! Console facade.
//!
//! Owns the CPU and the bus and drives whole frames: run the CPU until
//! the per-frame cycle budget is spent, sampling the interrupt lines
//! at every instruction boundary. Everything a front-end needs goes
//! through this type: framebuffer out, audio samples out, button
//! events in.

use cpu_2a03::Rp2a03;

use crate::bus::NesBus;
use crate::cartridge::{Cartridge, LoadError};
use crate::controller::Button;
use crate::mapper;
use crate::ppu::{FB_HEIGHT, FB_WIDTH};

/// CPU cycles per NTSC frame (29780.5 rounded down; the half cycle is
/// not worth carrying for a frame-budget loop).
pub const NTSC_CPU_CYCLES_PER_FRAME: u32 = 29_780;

pub struct Console {
    cpu: Rp2a03,
    bus: NesBus,
    cycles_per_frame: u32,
    cartridge_inserted: bool,
    frame_count: u64,
}

impl Console {
    pub fn new() -> Self {
        Self {
            cpu: Rp2a03::new(),
            bus: NesBus::new(),
            cycles_per_frame: NTSC_CPU_CYCLES_PER_FRAME,
            cartridge_inserted: false,
            frame_count: 0,
        }
    }

    /// Decode an iNES image and install it. On success the mapper,
    /// PPU, and CPU are reset in that order (the CPU re-reads the
    /// reset vector through the new mapper). On failure nothing
    /// changes.
    pub fn insert_cartridge(&mut self, rom: &[u8]) -> Result<(), LoadError> {
        let cart = Cartridge::from_ines(rom)?;
        self.bus.mapper = mapper::create(cart);
        self.bus.mapper.reset();
        self.bus.ppu.reset();
        self.bus.apu.reset();
        self.cpu.reset(&mut self.bus);
        self.cartridge_inserted = true;
        Ok(())
    }

    /// Override the per-frame CPU cycle budget.
    pub fn set_cpu_cycles_per_frame(&mut self, cycles: u32) {
        self.cycles_per_frame = cycles;
    }

    pub fn press_button(&mut self, button: Button) {
        self.bus.controller1.set_button(button, true);
    }

    pub fn release_button(&mut self, button: Button) {
        self.bus.controller1.set_button(button, false);
    }

    /// Run one frame's worth of CPU cycles.
    pub fn next_frame(&mut self) {
        self.frame_count += 1;
        if !self.cartridge_inserted {
            return;
        }
        let mut remaining = self.cycles_per_frame as i64;
        while remaining > 0 {
            remaining -= i64::from(self.step_instruction());
        }
    }

    /// Reset the CPU alone, re-reading the reset vector through the
    /// current mapper. Self-tests drive the machine without a
    /// cartridge this way.
    pub fn reset_cpu(&mut self) {
        self.cpu.reset(&mut self.bus);
    }

    /// Run a single instruction, feeding the CPU the interrupt lines
    /// first. Returns the cycles it took.
    pub fn step_instruction(&mut self) -> u32 {
        if self.bus.take_nmi() {
            self.cpu.nmi();
        }
        self.cpu.set_irq_line(self.bus.irq_line());
        self.cpu.step(&mut self.bus)
    }

    /// The 256×240 ARGB framebuffer of the most recent frame.
    pub fn frame_buffer(&self) -> &[u32; FB_WIDTH * FB_HEIGHT] {
        self.bus.ppu.frame_buffer()
    }

    /// Move buffered audio samples into `out`; returns the count.
    pub fn drain_apu_samples(&mut self, out: &mut [f32]) -> usize {
        self.bus.apu.drain_samples(out)
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    // Observation hooks for tests, self-tests, and front-end debug
    // output.

    pub fn cpu(&self) -> &Rp2a03 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Rp2a03 {
        &mut self.cpu
    }

    pub fn bus(&self) -> &NesBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut NesBus {
        &mut self.bus
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}
