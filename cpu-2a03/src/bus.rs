//! The CPU's view of the outside world.
//!
//! The 2A03 performs exactly one bus access per cycle. The bus is
//! therefore the clock: every `read`/`write` advances the attached
//! system (PPU, APU, timers) by one CPU cycle before the access
//! decodes, and `tick` burns internal cycles that touch no address.

/// Memory bus as seen by the CPU.
pub trait Bus {
    /// Read a byte. Advances the system clock by one CPU cycle.
    fn read(&mut self, addr: u16) -> u8;

    /// Write a byte. Advances the system clock by one CPU cycle.
    fn write(&mut self, addr: u16, value: u8);

    /// Advance the system clock by `cycles` CPU cycles without a bus
    /// access (internal ALU/transfer cycles).
    fn tick(&mut self, cycles: u32);

    /// Drain stall cycles the bus accumulated during the current
    /// instruction (OAM DMA halts the CPU for 513 cycles). The CPU adds
    /// the drained amount to the instruction's cycle count. Buses
    /// without DMA keep the default.
    fn take_stall(&mut self) -> u32 {
        0
    }
}
