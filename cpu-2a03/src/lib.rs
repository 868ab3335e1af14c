//! Ricoh 2A03 CPU core.
//!
//! The 2A03 is an NMOS 6502 with the decimal-mode ALU paths cut: the D
//! flag can be set and cleared but ADC/SBC always compute in binary.
//! Execution is instruction-stepped (`step` runs one instruction and
//! returns its cycle count) while the bus carries the clock: every
//! `Bus::read`/`Bus::write` is one CPU cycle, internal cycles go
//! through `Bus::tick`, so the attached system advances in lockstep
//! with each bus access rather than once per instruction.
//!
//! # Undocumented opcodes
//!
//! The commonly-required set is implemented with real semantics:
//! LAX, SAX, DCP, ISB, SLO, RLA, SRE, RRA, the immediate-only
//! ANC/ALR/ARR/SBX, and the multi-byte NOPs. Anything else executes as
//! a 2-cycle NOP; games may glitch, but the CPU never halts or
//! panics.

mod addressing;
mod bus;
mod flags;

pub use bus::Bus;

use flags::{FLAG_C, FLAG_D, FLAG_I, FLAG_N, FLAG_V, FLAG_Z};

/// Ricoh 2A03 CPU state.
pub struct Rp2a03 {
    /// Accumulator.
    pub(crate) a: u8,
    /// X index register.
    pub(crate) x: u8,
    /// Y index register.
    pub(crate) y: u8,
    /// Stack pointer into page $01.
    pub(crate) sp: u8,
    /// Program counter.
    pub(crate) pc: u16,
    /// Status register, NV-BDIZC.
    pub(crate) p: u8,

    /// NMI edge latch, consumed at the next instruction boundary.
    nmi_pending: bool,
    /// IRQ level, sampled at instruction boundaries.
    irq_line: bool,
    /// Total cycles executed since reset. Strictly monotonic.
    total_cycles: u64,
}

impl Rp2a03 {
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            pc: 0,
            p: 0x24, // I set, bit 5 always 1
            nmi_pending: false,
            irq_line: false,
            total_cycles: 0,
        }
    }

    // -----------------------------------------------------------------
    // Register accessors (front-ends and self-tests observe through
    // these; the machine never reaches into CPU state directly)
    // -----------------------------------------------------------------

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn a(&self) -> u8 {
        self.a
    }

    pub fn x(&self) -> u8 {
        self.x
    }

    pub fn y(&self) -> u8 {
        self.y
    }

    pub fn sp(&self) -> u8 {
        self.sp
    }

    pub fn status(&self) -> u8 {
        self.p
    }

    pub fn set_pc(&mut self, value: u16) {
        self.pc = value;
    }

    /// Total cycles executed since reset.
    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    /// Latch a non-maskable interrupt for the next instruction boundary.
    pub fn nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// Drive the (level-sensitive) IRQ line. The line stays asserted
    /// until the source deasserts it; the CPU samples it before each
    /// instruction and takes the interrupt when I is clear.
    pub fn set_irq_line(&mut self, asserted: bool) {
        self.irq_line = asserted;
    }

    /// Reset: 7 internal cycles, registers to power-on state, PC from
    /// the vector at $FFFC/$FFFD.
    pub fn reset<B: Bus>(&mut self, bus: &mut B) {
        bus.tick(7);
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = 0xFD;
        self.p = 0x24;
        self.pc = self.read_word(bus, 0xFFFC);
        self.nmi_pending = false;
        self.irq_line = false;
        self.total_cycles = 0;
    }

    /// Execute one instruction (or take a pending interrupt). Returns
    /// the cycles elapsed, including any DMA stall the bus accumulated
    /// while the instruction ran.
    pub fn step<B: Bus>(&mut self, bus: &mut B) -> u32 {
        let cycles = if self.nmi_pending {
            self.nmi_pending = false;
            self.interrupt_sequence(bus, 0xFFFA)
        } else if self.irq_line && !self.interrupt_disable() {
            self.interrupt_sequence(bus, 0xFFFE)
        } else {
            let opcode = self.fetch(bus);
            self.execute(bus, opcode)
        };
        let total = cycles + bus.take_stall();
        self.total_cycles += u64::from(total);
        total
    }

    /// Hardware interrupt entry: push PC and P (B clear, U set), set I,
    /// load the vector. 7 cycles: 2 internal + 5 bus accesses.
    fn interrupt_sequence<B: Bus>(&mut self, bus: &mut B, vector: u16) -> u32 {
        bus.tick(2);
        self.push_word(bus, self.pc);
        let p = self.status_for_push(false);
        self.push(bus, p);
        self.set_flag(FLAG_I, true);
        self.pc = self.read_word(bus, vector);
        7
    }

    // -----------------------------------------------------------------
    // ALU
    // -----------------------------------------------------------------

    /// ADC. Always binary on the 2A03, whatever D says.
    fn adc(&mut self, value: u8) {
        let sum = u16::from(self.a) + u16::from(value) + u16::from(self.carry());
        let result = sum as u8;
        self.set_flag(FLAG_C, sum > 0xFF);
        self.set_flag(FLAG_V, (self.a ^ result) & (value ^ result) & 0x80 != 0);
        self.a = result;
        self.set_zn(result);
    }

    /// SBC. C means "no borrow"; implemented as ADC of the complement.
    fn sbc(&mut self, value: u8) {
        self.adc(!value);
    }

    /// Compare: C when reg >= value, Z/N from the difference.
    fn cmp(&mut self, reg: u8, value: u8) {
        let diff = reg.wrapping_sub(value);
        self.set_flag(FLAG_C, reg >= value);
        self.set_zn(diff);
    }

    fn asl(&mut self, value: u8) -> u8 {
        self.set_flag(FLAG_C, value & 0x80 != 0);
        let result = value << 1;
        self.set_zn(result);
        result
    }

    fn lsr(&mut self, value: u8) -> u8 {
        self.set_flag(FLAG_C, value & 0x01 != 0);
        let result = value >> 1;
        self.set_zn(result);
        result
    }

    fn rol(&mut self, value: u8) -> u8 {
        let carry_in = u8::from(self.carry());
        self.set_flag(FLAG_C, value & 0x80 != 0);
        let result = (value << 1) | carry_in;
        self.set_zn(result);
        result
    }

    fn ror(&mut self, value: u8) -> u8 {
        let carry_in = if self.carry() { 0x80 } else { 0 };
        self.set_flag(FLAG_C, value & 0x01 != 0);
        let result = (value >> 1) | carry_in;
        self.set_zn(result);
        result
    }

    fn bit(&mut self, value: u8) {
        self.set_flag(FLAG_Z, self.a & value == 0);
        self.set_flag(FLAG_V, value & 0x40 != 0);
        self.set_flag(FLAG_N, value & 0x80 != 0);
    }

    /// Read-modify-write body: read the operand, burn the modify
    /// cycle, write the result back. Returns the written value so the
    /// caller can fold it into A (the undocumented combos do).
    fn modify<B: Bus>(
        &mut self,
        bus: &mut B,
        addr: u16,
        op: impl FnOnce(&mut Self, u8) -> u8,
    ) -> u8 {
        let value = bus.read(addr);
        bus.tick(1);
        let result = op(self, value);
        bus.write(addr, result);
        result
    }

    fn load_a<B: Bus>(&mut self, bus: &mut B, addr: u16) {
        self.a = bus.read(addr);
        self.set_zn(self.a);
    }

    // -----------------------------------------------------------------
    // Dispatcher
    // -----------------------------------------------------------------

    fn execute<B: Bus>(&mut self, bus: &mut B, opcode: u8) -> u32 {
        match opcode {
            // ---- Loads ----
            0xA9 => {
                self.a = self.fetch(bus);
                self.set_zn(self.a);
                2
            }
            0xA5 => {
                let addr = self.zp(bus);
                self.load_a(bus, addr);
                3
            }
            0xB5 => {
                let addr = self.zp_x(bus);
                self.load_a(bus, addr);
                4
            }
            0xAD => {
                let addr = self.abs(bus);
                self.load_a(bus, addr);
                4
            }
            0xBD => {
                let (addr, crossed) = self.abs_x(bus);
                if crossed {
                    bus.tick(1);
                }
                self.load_a(bus, addr);
                4 + u32::from(crossed)
            }
            0xB9 => {
                let (addr, crossed) = self.abs_y(bus);
                if crossed {
                    bus.tick(1);
                }
                self.load_a(bus, addr);
                4 + u32::from(crossed)
            }
            0xA1 => {
                let addr = self.ind_x(bus);
                self.load_a(bus, addr);
                6
            }
            0xB1 => {
                let (addr, crossed) = self.ind_y(bus);
                if crossed {
                    bus.tick(1);
                }
                self.load_a(bus, addr);
                5 + u32::from(crossed)
            }

            0xA2 => {
                self.x = self.fetch(bus);
                self.set_zn(self.x);
                2
            }
            0xA6 => {
                let addr = self.zp(bus);
                self.x = bus.read(addr);
                self.set_zn(self.x);
                3
            }
            0xB6 => {
                let addr = self.zp_y(bus);
                self.x = bus.read(addr);
                self.set_zn(self.x);
                4
            }
            0xAE => {
                let addr = self.abs(bus);
                self.x = bus.read(addr);
                self.set_zn(self.x);
                4
            }
            0xBE => {
                let (addr, crossed) = self.abs_y(bus);
                if crossed {
                    bus.tick(1);
                }
                self.x = bus.read(addr);
                self.set_zn(self.x);
                4 + u32::from(crossed)
            }

            0xA0 => {
                self.y = self.fetch(bus);
                self.set_zn(self.y);
                2
            }
            0xA4 => {
                let addr = self.zp(bus);
                self.y = bus.read(addr);
                self.set_zn(self.y);
                3
            }
            0xB4 => {
                let addr = self.zp_x(bus);
                self.y = bus.read(addr);
                self.set_zn(self.y);
                4
            }
            0xAC => {
                let addr = self.abs(bus);
                self.y = bus.read(addr);
                self.set_zn(self.y);
                4
            }
            0xBC => {
                let (addr, crossed) = self.abs_x(bus);
                if crossed {
                    bus.tick(1);
                }
                self.y = bus.read(addr);
                self.set_zn(self.y);
                4 + u32::from(crossed)
            }

            // ---- Stores ----
            0x85 => {
                let addr = self.zp(bus);
                bus.write(addr, self.a);
                3
            }
            0x95 => {
                let addr = self.zp_x(bus);
                bus.write(addr, self.a);
                4
            }
            0x8D => {
                let addr = self.abs(bus);
                bus.write(addr, self.a);
                4
            }
            0x9D => {
                let addr = self.abs_x_store(bus);
                bus.write(addr, self.a);
                5
            }
            0x99 => {
                let addr = self.abs_y_store(bus);
                bus.write(addr, self.a);
                5
            }
            0x81 => {
                let addr = self.ind_x(bus);
                bus.write(addr, self.a);
                6
            }
            0x91 => {
                let addr = self.ind_y_store(bus);
                bus.write(addr, self.a);
                6
            }

            0x86 => {
                let addr = self.zp(bus);
                bus.write(addr, self.x);
                3
            }
            0x96 => {
                let addr = self.zp_y(bus);
                bus.write(addr, self.x);
                4
            }
            0x8E => {
                let addr = self.abs(bus);
                bus.write(addr, self.x);
                4
            }

            0x84 => {
                let addr = self.zp(bus);
                bus.write(addr, self.y);
                3
            }
            0x94 => {
                let addr = self.zp_x(bus);
                bus.write(addr, self.y);
                4
            }
            0x8C => {
                let addr = self.abs(bus);
                bus.write(addr, self.y);
                4
            }

            // ---- Transfers ----
            0xAA => {
                bus.tick(1);
                self.x = self.a;
                self.set_zn(self.x);
                2
            }
            0xA8 => {
                bus.tick(1);
                self.y = self.a;
                self.set_zn(self.y);
                2
            }
            0x8A => {
                bus.tick(1);
                self.a = self.x;
                self.set_zn(self.a);
                2
            }
            0x98 => {
                bus.tick(1);
                self.a = self.y;
                self.set_zn(self.a);
                2
            }
            0xBA => {
                bus.tick(1);
                self.x = self.sp;
                self.set_zn(self.x);
                2
            }
            0x9A => {
                // TXS does not touch flags.
                bus.tick(1);
                self.sp = self.x;
                2
            }

            // ---- Stack ----
            0x48 => {
                bus.tick(1);
                let a = self.a;
                self.push(bus, a);
                3
            }
            0x08 => {
                bus.tick(1);
                let p = self.status_for_push(true);
                self.push(bus, p);
                3
            }
            0x68 => {
                bus.tick(2);
                self.a = self.pull(bus);
                self.set_zn(self.a);
                4
            }
            0x28 => {
                bus.tick(2);
                let p = self.pull(bus);
                self.set_status_from_stack(p);
                4
            }

            // ---- Logic ----
            0x29 => {
                let value = self.fetch(bus);
                self.a &= value;
                self.set_zn(self.a);
                2
            }
            0x25 => {
                let addr = self.zp(bus);
                self.a &= bus.read(addr);
                self.set_zn(self.a);
                3
            }
            0x35 => {
                let addr = self.zp_x(bus);
                self.a &= bus.read(addr);
                self.set_zn(self.a);
                4
            }
            0x2D => {
                let addr = self.abs(bus);
                self.a &= bus.read(addr);
                self.set_zn(self.a);
                4
            }
            0x3D => {
                let (addr, crossed) = self.abs_x(bus);
                if crossed {
                    bus.tick(1);
                }
                self.a &= bus.read(addr);
                self.set_zn(self.a);
                4 + u32::from(crossed)
            }
            0x39 => {
                let (addr, crossed) = self.abs_y(bus);
                if crossed {
                    bus.tick(1);
                }
                self.a &= bus.read(addr);
                self.set_zn(self.a);
                4 + u32::from(crossed)
            }
            0x21 => {
                let addr = self.ind_x(bus);
                self.a &= bus.read(addr);
                self.set_zn(self.a);
                6
            }
            0x31 => {
                let (addr, crossed) = self.ind_y(bus);
                if crossed {
                    bus.tick(1);
                }
                self.a &= bus.read(addr);
                self.set_zn(self.a);
                5 + u32::from(crossed)
            }

            0x49 => {
                let value = self.fetch(bus);
                self.a ^= value;
                self.set_zn(self.a);
                2
            }
            0x45 => {
                let addr = self.zp(bus);
                self.a ^= bus.read(addr);
                self.set_zn(self.a);
                3
            }
            0x55 => {
                let addr = self.zp_x(bus);
                self.a ^= bus.read(addr);
                self.set_zn(self.a);
                4
            }
            0x4D => {
                let addr = self.abs(bus);
                self.a ^= bus.read(addr);
                self.set_zn(self.a);
                4
            }
            0x5D => {
                let (addr, crossed) = self.abs_x(bus);
                if crossed {
                    bus.tick(1);
                }
                self.a ^= bus.read(addr);
                self.set_zn(self.a);
                4 + u32::from(crossed)
            }
            0x59 => {
                let (addr, crossed) = self.abs_y(bus);
                if crossed {
                    bus.tick(1);
                }
                self.a ^= bus.read(addr);
                self.set_zn(self.a);
                4 + u32::from(crossed)
            }
            0x41 => {
                let addr = self.ind_x(bus);
                self.a ^= bus.read(addr);
                self.set_zn(self.a);
                6
            }
            0x51 => {
                let (addr, crossed) = self.ind_y(bus);
                if crossed {
                    bus.tick(1);
                }
                self.a ^= bus.read(addr);
                self.set_zn(self.a);
                5 + u32::from(crossed)
            }

            0x09 => {
                let value = self.fetch(bus);
                self.a |= value;
                self.set_zn(self.a);
                2
            }
            0x05 => {
                let addr = self.zp(bus);
                self.a |= bus.read(addr);
                self.set_zn(self.a);
                3
            }
            0x15 => {
                let addr = self.zp_x(bus);
                self.a |= bus.read(addr);
                self.set_zn(self.a);
                4
            }
            0x0D => {
                let addr = self.abs(bus);
                self.a |= bus.read(addr);
                self.set_zn(self.a);
                4
            }
            0x1D => {
                let (addr, crossed) = self.abs_x(bus);
                if crossed {
                    bus.tick(1);
                }
                self.a |= bus.read(addr);
                self.set_zn(self.a);
                4 + u32::from(crossed)
            }
            0x19 => {
                let (addr, crossed) = self.abs_y(bus);
                if crossed {
                    bus.tick(1);
                }
                self.a |= bus.read(addr);
                self.set_zn(self.a);
                4 + u32::from(crossed)
            }
            0x01 => {
                let addr = self.ind_x(bus);
                self.a |= bus.read(addr);
                self.set_zn(self.a);
                6
            }
            0x11 => {
                let (addr, crossed) = self.ind_y(bus);
                if crossed {
                    bus.tick(1);
                }
                self.a |= bus.read(addr);
                self.set_zn(self.a);
                5 + u32::from(crossed)
            }

            0x24 => {
                let addr = self.zp(bus);
                let value = bus.read(addr);
                self.bit(value);
                3
            }
            0x2C => {
                let addr = self.abs(bus);
                let value = bus.read(addr);
                self.bit(value);
                4
            }

            // ---- Arithmetic ----
            0x69 => {
                let value = self.fetch(bus);
                self.adc(value);
                2
            }
            0x65 => {
                let addr = self.zp(bus);
                let value = bus.read(addr);
                self.adc(value);
                3
            }
            0x75 => {
                let addr = self.zp_x(bus);
                let value = bus.read(addr);
                self.adc(value);
                4
            }
            0x6D => {
                let addr = self.abs(bus);
                let value = bus.read(addr);
                self.adc(value);
                4
            }
            0x7D => {
                let (addr, crossed) = self.abs_x(bus);
                if crossed {
                    bus.tick(1);
                }
                let value = bus.read(addr);
                self.adc(value);
                4 + u32::from(crossed)
            }
            0x79 => {
                let (addr, crossed) = self.abs_y(bus);
                if crossed {
                    bus.tick(1);
                }
                let value = bus.read(addr);
                self.adc(value);
                4 + u32::from(crossed)
            }
            0x61 => {
                let addr = self.ind_x(bus);
                let value = bus.read(addr);
                self.adc(value);
                6
            }
            0x71 => {
                let (addr, crossed) = self.ind_y(bus);
                if crossed {
                    bus.tick(1);
                }
                let value = bus.read(addr);
                self.adc(value);
                5 + u32::from(crossed)
            }

            // $EB is the undocumented SBC immediate alias.
            0xE9 | 0xEB => {
                let value = self.fetch(bus);
                self.sbc(value);
                2
            }
            0xE5 => {
                let addr = self.zp(bus);
                let value = bus.read(addr);
                self.sbc(value);
                3
            }
            0xF5 => {
                let addr = self.zp_x(bus);
                let value = bus.read(addr);
                self.sbc(value);
                4
            }
            0xED => {
                let addr = self.abs(bus);
                let value = bus.read(addr);
                self.sbc(value);
                4
            }
            0xFD => {
                let (addr, crossed) = self.abs_x(bus);
                if crossed {
                    bus.tick(1);
                }
                let value = bus.read(addr);
                self.sbc(value);
                4 + u32::from(crossed)
            }
            0xF9 => {
                let (addr, crossed) = self.abs_y(bus);
                if crossed {
                    bus.tick(1);
                }
                let value = bus.read(addr);
                self.sbc(value);
                4 + u32::from(crossed)
            }
            0xE1 => {
                let addr = self.ind_x(bus);
                let value = bus.read(addr);
                self.sbc(value);
                6
            }
            0xF1 => {
                let (addr, crossed) = self.ind_y(bus);
                if crossed {
                    bus.tick(1);
                }
                let value = bus.read(addr);
                self.sbc(value);
                5 + u32::from(crossed)
            }

            // ---- Compares ----
            0xC9 => {
                let value = self.fetch(bus);
                self.cmp(self.a, value);
                2
            }
            0xC5 => {
                let addr = self.zp(bus);
                let value = bus.read(addr);
                self.cmp(self.a, value);
                3
            }
            0xD5 => {
                let addr = self.zp_x(bus);
                let value = bus.read(addr);
                self.cmp(self.a, value);
                4
            }
            0xCD => {
                let addr = self.abs(bus);
                let value = bus.read(addr);
                self.cmp(self.a, value);
                4
            }
            0xDD => {
                let (addr, crossed) = self.abs_x(bus);
                if crossed {
                    bus.tick(1);
                }
                let value = bus.read(addr);
                self.cmp(self.a, value);
                4 + u32::from(crossed)
            }
            0xD9 => {
                let (addr, crossed) = self.abs_y(bus);
                if crossed {
                    bus.tick(1);
                }
                let value = bus.read(addr);
                self.cmp(self.a, value);
                4 + u32::from(crossed)
            }
            0xC1 => {
                let addr = self.ind_x(bus);
                let value = bus.read(addr);
                self.cmp(self.a, value);
                6
            }
            0xD1 => {
                let (addr, crossed) = self.ind_y(bus);
                if crossed {
                    bus.tick(1);
                }
                let value = bus.read(addr);
                self.cmp(self.a, value);
                5 + u32::from(crossed)
            }

            0xE0 => {
                let value = self.fetch(bus);
                self.cmp(self.x, value);
                2
            }
            0xE4 => {
                let addr = self.zp(bus);
                let value = bus.read(addr);
                self.cmp(self.x, value);
                3
            }
            0xEC => {
                let addr = self.abs(bus);
                let value = bus.read(addr);
                self.cmp(self.x, value);
                4
            }

            0xC0 => {
                let value = self.fetch(bus);
                self.cmp(self.y, value);
                2
            }
            0xC4 => {
                let addr = self.zp(bus);
                let value = bus.read(addr);
                self.cmp(self.y, value);
                3
            }
            0xCC => {
                let addr = self.abs(bus);
                let value = bus.read(addr);
                self.cmp(self.y, value);
                4
            }

            // ---- Increments / decrements ----
            0xE6 => {
                let addr = self.zp(bus);
                let r = self.modify(bus, addr, |_, v| v.wrapping_add(1));
                self.set_zn(r);
                5
            }
            0xF6 => {
                let addr = self.zp_x(bus);
                let r = self.modify(bus, addr, |_, v| v.wrapping_add(1));
                self.set_zn(r);
                6
            }
            0xEE => {
                let addr = self.abs(bus);
                let r = self.modify(bus, addr, |_, v| v.wrapping_add(1));
                self.set_zn(r);
                6
            }
            0xFE => {
                let addr = self.abs_x_store(bus);
                let r = self.modify(bus, addr, |_, v| v.wrapping_add(1));
                self.set_zn(r);
                7
            }

            0xC6 => {
                let addr = self.zp(bus);
                let r = self.modify(bus, addr, |_, v| v.wrapping_sub(1));
                self.set_zn(r);
                5
            }
            0xD6 => {
                let addr = self.zp_x(bus);
                let r = self.modify(bus, addr, |_, v| v.wrapping_sub(1));
                self.set_zn(r);
                6
            }
            0xCE => {
                let addr = self.abs(bus);
                let r = self.modify(bus, addr, |_, v| v.wrapping_sub(1));
                self.set_zn(r);
                6
            }
            0xDE => {
                let addr = self.abs_x_store(bus);
                let r = self.modify(bus, addr, |_, v| v.wrapping_sub(1));
                self.set_zn(r);
                7
            }

            0xE8 => {
                bus.tick(1);
                self.x = self.x.wrapping_add(1);
                self.set_zn(self.x);
                2
            }
            0xC8 => {
                bus.tick(1);
                self.y = self.y.wrapping_add(1);
                self.set_zn(self.y);
                2
            }
            0xCA => {
                bus.tick(1);
                self.x = self.x.wrapping_sub(1);
                self.set_zn(self.x);
                2
            }
            0x88 => {
                bus.tick(1);
                self.y = self.y.wrapping_sub(1);
                self.set_zn(self.y);
                2
            }

            // ---- Shifts and rotates ----
            0x0A => {
                bus.tick(1);
                self.a = self.asl(self.a);
                2
            }
            0x06 => {
                let addr = self.zp(bus);
                self.modify(bus, addr, Self::asl);
                5
            }
            0x16 => {
                let addr = self.zp_x(bus);
                self.modify(bus, addr, Self::asl);
                6
            }
            0x0E => {
                let addr = self.abs(bus);
                self.modify(bus, addr, Self::asl);
                6
            }
            0x1E => {
                let addr = self.abs_x_store(bus);
                self.modify(bus, addr, Self::asl);
                7
            }

            0x4A => {
                bus.tick(1);
                self.a = self.lsr(self.a);
                2
            }
            0x46 => {
                let addr = self.zp(bus);
                self.modify(bus, addr, Self::lsr);
                5
            }
            0x56 => {
                let addr = self.zp_x(bus);
                self.modify(bus, addr, Self::lsr);
                6
            }
            0x4E => {
                let addr = self.abs(bus);
                self.modify(bus, addr, Self::lsr);
                6
            }
            0x5E => {
                let addr = self.abs_x_store(bus);
                self.modify(bus, addr, Self::lsr);
                7
            }

            0x2A => {
                bus.tick(1);
                self.a = self.rol(self.a);
                2
            }
            0x26 => {
                let addr = self.zp(bus);
                self.modify(bus, addr, Self::rol);
                5
            }
            0x36 => {
                let addr = self.zp_x(bus);
                self.modify(bus, addr, Self::rol);
                6
            }
            0x2E => {
                let addr = self.abs(bus);
                self.modify(bus, addr, Self::rol);
                6
            }
            0x3E => {
                let addr = self.abs_x_store(bus);
                self.modify(bus, addr, Self::rol);
                7
            }

            0x6A => {
                bus.tick(1);
                self.a = self.ror(self.a);
                2
            }
            0x66 => {
                let addr = self.zp(bus);
                self.modify(bus, addr, Self::ror);
                5
            }
            0x76 => {
                let addr = self.zp_x(bus);
                self.modify(bus, addr, Self::ror);
                6
            }
            0x6E => {
                let addr = self.abs(bus);
                self.modify(bus, addr, Self::ror);
                6
            }
            0x7E => {
                let addr = self.abs_x_store(bus);
                self.modify(bus, addr, Self::ror);
                7
            }

            // ---- Jumps and subroutines ----
            0x4C => {
                self.pc = self.fetch_word(bus);
                3
            }
            0x6C => {
                let ptr = self.fetch_word(bus);
                self.pc = self.read_word_page_bug(bus, ptr);
                5
            }
            0x20 => {
                let target = self.fetch_word(bus);
                bus.tick(1);
                let ret = self.pc.wrapping_sub(1);
                self.push_word(bus, ret);
                self.pc = target;
                6
            }
            0x60 => {
                bus.tick(2);
                self.pc = self.pull_word(bus).wrapping_add(1);
                bus.tick(1);
                6
            }
            0x40 => {
                bus.tick(2);
                let p = self.pull(bus);
                self.set_status_from_stack(p);
                self.pc = self.pull_word(bus);
                6
            }

            // ---- Branches ----
            0x90 => 2 + self.branch_if(bus, !self.flag(FLAG_C)),
            0xB0 => 2 + self.branch_if(bus, self.flag(FLAG_C)),
            0xF0 => 2 + self.branch_if(bus, self.flag(FLAG_Z)),
            0xD0 => 2 + self.branch_if(bus, !self.flag(FLAG_Z)),
            0x30 => 2 + self.branch_if(bus, self.flag(FLAG_N)),
            0x10 => 2 + self.branch_if(bus, !self.flag(FLAG_N)),
            0x70 => 2 + self.branch_if(bus, self.flag(FLAG_V)),
            0x50 => 2 + self.branch_if(bus, !self.flag(FLAG_V)),

            // ---- Flag operations ----
            0x18 => {
                bus.tick(1);
                self.set_flag(FLAG_C, false);
                2
            }
            0x38 => {
                bus.tick(1);
                self.set_flag(FLAG_C, true);
                2
            }
            0xD8 => {
                bus.tick(1);
                self.set_flag(FLAG_D, false);
                2
            }
            0xF8 => {
                bus.tick(1);
                self.set_flag(FLAG_D, true);
                2
            }
            0x58 => {
                bus.tick(1);
                self.set_flag(FLAG_I, false);
                2
            }
            0x78 => {
                bus.tick(1);
                self.set_flag(FLAG_I, true);
                2
            }
            0xB8 => {
                bus.tick(1);
                self.set_flag(FLAG_V, false);
                2
            }

            // ---- BRK ----
            0x00 => {
                // The padding byte is fetched and thrown away; the
                // pushed return address skips it.
                self.fetch(bus);
                let pc = self.pc;
                self.push_word(bus, pc);
                let p = self.status_for_push(true);
                self.push(bus, p);
                self.set_flag(FLAG_I, true);
                self.pc = self.read_word(bus, 0xFFFE);
                7
            }

            // ---- LAX: load A and X together ----
            0xA7 => {
                let addr = self.zp(bus);
                let value = bus.read(addr);
                self.a = value;
                self.x = value;
                self.set_zn(value);
                3
            }
            0xB7 => {
                let addr = self.zp_y(bus);
                let value = bus.read(addr);
                self.a = value;
                self.x = value;
                self.set_zn(value);
                4
            }
            0xAF => {
                let addr = self.abs(bus);
                let value = bus.read(addr);
                self.a = value;
                self.x = value;
                self.set_zn(value);
                4
            }
            0xBF => {
                let (addr, crossed) = self.abs_y(bus);
                if crossed {
                    bus.tick(1);
                }
                let value = bus.read(addr);
                self.a = value;
                self.x = value;
                self.set_zn(value);
                4 + u32::from(crossed)
            }
            0xA3 => {
                let addr = self.ind_x(bus);
                let value = bus.read(addr);
                self.a = value;
                self.x = value;
                self.set_zn(value);
                6
            }
            0xB3 => {
                let (addr, crossed) = self.ind_y(bus);
                if crossed {
                    bus.tick(1);
                }
                let value = bus.read(addr);
                self.a = value;
                self.x = value;
                self.set_zn(value);
                5 + u32::from(crossed)
            }

            // ---- SAX: store A AND X, no flags ----
            0x87 => {
                let addr = self.zp(bus);
                bus.write(addr, self.a & self.x);
                3
            }
            0x97 => {
                let addr = self.zp_y(bus);
                bus.write(addr, self.a & self.x);
                4
            }
            0x8F => {
                let addr = self.abs(bus);
                bus.write(addr, self.a & self.x);
                4
            }
            0x83 => {
                let addr = self.ind_x(bus);
                bus.write(addr, self.a & self.x);
                6
            }

            // ---- DCP: DEC memory then CMP ----
            0xC7 => {
                let addr = self.zp(bus);
                let r = self.modify(bus, addr, |_, v| v.wrapping_sub(1));
                self.cmp(self.a, r);
                5
            }
            0xD7 => {
                let addr = self.zp_x(bus);
                let r = self.modify(bus, addr, |_, v| v.wrapping_sub(1));
                self.cmp(self.a, r);
                6
            }
            0xCF => {
                let addr = self.abs(bus);
                let r = self.modify(bus, addr, |_, v| v.wrapping_sub(1));
                self.cmp(self.a, r);
                6
            }
            0xDF => {
                let addr = self.abs_x_store(bus);
                let r = self.modify(bus, addr, |_, v| v.wrapping_sub(1));
                self.cmp(self.a, r);
                7
            }
            0xDB => {
                let addr = self.abs_y_store(bus);
                let r = self.modify(bus, addr, |_, v| v.wrapping_sub(1));
                self.cmp(self.a, r);
                7
            }
            0xC3 => {
                let addr = self.ind_x(bus);
                let r = self.modify(bus, addr, |_, v| v.wrapping_sub(1));
                self.cmp(self.a, r);
                8
            }
            0xD3 => {
                let addr = self.ind_y_store(bus);
                let r = self.modify(bus, addr, |_, v| v.wrapping_sub(1));
                self.cmp(self.a, r);
                8
            }

            // ---- ISB (ISC): INC memory then SBC ----
            0xE7 => {
                let addr = self.zp(bus);
                let r = self.modify(bus, addr, |_, v| v.wrapping_add(1));
                self.sbc(r);
                5
            }
            0xF7 => {
                let addr = self.zp_x(bus);
                let r = self.modify(bus, addr, |_, v| v.wrapping_add(1));
                self.sbc(r);
                6
            }
            0xEF => {
                let addr = self.abs(bus);
                let r = self.modify(bus, addr, |_, v| v.wrapping_add(1));
                self.sbc(r);
                6
            }
            0xFF => {
                let addr = self.abs_x_store(bus);
                let r = self.modify(bus, addr, |_, v| v.wrapping_add(1));
                self.sbc(r);
                7
            }
            0xFB => {
                let addr = self.abs_y_store(bus);
                let r = self.modify(bus, addr, |_, v| v.wrapping_add(1));
                self.sbc(r);
                7
            }
            0xE3 => {
                let addr = self.ind_x(bus);
                let r = self.modify(bus, addr, |_, v| v.wrapping_add(1));
                self.sbc(r);
                8
            }
            0xF3 => {
                let addr = self.ind_y_store(bus);
                let r = self.modify(bus, addr, |_, v| v.wrapping_add(1));
                self.sbc(r);
                8
            }

            // ---- SLO: ASL memory then ORA ----
            0x07 => {
                let addr = self.zp(bus);
                let r = self.modify(bus, addr, Self::asl);
                self.a |= r;
                self.set_zn(self.a);
                5
            }
            0x17 => {
                let addr = self.zp_x(bus);
                let r = self.modify(bus, addr, Self::asl);
                self.a |= r;
                self.set_zn(self.a);
                6
            }
            0x0F => {
                let addr = self.abs(bus);
                let r = self.modify(bus, addr, Self::asl);
                self.a |= r;
                self.set_zn(self.a);
                6
            }
            0x1F => {
                let addr = self.abs_x_store(bus);
                let r = self.modify(bus, addr, Self::asl);
                self.a |= r;
                self.set_zn(self.a);
                7
            }
            0x1B => {
                let addr = self.abs_y_store(bus);
                let r = self.modify(bus, addr, Self::asl);
                self.a |= r;
                self.set_zn(self.a);
                7
            }
            0x03 => {
                let addr = self.ind_x(bus);
                let r = self.modify(bus, addr, Self::asl);
                self.a |= r;
                self.set_zn(self.a);
                8
            }
            0x13 => {
                let addr = self.ind_y_store(bus);
                let r = self.modify(bus, addr, Self::asl);
                self.a |= r;
                self.set_zn(self.a);
                8
            }

            // ---- SRE: LSR memory then EOR ----
            0x47 => {
                let addr = self.zp(bus);
                let r = self.modify(bus, addr, Self::lsr);
                self.a ^= r;
                self.set_zn(self.a);
                5
            }
            0x57 => {
                let addr = self.zp_x(bus);
                let r = self.modify(bus, addr, Self::lsr);
                self.a ^= r;
                self.set_zn(self.a);
                6
            }
            0x4F => {
                let addr = self.abs(bus);
                let r = self.modify(bus, addr, Self::lsr);
                self.a ^= r;
                self.set_zn(self.a);
                6
            }
            0x5F => {
                let addr = self.abs_x_store(bus);
                let r = self.modify(bus, addr, Self::lsr);
                self.a ^= r;
                self.set_zn(self.a);
                7
            }
            0x5B => {
                let addr = self.abs_y_store(bus);
                let r = self.modify(bus, addr, Self::lsr);
                self.a ^= r;
                self.set_zn(self.a);
                7
            }
            0x43 => {
                let addr = self.ind_x(bus);
                let r = self.modify(bus, addr, Self::lsr);
                self.a ^= r;
                self.set_zn(self.a);
                8
            }
            0x53 => {
                let addr = self.ind_y_store(bus);
                let r = self.modify(bus, addr, Self::lsr);
                self.a ^= r;
                self.set_zn(self.a);
                8
            }

            // ---- RLA: ROL memory then AND ----
            0x27 => {
                let addr = self.zp(bus);
                let r = self.modify(bus, addr, Self::rol);
                self.a &= r;
                self.set_zn(self.a);
                5
            }
            0x37 => {
                let addr = self.zp_x(bus);
                let r = self.modify(bus, addr, Self::rol);
                self.a &= r;
                self.set_zn(self.a);
                6
            }
            0x2F => {
                let addr = self.abs(bus);
                let r = self.modify(bus, addr, Self::rol);
                self.a &= r;
                self.set_zn(self.a);
                6
            }
            0x3F => {
                let addr = self.abs_x_store(bus);
                let r = self.modify(bus, addr, Self::rol);
                self.a &= r;
                self.set_zn(self.a);
                7
            }
            0x3B => {
                let addr = self.abs_y_store(bus);
                let r = self.modify(bus, addr, Self::rol);
                self.a &= r;
                self.set_zn(self.a);
                7
            }
            0x23 => {
                let addr = self.ind_x(bus);
                let r = self.modify(bus, addr, Self::rol);
                self.a &= r;
                self.set_zn(self.a);
                8
            }
            0x33 => {
                let addr = self.ind_y_store(bus);
                let r = self.modify(bus, addr, Self::rol);
                self.a &= r;
                self.set_zn(self.a);
                8
            }

            // ---- RRA: ROR memory then ADC ----
            0x67 => {
                let addr = self.zp(bus);
                let r = self.modify(bus, addr, Self::ror);
                self.adc(r);
                5
            }
            0x77 => {
                let addr = self.zp_x(bus);
                let r = self.modify(bus, addr, Self::ror);
                self.adc(r);
                6
            }
            0x6F => {
                let addr = self.abs(bus);
                let r = self.modify(bus, addr, Self::ror);
                self.adc(r);
                6
            }
            0x7F => {
                let addr = self.abs_x_store(bus);
                let r = self.modify(bus, addr, Self::ror);
                self.adc(r);
                7
            }
            0x7B => {
                let addr = self.abs_y_store(bus);
                let r = self.modify(bus, addr, Self::ror);
                self.adc(r);
                7
            }
            0x63 => {
                let addr = self.ind_x(bus);
                let r = self.modify(bus, addr, Self::ror);
                self.adc(r);
                8
            }
            0x73 => {
                let addr = self.ind_y_store(bus);
                let r = self.modify(bus, addr, Self::ror);
                self.adc(r);
                8
            }

            // ---- Immediate-only combos ----
            // ANC: AND then copy N into C.
            0x0B | 0x2B => {
                let value = self.fetch(bus);
                self.a &= value;
                self.set_zn(self.a);
                self.set_flag(FLAG_C, self.a & 0x80 != 0);
                2
            }
            // ALR: AND then LSR A.
            0x4B => {
                let value = self.fetch(bus);
                self.a &= value;
                self.a = self.lsr(self.a);
                2
            }
            // ARR: AND then ROR A, C/V from bits 6 and 5.
            0x6B => {
                let value = self.fetch(bus);
                self.a &= value;
                self.a = self.ror(self.a);
                self.set_flag(FLAG_C, self.a & 0x40 != 0);
                self.set_flag(FLAG_V, ((self.a & 0x40) ^ ((self.a & 0x20) << 1)) != 0);
                2
            }
            // SBX: (A AND X) minus immediate into X.
            0xCB => {
                let value = self.fetch(bus);
                let base = self.a & self.x;
                self.set_flag(FLAG_C, base >= value);
                self.x = base.wrapping_sub(value);
                self.set_zn(self.x);
                2
            }

            // ---- NOPs, documented and otherwise ----
            0xEA | 0x1A | 0x3A | 0x5A | 0x7A | 0xDA | 0xFA => {
                bus.tick(1);
                2
            }
            0x80 | 0x82 | 0x89 | 0xC2 | 0xE2 => {
                self.fetch(bus);
                2
            }
            0x04 | 0x44 | 0x64 => {
                let addr = self.zp(bus);
                bus.read(addr);
                3
            }
            0x14 | 0x34 | 0x54 | 0x74 | 0xD4 | 0xF4 => {
                let addr = self.zp_x(bus);
                bus.read(addr);
                4
            }
            0x0C => {
                let addr = self.abs(bus);
                bus.read(addr);
                4
            }
            0x1C | 0x3C | 0x5C | 0x7C | 0xDC | 0xFC => {
                let (addr, crossed) = self.abs_x(bus);
                if crossed {
                    bus.tick(1);
                }
                bus.read(addr);
                4 + u32::from(crossed)
            }

            // Remaining holes in the opcode map (JAM and the unstable
            // combos): minimum-cost NOP, never a halt.
            _ => {
                bus.tick(1);
                2
            }
        }
    }
}

impl Default for Rp2a03 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Flat 64K test bus that counts clock advances.
    struct TestBus {
        memory: Vec<u8>,
        clock: u64,
    }

    impl TestBus {
        fn new() -> Self {
            Self {
                memory: vec![0; 0x10000],
                clock: 0,
            }
        }

        fn load(program: &[u8]) -> Self {
            let mut bus = Self::new();
            bus.memory[..program.len()].copy_from_slice(program);
            bus
        }
    }

    impl Bus for TestBus {
        fn read(&mut self, addr: u16) -> u8 {
            self.clock += 1;
            self.memory[addr as usize]
        }

        fn write(&mut self, addr: u16, value: u8) {
            self.clock += 1;
            self.memory[addr as usize] = value;
        }

        fn tick(&mut self, cycles: u32) {
            self.clock += u64::from(cycles);
        }
    }

    #[test]
    fn lda_immediate_sets_flags() {
        let mut cpu = Rp2a03::new();
        let mut bus = TestBus::load(&[0xA9, 0x42]);
        assert_eq!(cpu.step(&mut bus), 2);
        assert_eq!(cpu.a(), 0x42);

        let mut cpu = Rp2a03::new();
        let mut bus = TestBus::load(&[0xA9, 0x00]);
        cpu.step(&mut bus);
        assert!(cpu.flag(FLAG_Z));

        let mut cpu = Rp2a03::new();
        let mut bus = TestBus::load(&[0xA9, 0x80]);
        cpu.step(&mut bus);
        assert!(cpu.flag(FLAG_N));
    }

    #[test]
    fn adc_carry_and_overflow() {
        let mut cpu = Rp2a03::new();
        let mut bus = TestBus::load(&[0x69, 0x01]);
        cpu.a = 0xFF;
        cpu.step(&mut bus);
        assert_eq!(cpu.a(), 0x00);
        assert!(cpu.flag(FLAG_C));
        assert!(cpu.flag(FLAG_Z));

        // 0x50 + 0x50 = 0xA0: signed overflow, no carry.
        let mut cpu = Rp2a03::new();
        let mut bus = TestBus::load(&[0x69, 0x50]);
        cpu.a = 0x50;
        cpu.step(&mut bus);
        assert_eq!(cpu.a(), 0xA0);
        assert!(cpu.flag(FLAG_V));
        assert!(!cpu.flag(FLAG_C));
    }

    #[test]
    fn sbc_carry_means_no_borrow() {
        let mut cpu = Rp2a03::new();
        let mut bus = TestBus::load(&[0xE9, 0x10]);
        cpu.a = 0x20;
        cpu.set_flag(FLAG_C, true);
        cpu.step(&mut bus);
        assert_eq!(cpu.a(), 0x10);
        assert!(cpu.flag(FLAG_C));

        let mut cpu = Rp2a03::new();
        let mut bus = TestBus::load(&[0xE9, 0x30]);
        cpu.a = 0x20;
        cpu.set_flag(FLAG_C, true);
        cpu.step(&mut bus);
        assert_eq!(cpu.a(), 0xF0);
        assert!(!cpu.flag(FLAG_C)); // borrow happened
    }

    #[test]
    fn decimal_flag_is_stored_but_ignored() {
        // 0x09 + 0x01 with D set is 0x0A in binary, not BCD 0x10.
        let mut cpu = Rp2a03::new();
        let mut bus = TestBus::load(&[0xF8, 0x69, 0x01]);
        cpu.a = 0x09;
        cpu.step(&mut bus); // SED
        assert!(cpu.flag(FLAG_D));
        cpu.step(&mut bus); // ADC #$01
        assert_eq!(cpu.a(), 0x0A);
    }

    #[test]
    fn abs_x_page_cross_costs_one_extra() {
        // LDA $00FF,X with X=1 crosses into page 1.
        let mut cpu = Rp2a03::new();
        let mut bus = TestBus::load(&[0xBD, 0xFF, 0x00]);
        cpu.x = 1;
        assert_eq!(cpu.step(&mut bus), 5);

        // Same read without the cross.
        let mut cpu = Rp2a03::new();
        let mut bus = TestBus::load(&[0xBD, 0x00, 0x10]);
        cpu.x = 1;
        assert_eq!(cpu.step(&mut bus), 4);
    }

    #[test]
    fn sta_abs_x_always_pays_the_fixup() {
        let mut cpu = Rp2a03::new();
        let mut bus = TestBus::load(&[0x9D, 0x00, 0x10]);
        cpu.x = 1;
        cpu.a = 0x33;
        assert_eq!(cpu.step(&mut bus), 5);
        assert_eq!(bus.memory[0x1001], 0x33);
    }

    #[test]
    fn rmw_abs_x_is_seven_cycles() {
        let mut cpu = Rp2a03::new();
        let mut bus = TestBus::load(&[0xFE, 0x00, 0x10]);
        bus.memory[0x1002] = 0x41;
        cpu.x = 2;
        assert_eq!(cpu.step(&mut bus), 7);
        assert_eq!(bus.memory[0x1002], 0x42);
    }

    #[test]
    fn branch_cycle_shapes() {
        // Not taken: 2.
        let mut cpu = Rp2a03::new();
        let mut bus = TestBus::load(&[0xF0, 0x05]);
        assert_eq!(cpu.step(&mut bus), 2);
        assert_eq!(cpu.pc(), 0x0002);

        // Taken within the page: 3.
        let mut cpu = Rp2a03::new();
        let mut bus = TestBus::load(&[0xF0, 0x05]);
        cpu.set_flag(FLAG_Z, true);
        assert_eq!(cpu.step(&mut bus), 3);
        assert_eq!(cpu.pc(), 0x0007);

        // Taken across a page: 4.
        let mut cpu = Rp2a03::new();
        let mut bus = TestBus::new();
        bus.memory[0x10F0] = 0xF0; // BEQ +$20 from $10F0 lands at $1112
        bus.memory[0x10F1] = 0x20;
        cpu.pc = 0x10F0;
        cpu.set_flag(FLAG_Z, true);
        assert_eq!(cpu.step(&mut bus), 4);
        assert_eq!(cpu.pc(), 0x1112);
    }

    #[test]
    fn jmp_indirect_page_wrap_bug() {
        let mut cpu = Rp2a03::new();
        let mut bus = TestBus::load(&[0x6C, 0xFF, 0x02]);
        bus.memory[0x02FF] = 0x34;
        bus.memory[0x0300] = 0x12; // would be the "correct" high byte
        bus.memory[0x0200] = 0x56; // the byte the bug actually reads
        assert_eq!(cpu.step(&mut bus), 5);
        assert_eq!(cpu.pc(), 0x5634);
    }

    #[test]
    fn jsr_rts_round_trip() {
        let mut cpu = Rp2a03::new();
        let mut bus = TestBus::load(&[0x20, 0x00, 0x10]);
        bus.memory[0x1000] = 0x60; // RTS
        assert_eq!(cpu.step(&mut bus), 6);
        assert_eq!(cpu.pc(), 0x1000);
        assert_eq!(cpu.step(&mut bus), 6);
        assert_eq!(cpu.pc(), 0x0003);
    }

    #[test]
    fn brk_pushes_pc_plus_one_with_b_set() {
        let mut cpu = Rp2a03::new();
        let mut bus = TestBus::load(&[0x00, 0xFF]);
        bus.memory[0xFFFE] = 0x00;
        bus.memory[0xFFFF] = 0x80;
        assert_eq!(cpu.step(&mut bus), 7);
        assert_eq!(cpu.pc(), 0x8000);
        // Stack: $01FD = PCH, $01FC = PCL, $01FB = P.
        assert_eq!(bus.memory[0x01FD], 0x00);
        assert_eq!(bus.memory[0x01FC], 0x02); // PC+1 past the padding byte
        assert!(bus.memory[0x01FB] & 0x10 != 0); // B set
        assert!(cpu.interrupt_disable());
    }

    #[test]
    fn nmi_takes_priority_and_costs_seven() {
        let mut cpu = Rp2a03::new();
        let mut bus = TestBus::load(&[0xEA]);
        bus.memory[0xFFFA] = 0x00;
        bus.memory[0xFFFB] = 0x90;
        cpu.nmi();
        assert_eq!(cpu.step(&mut bus), 7);
        assert_eq!(cpu.pc(), 0x9000);
        // Pushed status has B clear.
        assert!(bus.memory[0x01FB] & 0x10 == 0);
    }

    #[test]
    fn irq_respects_interrupt_disable() {
        let mut cpu = Rp2a03::new();
        let mut bus = TestBus::load(&[0xEA, 0xEA]);
        bus.memory[0xFFFE] = 0x00;
        bus.memory[0xFFFF] = 0xA0;
        cpu.set_irq_line(true);
        // I is set at power-on: the NOP runs instead.
        assert_eq!(cpu.step(&mut bus), 2);
        assert_eq!(cpu.pc(), 0x0001);
        cpu.set_flag(FLAG_I, false);
        assert_eq!(cpu.step(&mut bus), 7);
        assert_eq!(cpu.pc(), 0xA000);
    }

    #[test]
    fn lax_loads_both_registers() {
        let mut cpu = Rp2a03::new();
        let mut bus = TestBus::load(&[0xA7, 0x10]);
        bus.memory[0x10] = 0x5A;
        assert_eq!(cpu.step(&mut bus), 3);
        assert_eq!(cpu.a(), 0x5A);
        assert_eq!(cpu.x(), 0x5A);
    }

    #[test]
    fn sax_stores_a_and_x() {
        let mut cpu = Rp2a03::new();
        let mut bus = TestBus::load(&[0x87, 0x10]);
        cpu.a = 0xF0;
        cpu.x = 0x3C;
        cpu.step(&mut bus);
        assert_eq!(bus.memory[0x10], 0x30);
    }

    #[test]
    fn dcp_decrements_then_compares() {
        let mut cpu = Rp2a03::new();
        let mut bus = TestBus::load(&[0xC7, 0x10]);
        bus.memory[0x10] = 0x43;
        cpu.a = 0x42;
        assert_eq!(cpu.step(&mut bus), 5);
        assert_eq!(bus.memory[0x10], 0x42);
        assert!(cpu.flag(FLAG_Z)); // A == decremented value
        assert!(cpu.flag(FLAG_C));
    }

    #[test]
    fn isb_increments_then_subtracts() {
        let mut cpu = Rp2a03::new();
        let mut bus = TestBus::load(&[0xE7, 0x10]);
        bus.memory[0x10] = 0x0F;
        cpu.a = 0x20;
        cpu.set_flag(FLAG_C, true);
        cpu.step(&mut bus);
        assert_eq!(bus.memory[0x10], 0x10);
        assert_eq!(cpu.a(), 0x10);
    }

    #[test]
    fn slo_shifts_then_ors() {
        let mut cpu = Rp2a03::new();
        let mut bus = TestBus::load(&[0x07, 0x10]);
        bus.memory[0x10] = 0x81;
        cpu.a = 0x01;
        cpu.step(&mut bus);
        assert_eq!(bus.memory[0x10], 0x02);
        assert_eq!(cpu.a(), 0x03);
        assert!(cpu.flag(FLAG_C)); // bit 7 shifted out
    }

    #[test]
    fn rra_rotates_then_adds() {
        let mut cpu = Rp2a03::new();
        let mut bus = TestBus::load(&[0x67, 0x10]);
        bus.memory[0x10] = 0x02;
        cpu.a = 0x01;
        cpu.step(&mut bus);
        assert_eq!(bus.memory[0x10], 0x01);
        assert_eq!(cpu.a(), 0x02); // 0x01 + 0x01, carry clear after ROR
    }

    #[test]
    fn nop_variants_have_documented_costs() {
        for (program, want, x) in [
            (vec![0x1Au8], 2u32, 0u8),
            (vec![0x80, 0x00], 2, 0),
            (vec![0x04, 0x10], 3, 0),
            (vec![0x14, 0x10], 4, 0),
            (vec![0x0C, 0x00, 0x10], 4, 0),
            (vec![0x1C, 0x00, 0x10], 4, 0),
            (vec![0x1C, 0xFF, 0x00], 5, 1), // page cross
        ] {
            let mut cpu = Rp2a03::new();
            let mut bus = TestBus::load(&program);
            cpu.x = x;
            assert_eq!(cpu.step(&mut bus), want, "program {program:02X?}");
        }
    }

    #[test]
    fn unknown_opcode_is_a_two_cycle_nop() {
        // $02 is a JAM on real silicon; here it must not halt.
        let mut cpu = Rp2a03::new();
        let mut bus = TestBus::load(&[0x02, 0xA9, 0x01]);
        assert_eq!(cpu.step(&mut bus), 2);
        cpu.step(&mut bus);
        assert_eq!(cpu.a(), 0x01);
    }

    #[test]
    fn cycle_counter_matches_bus_clock() {
        // A mixed program: the sum of step() results must equal both
        // the CPU's monotonic counter and the bus-side clock.
        let program = [
            0xA2, 0x10, // LDX #$10
            0x9A, // TXS
            0xA9, 0x05, // LDA #$05
            0x85, 0x10, // STA $10
            0xE6, 0x10, // INC $10
            0xBD, 0xF8, 0x00, // LDA $00F8,X (crosses page)
            0xD0, 0x02, // BNE +2
        ];
        let mut cpu = Rp2a03::new();
        let mut bus = TestBus::load(&program);
        let mut sum = 0u64;
        for _ in 0..7 {
            let before = cpu.total_cycles();
            let cycles = cpu.step(&mut bus);
            assert_eq!(cpu.total_cycles() - before, u64::from(cycles));
            sum += u64::from(cycles);
        }
        assert_eq!(sum, cpu.total_cycles());
        assert_eq!(sum, bus.clock);
    }

    #[test]
    fn stall_cycles_are_charged_to_the_instruction() {
        struct StallBus {
            inner: TestBus,
            stall: u32,
        }
        impl Bus for StallBus {
            fn read(&mut self, addr: u16) -> u8 {
                self.inner.read(addr)
            }
            fn write(&mut self, addr: u16, value: u8) {
                self.inner.write(addr, value);
                if addr == 0x4014 {
                    self.stall += 513;
                }
            }
            fn tick(&mut self, cycles: u32) {
                self.inner.tick(cycles);
            }
            fn take_stall(&mut self) -> u32 {
                std::mem::take(&mut self.stall)
            }
        }

        let mut cpu = Rp2a03::new();
        let mut bus = StallBus {
            inner: TestBus::load(&[0x8D, 0x14, 0x40]), // STA $4014
            stall: 0,
        };
        assert_eq!(cpu.step(&mut bus), 4 + 513);
    }

    #[test]
    fn reset_reads_vector() {
        let mut cpu = Rp2a03::new();
        let mut bus = TestBus::new();
        bus.memory[0xFFFC] = 0x34;
        bus.memory[0xFFFD] = 0x12;
        cpu.reset(&mut bus);
        assert_eq!(cpu.pc(), 0x1234);
        assert_eq!(cpu.sp(), 0xFD);
        assert_eq!(cpu.status(), 0x24);
    }
}
