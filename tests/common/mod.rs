use regbench::core::{regmap, signal};
use regbench::{ClockEngine, Device, RegisterBus, Signals};

fn put(io: &mut Signals, name: &str, value: u64) {
    let _ = io.set(name, value);
}

/// Plain 6-word register file behind the ready/valid handshake.
///
/// Both ready lines rise one edge after reset release; writes land at the
/// edge where enable and ready coincide; reads register their response at
/// that edge.
pub struct RegFileDevice {
    regs: [u64; 6],
    ready: bool,
}

impl RegFileDevice {
    pub fn new() -> Self {
        Self {
            regs: [0; 6],
            ready: false,
        }
    }
}

impl Device for RegFileDevice {
    fn rising_edge(&mut self, io: &mut Signals) {
        if io.get(signal::RST_N).unwrap_or(1) == 0 {
            self.regs = [0; 6];
            self.ready = false;
            put(io, signal::WRITE_RDY, 0);
            put(io, signal::READ_RDY, 0);
            put(io, signal::READ_DATA, 0);
            return;
        }

        let write_en = io.get(signal::WRITE_EN).unwrap_or(0);
        let write_address = io.get(signal::WRITE_ADDRESS).unwrap_or(0) as usize;
        let write_data = io.get(signal::WRITE_DATA).unwrap_or(0);
        let read_en = io.get(signal::READ_EN).unwrap_or(0);
        let read_address = io.get(signal::READ_ADDRESS).unwrap_or(0) as usize;

        if self.ready && write_en == 1 && write_address < self.regs.len() {
            self.regs[write_address] = write_data;
        }
        if self.ready && read_en == 1 {
            let value = self.regs.get(read_address).copied().unwrap_or(0);
            put(io, signal::READ_DATA, value);
        }

        self.ready = true;
        put(io, signal::WRITE_RDY, 1);
        put(io, signal::READ_RDY, 1);
    }
}

/// Reference model of the OR-gate device.
///
/// Writes to `A_data`/`B_data` fill the two input slots; once both are full
/// `Y_status` reads 1 and `Y_output` reads the OR of the pair. Reading
/// `Y_output` drains both slots so the next pair can be loaded. Input
/// statuses follow the 0=full convention.
pub struct OrGateDevice {
    a: u64,
    b: u64,
    full_a: bool,
    full_b: bool,
    ready: bool,
}

impl OrGateDevice {
    pub fn new() -> Self {
        Self {
            a: 0,
            b: 0,
            full_a: false,
            full_b: false,
            ready: false,
        }
    }
}

impl Device for OrGateDevice {
    fn rising_edge(&mut self, io: &mut Signals) {
        if io.get(signal::RST_N).unwrap_or(1) == 0 {
            self.a = 0;
            self.b = 0;
            self.full_a = false;
            self.full_b = false;
            self.ready = false;
            put(io, signal::WRITE_RDY, 0);
            put(io, signal::READ_RDY, 0);
            put(io, signal::READ_DATA, 0);
            return;
        }

        let write_en = io.get(signal::WRITE_EN).unwrap_or(0);
        let write_address = io.get(signal::WRITE_ADDRESS).unwrap_or(0);
        let write_data = io.get(signal::WRITE_DATA).unwrap_or(0);
        let read_en = io.get(signal::READ_EN).unwrap_or(0);
        let read_address = io.get(signal::READ_ADDRESS).unwrap_or(0);

        if self.ready && write_en == 1 {
            match write_address {
                regmap::A_DATA => {
                    self.a = write_data & 1;
                    self.full_a = true;
                }
                regmap::B_DATA => {
                    self.b = write_data & 1;
                    self.full_b = true;
                }
                _ => {}
            }
        }

        if self.ready && read_en == 1 {
            let value = match read_address {
                regmap::A_STATUS => u64::from(!self.full_a),
                regmap::B_STATUS => u64::from(!self.full_b),
                regmap::Y_STATUS => u64::from(self.full_a && self.full_b),
                regmap::Y_OUTPUT => {
                    let y = self.a | self.b;
                    if self.full_a && self.full_b {
                        self.full_a = false;
                        self.full_b = false;
                    }
                    y
                }
                _ => 0,
            };
            put(io, signal::READ_DATA, value);
        }

        self.ready = true;
        put(io, signal::WRITE_RDY, 1);
        put(io, signal::READ_RDY, 1);
    }
}

/// Never asserts either ready line; for timeout properties.
pub struct StuckDevice;

impl Device for StuckDevice {
    fn rising_edge(&mut self, io: &mut Signals) {
        put(io, signal::WRITE_RDY, 0);
        put(io, signal::READ_RDY, 0);
    }
}

/// Drive the canonical reset sequence by hand: park the driven signals,
/// pulse the active-low reset, settle one cycle.
pub fn reset(engine: &mut ClockEngine) {
    for name in [
        signal::WRITE_ADDRESS,
        signal::WRITE_DATA,
        signal::WRITE_EN,
        signal::READ_ADDRESS,
        signal::READ_EN,
    ] {
        engine.set_signal(name, 0).unwrap();
    }
    engine.set_signal(signal::RST_N, 1).unwrap();
    engine.delay(4);
    engine.set_signal(signal::RST_N, 0).unwrap();
    engine.delay(4);
    engine.set_signal(signal::RST_N, 1).unwrap();
    engine.delay(1);
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
