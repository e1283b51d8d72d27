use super::device::Device;
use super::error::TbError;
use super::signal::Signals;
use log::trace;

/// Passive observer invoked once per cycle in the stable phase after the edge.
///
/// Probes may inspect the signal store but the engine hands them no way to
/// drive it; they are purely observational.
pub trait Probe {
    fn sample(&mut self, signals: &Signals, cycle: u64);
}

/// Capability surface a driver uses to reach the bus: signal access plus the
/// three suspension primitives. The clock engine implements it; drivers hold
/// no engine state of their own.
pub trait RegisterBus {
    /// Current value of a signal.
    fn signal(&self, name: &str) -> Result<u64, TbError>;

    /// Drive a signal; the value takes effect before the next edge.
    fn set_signal(&mut self, name: &str, value: u64) -> Result<(), TbError>;

    /// Suspend until the next rising clock edge has been delivered.
    fn await_edge(&mut self);

    /// Suspend until `name` reads `value`, checking after each edge.
    ///
    /// Returns immediately if the level already holds. Converts to
    /// `HandshakeTimeout` once `max_cycles` edges pass without the level
    /// being observed.
    fn await_level(&mut self, name: &str, value: u64, max_cycles: u32) -> Result<(), TbError>;

    /// Suspend for a fixed number of rising edges.
    fn delay(&mut self, cycles: u32);

    /// Current simulation time in cycles.
    fn now(&self) -> u64;
}

/// Cooperative clock engine.
///
/// Advances simulated time one rising edge at a time with a fixed intra-cycle
/// order: values already applied by callers form the drive phase, the edge is
/// delivered to the device, then all probes sample in the stable phase.
/// Everything runs on one logical thread; tasks interleave only at the
/// suspension primitives of `RegisterBus`.
pub struct ClockEngine {
    signals: Signals,
    device: Box<dyn Device>,
    probes: Vec<Box<dyn Probe>>,
    current_cycle: u64,
}

impl ClockEngine {
    /// Create an engine over the standard register-bus signal set.
    pub fn new(device: Box<dyn Device>) -> Self {
        Self {
            signals: Signals::register_bus(),
            device,
            probes: Vec::new(),
            current_cycle: 0,
        }
    }

    /// Register a probe; it is sampled every cycle from the next tick on.
    pub fn register_probe(&mut self, probe: Box<dyn Probe>) {
        self.probes.push(probe);
    }

    pub fn signals(&self) -> &Signals {
        &self.signals
    }

    /// Advance one full clock period: latch the drive-phase values, deliver
    /// the rising edge to the device, then run all probes in the stable phase.
    pub fn tick(&mut self) {
        self.signals.latch_edge();
        self.device.rising_edge(&mut self.signals);
        self.current_cycle += 1;
        trace!("=== cycle {} ===", self.current_cycle);
        for probe in &mut self.probes {
            probe.sample(&self.signals, self.current_cycle);
        }
    }

    pub fn current_cycle(&self) -> u64 {
        self.current_cycle
    }
}

impl RegisterBus for ClockEngine {
    fn signal(&self, name: &str) -> Result<u64, TbError> {
        self.signals
            .get(name)
            .ok_or_else(|| TbError::UnknownSignal(name.to_string()))
    }

    fn set_signal(&mut self, name: &str, value: u64) -> Result<(), TbError> {
        self.signals.set(name, value)
    }

    fn await_edge(&mut self) {
        self.tick();
    }

    fn await_level(&mut self, name: &str, value: u64, max_cycles: u32) -> Result<(), TbError> {
        if self.signal(name)? == value {
            return Ok(());
        }
        for _ in 0..max_cycles {
            self.tick();
            if self.signal(name)? == value {
                return Ok(());
            }
        }
        Err(TbError::HandshakeTimeout {
            signal: name.to_string(),
            max_cycles,
        })
    }

    fn delay(&mut self, cycles: u32) {
        for _ in 0..cycles {
            self.tick();
        }
    }

    fn now(&self) -> u64 {
        self.current_cycle
    }
}
