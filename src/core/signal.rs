use super::error::TbError;
use std::collections::HashMap;

// Canonical ready/valid register-bus signal names. The clock itself is the
// engine's tick and is not a stored signal.
pub const RST_N: &str = "RST_N";
pub const WRITE_ADDRESS: &str = "write_address";
pub const WRITE_DATA: &str = "write_data";
pub const WRITE_EN: &str = "write_en";
pub const WRITE_RDY: &str = "write_rdy";
pub const READ_ADDRESS: &str = "read_address";
pub const READ_EN: &str = "read_en";
pub const READ_RDY: &str = "read_rdy";
pub const READ_DATA: &str = "read_data";

#[derive(Debug, Clone)]
struct SignalState {
    width: u32,
    value: u64,
    prev: u64,
}

/// Named bit-vector signal store shared by drivers, monitor and device model.
///
/// Values are masked to the registered width on every set. The store keeps
/// the value each signal held as of the last rising edge so observers can
/// sample the bus as it stood at the edge and query transitions.
#[derive(Debug, Default)]
pub struct Signals {
    signals: HashMap<String, SignalState>,
}

impl Signals {
    pub fn new() -> Self {
        Self {
            signals: HashMap::new(),
        }
    }

    /// Create a store pre-registered with the standard register-bus signals.
    pub fn register_bus() -> Self {
        let mut signals = Self::new();
        signals.register(RST_N, 1);
        signals.register(WRITE_ADDRESS, 8);
        signals.register(WRITE_DATA, 32);
        signals.register(WRITE_EN, 1);
        signals.register(WRITE_RDY, 1);
        signals.register(READ_ADDRESS, 8);
        signals.register(READ_EN, 1);
        signals.register(READ_RDY, 1);
        signals.register(READ_DATA, 32);
        signals
    }

    /// Register a signal with the given bit width, initialized to 0.
    pub fn register(&mut self, name: &str, width: u32) {
        self.signals.insert(
            name.to_string(),
            SignalState {
                width,
                value: 0,
                prev: 0,
            },
        );
    }

    /// Current value of a signal, or None if it was never registered.
    pub fn get(&self, name: &str) -> Option<u64> {
        self.signals.get(name).map(|s| s.value)
    }

    /// Value the signal held as of the last rising edge.
    pub fn at_edge(&self, name: &str) -> Option<u64> {
        self.signals.get(name).map(|s| s.prev)
    }

    /// Set a signal, masking the value to the registered width.
    pub fn set(&mut self, name: &str, value: u64) -> Result<(), TbError> {
        let state = self
            .signals
            .get_mut(name)
            .ok_or_else(|| TbError::UnknownSignal(name.to_string()))?;
        state.value = value & width_mask(state.width);
        Ok(())
    }

    /// True if the signal transitioned from zero to non-zero since the last edge.
    pub fn rose(&self, name: &str) -> Option<bool> {
        self.signals.get(name).map(|s| s.prev == 0 && s.value != 0)
    }

    /// True if the signal transitioned from non-zero to zero since the last edge.
    pub fn fell(&self, name: &str) -> Option<bool> {
        self.signals.get(name).map(|s| s.prev != 0 && s.value == 0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.signals.contains_key(name)
    }

    /// Latch current values as the at-edge snapshot. The engine calls this
    /// once per cycle, immediately before delivering the edge to the device.
    pub(crate) fn latch_edge(&mut self) {
        for state in self.signals.values_mut() {
            state.prev = state.value;
        }
    }
}

fn width_mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_masks_to_width() {
        let mut signals = Signals::new();
        signals.register("en", 1);
        signals.register("data", 8);

        signals.set("en", 3).unwrap();
        assert_eq!(signals.get("en"), Some(1));

        signals.set("data", 0x1FF).unwrap();
        assert_eq!(signals.get("data"), Some(0xFF));
    }

    #[test]
    fn test_unknown_signal_is_an_error() {
        let mut signals = Signals::new();
        let result = signals.set("nonexistent", 1);
        assert_eq!(
            result,
            Err(TbError::UnknownSignal("nonexistent".to_string()))
        );
        assert_eq!(signals.get("nonexistent"), None);
    }

    #[test]
    fn test_register_bus_contains_standard_signals() {
        let signals = Signals::register_bus();
        for name in [
            RST_N,
            WRITE_ADDRESS,
            WRITE_DATA,
            WRITE_EN,
            WRITE_RDY,
            READ_ADDRESS,
            READ_EN,
            READ_RDY,
            READ_DATA,
        ] {
            assert!(signals.contains(name), "missing signal '{}'", name);
            assert_eq!(signals.get(name), Some(0));
        }
    }

    #[test]
    fn test_edge_snapshot_and_transitions() {
        let mut signals = Signals::new();
        signals.register("rdy", 1);

        signals.set("rdy", 1).unwrap();
        assert_eq!(signals.rose("rdy"), Some(true));

        signals.latch_edge();
        assert_eq!(signals.at_edge("rdy"), Some(1));
        assert_eq!(signals.rose("rdy"), Some(false));

        signals.set("rdy", 0).unwrap();
        assert_eq!(signals.fell("rdy"), Some(true));
    }
}
