use super::signal::Signals;

/// Behavioral model of the device under test.
///
/// The engine delivers every rising clock edge through this trait and never
/// looks past it. An implementation reads the driven inputs from the signal
/// store and updates its registered state and outputs in place; outputs it
/// writes here are the values observers see in the stable phase after the
/// edge.
pub trait Device {
    /// Apply one rising clock edge.
    fn rising_edge(&mut self, io: &mut Signals);
}
