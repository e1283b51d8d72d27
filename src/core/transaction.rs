/// Direction of a register transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxKind {
    Write,
    Read,
}

/// A completed register transaction observed on the bus.
///
/// Immutable once recorded; `timestamp` is the simulation cycle at which the
/// enable/ready coincidence was observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub kind: TxKind,
    pub address: u64,
    pub data: u64,
    pub timestamp: u64,
}

impl Transaction {
    pub fn new(kind: TxKind, address: u64, data: u64, timestamp: u64) -> Self {
        Self {
            kind,
            address,
            data,
            timestamp,
        }
    }
}

impl std::fmt::Display for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TxKind::Write => write!(
                f,
                "write addr={} data={} @{}",
                self.address, self.data, self.timestamp
            ),
            TxKind::Read => write!(
                f,
                "read addr={} data={} @{}",
                self.address, self.data, self.timestamp
            ),
        }
    }
}
