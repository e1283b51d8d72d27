use super::clock::Probe;
use super::regmap;
use super::signal::{self, Signals};
use super::transaction::{Transaction, TxKind};
use log::debug;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

/// Receives every completed transaction the monitor observes.
pub trait TransactionSubscriber {
    fn on_transaction(&mut self, tx: &Transaction);
}

/// Passive bus monitor.
///
/// Registered as a probe with the clock engine; every cycle, in the stable
/// phase, it samples the enable/ready pairs as they stood at the edge and
/// emits a `Transaction` for each coincidence. Read data is taken from the
/// post-edge value of `read_data`, which is the registered response to the
/// read just observed. The monitor never drives the bus and never blocks a
/// driver.
pub struct BusMonitor {
    name: String,
    subscribers: Vec<Rc<RefCell<dyn TransactionSubscriber>>>,
}

impl BusMonitor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, subscriber: Rc<RefCell<dyn TransactionSubscriber>>) {
        self.subscribers.push(subscriber);
    }

    fn publish(&mut self, tx: &Transaction) {
        debug!("[Monitor:{}] observed {}", self.name, tx);
        for subscriber in &self.subscribers {
            subscriber.borrow_mut().on_transaction(tx);
        }
    }
}

impl Probe for BusMonitor {
    fn sample(&mut self, signals: &Signals, cycle: u64) {
        let at_edge = |name| signals.at_edge(name).unwrap_or(0);

        if at_edge(signal::WRITE_EN) == 1 && at_edge(signal::WRITE_RDY) == 1 {
            let tx = Transaction::new(
                TxKind::Write,
                at_edge(signal::WRITE_ADDRESS),
                at_edge(signal::WRITE_DATA),
                cycle,
            );
            self.publish(&tx);
        }

        if at_edge(signal::READ_EN) == 1 && at_edge(signal::READ_RDY) == 1 {
            let data = signals.get(signal::READ_DATA).unwrap_or(0);
            let tx = Transaction::new(TxKind::Read, at_edge(signal::READ_ADDRESS), data, cycle);
            self.publish(&tx);
        }
    }
}

/// One decoded entry of the observed-transaction log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatRecord {
    pub name: String,
    pub value: String,
}

/// Subscriber that keeps a register-aware decoded log of bus traffic.
///
/// Data registers log their raw value under a short mnemonic; status
/// registers are decoded into the device's full/empty convention. Traffic to
/// addresses outside the map is ignored.
#[derive(Debug, Default)]
pub struct TransactionStats {
    records: Vec<StatRecord>,
}

impl TransactionStats {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn records(&self) -> &[StatRecord] {
        &self.records
    }

    fn decode(tx: &Transaction) -> Option<StatRecord> {
        let name = match (tx.kind, tx.address) {
            (TxKind::Read, regmap::Y_OUTPUT) => "yr",
            (TxKind::Write, regmap::A_DATA) => "aw",
            (TxKind::Write, regmap::B_DATA) => "bw",
            (TxKind::Read, regmap::A_STATUS) => "as",
            (TxKind::Read, regmap::B_STATUS) => "bs",
            (TxKind::Read, regmap::Y_STATUS) => "ys",
            _ => return None,
        };
        let value = match regmap::decode_status(tx.address, tx.data) {
            Some(status) if tx.kind == TxKind::Read => status.to_string(),
            _ => tx.data.to_string(),
        };
        Some(StatRecord {
            name: name.to_string(),
            value,
        })
    }
}

impl TransactionSubscriber for TransactionStats {
    fn on_transaction(&mut self, tx: &Transaction) {
        if let Some(record) = Self::decode(tx) {
            self.records.push(record);
        }
    }
}
