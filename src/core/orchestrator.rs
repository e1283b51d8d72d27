use super::clock::{ClockEngine, RegisterBus};
use super::coverage::{CoverageModel, CoverageReport, SampleValues};
use super::device::Device;
use super::driver::{RegisterReadDriver, RegisterWriteDriver, DEFAULT_TIMEOUT_CYCLES};
use super::error::TbError;
use super::monitor::{BusMonitor, StatRecord, TransactionStats};
use super::regmap;
use super::scoreboard::{Mismatch, ScoreboardModel};
use super::signal;
use super::stimulus::{field, StimulusGenerator};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use uuid::Uuid;

/// Test run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestConfig {
    /// Attempt budget for the random drive loop.
    pub max_attempts: u64,
    /// Closure target applied to every registered cross, in percent.
    pub coverage_target: f64,
    /// Abort at the first scoreboard mismatch instead of aggregating.
    pub strict_scoreboard: bool,
    /// Handshake wait budget handed to both drivers, in cycles.
    pub timeout_cycles: u32,
    /// Cycles to hold reset inactive before asserting it.
    pub pre_reset_cycles: u32,
    /// Cycles to hold reset asserted (active-low).
    pub reset_cycles: u32,
    /// Cycles to settle after reset release, before any stimulus.
    pub settle_cycles: u32,
    /// Seed for the stimulus generator.
    pub random_seed: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            max_attempts: 256,
            coverage_target: 100.0,
            strict_scoreboard: false,
            timeout_cycles: DEFAULT_TIMEOUT_CYCLES,
            pre_reset_cycles: 4,
            reset_cycles: 4,
            settle_cycles: 1,
            random_seed: 42,
        }
    }
}

impl TestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, attempts: u64) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_coverage_target(mut self, target: f64) -> Self {
        self.coverage_target = target;
        self
    }

    pub fn with_strict_scoreboard(mut self, strict: bool) -> Self {
        self.strict_scoreboard = strict;
        self
    }

    pub fn with_timeout_cycles(mut self, cycles: u32) -> Self {
        self.timeout_cycles = cycles;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), TbError> {
        if self.max_attempts == 0 {
            return Err(TbError::Config("attempt budget must be at least 1".into()));
        }
        if self.timeout_cycles == 0 {
            return Err(TbError::Config(
                "handshake timeout budget must be at least 1 cycle".into(),
            ));
        }
        if self.reset_cycles < 2 {
            return Err(TbError::Config(
                "reset must be held for at least two cycles".into(),
            ));
        }
        if self.settle_cycles < 1 {
            return Err(TbError::Config(
                "at least one settle cycle is required after reset release".into(),
            ));
        }
        if !(self.coverage_target > 0.0 && self.coverage_target <= 100.0) {
            return Err(TbError::Config(
                "coverage target must be within (0, 100]".into(),
            ));
        }
        Ok(())
    }
}

/// Phases of a test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TestState {
    Reset,
    WarmUp,
    DriveLoop,
    ClosureCheck,
    Report,
    Done,
}

/// Recorded when the attempt budget ran out before closure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClosureFailure {
    pub achieved: f64,
    pub target: f64,
}

/// Final summary of one test run, shaped for the external exporter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub passed: bool,
    pub closure_reached: bool,
    pub closure_failure: Option<ClosureFailure>,
    pub iterations: u64,
    pub cycles: u64,
    pub coverage: CoverageReport,
    pub mismatches: Vec<Mismatch>,
    pub transactions: Vec<StatRecord>,
}

/// Sequences one constrained-random run against a device.
///
/// The orchestrator owns the clock engine and both drivers and serializes
/// all dispatch: a new transaction is never issued before the previous one
/// completed. Scoreboard, coverage and the transaction log are shared by
/// reference with the passive monitor.
pub struct TestOrchestrator {
    name: String,
    run_id: String,
    config: TestConfig,
    engine: ClockEngine,
    write_driver: RegisterWriteDriver,
    read_driver: RegisterReadDriver,
    generator: StimulusGenerator,
    scoreboard: Rc<RefCell<ScoreboardModel>>,
    coverage: Rc<RefCell<CoverageModel>>,
    stats: Rc<RefCell<TransactionStats>>,
    state: TestState,
    iterations: u64,
    closure_reached: bool,
    closure_failure: Option<ClosureFailure>,
}

impl TestOrchestrator {
    /// Build a fully wired testbench around a device.
    ///
    /// Setup is fail-fast: the configuration is validated and the stimulus
    /// space solved here, so an unsatisfiable constraint set never reaches
    /// the bus.
    pub fn new(name: &str, device: Box<dyn Device>, config: TestConfig) -> Result<Self, TbError> {
        config.validate()?;

        let mut engine = ClockEngine::new(device);
        let scoreboard = Rc::new(RefCell::new(ScoreboardModel::new(name)));
        let stats = Rc::new(RefCell::new(TransactionStats::new()));
        let coverage = Rc::new(RefCell::new(build_coverage_model()?));

        let mut monitor = BusMonitor::new(name);
        monitor.subscribe(scoreboard.clone());
        monitor.subscribe(stats.clone());
        engine.register_probe(Box::new(monitor));

        let mut generator = StimulusGenerator::register_interface(config.random_seed);
        generator.solve()?;

        Ok(Self {
            name: name.to_string(),
            run_id: Uuid::new_v4().to_string(),
            write_driver: RegisterWriteDriver::with_timeout(name, config.timeout_cycles),
            read_driver: RegisterReadDriver::with_timeout(name, config.timeout_cycles),
            config,
            engine,
            generator,
            scoreboard,
            coverage,
            stats,
            state: TestState::Reset,
            iterations: 0,
            closure_reached: false,
            closure_failure: None,
        })
    }

    /// Execute the run to completion and return the final report.
    pub fn run(&mut self) -> Result<RunReport, TbError> {
        loop {
            info!("[Orchestrator:{}] entering {:?}", self.name, self.state);
            match self.state {
                TestState::Reset => {
                    self.reset()?;
                    self.state = TestState::WarmUp;
                }
                TestState::WarmUp => {
                    self.warm_up()?;
                    self.state = TestState::DriveLoop;
                }
                TestState::DriveLoop => {
                    self.drive_loop()?;
                    self.state = TestState::ClosureCheck;
                }
                TestState::ClosureCheck => {
                    self.closure_check();
                    self.state = TestState::Report;
                }
                TestState::Report => {
                    let report = self.build_report();
                    self.state = TestState::Done;
                    return Ok(report);
                }
                TestState::Done => {
                    return Err(TbError::Config("run already completed".into()));
                }
            }
        }
    }

    pub fn state(&self) -> TestState {
        self.state
    }

    pub fn coverage(&self) -> Rc<RefCell<CoverageModel>> {
        self.coverage.clone()
    }

    pub fn scoreboard(&self) -> Rc<RefCell<ScoreboardModel>> {
        self.scoreboard.clone()
    }

    /// Park all driven signals, pulse the active-low reset, and settle.
    fn reset(&mut self) -> Result<(), TbError> {
        for name in [
            signal::WRITE_ADDRESS,
            signal::WRITE_DATA,
            signal::WRITE_EN,
            signal::READ_ADDRESS,
            signal::READ_EN,
        ] {
            self.engine.set_signal(name, 0)?;
        }
        self.engine.set_signal(signal::RST_N, 1)?;
        self.engine.delay(self.config.pre_reset_cycles);
        self.engine.set_signal(signal::RST_N, 0)?;
        self.engine.delay(self.config.reset_cycles);
        self.engine.set_signal(signal::RST_N, 1)?;
        self.engine.delay(self.config.settle_cycles);
        debug!(
            "[Orchestrator:{}] reset done at cycle {}",
            self.name,
            self.engine.now()
        );
        Ok(())
    }

    /// Directed preamble: drive all four (a, b) input combinations, sample
    /// the functional cross, and read back the result register.
    fn warm_up(&mut self) -> Result<(), TbError> {
        for (a, b) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
            self.write_driver
                .write(&mut self.engine, regmap::A_DATA, a)?;
            self.write_driver
                .write(&mut self.engine, regmap::B_DATA, b)?;

            let mut raw = SampleValues::new();
            raw.insert("a".to_string(), a);
            raw.insert("b".to_string(), b);
            self.coverage.borrow_mut().sample(&raw);

            let y = self.read_driver.read(&mut self.engine, regmap::Y_OUTPUT)?;
            debug!("[Orchestrator:{}] functional a:{} b:{} y:{}", self.name, a, b, y);
            self.check_read(regmap::Y_OUTPUT, y)?;
        }
        Ok(())
    }

    /// The constrained-random loop: sample, cover, dispatch, check.
    fn drive_loop(&mut self) -> Result<(), TbError> {
        while self.iterations < self.config.max_attempts {
            if self
                .coverage
                .borrow()
                .closed(self.config.coverage_target)
            {
                info!(
                    "[Orchestrator:{}] coverage closed after {} iterations",
                    self.name, self.iterations
                );
                return Ok(());
            }

            let sample = self.generator.next_sample()?;
            self.coverage.borrow_mut().sample(&sample);

            if field(&sample, "write_en") == 1 {
                let address = field(&sample, "write_address");
                let data = field(&sample, "write_data");
                debug!(
                    "[Orchestrator:{}] [{}] write address {} data {}",
                    self.name, self.iterations, address, data
                );
                self.write_driver.write(&mut self.engine, address, data)?;
            } else if field(&sample, "read_en") == 1 {
                let address = field(&sample, "read_address");
                let observed = self.read_driver.read(&mut self.engine, address)?;
                debug!(
                    "[Orchestrator:{}] [{}] read {} got data {}",
                    self.name,
                    self.iterations,
                    regmap::name_of(address).unwrap_or("?"),
                    observed
                );
                self.check_read(address, observed)?;
            }

            self.engine.await_edge();
            self.iterations += 1;
        }
        Ok(())
    }

    fn closure_check(&mut self) {
        let coverage = self.coverage.borrow();
        self.closure_reached = coverage.closed(self.config.coverage_target);
        if !self.closure_reached {
            let failure = ClosureFailure {
                achieved: coverage.overall_percent(),
                target: self.config.coverage_target,
            };
            warn!(
                "[Orchestrator:{}] {}",
                self.name,
                TbError::CoverageClosureFailure {
                    achieved: failure.achieved,
                    target: failure.target,
                }
            );
            self.closure_failure = Some(failure);
        }
    }

    fn build_report(&self) -> RunReport {
        let coverage = self.coverage.borrow().report();
        let mismatches = self.scoreboard.borrow().mismatches().to_vec();
        let passed = self.closure_reached
            && (!self.config.strict_scoreboard || mismatches.is_empty());

        info!("[Orchestrator:{}]\n{}", self.name, coverage);
        info!(
            "[Orchestrator:{}] run {} {}: {} iterations, {} cycles, {} mismatches",
            self.name,
            self.run_id,
            if passed { "PASSED" } else { "FAILED" },
            self.iterations,
            self.engine.current_cycle(),
            mismatches.len()
        );

        RunReport {
            run_id: self.run_id.clone(),
            passed,
            closure_reached: self.closure_reached,
            closure_failure: self.closure_failure.clone(),
            iterations: self.iterations,
            cycles: self.engine.current_cycle(),
            coverage,
            mismatches,
            transactions: self.stats.borrow().records().to_vec(),
        }
    }

    /// Route a read result through the scoreboard. Mismatches abort only in
    /// strict mode; otherwise they stay recorded for the final report.
    fn check_read(&mut self, address: u64, observed: u64) -> Result<(), TbError> {
        match self.scoreboard.borrow_mut().on_read(address, observed) {
            Ok(()) => Ok(()),
            Err(err) if self.config.strict_scoreboard => Err(err),
            Err(_) => Ok(()),
        }
    }
}

/// The canonical coverage groups of the register interface: the functional
/// (a, b) cross plus the write-side and read-side stimulus crosses.
fn build_coverage_model() -> Result<CoverageModel, TbError> {
    let mut coverage = CoverageModel::new();

    coverage.register_point("a", CoverageModel::field("a"), vec![0, 1], 1);
    coverage.register_point("b", CoverageModel::field("b"), vec![0, 1], 1);
    coverage.register_cross("ab", &["a", "b"], 1)?;

    coverage.register_point(
        "w.addr",
        CoverageModel::field("write_address"),
        vec![regmap::A_DATA, regmap::B_DATA],
        1,
    );
    coverage.register_point("w.data", CoverageModel::field("write_data"), vec![0, 1], 1);
    coverage.register_point("w.en", CoverageModel::field("write_en"), vec![0, 1], 1);
    coverage.register_cross("w", &["w.addr", "w.data", "w.en"], 1)?;

    coverage.register_point(
        "r.addr",
        CoverageModel::field("read_address"),
        vec![
            regmap::A_STATUS,
            regmap::B_STATUS,
            regmap::Y_STATUS,
            regmap::Y_OUTPUT,
        ],
        1,
    );
    coverage.register_point("r.en", CoverageModel::field("read_en"), vec![0, 1], 1);
    coverage.register_cross("r", &["r.addr", "r.en"], 1)?;

    Ok(coverage)
}
