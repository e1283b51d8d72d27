use super::error::TbError;
use super::regmap;
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;

/// One legal assignment of every declared field.
pub type StimulusSample = HashMap<String, u64>;

/// Boolean constraint over a candidate sample.
pub type ConstraintFn = Box<dyn Fn(&StimulusSample) -> bool>;

/// Constrained-random stimulus generator.
///
/// Fields have small discrete domains, so the full feasible set is computed
/// once at `solve` time by exhaustive Cartesian enumeration (tens of
/// combinations at most). This solve-once/sample-many strategy would not
/// survive a large register map, where incremental or backtracking
/// generation becomes necessary.
///
/// `next_sample` draws uniformly at random without replacement within a
/// pass and reshuffles when the pass is exhausted, so every feasible
/// combination is reproduced at least once per pass.
pub struct StimulusGenerator {
    fields: Vec<(String, Vec<u64>)>,
    constraints: Vec<(String, ConstraintFn)>,
    solutions: Vec<StimulusSample>,
    pass: Vec<StimulusSample>,
    rng: StdRng,
}

impl StimulusGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            fields: Vec::new(),
            constraints: Vec::new(),
            solutions: Vec::new(),
            pass: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// The canonical stimulus space of the register interface: one-hot
    /// write/read enables gated by their ready fields, write addresses over
    /// the data registers, read addresses over the readable registers.
    pub fn register_interface(seed: u64) -> Self {
        let mut generator = Self::new(seed);
        generator.add_field("write_en", vec![0, 1]);
        generator.add_field("read_en", vec![0, 1]);
        generator.add_field("write_address", vec![regmap::A_DATA, regmap::B_DATA]);
        generator.add_field(
            "read_address",
            vec![
                regmap::A_STATUS,
                regmap::B_STATUS,
                regmap::Y_STATUS,
                regmap::Y_OUTPUT,
            ],
        );
        generator.add_field("write_data", vec![0, 1]);
        generator.add_field("write_rdy", vec![1]);
        generator.add_field("read_rdy", vec![1]);
        generator.add_constraint("read_gating", |s| {
            let read_en = field(s, "read_en");
            if field(s, "write_en") == 0 && field(s, "read_rdy") == 1 {
                read_en == 1
            } else {
                read_en == 0
            }
        });
        generator.add_constraint("write_gating", |s| {
            let write_en = field(s, "write_en");
            if field(s, "read_en") == 0 && field(s, "write_rdy") == 1 {
                write_en == 1
            } else {
                write_en == 0
            }
        });
        generator
    }

    /// Declare a field with its finite domain.
    pub fn add_field(&mut self, name: &str, domain: Vec<u64>) {
        self.fields.push((name.to_string(), domain));
    }

    /// Declare a named boolean constraint over the declared fields.
    pub fn add_constraint<F>(&mut self, name: &str, constraint: F)
    where
        F: Fn(&StimulusSample) -> bool + 'static,
    {
        self.constraints
            .push((name.to_string(), Box::new(constraint)));
    }

    /// Enumerate the feasible set. Fails when no assignment satisfies every
    /// constraint.
    pub fn solve(&mut self) -> Result<(), TbError> {
        let mut candidates: Vec<StimulusSample> = vec![StimulusSample::new()];
        for (name, domain) in &self.fields {
            let mut extended = Vec::with_capacity(candidates.len() * domain.len());
            for partial in &candidates {
                for &value in domain {
                    let mut sample = partial.clone();
                    sample.insert(name.clone(), value);
                    extended.push(sample);
                }
            }
            candidates = extended;
        }
        candidates.retain(|sample| self.constraints.iter().all(|(_, check)| check(sample)));
        if candidates.is_empty() {
            return Err(TbError::ConstraintUnsatisfiable);
        }
        debug!(
            "[Stimulus] solved: {} feasible of {} fields, {} constraints",
            candidates.len(),
            self.fields.len(),
            self.constraints.len()
        );
        self.solutions = candidates;
        self.pass.clear();
        Ok(())
    }

    /// Number of feasible solutions; 0 before `solve`.
    pub fn solution_count(&self) -> usize {
        self.solutions.len()
    }

    /// Draw the next sample, solving lazily on first use.
    pub fn next_sample(&mut self) -> Result<StimulusSample, TbError> {
        if self.solutions.is_empty() {
            self.solve()?;
        }
        if self.pass.is_empty() {
            self.pass = self.solutions.clone();
            self.pass.shuffle(&mut self.rng);
        }
        self.pass.pop().ok_or(TbError::ConstraintUnsatisfiable)
    }
}

/// Field accessor for constraint bodies; absent fields read 0.
pub fn field(sample: &StimulusSample, name: &str) -> u64 {
    sample.get(name).copied().unwrap_or(0)
}
