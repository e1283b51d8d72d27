use super::error::TbError;
use log::debug;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Raw values handed to `CoverageModel::sample`, keyed by field name.
pub type SampleValues = HashMap<String, u64>;

/// Extracts one dimension from a raw sample; None when the dimension is
/// absent from the sample.
pub type Extractor = Box<dyn Fn(&SampleValues) -> Option<u64>>;

struct CoverPoint {
    name: String,
    extractor: Extractor,
    bins: Vec<u64>,
    hits: HashMap<u64, u64>,
    at_least: u64,
}

struct CoverCross {
    name: String,
    points: Vec<usize>,
    cells: HashMap<Vec<u64>, u64>,
    at_least: u64,
}

/// Functional coverage model: single-dimension cover points and crosses over
/// their Cartesian products.
///
/// An explicit instance with no process-wide registry; it lives for one test
/// run and is shared by reference with every sampler. A sampled value
/// outside a point's declared bin set is a silent no-op for that point and
/// suppresses any cross containing the point for that sample: it counts
/// toward "uncovered" and never perturbs existing counters.
#[derive(Default)]
pub struct CoverageModel {
    points: Vec<CoverPoint>,
    crosses: Vec<CoverCross>,
}

impl CoverageModel {
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            crosses: Vec::new(),
        }
    }

    /// Convenience extractor that picks a named field from the raw sample.
    pub fn field(name: &str) -> Extractor {
        let key = name.to_string();
        Box::new(move |values| values.get(&key).copied())
    }

    /// Register a cover point over an ordered finite bin set.
    pub fn register_point(&mut self, name: &str, extractor: Extractor, bins: Vec<u64>, at_least: u64) {
        self.points.push(CoverPoint {
            name: name.to_string(),
            extractor,
            bins,
            hits: HashMap::new(),
            at_least,
        });
    }

    /// Register a cross over at least two previously registered points.
    pub fn register_cross(
        &mut self,
        name: &str,
        point_names: &[&str],
        at_least: u64,
    ) -> Result<(), TbError> {
        if point_names.len() < 2 {
            return Err(TbError::Config(format!(
                "cross '{}' needs at least two points",
                name
            )));
        }
        let mut points = Vec::with_capacity(point_names.len());
        for point_name in point_names {
            let index = self
                .points
                .iter()
                .position(|p| p.name == *point_name)
                .ok_or_else(|| TbError::UnknownCoverPoint(point_name.to_string()))?;
            points.push(index);
        }
        self.crosses.push(CoverCross {
            name: name.to_string(),
            points,
            cells: HashMap::new(),
            at_least,
        });
        Ok(())
    }

    /// Apply every extractor to the raw values and increment matching bins
    /// and cross cells.
    pub fn sample(&mut self, raw: &SampleValues) {
        let mut current: Vec<Option<u64>> = Vec::with_capacity(self.points.len());
        for point in &mut self.points {
            let value = (point.extractor)(raw).filter(|v| point.bins.contains(v));
            if let Some(v) = value {
                *point.hits.entry(v).or_insert(0) += 1;
            }
            current.push(value);
        }
        for cross in &mut self.crosses {
            let mut key = Vec::with_capacity(cross.points.len());
            for &index in &cross.points {
                match current[index] {
                    Some(v) => key.push(v),
                    None => {
                        key.clear();
                        break;
                    }
                }
            }
            if key.len() == cross.points.len() {
                *cross.cells.entry(key).or_insert(0) += 1;
            }
        }
    }

    /// Coverage percentage of a registered point.
    pub fn point_percent(&self, name: &str) -> Option<f64> {
        self.points
            .iter()
            .find(|p| p.name == name)
            .map(point_percent)
    }

    /// Coverage percentage of a registered cross.
    pub fn percent(&self, name: &str) -> Option<f64> {
        self.crosses
            .iter()
            .find(|x| x.name == name)
            .map(|x| self.cross_percent(x))
    }

    /// True when every registered cross meets the target percentage.
    /// Vacuously true with no crosses.
    pub fn closed(&self, target: f64) -> bool {
        self.crosses.iter().all(|x| self.cross_percent(x) >= target)
    }

    /// Mean coverage across all crosses; 100 when none are registered.
    pub fn overall_percent(&self) -> f64 {
        if self.crosses.is_empty() {
            return 100.0;
        }
        let sum: f64 = self.crosses.iter().map(|x| self.cross_percent(x)).sum();
        sum / self.crosses.len() as f64
    }

    fn cross_percent(&self, cross: &CoverCross) -> f64 {
        let total: usize = cross
            .points
            .iter()
            .map(|&index| self.points[index].bins.len())
            .product();
        if total == 0 {
            return 0.0;
        }
        let covered = cross
            .cells
            .values()
            .filter(|&&hits| hits >= cross.at_least)
            .count();
        100.0 * covered as f64 / total as f64
    }

    /// Build the structured summary consumed by the external exporter.
    pub fn report(&self) -> CoverageReport {
        let points = self
            .points
            .iter()
            .map(|point| PointReport {
                name: point.name.clone(),
                at_least: point.at_least,
                bins: point
                    .bins
                    .iter()
                    .map(|&value| BinReport {
                        value,
                        hits: point.hits.get(&value).copied().unwrap_or(0),
                    })
                    .collect(),
                percent: point_percent(point),
            })
            .collect();

        let crosses = self
            .crosses
            .iter()
            .map(|cross| {
                let bin_sets: Vec<&[u64]> = cross
                    .points
                    .iter()
                    .map(|&index| self.points[index].bins.as_slice())
                    .collect();
                let cells: Vec<CellReport> = cartesian(&bin_sets)
                    .into_iter()
                    .map(|values| {
                        let hits = cross.cells.get(&values).copied().unwrap_or(0);
                        CellReport { values, hits }
                    })
                    .collect();
                let covered = cells.iter().filter(|c| c.hits >= cross.at_least).count();
                CrossReport {
                    name: cross.name.clone(),
                    points: cross
                        .points
                        .iter()
                        .map(|&index| self.points[index].name.clone())
                        .collect(),
                    total_cells: cells.len(),
                    covered_cells: covered,
                    percent: self.cross_percent(cross),
                    cells,
                }
            })
            .collect();

        debug!("coverage report built: overall {:.2}%", self.overall_percent());
        CoverageReport {
            points,
            crosses,
            overall_percent: self.overall_percent(),
        }
    }
}

fn point_percent(point: &CoverPoint) -> f64 {
    if point.bins.is_empty() {
        return 0.0;
    }
    let covered = point
        .bins
        .iter()
        .filter(|value| point.hits.get(value).copied().unwrap_or(0) >= point.at_least)
        .count();
    100.0 * covered as f64 / point.bins.len() as f64
}

/// Cartesian product of the bin sets, in declaration order.
fn cartesian(bin_sets: &[&[u64]]) -> Vec<Vec<u64>> {
    let mut rows: Vec<Vec<u64>> = vec![Vec::new()];
    for bins in bin_sets {
        let mut next = Vec::with_capacity(rows.len() * bins.len());
        for row in &rows {
            for &value in *bins {
                let mut extended = row.clone();
                extended.push(value);
                next.push(extended);
            }
        }
        rows = next;
    }
    rows
}

/// Hit count of a single bin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BinReport {
    pub value: u64,
    pub hits: u64,
}

/// Summary of one cover point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointReport {
    pub name: String,
    pub at_least: u64,
    pub bins: Vec<BinReport>,
    pub percent: f64,
}

/// Hit count of one cross cell, keyed by the member point values in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellReport {
    pub values: Vec<u64>,
    pub hits: u64,
}

/// Summary of one cross.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossReport {
    pub name: String,
    pub points: Vec<String>,
    pub total_cells: usize,
    pub covered_cells: usize,
    pub percent: f64,
    pub cells: Vec<CellReport>,
}

/// Structured coverage summary, deterministically ordered by registration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    pub points: Vec<PointReport>,
    pub crosses: Vec<CrossReport>,
    pub overall_percent: f64,
}

impl fmt::Display for CoverageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Coverage Report ===")?;
        for point in &self.points {
            writeln!(f, "point {:<12} {:>6.2}%", point.name, point.percent)?;
        }
        for cross in &self.crosses {
            writeln!(
                f,
                "cross {:<12} {:>6.2}%  ({}/{} cells)",
                cross.name, cross.percent, cross.covered_cells, cross.total_cells
            )?;
        }
        writeln!(f, "overall {:>18.2}%", self.overall_percent)
    }
}
