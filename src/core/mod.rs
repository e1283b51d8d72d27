pub mod clock;
pub mod coverage;
pub mod device;
pub mod driver;
pub mod error;
pub mod monitor;
pub mod orchestrator;
pub mod regmap;
pub mod scoreboard;
pub mod signal;
pub mod stimulus;
pub mod transaction;
