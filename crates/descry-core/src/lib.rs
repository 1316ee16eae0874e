pub mod binomial;
pub mod dataset;
mod executor;
pub mod items;
pub mod lattice;
pub mod maxent;
pub mod rowset;

pub use binomial::{LOG_ZERO, log_binomial_tail};
pub use dataset::{Dataset, GroupMask};
pub use executor::{Executor, ScoreJob};
pub use items::{Item, ItemSet};
pub use lattice::{Candidate, Lattice};
pub use maxent::scratch::{InferScratch, ScratchPool, WorkerScratch};
pub use maxent::{MAX_FACTOR_SIZE, MAX_FACTOR_WIDTH, MaxEnt, Pattern};
