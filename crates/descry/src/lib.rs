//! descry mines statistically significant, non-redundant itemset patterns
//! from binary data.
//!
//! Every candidate pattern is tested against a sequentially updated
//! maximum-entropy null model: the expected frequency of the itemset under
//! everything accepted so far. Patterns that survive multiple-testing
//! control (family-wise or sequential FDR) are absorbed into the model, so
//! later discoveries must carry information beyond what is already
//! explained.
//!
//! ```no_run
//! use descry::prelude::*;
//!
//! let rows = vec![vec![0, 1, 2], vec![0, 1], vec![0, 1, 2], vec![2]];
//! let data = Dataset::from_rows(3, &rows)?;
//!
//! let model = Miner::builder()
//!     .adjustment(Adjustment::Fwer)
//!     .alpha(0.05)
//!     .min_support(2)
//!     .build()?
//!     .fit(&data)?;
//!
//! for pattern in model.patterns() {
//!     println!("{} @ {:.3}", pattern.items, pattern.frequency);
//! }
//! # Ok::<(), descry::DescryError>(())
//! ```

pub use descry_core::*;
pub use descry_engines::{
    Adjustment, Budget, DiscoveryOutcome, FwerControl, LordControl, Miner, MinerBuilder,
    StopReason, discover_patterns, fit, fit_grouped, init_logging, log_fwer_adjustment,
    support_priority,
};
pub use descry_error::{DescryError, DescryResult, ErrorCode, descry_bail, descry_err, ensure};

pub mod prelude {
    pub use super::{
        Adjustment, Dataset, DescryError, DescryResult, GroupMask, ItemSet, MaxEnt, Miner,
        Pattern,
    };
}
