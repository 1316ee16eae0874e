pub mod budget;
pub mod discover;
mod groups;
pub mod miner;
pub mod significance;

pub use budget::{Budget, StopReason};
pub use discover::{DiscoveryOutcome, discover_patterns, support_priority};
pub use miner::{Adjustment, Miner, MinerBuilder, fit, fit_grouped};
pub use significance::{FwerControl, LordControl, log_fwer_adjustment};

pub use descry_core::*;
pub use descry_error::{DescryError, DescryResult, descry_err, ensure};

pub fn init_logging() {
    use std::sync::Once;
    static INIT_LOGGING: Once = Once::new();

    INIT_LOGGING.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        std::panic::set_hook(Box::new(|info| {
            tracing::error!("PANIC: {}", info);
        }));

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .compact(),
            )
            .init();
    });
}
