// Router module - quoting, optimization, and execution planes
// The quote engine evaluates return curves, the optimizer splits the
// amount, the executor settles the split, and the transitional router
// chains the pipeline across hops
//
// Numan Thabit 2026 Aug

pub mod execution;
pub mod optimizer;
pub mod quotes;
pub mod transitional;
pub mod validation;

#[allow(clippy::module_inception)]
pub mod router;

pub use execution::{ExecutionStats, Executor, SwapOutcome};
pub use optimizer::{find_best_distribution, find_best_distribution_with_gas, OptimizeResult};
pub use quotes::{QuoteEngine, ReturnCurve};
pub use router::{create_api_router, Aggregator};
pub use transitional::{HopPhase, TransitionalQuote, TransitionalRouter};
