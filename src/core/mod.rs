mod engine;
mod optimizer;
mod solver;
mod types;

pub use engine::run_simulation;
pub use optimizer::generate_optimization_strategies;
pub use solver::{solve_emi, solve_interest_rate, solve_tenure};
pub use types::{
    AmortizationPoint, ChartPoint, OptimizationStrategy, RiskLevel, SimulationError,
    SimulationInput, SimulationOutput, SimulationSummary, SolveError, StrategyInputs,
};
