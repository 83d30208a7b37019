//! The built-in analyzer set

pub mod karma;
pub mod repeat;
pub mod talker;
pub mod turn;

use std::sync::Arc;

use crate::dispatch::analyzer::Analyzer;

/// The analyzers every deployment runs, in no significant order.
pub fn built_in_analyzers() -> Vec<Arc<dyn Analyzer>> {
    vec![
        Arc::new(karma::KarmaAnalyzer),
        Arc::new(talker::TalkerAnalyzer::new()),
        Arc::new(turn::TurnAnalyzer),
        Arc::new(repeat::RepeatAnalyzer),
    ]
}
