pub mod aggregator;
pub mod chart;
pub mod loading;
pub mod normalizer;
pub mod refresh;
pub mod trend;
