pub mod aggregator;
pub mod registry;
pub mod rule;
pub mod video;

pub use registry::NormalizerRegistry;
pub use rule::NormalizationRule;
