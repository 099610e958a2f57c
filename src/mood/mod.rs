pub mod stats;
pub mod store;

pub use stats::{MoodDistribution, MoodStats, TrendPoint};
pub use store::MoodStore;
