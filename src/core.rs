pub mod economy;
pub mod merge;
pub mod plan;
pub mod planner;
pub mod schedule;
pub mod slot;
pub mod window;
