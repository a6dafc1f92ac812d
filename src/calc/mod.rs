pub mod board;
pub mod grouper;
pub mod metrics;
pub mod week_window;

pub use board::{CellTarget, PlanBoard};
pub use grouper::{DataWarning, StyleGroup, WeekData};
pub use metrics::{METRIC_COUNT, Metric, MetricValue};
pub use week_window::WeekWindow;
