//! Layout computation: packings, grids, the cross and bar charts.

pub mod barplot;
pub mod cluster;
pub mod cross;
pub mod enclose;
pub mod engine;
pub mod pack;
pub mod session;
pub mod types;

pub use barplot::{Metric, project_bars, square_badges};
pub use cluster::{ClusterGrouper, group_and_pack};
pub use cross::{CrossPacker, CrossShape, pack_in_cross};
pub use engine::{LayoutEngine, LayoutMode};
pub use pack::{CirclePacker, GroupedPacking, pack_circles, pack_groups};
pub use session::LayoutSession;
pub use types::*;
