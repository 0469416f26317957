//! Baseline demand model: lag features, linear fit, roll-forward forecast.

pub mod forecast;
pub mod linear;
pub mod supervised;
pub mod train;

pub use forecast::{forecast, forecast_rows};
pub use linear::{LinearModel, mean_absolute_error};
pub use supervised::{FEATURE_COLUMNS, MAX_LAG, SupervisedSet, TARGET_COLUMN, prepare_supervised};
pub use train::{ModelArtifact, split_index, train_baseline};
