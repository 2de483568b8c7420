pub mod reproducibility;

pub use reproducibility::FitLog;
