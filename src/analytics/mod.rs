pub mod accuracy;
pub mod catalog;
pub mod comparison;
pub mod conference;
pub mod contenders;
pub mod error;
pub mod normalizer;
pub mod outcome;
pub mod pipeline;

pub use contenders::ConferenceFilter;
pub use pipeline::{
    build_historical_report, HistoricalReport, Pipeline, PipelineSettings, SeasonBundle,
    SeasonFailure, SeasonInput, SeasonReport,
};
