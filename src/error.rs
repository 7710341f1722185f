use thiserror::Error;

/// Fatal and load-time error classes for the forecasting pipeline.
///
/// Warning-class conditions (banned pollsters, stale ratings, mismatched
/// candidate names) are logged and never surface here.
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("invalid configuration in {source_name}: {message}")]
    ConfigInvalid {
        source_name: String,
        message: String,
    },

    #[error("no polls, rating, assumed margin, presumed winner, or incumbent for {race}")]
    MissingData { race: String },

    #[error("metamargin search exceeded ±{limit} bias; the model is broken")]
    NumericOutOfRange { limit: f64 },

    #[error("saved history election day {saved} does not match campaign election day {campaign}")]
    InconsistentHistory {
        saved: chrono::NaiveDate,
        campaign: chrono::NaiveDate,
    },
}

impl ForecastError {
    pub fn config(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}
