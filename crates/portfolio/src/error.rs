use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortfolioError {
    #[error("Not enough data to perform aggregation: {0}")]
    NotEnoughData(String),

    #[error("Calculation error: Division by zero encountered in metric '{0}'")]
    DivisionByZero(String),

    #[error("An unexpected error occurred during portfolio aggregation: {0}")]
    InternalError(String),
}
