//! Domain error types.

/// Invalid simulation inputs. Always raised before the first step runs, so
/// a failed call never exposes a partially mutated portfolio.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("ema_width ({ema_width}) must be at least candlesticks_per_rule ({window})")]
    WindowExceedsEmaWidth { window: usize, ema_width: usize },

    #[error("{name} must be positive")]
    ZeroParameter { name: &'static str },

    #[error("price series has {len} values, which is not a whole number of candles")]
    FlatPriceSeries { len: usize },

    #[error("insufficient candles: have {have}, need at least {need}")]
    InsufficientCandles { have: usize, need: usize },

    #[error("invalid candle {index}: {reason}")]
    InvalidCandle { index: usize, reason: String },

    #[error("rulebook length {len} is not divisible by rule_count {rule_count}")]
    UnevenRulebook { len: usize, rule_count: usize },

    #[error("rule length {rule_length} does not match {expected} required for {window} candlesticks per rule")]
    RuleShape {
        rule_length: usize,
        expected: usize,
        window: usize,
    },

    #[error("rulebook window {rulebook} does not match candlesticks_per_rule {config}")]
    WindowMismatch { rulebook: usize, config: usize },

    #[error("rulebook of {rule_count} rules for {window} candlesticks per rule exceeds addressable size")]
    RulebookTooLarge { window: usize, rule_count: usize },

    #[error("rulebook has {rulebook} rules but rule_count is {config}")]
    RuleCountMismatch { rulebook: usize, config: usize },

    #[error("non-finite coefficient at rulebook offset {offset}")]
    InvalidCoefficient { offset: usize },

    #[error("invalid portfolio: {reason}")]
    InvalidPortfolio { reason: String },
}

/// Top-level error type for ruletrader.
#[derive(Debug, thiserror::Error)]
pub enum RuletraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&RuletraderError> for std::process::ExitCode {
    fn from(err: &RuletraderError) -> Self {
        let code: u8 = match err {
            RuletraderError::Io(_) | RuletraderError::Report { .. } => 1,
            RuletraderError::ConfigParse { .. }
            | RuletraderError::ConfigMissing { .. }
            | RuletraderError::ConfigInvalid { .. } => 2,
            RuletraderError::Data { .. } => 3,
            RuletraderError::Configuration(_) => 4,
        };
        std::process::ExitCode::from(code)
    }
}
