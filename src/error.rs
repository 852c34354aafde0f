use crate::ast::MatchOperator;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DumpError {
    #[error("match expression '{selector}' uses operator '{operator}' but carries no value")]
    MissingValue {
        selector: String,
        operator: MatchOperator,
    },

    #[error("failed to format expression: {0}")]
    Format(#[from] std::fmt::Error),

    #[error("failed to write expression dump: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {0}")]
    NotFound(String),

    #[error("无法读取配置文件 {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("无法解析JSON配置文件 {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
