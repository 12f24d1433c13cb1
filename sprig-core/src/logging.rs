//! 日志初始化
//!
//! 容器内部只使用 `tracing` 宏输出日志，订阅者由应用在启动时安装一次。

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(name)
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 紧凑格式（默认）
    #[default]
    Compact,
    /// 完整格式（带时间、级别、目标）
    Full,
    /// JSON 格式
    Json,
    /// 美化格式（适合开发）
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "full" => Ok(LogFormat::Full),
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogFormat::Compact => "compact",
            LogFormat::Full => "full",
            LogFormat::Json => "json",
            LogFormat::Pretty => "pretty",
        };
        f.write_str(name)
    }
}

/// 日志配置
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// 没有自定义过滤器时使用的级别
    pub level: LogLevel,

    pub format: LogFormat,

    /// 是否显示目标（模块路径）
    pub show_target: bool,

    pub show_thread_ids: bool,

    pub show_thread_names: bool,

    /// 自定义过滤器，例如 `"sprig_core=debug,hyper=warn"`
    pub filter: Option<String>,
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn show_target(mut self, show: bool) -> Self {
        self.show_target = show;
        self
    }

    pub fn show_thread_ids(mut self, show: bool) -> Self {
        self.show_thread_ids = show;
        self
    }

    pub fn show_thread_names(mut self, show: bool) -> Self {
        self.show_thread_names = show;
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// 从环境变量读取配置：`RUST_LOG`、`LOG_LEVEL`、`LOG_FORMAT`
    ///
    /// 无法解析的值被忽略
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(filter) = lookup("RUST_LOG").filter(|f| !f.trim().is_empty()) {
            config.filter = Some(filter);
        }
        if let Some(level) = lookup("LOG_LEVEL").and_then(|l| l.parse().ok()) {
            config.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT").and_then(|f| f.parse().ok()) {
            config.format = format;
        }
        config
    }

    /// 自定义过滤器无效时退回到配置的级别
    pub fn env_filter(&self) -> EnvFilter {
        self.filter
            .as_deref()
            .and_then(|filter| EnvFilter::try_new(filter).ok())
            .unwrap_or_else(|| EnvFilter::new(self.level.to_string()))
    }

    /// 安装全局订阅者，已经安装过时返回错误
    pub fn init(self) -> anyhow::Result<()> {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(self.env_filter())
            .with_target(self.show_target)
            .with_thread_ids(self.show_thread_ids)
            .with_thread_names(self.show_thread_names);

        let result = match self.format {
            LogFormat::Compact => builder.compact().try_init(),
            LogFormat::Full => builder.try_init(),
            LogFormat::Json => builder.json().try_init(),
            LogFormat::Pretty => builder.pretty().try_init(),
        };
        result.map_err(|e| anyhow!("Failed to initialize logging: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!("info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::Pretty.to_string(), "pretty");
    }

    #[test]
    fn test_from_lookup_ignores_invalid_values() {
        let vars: HashMap<&str, &str> =
            HashMap::from([("RUST_LOG", "sprig_core=trace"), ("LOG_LEVEL", "loud"), ("LOG_FORMAT", "json")]);
        let config = LoggingConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.filter.as_deref(), Some("sprig_core=trace"));
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_logging_config_builder() {
        let config = LoggingConfig::new()
            .level(LogLevel::Debug)
            .format(LogFormat::Full)
            .show_target(true)
            .filter("sprig_core=debug");

        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Full);
        assert!(config.show_target);
        assert_eq!(config.filter.as_deref(), Some("sprig_core=debug"));
    }
}
