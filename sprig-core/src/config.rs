use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;

use parking_lot::RwLock;

use crate::bean::Bean;
use crate::error::{BeansError, BeansResult};
use crate::utils::text::tokenize;

pub const DEFAULT_PROFILE: &str = "default";
const PLACEHOLDER_PREFIX: &str = "${";
const PLACEHOLDER_SUFFIX: char = '}';
const VALUE_SEPARATOR: char = ':';

/// 配置值类型
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<ConfigValue>),
}

impl ConfigValue {
    /// 转换为字符串
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// 转换为布尔值
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            ConfigValue::String(s) => match s.to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    /// 数组以逗号分隔输出，用于占位符替换
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::String(s) => f.write_str(s),
            ConfigValue::Int(i) => write!(f, "{}", i),
            ConfigValue::Float(v) => write!(f, "{}", v),
            ConfigValue::Bool(b) => write!(f, "{}", b),
            ConfigValue::Array(values) => {
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", value)?;
                }
                Ok(())
            }
        }
    }
}

/// 配置源 trait
pub trait PropertySource: Send + Sync {
    /// 获取配置源名称
    fn name(&self) -> &str;

    /// 获取配置值
    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// 配置源优先级（数字越大优先级越高）
    fn priority(&self) -> i32 {
        0
    }
}

/// Environment - 配置与 profile 管理
///
/// 为配置加载器提供占位符解析（`${key}`、`${key:default}`）和 profile 判断
pub struct Environment {
    /// 配置源列表（按优先级排序）
    sources: RwLock<Vec<Box<dyn PropertySource>>>,

    /// 当前激活的 profile
    active_profiles: RwLock<Vec<String>>,

    /// 没有激活任何 profile 时生效的 profile
    default_profiles: RwLock<Vec<String>>,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("active_profiles", &*self.active_profiles.read())
            .field("default_profiles", &*self.default_profiles.read())
            .field("sources_count", &self.sources.read().len())
            .finish()
    }
}

impl Bean for Environment {}

impl Environment {
    /// 创建新的环境
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(Vec::new()),
            active_profiles: RwLock::new(Vec::new()),
            default_profiles: RwLock::new(vec![DEFAULT_PROFILE.to_string()]),
        }
    }

    /// 添加配置源
    pub fn add_property_source(&self, source: Box<dyn PropertySource>) {
        let mut sources = self.sources.write();
        tracing::debug!("Adding property source '{}'", source.name());
        sources.push(source);
        // 按优先级降序排序，同优先级保持添加顺序
        sources.sort_by(|a, b| b.priority().cmp(&a.priority()));
    }

    /// 获取配置值
    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        let sources = self.sources.read();
        for source in sources.iter() {
            if let Some(value) = source.get(key) {
                tracing::trace!("Config '{}' found in source '{}'", key, source.name());
                return Some(value);
            }
        }
        None
    }

    /// 获取配置值的文本形式
    pub fn get_property(&self, key: &str) -> Option<String> {
        self.get(key).map(|value| value.to_string())
    }

    /// 获取字符串配置（带默认值）
    pub fn get_property_or(&self, key: &str, default: &str) -> String {
        self.get_property(key).unwrap_or_else(|| default.to_string())
    }

    pub fn contains_property(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// 解析占位符，无法解析的占位符原样保留
    pub fn resolve_placeholders(&self, text: &str) -> String {
        let mut visiting = HashSet::new();
        // 非严格模式只会在循环引用时失败，此时返回原文
        self.parse_string_value(text, false, &mut visiting)
            .unwrap_or_else(|_| text.to_string())
    }

    /// 解析占位符，任何无法解析的占位符都是错误
    pub fn resolve_required_placeholders(&self, text: &str) -> BeansResult<String> {
        let mut visiting = HashSet::new();
        self.parse_string_value(text, true, &mut visiting)
    }

    fn parse_string_value(
        &self,
        value: &str,
        required: bool,
        visiting: &mut HashSet<String>,
    ) -> BeansResult<String> {
        let mut result = String::with_capacity(value.len());
        let mut rest = value;

        while let Some(start) = rest.find(PLACEHOLDER_PREFIX) {
            result.push_str(&rest[..start]);
            let after_prefix = &rest[start + PLACEHOLDER_PREFIX.len()..];
            let Some(end) = find_placeholder_end(after_prefix) else {
                // 没有闭合的占位符，按普通文本处理
                result.push_str(&rest[start..]);
                return Ok(result);
            };

            let raw_placeholder = &after_prefix[..end];
            // 占位符本身可以包含占位符
            let placeholder = self.parse_string_value(raw_placeholder, required, visiting)?;
            if !visiting.insert(placeholder.clone()) {
                return Err(BeansError::IllegalState(format!(
                    "Circular placeholder reference '{}' in property definitions",
                    placeholder
                )));
            }

            let (key, default_value) = match placeholder.split_once(VALUE_SEPARATOR) {
                Some((key, default_value)) => (key, Some(default_value)),
                None => (placeholder.as_str(), None),
            };

            let resolved = match self.get_property(key) {
                Some(found) => Some(self.parse_string_value(&found, required, visiting)?),
                None => match default_value {
                    Some(default_value) => Some(self.parse_string_value(default_value, required, visiting)?),
                    None => None,
                },
            };

            match resolved {
                Some(text) => result.push_str(&text),
                None if required => {
                    return Err(BeansError::IllegalState(format!(
                        "Could not resolve placeholder '{}' in value \"{}\"",
                        placeholder, value
                    )));
                }
                None => {
                    result.push_str(PLACEHOLDER_PREFIX);
                    result.push_str(&placeholder);
                    result.push(PLACEHOLDER_SUFFIX);
                }
            }

            visiting.remove(&placeholder);
            rest = &after_prefix[end + 1..];
        }

        result.push_str(rest);
        Ok(result)
    }

    /// 设置激活的 profile
    pub fn set_active_profiles<I, S>(&self, profiles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let profiles: Vec<String> = profiles
            .into_iter()
            .map(Into::into)
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        tracing::debug!("Activating profiles {:?}", profiles);
        *self.active_profiles.write() = profiles;
    }

    pub fn add_active_profile(&self, profile: impl Into<String>) {
        let profile = profile.into();
        let mut active = self.active_profiles.write();
        if !active.contains(&profile) {
            active.push(profile);
        }
    }

    /// 获取激活的 profile
    pub fn get_active_profiles(&self) -> Vec<String> {
        self.active_profiles.read().clone()
    }

    pub fn set_default_profiles<I, S>(&self, profiles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.default_profiles.write() = profiles.into_iter().map(Into::into).collect();
    }

    pub fn get_default_profiles(&self) -> Vec<String> {
        self.default_profiles.read().clone()
    }

    /// 没有激活的 profile 时，默认 profile 视为激活
    pub fn is_profile_active(&self, profile: &str) -> bool {
        let active = self.active_profiles.read();
        if active.is_empty() {
            self.default_profiles.read().iter().any(|p| p == profile)
        } else {
            active.iter().any(|p| p == profile)
        }
    }

    /// 任一 profile 匹配即接受；`!name` 表示该 profile 未激活
    pub fn accepts_profiles<S: AsRef<str>>(&self, profiles: &[S]) -> bool {
        profiles
            .iter()
            .map(|p| p.as_ref().trim())
            .filter(|p| !p.is_empty())
            .any(|profile| match profile.strip_prefix('!') {
                Some(negated) => !self.is_profile_active(negated.trim()),
                None => self.is_profile_active(profile),
            })
    }

    /// 解析以逗号/分号/空白分隔的 profile 表达式
    pub fn accepts_profile_expression(&self, expression: &str) -> bool {
        self.accepts_profiles(&tokenize(expression, ",; "))
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

/// 在 `${` 之后查找匹配的 `}`，支持嵌套
fn find_placeholder_end(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut index = 0;
    while index < bytes.len() {
        match bytes[index] {
            b'$' if bytes.get(index + 1) == Some(&b'{') => {
                depth += 1;
                index += 2;
                continue;
            }
            b'}' => {
                if depth == 0 {
                    return Some(index);
                }
                depth -= 1;
            }
            _ => {}
        }
        index += 1;
    }
    None
}

// ========== Property Sources ==========

/// 环境变量配置源
pub struct EnvironmentPropertySource {
    prefix: String,
    priority: i32,
}

impl EnvironmentPropertySource {
    /// 创建环境变量配置源
    ///
    /// # 参数
    /// * `prefix` - 环境变量前缀，例如 "APP_"
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            priority: 100, // 环境变量优先级较高
        }
    }

    /// 将配置键转换为环境变量名
    /// 例如: database.url -> APP_DATABASE_URL
    fn key_to_env(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.replace(['.', '-'], "_").to_uppercase())
    }
}

impl PropertySource for EnvironmentPropertySource {
    fn name(&self) -> &str {
        "environment"
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        std::env::var(self.key_to_env(key)).ok().map(ConfigValue::String)
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// TOML 文件配置源，嵌套表展平为点分隔的键
pub struct TomlPropertySource {
    name: String,
    properties: HashMap<String, ConfigValue>,
    priority: i32,
}

impl TomlPropertySource {
    /// 从文件加载 TOML 配置
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {:?}: {}", path, e))?;
        Self::parse(&content, path.to_string_lossy().into_owned())
    }

    /// 从字符串解析 TOML 配置
    pub fn parse(content: &str, name: impl Into<String>) -> anyhow::Result<Self> {
        let value: toml::Value = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;

        let mut properties = HashMap::new();
        flatten_toml(&value, String::new(), &mut properties);

        Ok(Self {
            name: name.into(),
            properties,
            priority: 0, // 文件配置优先级最低
        })
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// 例如: { database: { url: "xxx" } } -> { "database.url": "xxx" }
fn flatten_toml(value: &toml::Value, prefix: String, result: &mut HashMap<String, ConfigValue>) {
    match value {
        toml::Value::Table(table) => {
            for (key, val) in table {
                let new_prefix = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_toml(val, new_prefix, result);
            }
        }
        other => {
            result.insert(prefix, toml_value_to_config(other));
        }
    }
}

fn toml_value_to_config(value: &toml::Value) -> ConfigValue {
    match value {
        toml::Value::String(s) => ConfigValue::String(s.clone()),
        toml::Value::Integer(i) => ConfigValue::Int(*i),
        toml::Value::Float(f) => ConfigValue::Float(*f),
        toml::Value::Boolean(b) => ConfigValue::Bool(*b),
        toml::Value::Array(arr) => ConfigValue::Array(arr.iter().map(toml_value_to_config).collect()),
        toml::Value::Datetime(dt) => ConfigValue::String(dt.to_string()),
        // 数组中的表无法用点分隔键表示，保留其文本形式
        toml::Value::Table(table) => ConfigValue::String(toml::Value::Table(table.clone()).to_string()),
    }
}

impl PropertySource for TomlPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.properties.get(key).cloned()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// 内存配置源（用于测试或运行时配置）
pub struct MapPropertySource {
    name: String,
    properties: HashMap<String, ConfigValue>,
    priority: i32,
}

impl MapPropertySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: HashMap::new(),
            priority: 50,
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), ConfigValue::String(value.into()));
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: ConfigValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl PropertySource for MapPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.properties.get(key).cloned()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}
