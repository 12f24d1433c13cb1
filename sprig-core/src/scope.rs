use std::fmt;
use std::str::FromStr;

/// Bean 的作用域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// 单例模式 - 容器中只有一个实例
    #[default]
    Singleton,

    /// 原型模式 - 每次请求都创建新实例
    Prototype,
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "singleton" => Ok(Scope::Singleton),
            "prototype" => Ok(Scope::Prototype),
            other => Err(format!("Unknown scope '{}'", other)),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Singleton => write!(f, "singleton"),
            Scope::Prototype => write!(f, "prototype"),
        }
    }
}
