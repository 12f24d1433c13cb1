//! 容器错误类型
//!
//! 容器内部统一使用 [`BeansError`]，用户回调（构造器、属性写入、初始化/销毁方法、
//! 后处理器）返回 `anyhow::Result`，在进入容器时被包装为 [`BeansError::Creation`]。
//! 应用层（`SprigApplication`）使用 `anyhow::Result`，通过 `.context()` 添加上下文。

use thiserror::Error;

use crate::class::TypeKey;
use crate::parsing::Problem;

/// 可跨线程传递的错误源
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 容器操作结果
pub type BeansResult<T> = std::result::Result<T, BeansError>;

pub use anyhow::Result;

#[derive(Debug, Error)]
pub enum BeansError {
    /// 配置单元中的条目格式错误，带有解析位置
    #[error("{0}")]
    ConfigurationParse(Problem),

    /// 导入目标无法读取或解析
    #[error("Failed to import bean definitions from location [{location}]: {reason}")]
    ImportResolution { location: String, reason: String },

    #[error("{message}")]
    NoSuchBeanDefinition {
        name: Option<String>,
        required_type: Option<TypeKey>,
        message: String,
    },

    #[error(
        "No qualifying bean of type '{required_type}' available: expected single matching bean but found {}: {}",
        .candidates.len(),
        .candidates.join(",")
    )]
    NoUniqueBeanDefinition {
        required_type: TypeKey,
        candidates: Vec<String>,
    },

    #[error(
        "Error creating bean with name '{bean}': Requested bean is currently in creation: Is there an unresolvable circular reference? [{}]",
        .chain.join(" -> ")
    )]
    CircularReference { bean: String, chain: Vec<String> },

    #[error("Error creating bean with name '{bean}': {message}")]
    Creation {
        bean: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Cannot {operation}: bean definition configuration has been frozen")]
    ConfigurationFrozen { operation: String },

    #[error("Invalid bean definition: {0}")]
    BeanDefinitionStore(String),

    #[error("Bean named '{name}' is expected to be of type '{expected}' but was actually of a different type")]
    TypeMismatch { name: String, expected: String },

    #[error("{0}")]
    IllegalState(String),
}

impl BeansError {
    pub fn no_such_bean(name: impl Into<String>) -> Self {
        let name = name.into();
        BeansError::NoSuchBeanDefinition {
            message: format!("No bean named '{}' available", name),
            name: Some(name),
            required_type: None,
        }
    }

    pub fn no_bean_of_type(required_type: TypeKey, detail: impl AsRef<str>) -> Self {
        BeansError::NoSuchBeanDefinition {
            message: format!(
                "No qualifying bean of type '{}' available: {}",
                required_type,
                detail.as_ref()
            ),
            name: None,
            required_type: Some(required_type),
        }
    }

    pub fn creation(bean: impl Into<String>, message: impl Into<String>) -> Self {
        BeansError::Creation {
            bean: bean.into(),
            message: message.into(),
            source: None,
        }
    }

    /// 用户回调失败，保留原始错误作为 source
    pub fn creation_caused_by(
        bean: impl Into<String>,
        message: impl Into<String>,
        cause: anyhow::Error,
    ) -> Self {
        BeansError::Creation {
            bean: bean.into(),
            message: format!("{}: {:#}", message.into(), cause),
            source: Some(cause.into()),
        }
    }

    /// 将依赖解析中的错误包装为当前 Bean 的创建错误
    ///
    /// 循环依赖错误原样传递
    pub fn wrap_creation(self, bean: &str, message: impl Into<String>) -> Self {
        match self {
            BeansError::CircularReference { .. } => self,
            other => {
                let message = message.into();
                BeansError::Creation {
                    bean: bean.to_string(),
                    message: format!("{}: {}", message, other),
                    source: Some(Box::new(other)),
                }
            }
        }
    }

    pub fn is_circular_reference(&self) -> bool {
        matches!(self, BeansError::CircularReference { .. })
    }

    pub fn is_no_such_bean(&self) -> bool {
        matches!(self, BeansError::NoSuchBeanDefinition { .. })
    }

    /// 沿 source 链查找根因是否为循环依赖
    pub fn caused_by_circular_reference(&self) -> bool {
        if self.is_circular_reference() {
            return true;
        }
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            if let Some(beans_error) = err.downcast_ref::<BeansError>() {
                if beans_error.is_circular_reference() {
                    return true;
                }
            }
            source = err.source();
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circular_reference_passes_through_wrapping() {
        let err = BeansError::CircularReference {
            bean: "a".into(),
            chain: vec!["a".into(), "b".into(), "a".into()],
        };
        let wrapped = err.wrap_creation("b", "Unsatisfied dependency");
        assert!(wrapped.is_circular_reference());
        assert!(wrapped.to_string().contains("a -> b -> a"));
    }

    #[test]
    fn test_creation_keeps_source() {
        let wrapped = BeansError::no_such_bean("missing").wrap_creation("service", "Cannot resolve reference");
        assert!(matches!(wrapped, BeansError::Creation { .. }));
        let source = std::error::Error::source(&wrapped).unwrap();
        assert!(source.to_string().contains("missing"));
    }

    #[test]
    fn test_no_unique_lists_candidates() {
        let err = BeansError::NoUniqueBeanDefinition {
            required_type: TypeKey::new("Repository"),
            candidates: vec!["a".into(), "b".into(), "c".into()],
        };
        let message = err.to_string();
        assert!(message.contains("found 3: a,b,c"));
    }

    #[test]
    fn test_caused_by_circular_reference_walks_chain() {
        let inner = BeansError::CircularReference {
            bean: "x".into(),
            chain: vec!["x".into()],
        };
        let outer = BeansError::Creation {
            bean: "y".into(),
            message: "failed".into(),
            source: Some(Box::new(inner)),
        };
        assert!(outer.caused_by_circular_reference());
        assert!(!BeansError::no_such_bean("z").caused_by_circular_reference());
    }
}
