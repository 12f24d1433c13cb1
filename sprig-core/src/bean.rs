use std::any::Any;
use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;

use crate::bean_factory::DefaultListableBeanFactory;
use crate::class::Arguments;
use crate::context::ApplicationContext;

/// 容器管理的对象
pub type Object = Arc<dyn Bean>;

/// 向下转型辅助，为所有 `'static` 类型自动实现
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// 组件能力
///
/// 容器只调用组件声明过的回调，未声明的能力即使实现了对应方法也不会被调用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// 接收自己的 Bean 名称
    BeanNameAware,
    /// 接收所属的 Bean 工厂
    BeanFactoryAware,
    /// 接收所属的应用上下文
    ApplicationContextAware,
    /// 属性注入完成后调用 `after_properties_set`
    InitializingBean,
    /// 销毁时调用 `destroy`
    DisposableBean,
    /// 参与上下文的 start/stop
    Lifecycle,
    /// 所有非延迟单例创建完成后回调
    SmartInitializingSingleton,
}

/// Bean trait - 所有可以被容器管理的类型都需要实现此 trait
///
/// 所有方法都有默认实现，组件只需覆盖它声明的能力对应的方法：
///
/// ```rust,ignore
/// struct Pool { size: AtomicUsize }
///
/// impl Bean for Pool {
///     fn capabilities(&self) -> &'static [Capability] {
///         &[Capability::InitializingBean]
///     }
///
///     fn set_property(&self, name: &str, value: Value) -> anyhow::Result<()> {
///         match name {
///             "size" => self.size.store(value.parse()?, Ordering::SeqCst),
///             _ => return Err(unknown_property(name)),
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Bean: AsAny {
    fn capabilities(&self) -> &'static [Capability] {
        &[]
    }

    fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// 写入属性（内部可变性）
    fn set_property(&self, name: &str, _value: Value) -> anyhow::Result<()> {
        Err(unknown_property(name))
    }

    fn set_bean_name(&self, _name: &str) {}

    fn set_bean_factory(&self, _factory: &Arc<DefaultListableBeanFactory>) {}

    fn set_application_context(&self, _context: &Arc<ApplicationContext>) {}

    fn after_properties_set(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// 按名称调用无参方法（init/destroy 方法）
    ///
    /// 返回 `None` 表示没有该方法
    fn invoke_method(&self, _name: &str) -> Option<anyhow::Result<()>> {
        None
    }

    /// 工厂方法，返回 `None` 表示没有该方法
    fn factory_method(&self, _name: &str, _args: Arguments) -> Option<anyhow::Result<Object>> {
        None
    }

    fn destroy(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn start(&self) {}

    fn stop(&self) {}

    fn is_running(&self) -> bool {
        false
    }

    fn after_singletons_instantiated(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl dyn Bean {
    pub fn is<T: Bean>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Bean>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

impl fmt::Debug for dyn Bean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bean@{:p}", self as *const dyn Bean as *const ())
    }
}

/// 将容器对象转换为具体类型
pub fn downcast_object<T: Bean>(object: &Object) -> Option<Arc<T>> {
    Arc::clone(object).into_any().downcast::<T>().ok()
}

pub fn unknown_property(name: &str) -> anyhow::Error {
    anyhow!("Invalid property '{}': not writable or no such property", name)
}

/// 注入给组件的值
#[derive(Clone)]
pub enum Value {
    Text(String),
    Object(Object),
    List(Vec<Object>),
    Absent,
}

impl Value {
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// 将文本值解析为目标类型
    pub fn parse<T>(&self) -> anyhow::Result<T>
    where
        T: std::str::FromStr,
        T::Err: fmt::Display,
    {
        let text = self
            .as_text()
            .ok_or_else(|| anyhow!("expected a text value but got {:?}", self))?;
        text.trim()
            .parse::<T>()
            .map_err(|e| anyhow!("cannot convert '{}': {}", text, e))
    }

    pub fn downcast<T: Bean>(&self) -> anyhow::Result<Arc<T>> {
        let object = self
            .as_object()
            .ok_or_else(|| anyhow!("expected an object value but got {:?}", self))?;
        downcast_object::<T>(object)
            .ok_or_else(|| anyhow!("object is not of type '{}'", std::any::type_name::<T>()))
    }

    pub fn downcast_list<T: Bean>(&self) -> anyhow::Result<Vec<Arc<T>>> {
        match self {
            Value::List(objects) => objects
                .iter()
                .map(|object| {
                    downcast_object::<T>(object).ok_or_else(|| {
                        anyhow!("list element is not of type '{}'", std::any::type_name::<T>())
                    })
                })
                .collect(),
            Value::Absent => Ok(Vec::new()),
            other => Err(anyhow!("expected a list value but got {:?}", other)),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Value::Object(object) => f.debug_tuple("Object").field(object).finish(),
            Value::List(objects) => write!(f, "List(len = {})", objects.len()),
            Value::Absent => write!(f, "Absent"),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(object)
    }
}
