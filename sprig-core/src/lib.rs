// sprig-core: IoC 容器核心
//
// 从声明式配置构建对象图并管理组件生命周期：
// - 配置加载（TOML/JSON，导入、别名、profile、嵌套单元）
// - Bean 定义注册表（别名、手动单例、冻结与元数据缓存）
// - 依赖解析（primary/order 决胜，父工厂回退）
// - 生命周期引擎（实例化 → 注入 → Aware → 后处理 → 初始化 → 销毁）
// - 应用上下文（父子层次、start/stop、关闭钩子）

pub mod app;
pub mod bean;
pub mod bean_factory;
pub mod bean_post_processor;
pub mod class;
pub mod config;
pub mod constants;
pub mod context;
pub mod definition;
pub mod error;
pub mod lifecycle;
pub mod loader;
pub mod logging;
pub mod parsing;
pub mod registry;
pub mod resolver;
pub mod resource;
pub mod scope;
pub mod singleton;
pub mod utils;

// 重新导出常用类型
pub use app::{RunningApplication, SprigApplication};
pub use bean::{downcast_object, unknown_property, Bean, Capability, Object, Value};
pub use bean_factory::{
    AutowireCapableBeanFactory, BeanFactory, BeanFactoryExt, ConfigurableBeanFactory,
    ConfigurableListableBeanFactory, DefaultListableBeanFactory, HierarchicalBeanFactory, ListableBeanFactory,
};
pub use bean_post_processor::{BeanFactoryPostProcessor, BeanPostProcessor, DestructionAwareBeanPostProcessor};
pub use class::{
    Arguments, BeanClass, BeanClassRegistration, Parameter, PropertyDescriptor, SimpleTypeConverter, TypeConverter,
    TypeKey, TypeRegistry,
};
pub use config::{
    ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource, PropertySource, TomlPropertySource,
};
pub use constants::*;
pub use context::{ApplicationContext, ApplicationContextBuilder, ContextState, ShutdownHook};
pub use definition::{AutowireMode, BeanDefinition, DependencyCheck, ValueSpec};
pub use error::{BeansError, BeansResult, Result};
pub use lifecycle::{InstanceRecord, LifecyclePhase};
pub use loader::ConfigLoader;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use parsing::{
    AliasEvent, ChannelReaderEventListener, CollectingProblemReporter, ComponentEvent, EmptyReaderEventListener,
    Entry, ImportEvent, ParseEntry, ParseState, Problem, ProblemReporter, ReaderEvent, ReaderEventListener,
    SourceLocation,
};
pub use registry::{AliasRegistry, BeanDefinitionRegistry, DefinitionRegistry, ResolvableDependency};
pub use resolver::DependencyDescriptor;
pub use resource::{FileSystemResourceLoader, InMemoryResourceLoader, Resource, ResourceLoader};
pub use scope::Scope;
pub use singleton::SingletonRegistry;

// 导出 inventory，供 `inventory::submit!` 注册组件类型
pub use inventory;

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::app::{RunningApplication, SprigApplication};
    pub use crate::bean::{downcast_object, unknown_property, Bean, Capability, Object, Value};
    pub use crate::bean_factory::{
        AutowireCapableBeanFactory, BeanFactory, BeanFactoryExt, ConfigurableBeanFactory,
        ConfigurableListableBeanFactory, DefaultListableBeanFactory, HierarchicalBeanFactory,
        ListableBeanFactory,
    };
    pub use crate::bean_post_processor::{BeanFactoryPostProcessor, BeanPostProcessor};
    pub use crate::class::{Arguments, BeanClass, Parameter, PropertyDescriptor, TypeKey};
    pub use crate::config::{Environment, MapPropertySource, PropertySource};
    pub use crate::context::ApplicationContext;
    pub use crate::definition::{BeanDefinition, ValueSpec};
    pub use crate::error::{BeansError, BeansResult};
    pub use crate::logging::{LogFormat, LogLevel, LoggingConfig};
    pub use crate::registry::{AliasRegistry, BeanDefinitionRegistry};
    pub use crate::scope::Scope;
    // Re-export anyhow for convenience
    pub use anyhow::{anyhow, Context};
}
