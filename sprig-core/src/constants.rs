/// 核心组件常量定义
///
/// 容器自身的组件名称、类型标识，以及生成名称时使用的分隔符，
/// 确保加载器、工厂和上下文使用相同的标识符
use crate::class::TypeKey;

/// Environment 以手动单例注册时使用的名称
pub const ENVIRONMENT_BEAN_NAME: &str = "environment";

/// 可按类型注入的容器组件
pub const BEAN_FACTORY_TYPE: TypeKey = TypeKey::from_static("BeanFactory");
pub const APPLICATION_CONTEXT_TYPE: TypeKey = TypeKey::from_static("ApplicationContext");
pub const ENVIRONMENT_TYPE: TypeKey = TypeKey::from_static("Environment");

/// 回调接口，由这些接口声明的属性不参与自动装配
pub const BEAN_FACTORY_AWARE_TYPE: TypeKey = TypeKey::from_static("BeanFactoryAware");
pub const APPLICATION_CONTEXT_AWARE_TYPE: TypeKey = TypeKey::from_static("ApplicationContextAware");

/// 生成名称：`<类名>#<序号>`、`(inner bean)#<序号>`
pub const GENERATED_BEAN_NAME_SEPARATOR: &str = "#";
pub const INNER_BEAN_PREFIX: &str = "(inner bean)";

/// 名称、profile 列表的分隔符
pub const MULTI_VALUE_DELIMITERS: &str = ",; ";

/// 激活 profile 的环境变量后缀，完整名称为 `{前缀}PROFILES_ACTIVE`
pub const PROFILES_ACTIVE_SUFFIX: &str = "PROFILES_ACTIVE";
