//! Bean 定义 - 描述如何创建和管理 Bean

use std::fmt;
use std::str::FromStr;

use crate::parsing::SourceLocation;
use crate::scope::Scope;

/// 自动装配模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutowireMode {
    #[default]
    No,
    ByName,
    ByType,
    Constructor,
}

impl FromStr for AutowireMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "no" => Ok(AutowireMode::No),
            "byName" | "by_name" => Ok(AutowireMode::ByName),
            "byType" | "by_type" => Ok(AutowireMode::ByType),
            "constructor" => Ok(AutowireMode::Constructor),
            other => Err(format!("Unknown autowire mode '{}'", other)),
        }
    }
}

/// 属性注入完成后的依赖检查
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DependencyCheck {
    #[default]
    None,
    /// 对象引用属性都必须已设置
    Objects,
    /// 简单属性都必须已设置
    Simple,
    All,
}

impl FromStr for DependencyCheck {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "none" => Ok(DependencyCheck::None),
            "objects" => Ok(DependencyCheck::Objects),
            "simple" => Ok(DependencyCheck::Simple),
            "all" => Ok(DependencyCheck::All),
            other => Err(format!("Unknown dependency check '{}'", other)),
        }
    }
}

/// 属性或构造参数的值描述
#[derive(Debug, Clone)]
pub enum ValueSpec {
    /// 字面量，由类型转换器转换
    Literal(String),
    /// 按名称引用另一个 Bean
    Ref(String),
    /// 内部 Bean，不单独注册
    Bean(Box<BeanDefinition>),
}

impl ValueSpec {
    pub fn literal(value: impl Into<String>) -> Self {
        ValueSpec::Literal(value.into())
    }

    pub fn reference(name: impl Into<String>) -> Self {
        ValueSpec::Ref(name.into())
    }

    pub fn inner(definition: BeanDefinition) -> Self {
        ValueSpec::Bean(Box::new(definition))
    }
}

/// Bean 定义
///
/// `None` 表示未显式设置，合并父定义时继承父定义的值
#[derive(Debug, Clone)]
pub struct BeanDefinition {
    pub class_name: Option<String>,
    pub parent: Option<String>,
    pub scope: Option<Scope>,
    pub lazy_init: Option<bool>,
    pub is_abstract: bool,
    pub primary: bool,
    /// 同类型候选之间的优先级，值越小越优先
    pub order: Option<i32>,
    pub autowire_candidate: bool,
    pub autowire: AutowireMode,
    pub dependency_check: DependencyCheck,
    /// 必须先于本 Bean 初始化的 Bean
    pub depends_on: Vec<String>,
    pub constructor_args: Vec<ValueSpec>,
    pub properties: Vec<(String, ValueSpec)>,
    pub init_method: Option<String>,
    pub destroy_method: Option<String>,
    /// 方法来自单元默认值时，不存在也不报错
    pub enforce_init_method: bool,
    pub enforce_destroy_method: bool,
    pub factory_bean: Option<String>,
    pub factory_method: Option<String>,
    pub source: Option<SourceLocation>,
}

impl Default for BeanDefinition {
    fn default() -> Self {
        Self {
            class_name: None,
            parent: None,
            scope: None,
            lazy_init: None,
            is_abstract: false,
            primary: false,
            order: None,
            autowire_candidate: true,
            autowire: AutowireMode::No,
            dependency_check: DependencyCheck::None,
            depends_on: Vec::new(),
            constructor_args: Vec::new(),
            properties: Vec::new(),
            init_method: None,
            destroy_method: None,
            enforce_init_method: true,
            enforce_destroy_method: true,
            factory_bean: None,
            factory_method: None,
            source: None,
        }
    }
}

impl BeanDefinition {
    /// 创建新的 Bean 定义
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: Some(class_name.into()),
            ..Self::default()
        }
    }

    /// 只继承父定义的子定义
    pub fn child_of(parent: impl Into<String>) -> Self {
        Self {
            parent: Some(parent.into()),
            ..Self::default()
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn with_lazy_init(mut self, lazy: bool) -> Self {
        self.lazy_init = Some(lazy);
        self
    }

    pub fn with_primary(mut self, primary: bool) -> Self {
        self.primary = primary;
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_autowire(mut self, mode: AutowireMode) -> Self {
        self.autowire = mode;
        self
    }

    pub fn with_autowire_candidate(mut self, candidate: bool) -> Self {
        self.autowire_candidate = candidate;
        self
    }

    pub fn with_dependency_check(mut self, check: DependencyCheck) -> Self {
        self.dependency_check = check;
        self
    }

    pub fn with_abstract(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    pub fn with_depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    pub fn with_constructor_arg(mut self, value: ValueSpec) -> Self {
        self.constructor_args.push(value);
        self
    }

    /// 同名属性会被替换，位置保持不变
    pub fn with_property(mut self, name: impl Into<String>, value: ValueSpec) -> Self {
        self.set_property(name, value);
        self
    }

    pub fn with_init_method(mut self, method: impl Into<String>) -> Self {
        self.init_method = Some(method.into());
        self.enforce_init_method = true;
        self
    }

    pub fn with_destroy_method(mut self, method: impl Into<String>) -> Self {
        self.destroy_method = Some(method.into());
        self.enforce_destroy_method = true;
        self
    }

    pub fn with_factory(mut self, factory_bean: impl Into<String>, factory_method: impl Into<String>) -> Self {
        self.factory_bean = Some(factory_bean.into());
        self.factory_method = Some(factory_method.into());
        self
    }

    pub fn with_source(mut self, source: SourceLocation) -> Self {
        self.source = Some(source);
        self
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: ValueSpec) {
        let name = name.into();
        match self.properties.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.properties.push((name, value)),
        }
    }

    pub fn property(&self, name: &str) -> Option<&ValueSpec> {
        self.properties
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn effective_scope(&self) -> Scope {
        self.scope.unwrap_or_default()
    }

    pub fn is_singleton(&self) -> bool {
        self.effective_scope() == Scope::Singleton
    }

    pub fn is_prototype(&self) -> bool {
        self.effective_scope() == Scope::Prototype
    }

    pub fn is_lazy_init(&self) -> bool {
        self.lazy_init.unwrap_or(false)
    }

    /// 未设置 order 的定义排在最后
    pub fn effective_order(&self) -> i32 {
        self.order.unwrap_or(i32::MAX)
    }

    /// 以父定义为基础、用本定义覆盖得到的完整定义
    pub fn merged_with_parent(&self, parent: &BeanDefinition) -> BeanDefinition {
        let mut merged = parent.clone();
        if self.class_name.is_some() {
            merged.class_name = self.class_name.clone();
        }
        if self.scope.is_some() {
            merged.scope = self.scope;
        }
        if self.lazy_init.is_some() {
            merged.lazy_init = self.lazy_init;
        }
        if !self.constructor_args.is_empty() {
            merged.constructor_args = self.constructor_args.clone();
        }
        for (name, value) in &self.properties {
            merged.set_property(name.clone(), value.clone());
        }
        if self.init_method.is_some() {
            merged.init_method = self.init_method.clone();
            merged.enforce_init_method = self.enforce_init_method;
        }
        if self.destroy_method.is_some() {
            merged.destroy_method = self.destroy_method.clone();
            merged.enforce_destroy_method = self.enforce_destroy_method;
        }
        if self.factory_bean.is_some() {
            merged.factory_bean = self.factory_bean.clone();
        }
        if self.factory_method.is_some() {
            merged.factory_method = self.factory_method.clone();
        }
        if self.order.is_some() {
            merged.order = self.order;
        }
        // 以下设置总是取子定义
        merged.depends_on = self.depends_on.clone();
        merged.is_abstract = self.is_abstract;
        merged.primary = self.primary;
        merged.autowire_candidate = self.autowire_candidate;
        merged.autowire = self.autowire;
        merged.dependency_check = self.dependency_check;
        merged.source = self.source.clone();
        merged.parent = None;
        merged
    }

    /// 描述信息，用于日志
    pub fn description(&self) -> String {
        let mut parts = Vec::new();
        if let Some(class_name) = &self.class_name {
            parts.push(format!("class [{}]", class_name));
        }
        if let Some(parent) = &self.parent {
            parts.push(format!("parent [{}]", parent));
        }
        parts.push(format!("scope={}", self.effective_scope()));
        if self.is_abstract {
            parts.push("abstract".to_string());
        }
        if self.primary {
            parts.push("primary".to_string());
        }
        if let Some(source) = &self.source {
            parts.push(format!("defined in {}", source));
        }
        parts.join("; ")
    }
}

impl fmt::Display for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_with_parent() {
        let parent = BeanDefinition::new("DataSource")
            .with_scope(Scope::Prototype)
            .with_property("url", ValueSpec::literal("jdbc:parent"))
            .with_property("user", ValueSpec::literal("sa"))
            .with_init_method("open")
            .with_abstract(true);

        let child = BeanDefinition::child_of("base")
            .with_property("url", ValueSpec::literal("jdbc:child"))
            .with_primary(true);

        let merged = child.merged_with_parent(&parent);
        assert_eq!(merged.class_name.as_deref(), Some("DataSource"));
        assert!(merged.is_prototype());
        assert!(!merged.is_abstract);
        assert!(merged.primary);
        assert!(merged.parent.is_none());
        assert_eq!(merged.init_method.as_deref(), Some("open"));
        assert_eq!(merged.properties.len(), 2);
        assert!(matches!(merged.property("url"), Some(ValueSpec::Literal(v)) if v == "jdbc:child"));
        assert_eq!(merged.properties[0].0, "url");
    }

    #[test]
    fn test_defaults() {
        let definition = BeanDefinition::new("A");
        assert!(definition.is_singleton());
        assert!(!definition.is_lazy_init());
        assert!(definition.autowire_candidate);
        assert_eq!(definition.effective_order(), i32::MAX);
    }

    #[test]
    fn test_parse_modes() {
        assert_eq!("byType".parse::<AutowireMode>().unwrap(), AutowireMode::ByType);
        assert_eq!("constructor".parse::<AutowireMode>().unwrap(), AutowireMode::Constructor);
        assert!("magic".parse::<AutowireMode>().is_err());
        assert_eq!("objects".parse::<DependencyCheck>().unwrap(), DependencyCheck::Objects);
    }
}
