//! Bean 定义注册表
//!
//! 保存名称 → 定义、别名 → 名称，以及手动注册单例的名称。注册顺序即遍历顺序。
//! 冻结之后定义和别名不能再修改，并启用按类型查找的名称缓存。

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::bean::Object;
use crate::class::TypeKey;
use crate::definition::BeanDefinition;
use crate::error::{BeansError, BeansResult};

/// 别名注册
pub trait AliasRegistry {
    fn register_alias(&self, name: &str, alias: &str) -> BeansResult<()>;

    fn remove_alias(&self, alias: &str) -> BeansResult<()>;

    fn is_alias(&self, name: &str) -> bool;

    /// 指向该名称的所有别名（按注册顺序）
    fn get_aliases(&self, name: &str) -> Vec<String>;

    /// 别名解析为规范名称，非别名原样返回
    fn canonical_name(&self, name: &str) -> String;
}

/// Bean 定义注册
pub trait BeanDefinitionRegistry: AliasRegistry + Send + Sync {
    /// 同名定义会被替换
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> BeansResult<()>;

    fn remove_bean_definition(&self, name: &str) -> BeansResult<()>;

    fn get_bean_definition(&self, name: &str) -> BeansResult<BeanDefinition>;

    fn contains_bean_definition(&self, name: &str) -> bool;

    fn get_bean_definition_names(&self) -> Vec<String>;

    fn get_bean_definition_count(&self) -> usize;

    /// 名称是否已被定义、别名或手动单例占用
    fn is_bean_name_in_use(&self, name: &str) -> bool;
}

/// 可按类型解析的特殊依赖（容器自身等），不作为普通 Bean 注册
#[derive(Clone)]
pub enum ResolvableDependency {
    Instance(Object),
    Lazy(Arc<dyn Fn() -> Option<Object> + Send + Sync>),
}

impl ResolvableDependency {
    pub fn resolve(&self) -> Option<Object> {
        match self {
            ResolvableDependency::Instance(object) => Some(Arc::clone(object)),
            ResolvableDependency::Lazy(factory) => factory(),
        }
    }
}

impl std::fmt::Debug for ResolvableDependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolvableDependency::Instance(object) => f.debug_tuple("Instance").field(object).finish(),
            ResolvableDependency::Lazy(_) => f.write_str("Lazy"),
        }
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    definitions: HashMap<String, BeanDefinition>,
    definition_names: Vec<String>,
    /// 别名 → 规范名称
    aliases: HashMap<String, String>,
    alias_order: Vec<String>,
    manual_singletons: Vec<String>,
    manual_singleton_types: HashMap<String, Vec<TypeKey>>,
}

impl RegistryState {
    fn name_exists(&self, name: &str) -> bool {
        self.definitions.contains_key(name) || self.manual_singletons.iter().any(|n| n == name)
    }

    fn drop_aliases_of(&mut self, name: &str) {
        let removed: Vec<String> = self
            .aliases
            .iter()
            .filter(|(_, target)| target.as_str() == name)
            .map(|(alias, _)| alias.clone())
            .collect();
        for alias in removed {
            self.aliases.remove(&alias);
            self.alias_order.retain(|a| *a != alias);
        }
    }
}

/// 注册表实现
#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    state: RwLock<RegistryState>,
    merged: RwLock<HashMap<String, Arc<BeanDefinition>>>,
    /// 每次元数据缓存失效时递增
    metadata_generation: AtomicU64,
    names_by_type: RwLock<HashMap<TypeKey, Vec<String>>>,
    frozen: AtomicBool,
    ignored_types: RwLock<HashSet<TypeKey>>,
    ignored_interfaces: RwLock<HashSet<TypeKey>>,
    resolvable: RwLock<HashMap<TypeKey, ResolvableDependency>>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_not_frozen(&self, operation: impl FnOnce() -> String) -> BeansResult<()> {
        if self.is_frozen() {
            return Err(BeansError::ConfigurationFrozen { operation: operation() });
        }
        Ok(())
    }

    fn invalidate_caches(&self) {
        self.metadata_generation.fetch_add(1, Ordering::SeqCst);
        self.merged.write().clear();
        self.names_by_type.write().clear();
    }

    /// 就地修改已注册的定义
    pub fn modify_bean_definition<F>(&self, name: &str, modify: F) -> BeansResult<()>
    where
        F: FnOnce(&mut BeanDefinition),
    {
        self.check_not_frozen(|| format!("modify bean definition '{}'", name))?;
        {
            let mut state = self.state.write();
            let canonical = state.aliases.get(name).cloned().unwrap_or_else(|| name.to_string());
            let definition = state
                .definitions
                .get_mut(&canonical)
                .ok_or_else(|| BeansError::no_such_bean(name))?;
            modify(definition);
        }
        self.invalidate_caches();
        Ok(())
    }

    /// 冻结配置：之后定义和别名不能修改
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::SeqCst);
        self.names_by_type.write().clear();
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }

    /// 清除合并定义和按类型的名称缓存
    pub fn clear_metadata_cache(&self) {
        self.invalidate_caches();
    }

    /// 记录手动注册的单例名称及其可赋值类型
    pub fn register_manual_singleton(&self, name: &str, types: Vec<TypeKey>) -> BeansResult<()> {
        let mut state = self.state.write();
        if state.aliases.contains_key(name) {
            return Err(BeansError::BeanDefinitionStore(format!(
                "Cannot register singleton under name '{}': it is already used as an alias",
                name
            )));
        }
        if !state.manual_singletons.iter().any(|n| n == name) {
            state.manual_singletons.push(name.to_string());
        }
        state.manual_singleton_types.insert(name.to_string(), types);
        drop(state);
        self.names_by_type.write().clear();
        Ok(())
    }

    pub fn remove_manual_singleton(&self, name: &str) {
        let mut state = self.state.write();
        state.manual_singletons.retain(|n| n != name);
        state.manual_singleton_types.remove(name);
        if !state.definitions.contains_key(name) {
            state.drop_aliases_of(name);
        }
        drop(state);
        self.names_by_type.write().clear();
    }

    pub fn is_manual_singleton(&self, name: &str) -> bool {
        self.state.read().manual_singletons.iter().any(|n| n == name)
    }

    pub fn manual_singleton_types(&self, name: &str) -> Vec<TypeKey> {
        self.state
            .read()
            .manual_singleton_types
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// 所有 Bean 名称：先定义（注册顺序），再不对应定义的手动单例
    pub fn bean_names(&self) -> Vec<String> {
        let state = self.state.read();
        let mut names = state.definition_names.clone();
        names.extend(
            state
                .manual_singletons
                .iter()
                .filter(|name| !state.definitions.contains_key(name.as_str()))
                .cloned(),
        );
        names
    }

    pub fn manual_singleton_names(&self) -> Vec<String> {
        self.state.read().manual_singletons.clone()
    }

    /// 合并父定义后的完整定义（结果被缓存）
    pub fn get_merged_definition(&self, name: &str) -> BeansResult<Arc<BeanDefinition>> {
        let canonical = self.canonical_name(name);
        if let Some(merged) = self.merged.read().get(&canonical) {
            return Ok(Arc::clone(merged));
        }
        let generation = self.metadata_generation.load(Ordering::SeqCst);
        let mut visiting = Vec::new();
        let merged = Arc::new(self.merge(&canonical, &mut visiting)?);
        let mut cache = self.merged.write();
        // 合并期间缓存已失效时不回填
        if self.metadata_generation.load(Ordering::SeqCst) != generation {
            return Ok(merged);
        }
        Ok(Arc::clone(cache.entry(canonical).or_insert(merged)))
    }

    fn merge(&self, name: &str, visiting: &mut Vec<String>) -> BeansResult<BeanDefinition> {
        if visiting.iter().any(|n| n == name) {
            visiting.push(name.to_string());
            return Err(BeansError::BeanDefinitionStore(format!(
                "Circular parent relationship between bean definitions: {}",
                visiting.join(" -> ")
            )));
        }
        let definition = self.get_bean_definition(name)?;
        match &definition.parent {
            None => Ok(definition),
            Some(parent) => {
                visiting.push(name.to_string());
                let parent_name = self.canonical_name(parent);
                if parent_name == name {
                    return Err(BeansError::BeanDefinitionStore(format!(
                        "Bean definition '{}' declares itself as parent",
                        name
                    )));
                }
                let merged_parent = self.merge(&parent_name, visiting).map_err(|e| match e {
                    BeansError::NoSuchBeanDefinition { .. } => BeansError::BeanDefinitionStore(format!(
                        "Could not resolve parent bean definition '{}' for bean '{}'",
                        parent, name
                    )),
                    other => other,
                })?;
                Ok(definition.merged_with_parent(&merged_parent))
            }
        }
    }

    /// 冻结后才使用的按类型名称缓存
    pub fn cached_names_for_type(&self, ty: &TypeKey) -> Option<Vec<String>> {
        if !self.is_frozen() {
            return None;
        }
        self.names_by_type.read().get(ty).cloned()
    }

    pub fn cache_names_for_type(&self, ty: &TypeKey, names: &[String]) {
        if self.is_frozen() {
            self.names_by_type.write().insert(ty.clone(), names.to_vec());
        }
    }

    /// 属性自动装配时忽略该类型
    pub fn ignore_dependency_type(&self, ty: TypeKey) {
        self.ignored_types.write().insert(ty);
    }

    /// 属性自动装配时忽略由该接口声明的属性
    pub fn ignore_dependency_interface(&self, ty: TypeKey) {
        self.ignored_interfaces.write().insert(ty);
    }

    pub fn is_ignored_type(&self, ty: &TypeKey) -> bool {
        self.ignored_types.read().contains(ty)
    }

    pub fn is_ignored_interface(&self, ty: &TypeKey) -> bool {
        self.ignored_interfaces.read().contains(ty)
    }

    pub fn register_resolvable_dependency(&self, ty: TypeKey, value: ResolvableDependency) {
        self.resolvable.write().insert(ty, value);
    }

    pub fn resolvable_dependency(&self, ty: &TypeKey) -> Option<ResolvableDependency> {
        self.resolvable.read().get(ty).cloned()
    }
}

impl AliasRegistry for DefinitionRegistry {
    fn register_alias(&self, name: &str, alias: &str) -> BeansResult<()> {
        if name.trim().is_empty() {
            return Err(BeansError::BeanDefinitionStore("'name' must not be empty".to_string()));
        }
        if alias.trim().is_empty() {
            return Err(BeansError::BeanDefinitionStore("'alias' must not be empty".to_string()));
        }
        self.check_not_frozen(|| format!("register alias '{}' for bean '{}'", alias, name))?;

        let mut state = self.state.write();
        if alias == name {
            if state.aliases.remove(alias).is_some() {
                state.alias_order.retain(|a| a != alias);
            }
            tracing::debug!("Alias definition '{}' ignored since it points to same name", alias);
            return Ok(());
        }
        if state.aliases.contains_key(name) {
            return Err(BeansError::BeanDefinitionStore(format!(
                "Cannot register alias '{}' for name '{}': '{}' is itself an alias",
                alias, name, name
            )));
        }
        if !state.name_exists(name) {
            return Err(BeansError::BeanDefinitionStore(format!(
                "Cannot register alias '{}' for name '{}': no bean named '{}' is registered",
                alias, name, name
            )));
        }
        if state.name_exists(alias) {
            return Err(BeansError::BeanDefinitionStore(format!(
                "Cannot register alias '{}' for name '{}': a bean named '{}' already exists",
                alias, name, alias
            )));
        }
        match state.aliases.get(alias) {
            Some(existing) if existing == name => return Ok(()),
            Some(existing) => {
                return Err(BeansError::BeanDefinitionStore(format!(
                    "Cannot register alias '{}' for name '{}': it is already registered for name '{}'",
                    alias, name, existing
                )));
            }
            None => {}
        }
        state.aliases.insert(alias.to_string(), name.to_string());
        state.alias_order.push(alias.to_string());
        tracing::trace!("Alias definition '{}' registered for name '{}'", alias, name);
        Ok(())
    }

    fn remove_alias(&self, alias: &str) -> BeansResult<()> {
        self.check_not_frozen(|| format!("remove alias '{}'", alias))?;
        let mut state = self.state.write();
        if state.aliases.remove(alias).is_none() {
            return Err(BeansError::IllegalState(format!("No alias '{}' registered", alias)));
        }
        state.alias_order.retain(|a| a != alias);
        Ok(())
    }

    fn is_alias(&self, name: &str) -> bool {
        self.state.read().aliases.contains_key(name)
    }

    fn get_aliases(&self, name: &str) -> Vec<String> {
        let state = self.state.read();
        let canonical = state.aliases.get(name).map(String::as_str).unwrap_or(name);
        state
            .alias_order
            .iter()
            .filter(|alias| {
                alias.as_str() != name
                    && state.aliases.get(alias.as_str()).map(String::as_str) == Some(canonical)
            })
            .cloned()
            .collect()
    }

    fn canonical_name(&self, name: &str) -> String {
        self.state
            .read()
            .aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}

impl BeanDefinitionRegistry for DefinitionRegistry {
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> BeansResult<()> {
        if name.trim().is_empty() {
            return Err(BeansError::BeanDefinitionStore("Bean name must not be empty".to_string()));
        }
        if definition.class_name.is_none()
            && definition.parent.is_none()
            && definition.factory_bean.is_none()
        {
            return Err(BeansError::BeanDefinitionStore(format!(
                "Bean definition '{}' specifies neither class nor parent nor factory-bean",
                name
            )));
        }
        self.check_not_frozen(|| format!("register bean definition '{}'", name))?;

        let mut state = self.state.write();
        if state.aliases.remove(name).is_some() {
            state.alias_order.retain(|a| a != name);
            tracing::info!("Removed alias '{}' in favor of a bean definition with the same name", name);
        }
        match state.definitions.insert(name.to_string(), definition) {
            Some(_) => {
                tracing::info!("Overriding bean definition for bean '{}'", name);
            }
            None => {
                state.definition_names.push(name.to_string());
                tracing::trace!("Registered bean definition for bean '{}'", name);
            }
        }
        drop(state);
        self.invalidate_caches();
        Ok(())
    }

    fn remove_bean_definition(&self, name: &str) -> BeansResult<()> {
        self.check_not_frozen(|| format!("remove bean definition '{}'", name))?;
        let mut state = self.state.write();
        if state.definitions.remove(name).is_none() {
            return Err(BeansError::no_such_bean(name));
        }
        state.definition_names.retain(|n| n != name);
        if !state.manual_singletons.iter().any(|n| n == name) {
            state.drop_aliases_of(name);
        }
        drop(state);
        self.invalidate_caches();
        Ok(())
    }

    fn get_bean_definition(&self, name: &str) -> BeansResult<BeanDefinition> {
        let state = self.state.read();
        let canonical = state.aliases.get(name).map(String::as_str).unwrap_or(name);
        state
            .definitions
            .get(canonical)
            .cloned()
            .ok_or_else(|| BeansError::no_such_bean(name))
    }

    fn contains_bean_definition(&self, name: &str) -> bool {
        self.state.read().definitions.contains_key(name)
    }

    fn get_bean_definition_names(&self) -> Vec<String> {
        self.state.read().definition_names.clone()
    }

    fn get_bean_definition_count(&self) -> usize {
        self.state.read().definitions.len()
    }

    fn is_bean_name_in_use(&self, name: &str) -> bool {
        let state = self.state.read();
        state.name_exists(name) || state.aliases.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(names: &[&str]) -> DefinitionRegistry {
        let registry = DefinitionRegistry::new();
        for name in names {
            registry
                .register_bean_definition(name, BeanDefinition::new("Service"))
                .unwrap();
        }
        registry
    }

    #[test]
    fn test_alias_resolves_to_canonical_name() {
        let registry = registry_with(&["dataSource"]);
        registry.register_alias("dataSource", "ds").unwrap();
        registry.register_alias("dataSource", "primaryDs").unwrap();

        assert_eq!(registry.canonical_name("ds"), "dataSource");
        assert_eq!(registry.canonical_name("primaryDs"), "dataSource");
        assert_eq!(registry.canonical_name("dataSource"), "dataSource");
        assert_eq!(registry.get_aliases("dataSource"), vec!["ds", "primaryDs"]);
        assert_eq!(registry.get_aliases("ds"), vec!["primaryDs"]);
        assert!(registry.get_bean_definition("ds").is_ok());
    }

    #[test]
    fn test_alias_rejections() {
        let registry = registry_with(&["a", "b"]);
        registry.register_alias("a", "x").unwrap();

        assert!(registry.register_alias("", "y").is_err());
        assert!(registry.register_alias("a", " ").is_err());
        // 别名链
        assert!(registry.register_alias("x", "y").is_err());
        // 悬空目标
        assert!(registry.register_alias("missing", "y").is_err());
        // 与已有名称冲突
        assert!(registry.register_alias("a", "b").is_err());
        // 重新指向其他名称
        assert!(registry.register_alias("b", "x").is_err());
        // 重复注册同一映射是幂等的
        assert!(registry.register_alias("a", "x").is_ok());
        assert_eq!(registry.canonical_name("x"), "a");
    }

    #[test]
    fn test_remove_definition_drops_aliases() {
        let registry = registry_with(&["a"]);
        registry.register_alias("a", "alpha").unwrap();
        registry.remove_bean_definition("a").unwrap();
        assert!(!registry.is_alias("alpha"));
        assert!(!registry.is_bean_name_in_use("alpha"));
    }

    #[test]
    fn test_override_keeps_registration_position() {
        let registry = registry_with(&["a", "b", "c"]);
        registry
            .register_bean_definition("a", BeanDefinition::new("Other"))
            .unwrap();
        assert_eq!(registry.get_bean_definition_names(), vec!["a", "b", "c"]);
        assert_eq!(
            registry.get_bean_definition("a").unwrap().class_name.as_deref(),
            Some("Other")
        );
    }

    #[test]
    fn test_frozen_rejects_mutation() {
        let registry = registry_with(&["a"]);
        registry.freeze();
        assert!(matches!(
            registry.register_bean_definition("b", BeanDefinition::new("B")),
            Err(BeansError::ConfigurationFrozen { .. })
        ));
        assert!(matches!(
            registry.register_alias("a", "alpha"),
            Err(BeansError::ConfigurationFrozen { .. })
        ));
        assert!(registry.modify_bean_definition("a", |d| d.primary = true).is_err());
        assert!(registry.get_bean_definition("a").is_ok());
    }

    #[test]
    fn test_names_include_manual_singletons_last() {
        let registry = registry_with(&["a"]);
        registry.register_manual_singleton("env", vec![TypeKey::new("Environment")]).unwrap();
        registry
            .register_bean_definition("b", BeanDefinition::new("B"))
            .unwrap();
        assert_eq!(registry.bean_names(), vec!["a", "b", "env"]);
        registry.register_alias("env", "environment").unwrap();
        assert_eq!(registry.canonical_name("environment"), "env");
    }

    #[test]
    fn test_merged_definition_and_cache_invalidation() {
        let registry = DefinitionRegistry::new();
        registry
            .register_bean_definition("base", BeanDefinition::new("Pool").with_order(3).with_abstract(true))
            .unwrap();
        registry
            .register_bean_definition("child", BeanDefinition::child_of("base"))
            .unwrap();

        let merged = registry.get_merged_definition("child").unwrap();
        assert_eq!(merged.class_name.as_deref(), Some("Pool"));
        assert_eq!(merged.order, Some(3));
        assert!(!merged.is_abstract);

        registry
            .modify_bean_definition("base", |d| d.class_name = Some("BigPool".into()))
            .unwrap();
        let merged = registry.get_merged_definition("child").unwrap();
        assert_eq!(merged.class_name.as_deref(), Some("BigPool"));
    }

    #[test]
    fn test_removing_manual_singleton_drops_its_aliases() {
        let registry = registry_with(&["shared"]);
        registry.register_manual_singleton("env", vec![TypeKey::new("Environment")]).unwrap();
        registry.register_manual_singleton("shared", Vec::new()).unwrap();
        registry.register_alias("env", "environment").unwrap();
        registry.register_alias("shared", "common").unwrap();

        registry.remove_manual_singleton("env");
        assert!(!registry.is_alias("environment"));
        assert_eq!(registry.canonical_name("environment"), "environment");

        // 定义仍然存在时别名保留
        registry.remove_manual_singleton("shared");
        assert_eq!(registry.canonical_name("common"), "shared");
    }

    #[test]
    fn test_merged_cache_is_not_refilled_with_stale_merges() {
        let registry = DefinitionRegistry::new();
        registry
            .register_bean_definition("base", BeanDefinition::new("Pool").with_order(0).with_abstract(true))
            .unwrap();
        registry
            .register_bean_definition("child", BeanDefinition::child_of("base"))
            .unwrap();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..500 {
                        registry.get_merged_definition("child").unwrap();
                    }
                });
            }
            scope.spawn(|| {
                for order in 1..=200 {
                    registry.modify_bean_definition("base", |d| d.order = Some(order)).unwrap();
                }
            });
        });

        let merged = registry.get_merged_definition("child").unwrap();
        assert_eq!(merged.order, Some(200));
    }

    #[test]
    fn test_parent_cycle_is_rejected() {
        let registry = DefinitionRegistry::new();
        registry
            .register_bean_definition("a", BeanDefinition::child_of("b"))
            .unwrap();
        registry
            .register_bean_definition("b", BeanDefinition::child_of("a"))
            .unwrap();
        assert!(matches!(
            registry.get_merged_definition("a"),
            Err(BeansError::BeanDefinitionStore(_))
        ));
    }

    #[test]
    fn test_type_cache_only_when_frozen() {
        let registry = registry_with(&["a"]);
        let ty = TypeKey::new("Service");
        registry.cache_names_for_type(&ty, &["a".to_string()]);
        assert!(registry.cached_names_for_type(&ty).is_none());
        registry.freeze();
        registry.cache_names_for_type(&ty, &["a".to_string()]);
        assert_eq!(registry.cached_names_for_type(&ty).unwrap(), vec!["a"]);
        registry.clear_metadata_cache();
        assert!(registry.cached_names_for_type(&ty).is_none());
    }
}
