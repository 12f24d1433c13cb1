//! Bean Factory - 核心容器接口
//!
//! 参考 Spring 的 BeanFactory 架构设计：接口按能力拆分为多个 trait，
//! [`DefaultListableBeanFactory`] 是完整实现。创建流程见 `lifecycle` 模块，
//! 依赖解析见 `resolver` 模块。

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread::ThreadId;

use parking_lot::{Mutex, RwLock};

use crate::bean::{downcast_object, Bean, Capability, Object, Value};
use crate::bean_post_processor::{BeanPostProcessor, DestructionAwareBeanPostProcessor};
use crate::class::{BeanClass, SimpleTypeConverter, TypeConverter, TypeKey, TypeRegistry};
use crate::constants::BEAN_FACTORY_TYPE;
use crate::context::ApplicationContext;
use crate::definition::{AutowireMode, BeanDefinition};
use crate::error::{BeansError, BeansResult};
use crate::lifecycle::{InstanceRecord, LifecyclePhase};
use crate::registry::{
    AliasRegistry, BeanDefinitionRegistry, DefinitionRegistry, ResolvableDependency,
};
use crate::resolver::DependencyDescriptor;
use crate::singleton::SingletonRegistry;
use crate::utils::dependency::CreationTracker;
use crate::utils::naming::inner_bean_name;

/// BeanFactory - 最基础的容器接口
///
/// 注意：此 trait 不包含泛型方法，因此可以作为 trait object 使用
pub trait BeanFactory: Send + Sync {
    /// 通过名称（或别名）获取 Bean
    fn get_bean(&self, name: &str) -> BeansResult<Object>;

    /// 按类型获取唯一匹配的 Bean
    fn get_bean_of_type(&self, ty: &TypeKey) -> BeansResult<Object>;

    /// 检查是否包含指定名称的 Bean（包括祖先工厂）
    fn contains_bean(&self, name: &str) -> bool;

    fn is_singleton(&self, name: &str) -> BeansResult<bool>;

    fn is_prototype(&self, name: &str) -> BeansResult<bool>;

    fn is_type_match(&self, name: &str, ty: &TypeKey) -> BeansResult<bool>;
}

/// BeanFactoryExt - BeanFactory 的扩展 trait
///
/// 提供泛型方法，不能作为 trait object 使用
pub trait BeanFactoryExt: BeanFactory {
    /// 获取 Bean 并转换为具体类型
    fn get_bean_typed<T: Bean>(&self, name: &str) -> BeansResult<Arc<T>> {
        let object = self.get_bean(name)?;
        downcast_object::<T>(&object).ok_or_else(|| BeansError::TypeMismatch {
            name: name.to_string(),
            expected: std::any::type_name::<T>().to_string(),
        })
    }

    /// 按类型标识获取唯一的 Bean 并转换为具体类型
    fn get_bean_by_type<T: Bean>(&self, ty: &TypeKey) -> BeansResult<Arc<T>> {
        let object = self.get_bean_of_type(ty)?;
        downcast_object::<T>(&object).ok_or_else(|| BeansError::TypeMismatch {
            name: ty.to_string(),
            expected: std::any::type_name::<T>().to_string(),
        })
    }
}

impl<F: BeanFactory + ?Sized> BeanFactoryExt for F {}

/// 支持父子层次的工厂
pub trait HierarchicalBeanFactory: BeanFactory {
    fn parent_bean_factory(&self) -> Option<Arc<DefaultListableBeanFactory>>;

    /// 只检查本工厂，不查询祖先
    fn contains_local_bean(&self, name: &str) -> bool;
}

/// ListableBeanFactory - 可列举 Bean 的工厂
pub trait ListableBeanFactory: BeanFactory {
    /// 定义（注册顺序）在前，之后是没有定义的手动单例
    fn get_bean_names(&self) -> Vec<String>;

    /// 类型可赋值给 `ty` 的非抽象 Bean 名称，只查本工厂
    fn get_bean_names_for_type(&self, ty: &TypeKey) -> Vec<String>;

    fn get_beans_of_type(&self, ty: &TypeKey) -> BeansResult<Vec<(String, Object)>>;
}

/// ConfigurableBeanFactory - 可配置的工厂
pub trait ConfigurableBeanFactory: HierarchicalBeanFactory {
    /// 后处理器按注册顺序调用
    fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>);

    /// 销毁时按注册顺序的逆序调用
    fn add_destruction_aware_bean_post_processor(&self, processor: Arc<dyn DestructionAwareBeanPostProcessor>);

    fn bean_post_processor_count(&self) -> usize;

    fn set_type_converter(&self, converter: Arc<dyn TypeConverter>);

    /// 注册外部创建的单例，不经过生命周期流程
    fn register_singleton(&self, name: &str, object: Object) -> BeansResult<()>;

    /// `dependent` 依赖 `bean`，销毁时先销毁 `dependent`
    fn register_dependent_bean(&self, bean: &str, dependent: &str);

    fn is_currently_in_creation(&self, name: &str) -> bool;

    /// 销毁所有单例，错误只记录日志
    fn destroy_singletons(&self);
}

/// 可以为外部对象执行注入与生命周期流程的工厂
pub trait AutowireCapableBeanFactory: BeanFactory {
    /// 按类名创建一个完整初始化的新实例（不注册到容器）
    fn create_bean_of_class(&self, class_name: &str, mode: AutowireMode) -> BeansResult<Object>;

    /// 按名称或类型为已有对象注入属性
    fn autowire_bean_properties(&self, object: &Object, class_name: &str, mode: AutowireMode) -> BeansResult<()>;

    /// 用同名定义的属性配置已有对象并初始化
    fn configure_bean(&self, object: Object, name: &str) -> BeansResult<Object>;

    /// 执行 Aware 回调、后处理器和初始化方法
    fn initialize_bean(&self, object: Object, name: &str) -> BeansResult<Object>;

    fn apply_bean_post_processors_before_initialization(&self, object: Object, name: &str) -> BeansResult<Object>;

    fn apply_bean_post_processors_after_initialization(&self, object: Object, name: &str) -> BeansResult<Object>;

    /// 执行销毁回调，错误只记录日志
    fn destroy_bean(&self, object: Object, name: &str);

    /// 按类型解析唯一的 Bean，返回其名称和实例
    fn resolve_named_bean(&self, ty: &TypeKey) -> BeansResult<(String, Object)>;

    fn resolve_dependency(&self, descriptor: &DependencyDescriptor, requesting_bean: Option<&str>) -> BeansResult<Value>;
}

/// ConfigurableListableBeanFactory - 完整的工厂接口
pub trait ConfigurableListableBeanFactory:
    ListableBeanFactory + ConfigurableBeanFactory + AutowireCapableBeanFactory + BeanDefinitionRegistry
{
    fn ignore_dependency_type(&self, ty: TypeKey);

    fn ignore_dependency_interface(&self, ty: TypeKey);

    fn register_resolvable_dependency(&self, ty: TypeKey, value: ResolvableDependency);

    fn is_autowire_candidate(&self, name: &str, descriptor: &DependencyDescriptor) -> BeansResult<bool>;

    fn get_merged_bean_definition(&self, name: &str) -> BeansResult<Arc<BeanDefinition>>;

    fn clear_metadata_cache(&self);

    /// 冻结配置，之后不能注册或修改定义
    fn freeze_configuration(&self);

    fn is_configuration_frozen(&self) -> bool;

    /// 创建所有非抽象、非延迟的单例
    fn preinstantiate_singletons(&self) -> BeansResult<()>;
}

/// DefaultListableBeanFactory - ConfigurableListableBeanFactory 的默认实现
///
/// 工厂总是通过 `Arc` 持有，以便在 Aware 回调中把自身传给组件
pub struct DefaultListableBeanFactory {
    pub(crate) registry: DefinitionRegistry,
    pub(crate) singletons: SingletonRegistry,
    pub(crate) classes: TypeRegistry,
    parent: Option<Arc<DefaultListableBeanFactory>>,
    self_ref: Weak<DefaultListableBeanFactory>,
    application_context: RwLock<Option<Weak<ApplicationContext>>>,
    /// Bean 后置处理器列表（按注册顺序）
    post_processors: RwLock<Vec<Arc<dyn BeanPostProcessor>>>,
    destruction_processors: RwLock<Vec<Arc<dyn DestructionAwareBeanPostProcessor>>>,
    type_converter: RwLock<Arc<dyn TypeConverter>>,
    /// 原型 Bean 的循环检测按线程进行
    prototypes_in_creation: Mutex<HashMap<ThreadId, CreationTracker>>,
    inner_bean_counter: AtomicUsize,
    allow_circular_references: AtomicBool,
}

impl std::fmt::Debug for DefaultListableBeanFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultListableBeanFactory")
            .field("definitions", &self.registry.get_bean_definition_names())
            .field("singletons", &self.singletons.singleton_names())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

impl Bean for DefaultListableBeanFactory {}

impl DefaultListableBeanFactory {
    /// 创建新的 Bean 工厂
    pub fn new() -> Arc<Self> {
        Self::build(None)
    }

    /// 创建以 `parent` 为父工厂的子工厂
    pub fn with_parent(parent: Arc<DefaultListableBeanFactory>) -> Arc<Self> {
        Self::build(Some(parent))
    }

    fn build(parent: Option<Arc<DefaultListableBeanFactory>>) -> Arc<Self> {
        let factory = Arc::new_cyclic(|self_ref| Self {
            registry: DefinitionRegistry::new(),
            singletons: SingletonRegistry::new(),
            classes: TypeRegistry::new(),
            parent,
            self_ref: self_ref.clone(),
            application_context: RwLock::new(None),
            post_processors: RwLock::new(Vec::new()),
            destruction_processors: RwLock::new(Vec::new()),
            type_converter: RwLock::new(Arc::new(SimpleTypeConverter)),
            prototypes_in_creation: Mutex::new(HashMap::new()),
            inner_bean_counter: AtomicUsize::new(0),
            allow_circular_references: AtomicBool::new(true),
        });

        // 工厂自身不作为普通候选参与属性自动装配，只能通过可解析依赖注入
        factory.registry.ignore_dependency_type(BEAN_FACTORY_TYPE);
        let weak = Arc::downgrade(&factory);
        factory.registry.register_resolvable_dependency(
            BEAN_FACTORY_TYPE,
            ResolvableDependency::Lazy(Arc::new(move || weak.upgrade().map(|f| f as Object))),
        );
        factory
    }

    pub(crate) fn arc(&self) -> BeansResult<Arc<Self>> {
        self.self_ref
            .upgrade()
            .ok_or_else(|| BeansError::IllegalState("Bean factory has already been released".to_string()))
    }

    /// 注册组件类型描述
    pub fn register_class(&self, class: BeanClass) {
        self.classes.register(class);
    }

    pub fn type_registry(&self) -> &TypeRegistry {
        &self.classes
    }

    pub fn definition_registry(&self) -> &DefinitionRegistry {
        &self.registry
    }

    pub fn singleton_registry(&self) -> &SingletonRegistry {
        &self.singletons
    }

    pub(crate) fn bind_application_context(&self, context: Weak<ApplicationContext>) {
        *self.application_context.write() = Some(context);
    }

    pub(crate) fn application_context(&self) -> Option<Arc<ApplicationContext>> {
        self.application_context.read().as_ref().and_then(Weak::upgrade)
    }

    /// 是否允许通过提前暴露引用解决属性循环依赖（默认允许）
    pub fn set_allow_circular_references(&self, allow: bool) {
        self.allow_circular_references.store(allow, Ordering::SeqCst);
    }

    pub fn allows_circular_references(&self) -> bool {
        self.allow_circular_references.load(Ordering::SeqCst)
    }

    /// 注册外部创建的单例，并声明可按哪些类型注入
    pub fn register_singleton_with_types(&self, name: &str, object: Object, types: Vec<TypeKey>) -> BeansResult<()> {
        self.singletons.register_singleton(name, Arc::clone(&object))?;
        if let Err(err) = self.registry.register_manual_singleton(name, types) {
            self.singletons.destroy_singleton(name);
            return Err(err);
        }
        self.singletons.register_record(InstanceRecord::external(name, object));
        tracing::debug!("Registered singleton '{}'", name);
        Ok(())
    }

    /// 实例当前的生命周期阶段（仅单例）
    pub fn lifecycle_phase(&self, name: &str) -> Option<LifecyclePhase> {
        self.singletons.lifecycle_phase(&self.registry.canonical_name(name))
    }

    pub fn modify_bean_definition<F>(&self, name: &str, modify: F) -> BeansResult<()>
    where
        F: FnOnce(&mut BeanDefinition),
    {
        self.registry.modify_bean_definition(name, modify)?;
        tracing::debug!("Bean definition '{}' modified", name);
        Ok(())
    }

    pub(crate) fn next_inner_bean_name(&self) -> String {
        inner_bean_name(self.inner_bean_counter.fetch_add(1, Ordering::SeqCst))
    }

    pub(crate) fn post_processors(&self) -> Vec<Arc<dyn BeanPostProcessor>> {
        self.post_processors.read().clone()
    }

    pub(crate) fn destruction_processors(&self) -> Vec<Arc<dyn DestructionAwareBeanPostProcessor>> {
        self.destruction_processors.read().clone()
    }

    pub(crate) fn type_converter(&self) -> Arc<dyn TypeConverter> {
        Arc::clone(&self.type_converter.read())
    }

    pub(crate) fn class_of(&self, definition: &BeanDefinition) -> Option<Arc<BeanClass>> {
        definition
            .class_name
            .as_deref()
            .and_then(|class_name| self.classes.get(class_name))
    }

    pub(crate) fn definition_matches_type(&self, definition: &BeanDefinition, ty: &TypeKey) -> bool {
        match self.class_of(definition) {
            Some(class) => class.is_assignable_to(ty),
            // 没有注册类型描述时，只按类名匹配
            None => definition.class_name.as_deref() == Some(ty.as_str()),
        }
    }

    fn do_get_bean(&self, name: &str) -> BeansResult<Object> {
        let bean_name = self.registry.canonical_name(name);

        if let Some(object) = self.singletons.get_singleton_allow_early(&bean_name) {
            if self.singletons.is_currently_in_creation(&bean_name) {
                tracing::debug!(
                    "Returning eagerly cached instance of singleton bean '{}' that is not fully initialized yet - a consequence of a circular reference",
                    bean_name
                );
            } else {
                tracing::trace!("Returning cached instance of singleton bean '{}'", bean_name);
            }
            return Ok(object);
        }

        if !self.registry.contains_bean_definition(&bean_name) {
            if let Some(parent) = &self.parent {
                tracing::trace!("Bean '{}' not found locally, delegating to parent factory", name);
                return parent.get_bean(name);
            }
            return Err(BeansError::no_such_bean(name));
        }

        let mbd = self.registry.get_merged_definition(&bean_name)?;
        if mbd.is_abstract {
            return Err(BeansError::creation(&bean_name, "Bean definition is abstract"));
        }

        for dependency in &mbd.depends_on {
            let dependency = self.registry.canonical_name(dependency);
            if self.singletons.is_dependent(&bean_name, &dependency) {
                return Err(BeansError::creation(
                    &bean_name,
                    format!("Circular depends-on relationship between '{}' and '{}'", bean_name, dependency),
                ));
            }
            self.singletons.register_dependent_bean(&dependency, &bean_name);
            self.get_bean(&dependency).map_err(|err| {
                err.wrap_creation(&bean_name, format!("'{}' depends on missing bean '{}'", bean_name, dependency))
            })?;
        }

        if mbd.is_singleton() {
            self.singletons
                .get_or_create(&bean_name, || self.do_create_bean(&bean_name, &mbd))
        } else {
            tracing::debug!("Creating new instance of prototype bean '{}'", bean_name);
            self.before_prototype_creation(&bean_name)?;
            let result = self.do_create_bean(&bean_name, &mbd);
            self.after_prototype_creation(&bean_name);
            result
        }
    }

    fn before_prototype_creation(&self, name: &str) -> BeansResult<()> {
        let mut in_creation = self.prototypes_in_creation.lock();
        let tracker = in_creation.entry(std::thread::current().id()).or_default();
        if !tracker.start_creating(name) {
            return Err(BeansError::CircularReference {
                bean: name.to_string(),
                chain: tracker.cycle_through(name),
            });
        }
        Ok(())
    }

    fn after_prototype_creation(&self, name: &str) {
        let thread = std::thread::current().id();
        let mut in_creation = self.prototypes_in_creation.lock();
        if let Some(tracker) = in_creation.get_mut(&thread) {
            tracker.finish_creating(name);
            if tracker.is_empty() {
                in_creation.remove(&thread);
            }
        }
    }

    fn is_prototype_currently_in_creation(&self, name: &str) -> bool {
        self.prototypes_in_creation
            .lock()
            .get(&std::thread::current().id())
            .is_some_and(|tracker| tracker.is_creating(name))
    }
}

impl BeanFactory for DefaultListableBeanFactory {
    fn get_bean(&self, name: &str) -> BeansResult<Object> {
        tracing::trace!("Requesting bean: '{}'", name);
        self.do_get_bean(name)
    }

    fn get_bean_of_type(&self, ty: &TypeKey) -> BeansResult<Object> {
        self.resolve_named_bean(ty).map(|(_, object)| object)
    }

    fn contains_bean(&self, name: &str) -> bool {
        if self.contains_local_bean(name) {
            return true;
        }
        self.parent.as_ref().is_some_and(|parent| parent.contains_bean(name))
    }

    fn is_singleton(&self, name: &str) -> BeansResult<bool> {
        let bean_name = self.registry.canonical_name(name);
        if self.registry.contains_bean_definition(&bean_name) {
            return Ok(self.registry.get_merged_definition(&bean_name)?.is_singleton());
        }
        if self.singletons.contains_singleton(&bean_name) {
            return Ok(true);
        }
        match &self.parent {
            Some(parent) => parent.is_singleton(name),
            None => Err(BeansError::no_such_bean(name)),
        }
    }

    fn is_prototype(&self, name: &str) -> BeansResult<bool> {
        let bean_name = self.registry.canonical_name(name);
        if self.registry.contains_bean_definition(&bean_name) {
            return Ok(self.registry.get_merged_definition(&bean_name)?.is_prototype());
        }
        if self.singletons.contains_singleton(&bean_name) {
            return Ok(false);
        }
        match &self.parent {
            Some(parent) => parent.is_prototype(name),
            None => Err(BeansError::no_such_bean(name)),
        }
    }

    fn is_type_match(&self, name: &str, ty: &TypeKey) -> BeansResult<bool> {
        let bean_name = self.registry.canonical_name(name);
        if self.registry.contains_bean_definition(&bean_name) {
            let mbd = self.registry.get_merged_definition(&bean_name)?;
            return Ok(self.definition_matches_type(&mbd, ty));
        }
        if self.registry.is_manual_singleton(&bean_name) {
            return Ok(self.registry.manual_singleton_types(&bean_name).contains(ty));
        }
        match &self.parent {
            Some(parent) => parent.is_type_match(name, ty),
            None => Err(BeansError::no_such_bean(name)),
        }
    }
}

impl HierarchicalBeanFactory for DefaultListableBeanFactory {
    fn parent_bean_factory(&self) -> Option<Arc<DefaultListableBeanFactory>> {
        self.parent.clone()
    }

    fn contains_local_bean(&self, name: &str) -> bool {
        let bean_name = self.registry.canonical_name(name);
        self.singletons.contains_singleton(&bean_name)
            || self.registry.contains_bean_definition(&bean_name)
            || self.registry.is_manual_singleton(&bean_name)
    }
}

impl ListableBeanFactory for DefaultListableBeanFactory {
    fn get_bean_names(&self) -> Vec<String> {
        self.registry.bean_names()
    }

    fn get_bean_names_for_type(&self, ty: &TypeKey) -> Vec<String> {
        if let Some(cached) = self.registry.cached_names_for_type(ty) {
            return cached;
        }

        let mut names = Vec::new();
        for name in self.registry.get_bean_definition_names() {
            match self.registry.get_merged_definition(&name) {
                Ok(mbd) if !mbd.is_abstract && self.definition_matches_type(&mbd, ty) => names.push(name),
                Ok(_) => {}
                Err(err) => {
                    tracing::trace!("Ignoring bean definition '{}' during type lookup: {}", name, err);
                }
            }
        }
        for name in self.registry.manual_singleton_names() {
            if !self.registry.contains_bean_definition(&name)
                && self.registry.manual_singleton_types(&name).contains(ty)
            {
                names.push(name);
            }
        }

        self.registry.cache_names_for_type(ty, &names);
        names
    }

    fn get_beans_of_type(&self, ty: &TypeKey) -> BeansResult<Vec<(String, Object)>> {
        self.get_bean_names_for_type(ty)
            .into_iter()
            .map(|name| self.get_bean(&name).map(|object| (name, object)))
            .collect()
    }
}

impl ConfigurableBeanFactory for DefaultListableBeanFactory {
    fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        tracing::debug!("Registering bean post processor '{}'", processor.name());
        self.post_processors.write().push(processor);
    }

    fn add_destruction_aware_bean_post_processor(&self, processor: Arc<dyn DestructionAwareBeanPostProcessor>) {
        self.destruction_processors.write().push(processor);
    }

    fn bean_post_processor_count(&self) -> usize {
        self.post_processors.read().len()
    }

    fn set_type_converter(&self, converter: Arc<dyn TypeConverter>) {
        *self.type_converter.write() = converter;
    }

    fn register_singleton(&self, name: &str, object: Object) -> BeansResult<()> {
        self.register_singleton_with_types(name, object, Vec::new())
    }

    fn register_dependent_bean(&self, bean: &str, dependent: &str) {
        let bean = self.registry.canonical_name(bean);
        let dependent = self.registry.canonical_name(dependent);
        self.singletons.register_dependent_bean(&bean, &dependent);
    }

    fn is_currently_in_creation(&self, name: &str) -> bool {
        let bean_name = self.registry.canonical_name(name);
        self.singletons.is_currently_in_creation(&bean_name) || self.is_prototype_currently_in_creation(&bean_name)
    }

    fn destroy_singletons(&self) {
        tracing::info!("Destroying singleton beans");
        self.singletons.destroy_singletons();
        for name in self.registry.manual_singleton_names() {
            self.registry.remove_manual_singleton(&name);
        }
        tracing::info!("Singleton beans destruction completed");
    }
}

impl ConfigurableListableBeanFactory for DefaultListableBeanFactory {
    fn ignore_dependency_type(&self, ty: TypeKey) {
        self.registry.ignore_dependency_type(ty);
    }

    fn ignore_dependency_interface(&self, ty: TypeKey) {
        self.registry.ignore_dependency_interface(ty);
    }

    fn register_resolvable_dependency(&self, ty: TypeKey, value: ResolvableDependency) {
        self.registry.register_resolvable_dependency(ty, value);
    }

    fn is_autowire_candidate(&self, name: &str, descriptor: &DependencyDescriptor) -> BeansResult<bool> {
        let bean_name = self.registry.canonical_name(name);
        if self.registry.contains_bean_definition(&bean_name) {
            let mbd = self.registry.get_merged_definition(&bean_name)?;
            return Ok(mbd.autowire_candidate && self.definition_matches_type(&mbd, &descriptor.required_type));
        }
        if self.registry.is_manual_singleton(&bean_name) {
            return Ok(self
                .registry
                .manual_singleton_types(&bean_name)
                .contains(&descriptor.required_type));
        }
        match &self.parent {
            Some(parent) => parent.is_autowire_candidate(name, descriptor),
            None => Err(BeansError::no_such_bean(name)),
        }
    }

    fn get_merged_bean_definition(&self, name: &str) -> BeansResult<Arc<BeanDefinition>> {
        let bean_name = self.registry.canonical_name(name);
        if !self.registry.contains_bean_definition(&bean_name) {
            if let Some(parent) = &self.parent {
                return parent.get_merged_bean_definition(name);
            }
        }
        self.registry.get_merged_definition(&bean_name)
    }

    fn clear_metadata_cache(&self) {
        self.registry.clear_metadata_cache();
    }

    fn freeze_configuration(&self) {
        self.registry.freeze();
        tracing::debug!("Bean factory configuration frozen");
    }

    fn is_configuration_frozen(&self) -> bool {
        self.registry.is_frozen()
    }

    fn preinstantiate_singletons(&self) -> BeansResult<()> {
        let names = self.registry.get_bean_definition_names();
        tracing::debug!("Pre-instantiating singletons in {:?}", names);

        for name in &names {
            let mbd = self.registry.get_merged_definition(name)?;
            if !mbd.is_abstract && mbd.is_singleton() && !mbd.is_lazy_init() {
                self.get_bean(name)?;
            }
        }

        // 所有非延迟单例创建完成后的回调
        for name in &names {
            if let Some(object) = self.singletons.get_singleton(name) {
                if object.has_capability(Capability::SmartInitializingSingleton) {
                    tracing::trace!("Invoking after_singletons_instantiated on bean '{}'", name);
                    object.after_singletons_instantiated().map_err(|err| {
                        BeansError::creation_caused_by(name.as_str(), "after_singletons_instantiated failed", err)
                    })?;
                }
            }
        }
        Ok(())
    }
}

impl AliasRegistry for DefaultListableBeanFactory {
    fn register_alias(&self, name: &str, alias: &str) -> BeansResult<()> {
        self.registry.register_alias(name, alias)
    }

    fn remove_alias(&self, alias: &str) -> BeansResult<()> {
        self.registry.remove_alias(alias)
    }

    fn is_alias(&self, name: &str) -> bool {
        self.registry.is_alias(name)
    }

    fn get_aliases(&self, name: &str) -> Vec<String> {
        self.registry.get_aliases(name)
    }

    fn canonical_name(&self, name: &str) -> String {
        self.registry.canonical_name(name)
    }
}

impl BeanDefinitionRegistry for DefaultListableBeanFactory {
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> BeansResult<()> {
        self.registry.register_bean_definition(name, definition)?;
        // 已存在的同名单例被新的定义取代
        if self.singletons.contains_singleton(name) {
            self.singletons.destroy_singleton(name);
        }
        if self.registry.is_manual_singleton(name) {
            self.registry.remove_manual_singleton(name);
        }
        Ok(())
    }

    fn remove_bean_definition(&self, name: &str) -> BeansResult<()> {
        self.registry.remove_bean_definition(name)?;
        self.singletons.destroy_singleton(name);
        Ok(())
    }

    fn get_bean_definition(&self, name: &str) -> BeansResult<BeanDefinition> {
        self.registry.get_bean_definition(name)
    }

    fn contains_bean_definition(&self, name: &str) -> bool {
        self.registry.contains_bean_definition(name)
    }

    fn get_bean_definition_names(&self) -> Vec<String> {
        self.registry.get_bean_definition_names()
    }

    fn get_bean_definition_count(&self) -> usize {
        self.registry.get_bean_definition_count()
    }

    fn is_bean_name_in_use(&self, name: &str) -> bool {
        self.registry.is_bean_name_in_use(name) || self.singletons.contains_singleton(name)
    }
}
