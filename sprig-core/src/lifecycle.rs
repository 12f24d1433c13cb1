//! 生命周期引擎
//!
//! 描述一个实例从构造到销毁经历的阶段，并实现单个 Bean 的完整创建流程：
//!
//! ```text
//! 实例化 → 属性注入 → Aware 回调 → 初始化前处理 → 初始化方法 → 初始化后处理 → 就绪
//! ```
//!
//! 就绪的单例记录一份 [`InstanceRecord`]，容器关闭时按创建顺序的逆序执行销毁回调。

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::bean::{Capability, Object, Value};
use crate::bean_factory::{AutowireCapableBeanFactory, BeanFactory, DefaultListableBeanFactory};
use crate::bean_post_processor::DestructionAwareBeanPostProcessor;
use crate::class::{Arguments, BeanClass, Constructor, PropertyDescriptor, PropertyKind, TypeKey};
use crate::definition::{AutowireMode, BeanDefinition, DependencyCheck, ValueSpec};
use crate::error::{BeansError, BeansResult};
use crate::registry::AliasRegistry;
use crate::resolver::DependencyDescriptor;
use crate::scope::Scope;

/// 实例的生命周期阶段，只能按声明顺序逐个前进
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecyclePhase {
    Uninitialized,
    Instantiated,
    PropertiesSet,
    AwareCallbacksDone,
    PreInitProcessed,
    InitInvoked,
    PostInitProcessed,
    Ready,
    Stopping,
    Destroyed,
}

impl LifecyclePhase {
    pub fn next(self) -> Option<LifecyclePhase> {
        use LifecyclePhase::*;
        match self {
            Uninitialized => Some(Instantiated),
            Instantiated => Some(PropertiesSet),
            PropertiesSet => Some(AwareCallbacksDone),
            AwareCallbacksDone => Some(PreInitProcessed),
            PreInitProcessed => Some(InitInvoked),
            InitInvoked => Some(PostInitProcessed),
            PostInitProcessed => Some(Ready),
            Ready => Some(Stopping),
            Stopping => Some(Destroyed),
            Destroyed => None,
        }
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecyclePhase::Uninitialized => "UNINITIALIZED",
            LifecyclePhase::Instantiated => "INSTANTIATED",
            LifecyclePhase::PropertiesSet => "PROPERTIES_SET",
            LifecyclePhase::AwareCallbacksDone => "AWARE_CALLBACKS_DONE",
            LifecyclePhase::PreInitProcessed => "PRE_INIT_PROCESSED",
            LifecyclePhase::InitInvoked => "INIT_INVOKED",
            LifecyclePhase::PostInitProcessed => "POST_INIT_PROCESSED",
            LifecyclePhase::Ready => "READY",
            LifecyclePhase::Stopping => "STOPPING",
            LifecyclePhase::Destroyed => "DESTROYED",
        };
        f.write_str(name)
    }
}

/// 销毁时要执行的回调，按登记顺序执行
pub(crate) enum DestroyCallback {
    PostProcessor(Arc<dyn DestructionAwareBeanPostProcessor>),
    Disposable,
    Method { name: String, enforce: bool },
}

/// 一个受管实例的生命周期记录
pub struct InstanceRecord {
    name: String,
    object: Option<Object>,
    definition: Option<Arc<BeanDefinition>>,
    phase: LifecyclePhase,
    destroy_callbacks: Vec<DestroyCallback>,
}

impl fmt::Debug for InstanceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceRecord")
            .field("name", &self.name)
            .field("phase", &self.phase)
            .field("destroy_callbacks", &self.destroy_callbacks.len())
            .finish()
    }
}

impl InstanceRecord {
    pub(crate) fn new(name: &str, definition: Option<Arc<BeanDefinition>>) -> Self {
        Self {
            name: name.to_string(),
            object: None,
            definition,
            phase: LifecyclePhase::Uninitialized,
            destroy_callbacks: Vec::new(),
        }
    }

    /// 外部创建的实例，直接处于就绪状态
    pub(crate) fn external(name: &str, object: Object) -> Self {
        Self {
            name: name.to_string(),
            object: Some(object),
            definition: None,
            phase: LifecyclePhase::Ready,
            destroy_callbacks: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    pub fn object(&self) -> Option<&Object> {
        self.object.as_ref()
    }

    /// 手动注册的单例没有定义
    pub fn definition(&self) -> Option<&Arc<BeanDefinition>> {
        self.definition.as_ref()
    }

    pub(crate) fn advance(&mut self, to: LifecyclePhase) -> BeansResult<()> {
        if self.phase.next() != Some(to) {
            return Err(BeansError::IllegalState(format!(
                "Invalid lifecycle transition for bean '{}': {} -> {}",
                self.name, self.phase, to
            )));
        }
        tracing::trace!("Bean '{}' entered phase {}", self.name, to);
        self.phase = to;
        Ok(())
    }

    pub(crate) fn set_object(&mut self, object: Object) {
        self.object = Some(object);
    }

    pub(crate) fn add_destroy_callback(&mut self, callback: DestroyCallback) {
        self.destroy_callbacks.push(callback);
    }

    /// 执行销毁回调，错误只记录日志
    pub(crate) fn destroy(&mut self) {
        match self.phase {
            LifecyclePhase::Destroyed | LifecyclePhase::Stopping => return,
            LifecyclePhase::Ready => self.phase = LifecyclePhase::Stopping,
            other => {
                tracing::debug!("Destroying bean '{}' that never became ready (phase {})", self.name, other);
            }
        }

        if let Some(object) = self.object.clone() {
            for callback in &self.destroy_callbacks {
                run_destroy_callback(&self.name, &object, callback);
            }
        }
        self.phase = LifecyclePhase::Destroyed;
    }
}

fn run_destroy_callback(name: &str, object: &Object, callback: &DestroyCallback) {
    match callback {
        DestroyCallback::PostProcessor(processor) => {
            if let Err(err) = processor.post_process_before_destruction(object, name) {
                tracing::warn!("Destruction post processor failed on bean with name '{}': {:#}", name, err);
            }
        }
        DestroyCallback::Disposable => {
            tracing::trace!("Invoking destroy() on bean with name '{}'", name);
            if let Err(err) = object.destroy() {
                tracing::warn!("Invocation of destroy method failed on bean with name '{}': {:#}", name, err);
            }
        }
        DestroyCallback::Method { name: method, enforce } => match object.invoke_method(method) {
            Some(Ok(())) => {}
            Some(Err(err)) => {
                tracing::warn!(
                    "Invocation of destroy method '{}' failed on bean with name '{}': {:#}",
                    method,
                    name,
                    err
                );
            }
            None if *enforce => {
                tracing::warn!("Could not find a destroy method named '{}' on bean with name '{}'", method, name);
            }
            None => {
                tracing::trace!("No default destroy method named '{}' found on bean with name '{}'", method, name);
            }
        },
    }
}

impl DefaultListableBeanFactory {
    /// 按合并后的定义创建一个完整初始化的实例
    pub(crate) fn do_create_bean(&self, name: &str, mbd: &Arc<BeanDefinition>) -> BeansResult<Object> {
        let mut record = InstanceRecord::new(name, Some(Arc::clone(mbd)));

        let raw = self.create_bean_instance(name, mbd)?;
        record.set_object(Arc::clone(&raw));
        record.advance(LifecyclePhase::Instantiated)?;

        let early_exposure =
            mbd.is_singleton() && self.allows_circular_references() && self.singletons.is_currently_in_creation(name);
        if early_exposure {
            tracing::trace!(
                "Eagerly caching bean '{}' to allow for resolving potential circular references",
                name
            );
            let processors = self.post_processors();
            let early_raw = Arc::clone(&raw);
            let bean_name = name.to_string();
            self.singletons.add_singleton_factory(
                name,
                Box::new(move || {
                    processors
                        .iter()
                        .fold(early_raw, |object, processor| processor.get_early_bean_reference(object, &bean_name))
                }),
            );
        }

        self.populate_bean(name, mbd, &raw)?;
        record.advance(LifecyclePhase::PropertiesSet)?;

        self.invoke_aware_methods(name, &raw);
        record.advance(LifecyclePhase::AwareCallbacksDone)?;

        let object = self.apply_bean_post_processors_before_initialization(raw.clone(), name)?;
        record.set_object(Arc::clone(&object));
        record.advance(LifecyclePhase::PreInitProcessed)?;

        self.invoke_init_methods(name, &object, Some(mbd.as_ref()))?;
        record.advance(LifecyclePhase::InitInvoked)?;

        let mut object = self.apply_bean_post_processors_after_initialization(object, name)?;
        record.advance(LifecyclePhase::PostInitProcessed)?;

        if early_exposure {
            if let Some(early) = self.singletons.early_reference_if_exposed(name) {
                if Arc::ptr_eq(&object, &raw) {
                    object = early;
                } else if !Arc::ptr_eq(&object, &early) {
                    return Err(BeansError::creation(
                        name,
                        format!(
                            "Bean with name '{}' has been injected into other beans [{}] in its raw version as part of a circular reference, but has eventually been wrapped",
                            name,
                            self.singletons.dependents_of(name).join(",")
                        ),
                    ));
                }
            }
        }

        record.set_object(Arc::clone(&object));
        if mbd.is_singleton() {
            self.register_destroy_callbacks(&mut record, Some(mbd.as_ref()), &object);
        }
        record.advance(LifecyclePhase::Ready)?;
        if mbd.is_singleton() {
            self.singletons.register_record(record);
        }
        Ok(object)
    }

    fn create_bean_instance(&self, name: &str, mbd: &BeanDefinition) -> BeansResult<Object> {
        if let Some(factory_bean) = &mbd.factory_bean {
            return self.instantiate_using_factory_method(name, mbd, factory_bean);
        }

        let class_name = mbd
            .class_name
            .as_deref()
            .ok_or_else(|| BeansError::creation(name, "Bean definition has neither a class nor a factory bean"))?;
        let class = self
            .classes
            .get(class_name)
            .ok_or_else(|| BeansError::creation(name, format!("Bean class '{}' is not registered", class_name)))?;

        if !mbd.constructor_args.is_empty() {
            let arity = mbd.constructor_args.len();
            let constructor = class.constructor_with_arity(arity).ok_or_else(|| {
                BeansError::creation(
                    name,
                    format!("No constructor of bean class '{}' takes {} arguments", class_name, arity),
                )
            })?;
            let mut args = Vec::with_capacity(arity);
            for (spec, param) in mbd.constructor_args.iter().zip(constructor.params()) {
                args.push(self.resolve_value_spec(name, mbd, spec, Some(&param.ty))?);
            }
            return instantiate(name, constructor, Arguments::new(args));
        }

        let no_arg = class.no_arg_constructor();
        if mbd.autowire == AutowireMode::Constructor || (no_arg.is_none() && !class.constructors().is_empty()) {
            return self.autowire_constructor(name, &class);
        }

        let constructor = no_arg.ok_or_else(|| {
            BeansError::creation(name, format!("No default constructor found on bean class '{}'", class_name))
        })?;
        instantiate(name, constructor, Arguments::default())
    }

    /// 从参数最多的构造器开始，选第一个所有参数都能解析的
    fn autowire_constructor(&self, name: &str, class: &BeanClass) -> BeansResult<Object> {
        let mut last_error = None;
        for constructor in class.constructors_by_greed() {
            match self.resolve_constructor_arguments(name, constructor) {
                Ok(args) => return instantiate(name, constructor, args),
                Err(err) if err.is_no_such_bean() => {
                    tracing::trace!(
                        "Skipping constructor with {} parameters of bean '{}': {}",
                        constructor.arity(),
                        name,
                        err
                    );
                    last_error = Some(err);
                }
                Err(err) => return Err(err.wrap_creation(name, "Unsatisfied dependency expressed through constructor")),
            }
        }
        Err(match last_error {
            Some(err) => err.wrap_creation(name, "Unsatisfied dependency expressed through constructor"),
            None => BeansError::creation(name, format!("No constructors declared on bean class '{}'", class.name())),
        })
    }

    fn resolve_constructor_arguments(&self, name: &str, constructor: &Constructor) -> BeansResult<Arguments> {
        let mut args = Vec::with_capacity(constructor.arity());
        for param in constructor.params() {
            let descriptor = DependencyDescriptor::for_parameter(param, name);
            args.push(self.do_resolve_dependency(&descriptor, Some(name))?);
        }
        Ok(Arguments::new(args))
    }

    fn instantiate_using_factory_method(
        &self,
        name: &str,
        mbd: &BeanDefinition,
        factory_bean: &str,
    ) -> BeansResult<Object> {
        let method = mbd
            .factory_method
            .as_deref()
            .ok_or_else(|| BeansError::creation(name, "A factory bean requires a factory method"))?;
        let factory_name = self.registry.canonical_name(factory_bean);
        if factory_name == name {
            return Err(BeansError::creation(
                name,
                "factory-bean reference points back to the same bean definition",
            ));
        }

        let factory = self
            .get_bean(&factory_name)
            .map_err(|err| err.wrap_creation(name, format!("Failed to obtain factory bean '{}'", factory_bean)))?;
        self.singletons.register_dependent_bean(&factory_name, name);

        let mut args = Vec::with_capacity(mbd.constructor_args.len());
        for spec in &mbd.constructor_args {
            args.push(self.resolve_value_spec(name, mbd, spec, None)?);
        }

        match factory.factory_method(method, Arguments::new(args)) {
            Some(Ok(object)) => Ok(object),
            Some(Err(err)) => Err(BeansError::creation_caused_by(
                name,
                format!("Factory method '{}' threw exception", method),
                err,
            )),
            None => Err(BeansError::creation(
                name,
                format!("No factory method '{}' found on factory bean '{}'", method, factory_bean),
            )),
        }
    }

    /// 将值描述解析为注入值；被引用的 Bean 登记为 `owner` 的依赖
    pub(crate) fn resolve_value_spec(
        &self,
        owner: &str,
        owner_definition: &BeanDefinition,
        spec: &ValueSpec,
        target: Option<&TypeKey>,
    ) -> BeansResult<Value> {
        match spec {
            ValueSpec::Literal(raw) => self.type_converter().convert(raw, target).map_err(|err| {
                BeansError::creation_caused_by(owner, format!("Failed to convert value '{}'", raw), err)
            }),
            ValueSpec::Ref(reference) => {
                let object = self.get_bean(reference).map_err(|err| {
                    err.wrap_creation(owner, format!("Cannot resolve reference to bean '{}'", reference))
                })?;
                let referenced = self.registry.canonical_name(reference);
                self.singletons.register_dependent_bean(&referenced, owner);
                Ok(Value::Object(object))
            }
            ValueSpec::Bean(inner) => {
                let inner_name = self.next_inner_bean_name();
                let mut definition = match &inner.parent {
                    Some(parent) => {
                        let parent_definition = self.registry.get_merged_definition(parent).map_err(|err| {
                            err.wrap_creation(owner, format!("Cannot resolve parent of inner bean '{}'", inner_name))
                        })?;
                        inner.merged_with_parent(&parent_definition)
                    }
                    None => (**inner).clone(),
                };
                // 内部 Bean 跟随外部 Bean 的作用域
                if owner_definition.is_prototype() {
                    definition.scope = Some(Scope::Prototype);
                }
                let object = self
                    .do_create_bean(&inner_name, &Arc::new(definition))
                    .map_err(|err| err.wrap_creation(owner, format!("Cannot create inner bean '{}'", inner_name)))?;
                self.singletons.register_dependent_bean(&inner_name, owner);
                Ok(Value::Object(object))
            }
        }
    }

    fn populate_bean(&self, name: &str, mbd: &BeanDefinition, object: &Object) -> BeansResult<()> {
        let class = self.class_of(mbd);
        let mut applied: Vec<String> = Vec::new();

        for (property, spec) in &mbd.properties {
            let target = class
                .as_ref()
                .and_then(|class| class.find_property(property))
                .map(|descriptor| descriptor.ty.clone());
            let value = self.resolve_value_spec(name, mbd, spec, target.as_ref())?;
            set_property(name, object, property, value)?;
            applied.push(property.clone());
        }

        if let Some(class) = &class {
            match mbd.autowire {
                AutowireMode::ByName => self.autowire_by_name(name, class, object, &mut applied)?,
                AutowireMode::ByType => self.autowire_by_type(name, class, object, &mut applied)?,
                AutowireMode::No | AutowireMode::Constructor => {}
            }
            self.check_dependencies(name, mbd, class, &applied)?;
        }
        Ok(())
    }

    fn is_excluded_from_dependency_check(&self, property: &PropertyDescriptor) -> bool {
        self.registry.is_ignored_type(&property.ty)
            || property
                .declared_by
                .as_ref()
                .is_some_and(|interface| self.registry.is_ignored_interface(interface))
    }

    fn unsatisfied_object_properties<'c>(
        &self,
        class: &'c BeanClass,
        applied: &[String],
    ) -> Vec<&'c PropertyDescriptor> {
        class
            .properties()
            .iter()
            .filter(|property| {
                !property.is_simple()
                    && !applied.contains(&property.name)
                    && !self.is_excluded_from_dependency_check(property)
            })
            .collect()
    }

    fn autowire_by_name(
        &self,
        name: &str,
        class: &BeanClass,
        object: &Object,
        applied: &mut Vec<String>,
    ) -> BeansResult<()> {
        for property in self.unsatisfied_object_properties(class, applied) {
            if !self.contains_bean(&property.name) {
                tracing::trace!(
                    "Not autowiring property '{}' of bean '{}' by name: no matching bean found",
                    property.name,
                    name
                );
                continue;
            }
            let dependency = self.get_bean(&property.name).map_err(|err| {
                err.wrap_creation(name, format!("Could not autowire property '{}'", property.name))
            })?;
            let value = match property.kind {
                PropertyKind::Collection => Value::List(vec![dependency]),
                _ => Value::Object(dependency),
            };
            set_property(name, object, &property.name, value)?;
            let referenced = self.registry.canonical_name(&property.name);
            self.singletons.register_dependent_bean(&referenced, name);
            applied.push(property.name.clone());
            tracing::trace!(
                "Added autowiring by name from bean name '{}' via property '{}' to bean named '{}'",
                name,
                property.name,
                referenced
            );
        }
        Ok(())
    }

    fn autowire_by_type(
        &self,
        name: &str,
        class: &BeanClass,
        object: &Object,
        applied: &mut Vec<String>,
    ) -> BeansResult<()> {
        for property in self.unsatisfied_object_properties(class, applied) {
            let descriptor = DependencyDescriptor::for_property(property, name);
            let value = self.do_resolve_dependency(&descriptor, Some(name)).map_err(|err| {
                err.wrap_creation(
                    name,
                    format!("Unsatisfied dependency expressed through bean property '{}'", property.name),
                )
            })?;
            match &value {
                Value::Absent => continue,
                Value::List(items) if items.is_empty() => continue,
                _ => {}
            }
            set_property(name, object, &property.name, value)?;
            applied.push(property.name.clone());
        }
        Ok(())
    }

    fn check_dependencies(
        &self,
        name: &str,
        mbd: &BeanDefinition,
        class: &BeanClass,
        applied: &[String],
    ) -> BeansResult<()> {
        if mbd.dependency_check == DependencyCheck::None {
            return Ok(());
        }
        for property in class.properties() {
            if applied.contains(&property.name) || self.is_excluded_from_dependency_check(property) {
                continue;
            }
            let checked = match mbd.dependency_check {
                DependencyCheck::All => true,
                DependencyCheck::Simple => property.is_simple(),
                DependencyCheck::Objects => !property.is_simple(),
                DependencyCheck::None => false,
            };
            if checked {
                return Err(BeansError::creation(
                    name,
                    format!(
                        "Unsatisfied dependency expressed through bean property '{}': set this property value or disable dependency checking for this bean",
                        property.name
                    ),
                ));
            }
        }
        Ok(())
    }

    fn invoke_aware_methods(&self, name: &str, object: &Object) {
        if object.has_capability(Capability::BeanNameAware) {
            object.set_bean_name(name);
        }
        if object.has_capability(Capability::BeanFactoryAware) {
            match self.arc() {
                Ok(factory) => object.set_bean_factory(&factory),
                Err(err) => tracing::warn!("Cannot pass bean factory to bean '{}': {}", name, err),
            }
        }
        if object.has_capability(Capability::ApplicationContextAware) {
            if let Some(context) = self.application_context() {
                object.set_application_context(&context);
            }
        }
    }

    fn invoke_init_methods(&self, name: &str, object: &Object, mbd: Option<&BeanDefinition>) -> BeansResult<()> {
        let initializing = object.has_capability(Capability::InitializingBean);
        if initializing {
            tracing::trace!("Invoking after_properties_set() on bean with name '{}'", name);
            object
                .after_properties_set()
                .map_err(|err| BeansError::creation_caused_by(name, "Invocation of init method failed", err))?;
        }

        let Some(mbd) = mbd else {
            return Ok(());
        };
        let Some(method) = &mbd.init_method else {
            return Ok(());
        };
        if initializing && method == "after_properties_set" {
            return Ok(());
        }

        tracing::trace!("Invoking init method '{}' on bean with name '{}'", method, name);
        match object.invoke_method(method) {
            Some(Ok(())) => Ok(()),
            Some(Err(err)) => Err(BeansError::creation_caused_by(
                name,
                format!("Invocation of init method '{}' failed", method),
                err,
            )),
            None if mbd.enforce_init_method => Err(BeansError::creation(
                name,
                format!("Could not find an init method named '{}' on bean with name '{}'", method, name),
            )),
            None => {
                tracing::trace!("No default init method named '{}' found on bean with name '{}'", method, name);
                Ok(())
            }
        }
    }

    fn register_destroy_callbacks(&self, record: &mut InstanceRecord, mbd: Option<&BeanDefinition>, object: &Object) {
        for processor in self.destruction_processors().into_iter().rev() {
            if processor.requires_destruction(object) {
                record.add_destroy_callback(DestroyCallback::PostProcessor(processor));
            }
        }

        let disposable = object.has_capability(Capability::DisposableBean);
        if disposable {
            record.add_destroy_callback(DestroyCallback::Disposable);
        }

        if let Some(method) = mbd.and_then(|mbd| mbd.destroy_method.as_ref()) {
            if !(disposable && method == "destroy") {
                record.add_destroy_callback(DestroyCallback::Method {
                    name: method.clone(),
                    enforce: mbd.is_some_and(|mbd| mbd.enforce_destroy_method),
                });
            }
        }
    }

    /// 启动所有 Lifecycle 单例，被依赖者先启动
    pub(crate) fn start_lifecycle_beans(&self) {
        let mut visited = HashSet::new();
        for name in self.singletons.singleton_names() {
            self.start_bean(&name, &mut visited);
        }
    }

    fn start_bean(&self, name: &str, visited: &mut HashSet<String>) {
        if !visited.insert(name.to_string()) {
            return;
        }
        for dependency in self.singletons.dependencies_of(name) {
            self.start_bean(&dependency, visited);
        }
        if let Some(object) = self.singletons.get_singleton(name) {
            if object.has_capability(Capability::Lifecycle) && !object.is_running() {
                tracing::debug!("Starting bean '{}'", name);
                object.start();
            }
        }
    }

    /// 停止所有 Lifecycle 单例，依赖者先停止
    pub(crate) fn stop_lifecycle_beans(&self) {
        let mut visited = HashSet::new();
        for name in self.singletons.singleton_names().iter().rev() {
            self.stop_bean(name, &mut visited);
        }
    }

    fn stop_bean(&self, name: &str, visited: &mut HashSet<String>) {
        if !visited.insert(name.to_string()) {
            return;
        }
        for dependent in self.singletons.dependents_of(name) {
            self.stop_bean(&dependent, visited);
        }
        if let Some(object) = self.singletons.get_singleton(name) {
            if object.has_capability(Capability::Lifecycle) && object.is_running() {
                tracing::debug!("Stopping bean '{}'", name);
                object.stop();
            }
        }
    }

    /// 实现了 Lifecycle 的单例
    pub(crate) fn lifecycle_beans(&self) -> Vec<(String, Object)> {
        self.singletons
            .singleton_names()
            .into_iter()
            .filter_map(|name| self.singletons.get_singleton(&name).map(|object| (name, object)))
            .filter(|(_, object)| object.has_capability(Capability::Lifecycle))
            .collect()
    }
}

fn instantiate(name: &str, constructor: &Constructor, args: Arguments) -> BeansResult<Object> {
    constructor
        .instantiate(args)
        .map_err(|err| BeansError::creation_caused_by(name, "Instantiation of bean failed", err))
}

fn set_property(name: &str, object: &Object, property: &str, value: Value) -> BeansResult<()> {
    object
        .set_property(property, value)
        .map_err(|err| BeansError::creation_caused_by(name, format!("Error setting property '{}'", property), err))
}

impl AutowireCapableBeanFactory for DefaultListableBeanFactory {
    fn create_bean_of_class(&self, class_name: &str, mode: AutowireMode) -> BeansResult<Object> {
        let definition = BeanDefinition::new(class_name)
            .with_autowire(mode)
            .with_scope(Scope::Prototype);
        self.do_create_bean(class_name, &Arc::new(definition))
    }

    fn autowire_bean_properties(&self, object: &Object, class_name: &str, mode: AutowireMode) -> BeansResult<()> {
        let class = self
            .classes
            .get(class_name)
            .ok_or_else(|| BeansError::creation(class_name, format!("Bean class '{}' is not registered", class_name)))?;
        let mut applied = Vec::new();
        match mode {
            AutowireMode::ByName => self.autowire_by_name(class_name, &class, object, &mut applied),
            AutowireMode::ByType => self.autowire_by_type(class_name, &class, object, &mut applied),
            AutowireMode::No => Ok(()),
            AutowireMode::Constructor => Err(BeansError::IllegalState(
                "Constructor autowiring is not applicable to an existing instance".to_string(),
            )),
        }
    }

    fn configure_bean(&self, object: Object, name: &str) -> BeansResult<Object> {
        let mbd = self.registry.get_merged_definition(name)?;
        self.populate_bean(name, &mbd, &object)?;
        self.initialize_bean(object, name)
    }

    fn initialize_bean(&self, object: Object, name: &str) -> BeansResult<Object> {
        let mbd = self.registry.get_merged_definition(name).ok();
        self.invoke_aware_methods(name, &object);
        let object = self.apply_bean_post_processors_before_initialization(object, name)?;
        self.invoke_init_methods(name, &object, mbd.as_deref())?;
        self.apply_bean_post_processors_after_initialization(object, name)
    }

    fn apply_bean_post_processors_before_initialization(&self, object: Object, name: &str) -> BeansResult<Object> {
        let mut current = object;
        for processor in self.post_processors() {
            current = processor.post_process_before_initialization(current, name).map_err(|err| {
                BeansError::creation_caused_by(
                    name,
                    format!("Bean post processor '{}' failed before initialization", processor.name()),
                    err,
                )
            })?;
        }
        Ok(current)
    }

    fn apply_bean_post_processors_after_initialization(&self, object: Object, name: &str) -> BeansResult<Object> {
        let mut current = object;
        for processor in self.post_processors() {
            current = processor.post_process_after_initialization(current, name).map_err(|err| {
                BeansError::creation_caused_by(
                    name,
                    format!("Bean post processor '{}' failed after initialization", processor.name()),
                    err,
                )
            })?;
        }
        Ok(current)
    }

    fn destroy_bean(&self, object: Object, name: &str) {
        let mbd = self.registry.get_merged_definition(name).ok();
        let mut record = InstanceRecord::external(name, Arc::clone(&object));
        self.register_destroy_callbacks(&mut record, mbd.as_deref(), &object);
        record.destroy();
    }

    fn resolve_named_bean(&self, ty: &TypeKey) -> BeansResult<(String, Object)> {
        self.do_resolve_named_bean(ty)
    }

    fn resolve_dependency(&self, descriptor: &DependencyDescriptor, requesting_bean: Option<&str>) -> BeansResult<Value> {
        self.do_resolve_dependency(descriptor, requesting_bean)
    }
}
