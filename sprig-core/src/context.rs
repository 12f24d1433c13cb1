use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::SystemTime;

use parking_lot::{Mutex, RwLock};

use crate::bean::{Bean, Object};
use crate::bean_factory::{
    BeanFactory, ConfigurableBeanFactory, ConfigurableListableBeanFactory, DefaultListableBeanFactory,
    HierarchicalBeanFactory, ListableBeanFactory,
};
use crate::bean_post_processor::{BeanFactoryPostProcessor, BeanPostProcessor};
use crate::class::{BeanClass, TypeKey};
use crate::config::{Environment, PropertySource};
use crate::constants::{
    APPLICATION_CONTEXT_AWARE_TYPE, APPLICATION_CONTEXT_TYPE, BEAN_FACTORY_AWARE_TYPE, ENVIRONMENT_BEAN_NAME,
    ENVIRONMENT_TYPE,
};
use crate::error::{BeansError, BeansResult};
use crate::loader::ConfigLoader;
use crate::parsing::{CollectingProblemReporter, EmptyReaderEventListener, Problem, ReaderEventListener};
use crate::registry::{BeanDefinitionRegistry, ResolvableDependency};
use crate::resource::{FileSystemResourceLoader, ResourceLoader};

/// Shutdown hook类型
pub type ShutdownHook = Box<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

static CONTEXT_SEQUENCE: AtomicUsize = AtomicUsize::new(0);

/// 上下文状态
///
/// 刷新只能进行一次：失败后上下文不可再用，只能丢弃
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Created,
    Refreshing,
    Active,
    Failed,
    Closed,
}

/// 应用上下文
///
/// 组合 Bean 工厂、Environment 与配置加载器，负责启动时加载定义、
/// 预实例化单例，以及关闭时的停止与销毁
pub struct ApplicationContext {
    id: String,
    display_name: String,
    startup_date: RwLock<Option<SystemTime>>,

    /// 父上下文（不持有所有权）
    parent: Option<Weak<ApplicationContext>>,

    /// Bean 工厂 - 负责 Bean 的创建和管理
    bean_factory: Arc<DefaultListableBeanFactory>,

    environment: Arc<Environment>,
    resource_loader: Arc<dyn ResourceLoader>,
    config_locations: Vec<String>,
    problems: Arc<CollectingProblemReporter>,
    event_listener: Arc<dyn ReaderEventListener>,
    fail_on_problems: bool,

    /// Bean 工厂后置处理器列表（按优先级排序）
    bean_factory_post_processors: RwLock<Vec<Arc<dyn BeanFactoryPostProcessor>>>,

    shutdown_hooks: RwLock<Vec<ShutdownHook>>,
    state: Mutex<ContextState>,
    running: AtomicBool,
    self_ref: Weak<ApplicationContext>,
}

impl ApplicationContext {
    /// 构建器模式创建上下文
    pub fn builder() -> ApplicationContextBuilder {
        ApplicationContextBuilder::new()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// 最近一次刷新开始的时间
    pub fn startup_date(&self) -> Option<SystemTime> {
        *self.startup_date.read()
    }

    /// 父上下文已被释放时返回 `None`
    pub fn parent(&self) -> Option<Arc<ApplicationContext>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// 获取内部的 BeanFactory（用于 BeanFactoryPostProcessor）
    pub fn bean_factory(&self) -> &Arc<DefaultListableBeanFactory> {
        &self.bean_factory
    }

    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    pub fn config_locations(&self) -> &[String] {
        &self.config_locations
    }

    pub fn state(&self) -> ContextState {
        *self.state.lock()
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state(), ContextState::Refreshing | ContextState::Active)
    }

    /// 加载配置时报告的问题
    pub fn problems(&self) -> Vec<Problem> {
        self.problems.errors()
    }

    /// 注册 shutdown hook
    ///
    /// Shutdown hook 会在应用关闭时按注册顺序执行
    pub fn register_shutdown_hook<F>(&self, hook: F)
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut hooks = self.shutdown_hooks.write();
        hooks.push(Box::new(hook));
        tracing::debug!("Registered shutdown hook, total: {}", hooks.len());
    }

    /// 注册 BeanFactoryPostProcessor
    ///
    /// 在 Bean 定义加载后、Bean 实例化之前执行，order 越小越先执行
    pub fn add_bean_factory_post_processor(&self, processor: Arc<dyn BeanFactoryPostProcessor>) {
        let mut processors = self.bean_factory_post_processors.write();
        processors.push(processor);
        // 稳定排序，相同 order 保持注册顺序
        processors.sort_by_key(|p| p.order());
    }

    pub fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        self.bean_factory.add_bean_post_processor(processor);
    }

    /// 加载配置、准备工厂、执行后置处理器、冻结配置并预实例化非延迟单例
    ///
    /// 只能调用一次。失败时已创建的单例会被销毁，上下文进入 `Failed` 状态
    pub fn refresh(&self) -> BeansResult<()> {
        {
            let mut state = self.state.lock();
            if *state != ContextState::Created {
                return Err(BeansError::IllegalState(format!(
                    "{} does not support multiple refresh attempts (current state: {:?})",
                    self.display_name, *state
                )));
            }
            *state = ContextState::Refreshing;
        }
        *self.startup_date.write() = Some(SystemTime::now());
        tracing::info!("Refreshing {}", self.display_name);

        match self.do_refresh() {
            Ok(()) => {
                *self.state.lock() = ContextState::Active;
                tracing::info!(
                    "{} refreshed with {} bean definition(s)",
                    self.display_name,
                    self.bean_factory.get_bean_definition_count()
                );
                Ok(())
            }
            Err(err) => {
                tracing::warn!(
                    "Exception encountered during context initialization - cancelling refresh attempt: {}",
                    err
                );
                self.bean_factory.destroy_singletons();
                *self.state.lock() = ContextState::Failed;
                Err(err)
            }
        }
    }

    fn do_refresh(&self) -> BeansResult<()> {
        self.load_bean_definitions()?;
        self.prepare_bean_factory()?;
        self.invoke_bean_factory_post_processors()?;

        self.bean_factory.clear_metadata_cache();
        self.bean_factory.freeze_configuration();
        self.bean_factory.preinstantiate_singletons()
    }

    fn load_bean_definitions(&self) -> BeansResult<()> {
        if self.config_locations.is_empty() {
            return Ok(());
        }
        let mut loader = ConfigLoader::new(self.bean_factory.as_ref(), &self.environment)
            .with_resource_loader(Arc::clone(&self.resource_loader))
            .with_problem_reporter(self.problems.clone())
            .with_event_listener(Arc::clone(&self.event_listener));

        for location in &self.config_locations {
            let count = loader.load(location)?;
            tracing::debug!("Loaded {} bean definition(s) from location [{}]", count, location);
        }

        if self.fail_on_problems && loader.error_count() > 0 {
            if let Some(first) = self.problems.errors().into_iter().next() {
                return Err(BeansError::ConfigurationParse(first));
            }
        }
        Ok(())
    }

    fn prepare_bean_factory(&self) -> BeansResult<()> {
        let factory = &self.bean_factory;

        factory.ignore_dependency_interface(BEAN_FACTORY_AWARE_TYPE);
        factory.ignore_dependency_interface(APPLICATION_CONTEXT_AWARE_TYPE);

        let weak = self.self_ref.clone();
        factory.register_resolvable_dependency(
            APPLICATION_CONTEXT_TYPE,
            ResolvableDependency::Lazy(Arc::new(move || weak.upgrade().map(|context| context as Object))),
        );
        factory.bind_application_context(self.self_ref.clone());

        if !factory.contains_local_bean(ENVIRONMENT_BEAN_NAME) {
            factory.register_singleton_with_types(
                ENVIRONMENT_BEAN_NAME,
                Arc::clone(&self.environment) as Object,
                vec![ENVIRONMENT_TYPE],
            )?;
        }
        Ok(())
    }

    /// 调用所有 BeanFactoryPostProcessor
    fn invoke_bean_factory_post_processors(&self) -> BeansResult<()> {
        let processors = self.bean_factory_post_processors.read().clone();

        if processors.is_empty() {
            tracing::debug!("No BeanFactoryPostProcessors to invoke");
            return Ok(());
        }

        tracing::debug!("Invoking {} BeanFactoryPostProcessor(s)", processors.len());
        for processor in processors {
            processor
                .post_process_bean_factory(&self.bean_factory)
                .map_err(|err| BeansError::creation_caused_by(processor.name(), "BeanFactoryPostProcessor failed", err))?;
        }
        Ok(())
    }

    fn assert_active(&self) -> BeansResult<()> {
        match self.state() {
            ContextState::Refreshing | ContextState::Active => Ok(()),
            ContextState::Created => Err(BeansError::IllegalState(format!(
                "{} has not been refreshed yet",
                self.display_name
            ))),
            ContextState::Failed | ContextState::Closed => Err(BeansError::IllegalState(format!(
                "{} has been closed already",
                self.display_name
            ))),
        }
    }

    /// 启动所有 Lifecycle 单例，已经运行的组件不受影响
    pub fn start(&self) -> BeansResult<()> {
        self.assert_active()?;
        self.bean_factory.start_lifecycle_beans();
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// 停止所有 Lifecycle 单例，已经停止的组件不受影响
    pub fn stop(&self) {
        self.bean_factory.stop_lifecycle_beans();
        self.running.store(false, Ordering::SeqCst);
    }

    /// 上下文已启动，且每个 Lifecycle 组件都在运行
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
            && self.is_active()
            && self
                .bean_factory
                .lifecycle_beans()
                .iter()
                .all(|(_, object)| object.is_running())
    }

    /// 关闭上下文：执行 shutdown hooks、停止 Lifecycle 组件、销毁所有单例
    ///
    /// 重复调用无副作用
    pub fn close(&self) {
        {
            let mut state = self.state.lock();
            if *state == ContextState::Closed {
                return;
            }
            *state = ContextState::Closed;
        }
        tracing::info!("Closing {}", self.display_name);

        let hooks = self.shutdown_hooks.read();
        tracing::debug!("Executing {} shutdown hook(s)", hooks.len());
        for (idx, hook) in hooks.iter().enumerate() {
            match hook() {
                Ok(()) => tracing::debug!("Shutdown hook {} executed successfully", idx + 1),
                Err(e) => tracing::warn!("Shutdown hook {} failed: {}", idx + 1, e),
            }
        }
        drop(hooks);

        if self.running.swap(false, Ordering::SeqCst) {
            self.bean_factory.stop_lifecycle_beans();
        }
        self.bean_factory.destroy_singletons();
        tracing::info!("{} closed", self.display_name);
    }
}

impl fmt::Debug for ApplicationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationContext")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("state", &self.state())
            .field("config_locations", &self.config_locations)
            .finish()
    }
}

impl Bean for ApplicationContext {}

impl BeanFactory for ApplicationContext {
    fn get_bean(&self, name: &str) -> BeansResult<Object> {
        self.assert_active()?;
        self.bean_factory.get_bean(name)
    }

    fn get_bean_of_type(&self, ty: &TypeKey) -> BeansResult<Object> {
        self.assert_active()?;
        self.bean_factory.get_bean_of_type(ty)
    }

    fn contains_bean(&self, name: &str) -> bool {
        self.bean_factory.contains_bean(name)
    }

    fn is_singleton(&self, name: &str) -> BeansResult<bool> {
        self.bean_factory.is_singleton(name)
    }

    fn is_prototype(&self, name: &str) -> BeansResult<bool> {
        self.bean_factory.is_prototype(name)
    }

    fn is_type_match(&self, name: &str, ty: &TypeKey) -> BeansResult<bool> {
        self.bean_factory.is_type_match(name, ty)
    }
}

impl ListableBeanFactory for ApplicationContext {
    fn get_bean_names(&self) -> Vec<String> {
        self.bean_factory.get_bean_names()
    }

    fn get_bean_names_for_type(&self, ty: &TypeKey) -> Vec<String> {
        self.bean_factory.get_bean_names_for_type(ty)
    }

    fn get_beans_of_type(&self, ty: &TypeKey) -> BeansResult<Vec<(String, Object)>> {
        self.assert_active()?;
        self.bean_factory.get_beans_of_type(ty)
    }
}

/// 应用上下文构建器
pub struct ApplicationContextBuilder {
    id: Option<String>,
    display_name: Option<String>,
    parent: Option<Arc<ApplicationContext>>,
    config_locations: Vec<String>,
    environment: Option<Arc<Environment>>,
    property_sources: Vec<Box<dyn PropertySource>>,
    active_profiles: Option<Vec<String>>,
    resource_loader: Arc<dyn ResourceLoader>,
    event_listener: Arc<dyn ReaderEventListener>,
    fail_on_problems: bool,
    allow_circular_references: bool,
    classes: Vec<BeanClass>,
    bean_post_processors: Vec<Arc<dyn BeanPostProcessor>>,
    bean_factory_post_processors: Vec<Arc<dyn BeanFactoryPostProcessor>>,
}

impl ApplicationContextBuilder {
    pub fn new() -> Self {
        Self {
            id: None,
            display_name: None,
            parent: None,
            config_locations: Vec::new(),
            environment: None,
            property_sources: Vec::new(),
            active_profiles: None,
            resource_loader: Arc::new(FileSystemResourceLoader::default()),
            event_listener: Arc::new(EmptyReaderEventListener),
            fail_on_problems: true,
            allow_circular_references: true,
            classes: Vec::new(),
            bean_post_processors: Vec::new(),
            bean_factory_post_processors: Vec::new(),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// 子上下文的工厂以父上下文的工厂为父工厂
    pub fn parent(mut self, parent: &Arc<ApplicationContext>) -> Self {
        self.parent = Some(Arc::clone(parent));
        self
    }

    pub fn config_location(mut self, location: impl Into<String>) -> Self {
        self.config_locations.push(location.into());
        self
    }

    pub fn config_locations<I, S>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config_locations.extend(locations.into_iter().map(Into::into));
        self
    }

    pub fn environment(mut self, environment: Arc<Environment>) -> Self {
        self.environment = Some(environment);
        self
    }

    /// 添加配置源到 Environment
    pub fn add_property_source(mut self, source: Box<dyn PropertySource>) -> Self {
        self.property_sources.push(source);
        self
    }

    /// 设置激活的 profiles
    pub fn active_profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.active_profiles = Some(profiles.into_iter().map(Into::into).collect());
        self
    }

    pub fn resource_loader(mut self, loader: Arc<dyn ResourceLoader>) -> Self {
        self.resource_loader = loader;
        self
    }

    pub fn event_listener(mut self, listener: Arc<dyn ReaderEventListener>) -> Self {
        self.event_listener = listener;
        self
    }

    /// 为 false 时，配置问题只记录，刷新继续进行
    pub fn fail_on_problems(mut self, fail: bool) -> Self {
        self.fail_on_problems = fail;
        self
    }

    pub fn allow_circular_references(mut self, allow: bool) -> Self {
        self.allow_circular_references = allow;
        self
    }

    pub fn register_class(mut self, class: BeanClass) -> Self {
        self.classes.push(class);
        self
    }

    pub fn bean_post_processor(mut self, processor: Arc<dyn BeanPostProcessor>) -> Self {
        self.bean_post_processors.push(processor);
        self
    }

    pub fn bean_factory_post_processor(mut self, processor: Arc<dyn BeanFactoryPostProcessor>) -> Self {
        self.bean_factory_post_processors.push(processor);
        self
    }

    /// 构建上下文（尚未刷新）
    pub fn build(self) -> Arc<ApplicationContext> {
        let sequence = CONTEXT_SEQUENCE.fetch_add(1, Ordering::SeqCst);
        let id = self.id.unwrap_or_else(|| format!("application-{}", sequence));
        let display_name = self
            .display_name
            .unwrap_or_else(|| format!("ApplicationContext[{}]", id));

        let environment = self.environment.unwrap_or_else(|| Arc::new(Environment::new()));
        for source in self.property_sources {
            environment.add_property_source(source);
        }
        if let Some(profiles) = self.active_profiles {
            environment.set_active_profiles(profiles);
        }

        let bean_factory = match &self.parent {
            Some(parent) => DefaultListableBeanFactory::with_parent(Arc::clone(parent.bean_factory())),
            None => DefaultListableBeanFactory::new(),
        };
        bean_factory.set_allow_circular_references(self.allow_circular_references);
        bean_factory.type_registry().register_submitted();
        for class in self.classes {
            bean_factory.register_class(class);
        }
        for processor in self.bean_post_processors {
            bean_factory.add_bean_post_processor(processor);
        }

        let mut factory_processors = self.bean_factory_post_processors;
        factory_processors.sort_by_key(|p| p.order());

        Arc::new_cyclic(|self_ref| ApplicationContext {
            id,
            display_name,
            startup_date: RwLock::new(None),
            parent: self.parent.as_ref().map(Arc::downgrade),
            bean_factory,
            environment,
            resource_loader: self.resource_loader,
            config_locations: self.config_locations,
            problems: Arc::new(CollectingProblemReporter::new()),
            event_listener: self.event_listener,
            fail_on_problems: self.fail_on_problems,
            bean_factory_post_processors: RwLock::new(factory_processors),
            shutdown_hooks: RwLock::new(Vec::new()),
            state: Mutex::new(ContextState::Created),
            running: AtomicBool::new(false),
            self_ref: self_ref.clone(),
        })
    }
}

impl Default for ApplicationContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bean::{downcast_object, Capability, Value};
    use crate::bean_factory::{AutowireCapableBeanFactory, BeanFactoryExt};
    use crate::class::Parameter;
    use crate::resource::InMemoryResourceLoader;

    #[derive(Default)]
    struct Server {
        running: AtomicBool,
        port: Mutex<String>,
    }

    impl Bean for Server {
        fn capabilities(&self) -> &'static [Capability] {
            &[Capability::Lifecycle]
        }

        fn set_property(&self, name: &str, value: Value) -> anyhow::Result<()> {
            match name {
                "port" => *self.port.lock() = value.parse()?,
                _ => return Err(crate::bean::unknown_property(name)),
            }
            Ok(())
        }

        fn start(&self) {
            self.running.store(true, Ordering::SeqCst);
        }

        fn stop(&self) {
            self.running.store(false, Ordering::SeqCst);
        }

        fn is_running(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }
    }

    struct ContextHolder {
        context: Mutex<Option<Arc<ApplicationContext>>>,
    }

    impl Bean for ContextHolder {
        fn capabilities(&self) -> &'static [Capability] {
            &[Capability::ApplicationContextAware]
        }

        fn set_application_context(&self, context: &Arc<ApplicationContext>) {
            *self.context.lock() = Some(Arc::clone(context));
        }
    }

    fn server_class() -> BeanClass {
        BeanClass::new("Server")
            .default_constructor(|| Ok(Server::default()))
            .property(crate::class::PropertyDescriptor::simple("port"))
    }

    fn files() -> Arc<InMemoryResourceLoader> {
        Arc::new(InMemoryResourceLoader::new().with_file(
            "app.toml",
            r#"
            [[bean]]
            name = "server"
            class = "Server"
            [[bean.property]]
            name = "port"
            value = "${server.port:8080}"
            "#,
        ))
    }

    #[test]
    fn test_refresh_start_stop_close() {
        let context = ApplicationContext::builder()
            .config_location("app.toml")
            .resource_loader(files())
            .register_class(server_class())
            .build();

        assert_eq!(context.state(), ContextState::Created);
        assert!(context.get_bean("server").is_err());

        context.refresh().unwrap();
        assert!(context.startup_date().is_some());
        let server = context.get_bean_typed::<Server>("server").unwrap();
        assert_eq!(*server.port.lock(), "8080");
        assert!(!context.is_running());

        context.start().unwrap();
        context.start().unwrap();
        assert!(context.is_running());
        assert!(server.is_running());

        context.stop();
        context.stop();
        assert!(!context.is_running());

        context.start().unwrap();
        context.close();
        context.close();
        assert!(!server.is_running());
        assert_eq!(context.state(), ContextState::Closed);
        assert!(matches!(context.get_bean("server"), Err(BeansError::IllegalState(_))));
    }

    #[test]
    fn test_refresh_is_one_shot() {
        let context = ApplicationContext::builder().build();
        context.refresh().unwrap();
        assert!(matches!(context.refresh(), Err(BeansError::IllegalState(_))));
    }

    #[test]
    fn test_environment_and_context_are_injectable() {
        let context = ApplicationContext::builder()
            .register_class(
                BeanClass::new("Holder").default_constructor(|| {
                    Ok(ContextHolder {
                        context: Mutex::new(None),
                    })
                }),
            )
            .build();
        context
            .bean_factory()
            .register_bean_definition("holder", crate::definition::BeanDefinition::new("Holder"))
            .unwrap();
        context.refresh().unwrap();

        let holder = context.get_bean_typed::<ContextHolder>("holder").unwrap();
        let seen = holder.context.lock().clone().unwrap();
        assert!(Arc::ptr_eq(&seen, &context));

        let environment = context.get_bean_of_type(&ENVIRONMENT_TYPE).unwrap();
        assert!(downcast_object::<Environment>(&environment).is_some());

        let resolved = context
            .bean_factory()
            .resolve_dependency(
                &crate::resolver::DependencyDescriptor::single(APPLICATION_CONTEXT_TYPE),
                None,
            )
            .unwrap();
        assert!(resolved.as_object().is_some_and(|o| o.is::<ApplicationContext>()));
    }

    #[test]
    fn test_failed_refresh_destroys_created_singletons() {
        let files = Arc::new(InMemoryResourceLoader::new().with_file(
            "app.toml",
            r#"
            [[bean]]
            name = "server"
            class = "Server"

            [[bean]]
            name = "needsMissing"
            class = "NeedsMissing"
            constructor_args = [{ ref = "missing" }]
            "#,
        ));
        let context = ApplicationContext::builder()
            .config_location("app.toml")
            .resource_loader(files)
            .register_class(server_class())
            .register_class(BeanClass::new("NeedsMissing").constructor(
                vec![Parameter::new("server", "Server")],
                |_args| Ok(ContextHolder {
                    context: Mutex::new(None),
                }),
            ))
            .build();

        assert!(context.refresh().is_err());
        assert_eq!(context.state(), ContextState::Failed);
        assert_eq!(context.bean_factory().singleton_registry().singleton_count(), 0);
        assert!(matches!(context.refresh(), Err(BeansError::IllegalState(_))));
    }

    #[test]
    fn test_configuration_problems_fail_refresh_unless_lenient() {
        let content = "[[bean]]\nname = \"\"\nclass = \"Server\"\n";
        let strict = ApplicationContext::builder()
            .config_location("app.toml")
            .resource_loader(Arc::new(InMemoryResourceLoader::new().with_file("app.toml", content)))
            .build();
        assert!(matches!(strict.refresh(), Err(BeansError::ConfigurationParse(_))));

        let lenient = ApplicationContext::builder()
            .config_location("app.toml")
            .resource_loader(Arc::new(InMemoryResourceLoader::new().with_file("app.toml", content)))
            .fail_on_problems(false)
            .build();
        lenient.refresh().unwrap();
        assert_eq!(lenient.problems().len(), 1);
    }

    #[test]
    fn test_shutdown_hooks_run_before_destroy() {
        let context = ApplicationContext::builder().build();
        context.refresh().unwrap();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&calls);
        context.register_shutdown_hook(move || {
            recorded.lock().push("hook");
            Ok(())
        });
        context.register_shutdown_hook(|| Err(anyhow::anyhow!("ignored")));
        context.close();
        assert_eq!(*calls.lock(), vec!["hook"]);
    }

    #[test]
    fn test_child_context_sees_parent_beans() {
        let parent = ApplicationContext::builder()
            .config_location("app.toml")
            .resource_loader(files())
            .register_class(server_class())
            .build();
        parent.refresh().unwrap();

        let child = ApplicationContext::builder().parent(&parent).build();
        child.refresh().unwrap();

        assert!(Arc::ptr_eq(&child.parent().unwrap(), &parent));
        let from_child = child.get_bean("server").unwrap();
        let from_parent = parent.get_bean("server").unwrap();
        assert!(Arc::ptr_eq(&from_child, &from_parent));
        assert!(!child.bean_factory().contains_local_bean("server"));
    }
}
