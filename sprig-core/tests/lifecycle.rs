use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use sprig_core::{
    ApplicationContext, ApplicationContextBuilder, Bean, BeanClass, BeanDefinition, BeanDefinitionRegistry, BeanFactory, BeanPostProcessor,
    BeansError, Capability, ContextState, DefaultListableBeanFactory, InMemoryResourceLoader, LifecyclePhase, Object,
    Parameter, PropertyDescriptor, Value,
};

type Log = Arc<Mutex<Vec<String>>>;

struct Recorder {
    label: &'static str,
    log: Log,
}

impl Recorder {
    fn record(&self, event: &str) {
        self.log.lock().push(format!("{}:{}", event, self.label));
    }
}

impl Bean for Recorder {
    fn capabilities(&self) -> &'static [Capability] {
        &[
            Capability::BeanNameAware,
            Capability::BeanFactoryAware,
            Capability::ApplicationContextAware,
            Capability::InitializingBean,
            Capability::DisposableBean,
        ]
    }

    fn set_bean_name(&self, _name: &str) {
        self.record("name");
    }

    fn set_bean_factory(&self, _factory: &Arc<DefaultListableBeanFactory>) {
        self.record("factory");
    }

    fn set_application_context(&self, _context: &Arc<ApplicationContext>) {
        self.record("context");
    }

    fn after_properties_set(&self) -> anyhow::Result<()> {
        self.record("after_properties_set");
        Ok(())
    }

    fn invoke_method(&self, name: &str) -> Option<anyhow::Result<()>> {
        (name == "init").then(|| {
            self.record("init");
            Ok(())
        })
    }

    fn destroy(&self) -> anyhow::Result<()> {
        self.record("destroy");
        Ok(())
    }
}

/// Records every call; the first one also swaps the original instance out.
struct Tagging {
    tag: &'static str,
    substitute: bool,
    log: Log,
}

impl Tagging {
    fn label_of(bean: &Object) -> &'static str {
        bean.downcast_ref::<Recorder>().map(|r| r.label).unwrap_or("?")
    }
}

impl BeanPostProcessor for Tagging {
    fn post_process_before_initialization(&self, bean: Object, _bean_name: &str) -> anyhow::Result<Object> {
        self.log
            .lock()
            .push(format!("before:{}:{}", self.tag, Self::label_of(&bean)));
        if self.substitute {
            return Ok(Arc::new(Recorder {
                label: "substitute",
                log: Arc::clone(&self.log),
            }));
        }
        Ok(bean)
    }

    fn post_process_after_initialization(&self, bean: Object, _bean_name: &str) -> anyhow::Result<Object> {
        self.log
            .lock()
            .push(format!("after:{}:{}", self.tag, Self::label_of(&bean)));
        Ok(bean)
    }
}

#[test]
fn callbacks_run_in_order_against_the_substituted_instance() {
    let log: Log = Arc::default();
    let class_log = Arc::clone(&log);
    let files = InMemoryResourceLoader::new().with_file(
        "beans.toml",
        "[[bean]]\nname = \"recorder\"\nclass = \"Recorder\"\ninit_method = \"init\"\n",
    );
    let context = ApplicationContext::builder()
        .config_location("beans.toml")
        .resource_loader(Arc::new(files))
        .register_class(BeanClass::new("Recorder").default_constructor(move || {
            Ok(Recorder {
                label: "original",
                log: Arc::clone(&class_log),
            })
        }))
        .bean_post_processor(Arc::new(Tagging {
            tag: "first",
            substitute: true,
            log: Arc::clone(&log),
        }))
        .bean_post_processor(Arc::new(Tagging {
            tag: "second",
            substitute: false,
            log: Arc::clone(&log),
        }))
        .build();
    context.refresh().unwrap();

    assert_eq!(
        *log.lock(),
        vec![
            "name:original",
            "factory:original",
            "context:original",
            "before:first:original",
            "before:second:substitute",
            "after_properties_set:substitute",
            "init:substitute",
            "after:first:substitute",
            "after:second:substitute",
        ]
    );
    let recorder = context.get_bean("recorder").unwrap();
    assert_eq!(recorder.downcast_ref::<Recorder>().unwrap().label, "substitute");
    assert_eq!(
        context.bean_factory().lifecycle_phase("recorder"),
        Some(LifecyclePhase::Ready)
    );

    log.lock().clear();
    context.close();
    assert_eq!(*log.lock(), vec!["destroy:substitute"]);
}

struct Link {
    name: Mutex<String>,
    next: Mutex<Option<Object>>,
    log: Log,
}

impl Bean for Link {
    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::BeanNameAware, Capability::DisposableBean]
    }

    fn set_property(&self, name: &str, value: Value) -> anyhow::Result<()> {
        match name {
            "next" => *self.next.lock() = value.as_object().cloned(),
            _ => return Err(sprig_core::unknown_property(name)),
        }
        Ok(())
    }

    fn set_bean_name(&self, name: &str) {
        *self.name.lock() = name.to_string();
    }

    fn invoke_method(&self, name: &str) -> Option<anyhow::Result<()>> {
        (name == "explode").then(|| Err(anyhow::anyhow!("{} cannot initialize", self.name.lock())))
    }

    fn destroy(&self) -> anyhow::Result<()> {
        let name = self.name.lock().clone();
        self.log.lock().push(name.clone());
        if name == "b" {
            anyhow::bail!("b refuses to go quietly");
        }
        Ok(())
    }
}

fn link_context(log: &Log, config: &str) -> Arc<ApplicationContext> {
    link_builder(log, config).build()
}

fn link_builder(log: &Log, config: &str) -> ApplicationContextBuilder {
    let class_log = Arc::clone(log);
    ApplicationContext::builder()
        .config_location("links.toml")
        .resource_loader(Arc::new(InMemoryResourceLoader::new().with_file("links.toml", config)))
        .register_class(
            BeanClass::new("Link")
                .default_constructor(move || {
                    Ok(Link {
                        name: Mutex::new(String::new()),
                        next: Mutex::new(None),
                        log: Arc::clone(&class_log),
                    })
                })
                .property(PropertyDescriptor::object("next", "Link")),
        )
}

#[test]
fn dependents_are_destroyed_before_their_dependencies() {
    let log: Log = Arc::default();
    let context = link_context(
        &log,
        r#"
        [[bean]]
        name = "a"
        class = "Link"
        property = [{ name = "next", ref = "b" }]

        [[bean]]
        name = "b"
        class = "Link"
        property = [{ name = "next", ref = "c" }]

        [[bean]]
        name = "c"
        class = "Link"
        "#,
    );
    context.refresh().unwrap();

    // never started: closing still destroys everything, and a failing destroy does not stop the rest
    context.close();
    assert_eq!(*log.lock(), vec!["a", "b", "c"]);
    assert!(context.get_bean("a").is_err());
}

#[test]
fn property_cycle_is_resolved_through_early_references() {
    let log: Log = Arc::default();
    let context = link_context(
        &log,
        r#"
        [[bean]]
        name = "x"
        class = "Link"
        property = [{ name = "next", ref = "y" }]

        [[bean]]
        name = "y"
        class = "Link"
        property = [{ name = "next", ref = "x" }]
        "#,
    );
    context.refresh().unwrap();

    let x = context.get_bean("x").unwrap();
    let y = context.get_bean("y").unwrap();
    let x_next = x.downcast_ref::<Link>().unwrap().next.lock().clone().unwrap();
    let y_next = y.downcast_ref::<Link>().unwrap().next.lock().clone().unwrap();
    assert!(Arc::ptr_eq(&x_next, &y));
    assert!(Arc::ptr_eq(&y_next, &x));
    context.close();
}

fn failed_bean(err: &BeansError) -> Option<&str> {
    match err {
        BeansError::Creation { bean, .. } => Some(bean.as_str()),
        _ => None,
    }
}

#[test]
fn failed_lazy_bean_tears_down_dependents_holding_its_early_reference() {
    let log: Log = Arc::default();
    let context = link_context(
        &log,
        r#"
        [[bean]]
        name = "a"
        class = "Link"
        lazy_init = true
        init_method = "explode"
        property = [{ name = "next", ref = "b" }]

        [[bean]]
        name = "b"
        class = "Link"
        lazy_init = true
        property = [{ name = "next", ref = "a" }]
        "#,
    );
    context.refresh().unwrap();

    let err = context.get_bean("a").unwrap_err();
    assert_eq!(failed_bean(&err), Some("a"), "unexpected error: {}", err);
    assert!(err.to_string().contains("a cannot initialize"));

    // b was fully built around the early reference to a, so it goes down with a
    let factory = context.bean_factory();
    assert!(!factory.singleton_registry().contains_singleton("a"));
    assert!(!factory.singleton_registry().contains_singleton("b"));
    assert_eq!(*log.lock(), vec!["b"]);

    // b cannot be rebuilt without a
    assert!(context.get_bean("b").is_err());
    assert_eq!(*log.lock(), vec!["b"]);
    context.close();
}

#[test]
fn failed_eager_bean_aborts_refresh_and_destroys_what_was_built() {
    let log: Log = Arc::default();
    let context = link_context(
        &log,
        r#"
        [[bean]]
        name = "c"
        class = "Link"

        [[bean]]
        name = "a"
        class = "Link"
        init_method = "explode"
        property = [{ name = "next", ref = "b" }]

        [[bean]]
        name = "b"
        class = "Link"
        property = [{ name = "next", ref = "a" }]

        [[bean]]
        name = "d"
        class = "Link"
        "#,
    );

    let err = context.refresh().unwrap_err();
    assert_eq!(failed_bean(&err), Some("a"), "unexpected error: {}", err);
    assert_eq!(context.state(), ContextState::Failed);
    // d is never created; b goes with a, then c with the rest of the context
    assert_eq!(*log.lock(), vec!["b", "c"]);
    assert!(context.get_bean("c").is_err());
}

struct Refusing {
    target: &'static str,
}

impl BeanPostProcessor for Refusing {
    fn post_process_after_initialization(&self, bean: Object, bean_name: &str) -> anyhow::Result<Object> {
        if bean_name == self.target {
            anyhow::bail!("{} is not allowed here", bean_name);
        }
        Ok(bean)
    }
}

#[test]
fn failing_post_processor_is_a_creation_error() {
    let log: Log = Arc::default();
    let context = link_builder(
        &log,
        r#"
        [[bean]]
        name = "first"
        class = "Link"

        [[bean]]
        name = "rejected"
        class = "Link"
        property = [{ name = "next", ref = "first" }]
        "#,
    )
    .bean_post_processor(Arc::new(Refusing { target: "rejected" }))
    .build();

    let err = context.refresh().unwrap_err();
    assert_eq!(failed_bean(&err), Some("rejected"), "unexpected error: {}", err);
    assert!(err.to_string().contains("rejected is not allowed here"));
    assert_eq!(context.state(), ContextState::Failed);
    assert_eq!(*log.lock(), vec!["first"]);
}

struct Chicken;
impl Bean for Chicken {}

struct Egg;
impl Bean for Egg {}

#[test]
fn constructor_cycle_is_reported_as_circular_reference() {
    let files = InMemoryResourceLoader::new().with_file(
        "cycle.toml",
        r#"
        [defaults]
        autowire = "constructor"

        [[bean]]
        name = "chicken"
        class = "Chicken"

        [[bean]]
        name = "egg"
        class = "Egg"
        "#,
    );
    let context = ApplicationContext::builder()
        .config_location("cycle.toml")
        .resource_loader(Arc::new(files))
        .register_class(BeanClass::new("Chicken").constructor(vec![Parameter::new("egg", "Egg")], |args| {
            args.object::<Egg>(0)?;
            Ok(Chicken)
        }))
        .register_class(BeanClass::new("Egg").constructor(vec![Parameter::new("chicken", "Chicken")], |args| {
            args.object::<Chicken>(0)?;
            Ok(Egg)
        }))
        .build();

    let err = context.refresh().unwrap_err();
    assert!(err.caused_by_circular_reference(), "unexpected error: {}", err);
    assert_eq!(context.state(), ContextState::Failed);
}

struct Slow {
    initialized: Arc<AtomicUsize>,
}

impl Bean for Slow {
    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::InitializingBean]
    }

    fn after_properties_set(&self) -> anyhow::Result<()> {
        self.initialized.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn concurrent_first_access_creates_a_singleton_once() {
    let constructed = Arc::new(AtomicUsize::new(0));
    let initialized = Arc::new(AtomicUsize::new(0));
    let factory = DefaultListableBeanFactory::new();
    {
        let constructed = Arc::clone(&constructed);
        let initialized = Arc::clone(&initialized);
        factory.register_class(BeanClass::new("Slow").default_constructor(move || {
            constructed.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(50));
            Ok(Slow {
                initialized: Arc::clone(&initialized),
            })
        }));
    }
    factory
        .register_bean_definition("slow", BeanDefinition::new("Slow"))
        .unwrap();

    const THREADS: usize = 8;
    let barrier = Barrier::new(THREADS);
    let objects: Vec<Object> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    factory.get_bean("slow").unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    assert_eq!(constructed.load(Ordering::SeqCst), 1);
    assert_eq!(initialized.load(Ordering::SeqCst), 1);
    assert!(objects.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
}

struct Service {
    name: &'static str,
    running: AtomicBool,
    log: Log,
}

impl Bean for Service {
    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Lifecycle]
    }

    fn set_property(&self, name: &str, _value: Value) -> anyhow::Result<()> {
        match name {
            "backend" => Ok(()),
            _ => Err(sprig_core::unknown_property(name)),
        }
    }

    fn start(&self) {
        self.log.lock().push(format!("start:{}", self.name));
        self.running.store(true, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.log.lock().push(format!("stop:{}", self.name));
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[test]
fn start_and_stop_follow_dependencies() {
    let log: Log = Arc::default();
    let context = ApplicationContext::builder().build();
    let factory = context.bean_factory();
    for (class, name) in [("Server", "server"), ("Database", "database")] {
        let class_log = Arc::clone(&log);
        factory.register_class(
            BeanClass::new(class)
                .default_constructor(move || {
                    Ok(Service {
                        name,
                        running: AtomicBool::new(false),
                        log: Arc::clone(&class_log),
                    })
                })
                .property(PropertyDescriptor::object("backend", "Database")),
        );
    }
    factory
        .register_bean_definition(
            "server",
            BeanDefinition::new("Server").with_property("backend", sprig_core::ValueSpec::reference("database")),
        )
        .unwrap();
    factory
        .register_bean_definition("database", BeanDefinition::new("Database"))
        .unwrap();
    context.refresh().unwrap();
    assert!(!context.is_running());

    context.start().unwrap();
    assert!(context.is_running());
    context.stop();
    assert!(!context.is_running());
    // a second stop is a no-op
    context.stop();

    assert_eq!(
        *log.lock(),
        vec!["start:database", "start:server", "stop:server", "stop:database"]
    );
    context.close();
}
