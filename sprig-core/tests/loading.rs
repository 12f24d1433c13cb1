use std::io;
use std::sync::Arc;

use sprig_core::{
    AliasRegistry, BeanDefinitionRegistry, ChannelReaderEventListener, CollectingProblemReporter, ConfigLoader,
    DefinitionRegistry, Environment, FileSystemResourceLoader, InMemoryResourceLoader, MapPropertySource,
    ReaderEvent, Resource,
};

/// A resource that cannot address its siblings directly, so relative imports
/// must fall back to composing a location from its url.
#[derive(Debug)]
struct DetachedResource {
    content: Option<String>,
}

impl Resource for DetachedResource {
    fn location(&self) -> &str {
        "detached:main"
    }

    fn exists(&self) -> bool {
        self.content.is_some()
    }

    fn read_to_string(&self) -> io::Result<String> {
        self.content
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "detached resource has no content"))
    }

    fn create_relative(&self, _relative_path: &str) -> Arc<dyn Resource> {
        Arc::new(DetachedResource { content: None })
    }

    fn url(&self) -> io::Result<String> {
        Ok("mem:/conf/main.toml".to_string())
    }
}

fn drain(receiver: &mut tokio::sync::mpsc::UnboundedReceiver<ReaderEvent>) -> Vec<ReaderEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

#[test]
fn relative_import_falls_back_to_url_composition() {
    let files = InMemoryResourceLoader::new()
        .with_file("mem:/conf/child.toml", "[[bean]]\nname = \"fromFallback\"\nclass = \"Child\"\n")
        .with_file("mem:/child.toml", "[[bean]]\nname = \"wrongChild\"\nclass = \"Child\"\n");
    let registry = DefinitionRegistry::new();
    let environment = Environment::new();
    let (listener, mut events) = ChannelReaderEventListener::new();
    let mut loader = ConfigLoader::new(&registry, &environment)
        .with_resource_loader(Arc::new(files))
        .with_event_listener(Arc::new(listener));

    let main = DetachedResource {
        content: Some("[[import]]\nresource = \"child.toml\"\n".to_string()),
    };
    assert_eq!(loader.load_resource(Arc::new(main)).unwrap(), 1);
    assert_eq!(registry.get_bean_definition_names(), vec!["fromFallback"]);

    let imports: Vec<_> = drain(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            ReaderEvent::Import(import) => Some(import),
            _ => None,
        })
        .collect();
    assert_eq!(imports.len(), 1);
    assert_eq!(imports[0].location, "child.toml");
    assert_eq!(imports[0].actual_resources, vec!["mem:/conf/child.toml"]);
}

#[test]
fn relative_import_prefers_existing_sibling() {
    let files = InMemoryResourceLoader::new()
        .with_file("conf/main.toml", "[[import]]\nresource = \"../shared/db.toml\"\n")
        .with_file("shared/db.toml", "[[bean]]\nname = \"dataSource\"\nclass = \"Pool\"\n");
    let registry = DefinitionRegistry::new();
    let environment = Environment::new();
    let mut loader = ConfigLoader::new(&registry, &environment).with_resource_loader(Arc::new(files));

    assert_eq!(loader.load("conf/main.toml").unwrap(), 1);
    assert!(registry.contains_bean_definition("dataSource"));
}

#[test]
fn profile_excluded_unit_has_no_side_effects() {
    let files = InMemoryResourceLoader::new().with_file(
        "app.toml",
        r#"
        [[bean]]
        name = "always"
        class = "Service"

        [[unit]]
        profile = "prod"
        [[unit.import]]
        resource = "does-not-exist.toml"
        [[unit.bean]]
        name = "prodOnly"
        class = "Service"
        [[unit.alias]]
        name = "always"
        alias = "prodAlias"
        [[unit.unit]]
        [[unit.unit.bean]]
        name = "nestedProd"
        class = "Service"

        [[unit]]
        profile = "${extra.profiles:dev, test}"
        [[unit.bean]]
        name = "devOnly"
        class = "Service"
        "#,
    );
    let registry = DefinitionRegistry::new();
    let environment = Environment::new();
    environment.set_active_profiles(["dev"]);
    let problems = Arc::new(CollectingProblemReporter::new());
    let (listener, mut events) = ChannelReaderEventListener::new();
    let mut loader = ConfigLoader::new(&registry, &environment)
        .with_resource_loader(Arc::new(files))
        .with_problem_reporter(problems.clone())
        .with_event_listener(Arc::new(listener));

    assert_eq!(loader.load("app.toml").unwrap(), 2);
    assert_eq!(registry.get_bean_definition_names(), vec!["always", "devOnly"]);
    assert!(!registry.is_alias("prodAlias"));
    assert!(!problems.has_errors());
    assert!(drain(&mut events)
        .iter()
        .all(|event| !matches!(event, ReaderEvent::Import(_) | ReaderEvent::Alias(_))));
}

#[test]
fn negated_profile_and_default_profile() {
    let files = InMemoryResourceLoader::new().with_file(
        "app.toml",
        r#"
        [[unit]]
        profile = "!prod"
        [[unit.bean]]
        name = "notProd"
        class = "Service"

        [[unit]]
        profile = "default"
        [[unit.bean]]
        name = "fallback"
        class = "Service"
        "#,
    );
    let registry = DefinitionRegistry::new();
    let environment = Environment::new();
    let mut loader = ConfigLoader::new(&registry, &environment).with_resource_loader(Arc::new(files));

    assert_eq!(loader.load("app.toml").unwrap(), 2);
    assert_eq!(registry.get_bean_definition_names(), vec!["notProd", "fallback"]);
}

#[test]
fn events_describe_registrations() {
    let files = InMemoryResourceLoader::new().with_file(
        "app.toml",
        r#"
        [[bean]]
        name = "repo"
        class = "Repo"
        aliases = ["store"]

        [[alias]]
        name = "repo"
        alias = "repository"
        "#,
    );
    let registry = DefinitionRegistry::new();
    let environment = Environment::new();
    let (listener, mut events) = ChannelReaderEventListener::new();
    let mut loader = ConfigLoader::new(&registry, &environment)
        .with_resource_loader(Arc::new(files))
        .with_event_listener(Arc::new(listener));
    loader.load("app.toml").unwrap();

    let events = drain(&mut events);
    assert_eq!(events.len(), 2);
    match &events[0] {
        ReaderEvent::Component(component) => {
            assert_eq!(component.name, "repo");
            assert_eq!(component.aliases, vec!["store"]);
            assert_eq!(component.class_name.as_deref(), Some("Repo"));
            assert_eq!(component.source.to_string(), "mem:/app.toml [bean[0]]");
        }
        other => panic!("unexpected event {:?}", other),
    }
    match &events[1] {
        ReaderEvent::Alias(alias) => {
            assert_eq!((alias.name.as_str(), alias.alias.as_str()), ("repo", "repository"));
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn import_location_placeholders_are_required() {
    let files = InMemoryResourceLoader::new()
        .with_file("app.toml", "[[import]]\nresource = \"${env}/beans.toml\"\n[[import]]\nresource = \"${missing}.toml\"\n")
        .with_file("qa/beans.toml", "[[bean]]\nname = \"qaBean\"\nclass = \"Service\"\n");
    let registry = DefinitionRegistry::new();
    let environment = Environment::new();
    environment.add_property_source(Box::new(MapPropertySource::new("test").with("env", "qa")));
    let problems = Arc::new(CollectingProblemReporter::new());
    let mut loader = ConfigLoader::new(&registry, &environment)
        .with_resource_loader(Arc::new(files))
        .with_problem_reporter(problems.clone());

    assert_eq!(loader.load("app.toml").unwrap(), 1);
    assert!(registry.contains_bean_definition("qaBean"));
    let errors = problems.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message().contains("${missing}.toml"));
    assert!(errors[0].parse_state().to_string().starts_with("Import '${missing}.toml'"));
}

#[test]
fn filesystem_imports_mix_toml_and_json() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    std::fs::write(
        dir.path().join("main.toml"),
        "[[import]]\nresource = \"sub/data.json\"\n\n[[bean]]\nname = \"service\"\nclass = \"Service\"\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("sub/data.json"),
        r#"{ "bean": [ { "name": "repo", "class": "Repo", "primary": true, "order": 5 } ] }"#,
    )
    .unwrap();

    let registry = DefinitionRegistry::new();
    let environment = Environment::new();
    let mut loader = ConfigLoader::new(&registry, &environment)
        .with_resource_loader(Arc::new(FileSystemResourceLoader::new(dir.path())));

    assert_eq!(loader.load("main.toml").unwrap(), 2);
    assert_eq!(registry.get_bean_definition_names(), vec!["repo", "service"]);
    let repo = registry.get_bean_definition("repo").unwrap();
    assert!(repo.primary);
    assert_eq!(repo.order, Some(5));
    assert!(repo.source.unwrap().resource.ends_with("data.json"));
}
