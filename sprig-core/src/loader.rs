//! 配置加载器
//!
//! 把 TOML（或 JSON）配置文档读成 [`BeanDefinition`] 并注册到注册表。一个文档就是
//! 一个配置单元，单元内可以包含：
//!
//! ```toml
//! profile = "dev, test"            # 可选，环境不接受时整个单元被跳过
//!
//! [defaults]                       # 单元默认值，嵌套单元继承
//! lazy_init = true
//! autowire = "by_type"
//! init_method = "init"
//! autowire_candidates = ["*Repository"]
//!
//! [[import]]
//! resource = "common.toml"         # 相对于当前单元的位置
//!
//! [[bean]]
//! name = "userService"
//! aliases = ["users"]
//! class = "UserService"
//! constructor_args = [{ ref = "userRepository" }, { value = 3 }]
//!
//! [[bean.property]]
//! name = "timeout"
//! value = "${service.timeout:30}"
//!
//! [[alias]]
//! name = "userService"
//! alias = "accounts"
//!
//! [[unit]]                         # 嵌套单元
//! profile = "prod"
//! ```
//!
//! 单元内的处理顺序固定为：导入 → Bean → 别名 → 嵌套单元。格式错误的条目通过
//! [`ProblemReporter`] 报告（附带解析位置），然后继续处理后续条目。

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::config::Environment;
use crate::constants::MULTI_VALUE_DELIMITERS;
use crate::definition::{AutowireMode, BeanDefinition, DependencyCheck, ValueSpec};
use crate::error::{BeansError, BeansResult};
use crate::parsing::{
    AliasEvent, CollectingProblemReporter, ComponentEvent, EmptyReaderEventListener, Entry, ImportEvent,
    LoadingSet, ParseState, Problem, ProblemReporter, ReaderEventListener, SourceLocation,
};
use crate::registry::BeanDefinitionRegistry;
use crate::resource::{apply_relative_path, is_url, FileSystemResourceLoader, Resource, ResourceLoader};
use crate::utils::naming::unique_generated_name;
use crate::utils::text::{has_text, simple_match, tokenize};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UnitDoc {
    profile: Option<String>,
    defaults: Option<DefaultsDoc>,
    #[serde(rename = "import")]
    imports: Vec<ImportDoc>,
    #[serde(rename = "bean")]
    beans: Vec<BeanDoc>,
    #[serde(rename = "alias")]
    aliases: Vec<AliasDoc>,
    #[serde(rename = "unit")]
    units: Vec<UnitDoc>,
}

/// 未设置的字段继承外层单元
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DefaultsDoc {
    lazy_init: Option<bool>,
    autowire: Option<String>,
    init_method: Option<String>,
    destroy_method: Option<String>,
    autowire_candidates: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImportDoc {
    resource: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AliasDoc {
    name: String,
    alias: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BeanDoc {
    name: Option<String>,
    aliases: Vec<String>,
    class: Option<String>,
    parent: Option<String>,
    scope: Option<String>,
    lazy_init: Option<bool>,
    #[serde(rename = "abstract")]
    is_abstract: bool,
    primary: bool,
    order: Option<i32>,
    autowire: Option<String>,
    autowire_candidate: Option<bool>,
    dependency_check: Option<String>,
    depends_on: Vec<String>,
    init_method: Option<String>,
    destroy_method: Option<String>,
    factory_bean: Option<String>,
    factory_method: Option<String>,
    constructor_args: Vec<ValueDoc>,
    #[serde(rename = "property")]
    properties: Vec<PropertyDoc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ValueDoc {
    value: Option<LiteralDoc>,
    #[serde(rename = "ref")]
    reference: Option<String>,
    bean: Option<Box<BeanDoc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PropertyDoc {
    name: String,
    value: Option<LiteralDoc>,
    #[serde(rename = "ref")]
    reference: Option<String>,
    bean: Option<Box<BeanDoc>>,
}

/// 字面量可以写成字符串、数字或布尔值，统一按文本处理
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum LiteralDoc {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for LiteralDoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralDoc::Text(text) => f.write_str(text),
            LiteralDoc::Integer(value) => write!(f, "{}", value),
            LiteralDoc::Float(value) => write!(f, "{}", value),
            LiteralDoc::Bool(value) => write!(f, "{}", value),
        }
    }
}

fn parse_document(location: &str, content: &str) -> Result<UnitDoc, String> {
    if location.ends_with(".json") {
        serde_json::from_str(content).map_err(|err| err.to_string())
    } else {
        toml::from_str(content).map_err(|err| err.to_string())
    }
}

/// 单元默认值
#[derive(Debug, Clone, Default)]
struct UnitDefaults {
    lazy_init: bool,
    autowire: AutowireMode,
    init_method: Option<String>,
    destroy_method: Option<String>,
    autowire_candidates: Vec<String>,
}

impl UnitDefaults {
    fn derive(&self, doc: Option<&DefaultsDoc>) -> Result<UnitDefaults, String> {
        let mut derived = self.clone();
        let Some(doc) = doc else {
            return Ok(derived);
        };
        if let Some(lazy_init) = doc.lazy_init {
            derived.lazy_init = lazy_init;
        }
        if let Some(autowire) = &doc.autowire {
            derived.autowire = autowire.parse()?;
        }
        if let Some(method) = &doc.init_method {
            derived.init_method = Some(method.clone()).filter(|m| has_text(m));
        }
        if let Some(method) = &doc.destroy_method {
            derived.destroy_method = Some(method.clone()).filter(|m| has_text(m));
        }
        if let Some(patterns) = &doc.autowire_candidates {
            derived.autowire_candidates = patterns
                .iter()
                .flat_map(|pattern| tokenize(pattern, MULTI_VALUE_DELIMITERS))
                .collect();
        }
        Ok(derived)
    }

    fn is_autowire_candidate(&self, name: Option<&str>) -> bool {
        if self.autowire_candidates.is_empty() {
            return true;
        }
        name.is_some_and(|name| self.autowire_candidates.iter().any(|pattern| simple_match(pattern, name)))
    }
}

/// 当前单元的解析上下文，进入嵌套单元时保存，退出时恢复
#[derive(Debug, Clone, Default)]
struct UnitScope {
    defaults: UnitDefaults,
    /// 本单元内已使用的名称和别名
    used_names: HashSet<String>,
}

/// 配置加载器
pub struct ConfigLoader<'a> {
    registry: &'a dyn BeanDefinitionRegistry,
    environment: &'a Environment,
    resource_loader: Arc<dyn ResourceLoader>,
    problems: Arc<dyn ProblemReporter>,
    listener: Arc<dyn ReaderEventListener>,
    loading: LoadingSet,
    parse_state: ParseState,
    scope: UnitScope,
    registered: usize,
    error_count: usize,
}

impl<'a> ConfigLoader<'a> {
    pub fn new(registry: &'a dyn BeanDefinitionRegistry, environment: &'a Environment) -> Self {
        Self {
            registry,
            environment,
            resource_loader: Arc::new(FileSystemResourceLoader::default()),
            problems: Arc::new(CollectingProblemReporter::new()),
            listener: Arc::new(EmptyReaderEventListener),
            loading: LoadingSet::default(),
            parse_state: ParseState::new(),
            scope: UnitScope::default(),
            registered: 0,
            error_count: 0,
        }
    }

    pub fn with_resource_loader(mut self, resource_loader: Arc<dyn ResourceLoader>) -> Self {
        self.resource_loader = resource_loader;
        self
    }

    pub fn with_problem_reporter(mut self, problems: Arc<dyn ProblemReporter>) -> Self {
        self.problems = problems;
        self
    }

    pub fn with_event_listener(mut self, listener: Arc<dyn ReaderEventListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn resource_loader(&self) -> &Arc<dyn ResourceLoader> {
        &self.resource_loader
    }

    /// 已报告的错误数量
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// 从位置加载定义，返回注册的定义数量（包括导入的）
    pub fn load(&mut self, location: &str) -> BeansResult<usize> {
        let resource = self.resource_loader.get_resource(location);
        self.load_resource(resource)
    }

    pub fn load_resource(&mut self, resource: Arc<dyn Resource>) -> BeansResult<usize> {
        let location = resource.location().to_string();
        if !self.loading.enter(&location) {
            return Err(BeansError::ImportResolution {
                location,
                reason: "Detected cyclic loading - check your import definitions".to_string(),
            });
        }
        let result = self.do_load(&resource);
        self.loading.leave(&location);
        result
    }

    fn do_load(&mut self, resource: &Arc<dyn Resource>) -> BeansResult<usize> {
        tracing::debug!("Loading bean definitions from {}", resource.description());
        let content = resource.read_to_string().map_err(|err| BeansError::ImportResolution {
            location: resource.location().to_string(),
            reason: format!("Could not read {}: {}", resource.description(), err),
        })?;
        let doc = parse_document(resource.location(), &content).map_err(|reason| {
            BeansError::ConfigurationParse(
                Problem::new("Failed to parse configuration document", resource.location(), self.parse_state.snapshot())
                    .with_cause(reason),
            )
        })?;

        let start = self.registered;
        // 每个文档从根默认值开始
        let enclosing = std::mem::take(&mut self.scope);
        self.process_unit(&doc, resource, String::new());
        self.scope = enclosing;

        let count = self.registered - start;
        tracing::debug!("Loaded {} bean definitions from {}", count, resource.description());
        Ok(count)
    }

    fn process_unit(&mut self, doc: &UnitDoc, resource: &Arc<dyn Resource>, path: String) {
        if let Some(profile) = &doc.profile {
            let profiles = tokenize(&self.environment.resolve_placeholders(profile), MULTI_VALUE_DELIMITERS);
            if !profiles.is_empty() && !self.environment.accepts_profiles(&profiles) {
                tracing::debug!(
                    "Skipped unit [{}] in {}: specified profiles {:?} did not match the environment",
                    path,
                    resource.location(),
                    profiles
                );
                return;
            }
        }

        self.parse_state.push(Entry::Unit(path.clone()));
        let enclosing = self.scope.clone();
        match enclosing.defaults.derive(doc.defaults.as_ref()) {
            Ok(defaults) => {
                self.scope = UnitScope {
                    defaults,
                    used_names: HashSet::new(),
                };
            }
            Err(message) => {
                self.error(format!("Invalid unit defaults: {}", message), resource);
                self.scope.used_names = HashSet::new();
            }
        }

        for (index, import) in doc.imports.iter().enumerate() {
            let source = SourceLocation::new(resource.location(), format!("{}import[{}]", path, index));
            self.process_import(import, resource, source);
        }
        for (index, bean) in doc.beans.iter().enumerate() {
            let source = SourceLocation::new(resource.location(), format!("{}bean[{}]", path, index));
            self.process_bean(bean, resource, source);
        }
        for (index, alias) in doc.aliases.iter().enumerate() {
            let source = SourceLocation::new(resource.location(), format!("{}alias[{}]", path, index));
            self.process_alias(alias, resource, source);
        }
        for (index, unit) in doc.units.iter().enumerate() {
            self.process_unit(unit, resource, format!("{}unit[{}]/", path, index));
        }

        self.scope = enclosing;
        self.parse_state.pop();
    }

    fn process_import(&mut self, import: &ImportDoc, resource: &Arc<dyn Resource>, source: SourceLocation) {
        let raw = import.resource.trim();
        if raw.is_empty() {
            self.error("Resource location must not be empty", resource);
            return;
        }

        self.parse_state.push(Entry::Import(raw.to_string()));
        let location = match self.environment.resolve_required_placeholders(raw) {
            Ok(location) => location,
            Err(err) => {
                self.error_with_cause(format!("Failed to resolve import location [{}]", raw), resource, err);
                self.parse_state.pop();
                return;
            }
        };

        let mut actual_resources = Vec::new();
        let result = if is_url(&location) {
            let target = self.resource_loader.get_resource(&location);
            self.load_import(target, &mut actual_resources)
        } else {
            let relative = resource.create_relative(&location);
            if relative.exists() {
                self.load_import(relative, &mut actual_resources)
            } else {
                match resource.url() {
                    Ok(base) => {
                        let composed = apply_relative_path(&base, &location);
                        tracing::trace!("Relative import [{}] not found next to {}, trying [{}]", location, base, composed);
                        let target = self.resource_loader.get_resource(&composed);
                        self.load_import(target, &mut actual_resources)
                    }
                    Err(err) => Err(BeansError::ImportResolution {
                        location: location.clone(),
                        reason: format!("Failed to determine base location of {}: {}", resource.description(), err),
                    }),
                }
            }
        };

        match result {
            Ok(count) => tracing::trace!("Imported {} bean definitions from location [{}]", count, location),
            Err(err) => self.error_with_cause(
                format!("Failed to import bean definitions from location [{}]", location),
                resource,
                err,
            ),
        }
        self.listener.on_import_processed(ImportEvent {
            location,
            actual_resources,
            source,
        });
        self.parse_state.pop();
    }

    fn load_import(&mut self, target: Arc<dyn Resource>, actual_resources: &mut Vec<String>) -> BeansResult<usize> {
        let location = target.location().to_string();
        let count = self.load_resource(target)?;
        actual_resources.push(location);
        Ok(count)
    }

    fn process_bean(&mut self, doc: &BeanDoc, resource: &Arc<dyn Resource>, source: SourceLocation) {
        let declared_name = doc.name.as_deref().map(str::trim);
        self.parse_state
            .push(Entry::Bean(declared_name.unwrap_or("<generated>").to_string()));
        if declared_name == Some("") {
            self.error("Bean name must not be empty", resource);
            self.parse_state.pop();
            return;
        }

        let depth = self.parse_state.depth();
        match self.build_definition(doc, declared_name, resource) {
            Ok(definition) => {
                self.register_definition(doc, declared_name, definition.with_source(source), resource)
            }
            Err(problem) => {
                self.unwind_to(depth);
                self.report(problem);
            }
        }
        self.parse_state.pop();
    }

    fn build_definition(
        &mut self,
        doc: &BeanDoc,
        name: Option<&str>,
        resource: &Arc<dyn Resource>,
    ) -> Result<BeanDefinition, Problem> {
        let defaults = self.scope.defaults.clone();
        let mut definition = BeanDefinition {
            class_name: doc.class.clone().filter(|c| has_text(c)),
            parent: doc.parent.clone().filter(|p| has_text(p)),
            lazy_init: doc.lazy_init.or_else(|| defaults.lazy_init.then_some(true)),
            is_abstract: doc.is_abstract,
            primary: doc.primary,
            order: doc.order,
            autowire_candidate: doc
                .autowire_candidate
                .unwrap_or_else(|| defaults.is_autowire_candidate(name)),
            autowire: defaults.autowire,
            factory_bean: doc.factory_bean.clone().filter(|f| has_text(f)),
            factory_method: doc.factory_method.clone().filter(|f| has_text(f)),
            ..BeanDefinition::default()
        };

        if let Some(scope) = &doc.scope {
            definition.scope = Some(scope.parse().map_err(|message: String| self.problem(message, resource))?);
        }
        if let Some(autowire) = &doc.autowire {
            definition.autowire = autowire.parse().map_err(|message: String| self.problem(message, resource))?;
        }
        if let Some(check) = &doc.dependency_check {
            definition.dependency_check = check
                .parse::<DependencyCheck>()
                .map_err(|message| self.problem(message, resource))?;
        }
        definition.depends_on = doc
            .depends_on
            .iter()
            .flat_map(|names| tokenize(names, MULTI_VALUE_DELIMITERS))
            .collect();

        if definition.class_name.is_none() && definition.parent.is_none() && definition.factory_bean.is_none() {
            return Err(self.problem("Bean definition must specify 'class', 'parent' or 'factory_bean'", resource));
        }
        if definition.factory_bean.is_some() != definition.factory_method.is_some() {
            return Err(self.problem("'factory_bean' and 'factory_method' must be specified together", resource));
        }

        match doc.init_method.as_deref().map(str::trim) {
            Some(method) if !method.is_empty() => definition.init_method = Some(method.to_string()),
            Some(_) => {}
            None => {
                definition.init_method = defaults.init_method.clone();
                definition.enforce_init_method = false;
            }
        }
        match doc.destroy_method.as_deref().map(str::trim) {
            Some(method) if !method.is_empty() => definition.destroy_method = Some(method.to_string()),
            Some(_) => {}
            None => {
                definition.destroy_method = defaults.destroy_method.clone();
                definition.enforce_destroy_method = false;
            }
        }

        for (index, arg) in doc.constructor_args.iter().enumerate() {
            self.parse_state.push(Entry::ConstructorArgument(index));
            let spec = self.value_spec(arg.value.as_ref(), arg.reference.as_deref(), arg.bean.as_deref(), resource)?;
            definition.constructor_args.push(spec);
            self.parse_state.pop();
        }

        for property in &doc.properties {
            let property_name = property.name.trim();
            self.parse_state.push(Entry::Property(property_name.to_string()));
            if property_name.is_empty() {
                return Err(self.problem("Property name must not be empty", resource));
            }
            if definition.property(property_name).is_some() {
                return Err(self.problem(format!("Multiple definitions for property '{}'", property_name), resource));
            }
            let spec = self.value_spec(
                property.value.as_ref(),
                property.reference.as_deref(),
                property.bean.as_deref(),
                resource,
            )?;
            definition.set_property(property_name, spec);
            self.parse_state.pop();
        }

        Ok(definition)
    }

    fn value_spec(
        &mut self,
        value: Option<&LiteralDoc>,
        reference: Option<&str>,
        bean: Option<&BeanDoc>,
        resource: &Arc<dyn Resource>,
    ) -> Result<ValueSpec, Problem> {
        match (value, reference, bean) {
            (Some(literal), None, None) => Ok(ValueSpec::Literal(
                self.environment.resolve_placeholders(&literal.to_string()),
            )),
            (None, Some(reference), None) => {
                let reference = reference.trim();
                if reference.is_empty() {
                    return Err(self.problem("'ref' must not be empty", resource));
                }
                Ok(ValueSpec::reference(reference))
            }
            (None, None, Some(inner)) => {
                self.parse_state.push(Entry::InnerBean);
                let definition = self.build_definition(inner, None, resource)?;
                self.parse_state.pop();
                Ok(ValueSpec::inner(definition))
            }
            _ => Err(self.problem("Exactly one of 'value', 'ref' or 'bean' must be specified", resource)),
        }
    }

    fn register_definition(
        &mut self,
        doc: &BeanDoc,
        declared_name: Option<&str>,
        definition: BeanDefinition,
        resource: &Arc<dyn Resource>,
    ) {
        let mut aliases: Vec<String> = doc
            .aliases
            .iter()
            .flat_map(|alias| tokenize(alias, MULTI_VALUE_DELIMITERS))
            .collect();
        aliases.dedup();

        let name = match declared_name {
            Some(name) => name.to_string(),
            None => {
                let base = definition
                    .class_name
                    .clone()
                    .or_else(|| definition.parent.as_ref().map(|parent| format!("{}$child", parent)))
                    .or_else(|| definition.factory_bean.as_ref().map(|factory| format!("{}$created", factory)))
                    .unwrap_or_default();
                let used = &self.scope.used_names;
                let registry = self.registry;
                let generated = unique_generated_name(&base, |candidate| {
                    used.contains(candidate) || registry.is_bean_name_in_use(candidate)
                });
                tracing::trace!("Neither name nor aliases specified - using generated bean name [{}]", generated);
                generated
            }
        };

        if let Some(used) = std::iter::once(&name)
            .chain(aliases.iter())
            .find(|n| self.scope.used_names.contains(n.as_str()))
        {
            let message = format!("Bean name '{}' is already used in this unit", used);
            self.error(message, resource);
            return;
        }

        let class_name = definition.class_name.clone();
        let source = definition.source.clone();
        if let Err(err) = self.registry.register_bean_definition(&name, definition) {
            self.error_with_cause(format!("Failed to register bean definition '{}'", name), resource, err);
            return;
        }
        self.registered += 1;
        tracing::debug!("Registered bean definition '{}' from {}", name, resource.location());

        let mut registered_aliases = Vec::new();
        for alias in aliases {
            match self.registry.register_alias(&name, &alias) {
                Ok(()) => registered_aliases.push(alias),
                Err(err) => self.error_with_cause(
                    format!("Failed to register alias '{}' for bean with name '{}'", alias, name),
                    resource,
                    err,
                ),
            }
        }

        self.scope.used_names.insert(name.clone());
        self.scope.used_names.extend(registered_aliases.iter().cloned());
        self.listener.on_component_registered(ComponentEvent {
            name,
            aliases: registered_aliases,
            class_name,
            source: source.unwrap_or_else(|| SourceLocation::new(resource.location(), "")),
        });
    }

    fn process_alias(&mut self, doc: &AliasDoc, resource: &Arc<dyn Resource>, source: SourceLocation) {
        let name = doc.name.trim();
        let alias = doc.alias.trim();
        self.parse_state.push(Entry::Alias(alias.to_string()));

        if name.is_empty() {
            self.error("Alias target name must not be empty", resource);
        } else if alias.is_empty() {
            self.error("Alias must not be empty", resource);
        } else {
            match self.registry.register_alias(name, alias) {
                Ok(()) => {
                    self.scope.used_names.insert(alias.to_string());
                    self.listener.on_alias_registered(AliasEvent {
                        name: name.to_string(),
                        alias: alias.to_string(),
                        source,
                    });
                }
                Err(err) => self.error_with_cause(
                    format!("Failed to register alias '{}' for bean with name '{}'", alias, name),
                    resource,
                    err,
                ),
            }
        }
        self.parse_state.pop();
    }

    fn unwind_to(&mut self, depth: usize) {
        while self.parse_state.depth() > depth {
            self.parse_state.pop();
        }
    }

    fn problem(&self, message: impl Into<String>, resource: &Arc<dyn Resource>) -> Problem {
        Problem::new(message, resource.location(), self.parse_state.snapshot())
    }

    fn report(&mut self, problem: Problem) {
        self.error_count += 1;
        self.problems.error(problem);
    }

    fn error(&mut self, message: impl Into<String>, resource: &Arc<dyn Resource>) {
        let problem = self.problem(message, resource);
        self.report(problem);
    }

    fn error_with_cause(&mut self, message: impl Into<String>, resource: &Arc<dyn Resource>, cause: impl fmt::Display) {
        let problem = self.problem(message, resource).with_cause(cause);
        self.report(problem);
    }
}

impl fmt::Debug for ConfigLoader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("registered", &self.registered)
            .field("error_count", &self.error_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{AliasRegistry, DefinitionRegistry};
    use crate::resource::InMemoryResourceLoader;

    fn loader_with<'a>(
        registry: &'a DefinitionRegistry,
        environment: &'a Environment,
        files: InMemoryResourceLoader,
        problems: &Arc<CollectingProblemReporter>,
    ) -> ConfigLoader<'a> {
        ConfigLoader::new(registry, environment)
            .with_resource_loader(Arc::new(files))
            .with_problem_reporter(problems.clone())
    }

    #[test]
    fn test_loads_beans_properties_and_aliases() {
        let registry = DefinitionRegistry::new();
        let environment = Environment::new();
        let problems = Arc::new(CollectingProblemReporter::new());
        let files = InMemoryResourceLoader::new().with_file(
            "app.toml",
            r#"
            [[bean]]
            name = "repo"
            class = "Repo"
            aliases = ["repository, store"]

            [[bean]]
            name = "service"
            class = "Service"
            scope = "prototype"
            depends_on = ["repo"]
            constructor_args = [{ ref = "repo" }, { value = 3 }]

            [[bean.property]]
            name = "timeout"
            value = "${timeout:30}"

            [[bean.property]]
            name = "helper"
            bean = { class = "Helper" }

            [[alias]]
            name = "service"
            alias = "svc"
            "#,
        );

        let mut loader = loader_with(&registry, &environment, files, &problems);
        assert_eq!(loader.load("app.toml").unwrap(), 2);
        assert!(!problems.has_errors());

        assert_eq!(registry.canonical_name("store"), "repo");
        assert_eq!(registry.canonical_name("svc"), "service");
        let service = registry.get_bean_definition("service").unwrap();
        assert!(service.is_prototype());
        assert_eq!(service.depends_on, vec!["repo"]);
        assert!(matches!(&service.constructor_args[1], ValueSpec::Literal(v) if v == "3"));
        assert!(matches!(service.property("timeout"), Some(ValueSpec::Literal(v)) if v == "30"));
        assert!(matches!(service.property("helper"), Some(ValueSpec::Bean(_))));
        assert_eq!(service.source.as_ref().unwrap().to_string(), "mem:/app.toml [bean[1]]");
    }

    #[test]
    fn test_malformed_entries_do_not_stop_siblings() {
        let registry = DefinitionRegistry::new();
        let environment = Environment::new();
        let problems = Arc::new(CollectingProblemReporter::new());
        let files = InMemoryResourceLoader::new().with_file(
            "app.toml",
            r#"
            [[import]]
            resource = ""

            [[bean]]
            name = " "
            class = "Repo"

            [[bean]]
            name = "broken"
            class = "Repo"
            [[bean.property]]
            name = "x"
            value = "1"
            ref = "y"

            [[bean]]
            name = "ok"
            class = "Repo"

            [[alias]]
            name = "ok"
            alias = ""
            "#,
        );

        let mut loader = loader_with(&registry, &environment, files, &problems);
        assert_eq!(loader.load("app.toml").unwrap(), 1);
        assert_eq!(loader.error_count(), 4);
        assert_eq!(registry.get_bean_definition_names(), vec!["ok"]);

        let errors = problems.errors();
        let property_problem = errors
            .iter()
            .find(|p| p.message().contains("Exactly one of"))
            .unwrap();
        let rendered = property_problem.parse_state().to_string();
        assert!(rendered.starts_with("Property 'x'"));
        assert!(rendered.contains("Bean 'broken'"));
    }

    #[test]
    fn test_nested_unit_defaults_are_restored() {
        let registry = DefinitionRegistry::new();
        let environment = Environment::new();
        let problems = Arc::new(CollectingProblemReporter::new());
        let files = InMemoryResourceLoader::new().with_file(
            "app.toml",
            r#"
            [defaults]
            init_method = "setup"

            [[bean]]
            name = "outer"
            class = "Repo"

            [[unit]]
            [unit.defaults]
            lazy_init = true
            autowire_candidates = ["*Repo"]
            [[unit.bean]]
            name = "innerRepo"
            class = "Repo"
            [[unit.bean]]
            name = "innerService"
            class = "Service"

            [[unit]]
            [[unit.bean]]
            name = "sibling"
            class = "Repo"
            "#,
        );

        let mut loader = loader_with(&registry, &environment, files, &problems);
        assert_eq!(loader.load("app.toml").unwrap(), 4);

        let inner_repo = registry.get_bean_definition("innerRepo").unwrap();
        assert!(inner_repo.is_lazy_init());
        assert!(inner_repo.autowire_candidate);
        assert_eq!(inner_repo.init_method.as_deref(), Some("setup"));
        assert!(!inner_repo.enforce_init_method);
        assert!(!registry.get_bean_definition("innerService").unwrap().autowire_candidate);

        let sibling = registry.get_bean_definition("sibling").unwrap();
        assert!(!sibling.is_lazy_init());
        assert!(sibling.autowire_candidate);
    }

    #[test]
    fn test_duplicate_name_in_unit_and_generated_names() {
        let registry = DefinitionRegistry::new();
        let environment = Environment::new();
        let problems = Arc::new(CollectingProblemReporter::new());
        let files = InMemoryResourceLoader::new().with_file(
            "app.json",
            r#"{
                "bean": [
                    { "name": "a", "class": "Repo" },
                    { "name": "a", "class": "Repo" },
                    { "class": "Pool" },
                    { "class": "Pool" }
                ]
            }"#,
        );

        let mut loader = loader_with(&registry, &environment, files, &problems);
        assert_eq!(loader.load("app.json").unwrap(), 3);
        assert_eq!(registry.get_bean_definition_names(), vec!["a", "Pool#0", "Pool#1"]);
        assert!(problems.errors()[0].message().contains("already used in this unit"));
    }

    #[test]
    fn test_cyclic_import_is_reported() {
        let registry = DefinitionRegistry::new();
        let environment = Environment::new();
        let problems = Arc::new(CollectingProblemReporter::new());
        let files = InMemoryResourceLoader::new()
            .with_file("a.toml", "[[import]]\nresource = \"b.toml\"\n[[bean]]\nname = \"a\"\nclass = \"A\"\n")
            .with_file("b.toml", "[[import]]\nresource = \"a.toml\"\n[[bean]]\nname = \"b\"\nclass = \"B\"\n");

        let mut loader = loader_with(&registry, &environment, files, &problems);
        assert_eq!(loader.load("a.toml").unwrap(), 2);
        let errors = problems.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].cause().unwrap().contains("Detected cyclic loading"));
    }

    #[test]
    fn test_unreadable_top_level_resource() {
        let registry = DefinitionRegistry::new();
        let environment = Environment::new();
        let problems = Arc::new(CollectingProblemReporter::new());
        let mut loader = loader_with(&registry, &environment, InMemoryResourceLoader::new(), &problems);
        assert!(matches!(
            loader.load("missing.toml"),
            Err(BeansError::ImportResolution { .. })
        ));
    }
}
