use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;

use crate::config::{EnvironmentPropertySource, TomlPropertySource};
use crate::constants::{MULTI_VALUE_DELIMITERS, PROFILES_ACTIVE_SUFFIX};
use crate::context::{ApplicationContext, ApplicationContextBuilder};
use crate::logging::LoggingConfig;
use crate::resource::ResourceLoader;
use crate::utils::text::tokenize;

type Customizer = Box<dyn FnOnce(ApplicationContextBuilder) -> ApplicationContextBuilder + Send>;

/// Sprig 应用程序
///
/// 负责日志、profile、配置属性源的准备，然后构建并刷新上下文：
///
/// ```rust,ignore
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     SprigApplication::new("inventory")
///         .bean_config("beans.toml")
///         .customize(|builder| builder.register_class(repository_class()))
///         .run()
///         .await?
///         .wait_for_shutdown()
///         .await
/// }
/// ```
pub struct SprigApplication {
    name: String,

    /// 属性文件（`application.toml` 及其 profile 变体）
    property_files: Vec<String>,

    /// Bean 配置位置
    bean_configs: Vec<String>,

    /// 环境变量前缀
    env_prefix: String,

    /// 代码中设置的 profiles，优先于环境变量
    profiles: Vec<String>,

    show_banner: bool,

    /// 不设置时从环境变量读取
    logging_config: Option<LoggingConfig>,

    resource_loader: Option<Arc<dyn ResourceLoader>>,

    customizers: Vec<Customizer>,
}

impl SprigApplication {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            property_files: vec!["application.toml".to_string()],
            bean_configs: Vec::new(),
            env_prefix: "APP_".to_string(),
            profiles: Vec::new(),
            show_banner: true,
            logging_config: None,
            resource_loader: None,
            customizers: Vec::new(),
        }
    }

    /// 替换属性文件列表
    pub fn property_files<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.property_files = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn bean_config(mut self, location: impl Into<String>) -> Self {
        self.bean_configs.push(location.into());
        self
    }

    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.profiles = profiles.into_iter().map(Into::into).collect();
        self
    }

    pub fn banner(mut self, show: bool) -> Self {
        self.show_banner = show;
        self
    }

    pub fn logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = Some(config);
        self
    }

    pub fn resource_loader(mut self, loader: Arc<dyn ResourceLoader>) -> Self {
        self.resource_loader = Some(loader);
        self
    }

    /// 在构建上下文之前调整构建器（注册类、后处理器等）
    pub fn customize<F>(mut self, customizer: F) -> Self
    where
        F: FnOnce(ApplicationContextBuilder) -> ApplicationContextBuilder + Send + 'static,
    {
        self.customizers.push(Box::new(customizer));
        self
    }

    /// 构建、刷新并启动上下文
    pub async fn run(self) -> anyhow::Result<RunningApplication> {
        let logging_config = self.logging_config.clone().unwrap_or_else(LoggingConfig::from_env);
        if let Err(err) = logging_config.init() {
            // 宿主程序可能已经安装了订阅者
            eprintln!("{}", err);
        }

        let start_time = Instant::now();
        if self.show_banner {
            self.print_banner();
        }
        tracing::info!("Starting {} application", self.name);

        let active_profiles = self.resolve_active_profiles(|key| std::env::var(key).ok());
        if active_profiles.is_empty() {
            tracing::info!("No active profiles set, falling back to default profiles");
        } else {
            tracing::info!("Active profiles: {:?}", active_profiles);
        }

        let mut builder = ApplicationContext::builder()
            .display_name(format!("{} ApplicationContext", self.name))
            .config_locations(self.bean_configs.iter().cloned());
        builder = self.add_property_files(builder, &active_profiles);
        builder = builder.add_property_source(Box::new(EnvironmentPropertySource::new(&self.env_prefix)));
        tracing::debug!("Environment variable prefix: {}", self.env_prefix);
        if !active_profiles.is_empty() {
            builder = builder.active_profiles(active_profiles);
        }
        if let Some(loader) = self.resource_loader {
            builder = builder.resource_loader(loader);
        }
        for customizer in self.customizers {
            builder = customizer(builder);
        }

        let context = builder.build();
        let refreshing = Arc::clone(&context);
        tokio::task::spawn_blocking(move || refreshing.refresh())
            .await
            .context("Context refresh task panicked")?
            .with_context(|| format!("Failed to refresh {}", context.display_name()))?;
        context.start().context("Failed to start lifecycle components")?;

        tracing::info!("Started {} in {}ms", self.name, start_time.elapsed().as_millis());
        Ok(RunningApplication { context })
    }

    /// 代码设置 > 环境变量 `{前缀}PROFILES_ACTIVE`
    fn resolve_active_profiles(&self, lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
        if !self.profiles.is_empty() {
            return self.profiles.clone();
        }
        lookup(&format!("{}{}", self.env_prefix, PROFILES_ACTIVE_SUFFIX))
            .map(|value| tokenize(&value, MULTI_VALUE_DELIMITERS))
            .unwrap_or_default()
    }

    /// 加载顺序（优先级从低到高）：`application.toml`，`application-{profile}.toml`
    fn add_property_files(
        &self,
        mut builder: ApplicationContextBuilder,
        active_profiles: &[String],
    ) -> ApplicationContextBuilder {
        for base in &self.property_files {
            if let Some(source) = load_property_file(base, 0) {
                builder = builder.add_property_source(Box::new(source));
            }
        }
        for (index, profile) in active_profiles.iter().enumerate() {
            for base in &self.property_files {
                let path = profile_config_path(base, profile);
                if let Some(source) = load_property_file(&path, 10 + index as i32) {
                    builder = builder.add_property_source(Box::new(source));
                }
            }
        }
        builder
    }

    fn print_banner(&self) {
        println!();
        println!(r"  ___ _ __  _ __(_) __ _ ");
        println!(r" / __| '_ \| '__| |/ _` |");
        println!(r" \__ \ |_) | |  | | (_| |");
        println!(r" |___/ .__/|_|  |_|\__, |");
        println!(r"     |_|           |___/ ");
        println!();
        println!("  :: Sprig ::        (v{})", env!("CARGO_PKG_VERSION"));
        println!();
    }
}

impl Default for SprigApplication {
    fn default() -> Self {
        Self::new("SprigApplication")
    }
}

/// `application.toml` -> `application-dev.toml`
fn profile_config_path(base_path: &str, profile: &str) -> String {
    match base_path.rfind('.') {
        Some(dot) => {
            let (name, ext) = base_path.split_at(dot);
            format!("{}-{}{}", name, profile, ext)
        }
        None => format!("{}-{}", base_path, profile),
    }
}

fn load_property_file(path: &str, priority: i32) -> Option<TomlPropertySource> {
    if !Path::new(path).exists() {
        tracing::debug!("Configuration file not found: {}", path);
        return None;
    }
    match TomlPropertySource::from_file(path) {
        Ok(source) => {
            tracing::info!("Loaded configuration from: {} (priority: {})", path, priority);
            Some(source.with_priority(priority))
        }
        Err(e) => {
            tracing::warn!("Failed to load {}: {}", path, e);
            None
        }
    }
}

/// 已启动的应用
#[derive(Debug)]
pub struct RunningApplication {
    context: Arc<ApplicationContext>,
}

impl RunningApplication {
    pub fn context(&self) -> &Arc<ApplicationContext> {
        &self.context
    }

    /// 等待 Ctrl-C，然后关闭上下文
    pub async fn wait_for_shutdown(self) -> anyhow::Result<()> {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for the shutdown signal")?;
        tracing::info!("Shutdown signal received");
        self.shutdown();
        Ok(())
    }

    pub fn shutdown(self) {
        self.context.close();
    }
}
