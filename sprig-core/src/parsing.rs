//! 配置解析状态、问题报告与读取事件
//!
//! `ParseState` 记录当前在配置单元中的位置（单元 → Bean → 属性 ...），
//! 以便错误信息能准确指出出错的条目。

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

/// 解析状态中的一个条目
///
/// 条目对解析栈来说是不透明的，只需要能够描述自己
pub trait ParseEntry: fmt::Display + fmt::Debug + Send + Sync {}

/// 内置的解析条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Unit(String),
    Bean(String),
    InnerBean,
    Property(String),
    ConstructorArgument(usize),
    Import(String),
    Alias(String),
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Unit(path) if path.is_empty() => write!(f, "Unit"),
            Entry::Unit(path) => write!(f, "Unit '{}'", path),
            Entry::Bean(name) => write!(f, "Bean '{}'", name),
            Entry::InnerBean => write!(f, "Inner bean"),
            Entry::Property(name) => write!(f, "Property '{}'", name),
            Entry::ConstructorArgument(index) => write!(f, "Constructor-arg #{}", index),
            Entry::Import(location) => write!(f, "Import '{}'", location),
            Entry::Alias(alias) => write!(f, "Alias '{}'", alias),
        }
    }
}

impl ParseEntry for Entry {}

/// 解析位置栈（后进先出）
#[derive(Debug, Clone, Default)]
pub struct ParseState {
    entries: Vec<Arc<dyn ParseEntry>>,
}

impl ParseState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: impl ParseEntry + 'static) {
        self.entries.push(Arc::new(entry));
    }

    pub fn pop(&mut self) -> Option<Arc<dyn ParseEntry>> {
        self.entries.pop()
    }

    /// 当前最内层条目
    pub fn peek(&self) -> Option<&Arc<dyn ParseEntry>> {
        self.entries.last()
    }

    /// 独立的副本，之后对原栈的修改不会影响副本
    pub fn snapshot(&self) -> ParseState {
        self.clone()
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for ParseState {
    /// 从最内层开始，每一层缩进一个制表符
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (depth, entry) in self.entries.iter().rev().enumerate() {
            if depth > 0 {
                f.write_str("\n")?;
                for _ in 0..depth {
                    f.write_str("\t")?;
                }
                f.write_str("-> ")?;
            }
            write!(f, "{}", entry)?;
        }
        Ok(())
    }
}

/// 配置来源位置：资源描述 + 资源内的条目路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub resource: String,
    pub path: String,
}

impl SourceLocation {
    pub fn new(resource: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.resource)
        } else {
            write!(f, "{} [{}]", self.resource, self.path)
        }
    }
}

/// 配置问题
#[derive(Debug, Clone)]
pub struct Problem {
    message: String,
    resource: String,
    parse_state: ParseState,
    cause: Option<String>,
}

impl Problem {
    pub fn new(message: impl Into<String>, resource: impl Into<String>, parse_state: ParseState) -> Self {
        Self {
            message: message.into(),
            resource: resource.into(),
            parse_state,
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn parse_state(&self) -> &ParseState {
        &self.parse_state
    }

    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration problem: {}", self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, "; nested exception is {}", cause)?;
        }
        write!(f, "\nOffending resource: {}", self.resource)?;
        if !self.parse_state.is_empty() {
            write!(f, "\n\n{}", self.parse_state)?;
        }
        Ok(())
    }
}

/// 配置问题接收者
pub trait ProblemReporter: Send + Sync {
    fn error(&self, problem: Problem);

    fn warning(&self, problem: Problem);
}

/// 收集所有问题并记录日志的报告器
#[derive(Debug, Default)]
pub struct CollectingProblemReporter {
    errors: Mutex<Vec<Problem>>,
    warnings: Mutex<Vec<Problem>>,
}

impl CollectingProblemReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<Problem> {
        self.errors.lock().clone()
    }

    pub fn warnings(&self) -> Vec<Problem> {
        self.warnings.lock().clone()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.lock().is_empty()
    }

    /// 取出并清空已收集的错误
    pub fn take_errors(&self) -> Vec<Problem> {
        std::mem::take(&mut *self.errors.lock())
    }
}

impl ProblemReporter for CollectingProblemReporter {
    fn error(&self, problem: Problem) {
        tracing::error!("{}", problem);
        self.errors.lock().push(problem);
    }

    fn warning(&self, problem: Problem) {
        tracing::warn!("{}", problem);
        self.warnings.lock().push(problem);
    }
}

/// 一次导入处理完成
#[derive(Debug, Clone)]
pub struct ImportEvent {
    /// 配置中声明的位置（占位符已解析）
    pub location: String,
    /// 实际加载的资源
    pub actual_resources: Vec<String>,
    pub source: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct AliasEvent {
    pub name: String,
    pub alias: String,
    pub source: SourceLocation,
}

/// 一个 Bean 定义（连同其别名）注册完成
#[derive(Debug, Clone)]
pub struct ComponentEvent {
    pub name: String,
    pub aliases: Vec<String>,
    pub class_name: Option<String>,
    pub source: SourceLocation,
}

/// 读取事件监听器，默认实现全部为空
pub trait ReaderEventListener: Send + Sync {
    fn on_import_processed(&self, _event: ImportEvent) {}

    fn on_alias_registered(&self, _event: AliasEvent) {}

    fn on_component_registered(&self, _event: ComponentEvent) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyReaderEventListener;

impl ReaderEventListener for EmptyReaderEventListener {}

#[derive(Debug, Clone)]
pub enum ReaderEvent {
    Import(ImportEvent),
    Alias(AliasEvent),
    Component(ComponentEvent),
}

/// 将读取事件转发到 tokio channel 的监听器
///
/// 发送不需要运行时，接收端可以在异步任务中消费
#[derive(Debug, Clone)]
pub struct ChannelReaderEventListener {
    sender: mpsc::UnboundedSender<ReaderEvent>,
}

impl ChannelReaderEventListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ReaderEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn send(&self, event: ReaderEvent) {
        // 接收端已关闭时静默丢弃
        if self.sender.send(event).is_err() {
            tracing::trace!("Reader event receiver dropped, event discarded");
        }
    }
}

impl ReaderEventListener for ChannelReaderEventListener {
    fn on_import_processed(&self, event: ImportEvent) {
        self.send(ReaderEvent::Import(event));
    }

    fn on_alias_registered(&self, event: AliasEvent) {
        self.send(ReaderEvent::Alias(event));
    }

    fn on_component_registered(&self, event: ComponentEvent) {
        self.send(ReaderEvent::Component(event));
    }
}

/// 记录已处理资源位置的简单集合，用于检测循环导入
#[derive(Debug, Default)]
pub(crate) struct LoadingSet {
    locations: HashSet<String>,
}

impl LoadingSet {
    /// 返回 false 表示该位置已在加载中
    pub(crate) fn enter(&mut self, location: &str) -> bool {
        self.locations.insert(location.to_string())
    }

    pub(crate) fn leave(&mut self, location: &str) {
        self.locations.remove(location);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_state_push_pop_peek() {
        let mut state = ParseState::new();
        assert!(state.peek().is_none());

        state.push(Entry::Bean("dataSource".into()));
        state.push(Entry::Property("url".into()));
        assert_eq!(state.depth(), 2);
        assert_eq!(state.peek().unwrap().to_string(), "Property 'url'");

        let popped = state.pop().unwrap();
        assert_eq!(popped.to_string(), "Property 'url'");
        assert_eq!(state.peek().unwrap().to_string(), "Bean 'dataSource'");
        state.pop();
        assert!(state.is_empty());
        assert!(state.pop().is_none());
    }

    #[test]
    fn test_parse_state_display_innermost_first() {
        let mut state = ParseState::new();
        state.push(Entry::Bean("repository".into()));
        state.push(Entry::Property("dataSource".into()));
        state.push(Entry::InnerBean);

        assert_eq!(
            state.to_string(),
            "Inner bean\n\t-> Property 'dataSource'\n\t\t-> Bean 'repository'"
        );
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut state = ParseState::new();
        state.push(Entry::Bean("a".into()));
        let snapshot = state.snapshot();
        state.push(Entry::Property("p".into()));
        state.pop();
        state.pop();

        assert!(state.is_empty());
        assert_eq!(snapshot.depth(), 1);
        assert_eq!(snapshot.to_string(), "Bean 'a'");
    }

    #[test]
    fn test_problem_display_includes_resource_and_state() {
        let mut state = ParseState::new();
        state.push(Entry::Bean("broken".into()));
        let problem = Problem::new("Unknown scope 'weird'", "resource [mem:/app.toml]", state.snapshot());
        let text = problem.to_string();
        assert!(text.starts_with("Configuration problem: Unknown scope 'weird'"));
        assert!(text.contains("Offending resource: resource [mem:/app.toml]"));
        assert!(text.ends_with("Bean 'broken'"));
    }

    #[test]
    fn test_collecting_reporter() {
        let reporter = CollectingProblemReporter::new();
        reporter.error(Problem::new("bad", "r", ParseState::new()));
        reporter.warning(Problem::new("odd", "r", ParseState::new()));
        assert!(reporter.has_errors());
        assert_eq!(reporter.warnings().len(), 1);
        assert_eq!(reporter.take_errors().len(), 1);
        assert!(!reporter.has_errors());
    }

    #[test]
    fn test_channel_listener_forwards_events() {
        let (listener, mut receiver) = ChannelReaderEventListener::new();
        listener.on_alias_registered(AliasEvent {
            name: "a".into(),
            alias: "b".into(),
            source: SourceLocation::new("mem:/x.toml", "alias[0]"),
        });
        match receiver.try_recv().unwrap() {
            ReaderEvent::Alias(event) => assert_eq!(event.alias, "b"),
            other => panic!("unexpected event {:?}", other),
        }
    }
}
