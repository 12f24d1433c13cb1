//! 配置资源抽象
//!
//! 支持文件系统资源和 `mem:` 前缀的内存资源。相对位置的解析遵循
//! URL 风格：以当前资源所在“目录”为基准拼接。

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

pub const FILE_URL_PREFIX: &str = "file:";
pub const MEMORY_URL_PREFIX: &str = "mem:";

/// 可读取的配置资源
pub trait Resource: fmt::Debug + Send + Sync {
    /// 规范化后的位置，同一资源的位置相同
    fn location(&self) -> &str;

    fn description(&self) -> String {
        format!("resource [{}]", self.location())
    }

    fn exists(&self) -> bool;

    fn read_to_string(&self) -> io::Result<String>;

    /// 相对于本资源创建新资源，新资源不一定存在
    fn create_relative(&self, relative_path: &str) -> Arc<dyn Resource>;

    /// 资源的 URL 形式，用于基于字符串的相对路径解析
    fn url(&self) -> io::Result<String>;
}

/// 按位置获取资源
pub trait ResourceLoader: Send + Sync {
    fn get_resource(&self, location: &str) -> Arc<dyn Resource>;
}

/// 位置是否是带协议前缀的绝对 URL（`file:`、`mem:`、`https:` ...）
///
/// 单个字母的前缀视为 Windows 盘符，不算 URL
pub fn is_url(location: &str) -> bool {
    let Some(colon) = location.find(':') else {
        return false;
    };
    let scheme = &location[..colon];
    scheme.len() > 1
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
}

/// 将相对路径应用到给定路径上：替换最后一个 `/` 之后的部分
pub fn apply_relative_path(path: &str, relative_path: &str) -> String {
    match path.rfind('/') {
        Some(separator) => {
            let mut new_path = path[..separator].to_string();
            if !relative_path.starts_with('/') {
                new_path.push('/');
            }
            new_path.push_str(relative_path);
            new_path
        }
        None => relative_path.to_string(),
    }
}

/// 规范化路径中的 `.` 和 `..` 片段，保留协议前缀
pub fn clean_path(path: &str) -> String {
    let (prefix, rest) = match path.find(':') {
        Some(colon) if is_url(path) => path.split_at(colon + 1),
        _ => ("", path),
    };
    let absolute = rest.starts_with('/');

    let mut segments: Vec<&str> = Vec::new();
    let mut leading_parents = 0;
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() && !absolute {
                    leading_parents += 1;
                }
            }
            other => segments.push(other),
        }
    }

    let mut cleaned = String::with_capacity(path.len());
    cleaned.push_str(prefix);
    if absolute {
        cleaned.push('/');
    }
    let parents = std::iter::repeat("..").take(leading_parents);
    let joined: Vec<&str> = parents.chain(segments).collect();
    cleaned.push_str(&joined.join("/"));
    cleaned
}

/// 文件系统资源
#[derive(Debug, Clone)]
pub struct FileSystemResource {
    path: PathBuf,
    location: String,
}

impl FileSystemResource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = PathBuf::from(clean_path(&path.as_ref().to_string_lossy()));
        let location = path.to_string_lossy().into_owned();
        Self { path, location }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Resource for FileSystemResource {
    fn location(&self) -> &str {
        &self.location
    }

    fn description(&self) -> String {
        format!("file [{}]", self.location)
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn read_to_string(&self) -> io::Result<String> {
        std::fs::read_to_string(&self.path)
    }

    fn create_relative(&self, relative_path: &str) -> Arc<dyn Resource> {
        Arc::new(FileSystemResource::new(apply_relative_path(&self.location, relative_path)))
    }

    fn url(&self) -> io::Result<String> {
        let absolute = if self.path.is_absolute() {
            self.path.clone()
        } else {
            std::env::current_dir()?.join(&self.path)
        };
        Ok(format!("{}{}", FILE_URL_PREFIX, clean_path(&absolute.to_string_lossy())))
    }
}

/// 基于文件系统的资源加载器
///
/// 不带协议的位置相对于 `base_dir` 解析，开头的 `/` 会被去掉；
/// 需要绝对路径时使用 `file:` 前缀。
#[derive(Debug, Clone)]
pub struct FileSystemResourceLoader {
    base_dir: PathBuf,
}

impl FileSystemResourceLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }
}

impl Default for FileSystemResourceLoader {
    fn default() -> Self {
        Self::new(".")
    }
}

impl ResourceLoader for FileSystemResourceLoader {
    fn get_resource(&self, location: &str) -> Arc<dyn Resource> {
        if let Some(path) = location.strip_prefix(FILE_URL_PREFIX) {
            return Arc::new(FileSystemResource::new(path));
        }
        let relative = location.trim_start_matches('/');
        Arc::new(FileSystemResource::new(self.base_dir.join(relative)))
    }
}

/// 内存资源存储，位置形如 `mem:/config/app.toml`
#[derive(Debug, Clone, Default)]
pub struct InMemoryResourceLoader {
    files: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryResourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, location: &str, content: impl Into<String>) -> Self {
        self.insert(location, content);
        self
    }

    pub fn insert(&self, location: &str, content: impl Into<String>) {
        self.files.write().insert(normalize_memory_location(location), content.into());
    }

    pub fn remove(&self, location: &str) {
        self.files.write().remove(&normalize_memory_location(location));
    }
}

impl ResourceLoader for InMemoryResourceLoader {
    fn get_resource(&self, location: &str) -> Arc<dyn Resource> {
        Arc::new(MemoryResource {
            location: normalize_memory_location(location),
            files: Arc::clone(&self.files),
        })
    }
}

fn normalize_memory_location(location: &str) -> String {
    let path = location.strip_prefix(MEMORY_URL_PREFIX).unwrap_or(location);
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    format!("{}{}", MEMORY_URL_PREFIX, clean_path(&path))
}

#[derive(Clone)]
pub struct MemoryResource {
    location: String,
    files: Arc<RwLock<HashMap<String, String>>>,
}

impl fmt::Debug for MemoryResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryResource")
            .field("location", &self.location)
            .finish()
    }
}

impl Resource for MemoryResource {
    fn location(&self) -> &str {
        &self.location
    }

    fn exists(&self) -> bool {
        self.files.read().contains_key(&self.location)
    }

    fn read_to_string(&self) -> io::Result<String> {
        self.files.read().get(&self.location).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", self.location),
            )
        })
    }

    fn create_relative(&self, relative_path: &str) -> Arc<dyn Resource> {
        Arc::new(MemoryResource {
            location: normalize_memory_location(&apply_relative_path(&self.location, relative_path)),
            files: Arc::clone(&self.files),
        })
    }

    fn url(&self) -> io::Result<String> {
        Ok(self.location.clone())
    }
}
