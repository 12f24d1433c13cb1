use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use sprig_core::prelude::*;
use sprig_core::{BeanClassRegistration, Capability, Object, Value};

// ==================== 基础设施 ====================

/// 数据库连接配置，属性来自 application.toml
#[derive(Debug, Default)]
struct Database {
    host: RwLock<String>,
    port: AtomicU16,
    max_connections: AtomicUsize,
}

impl Bean for Database {
    fn set_property(&self, name: &str, value: Value) -> anyhow::Result<()> {
        match name {
            "host" => *self.host.write() = value.parse()?,
            "port" => self.port.store(value.parse()?, Ordering::SeqCst),
            "max_connections" => self.max_connections.store(value.parse()?, Ordering::SeqCst),
            _ => return Err(unknown_property(name)),
        }
        Ok(())
    }

    fn invoke_method(&self, name: &str) -> Option<anyhow::Result<()>> {
        match name {
            "close" => {
                println!("🗄️  Closing database connections to {}", self.endpoint());
                Some(Ok(()))
            }
            _ => None,
        }
    }
}

impl Database {
    fn endpoint(&self) -> String {
        format!("{}:{}", self.host.read(), self.port.load(Ordering::SeqCst))
    }
}

fn database_class() -> BeanClass {
    BeanClass::new("Database")
        .default_constructor(|| Ok(Database::default()))
        .property(PropertyDescriptor::simple("host"))
        .property(PropertyDescriptor::simple("port"))
        .property(PropertyDescriptor::simple("max_connections"))
}

// ==================== 业务服务 ====================

#[derive(Debug)]
struct UserRepository {
    database: Arc<Database>,
}

impl Bean for UserRepository {}

impl UserRepository {
    fn find_name(&self, id: u32) -> String {
        format!("user-{} (from {})", id, self.database.endpoint())
    }
}

fn user_repository_class() -> BeanClass {
    BeanClass::new("UserRepository")
        .assignable_to("Repository")
        .constructor(vec![Parameter::new("database", "Database")], |args| {
            Ok(UserRepository {
                database: args.object::<Database>(0)?,
            })
        })
}

/// 仅在 dev profile 下存在
#[derive(Debug, Default)]
struct UserCache {
    hits: AtomicUsize,
}

impl Bean for UserCache {}

fn user_cache_class() -> BeanClass {
    BeanClass::new("UserCache").default_constructor(|| Ok(UserCache::default()))
}

struct UserService {
    repository: Arc<UserRepository>,
    cache: Option<Arc<UserCache>>,
}

impl Bean for UserService {}

impl UserService {
    fn describe(&self, id: u32) -> String {
        if let Some(cache) = &self.cache {
            cache.hits.fetch_add(1, Ordering::SeqCst);
        }
        self.repository.find_name(id)
    }
}

fn user_service_class() -> BeanClass {
    BeanClass::new("UserService").constructor(
        vec![
            Parameter::new("repository", "Repository"),
            Parameter::new("cache", "UserCache").optional(),
        ],
        |args| {
            Ok(UserService {
                repository: args.object::<UserRepository>(0)?,
                cache: args.optional::<UserCache>(1)?,
            })
        },
    )
}

/// 参与上下文 start/stop 的服务器组件
struct Server {
    name: String,
    host: RwLock<String>,
    port: AtomicU16,
    users: Mutex<Option<Object>>,
    running: AtomicBool,
}

impl Bean for Server {
    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::BeanNameAware, Capability::Lifecycle]
    }

    fn set_property(&self, name: &str, value: Value) -> anyhow::Result<()> {
        match name {
            "host" => *self.host.write() = value.parse()?,
            "port" => self.port.store(value.parse()?, Ordering::SeqCst),
            "users" => *self.users.lock() = value.as_object().cloned(),
            _ => return Err(unknown_property(name)),
        }
        Ok(())
    }

    fn set_bean_name(&self, name: &str) {
        tracing::debug!("Server component registered as '{}'", name);
    }

    fn invoke_method(&self, name: &str) -> Option<anyhow::Result<()>> {
        match name {
            "init" => Some(self.init()),
            "shutdown" => {
                println!("👋 {} shutting down", self.name);
                Some(Ok(()))
            }
            _ => None,
        }
    }

    fn start(&self) {
        println!("🚀 {} listening on {}", self.name, self.address());
        self.running.store(true, Ordering::SeqCst);
    }

    fn stop(&self) {
        println!("🛑 {} stopped", self.name);
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Server {
    fn init(&self) -> anyhow::Result<()> {
        if self.users.lock().is_none() {
            anyhow::bail!("server requires a user service");
        }
        println!("🎉 {} initialized, will bind to {}", self.name, self.address());
        Ok(())
    }

    fn address(&self) -> String {
        format!("{}:{}", self.host.read(), self.port.load(Ordering::SeqCst))
    }

    fn handle_request(&self, id: u32) -> anyhow::Result<String> {
        let users = self
            .users
            .lock()
            .clone()
            .ok_or_else(|| anyhow!("no user service"))?;
        let users = users
            .downcast_ref::<UserService>()
            .ok_or_else(|| anyhow!("unexpected user service type"))?;
        Ok(users.describe(id))
    }
}

fn server_class() -> BeanClass {
    BeanClass::new("Server")
        .constructor(vec![Parameter::new("name", "String")], |args| {
            Ok(Server {
                name: args.text(0)?.to_string(),
                host: RwLock::new(String::new()),
                port: AtomicU16::new(0),
                users: Mutex::new(None),
                running: AtomicBool::new(false),
            })
        })
        .property(PropertyDescriptor::simple("host"))
        .property(PropertyDescriptor::simple("port"))
        .property(PropertyDescriptor::object("users", "UserService"))
}

inventory::submit! { BeanClassRegistration::new("Database", database_class) }
inventory::submit! { BeanClassRegistration::new("UserRepository", user_repository_class) }
inventory::submit! { BeanClassRegistration::new("UserCache", user_cache_class) }
inventory::submit! { BeanClassRegistration::new("Server", server_class) }

// ==================== 主程序 ====================

/// 从仓库根目录或示例目录运行都能找到配置
fn locate(file: &str) -> String {
    let in_demo = format!("demos/app-demo/{}", file);
    if Path::new(&in_demo).exists() {
        in_demo
    } else {
        file.to_string()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let running = SprigApplication::new("SprigDemo")
        .property_files([locate("application.toml")])
        .bean_config(locate("beans.toml"))
        .env_prefix("APP_")
        // 不通过 inventory 注册的类型可以在这里手动注册
        .customize(|builder| builder.register_class(user_service_class()))
        .run()
        .await?;

    {
        let context = running.context();
        println!("\n📦 Beans: {:?}", context.get_bean_names());
        println!("   Active profiles: {:?}", context.environment().get_active_profiles());

        let server = context.get_bean_typed::<Server>("server")?;
        for id in [1, 2] {
            println!("🔧 GET /users/{} -> {}", id, server.handle_request(id)?);
        }

        // 别名与规范名称指向同一个实例
        let by_alias = context.get_bean("users")?;
        let by_name = context.get_bean("userRepository")?;
        println!("   'users' is an alias of 'userRepository': {}", Arc::ptr_eq(&by_alias, &by_name));
    }

    if std::env::var("SPRIG_DEMO_WAIT").is_ok() {
        println!("\nPress Ctrl-C to stop");
        return running.wait_for_shutdown().await;
    }
    running.shutdown();
    Ok(())
}
