//! 组件类型描述
//!
//! Rust 没有运行时反射，组件通过 [`BeanClass`] 显式描述自己：可赋值的类型、
//! 构造器（参数列表 + 实例化闭包）以及可写属性。配置文件中的 `class` 字段
//! 按名称在 [`TypeRegistry`] 中查找对应的描述。

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use parking_lot::RwLock;

use crate::bean::{downcast_object, Bean, Object, Value};

/// 类型标识，用于按类型查找和自动装配
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(Cow<'static, str>);

impl TypeKey {
    pub const fn from_static(name: &'static str) -> Self {
        TypeKey(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        TypeKey(Cow::Owned(name.into()))
    }

    /// 以 Rust 类型名作为标识
    pub fn of<T: ?Sized>() -> Self {
        TypeKey(Cow::Borrowed(std::any::type_name::<T>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeKey {
    fn from(name: &str) -> Self {
        TypeKey::new(name)
    }
}

impl From<String> for TypeKey {
    fn from(name: String) -> Self {
        TypeKey::new(name)
    }
}

/// 构造器参数
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeKey,
    /// 注入该类型的所有候选
    pub multiple: bool,
    pub required: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: impl Into<TypeKey>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            multiple: false,
            required: true,
        }
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// 文本值（字符串、数字、布尔），不参与自动装配
    Simple,
    /// 单个对象引用
    Object,
    /// 同一类型的对象列表
    Collection,
}

/// 可写属性描述
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    pub name: String,
    pub ty: TypeKey,
    pub kind: PropertyKind,
    /// 声明该属性的接口（用于忽略某些回调接口的属性）
    pub declared_by: Option<TypeKey>,
}

impl PropertyDescriptor {
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: TypeKey::from_static("String"),
            kind: PropertyKind::Simple,
            declared_by: None,
        }
    }

    pub fn object(name: impl Into<String>, ty: impl Into<TypeKey>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            kind: PropertyKind::Object,
            declared_by: None,
        }
    }

    pub fn collection(name: impl Into<String>, element_type: impl Into<TypeKey>) -> Self {
        Self {
            name: name.into(),
            ty: element_type.into(),
            kind: PropertyKind::Collection,
            declared_by: None,
        }
    }

    pub fn declared_by(mut self, ty: impl Into<TypeKey>) -> Self {
        self.declared_by = Some(ty.into());
        self
    }

    pub fn is_simple(&self) -> bool {
        self.kind == PropertyKind::Simple
    }
}

/// 构造器实参
#[derive(Debug, Clone, Default)]
pub struct Arguments(Vec<Value>);

impl Arguments {
    pub fn new(values: Vec<Value>) -> Self {
        Arguments(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> anyhow::Result<&Value> {
        self.0
            .get(index)
            .ok_or_else(|| anyhow!("missing constructor argument #{}", index))
    }

    pub fn text(&self, index: usize) -> anyhow::Result<&str> {
        let value = self.get(index)?;
        value
            .as_text()
            .ok_or_else(|| anyhow!("argument #{} is not a text value: {:?}", index, value))
    }

    pub fn parse<T>(&self, index: usize) -> anyhow::Result<T>
    where
        T: std::str::FromStr,
        T::Err: fmt::Display,
    {
        self.get(index)?.parse()
    }

    pub fn object<T: Bean>(&self, index: usize) -> anyhow::Result<Arc<T>> {
        self.get(index)?.downcast()
    }

    /// 缺省值（`Value::Absent`）返回 `None`
    pub fn optional<T: Bean>(&self, index: usize) -> anyhow::Result<Option<Arc<T>>> {
        match self.get(index)? {
            Value::Absent => Ok(None),
            Value::Object(object) => downcast_object::<T>(object)
                .map(Some)
                .ok_or_else(|| anyhow!("argument #{} is not of type '{}'", index, std::any::type_name::<T>())),
            other => Err(anyhow!("argument #{} is not an object: {:?}", index, other)),
        }
    }

    pub fn list<T: Bean>(&self, index: usize) -> anyhow::Result<Vec<Arc<T>>> {
        self.get(index)?.downcast_list()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0
    }
}

type Instantiator = Arc<dyn Fn(Arguments) -> anyhow::Result<Object> + Send + Sync>;

/// 构造器：参数描述 + 实例化闭包
#[derive(Clone)]
pub struct Constructor {
    params: Vec<Parameter>,
    instantiate: Instantiator,
}

impl Constructor {
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn instantiate(&self, args: Arguments) -> anyhow::Result<Object> {
        (self.instantiate)(args)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor").field("params", &self.params).finish()
    }
}

/// 组件类型描述
#[derive(Debug, Clone)]
pub struct BeanClass {
    name: String,
    types: Vec<TypeKey>,
    constructors: Vec<Constructor>,
    properties: Vec<PropertyDescriptor>,
}

impl BeanClass {
    /// 类名本身总是一个可赋值类型
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            types: vec![TypeKey::new(name.clone())],
            name,
            constructors: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// 声明可以按该类型注入（实现的接口/父类）
    pub fn assignable_to(mut self, ty: impl Into<TypeKey>) -> Self {
        let ty = ty.into();
        if !self.types.contains(&ty) {
            self.types.push(ty);
        }
        self
    }

    pub fn default_constructor<T, F>(self, factory: F) -> Self
    where
        T: Bean,
        F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.constructor(Vec::new(), move |_| factory())
    }

    pub fn constructor<T, F>(mut self, params: Vec<Parameter>, factory: F) -> Self
    where
        T: Bean,
        F: Fn(Arguments) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.constructors.push(Constructor {
            params,
            instantiate: Arc::new(move |args| factory(args).map(|bean| Arc::new(bean) as Object)),
        });
        self
    }

    pub fn property(mut self, descriptor: PropertyDescriptor) -> Self {
        self.properties.push(descriptor);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn types(&self) -> &[TypeKey] {
        &self.types
    }

    pub fn is_assignable_to(&self, ty: &TypeKey) -> bool {
        self.types.contains(ty)
    }

    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    pub fn no_arg_constructor(&self) -> Option<&Constructor> {
        self.constructors.iter().find(|c| c.params.is_empty())
    }

    /// 按声明顺序第一个参数个数匹配的构造器
    pub fn constructor_with_arity(&self, arity: usize) -> Option<&Constructor> {
        self.constructors.iter().find(|c| c.params.len() == arity)
    }

    /// 按参数个数降序排列（参数个数相同时保持声明顺序）
    pub fn constructors_by_greed(&self) -> Vec<&Constructor> {
        let mut sorted: Vec<&Constructor> = self.constructors.iter().collect();
        sorted.sort_by(|a, b| b.params.len().cmp(&a.params.len()));
        sorted
    }

    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    pub fn find_property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// 静态注册的组件类型，通过 `inventory::submit!` 提交
///
/// ```rust,ignore
/// inventory::submit! {
///     BeanClassRegistration::new("UserService", user_service_class)
/// }
/// ```
pub struct BeanClassRegistration {
    pub name: &'static str,
    pub build: fn() -> BeanClass,
}

impl BeanClassRegistration {
    pub const fn new(name: &'static str, build: fn() -> BeanClass) -> Self {
        Self { name, build }
    }
}

inventory::collect!(BeanClassRegistration);

/// 按名称索引的组件类型表
#[derive(Debug, Default)]
pub struct TypeRegistry {
    classes: RwLock<HashMap<String, Arc<BeanClass>>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 同名类型会被替换
    pub fn register(&self, class: BeanClass) {
        let name = class.name().to_string();
        if self.classes.write().insert(name.clone(), Arc::new(class)).is_some() {
            tracing::debug!("Replacing bean class '{}'", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<BeanClass>> {
        self.classes.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.read().is_empty()
    }

    /// 注册所有通过 inventory 提交的类型，返回注册数量
    pub fn register_submitted(&self) -> usize {
        let mut count = 0;
        for registration in inventory::iter::<BeanClassRegistration> {
            let class = (registration.build)();
            if class.name() != registration.name {
                tracing::warn!(
                    "Bean class registration '{}' built a class named '{}'",
                    registration.name,
                    class.name()
                );
            }
            self.register(class);
            count += 1;
        }
        tracing::debug!("Registered {} submitted bean classes", count);
        count
    }
}

/// 将文本配置值转换为注入值
pub trait TypeConverter: Send + Sync {
    fn convert(&self, raw: &str, target: Option<&TypeKey>) -> anyhow::Result<Value>;
}

/// 默认转换器：原样作为文本传递，由组件自行解析
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleTypeConverter;

impl TypeConverter for SimpleTypeConverter {
    fn convert(&self, raw: &str, _target: Option<&TypeKey>) -> anyhow::Result<Value> {
        Ok(Value::Text(raw.to_string()))
    }
}
