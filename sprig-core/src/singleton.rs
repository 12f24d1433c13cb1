//! 单例注册表
//!
//! 保存完整创建的单例、为解决循环引用而提前暴露的引用，以及 Bean 之间的依赖关系。
//! 所有单例创建都在同一把可重入锁下进行：同一名称并发请求时只有一个线程执行创建，
//! 其他线程等待并拿到同一个实例。

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, ReentrantMutex, RwLock};

use crate::bean::Object;
use crate::error::{BeansError, BeansResult};
use crate::lifecycle::{InstanceRecord, LifecyclePhase};
use crate::utils::dependency::{is_reachable, CreationTracker};

/// 提前暴露引用的工厂，只会被调用一次
pub type EarlyReferenceFactory = Box<dyn FnOnce() -> Object + Send>;

#[derive(Default)]
pub struct SingletonRegistry {
    /// 完整创建的单例
    singletons: RwLock<HashMap<String, Object>>,
    registration_order: RwLock<Vec<String>>,
    /// 已提前暴露的引用
    early_singletons: Mutex<HashMap<String, Object>>,
    singleton_factories: Mutex<HashMap<String, EarlyReferenceFactory>>,
    creation_lock: ReentrantMutex<()>,
    in_creation: Mutex<CreationTracker>,
    /// bean → 依赖它的 bean
    dependent_beans: RwLock<HashMap<String, Vec<String>>>,
    /// bean → 它依赖的 bean
    dependencies_for_bean: RwLock<HashMap<String, Vec<String>>>,
    records: Mutex<Vec<InstanceRecord>>,
    destroying: AtomicBool,
}

impl std::fmt::Debug for SingletonRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingletonRegistry")
            .field("singletons", &*self.registration_order.read())
            .field("in_creation", &self.in_creation.lock().current_creating())
            .finish()
    }
}

impl SingletonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 只返回完整创建的单例，不会阻塞
    pub fn get_singleton(&self, name: &str) -> Option<Object> {
        self.singletons.read().get(name).cloned()
    }

    /// 允许返回提前暴露的引用
    ///
    /// 提前引用只对持有创建锁的线程可见；其他线程会等待创建完成
    pub fn get_singleton_allow_early(&self, name: &str) -> Option<Object> {
        if let Some(object) = self.get_singleton(name) {
            return Some(object);
        }
        if !self.is_currently_in_creation(name) {
            return None;
        }
        let _guard = self.creation_lock.lock();
        if let Some(object) = self.get_singleton(name) {
            return Some(object);
        }
        if let Some(early) = self.early_singletons.lock().get(name).cloned() {
            return Some(early);
        }
        let factory = self.singleton_factories.lock().remove(name)?;
        let early = factory();
        self.early_singletons.lock().insert(name.to_string(), early.clone());
        Some(early)
    }

    /// 已经被其他 Bean 取走的提前引用
    pub(crate) fn early_reference_if_exposed(&self, name: &str) -> Option<Object> {
        self.early_singletons.lock().get(name).cloned()
    }

    pub fn contains_singleton(&self, name: &str) -> bool {
        self.singletons.read().contains_key(name)
    }

    /// 单例名称，按创建完成的顺序
    pub fn singleton_names(&self) -> Vec<String> {
        self.registration_order.read().clone()
    }

    pub fn singleton_count(&self) -> usize {
        self.singletons.read().len()
    }

    /// 获取单例，不存在时在创建锁下调用 `create` 创建
    pub fn get_or_create<F>(&self, name: &str, create: F) -> BeansResult<Object>
    where
        F: FnOnce() -> BeansResult<Object>,
    {
        let _guard = self.creation_lock.lock();
        if let Some(existing) = self.get_singleton(name) {
            return Ok(existing);
        }
        if self.destroying.load(Ordering::SeqCst) {
            return Err(BeansError::IllegalState(format!(
                "Singleton bean creation not allowed while singletons of this factory are in destruction: '{}'",
                name
            )));
        }

        tracing::debug!("Creating shared instance of singleton bean '{}'", name);
        self.before_singleton_creation(name)?;
        let result = create();
        self.after_singleton_creation(name);

        match result {
            Ok(object) => {
                self.add_singleton(name, object.clone());
                Ok(object)
            }
            Err(err) => {
                // 提前引用可能已经注入到其他 Bean 中，连同依赖者一起销毁
                self.destroy_singleton(name);
                Err(err)
            }
        }
    }

    fn before_singleton_creation(&self, name: &str) -> BeansResult<()> {
        let mut tracker = self.in_creation.lock();
        if !tracker.start_creating(name) {
            return Err(BeansError::CircularReference {
                bean: name.to_string(),
                chain: tracker.cycle_through(name),
            });
        }
        Ok(())
    }

    fn after_singleton_creation(&self, name: &str) {
        self.in_creation.lock().finish_creating(name);
    }

    pub fn is_currently_in_creation(&self, name: &str) -> bool {
        self.in_creation.lock().is_creating(name)
    }

    /// 当前正在创建的 Bean（由外向内）
    pub fn creation_chain(&self) -> Vec<String> {
        self.in_creation.lock().current_creating().to_vec()
    }

    fn add_singleton(&self, name: &str, object: Object) {
        let previous = self.singletons.write().insert(name.to_string(), object);
        self.remove_early(name);
        if previous.is_none() {
            self.registration_order.write().push(name.to_string());
        }
    }

    fn remove_early(&self, name: &str) {
        self.early_singletons.lock().remove(name);
        self.singleton_factories.lock().remove(name);
    }

    /// 注册外部创建的单例
    pub fn register_singleton(&self, name: &str, object: Object) -> BeansResult<()> {
        let _guard = self.creation_lock.lock();
        if self.contains_singleton(name) {
            return Err(BeansError::BeanDefinitionStore(format!(
                "Could not register object under bean name '{}': there is already an object bound",
                name
            )));
        }
        self.add_singleton(name, object);
        Ok(())
    }

    pub(crate) fn add_singleton_factory(&self, name: &str, factory: EarlyReferenceFactory) {
        let _guard = self.creation_lock.lock();
        if !self.contains_singleton(name) {
            self.singleton_factories.lock().insert(name.to_string(), factory);
            self.early_singletons.lock().remove(name);
        }
    }

    pub fn register_dependent_bean(&self, bean: &str, dependent: &str) {
        if bean == dependent {
            return;
        }
        {
            let mut dependents = self.dependent_beans.write();
            let entry = dependents.entry(bean.to_string()).or_default();
            if entry.iter().any(|d| d == dependent) {
                return;
            }
            entry.push(dependent.to_string());
        }
        self.dependencies_for_bean
            .write()
            .entry(dependent.to_string())
            .or_default()
            .push(bean.to_string());
    }

    /// `dependent` 是否（传递地）依赖 `bean`
    pub fn is_dependent(&self, bean: &str, dependent: &str) -> bool {
        let graph = self.dependent_beans.read();
        is_reachable(&graph, bean, dependent)
    }

    pub fn dependents_of(&self, bean: &str) -> Vec<String> {
        self.dependent_beans.read().get(bean).cloned().unwrap_or_default()
    }

    pub fn dependencies_of(&self, bean: &str) -> Vec<String> {
        self.dependencies_for_bean.read().get(bean).cloned().unwrap_or_default()
    }

    /// 记录进入 READY 状态的实例，销毁时按记录顺序的逆序处理
    pub(crate) fn register_record(&self, record: InstanceRecord) {
        let mut records = self.records.lock();
        records.retain(|existing| existing.name() != record.name());
        records.push(record);
    }

    pub fn lifecycle_phase(&self, name: &str) -> Option<LifecyclePhase> {
        self.records
            .lock()
            .iter()
            .find(|record| record.name() == name)
            .map(InstanceRecord::phase)
    }

    fn take_record(&self, name: &str) -> Option<InstanceRecord> {
        let mut records = self.records.lock();
        let position = records.iter().position(|record| record.name() == name)?;
        Some(records.remove(position))
    }

    /// 按创建顺序的逆序销毁所有单例，依赖者先于被依赖者销毁
    pub fn destroy_singletons(&self) {
        self.destroying.store(true, Ordering::SeqCst);
        let names: Vec<String> = self
            .records
            .lock()
            .iter()
            .map(|record| record.name().to_string())
            .collect();
        tracing::debug!("Destroying singletons in reverse creation order: {:?}", names);

        for name in names.iter().rev() {
            self.destroy_singleton(name);
        }

        self.singletons.write().clear();
        self.registration_order.write().clear();
        self.early_singletons.lock().clear();
        self.singleton_factories.lock().clear();
        self.dependent_beans.write().clear();
        self.dependencies_for_bean.write().clear();
        self.records.lock().clear();
        self.destroying.store(false, Ordering::SeqCst);
    }

    /// 销毁单个单例（以及依赖它的单例）
    pub fn destroy_singleton(&self, name: &str) {
        {
            let _guard = self.creation_lock.lock();
            if self.singletons.write().remove(name).is_some() {
                self.registration_order.write().retain(|n| n != name);
            }
            self.remove_early(name);
        }
        let record = self.take_record(name);
        self.destroy_bean(name, record);
    }

    fn destroy_bean(&self, name: &str, record: Option<InstanceRecord>) {
        let dependents = self.dependent_beans.write().remove(name);
        if let Some(dependents) = dependents {
            tracing::debug!("Retrieved dependent beans for bean '{}': {:?}", name, dependents);
            for dependent in dependents {
                self.destroy_singleton(&dependent);
            }
        }

        if let Some(mut record) = record {
            record.destroy();
        }

        for dependents in self.dependent_beans.write().values_mut() {
            dependents.retain(|d| d != name);
        }
        self.dependencies_for_bean.write().remove(name);
    }
}
