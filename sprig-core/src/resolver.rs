//! 依赖解析
//!
//! 按类型为构造参数和属性查找候选 Bean，并在多个候选之间做出选择：
//! 唯一的 primary 候选胜出；否则在 primary 候选（或全部候选）中取 order 最小的；
//! 仍然并列时报告 [`BeansError::NoUniqueBeanDefinition`]。

use std::sync::Arc;

use crate::bean::{Object, Value};
use crate::bean_factory::{BeanFactory, DefaultListableBeanFactory, HierarchicalBeanFactory, ListableBeanFactory};
use crate::class::{Parameter, PropertyDescriptor, PropertyKind, TypeKey};
use crate::error::{BeansError, BeansResult};
use crate::registry::{AliasRegistry, BeanDefinitionRegistry};

/// 一个待注入依赖的描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyDescriptor {
    pub required_type: TypeKey,
    /// 只接受该名称（或其别名）的候选
    pub qualifier: Option<String>,
    /// 注入所有候选（按注册顺序）
    pub multiple: bool,
    pub required: bool,
    pub declaring_bean: Option<String>,
}

impl DependencyDescriptor {
    pub fn single(required_type: impl Into<TypeKey>) -> Self {
        Self {
            required_type: required_type.into(),
            qualifier: None,
            multiple: false,
            required: true,
            declaring_bean: None,
        }
    }

    pub fn multiple(required_type: impl Into<TypeKey>) -> Self {
        Self {
            multiple: true,
            ..Self::single(required_type)
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn qualified(mut self, name: impl Into<String>) -> Self {
        self.qualifier = Some(name.into());
        self
    }

    pub fn declared_by(mut self, bean: impl Into<String>) -> Self {
        self.declaring_bean = Some(bean.into());
        self
    }

    pub(crate) fn for_parameter(param: &Parameter, bean: &str) -> Self {
        Self {
            required_type: param.ty.clone(),
            qualifier: None,
            multiple: param.multiple,
            required: param.required,
            declaring_bean: Some(bean.to_string()),
        }
    }

    /// 按类型自动装配的属性总是可选的
    pub(crate) fn for_property(property: &PropertyDescriptor, bean: &str) -> Self {
        Self {
            required_type: property.ty.clone(),
            qualifier: None,
            multiple: property.kind == PropertyKind::Collection,
            required: false,
            declaring_bean: Some(bean.to_string()),
        }
    }
}

#[derive(Debug)]
struct Candidate {
    name: String,
    /// 来自祖先工厂的候选；`None` 表示本工厂
    origin: Option<Arc<DefaultListableBeanFactory>>,
    primary: bool,
    order: i32,
}

/// 从多个候选中选出唯一的注入目标
fn determine_autowire_candidate<'c>(required_type: &TypeKey, candidates: &'c [Candidate]) -> BeansResult<&'c Candidate> {
    if let [only] = candidates {
        return Ok(only);
    }

    let primaries: Vec<&Candidate> = candidates.iter().filter(|c| c.primary).collect();
    if let [primary] = primaries.as_slice() {
        return Ok(*primary);
    }

    let pool: Vec<&Candidate> = if primaries.is_empty() {
        candidates.iter().collect()
    } else {
        primaries
    };
    let best = pool.iter().map(|c| c.order).min().unwrap_or(i32::MAX);
    let tied: Vec<&Candidate> = pool.into_iter().filter(|c| c.order == best).collect();
    match tied.as_slice() {
        [winner] => Ok(*winner),
        _ => Err(BeansError::NoUniqueBeanDefinition {
            required_type: required_type.clone(),
            candidates: tied.iter().map(|c| c.name.clone()).collect(),
        }),
    }
}

impl DefaultListableBeanFactory {
    /// 解析一个依赖
    ///
    /// - 可解析依赖（容器自身等）直接返回
    /// - `multiple` 返回所有候选组成的 `Value::List`，可选且无候选时为空列表
    /// - 单值可选且无候选时返回 `Value::Absent`
    pub(crate) fn do_resolve_dependency(
        &self,
        descriptor: &DependencyDescriptor,
        requesting_bean: Option<&str>,
    ) -> BeansResult<Value> {
        if let Some(resolvable) = self.registry.resolvable_dependency(&descriptor.required_type) {
            if let Some(object) = resolvable.resolve() {
                return Ok(if descriptor.multiple {
                    Value::List(vec![object])
                } else {
                    Value::Object(object)
                });
            }
        }

        let candidates = self.find_autowire_candidates(descriptor, requesting_bean)?;

        if descriptor.multiple {
            if candidates.is_empty() && descriptor.required {
                return Err(BeansError::no_bean_of_type(
                    descriptor.required_type.clone(),
                    "expected at least 1 bean which qualifies as autowire candidate",
                ));
            }
            let mut objects = Vec::with_capacity(candidates.len());
            for candidate in &candidates {
                objects.push(self.obtain_candidate(candidate, requesting_bean)?);
            }
            return Ok(Value::List(objects));
        }

        if candidates.is_empty() {
            if descriptor.required {
                return Err(BeansError::no_bean_of_type(
                    descriptor.required_type.clone(),
                    "expected at least 1 bean which qualifies as autowire candidate",
                ));
            }
            return Ok(Value::Absent);
        }

        let chosen = determine_autowire_candidate(&descriptor.required_type, &candidates)?;
        tracing::trace!(
            "Autowiring by type from bean name '{}' to bean named '{}'",
            requesting_bean.unwrap_or("?"),
            chosen.name
        );
        self.obtain_candidate(chosen, requesting_bean).map(Value::Object)
    }

    pub(crate) fn do_resolve_named_bean(&self, required_type: &TypeKey) -> BeansResult<(String, Object)> {
        let descriptor = DependencyDescriptor::single(required_type.clone());
        let candidates = self.find_autowire_candidates(&descriptor, None)?;
        if candidates.is_empty() {
            return Err(BeansError::no_bean_of_type(
                required_type.clone(),
                "expected single matching bean but found 0",
            ));
        }
        let chosen = determine_autowire_candidate(required_type, &candidates)?;
        let object = self.obtain_candidate(chosen, None)?;
        Ok((chosen.name.clone(), object))
    }

    /// 本工厂没有候选时才查询祖先工厂（只查定义，不排除请求者自身）
    fn find_autowire_candidates(
        &self,
        descriptor: &DependencyDescriptor,
        requesting_bean: Option<&str>,
    ) -> BeansResult<Vec<Candidate>> {
        let excluded = requesting_bean.map(|name| self.registry.canonical_name(name));
        let local = self.collect_candidates(descriptor, excluded.as_deref(), true)?;
        if !local.is_empty() {
            return Ok(local);
        }

        let mut ancestor = self.parent_bean_factory();
        while let Some(factory) = ancestor {
            let found = factory.collect_candidates(descriptor, None, false)?;
            if !found.is_empty() {
                return Ok(found
                    .into_iter()
                    .map(|candidate| Candidate {
                        origin: Some(Arc::clone(&factory)),
                        ..candidate
                    })
                    .collect());
            }
            ancestor = factory.parent_bean_factory();
        }
        Ok(Vec::new())
    }

    fn collect_candidates(
        &self,
        descriptor: &DependencyDescriptor,
        excluded: Option<&str>,
        include_manual: bool,
    ) -> BeansResult<Vec<Candidate>> {
        let qualifier = descriptor.qualifier.as_deref().map(|q| self.registry.canonical_name(q));
        let mut candidates = Vec::new();

        for name in self.get_bean_names_for_type(&descriptor.required_type) {
            if excluded == Some(name.as_str()) {
                continue;
            }
            if qualifier.as_deref().is_some_and(|q| q != name) {
                continue;
            }
            if self.registry.contains_bean_definition(&name) {
                let mbd = self.registry.get_merged_definition(&name)?;
                if !mbd.autowire_candidate {
                    continue;
                }
                candidates.push(Candidate {
                    primary: mbd.primary,
                    order: mbd.effective_order(),
                    name,
                    origin: None,
                });
            } else if include_manual {
                candidates.push(Candidate {
                    name,
                    origin: None,
                    primary: false,
                    order: i32::MAX,
                });
            }
        }
        Ok(candidates)
    }

    fn obtain_candidate(&self, candidate: &Candidate, requesting_bean: Option<&str>) -> BeansResult<Object> {
        match &candidate.origin {
            None => {
                let object = self.get_bean(&candidate.name)?;
                if let Some(requesting) = requesting_bean {
                    let requesting = self.registry.canonical_name(requesting);
                    self.singletons.register_dependent_bean(&candidate.name, &requesting);
                }
                Ok(object)
            }
            Some(factory) => factory.get_bean(&candidate.name),
        }
    }
}
