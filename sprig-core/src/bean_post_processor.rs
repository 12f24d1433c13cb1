//! BeanPostProcessor - Bean 工厂扩展机制
//!
//! 提供在 Bean 初始化前后进行自定义处理的钩子，以及在所有定义加载完成、
//! 任何单例创建之前修改定义的 [`BeanFactoryPostProcessor`]。

use crate::bean::Object;
use crate::bean_factory::DefaultListableBeanFactory;

/// BeanPostProcessor trait
///
/// 在 Bean 初始化的不同阶段提供钩子，允许自定义修改或替换 Bean 实例。
/// 所有处理器按注册顺序调用，前一个处理器的返回值作为下一个的输入。
///
/// 使用场景：
/// - Bean 包装（代理）
/// - 属性注入增强
/// - 验证等
///
/// # 示例
///
/// ```ignore
/// use sprig_core::prelude::*;
///
/// struct LoggingBeanPostProcessor;
///
/// impl BeanPostProcessor for LoggingBeanPostProcessor {
///     fn post_process_after_initialization(
///         &self,
///         bean: Object,
///         bean_name: &str,
///     ) -> anyhow::Result<Object> {
///         tracing::info!("After initialization: {}", bean_name);
///         Ok(bean)
///     }
/// }
/// ```
pub trait BeanPostProcessor: Send + Sync {
    /// 在 Bean 初始化回调（init）之前调用
    ///
    /// # 返回
    /// 返回处理后的 Bean 实例（可以是原始 Bean，也可以是包装后的 Bean）
    fn post_process_before_initialization(&self, bean: Object, _bean_name: &str) -> anyhow::Result<Object> {
        // 默认实现：直接返回原始 Bean
        Ok(bean)
    }

    /// 在 Bean 初始化回调（init）之后调用
    ///
    /// # 典型用途
    /// - 创建代理
    /// - 包装 Bean
    fn post_process_after_initialization(&self, bean: Object, _bean_name: &str) -> anyhow::Result<Object> {
        Ok(bean)
    }

    /// 循环引用时提前暴露给其他 Bean 的引用
    ///
    /// 若处理器会在初始化后包装 Bean，应在这里返回同样的包装，
    /// 否则提前注入的原始对象与最终对象不一致会导致创建失败
    fn get_early_bean_reference(&self, bean: Object, _bean_name: &str) -> Object {
        bean
    }

    /// 获取处理器的名称（用于日志和调试）
    fn name(&self) -> &str {
        "BeanPostProcessor"
    }
}

/// 在 Bean 销毁之前回调的处理器
///
/// 多个处理器按注册顺序的逆序调用
pub trait DestructionAwareBeanPostProcessor: Send + Sync {
    fn post_process_before_destruction(&self, bean: &Object, bean_name: &str) -> anyhow::Result<()>;

    /// 是否需要为该 Bean 注册销毁回调
    fn requires_destruction(&self, _bean: &Object) -> bool {
        true
    }
}

/// BeanFactoryPostProcessor trait
///
/// 在所有定义加载完成之后、任何单例创建之前调用，可以修改定义或注册新定义
pub trait BeanFactoryPostProcessor: Send + Sync {
    fn post_process_bean_factory(&self, factory: &DefaultListableBeanFactory) -> anyhow::Result<()>;

    /// 获取处理器的优先级（数字越小越先执行，相同时按注册顺序）
    fn order(&self) -> i32 {
        0
    }

    fn name(&self) -> &str {
        "BeanFactoryPostProcessor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bean::Bean;
    use std::sync::Arc;

    struct Plain;
    impl Bean for Plain {}

    struct Wrapper(#[allow(dead_code)] Object);
    impl Bean for Wrapper {}

    struct Identity;
    impl BeanPostProcessor for Identity {}

    struct Wrapping;
    impl BeanPostProcessor for Wrapping {
        fn post_process_after_initialization(&self, bean: Object, _bean_name: &str) -> anyhow::Result<Object> {
            Ok(Arc::new(Wrapper(bean)))
        }
    }

    #[test]
    fn test_default_hooks_are_identity() {
        let bean: Object = Arc::new(Plain);
        let processor = Identity;
        let before = processor.post_process_before_initialization(bean.clone(), "plain").unwrap();
        let after = processor.post_process_after_initialization(before, "plain").unwrap();
        assert!(Arc::ptr_eq(&bean, &after));
        let early = processor.get_early_bean_reference(bean.clone(), "plain");
        assert!(Arc::ptr_eq(&bean, &early));
    }

    #[test]
    fn test_processor_can_substitute() {
        let bean: Object = Arc::new(Plain);
        let result = Wrapping.post_process_after_initialization(bean, "plain").unwrap();
        assert!(result.is::<Wrapper>());
    }
}
