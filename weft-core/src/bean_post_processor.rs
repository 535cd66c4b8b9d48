//! BeanPostProcessor - Bean 工厂扩展机制
//!
//! 提供在 Bean 初始化前后进行自定义处理的钩子，类似 Spring 的 BeanPostProcessor

use crate::bean::Bean;

/// BeanPostProcessor trait
///
/// 容器按注册顺序依次调用每个处理器的 `post_process_before_initialization`，
/// 再依次调用 `post_process_after_initialization`。任一处理器返回 `None`
/// 都会中止后续处理。
///
/// 使用场景：
/// - AOP 代理创建
/// - Bean 包装
/// - 验证等
///
/// # 示例
///
/// ```ignore
/// use weft_core::prelude::*;
///
/// pub struct LoggingBeanPostProcessor;
///
/// impl BeanPostProcessor for LoggingBeanPostProcessor {
///     fn post_process_after_initialization(&self, bean: Bean, bean_name: &str) -> Result<Option<Bean>> {
///         tracing::info!("After initialization: {}", bean_name);
///         Ok(Some(bean))
///     }
/// }
/// ```
pub trait BeanPostProcessor: Send + Sync {
    /// 在属性填充之后、after 阶段之前调用
    ///
    /// 返回处理后的 Bean（可以是原始 Bean，也可以是包装后的 Bean）
    fn post_process_before_initialization(&self, bean: Bean, _bean_name: &str) -> anyhow::Result<Option<Bean>> {
        Ok(Some(bean))
    }

    /// 在所有 before 阶段之后调用
    ///
    /// # 典型用途
    /// - 创建 AOP 代理
    /// - 包装 Bean
    fn post_process_after_initialization(&self, bean: Bean, _bean_name: &str) -> anyhow::Result<Option<Bean>> {
        Ok(Some(bean))
    }

    /// 获取处理器的名称（用于日志和调试）
    fn name(&self) -> &str {
        "BeanPostProcessor"
    }
}
