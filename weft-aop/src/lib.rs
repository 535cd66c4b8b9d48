//! Weft AOP - 方法拦截与声明式事务
//!
//! 提供：
//! - 类匹配器 / 方法匹配器与切点（名称模式、正则、标记、`execution(...)` 表达式）
//! - 环绕通知链（[`MethodInvocation::proceed`]）
//! - Advisor：切点 + 通知，可作为普通 Bean 注册
//! - 通过 [`ProxyingBeanPostProcessor`] 自动为匹配的 Bean 生成代理
//! - 基于 `Transactional` 标记的事务通知
//!
//! 本 crate 的可配置类型（Advisor、通知、事务管理器、事务切点）在链接期提交到
//! [`weft_core::ClassRegistry::with_submitted`]，可以直接在 TOML 定义中按类型名引用。

pub mod advice;
pub mod advisor;
pub mod bean_post_processor;
pub mod invocation;
pub mod matcher;
pub mod pointcut;
pub mod proxy;
pub mod transaction;

// 重新导出核心类型
pub use advice::{Advice, LoggingInterceptor, PerformanceInterceptor};
pub use advisor::{Advisor, DefaultAdvisor};
pub use bean_post_processor::ProxyingBeanPostProcessor;
pub use invocation::MethodInvocation;
pub use matcher::{
    ClassMatcher, MarkerClassMatcher, MarkerMethodMatcher, MethodMatcher, NameClassMatcher, NameMethodMatcher,
    RegexClassMatcher, RegexMethodMatcher, TrueMatcher,
};
pub use pointcut::{DefaultPointcut, Pointcut, PointcutError};
pub use proxy::AdvisedInterceptor;
pub use transaction::{
    transactional_pointcut, LocalTransactionManager, TransactionInterceptor, TransactionManager, TRANSACTIONAL,
};

weft_core::submit_class!(advisor::DefaultAdvisor::bean_class);
weft_core::submit_class!(advice::LoggingInterceptor::bean_class);
weft_core::submit_class!(advice::PerformanceInterceptor::bean_class);
weft_core::submit_class!(transaction::LocalTransactionManager::bean_class);
weft_core::submit_class!(transaction::TransactionInterceptor::bean_class);
weft_core::submit_class!(transaction::transactional_pointcut_class);

/// 预导入模块
pub mod prelude {
    pub use crate::advice::{Advice, LoggingInterceptor, PerformanceInterceptor};
    pub use crate::advisor::{Advisor, DefaultAdvisor};
    pub use crate::bean_post_processor::ProxyingBeanPostProcessor;
    pub use crate::invocation::MethodInvocation;
    pub use crate::matcher::{ClassMatcher, MethodMatcher};
    pub use crate::pointcut::{DefaultPointcut, Pointcut};
    pub use crate::transaction::{TransactionInterceptor, TransactionManager, TRANSACTIONAL};
}
