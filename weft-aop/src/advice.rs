//! 通知（Advice）
//!
//! 环绕通知：决定是否以及何时调用 [`MethodInvocation::proceed`]。

use std::sync::Arc;
use std::time::{Duration, Instant};

use weft_core::{BeanClass, InvocationResult};

use crate::invocation::MethodInvocation;

/// 环绕通知 Trait
pub trait Advice: Send + Sync {
    /// 执行通知逻辑，通常在内部调用一次 `invocation.proceed()`
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> InvocationResult;

    /// 通知名称（用于日志）
    fn name(&self) -> &str {
        "Advice"
    }
}

// ============================================================================
// 预定义的常用通知
// ============================================================================

/// 日志通知 - 记录方法调用
#[derive(Debug, Clone, Default)]
pub struct LoggingInterceptor {
    log_args: bool,
}

impl LoggingInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_args(mut self) -> Self {
        self.log_args = true;
        self
    }

    pub fn bean_class() -> Arc<BeanClass> {
        BeanClass::builder::<LoggingInterceptor>("weft_aop::advice::LoggingInterceptor")
            .implements::<dyn Advice>(|a| a)
            .constructor0(|| Ok(LoggingInterceptor::new()))
            .build()
    }
}

impl Advice for LoggingInterceptor {
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> InvocationResult {
        let signature = invocation.signature();
        if self.log_args {
            tracing::debug!("→ Entering: {} with {} argument(s)", signature, invocation.arguments().len());
        } else {
            tracing::debug!("→ Entering: {}", signature);
        }

        let start = Instant::now();
        let result = invocation.proceed();
        let elapsed = start.elapsed();

        match &result {
            Ok(_) => tracing::debug!("← Exiting: {} (took {:?})", signature, elapsed),
            Err(e) => tracing::debug!("✗ Failed: {} after {:?}: {}", signature, elapsed, e),
        }
        result
    }

    fn name(&self) -> &str {
        "LoggingInterceptor"
    }
}

/// 性能监控通知 - 超过阈值时告警
#[derive(Debug, Clone)]
pub struct PerformanceInterceptor {
    threshold: Duration,
}

impl PerformanceInterceptor {
    pub fn new(threshold: Duration) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn bean_class() -> Arc<BeanClass> {
        BeanClass::builder::<PerformanceInterceptor>("weft_aop::advice::PerformanceInterceptor")
            .implements::<dyn Advice>(|a| a)
            .constructor0(|| Ok(PerformanceInterceptor::default()))
            .build()
    }
}

impl Default for PerformanceInterceptor {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

impl Advice for PerformanceInterceptor {
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> InvocationResult {
        let start = Instant::now();
        let result = invocation.proceed();
        let elapsed = start.elapsed();

        if elapsed > self.threshold {
            tracing::warn!(
                "Slow method detected: {} took {:?} (threshold: {:?})",
                invocation.signature(),
                elapsed,
                self.threshold
            );
        }
        result
    }

    fn name(&self) -> &str {
        "PerformanceInterceptor"
    }
}
