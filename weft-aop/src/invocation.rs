//! 方法调用（MethodInvocation）
//!
//! 每次被拦截的调用创建一个新的 `MethodInvocation`，游标从 -1 开始只增不减。

use std::sync::Arc;

use weft_core::{Arguments, Bean, InvocationResult, Joinpoint, Method};

use crate::advice::Advice;

/// 一次具体的方法调用，以及按顺序排列的通知链
pub struct MethodInvocation<'a> {
    target: &'a Bean,
    method: &'static Method,
    arguments: Arguments,
    advices: Vec<Arc<dyn Advice>>,
    current: isize,
    joinpoint: Joinpoint<'a>,
}

impl<'a> MethodInvocation<'a> {
    pub fn new(
        target: &'a Bean,
        method: &'static Method,
        arguments: Arguments,
        advices: Vec<Arc<dyn Advice>>,
        joinpoint: Joinpoint<'a>,
    ) -> Self {
        Self {
            target,
            method,
            arguments,
            advices,
            current: -1,
            joinpoint,
        }
    }

    /// 执行下一个通知；通知全部执行过后调用真实目标方法
    ///
    /// 通知链耗尽后再次调用会重新执行目标方法。
    pub fn proceed(&mut self) -> InvocationResult {
        if self.current == self.advices.len() as isize - 1 {
            tracing::trace!("Invoking target method {}", self.signature());
            return (self.joinpoint)(&self.arguments);
        }

        self.current += 1;
        let advice = Arc::clone(&self.advices[self.current as usize]);
        tracing::trace!("Applying advice '{}' to {}", advice.name(), self.signature());
        advice.invoke(self)
    }

    /// 被代理的原始 Bean
    pub fn target(&self) -> &Bean {
        self.target
    }

    pub fn method(&self) -> &'static Method {
        self.method
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// 在 `proceed()` 之前改写参数
    pub fn arguments_mut(&mut self) -> &mut Arguments {
        &mut self.arguments
    }

    /// 当前执行到的通知位置，尚未开始时为 `None`
    pub fn current_index(&self) -> Option<usize> {
        usize::try_from(self.current).ok()
    }

    pub fn advice_count(&self) -> usize {
        self.advices.len()
    }

    /// `SimpleTypeName.method`
    pub fn signature(&self) -> String {
        format!("{}.{}", self.target.type_info().simple_name(), self.method.name)
    }
}

impl std::fmt::Debug for MethodInvocation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodInvocation")
            .field("signature", &self.signature())
            .field("arguments", &self.arguments)
            .field("advices", &self.advices.len())
            .field("current", &self.current)
            .finish()
    }
}
