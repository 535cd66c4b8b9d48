//! 代理调度
//!
//! 每个代理持有一个 [`AdvisedInterceptor`]：原始 Bean 加上类匹配通过的 Advisor 列表。
//! 每次调用再按方法匹配器过滤出本次执行的通知链。

use std::sync::Arc;

use weft_core::{Arguments, Bean, InvocationResult, Joinpoint, Method, MethodInterceptor};

use crate::advice::Advice;
use crate::advisor::Advisor;
use crate::invocation::MethodInvocation;

/// 代理的调用分发器
pub struct AdvisedInterceptor {
    target: Bean,
    advisors: Vec<Arc<dyn Advisor>>,
}

impl AdvisedInterceptor {
    pub fn new(target: Bean, advisors: Vec<Arc<dyn Advisor>>) -> Self {
        Self { target, advisors }
    }

    pub fn target(&self) -> &Bean {
        &self.target
    }

    pub fn advisors(&self) -> &[Arc<dyn Advisor>] {
        &self.advisors
    }

    /// 本次调用适用的通知（保持 Advisor 注册顺序）
    fn advices_for(&self, method: &Method) -> Vec<Arc<dyn Advice>> {
        let target_type = self.target.type_info();
        self.advisors
            .iter()
            .filter(|advisor| advisor.pointcut().method_matcher().matches(method, target_type))
            .map(|advisor| advisor.advice())
            .collect()
    }
}

impl MethodInterceptor for AdvisedInterceptor {
    fn intercept(&self, method: &'static Method, arguments: Arguments, joinpoint: Joinpoint<'_>) -> InvocationResult {
        let advices = self.advices_for(method);

        if advices.is_empty() {
            tracing::trace!("No advice applies to {}, invoking target directly", method.name);
            return joinpoint(&arguments);
        }

        MethodInvocation::new(&self.target, method, arguments, advices, joinpoint).proceed()
    }
}

impl std::fmt::Debug for AdvisedInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdvisedInterceptor")
            .field("target", &self.target)
            .field("advisors", &self.advisors.len())
            .finish()
    }
}
