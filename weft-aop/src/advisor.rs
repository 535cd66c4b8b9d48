//! 通知器（Advisor）：切点 + 通知

use std::sync::Arc;

use weft_core::BeanClass;

use crate::advice::Advice;
use crate::pointcut::Pointcut;

/// 一个横切关注点
pub trait Advisor: Send + Sync {
    fn pointcut(&self) -> Arc<dyn Pointcut>;

    fn advice(&self) -> Arc<dyn Advice>;
}

/// 持有固定切点和通知的 Advisor
#[derive(Clone)]
pub struct DefaultAdvisor {
    pointcut: Arc<dyn Pointcut>,
    advice: Arc<dyn Advice>,
}

impl DefaultAdvisor {
    pub fn new(pointcut: Arc<dyn Pointcut>, advice: Arc<dyn Advice>) -> Self {
        Self { pointcut, advice }
    }

    /// 作为 Bean 注册时使用，构造参数依次为切点 Bean 和通知 Bean
    pub fn bean_class() -> Arc<BeanClass> {
        BeanClass::builder::<DefaultAdvisor>("weft_aop::advisor::DefaultAdvisor")
            .implements::<dyn Advisor>(|a| a)
            .constructor2::<dyn Pointcut, dyn Advice, _>(|pointcut, advice| Ok(DefaultAdvisor::new(pointcut, advice)))
            .build()
    }
}

impl Advisor for DefaultAdvisor {
    fn pointcut(&self) -> Arc<dyn Pointcut> {
        Arc::clone(&self.pointcut)
    }

    fn advice(&self) -> Arc<dyn Advice> {
        Arc::clone(&self.advice)
    }
}

impl std::fmt::Debug for DefaultAdvisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultAdvisor")
            .field("advice", &self.advice.name())
            .finish_non_exhaustive()
    }
}
