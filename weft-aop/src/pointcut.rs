//! 切点（Pointcut）
//!
//! 类匹配器决定是否为 Bean 创建代理，方法匹配器决定每次调用是否执行通知。

use std::sync::Arc;

use thiserror::Error;
use weft_core::{Method, TypeInfo};

use crate::matcher::{
    ClassMatcher, MethodMatcher, NameClassMatcher, NameMethodMatcher, RegexClassMatcher, RegexMethodMatcher,
    TrueMatcher,
};

/// 切点构建错误
#[derive(Debug, Error)]
pub enum PointcutError {
    #[error("Invalid execution expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: &'static str },

    #[error("Invalid pointcut pattern: {0}")]
    Regex(#[from] regex::Error),
}

/// 切点 Trait
pub trait Pointcut: Send + Sync {
    fn class_matcher(&self) -> &dyn ClassMatcher;

    fn method_matcher(&self) -> &dyn MethodMatcher;

    /// 类和方法都匹配
    fn matches(&self, method: &Method, target: &TypeInfo) -> bool {
        self.class_matcher().matches(target) && self.method_matcher().matches(method, target)
    }
}

/// 由一个类匹配器和一个方法匹配器组成的切点
#[derive(Clone)]
pub struct DefaultPointcut {
    class_matcher: Arc<dyn ClassMatcher>,
    method_matcher: Arc<dyn MethodMatcher>,
}

impl DefaultPointcut {
    pub fn new(class_matcher: Arc<dyn ClassMatcher>, method_matcher: Arc<dyn MethodMatcher>) -> Self {
        Self {
            class_matcher,
            method_matcher,
        }
    }

    /// 匹配所有类型的所有方法
    pub fn always() -> Self {
        Self::new(Arc::new(TrueMatcher), Arc::new(TrueMatcher))
    }

    /// 匹配所有类型，按方法过滤
    pub fn for_methods(method_matcher: Arc<dyn MethodMatcher>) -> Self {
        Self::new(Arc::new(TrueMatcher), method_matcher)
    }

    /// 正则切点：类型名和 `类型名.方法名` 分别匹配
    pub fn regex(class_pattern: &str, method_pattern: &str) -> Result<Self, PointcutError> {
        Ok(Self::new(
            Arc::new(RegexClassMatcher::new(class_pattern)?),
            Arc::new(RegexMethodMatcher::new(method_pattern)?),
        ))
    }

    /// 创建 execution 切点
    ///
    /// 格式：`返回类型 类型名.方法名(..)`，例如 `"* OrderService*.place*(..)"`。
    /// 返回类型只做占位；类型名不含 `::` 时对简单类型名匹配，否则对全限定名匹配；
    /// 省略类型名（`"* save*(..)"`）时匹配所有类型。
    pub fn execution(expression: &str) -> Result<Self, PointcutError> {
        let invalid = |reason| PointcutError::InvalidExpression {
            expression: expression.to_string(),
            reason,
        };

        let mut parts = expression.split_whitespace();
        let (Some(_return_type), Some(target), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid("expected '<return> <type>.<method>(..)'"));
        };

        let Some(open) = target.find('(') else {
            return Err(invalid("missing parameter list"));
        };
        if !target.ends_with(')') {
            return Err(invalid("unterminated parameter list"));
        }

        let path = &target[..open];
        let (type_pattern, method_pattern) = match path.rsplit_once('.') {
            Some((type_pattern, method_pattern)) => (Some(type_pattern), method_pattern),
            None => (None, path),
        };
        if method_pattern.is_empty() || type_pattern.is_some_and(str::is_empty) {
            return Err(invalid("empty type or method pattern"));
        }

        let class_matcher: Arc<dyn ClassMatcher> = match type_pattern {
            None | Some("*") => Arc::new(TrueMatcher),
            Some(pattern) if pattern.contains("::") => Arc::new(NameClassMatcher::new([pattern])),
            Some(pattern) => Arc::new(NameClassMatcher::simple([pattern])),
        };

        Ok(Self::new(class_matcher, Arc::new(NameMethodMatcher::new([method_pattern]))))
    }
}

impl Default for DefaultPointcut {
    fn default() -> Self {
        Self::always()
    }
}

impl Pointcut for DefaultPointcut {
    fn class_matcher(&self) -> &dyn ClassMatcher {
        self.class_matcher.as_ref()
    }

    fn method_matcher(&self) -> &dyn MethodMatcher {
        self.method_matcher.as_ref()
    }
}

impl std::fmt::Debug for DefaultPointcut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultPointcut").finish_non_exhaustive()
    }
}
