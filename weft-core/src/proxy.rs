//! 代理重定向契约
//!
//! `#[interceptable]` 为 trait 生成的代理把每次方法调用交给
//! [`MethodInterceptor::intercept`]，携带方法标识、参数以及一个可以重复执行的
//! 连接点（以当前参数调用真实目标）。

use std::any::{type_name, Any};
use std::sync::Arc;

use anyhow::anyhow;

use crate::metadata::{Marker, Method};

/// 类型擦除的返回值
pub type ReturnValue = Box<dyn Any + Send>;

/// 一次调用（或通知链中一个环节）的结果
pub type InvocationResult = anyhow::Result<ReturnValue>;

/// 连接点：以给定参数调用真实目标方法
pub type Joinpoint<'a> = &'a (dyn Fn(&Arguments) -> InvocationResult + 'a);

/// 方法参数列表
///
/// 参数按声明顺序保存，连接点执行时从这里读取，因此通知可以在
/// `proceed()` 之前改写参数。
#[derive(Default)]
pub struct Arguments {
    values: Vec<Box<dyn Any + Send>>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: Any + Send>(mut self, value: T) -> Self {
        self.values.push(Box::new(value));
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get<T: Any>(&self, index: usize) -> anyhow::Result<&T> {
        let value = self
            .values
            .get(index)
            .ok_or_else(|| anyhow!("argument index {} out of range ({} arguments)", index, self.values.len()))?;
        value
            .downcast_ref::<T>()
            .ok_or_else(|| anyhow!("argument {} is not of type '{}'", index, type_name::<T>()))
    }

    pub fn get_mut<T: Any>(&mut self, index: usize) -> Option<&mut T> {
        self.values.get_mut(index).and_then(|v| v.downcast_mut::<T>())
    }

    /// 替换指定位置的参数，类型必须与原参数一致
    pub fn set<T: Any + Send>(&mut self, index: usize, value: T) -> anyhow::Result<()> {
        let slot = self.get_mut::<T>(index).ok_or_else(|| {
            anyhow!("cannot replace argument {} with a value of type '{}'", index, type_name::<T>())
        })?;
        *slot = value;
        Ok(())
    }
}

impl std::fmt::Debug for Arguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arguments").field("len", &self.values.len()).finish()
    }
}

/// 还原类型擦除的返回值
pub fn downcast_return<T: Any>(value: ReturnValue) -> anyhow::Result<T> {
    value
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| anyhow!("interception chain returned a value that is not '{}'", type_name::<T>()))
}

/// 代理的调用回调
pub trait MethodInterceptor: Send + Sync {
    fn intercept(&self, method: &'static Method, arguments: Arguments, joinpoint: Joinpoint<'_>) -> InvocationResult;
}

/// 可被代理的能力
///
/// 由 `#[interceptable]` 为 `dyn Trait` 实现。
pub trait Interceptable {
    /// 能力名称（trait 名）
    fn capability_name() -> &'static str;

    /// 能力上声明的标记
    fn capability_markers() -> &'static [Marker] {
        &[]
    }

    /// 能力的方法表
    fn methods() -> &'static [Method];

    /// 生成包装 `target` 的代理，所有调用转交 `interceptor`
    fn proxy(target: Arc<Self>, interceptor: Arc<dyn MethodInterceptor>) -> Arc<Self>;
}
