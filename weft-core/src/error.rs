//! 容器错误类型
//!
//! 容器自身的失败统一使用 [`ContainerError`]；用户代码（构造函数、setter、
//! 后置处理器、通知）使用 `anyhow::Result` 上报失败，由容器负责归类。

use thiserror::Error;

/// 容器操作结果
pub type ContainerResult<T> = std::result::Result<T, ContainerError>;

/// 应用层通用结果（用户代码使用）
pub use anyhow::Result;

/// 容器错误
#[derive(Debug, Error)]
pub enum ContainerError {
    /// 名称未注册
    #[error("No bean named '{0}' is defined")]
    BeanNotFound(String),

    /// 名称在自身的解析路径中再次出现
    #[error("Circular dependency detected for bean '{name}': {}", path.join(" -> "))]
    CircularDependency { name: String, path: Vec<String> },

    /// 找不到匹配的构造函数，或构造函数本身失败
    #[error("Could not instantiate bean '{name}': {message}")]
    InstantiationFailed { name: String, message: String },

    /// 属性填充或后置处理阶段的失败
    #[error("Error creating bean '{name}': {message}")]
    BeanCreationFailed {
        name: String,
        message: String,
        #[source]
        source: anyhow::Error,
    },

    /// 实例不具备调用方要求的类型视图
    #[error("Bean '{name}' is expected to be of type '{expected}' but was '{found}'")]
    TypeMismatch {
        name: String,
        expected: String,
        found: String,
    },
}

impl ContainerError {
    /// 将用户代码返回的错误归类为创建失败
    ///
    /// 已经是 `ContainerError` 的错误原样返回，保证内层的循环依赖、
    /// 未找到等错误不会被包装。
    pub fn creation_failed(name: &str, message: impl Into<String>, err: anyhow::Error) -> Self {
        match err.downcast::<ContainerError>() {
            Ok(inner) => inner,
            Err(err) => ContainerError::BeanCreationFailed {
                name: name.to_string(),
                message: message.into(),
                source: err,
            },
        }
    }

    /// 对应的 Bean 名称
    pub fn bean_name(&self) -> &str {
        match self {
            ContainerError::BeanNotFound(name) => name,
            ContainerError::CircularDependency { name, .. }
            | ContainerError::InstantiationFailed { name, .. }
            | ContainerError::BeanCreationFailed { name, .. }
            | ContainerError::TypeMismatch { name, .. } => name,
        }
    }
}
