// weft-core: 基于名称的依赖注入容器
//
// 提供：
// - 单例 Bean 的按需创建与缓存
// - 构造函数注入与 setter 注入
// - 循环依赖检测
// - BeanPostProcessor 扩展点
// - 基于 trait 的方法拦截代理（通过 #[interceptable] 宏）

// 让 #[interceptable] 生成的 ::weft_core 路径在本 crate 内也能解析
extern crate self as weft_core;

pub mod bean;
pub mod bean_factory;
pub mod bean_post_processor;
pub mod class;
pub mod context;
pub mod definition;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod proxy;
pub mod reader;
pub mod utils;

// Helper trait for setter callbacks
// Allows both () and Result<()> return types
pub trait IntoResult {
    fn into_result(self) -> Result<()>;
}

impl IntoResult for () {
    fn into_result(self) -> Result<()> {
        Ok(())
    }
}

impl IntoResult for Result<()> {
    fn into_result(self) -> Result<()> {
        self
    }
}

// 重新导出常用类型
pub use bean::Bean;
pub use bean_factory::{
    BeanDefinitionRegistry, BeanFactory, BeanFactoryExt, ConfigurableBeanFactory,
    ConfigurableListableBeanFactory, DefaultListableBeanFactory, ListableBeanFactory,
};
pub use bean_post_processor::BeanPostProcessor;
pub use class::{BeanClass, BeanClassBuilder};
pub use context::ApplicationContext;
pub use definition::BeanDefinition;
pub use error::{ContainerError, ContainerResult, Result};
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use metadata::{Capability, Marker, Method, TypeInfo, Visibility};
pub use proxy::{
    downcast_return, Arguments, Interceptable, InvocationResult, Joinpoint, MethodInterceptor,
    ReturnValue,
};
pub use reader::{ClassRegistration, ClassRegistry, TomlBeanDefinitionReader};

pub use weft_macros::interceptable;

// 导出 inventory，供 submit_class! 使用
pub use inventory;

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::bean::Bean;
    pub use crate::bean_factory::{
        BeanDefinitionRegistry, BeanFactory, BeanFactoryExt, ConfigurableBeanFactory,
        ConfigurableListableBeanFactory, DefaultListableBeanFactory, ListableBeanFactory,
    };
    pub use crate::bean_post_processor::BeanPostProcessor;
    pub use crate::class::BeanClass;
    pub use crate::context::ApplicationContext;
    pub use crate::definition::BeanDefinition;
    pub use crate::error::{ContainerError, ContainerResult, Result};
    pub use crate::logging::{LogFormat, LogLevel, LoggingConfig};
    pub use crate::metadata::{Marker, Method, TypeInfo, Visibility};
    pub use crate::proxy::{Arguments, Interceptable, InvocationResult, MethodInterceptor};
    pub use crate::reader::ClassRegistry;
    pub use crate::utils;
    pub use weft_macros::interceptable;
    // Re-export anyhow for convenience
    pub use anyhow::{anyhow, Context};
}
