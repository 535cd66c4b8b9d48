use std::any::TypeId;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::{
    bean::Bean,
    bean_factory::{
        BeanDefinitionRegistry, BeanFactory, ConfigurableBeanFactory, ConfigurableListableBeanFactory,
        DefaultListableBeanFactory, ListableBeanFactory,
    },
    bean_post_processor::BeanPostProcessor,
    definition::BeanDefinition,
    error::ContainerResult,
    reader::{ClassRegistry, TomlBeanDefinitionReader},
};

/// 应用上下文
///
/// 持有 BeanFactory，所有注册和查找操作都委托给它；`refresh()` 按注册顺序
/// 预实例化全部单例。
pub struct ApplicationContext {
    /// Bean 工厂 - 负责 Bean 的创建和管理
    bean_factory: Arc<DefaultListableBeanFactory>,

    /// 应用名称
    app_name: String,

    /// 创建时间
    startup_date: SystemTime,

    /// 是否已完成 refresh
    active: AtomicBool,
}

impl ApplicationContext {
    /// 创建新的应用上下文
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            bean_factory: Arc::new(DefaultListableBeanFactory::new()),
            app_name: app_name.into(),
            startup_date: SystemTime::now(),
            active: AtomicBool::new(false),
        }
    }

    /// 获取内部的 BeanFactory
    ///
    /// 需要回查容器的组件（例如代理后置处理器）持有它的弱引用。
    pub fn get_bean_factory(&self) -> &Arc<DefaultListableBeanFactory> {
        &self.bean_factory
    }

    pub fn get_app_name(&self) -> &str {
        &self.app_name
    }

    pub fn get_startup_date(&self) -> SystemTime {
        self.startup_date
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// 从 TOML 文件加载 Bean 定义
    pub fn load_definitions(&self, path: impl AsRef<Path>, classes: &ClassRegistry) -> anyhow::Result<usize> {
        TomlBeanDefinitionReader::new(self.bean_factory.as_ref(), classes).load_file(path)
    }

    /// 从 TOML 字符串加载 Bean 定义
    pub fn load_definitions_str(&self, content: &str, classes: &ClassRegistry) -> anyhow::Result<usize> {
        TomlBeanDefinitionReader::new(self.bean_factory.as_ref(), classes).load_str(content)
    }

    /// 预实例化所有单例
    pub fn refresh(&self) -> ContainerResult<()> {
        let start = Instant::now();
        tracing::info!("Refreshing application context '{}'", self.app_name);

        self.bean_factory.preinstantiate_singletons()?;
        self.active.store(true, Ordering::Release);

        tracing::info!(
            "Application context '{}' started in {:?} with {} beans",
            self.app_name,
            start.elapsed(),
            self.bean_factory.get_singleton_count()
        );
        Ok(())
    }
}

impl std::fmt::Debug for ApplicationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationContext")
            .field("app_name", &self.app_name)
            .field("startup_date", &self.startup_date)
            .field("active", &self.is_active())
            .field("definitions", &self.bean_factory.get_bean_definition_count())
            .finish()
    }
}

impl BeanFactory for ApplicationContext {
    fn get_bean(&self, name: &str) -> ContainerResult<Bean> {
        self.bean_factory.get_bean(name)
    }

    fn contains_bean(&self, name: &str) -> bool {
        self.bean_factory.contains_bean(name)
    }
}

impl BeanDefinitionRegistry for ApplicationContext {
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> bool {
        self.bean_factory.register_bean_definition(name, definition)
    }

    fn get_bean_definition(&self, name: &str) -> ContainerResult<Arc<BeanDefinition>> {
        self.bean_factory.get_bean_definition(name)
    }

    fn contains_bean_definition(&self, name: &str) -> bool {
        self.bean_factory.contains_bean_definition(name)
    }

    fn get_bean_definition_count(&self) -> usize {
        self.bean_factory.get_bean_definition_count()
    }

    fn get_bean_definition_names(&self) -> Vec<String> {
        self.bean_factory.get_bean_definition_names()
    }
}

impl ListableBeanFactory for ApplicationContext {
    fn get_bean_names_for_type(&self, type_id: TypeId) -> Vec<String> {
        self.bean_factory.get_bean_names_for_type(type_id)
    }
}

impl ConfigurableBeanFactory for ApplicationContext {
    fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        self.bean_factory.add_bean_post_processor(processor)
    }

    fn get_bean_post_processors(&self) -> Vec<Arc<dyn BeanPostProcessor>> {
        self.bean_factory.get_bean_post_processors()
    }
}

impl ConfigurableListableBeanFactory for ApplicationContext {
    fn preinstantiate_singletons(&self) -> ContainerResult<()> {
        self.bean_factory.preinstantiate_singletons()
    }
}
