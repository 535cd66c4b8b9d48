//! Bean Factory - 核心容器接口
//!
//! 参考 Spring 的 BeanFactory 架构设计

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use parking_lot::RwLock;

use crate::{
    bean::Bean,
    bean_post_processor::BeanPostProcessor,
    class::Instance,
    definition::BeanDefinition,
    error::{ContainerError, ContainerResult},
    utils::{dependency::CreationTracker, naming},
};

/// BeanFactory - 最基础的容器接口
///
/// 注意：此 trait 不包含泛型方法，因此可以作为 trait object 使用
pub trait BeanFactory: Send + Sync {
    /// 通过名称获取 Bean（首次访问时创建并缓存）
    fn get_bean(&self, name: &str) -> ContainerResult<Bean>;

    /// 检查是否包含指定名称的 Bean
    fn contains_bean(&self, name: &str) -> bool;
}

/// BeanFactoryExt - BeanFactory 的扩展 trait
///
/// 提供泛型方法，不能作为 trait object 使用
pub trait BeanFactoryExt: BeanFactory {
    /// 通过名称获取 Bean，并要求其提供类型 `T` 的视图
    fn get_bean_typed<T: ?Sized + 'static>(&self, name: &str) -> ContainerResult<Arc<T>> {
        let bean = self.get_bean(name)?;
        bean.get::<T>().ok_or_else(|| ContainerError::TypeMismatch {
            name: name.to_string(),
            expected: type_name::<T>().to_string(),
            found: bean.describe_views(),
        })
    }
}

impl<F: BeanFactory + ?Sized> BeanFactoryExt for F {}

/// BeanDefinitionRegistry - Bean 定义注册表
pub trait BeanDefinitionRegistry: Send + Sync {
    /// 注册 Bean 定义
    ///
    /// 名称已存在时保留先注册的定义并返回 `false`
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> bool;

    /// 获取单个 Bean 定义
    fn get_bean_definition(&self, name: &str) -> ContainerResult<Arc<BeanDefinition>>;

    /// 检查是否包含指定的 Bean 定义
    fn contains_bean_definition(&self, name: &str) -> bool;

    /// 获取 Bean 定义的数量
    fn get_bean_definition_count(&self) -> usize;

    /// 获取所有 Bean 定义的名称（按注册顺序）
    fn get_bean_definition_names(&self) -> Vec<String>;
}

/// ListableBeanFactory - 可列举的 Bean 工厂
pub trait ListableBeanFactory: BeanFactory + BeanDefinitionRegistry {
    /// 声明类型提供指定视图的所有 Bean 名称（按注册顺序，不实例化）
    ///
    /// 结果按定义中的类型描述计算，与 [`Bean::is`] 一致，只有一个例外：
    /// 被代理的 Bean 不再提供具体类型视图，但按具体类型查询时仍会列出它。
    fn get_bean_names_for_type(&self, type_id: TypeId) -> Vec<String>;
}

/// ConfigurableBeanFactory - 可配置的 Bean 工厂
pub trait ConfigurableBeanFactory: BeanFactory {
    /// 添加 BeanPostProcessor（同一实例重复添加时移到末尾）
    fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>);

    /// 获取所有 BeanPostProcessor
    fn get_bean_post_processors(&self) -> Vec<Arc<dyn BeanPostProcessor>>;
}

/// ConfigurableListableBeanFactory - 可配置且可列举的 Bean 工厂
pub trait ConfigurableListableBeanFactory: ListableBeanFactory + ConfigurableBeanFactory {
    /// 按注册顺序预实例化所有单例 Bean
    fn preinstantiate_singletons(&self) -> ContainerResult<()>;
}

#[derive(Default)]
struct DefinitionStore {
    by_name: HashMap<String, Arc<BeanDefinition>>,
    names: Vec<String>,
}

/// DefaultListableBeanFactory - ConfigurableListableBeanFactory 的默认实现
///
/// # Bean 创建流程
/// 1. 实例化（选择构造函数，递归解析构造参数）
/// 2. 属性填充（递归解析属性引用，调用 setter）
/// 3. BeanPostProcessor.post_process_before_initialization
/// 4. BeanPostProcessor.post_process_after_initialization（代理在这里替换）
/// 5. 缓存
pub struct DefaultListableBeanFactory {
    /// Bean 定义存储
    definitions: RwLock<DefinitionStore>,

    /// 单例 Bean 缓存
    singletons: RwLock<HashMap<String, Bean>>,

    /// 循环依赖检测（按线程隔离）
    creation_tracker: CreationTracker,

    /// Bean 后置处理器列表（按注册顺序）
    bean_post_processors: RwLock<Vec<Arc<dyn BeanPostProcessor>>>,
}

impl DefaultListableBeanFactory {
    /// 创建新的 Bean 工厂
    pub fn new() -> Self {
        Self {
            definitions: RwLock::new(DefinitionStore::default()),
            singletons: RwLock::new(HashMap::new()),
            creation_tracker: CreationTracker::new(),
            bean_post_processors: RwLock::new(Vec::new()),
        }
    }

    /// 已缓存的单例数量
    pub fn get_singleton_count(&self) -> usize {
        self.singletons.read().len()
    }

    /// 单例是否已创建
    pub fn contains_singleton(&self, name: &str) -> bool {
        self.singletons.read().contains_key(name)
    }

    fn create_bean(&self, name: &str, definition: &BeanDefinition) -> ContainerResult<Bean> {
        let class = definition.class();

        // 1. 实例化
        let mut instance = self.instantiate(name, definition)?;

        // 2. 属性填充
        self.populate(name, definition, &mut instance)?;

        let views = class
            .finish(instance)
            .map_err(|e| ContainerError::creation_failed(name, "Failed to publish bean instance", e))?;
        let bean = Bean::from_views(Arc::clone(class), views, false);

        // 3. 后置处理
        self.apply_bean_post_processors(name, bean)
    }

    fn instantiate(&self, name: &str, definition: &BeanDefinition) -> ContainerResult<Instance> {
        let class = definition.class();

        let result = if definition.constructor_args().is_empty() {
            let constructor = class
                .default_constructor()
                .ok_or_else(|| ContainerError::InstantiationFailed {
                    name: name.to_string(),
                    message: format!("No default constructor found for class '{}'", class.name()),
                })?;
            constructor.invoke(&[])
        } else {
            let args = definition
                .constructor_args()
                .iter()
                .map(|arg| self.get_bean(arg))
                .collect::<ContainerResult<Vec<Bean>>>()?;

            let constructor = class
                .matching_constructor(&args)
                .ok_or_else(|| ContainerError::InstantiationFailed {
                    name: name.to_string(),
                    message: format!(
                        "No matching constructor found for class '{}' with arguments ({})",
                        class.name(),
                        args.iter().map(Bean::describe_views).collect::<Vec<_>>().join(", ")
                    ),
                })?;
            tracing::trace!(
                "Instantiating bean '{}' with constructor ({})",
                name,
                constructor.params().iter().map(|p| p.type_name).collect::<Vec<_>>().join(", ")
            );
            constructor.invoke(&args)
        };

        result.map_err(|err| match err.downcast::<ContainerError>() {
            Ok(inner) => inner,
            Err(err) => ContainerError::InstantiationFailed {
                name: name.to_string(),
                message: format!("Error instantiating class '{}': {:#}", class.name(), err),
            },
        })
    }

    fn populate(&self, name: &str, definition: &BeanDefinition, instance: &mut Instance) -> ContainerResult<()> {
        let class = definition.class();

        for (property, reference) in definition.properties() {
            let value = self.get_bean(reference)?;
            let setter_name = naming::setter_name(property);

            let setter = class
                .matching_setter(&setter_name, &value)
                .ok_or_else(|| ContainerError::BeanCreationFailed {
                    name: name.to_string(),
                    message: format!(
                        "No suitable setter '{}' found for property '{}' on class '{}'",
                        setter_name,
                        property,
                        class.name()
                    ),
                    source: anyhow!("bean '{}' is {}", reference, value.describe_views()),
                })?;

            setter
                .invoke(instance.as_mut(), &value)
                .map_err(|e| ContainerError::creation_failed(name, format!("Failed to set property '{}'", property), e))?;

            tracing::trace!("Injected bean '{}' into property '{}' of bean '{}'", reference, property, name);
        }

        Ok(())
    }

    /// 依次应用所有 BeanPostProcessor
    fn apply_bean_post_processors(&self, name: &str, bean: Bean) -> ContainerResult<Bean> {
        // 复制列表后释放锁，处理器内部可能再次访问容器
        let processors = self.get_bean_post_processors();
        let mut current = bean;

        for processor in &processors {
            current = processor
                .post_process_before_initialization(current, name)
                .map_err(|e| {
                    ContainerError::creation_failed(
                        name,
                        format!("Post-processor '{}' failed before initialization", processor.name()),
                        e,
                    )
                })?
                .ok_or_else(|| Self::no_bean_returned(name, processor.as_ref()))?;
        }

        for processor in &processors {
            current = processor
                .post_process_after_initialization(current, name)
                .map_err(|e| {
                    ContainerError::creation_failed(
                        name,
                        format!("Post-processor '{}' failed after initialization", processor.name()),
                        e,
                    )
                })?
                .ok_or_else(|| Self::no_bean_returned(name, processor.as_ref()))?;
        }

        Ok(current)
    }

    fn no_bean_returned(name: &str, processor: &dyn BeanPostProcessor) -> ContainerError {
        ContainerError::BeanCreationFailed {
            name: name.to_string(),
            message: format!("Post-processor '{}' returned no bean", processor.name()),
            source: anyhow!("post-processing yielded no instance"),
        }
    }
}

impl Default for DefaultListableBeanFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl BeanFactory for DefaultListableBeanFactory {
    fn get_bean(&self, name: &str) -> ContainerResult<Bean> {
        tracing::trace!("Requesting bean: '{}'", name);

        // 检查缓存
        if let Some(bean) = self.singletons.read().get(name) {
            tracing::trace!("Returning cached instance of singleton bean '{}'", name);
            return Ok(bean.clone());
        }

        // 检查循环依赖
        let Some(_guard) = self.creation_tracker.guard(name) else {
            let mut path = self.creation_tracker.current_creating();
            path.push(name.to_string());
            tracing::debug!("Circular dependency detected: {}", path.join(" -> "));
            return Err(ContainerError::CircularDependency {
                name: name.to_string(),
                path,
            });
        };

        let definition = self
            .definitions
            .read()
            .by_name
            .get(name)
            .cloned()
            .ok_or_else(|| {
                tracing::debug!("Bean '{}' not found in container", name);
                ContainerError::BeanNotFound(name.to_string())
            })?;

        tracing::debug!("Creating shared instance of singleton bean '{}'", name);
        let bean = self.create_bean(name, &definition)?;

        // 并发创建同名 Bean 时以先写入的为准
        let mut singletons = self.singletons.write();
        let cached = singletons.entry(name.to_string()).or_insert(bean).clone();
        tracing::debug!("Singleton bean '{}' created and cached", name);
        Ok(cached)
    }

    fn contains_bean(&self, name: &str) -> bool {
        self.contains_bean_definition(name)
    }
}

impl BeanDefinitionRegistry for DefaultListableBeanFactory {
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> bool {
        tracing::trace!(
            "Attempting to register bean: name='{}', class='{}'",
            name,
            definition.class_name()
        );

        let mut store = self.definitions.write();
        if store.by_name.contains_key(name) {
            tracing::warn!("Bean definition '{}' already exists, skipping registration", name);
            return false;
        }
        store.by_name.insert(name.to_string(), Arc::new(definition));
        store.names.push(name.to_string());

        tracing::debug!("Bean definition registered successfully: '{}'", name);
        true
    }

    fn get_bean_definition(&self, name: &str) -> ContainerResult<Arc<BeanDefinition>> {
        self.definitions
            .read()
            .by_name
            .get(name)
            .cloned()
            .ok_or_else(|| ContainerError::BeanNotFound(name.to_string()))
    }

    fn contains_bean_definition(&self, name: &str) -> bool {
        self.definitions.read().by_name.contains_key(name)
    }

    fn get_bean_definition_count(&self) -> usize {
        self.definitions.read().names.len()
    }

    fn get_bean_definition_names(&self) -> Vec<String> {
        self.definitions.read().names.clone()
    }
}

impl ListableBeanFactory for DefaultListableBeanFactory {
    fn get_bean_names_for_type(&self, type_id: TypeId) -> Vec<String> {
        let store = self.definitions.read();
        store
            .names
            .iter()
            .filter(|name| {
                store
                    .by_name
                    .get(name.as_str())
                    .is_some_and(|def| def.class().provides(type_id))
            })
            .cloned()
            .collect()
    }
}

impl ConfigurableBeanFactory for DefaultListableBeanFactory {
    fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        let mut processors = self.bean_post_processors.write();
        let address = Arc::as_ptr(&processor) as *const u8;
        processors.retain(|p| Arc::as_ptr(p) as *const u8 != address);
        tracing::debug!("Adding bean post-processor '{}'", processor.name());
        processors.push(processor);
    }

    fn get_bean_post_processors(&self) -> Vec<Arc<dyn BeanPostProcessor>> {
        self.bean_post_processors.read().clone()
    }
}

impl ConfigurableListableBeanFactory for DefaultListableBeanFactory {
    fn preinstantiate_singletons(&self) -> ContainerResult<()> {
        let bean_names = self.get_bean_definition_names();

        tracing::debug!("Pre-instantiating {} singleton beans", bean_names.len());

        for name in bean_names {
            self.get_bean(&name)?;
        }

        Ok(())
    }
}
