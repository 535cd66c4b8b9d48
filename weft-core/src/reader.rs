//! 从 TOML 文件读取 Bean 定义
//!
//! ```toml
//! [[beans]]
//! name = "orderService"
//! class = "shop::OrderServiceImpl"
//! constructor-args = ["orderRepository"]
//! properties = [{ name = "auditLog", ref = "auditLog" }]
//! ```
//!
//! `class` 通过 [`ClassRegistry`] 解析为 [`BeanClass`]。

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use serde::Deserialize;

use crate::bean_factory::BeanDefinitionRegistry;
use crate::class::BeanClass;
use crate::definition::BeanDefinition;

/// 类型注册提交 - 用于 inventory 收集
pub struct ClassRegistration {
    pub class: fn() -> Arc<BeanClass>,
}

inventory::collect!(ClassRegistration);

/// 在链接期注册一个 [`BeanClass`] 构造函数，供 [`ClassRegistry::with_submitted`] 收集
///
/// ```ignore
/// fn order_service_class() -> Arc<BeanClass> { ... }
///
/// weft_core::submit_class!(order_service_class);
/// ```
#[macro_export]
macro_rules! submit_class {
    ($class_fn:path) => {
        $crate::inventory::submit! {
            $crate::reader::ClassRegistration { class: $class_fn }
        }
    };
}

/// 全限定类型名 -> 类型描述
#[derive(Default, Clone)]
pub struct ClassRegistry {
    classes: HashMap<&'static str, Arc<BeanClass>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 包含所有通过 `submit_class!` 提交的类型
    pub fn with_submitted() -> Self {
        let mut registry = Self::new();
        for submission in inventory::iter::<ClassRegistration> {
            registry.register((submission.class)());
        }
        tracing::debug!("Collected {} submitted bean classes", registry.len());
        registry
    }

    /// 注册类型，同名类型会被替换
    pub fn register(&mut self, class: Arc<BeanClass>) -> &mut Self {
        if let Some(previous) = self.classes.insert(class.name(), class) {
            tracing::warn!("Bean class '{}' registered twice, using the latest", previous.name());
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<BeanClass>> {
        self.classes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct BeansDocument {
    #[serde(default)]
    beans: Vec<BeanRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct BeanRecord {
    name: String,
    class: String,
    #[serde(default)]
    constructor_args: Vec<String>,
    #[serde(default)]
    properties: Vec<PropertyRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PropertyRecord {
    name: String,
    #[serde(rename = "ref")]
    reference: String,
}

/// TOML Bean 定义读取器
///
/// 文档中任一记录无效时不注册任何定义。
pub struct TomlBeanDefinitionReader<'a> {
    registry: &'a dyn BeanDefinitionRegistry,
    classes: &'a ClassRegistry,
}

impl<'a> TomlBeanDefinitionReader<'a> {
    pub fn new(registry: &'a dyn BeanDefinitionRegistry, classes: &'a ClassRegistry) -> Self {
        Self { registry, classes }
    }

    /// 从文件加载，返回注册成功的定义数量
    pub fn load_file(&self, path: impl AsRef<Path>) -> anyhow::Result<usize> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read bean definitions from {:?}", path))?;

        self.load_str(&content)
            .with_context(|| format!("Invalid bean definitions in {:?}", path))
    }

    /// 从字符串加载，返回注册成功的定义数量
    pub fn load_str(&self, content: &str) -> anyhow::Result<usize> {
        let document: BeansDocument = toml::from_str(content).context("Failed to parse TOML")?;

        let definitions = document
            .beans
            .into_iter()
            .map(|record| self.to_definition(record))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let mut loaded = 0;
        for definition in definitions {
            let name = definition.name().to_string();
            if self.registry.register_bean_definition(&name, definition) {
                loaded += 1;
            }
        }

        tracing::info!("Loaded {} bean definitions", loaded);
        Ok(loaded)
    }

    fn to_definition(&self, record: BeanRecord) -> anyhow::Result<BeanDefinition> {
        if record.name.trim().is_empty() {
            bail!("Bean definition with class '{}' has an empty name", record.class);
        }

        let class = self
            .classes
            .get(&record.class)
            .cloned()
            .ok_or_else(|| anyhow!("Unknown bean class '{}' for bean '{}'", record.class, record.name))?;

        let mut definition = BeanDefinition::new(record.name, class);
        for arg in record.constructor_args {
            definition = definition.with_constructor_arg(arg);
        }
        for property in record.properties {
            definition = definition.with_property(property.name, property.reference);
        }
        Ok(definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bean_factory::{BeanFactoryExt, DefaultListableBeanFactory};

    struct Clock;

    struct Scheduler {
        clock: Arc<Clock>,
        backup: Option<Arc<Clock>>,
    }

    fn clock_class() -> Arc<BeanClass> {
        BeanClass::builder::<Clock>("reader::Clock")
            .constructor0(|| Ok(Clock))
            .build()
    }

    fn scheduler_class() -> Arc<BeanClass> {
        BeanClass::builder::<Scheduler>("reader::Scheduler")
            .constructor1::<Clock, _>(|clock| Ok(Scheduler { clock, backup: None }))
            .setter::<Clock, _, _>("set_backup_clock", |s: &mut Scheduler, clock| s.backup = Some(clock))
            .build()
    }

    crate::submit_class!(clock_class);

    fn classes() -> ClassRegistry {
        let mut classes = ClassRegistry::new();
        classes.register(clock_class()).register(scheduler_class());
        classes
    }

    const DOCUMENT: &str = r#"
        [[beans]]
        name = "clock"
        class = "reader::Clock"

        [[beans]]
        name = "scheduler"
        class = "reader::Scheduler"
        constructor-args = ["clock"]
        properties = [{ name = "backupClock", ref = "clock" }]
    "#;

    #[test]
    fn test_load_and_wire() {
        let factory = DefaultListableBeanFactory::new();
        let classes = classes();
        let reader = TomlBeanDefinitionReader::new(&factory, &classes);

        assert_eq!(reader.load_str(DOCUMENT).unwrap(), 2);
        assert_eq!(factory.get_bean_definition_names(), vec!["clock", "scheduler"]);

        let scheduler = factory.get_bean_typed::<Scheduler>("scheduler").unwrap();
        let clock = factory.get_bean_typed::<Clock>("clock").unwrap();
        assert!(Arc::ptr_eq(&scheduler.clock, &clock));
        assert!(Arc::ptr_eq(scheduler.backup.as_ref().unwrap(), &clock));
    }

    #[test]
    fn test_unknown_class_registers_nothing() {
        let factory = DefaultListableBeanFactory::new();
        let classes = classes();
        let reader = TomlBeanDefinitionReader::new(&factory, &classes);

        let err = reader
            .load_str(
                r#"
                [[beans]]
                name = "clock"
                class = "reader::Clock"

                [[beans]]
                name = "ghost"
                class = "reader::Ghost"
                "#,
            )
            .unwrap_err();

        assert!(err.to_string().contains("reader::Ghost"));
        assert_eq!(factory.get_bean_definition_count(), 0);
    }

    #[test]
    fn test_malformed_document() {
        let factory = DefaultListableBeanFactory::new();
        let classes = classes();
        let reader = TomlBeanDefinitionReader::new(&factory, &classes);

        assert!(reader.load_str("[[beans]]\nname = 1").is_err());
        assert!(reader
            .load_str("[[beans]]\nname = \"a\"\nclass = \"reader::Clock\"\nscope = \"prototype\"")
            .is_err());
        assert_eq!(reader.load_str("").unwrap(), 0);
    }

    #[test]
    fn test_duplicates_are_not_counted() {
        let factory = DefaultListableBeanFactory::new();
        let classes = classes();
        let reader = TomlBeanDefinitionReader::new(&factory, &classes);

        reader.load_str(DOCUMENT).unwrap();
        assert_eq!(reader.load_str(DOCUMENT).unwrap(), 0);
        assert_eq!(factory.get_bean_definition_count(), 2);
    }

    #[test]
    fn test_load_file() {
        let path = std::env::temp_dir().join(format!("weft-reader-{}.toml", std::process::id()));
        fs::write(&path, DOCUMENT).unwrap();

        let factory = DefaultListableBeanFactory::new();
        let classes = classes();
        let loaded = TomlBeanDefinitionReader::new(&factory, &classes).load_file(&path);
        fs::remove_file(&path).ok();

        assert_eq!(loaded.unwrap(), 2);

        let missing = TomlBeanDefinitionReader::new(&factory, &classes).load_file("/nonexistent/beans.toml");
        assert!(format!("{:#}", missing.unwrap_err()).contains("Failed to read bean definitions"));
    }

    #[test]
    fn test_submitted_classes_are_collected() {
        let classes = ClassRegistry::with_submitted();
        assert!(classes.contains("reader::Clock"));
    }
}
