//! Bean 定义

use std::sync::Arc;

use crate::class::BeanClass;

/// Bean 定义：名称、实现类型、构造参数引用和属性引用
///
/// 注册后由容器持有，不再修改。
#[derive(Clone)]
pub struct BeanDefinition {
    name: String,
    class: Arc<BeanClass>,
    constructor_args: Vec<String>,
    properties: Vec<(String, String)>,
}

impl BeanDefinition {
    pub fn new(name: impl Into<String>, class: Arc<BeanClass>) -> Self {
        Self {
            name: name.into(),
            class,
            constructor_args: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// 追加一个构造参数（引用的 Bean 名称）
    pub fn with_constructor_arg(mut self, bean_name: impl Into<String>) -> Self {
        self.constructor_args.push(bean_name.into());
        self
    }

    /// 设置属性引用，同名属性会被覆盖
    pub fn with_property(mut self, property: impl Into<String>, bean_name: impl Into<String>) -> Self {
        let property = property.into();
        let bean_name = bean_name.into();
        match self.properties.iter_mut().find(|(p, _)| *p == property) {
            Some(entry) => entry.1 = bean_name,
            None => self.properties.push((property, bean_name)),
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> &Arc<BeanClass> {
        &self.class
    }

    pub fn class_name(&self) -> &'static str {
        self.class.name()
    }

    pub fn constructor_args(&self) -> &[String] {
        &self.constructor_args
    }

    /// 属性名 -> Bean 名称
    pub fn properties(&self) -> &[(String, String)] {
        &self.properties
    }

    pub fn property(&self, property: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(p, _)| p == property)
            .map(|(_, bean)| bean.as_str())
    }

    /// 依赖的所有 Bean 名称（构造参数在前）
    pub fn dependencies(&self) -> Vec<String> {
        self.constructor_args
            .iter()
            .cloned()
            .chain(self.properties.iter().map(|(_, bean)| bean.clone()))
            .collect()
    }
}

impl std::fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("name", &self.name)
            .field("class", &self.class.name())
            .field("constructor_args", &self.constructor_args)
            .field("properties", &self.properties)
            .finish()
    }
}
