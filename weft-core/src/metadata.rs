//! 类型元数据
//!
//! Rust 没有运行时反射，匹配器需要的类型信息（全限定名、标记、实现的能力、
//! 方法表）在注册 Bean 类型时显式声明。

use std::any::TypeId;

/// 声明式标记，附着在类型、能力（trait）或方法上
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Marker(pub &'static str);

impl Marker {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Marker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// 方法可见性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Public,
    /// 非公开（crate 内部或私有辅助方法）
    Restricted,
}

/// 方法标识
///
/// 代理在每次调用时把静态的 `Method` 交给拦截器，匹配器据此判断是否织入。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Method {
    pub declaring_type: &'static str,
    pub name: &'static str,
    pub visibility: Visibility,
    pub markers: &'static [Marker],
}

impl Method {
    pub const fn new(declaring_type: &'static str, name: &'static str, markers: &'static [Marker]) -> Self {
        Self {
            declaring_type,
            name,
            visibility: Visibility::Public,
            markers,
        }
    }

    pub const fn with_visibility(self, visibility: Visibility) -> Self {
        Self { visibility, ..self }
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    pub fn has_marker(&self, marker: Marker) -> bool {
        self.markers.contains(&marker)
    }

    /// `Type.method` 形式的签名
    pub fn signature(&self) -> String {
        format!("{}.{}", self.declaring_type, self.name)
    }
}

/// 类型实现的一项能力（通常是一个 trait 视图）
#[derive(Debug, Clone)]
pub struct Capability {
    pub type_id: TypeId,
    pub name: &'static str,
    pub markers: Vec<Marker>,
    pub methods: &'static [Method],
}

/// Bean 类型的元数据
#[derive(Debug, Clone)]
pub struct TypeInfo {
    name: &'static str,
    type_id: TypeId,
    markers: Vec<Marker>,
    capabilities: Vec<Capability>,
    methods: Vec<Method>,
}

impl TypeInfo {
    pub fn new(name: &'static str, type_id: TypeId) -> Self {
        Self {
            name,
            type_id,
            markers: Vec::new(),
            capabilities: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// 全限定类型名，例如 `shop::order::OrderServiceImpl`
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 简单类型名（最后一个路径段）
    pub fn simple_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// 是否提供指定的类型视图（具体类型或任一能力）
    pub fn provides(&self, type_id: TypeId) -> bool {
        self.type_id == type_id || self.capabilities.iter().any(|c| c.type_id == type_id)
    }

    /// 类型自身声明的方法（优先于能力上的同名方法）
    pub fn declared_method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// 类型或其实现的任一能力是否携带标记
    pub fn carries_marker(&self, marker: Marker) -> bool {
        self.markers.contains(&marker)
            || self.capabilities.iter().any(|c| c.markers.contains(&marker))
    }

    /// 是否有任一方法（类型方法表或能力方法）携带标记
    pub fn has_marked_method(&self, marker: Marker) -> bool {
        self.methods.iter().any(|m| m.has_marker(marker))
            || self
                .capabilities
                .iter()
                .flat_map(|c| c.methods.iter())
                .any(|m| m.has_marker(marker))
    }

    pub(crate) fn add_marker(&mut self, marker: Marker) {
        if !self.markers.contains(&marker) {
            self.markers.push(marker);
        }
    }

    pub(crate) fn add_capability(&mut self, capability: Capability) {
        self.capabilities.retain(|c| c.type_id != capability.type_id);
        self.capabilities.push(capability);
    }

    pub(crate) fn add_method(&mut self, method: Method) {
        self.methods.retain(|m| m.name != method.name);
        self.methods.push(method);
    }
}
