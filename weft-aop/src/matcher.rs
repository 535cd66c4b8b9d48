//! 匹配器
//!
//! 类匹配器判断一个类型是否可能被织入，方法匹配器判断一次具体调用是否执行通知。

use regex::Regex;
use weft_core::{Marker, Method, TypeInfo};

/// 类匹配器
pub trait ClassMatcher: Send + Sync {
    fn matches(&self, target: &TypeInfo) -> bool;
}

/// 方法匹配器
pub trait MethodMatcher: Send + Sync {
    fn matches(&self, method: &Method, target: &TypeInfo) -> bool;
}

/// 总是匹配
#[derive(Debug, Clone, Copy, Default)]
pub struct TrueMatcher;

impl ClassMatcher for TrueMatcher {
    fn matches(&self, _target: &TypeInfo) -> bool {
        true
    }
}

impl MethodMatcher for TrueMatcher {
    fn matches(&self, _method: &Method, _target: &TypeInfo) -> bool {
        true
    }
}

/// 简单的通配符匹配
///
/// 支持的模式：
/// - `*` - 匹配任意字符串
/// - `User*` - 以 User 开头
/// - `*Service` - 以 Service 结尾
/// - `*Service*` - 包含 Service
/// - 其他 - 完全相等
pub(crate) fn pattern_matches(pattern: &str, candidate: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    match (pattern.strip_prefix('*'), pattern.strip_suffix('*')) {
        (Some(rest), Some(_)) => candidate.contains(&rest[..rest.len() - 1]),
        (Some(suffix), None) => candidate.ends_with(suffix),
        (None, Some(prefix)) => candidate.starts_with(prefix),
        (None, None) => candidate == pattern,
    }
}

fn collect_patterns<I, S>(patterns: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    patterns.into_iter().map(Into::into).collect()
}

/// 按类型名匹配，任一模式匹配即可
///
/// 默认对全限定名匹配；[`NameClassMatcher::simple`] 对最后一个路径段匹配。
#[derive(Debug, Clone)]
pub struct NameClassMatcher {
    patterns: Vec<String>,
    simple_names: bool,
}

impl NameClassMatcher {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: collect_patterns(patterns),
            simple_names: false,
        }
    }

    pub fn simple<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: collect_patterns(patterns),
            simple_names: true,
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl ClassMatcher for NameClassMatcher {
    fn matches(&self, target: &TypeInfo) -> bool {
        let name = if self.simple_names { target.simple_name() } else { target.name() };
        self.patterns.iter().any(|p| pattern_matches(p, name))
    }
}

/// 按方法名匹配，任一模式匹配即可
#[derive(Debug, Clone)]
pub struct NameMethodMatcher {
    patterns: Vec<String>,
}

impl NameMethodMatcher {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: collect_patterns(patterns),
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl MethodMatcher for NameMethodMatcher {
    fn matches(&self, method: &Method, _target: &TypeInfo) -> bool {
        self.patterns.iter().any(|p| pattern_matches(p, method.name))
    }
}

/// 正则匹配全限定类型名
#[derive(Debug, Clone)]
pub struct RegexClassMatcher {
    regex: Regex,
}

impl RegexClassMatcher {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }
}

impl ClassMatcher for RegexClassMatcher {
    fn matches(&self, target: &TypeInfo) -> bool {
        self.regex.is_match(target.name())
    }
}

/// 正则匹配 `全限定类型名.方法名`
#[derive(Debug, Clone)]
pub struct RegexMethodMatcher {
    regex: Regex,
}

impl RegexMethodMatcher {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }
}

impl MethodMatcher for RegexMethodMatcher {
    fn matches(&self, method: &Method, target: &TypeInfo) -> bool {
        self.regex.is_match(&format!("{}.{}", target.name(), method.name))
    }
}

/// 标记类匹配器
///
/// 类型自身、任一能力或任一方法携带标记即匹配，方法级标记的类型也需要进入代理候选。
#[derive(Debug, Clone, Copy)]
pub struct MarkerClassMatcher {
    marker: Marker,
}

impl MarkerClassMatcher {
    pub fn new(marker: Marker) -> Self {
        Self { marker }
    }

    pub fn marker(&self) -> Marker {
        self.marker
    }
}

impl ClassMatcher for MarkerClassMatcher {
    fn matches(&self, target: &TypeInfo) -> bool {
        target.carries_marker(self.marker) || target.has_marked_method(self.marker)
    }
}

/// 标记方法匹配器
///
/// 方法级标记不论可见性都生效；只在类型级存在的标记只作用于公开方法。
#[derive(Debug, Clone, Copy)]
pub struct MarkerMethodMatcher {
    marker: Marker,
}

impl MarkerMethodMatcher {
    pub fn new(marker: Marker) -> Self {
        Self { marker }
    }

    pub fn marker(&self) -> Marker {
        self.marker
    }
}

impl MethodMatcher for MarkerMethodMatcher {
    fn matches(&self, method: &Method, target: &TypeInfo) -> bool {
        // 目标类型自己声明的同名方法优先
        let specific = target.declared_method(method.name).unwrap_or(method);

        if specific.has_marker(self.marker) || method.has_marker(self.marker) {
            return true;
        }

        target.carries_marker(self.marker) && specific.is_public()
    }
}
