//! Bean 实例句柄

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::class::BeanClass;
use crate::metadata::TypeInfo;
use crate::proxy::MethodInterceptor;

/// 单个类型视图：内部保存 `Arc<T>`，`T` 可以是具体类型或 `dyn Trait`
pub(crate) type View = Arc<dyn Any + Send + Sync>;

/// 容器管理的 Bean 实例
///
/// 同一个实例可以通过多个视图访问：具体类型 `Arc<T>`，以及注册类型时声明的
/// 每个能力 `Arc<dyn Trait>`。"可赋值给某类型" 即 "提供该类型的视图"。
///
/// 克隆 `Bean` 只复制句柄，不复制实例。
#[derive(Clone)]
pub struct Bean {
    inner: Arc<BeanInner>,
}

struct BeanInner {
    class: Arc<BeanClass>,
    views: HashMap<TypeId, View>,
    proxy: bool,
}

impl Bean {
    pub(crate) fn from_views(class: Arc<BeanClass>, views: HashMap<TypeId, View>, proxy: bool) -> Self {
        Self {
            inner: Arc::new(BeanInner { class, views, proxy }),
        }
    }

    /// 以给定类型视图访问实例
    pub fn get<T: ?Sized + 'static>(&self) -> Option<Arc<T>> {
        self.inner
            .views
            .get(&TypeId::of::<T>())
            .and_then(|view| view.downcast_ref::<Arc<T>>())
            .cloned()
    }

    /// 是否提供指定类型的视图
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.provides(TypeId::of::<T>())
    }

    pub fn provides(&self, type_id: TypeId) -> bool {
        self.inner.views.contains_key(&type_id)
    }

    /// 运行时类型的元数据（代理与目标相同）
    pub fn type_info(&self) -> &TypeInfo {
        self.inner.class.info()
    }

    pub fn type_name(&self) -> &'static str {
        self.inner.class.info().name()
    }

    pub fn class(&self) -> &Arc<BeanClass> {
        &self.inner.class
    }

    pub fn is_proxy(&self) -> bool {
        self.inner.proxy
    }

    /// 两个句柄是否指向同一个实例
    pub fn ptr_eq(a: &Bean, b: &Bean) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// 生成代理 Bean
    ///
    /// 可拦截能力的视图换成代理，其余能力视图原样保留；具体类型视图被隐藏，
    /// 调用方无法绕过通知。类型没有任何可拦截能力时返回 `None`。
    pub fn proxied(&self, interceptor: Arc<dyn MethodInterceptor>) -> Option<Bean> {
        let class = &self.inner.class;
        let mut views: HashMap<TypeId, View> = class
            .proxy_factories()
            .filter_map(|(type_id, factory)| factory(self, &interceptor).map(|view| (type_id, view)))
            .collect();

        if views.is_empty() {
            return None;
        }

        let concrete = class.info().type_id();
        for (type_id, view) in &self.inner.views {
            if *type_id != concrete {
                views.entry(*type_id).or_insert_with(|| Arc::clone(view));
            }
        }
        Some(Bean::from_views(Arc::clone(class), views, true))
    }

    pub(crate) fn describe_views(&self) -> String {
        let class = &self.inner.class;
        let mut names: Vec<&str> = class
            .view_names()
            .filter(|(type_id, _)| self.provides(*type_id))
            .map(|(_, name)| name)
            .collect();
        names.sort_unstable();
        if self.inner.proxy {
            format!("proxy of {} [{}]", self.type_name(), names.join(", "))
        } else {
            format!("{} [{}]", self.type_name(), names.join(", "))
        }
    }
}

impl std::fmt::Debug for Bean {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bean")
            .field("type", &self.type_name())
            .field("proxy", &self.inner.proxy)
            .field("views", &self.inner.views.len())
            .finish()
    }
}
