//! Bean 类型描述
//!
//! [`BeanClass`] 是 Bean 定义中的实现类型描述：类型元数据、按声明顺序排列的候选
//! 构造函数、按名称查找的 setter、类型视图转换以及代理工厂。
//! 所有装配入口都是编译期检查过的闭包，容器只按名称和视图做匹配。

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;

use crate::bean::{Bean, View};
use crate::metadata::{Capability, Marker, Method, TypeInfo, Visibility};
use crate::proxy::{Interceptable, MethodInterceptor};
use crate::IntoResult;

/// 尚未共享的实例（构造完成、属性填充之前）
pub(crate) type Instance = Box<dyn Any + Send + Sync>;

type BuildFn = Box<dyn Fn(&[Bean]) -> anyhow::Result<Instance> + Send + Sync>;
type ApplyFn = Box<dyn Fn(&mut (dyn Any + Send + Sync), &Bean) -> anyhow::Result<()> + Send + Sync>;
type FinishFn = Box<dyn Fn(Instance) -> anyhow::Result<HashMap<TypeId, View>> + Send + Sync>;
type CastFn<T> = Box<dyn Fn(&Arc<T>) -> View + Send + Sync>;
pub(crate) type ProxyFactory = Box<dyn Fn(&Bean, &Arc<dyn MethodInterceptor>) -> Option<View> + Send + Sync>;

/// 构造函数或 setter 的参数类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub type_id: TypeId,
    pub type_name: &'static str,
}

impl Param {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    /// 参数类型是否可以由该 Bean 赋值
    pub fn accepts(&self, bean: &Bean) -> bool {
        bean.provides(self.type_id)
    }
}

/// 候选构造函数
pub struct Constructor {
    params: Vec<Param>,
    build: BuildFn,
}

impl Constructor {
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// 参数个数相同且每个参数都能由对应实参赋值
    pub fn matches(&self, args: &[Bean]) -> bool {
        self.params.len() == args.len() && self.params.iter().zip(args).all(|(param, arg)| param.accepts(arg))
    }

    pub(crate) fn invoke(&self, args: &[Bean]) -> anyhow::Result<Instance> {
        (self.build)(args)
    }
}

/// 单参数 setter
pub struct Setter {
    name: String,
    param: Param,
    apply: ApplyFn,
}

impl Setter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn param(&self) -> Param {
        self.param
    }

    pub(crate) fn invoke(&self, instance: &mut (dyn Any + Send + Sync), value: &Bean) -> anyhow::Result<()> {
        (self.apply)(instance, value)
    }
}

/// Bean 的实现类型描述
pub struct BeanClass {
    info: TypeInfo,
    constructors: Vec<Constructor>,
    setters: Vec<Setter>,
    view_names: Vec<(TypeId, &'static str)>,
    proxies: Vec<(TypeId, ProxyFactory)>,
    finish: FinishFn,
}

impl BeanClass {
    /// 开始描述具体类型 `T`，`name` 为全限定类型名
    pub fn builder<T: Send + Sync + 'static>(name: &'static str) -> BeanClassBuilder<T> {
        BeanClassBuilder::new(name)
    }

    pub fn info(&self) -> &TypeInfo {
        &self.info
    }

    pub fn name(&self) -> &'static str {
        self.info.name()
    }

    /// 是否提供指定类型视图（不需要实例化）
    pub fn provides(&self, type_id: TypeId) -> bool {
        self.info.provides(type_id)
    }

    pub fn is<I: ?Sized + 'static>(&self) -> bool {
        self.provides(TypeId::of::<I>())
    }

    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    /// 无参构造函数
    pub fn default_constructor(&self) -> Option<&Constructor> {
        self.constructors.iter().find(|c| c.params.is_empty())
    }

    /// 第一个与实参结构匹配的构造函数
    pub fn matching_constructor(&self, args: &[Bean]) -> Option<&Constructor> {
        self.constructors.iter().find(|c| c.matches(args))
    }

    /// 指定名称、且参数能接受 `value` 的第一个 setter
    pub fn matching_setter(&self, name: &str, value: &Bean) -> Option<&Setter> {
        self.setters
            .iter()
            .find(|s| s.name == name && s.param.accepts(value))
    }

    pub(crate) fn finish(&self, instance: Instance) -> anyhow::Result<HashMap<TypeId, View>> {
        (self.finish)(instance)
    }

    pub(crate) fn proxy_factories(&self) -> impl Iterator<Item = (TypeId, &ProxyFactory)> {
        self.proxies.iter().map(|(type_id, factory)| (*type_id, factory))
    }

    pub(crate) fn view_names(&self) -> impl Iterator<Item = (TypeId, &'static str)> + '_ {
        self.view_names.iter().copied()
    }
}

impl std::fmt::Debug for BeanClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanClass")
            .field("name", &self.info.name())
            .field("constructors", &self.constructors.len())
            .field("setters", &self.setters.len())
            .field("interceptable", &self.proxies.len())
            .finish()
    }
}

fn arg<A: ?Sized + 'static>(args: &[Bean], index: usize) -> anyhow::Result<Arc<A>> {
    args.get(index)
        .and_then(|bean| bean.get::<A>())
        .ok_or_else(|| anyhow!("constructor argument {} is not a '{}'", index, type_name::<A>()))
}

/// [`BeanClass`] 构建器
pub struct BeanClassBuilder<T> {
    info: TypeInfo,
    constructors: Vec<Constructor>,
    setters: Vec<Setter>,
    casts: Vec<(TypeId, CastFn<T>)>,
    view_names: Vec<(TypeId, &'static str)>,
    proxies: Vec<(TypeId, ProxyFactory)>,
}

impl<T: Send + Sync + 'static> BeanClassBuilder<T> {
    fn new(name: &'static str) -> Self {
        Self {
            info: TypeInfo::new(name, TypeId::of::<T>()),
            constructors: Vec::new(),
            setters: Vec::new(),
            casts: Vec::new(),
            view_names: vec![(TypeId::of::<T>(), type_name::<T>())],
            proxies: Vec::new(),
        }
    }

    /// 类型级标记
    pub fn marker(mut self, marker: Marker) -> Self {
        self.info.add_marker(marker);
        self
    }

    /// 在类型方法表中声明一个方法（用于可见性和方法级标记）
    pub fn method(mut self, name: &'static str, visibility: Visibility, markers: &'static [Marker]) -> Self {
        let method = Method::new(self.info.name(), name, markers).with_visibility(visibility);
        self.info.add_method(method);
        self
    }

    /// 声明实现的能力 `I`，`cast` 通常写作 `|b| b`
    pub fn implements<I>(self, cast: fn(Arc<T>) -> Arc<I>) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        self.capability(cast, type_name::<I>(), Vec::new(), &[])
    }

    /// 声明实现的能力 `I`，并在能力上附加标记
    pub fn implements_marked<I>(self, cast: fn(Arc<T>) -> Arc<I>, markers: &[Marker]) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        self.capability(cast, type_name::<I>(), markers.to_vec(), &[])
    }

    /// 声明可被代理的能力 `I`（由 `#[interceptable]` 生成）
    pub fn interceptable<I>(self, cast: fn(Arc<T>) -> Arc<I>) -> Self
    where
        I: ?Sized + Interceptable + Send + Sync + 'static,
    {
        let mut builder = self.capability(cast, I::capability_name(), I::capability_markers().to_vec(), I::methods());
        let factory: ProxyFactory = Box::new(|bean: &Bean, interceptor: &Arc<dyn MethodInterceptor>| {
            bean.get::<I>()
                .map(|target| Arc::new(I::proxy(target, Arc::clone(interceptor))) as View)
        });
        builder.proxies.push((TypeId::of::<I>(), factory));
        builder
    }

    fn capability<I>(
        mut self,
        cast: fn(Arc<T>) -> Arc<I>,
        name: &'static str,
        markers: Vec<Marker>,
        methods: &'static [Method],
    ) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        let type_id = TypeId::of::<I>();
        self.info.add_capability(Capability {
            type_id,
            name,
            markers,
            methods,
        });
        self.casts.retain(|(id, _)| *id != type_id);
        self.casts
            .push((type_id, Box::new(move |concrete: &Arc<T>| Arc::new(cast(Arc::clone(concrete))) as View)));
        self.view_names.retain(|(id, _)| *id != type_id);
        self.view_names.push((type_id, type_name::<I>()));
        self
    }

    /// 无参构造函数
    pub fn constructor0<F>(mut self, f: F) -> Self
    where
        F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.constructors.push(Constructor {
            params: Vec::new(),
            build: Box::new(move |_| Ok(Box::new(f()?) as Instance)),
        });
        self
    }

    pub fn constructor1<A, F>(mut self, f: F) -> Self
    where
        A: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<A>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.constructors.push(Constructor {
            params: vec![Param::of::<A>()],
            build: Box::new(move |args| Ok(Box::new(f(arg::<A>(args, 0)?)?) as Instance)),
        });
        self
    }

    pub fn constructor2<A, B, F>(mut self, f: F) -> Self
    where
        A: ?Sized + Send + Sync + 'static,
        B: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<A>, Arc<B>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.constructors.push(Constructor {
            params: vec![Param::of::<A>(), Param::of::<B>()],
            build: Box::new(move |args| Ok(Box::new(f(arg::<A>(args, 0)?, arg::<B>(args, 1)?)?) as Instance)),
        });
        self
    }

    pub fn constructor3<A, B, C, F>(mut self, f: F) -> Self
    where
        A: ?Sized + Send + Sync + 'static,
        B: ?Sized + Send + Sync + 'static,
        C: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<A>, Arc<B>, Arc<C>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.constructors.push(Constructor {
            params: vec![Param::of::<A>(), Param::of::<B>(), Param::of::<C>()],
            build: Box::new(move |args| {
                let instance = f(arg::<A>(args, 0)?, arg::<B>(args, 1)?, arg::<C>(args, 2)?)?;
                Ok(Box::new(instance) as Instance)
            }),
        });
        self
    }

    /// 单参数 setter，`name` 按约定为 `set_` + 属性名的 snake_case
    ///
    /// 闭包可以返回 `()` 或 `anyhow::Result<()>`。
    pub fn setter<A, F, R>(mut self, name: &str, f: F) -> Self
    where
        A: ?Sized + Send + Sync + 'static,
        F: Fn(&mut T, Arc<A>) -> R + Send + Sync + 'static,
        R: IntoResult,
    {
        let setter_name = name.to_string();
        let apply: ApplyFn = Box::new(move |instance: &mut (dyn Any + Send + Sync), value: &Bean| {
            let target = instance
                .downcast_mut::<T>()
                .ok_or_else(|| anyhow!("instance is not a '{}'", type_name::<T>()))?;
            let value = value
                .get::<A>()
                .ok_or_else(|| anyhow!("value is not a '{}'", type_name::<A>()))?;
            f(target, value).into_result()
        });
        self.setters.push(Setter {
            name: setter_name,
            param: Param::of::<A>(),
            apply,
        });
        self
    }

    pub fn build(self) -> Arc<BeanClass> {
        let casts = self.casts;
        let finish: FinishFn = Box::new(move |instance: Instance| {
            let concrete: Arc<T> = match instance.downcast::<T>() {
                Ok(value) => Arc::new(*value),
                Err(_) => return Err(anyhow!("instance is not a '{}'", type_name::<T>())),
            };
            let mut views: HashMap<TypeId, View> = HashMap::with_capacity(casts.len() + 1);
            for (type_id, cast) in &casts {
                views.insert(*type_id, cast(&concrete));
            }
            views.insert(TypeId::of::<T>(), Arc::new(concrete) as View);
            Ok(views)
        });

        Arc::new(BeanClass {
            info: self.info,
            constructors: self.constructors,
            setters: self.setters,
            view_names: self.view_names,
            proxies: self.proxies,
            finish,
        })
    }
}
