//! Weft 过程宏
//!
//! - `#[interceptable]` - 为 trait 生成拦截代理

extern crate proc_macro;

use proc_macro::TokenStream;
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, ItemTrait, LitStr, Token};

mod interceptable;
mod utils;

/// `#[interceptable]` 属性宏
///
/// 为 trait 生成 `<Trait>Proxy` 结构体以及 `impl Interceptable for dyn Trait`，
/// 代理把每次方法调用转交给 `MethodInterceptor`。
///
/// 属性参数是能力级标记，方法上的 `#[marker("..")]` 是方法级标记。
///
/// ```ignore
/// #[weft_core::interceptable("Transactional")]
/// pub trait OrderService: Send + Sync {
///     #[marker("Audited")]
///     fn place_order(&self, item: String, quantity: u32) -> anyhow::Result<u64>;
/// }
/// ```
///
/// 约束：方法接收 `&self`，参数为拥有所有权的 `'static + Clone + Send` 类型，
/// 返回 `Result<T, E>`，其中 `E` 与 `anyhow::Error` 可以互相转换。
#[proc_macro_attribute]
pub fn interceptable(attr: TokenStream, item: TokenStream) -> TokenStream {
    let markers = parse_macro_input!(attr with Punctuated::<LitStr, Token![,]>::parse_terminated);
    let item = parse_macro_input!(item as ItemTrait);

    interceptable::impl_interceptable(markers.into_iter().collect(), item)
        .unwrap_or_else(utils::to_compile_error)
        .into()
}
