//! #[interceptable] trait 属性宏实现

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::punctuated::Punctuated;
use syn::{Error, FnArg, Ident, ItemTrait, LitStr, Pat, PatIdent, Result, Token, TraitItem, TraitItemFn, Type};

use crate::utils::{result_ok_type, to_screaming_snake_case};

/// 单个方法的代理信息
struct ProxiedMethod {
    ident: Ident,
    name: String,
    markers: Vec<LitStr>,
    arg_idents: Vec<Ident>,
    arg_types: Vec<Type>,
    ok_type: Type,
    signature: syn::Signature,
}

pub fn impl_interceptable(capability_markers: Vec<LitStr>, mut item: ItemTrait) -> Result<TokenStream> {
    if !item.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &item.generics,
            "#[interceptable] does not support generic traits",
        ));
    }

    let mut methods = Vec::new();
    for trait_item in item.items.iter_mut() {
        match trait_item {
            TraitItem::Fn(method) => methods.push(analyze_method(method)?),
            other => {
                return Err(Error::new_spanned(
                    other,
                    "#[interceptable] traits may only contain methods",
                ))
            }
        }
    }

    let trait_ident = &item.ident;
    let trait_name = trait_ident.to_string();
    let vis = &item.vis;
    let proxy_ident = format_ident!("{}Proxy", trait_ident);
    let methods_ident = format_ident!("__WEFT_{}_METHODS", to_screaming_snake_case(&trait_name));
    let method_count = methods.len();

    let method_entries = methods.iter().map(|m| {
        let name = &m.name;
        let markers = &m.markers;
        quote! {
            ::weft_core::metadata::Method::new(
                #trait_name,
                #name,
                &[#(::weft_core::metadata::Marker(#markers)),*],
            )
        }
    });

    let proxy_methods = methods.iter().enumerate().map(|(index, m)| {
        let ProxiedMethod {
            ident,
            arg_idents,
            arg_types,
            ok_type,
            signature,
            ..
        } = m;
        let bindings = arg_idents.iter().zip(arg_types).enumerate().map(|(position, (arg, ty))| {
            quote! {
                let #arg: #ty = ::std::clone::Clone::clone(__weft_args.get::<#ty>(#position)?);
            }
        });
        quote! {
            #signature {
                let __weft_target = &self.target;
                let __weft_arguments = ::weft_core::proxy::Arguments::new() #(.with(#arg_idents))*;
                let __weft_joinpoint = |__weft_args: &::weft_core::proxy::Arguments| -> ::weft_core::proxy::InvocationResult {
                    #(#bindings)*
                    let __weft_value = __weft_target.#ident(#(#arg_idents),*)?;
                    let __weft_boxed: ::weft_core::proxy::ReturnValue = ::std::boxed::Box::new(__weft_value);
                    ::std::result::Result::Ok(__weft_boxed)
                };
                let __weft_value = self.interceptor.intercept(
                    &#methods_ident[#index],
                    __weft_arguments,
                    &__weft_joinpoint,
                )?;
                ::std::result::Result::Ok(::weft_core::proxy::downcast_return::<#ok_type>(__weft_value)?)
            }
        }
    });

    let proxy_doc = format!("`{}` 的拦截代理，由 `#[interceptable]` 生成", trait_name);

    Ok(quote! {
        #item

        #[doc(hidden)]
        static #methods_ident: [::weft_core::metadata::Method; #method_count] = [#(#method_entries),*];

        #[doc = #proxy_doc]
        #vis struct #proxy_ident {
            target: ::std::sync::Arc<dyn #trait_ident>,
            interceptor: ::std::sync::Arc<dyn ::weft_core::proxy::MethodInterceptor>,
        }

        impl #proxy_ident {
            pub fn new(
                target: ::std::sync::Arc<dyn #trait_ident>,
                interceptor: ::std::sync::Arc<dyn ::weft_core::proxy::MethodInterceptor>,
            ) -> Self {
                Self { target, interceptor }
            }

            /// 被代理的目标
            pub fn target(&self) -> &::std::sync::Arc<dyn #trait_ident> {
                &self.target
            }
        }

        impl #trait_ident for #proxy_ident {
            #(#proxy_methods)*
        }

        impl ::weft_core::proxy::Interceptable for dyn #trait_ident {
            fn capability_name() -> &'static str {
                #trait_name
            }

            fn capability_markers() -> &'static [::weft_core::metadata::Marker] {
                &[#(::weft_core::metadata::Marker(#capability_markers)),*]
            }

            fn methods() -> &'static [::weft_core::metadata::Method] {
                &#methods_ident
            }

            fn proxy(
                target: ::std::sync::Arc<Self>,
                interceptor: ::std::sync::Arc<dyn ::weft_core::proxy::MethodInterceptor>,
            ) -> ::std::sync::Arc<Self> {
                ::std::sync::Arc::new(#proxy_ident::new(target, interceptor))
            }
        }
    })
}

/// 校验方法签名并剥离 `#[marker]` 属性
fn analyze_method(method: &mut TraitItemFn) -> Result<ProxiedMethod> {
    let mut markers = Vec::new();
    let mut kept = Vec::with_capacity(method.attrs.len());
    for attr in method.attrs.drain(..) {
        if attr.path().is_ident("marker") {
            let names = attr.parse_args_with(Punctuated::<LitStr, Token![,]>::parse_terminated)?;
            markers.extend(names);
        } else {
            kept.push(attr);
        }
    }
    method.attrs = kept;

    let sig = &method.sig;
    if sig.asyncness.is_some() {
        return Err(Error::new_spanned(sig, "#[interceptable] does not support async methods"));
    }
    if !sig.generics.params.is_empty() {
        return Err(Error::new_spanned(&sig.generics, "#[interceptable] does not support generic methods"));
    }
    match sig.receiver() {
        Some(receiver) if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        _ => {
            return Err(Error::new_spanned(sig, "#[interceptable] methods must take `&self`"));
        }
    }

    let ok_type = result_ok_type(&sig.output)
        .cloned()
        .ok_or_else(|| Error::new_spanned(&sig.output, "#[interceptable] methods must return Result<T, E>"))?;

    let mut signature = sig.clone();
    let mut arg_idents = Vec::new();
    let mut arg_types = Vec::new();
    for input in signature.inputs.iter_mut() {
        let FnArg::Typed(pat_type) = input else {
            continue;
        };
        if matches!(&*pat_type.ty, Type::Reference(_) | Type::ImplTrait(_)) {
            return Err(Error::new_spanned(
                &pat_type.ty,
                "#[interceptable] arguments must be owned 'static types",
            ));
        }
        let ident = format_ident!("__weft_arg{}", arg_idents.len());
        pat_type.pat = Box::new(Pat::Ident(PatIdent {
            attrs: Vec::new(),
            by_ref: None,
            mutability: None,
            ident: ident.clone(),
            subpat: None,
        }));
        arg_idents.push(ident);
        arg_types.push((*pat_type.ty).clone());
    }

    Ok(ProxiedMethod {
        ident: sig.ident.clone(),
        name: sig.ident.to_string(),
        markers,
        arg_idents,
        arg_types,
        ok_type,
        signature,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_marker_attributes_are_stripped() {
        let item: ItemTrait = parse_quote! {
            pub trait Ledger: Send + Sync {
                #[marker("Transactional", "Audited")]
                fn post(&self, amount: i64) -> anyhow::Result<()>;
            }
        };
        let output = impl_interceptable(Vec::new(), item).unwrap().to_string();
        assert!(!output.contains("# [marker"));
        assert!(output.contains("LedgerProxy"));
        assert!(output.contains("__WEFT_LEDGER_METHODS"));
        assert!(output.contains("\"Audited\""));
    }

    #[test]
    fn test_rejects_non_result_methods() {
        let item: ItemTrait = parse_quote! {
            pub trait Clock: Send + Sync {
                fn now(&self) -> u64;
            }
        };
        assert!(impl_interceptable(Vec::new(), item).is_err());
    }

    #[test]
    fn test_rejects_borrowed_arguments() {
        let item: ItemTrait = parse_quote! {
            pub trait Lookup: Send + Sync {
                fn find(&self, key: &str) -> anyhow::Result<u64>;
            }
        };
        assert!(impl_interceptable(Vec::new(), item).is_err());
    }

    #[test]
    fn test_rejects_mutable_receivers() {
        let item: ItemTrait = parse_quote! {
            pub trait Counter: Send + Sync {
                fn bump(&mut self) -> anyhow::Result<u64>;
            }
        };
        assert!(impl_interceptable(Vec::new(), item).is_err());
    }
}
