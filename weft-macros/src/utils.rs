//! 工具函数

use proc_macro2::TokenStream;
use syn::{GenericArgument, PathArguments, ReturnType, Type};

/// 将错误转换为编译错误
pub fn to_compile_error(err: syn::Error) -> TokenStream {
    err.to_compile_error()
}

/// `OrderService` -> `ORDER_SERVICE`
pub fn to_screaming_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + s.len() / 2);
    for ch in s.chars() {
        if ch.is_uppercase() && !result.is_empty() {
            result.push('_');
        }
        result.extend(ch.to_uppercase());
    }
    result
}

/// 从 `Result<T>` / `Result<T, E>` 返回类型中取出 `T`
pub fn result_ok_type(output: &ReturnType) -> Option<&Type> {
    let ReturnType::Type(_, ty) = output else {
        return None;
    };
    let Type::Path(type_path) = &**ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Result" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    }
}
