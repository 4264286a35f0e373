use quote::{ToTokens, format_ident};
use syn::{Attribute, Field, FieldsNamed, Token, Type, punctuated::Punctuated};

// 提取非 derive 属性与已有 derive 列表
fn split_derives(attrs: &[Attribute]) -> (Vec<Attribute>, Vec<syn::Path>) {
    let mut retained = Vec::new();
    let mut existing = Vec::new();
    for attr in attrs.iter() {
        if attr.path().is_ident("derive") {
            if let Ok(list) =
                attr.parse_args_with(Punctuated::<syn::Path, Token![,]>::parse_terminated)
            {
                existing.extend(list);
            }
        } else {
            retained.push(attr.clone());
        }
    }
    (retained, existing)
}

// 按末段名归一化 derive，避免 Debug 与 ::core::fmt::Debug 重复
fn derive_key(p: &syn::Path) -> String {
    p.segments
        .last()
        .map(|s| s.ident.to_string())
        .unwrap_or_else(|| p.to_token_stream().to_string())
}

/// 把 `required` 与已有 derive 合并为一个 derive 属性（去重，required 在前）
pub(crate) fn apply_derives(attrs: &mut Vec<Attribute>, required: Vec<syn::Path>) {
    let (retained, existing) = split_derives(attrs);
    let mut seen = std::collections::HashSet::<String>::new();
    let merged: Vec<syn::Path> = required
        .into_iter()
        .chain(existing)
        .filter(|p| seen.insert(derive_key(p)))
        .collect();
    let derive: Attribute = syn::parse_quote!(#[derive(#(#merged),*)]);
    *attrs = std::iter::once(derive).chain(retained).collect();
}

/// 确保具名字段结构体包含所需字段
/// - required: (字段名, 字段类型) 列表，按给定顺序处理
/// - reposition_existing 为 true 时把所需字段（已有则复用原定义）移到最前；
///   为 false 时仅在缺失时于最前追加，保留既有顺序。
pub(crate) fn ensure_required_fields(
    fields_named: &mut FieldsNamed,
    required: &[(&str, &Type)],
    reposition_existing: bool,
) {
    let old_named = fields_named.named.clone();
    let mut new_named: Punctuated<Field, Token![,]> = Punctuated::new();

    for (name, ty) in required.iter() {
        let existing = old_named
            .iter()
            .find(|f| f.ident.as_ref().is_some_and(|i| i == name));
        match existing {
            Some(f) if reposition_existing => new_named.push(f.clone()),
            Some(_) => {}
            None => {
                let ident = format_ident!("{}", name);
                let vis = visibility_of_first(&old_named);
                new_named.push(syn::parse_quote! { #vis #ident: #ty });
            }
        }
    }

    for f in old_named.into_iter() {
        let moved = reposition_existing
            && f
                .ident
                .as_ref()
                .is_some_and(|i| required.iter().any(|(n, _)| i == n));
        if !moved {
            new_named.push(f);
        }
    }

    fields_named.named = new_named;
}

// 新增字段沿用结构体首个字段的可见性，没有字段时为私有
fn visibility_of_first(named: &Punctuated<Field, Token![,]>) -> syn::Visibility {
    named
        .first()
        .map(|f| f.vis.clone())
        .unwrap_or(syn::Visibility::Inherited)
}

/// 类型路径的末段是否为 `name`（如 `::ddd_domain::aggregate::DomainEvents`）
pub(crate) fn type_ends_with(ty: &Type, name: &str) -> bool {
    match ty {
        Type::Path(p) => p.path.segments.last().is_some_and(|s| s.ident == name),
        _ => false,
    }
}
