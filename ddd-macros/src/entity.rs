use crate::utils::{apply_derives, ensure_required_fields};
use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{
    Item, ItemStruct, Result, Token, Type, parse::Parse, parse::ParseStream, parse_macro_input,
};

/// #[entity] 宏实现
/// - 若缺失则追加字段 `id: IdType`，并置于字段最前
/// - 合并派生：Debug（可通过 `debug = false` 关闭）、Clone
/// - 自动实现 `::ddd_domain::entity::Entity`
/// - 支持参数：`#[entity(id = IdType, debug = true|false)]`，`id` 默认 `String`
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as EntityAttrConfig);
    let input = parse_macro_input!(item as Item);

    let st = match prepare_struct(input, &cfg, "#[entity]", &[]) {
        Ok(st) => st,
        Err(err) => return err.to_compile_error().into(),
    };

    let entity_impl = entity_impl(&st, &cfg.id_type());

    TokenStream::from(quote! {
        #st
        #entity_impl
    })
}

/// 校验为具名字段结构体，补齐 `id` 与 `extra` 字段并合并派生
pub(crate) fn prepare_struct(
    input: Item,
    cfg: &EntityAttrConfig,
    macro_name: &str,
    extra: &[(&str, &Type)],
) -> Result<ItemStruct> {
    let mut st = match input {
        Item::Struct(s) => s,
        other => {
            return Err(syn::Error::new(
                other.span(),
                format!("{macro_name} only on struct"),
            ));
        }
    };

    let fields_named = match &mut st.fields {
        syn::Fields::Named(f) => f,
        _ => {
            return Err(syn::Error::new(
                st.span(),
                "only supports named-field struct",
            ));
        }
    };

    let id_type = cfg.id_type();
    let mut required: Vec<(&str, &Type)> = vec![("id", &id_type)];
    required.extend_from_slice(extra);
    ensure_required_fields(fields_named, &required, /*reposition_existing*/ true);

    let mut derives: Vec<syn::Path> = vec![syn::parse_quote!(Clone)];
    if cfg.derive_debug.unwrap_or(true) {
        derives.insert(0, syn::parse_quote!(Debug));
    }
    apply_derives(&mut st.attrs, derives);

    Ok(st)
}

pub(crate) fn entity_impl(st: &ItemStruct, id_type: &Type) -> proc_macro2::TokenStream {
    let ident = &st.ident;
    let (impl_generics, ty_generics, where_clause) = st.generics.split_for_impl();

    quote! {
        impl #impl_generics ::ddd_domain::entity::Entity for #ident #ty_generics #where_clause {
            type Id = #id_type;

            fn id(&self) -> &Self::Id { &self.id }
        }
    }
}

// -------- parsing --------

pub(crate) struct EntityAttrConfig {
    id_ty: Option<Type>,
    derive_debug: Option<bool>,
}

impl EntityAttrConfig {
    pub(crate) fn id_type(&self) -> Type {
        self.id_ty
            .clone()
            .unwrap_or_else(|| syn::parse_quote! { String })
    }
}

impl Parse for EntityAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut id_ty: Option<Type> = None;
        let mut derive_debug: Option<bool> = None;

        let elems: Punctuated<EntityAttrElem, Token![,]> =
            Punctuated::<EntityAttrElem, Token![,]>::parse_terminated(input)?;

        for elem in elems.into_iter() {
            match elem {
                EntityAttrElem::Id(ty) => {
                    if id_ty.is_some() {
                        return Err(syn::Error::new(
                            ty.span(),
                            "duplicate key 'id' in attribute",
                        ));
                    }
                    id_ty = Some(*ty);
                }
                EntityAttrElem::Debug(b) => {
                    if derive_debug.is_some() {
                        return Err(syn::Error::new(
                            proc_macro2::Span::call_site(),
                            "duplicate key 'debug' in attribute",
                        ));
                    }
                    derive_debug = Some(b);
                }
            }
        }

        Ok(Self {
            id_ty,
            derive_debug,
        })
    }
}

enum EntityAttrElem {
    Id(Box<Type>),
    Debug(bool),
}

impl Parse for EntityAttrElem {
    fn parse(input: ParseStream) -> Result<Self> {
        let key: syn::Ident = input.parse()?;
        let _eq: Token![=] = input.parse()?;
        if key == "id" {
            let ty: Type = input.parse()?;
            Ok(EntityAttrElem::Id(Box::new(ty)))
        } else if key == "debug" {
            let lit: syn::LitBool = input.parse()?;
            Ok(EntityAttrElem::Debug(lit.value()))
        } else {
            Err(syn::Error::new(
                key.span(),
                "unknown key in attribute; expected 'id' or 'debug'",
            ))
        }
    }
}
