use crate::utils::type_ends_with;
use proc_macro::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Fields, LitStr, Result, parse_macro_input};

// 领域事件缓冲区与事件元信息不参与查询
const IMPLICITLY_SKIPPED: &[&str] = &["DomainEvents", "EventMeta"];

/// #[derive(FieldAccess)] 实现
/// - 为具名字段结构体生成 `::ddd_domain::specification::FieldAccess`
/// - 字段值经 `ToValue` 转换；`#[field(skip)]` 跳过，`#[field(rename = "...")]` 改名
pub(crate) fn expand(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let fields = match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(named) => named,
            _ => {
                return syn::Error::new(input.span(), "FieldAccess requires named fields")
                    .to_compile_error()
                    .into();
            }
        },
        _ => {
            return syn::Error::new(input.span(), "FieldAccess can only be derived for structs")
                .to_compile_error()
                .into();
        }
    };

    let mut arms = Vec::new();
    for field in &fields.named {
        let Some(ident) = &field.ident else { continue };
        let opts = match FieldOptions::from_attrs(&field.attrs) {
            Ok(opts) => opts,
            Err(err) => return err.to_compile_error().into(),
        };
        if opts.skip || IMPLICITLY_SKIPPED.iter().any(|n| type_ends_with(&field.ty, n)) {
            continue;
        }
        let name = opts
            .rename
            .unwrap_or_else(|| LitStr::new(&ident.to_string(), ident.span()));
        arms.push(quote! {
            #name => ::std::option::Option::Some(
                ::ddd_domain::specification::ToValue::to_value(&self.#ident)
            ),
        });
    }

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    TokenStream::from(quote! {
        impl #impl_generics ::ddd_domain::specification::FieldAccess for #ident #ty_generics #where_clause {
            fn field(&self, name: &str) -> ::std::option::Option<::ddd_domain::specification::Value> {
                match name {
                    #(#arms)*
                    _ => ::std::option::Option::None,
                }
            }
        }
    })
}

#[derive(Default)]
struct FieldOptions {
    skip: bool,
    rename: Option<LitStr>,
}

impl FieldOptions {
    fn from_attrs(attrs: &[syn::Attribute]) -> Result<Self> {
        let mut opts = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("field")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    opts.skip = true;
                    Ok(())
                } else if meta.path.is_ident("rename") {
                    opts.rename = Some(meta.value()?.parse()?);
                    Ok(())
                } else {
                    Err(meta.error("unknown field option; expected 'skip' or 'rename'"))
                }
            })?;
        }
        Ok(opts)
    }
}
