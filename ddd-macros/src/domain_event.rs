use crate::utils::{apply_derives, ensure_required_fields};
use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Item, LitStr, Result, Token, Type, parse::Parse, parse::ParseStream, parse_macro_input};

/// #[domain_event] 宏实现
/// - 仅支持具名字段结构体
/// - 若缺失则在最前追加字段 `meta: ::ddd_domain::domain_event::EventMeta`（标识与发生时间）
/// - 合并派生：Debug, Clone
/// - 生成 `::ddd_domain::domain_event::DomainEvent` 实现
/// - 支持：`#[domain_event(name = "order.placed")]` 覆写事件类型名（默认取类型名）
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as EventAttrConfig);
    let input = parse_macro_input!(item as Item);

    let mut st = match input {
        Item::Struct(s) => s,
        other => {
            return syn::Error::new(
                other.span(),
                "#[domain_event] can only be used on struct types",
            )
            .to_compile_error()
            .into();
        }
    };

    let fields_named = match &mut st.fields {
        syn::Fields::Named(f) => f,
        _ => {
            return syn::Error::new(st.span(), "only supports named-field struct")
                .to_compile_error()
                .into();
        }
    };

    let meta_ty: Type = syn::parse_quote! { ::ddd_domain::domain_event::EventMeta };
    ensure_required_fields(
        fields_named,
        &[("meta", &meta_ty)],
        /*reposition_existing*/ false,
    );

    apply_derives(
        &mut st.attrs,
        vec![syn::parse_quote!(Debug), syn::parse_quote!(Clone)],
    );

    let ident = &st.ident;
    let (impl_generics, ty_generics, where_clause) = st.generics.split_for_impl();

    let event_type = cfg.name.map(|name| {
        quote! {
            fn event_type(&self) -> &'static str { #name }
        }
    });

    TokenStream::from(quote! {
        #st

        impl #impl_generics ::ddd_domain::domain_event::DomainEvent for #ident #ty_generics #where_clause {
            fn event_id(&self) -> ::ddd_domain::__private::uuid::Uuid {
                self.meta.event_id()
            }

            fn occurred_at(&self) -> ::ddd_domain::__private::chrono::DateTime<::ddd_domain::__private::chrono::Utc> {
                self.meta.occurred_at()
            }

            #event_type
        }
    })
}

// -------- parsing --------

struct EventAttrConfig {
    name: Option<LitStr>,
}

impl Parse for EventAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut name: Option<LitStr> = None;
        let pairs: Punctuated<EventAttrKv, Token![,]> =
            Punctuated::<EventAttrKv, Token![,]>::parse_terminated(input)?;

        for kv in pairs {
            if kv.key != "name" {
                return Err(syn::Error::new(
                    kv.key.span(),
                    "unknown key in attribute; expected 'name'",
                ));
            }
            if name.is_some() {
                return Err(syn::Error::new(
                    kv.key.span(),
                    "duplicate key 'name' in attribute",
                ));
            }
            name = Some(kv.value);
        }

        Ok(Self { name })
    }
}

struct EventAttrKv {
    key: syn::Ident,
    value: LitStr,
}

impl Parse for EventAttrKv {
    fn parse(input: ParseStream) -> Result<Self> {
        let key: syn::Ident = input.parse()?;
        let _eq: Token![=] = input.parse()?;
        let value: LitStr = input.parse()?;
        Ok(Self { key, value })
    }
}
