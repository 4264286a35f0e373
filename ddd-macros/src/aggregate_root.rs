use crate::entity::{EntityAttrConfig, entity_impl, prepare_struct};
use proc_macro::TokenStream;
use quote::quote;
use syn::{Item, Type, parse_macro_input};

/// #[aggregate_root] 宏实现
/// - 在 `#[entity]` 的基础上追加字段 `domain_events: ::ddd_domain::aggregate::DomainEvents`
/// - 同时实现 `Entity` 与 `::ddd_domain::aggregate::AggregateRoot`
/// - 参数与 `#[entity]` 相同：`#[aggregate_root(id = IdType, debug = true|false)]`
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as EntityAttrConfig);
    let input = parse_macro_input!(item as Item);

    let events_ty: Type = syn::parse_quote! { ::ddd_domain::aggregate::DomainEvents };
    let st = match prepare_struct(
        input,
        &cfg,
        "#[aggregate_root]",
        &[("domain_events", &events_ty)],
    ) {
        Ok(st) => st,
        Err(err) => return err.to_compile_error().into(),
    };

    let entity_impl = entity_impl(&st, &cfg.id_type());
    let ident = &st.ident;
    let (impl_generics, ty_generics, where_clause) = st.generics.split_for_impl();

    TokenStream::from(quote! {
        #st
        #entity_impl

        impl #impl_generics ::ddd_domain::aggregate::AggregateRoot for #ident #ty_generics #where_clause {
            fn domain_events(&self) -> &::ddd_domain::aggregate::DomainEvents {
                &self.domain_events
            }

            fn domain_events_mut(&mut self) -> &mut ::ddd_domain::aggregate::DomainEvents {
                &mut self.domain_events
            }
        }
    })
}
