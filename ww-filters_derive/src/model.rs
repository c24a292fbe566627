use proc_macro2 as pm2;

use crate::attributes::{infer_kind, FilterMeta};

pub fn derive_model(input: syn::DeriveInput) -> pm2::TokenStream {
    let syn::DeriveInput {
        ident,
        data,
        generics,
        ..
    } = input;

    let named = match crate::named_fields(&ident, data, "Model") {
        Ok(named) => named,
        Err(e) => return e.to_compile_error(),
    };

    let mut fields = pm2::TokenStream::new();
    for field in named.iter() {
        let fieldid = match field.ident.as_ref() {
            Some(id) => id,
            None => continue,
        };
        let meta = match FilterMeta::from_attrs(&field.attrs) {
            Ok(meta) => meta,
            Err(e) => return e.into_compile_error(),
        };
        if meta.excluded {
            continue;
        }

        let fieldname = meta
            .name
            .unwrap_or_else(|| syn::LitStr::new(&fieldid.to_string(), fieldid.span()));
        let (inferred, optional) = infer_kind(&field.ty);
        let kind = meta.kind.unwrap_or(inferred).to_tokens();
        let nullable = optional || meta.nullable;

        let mut descriptor = quote::quote! {
            ::ww_filters::schema::FieldDescriptor::new(#fieldname, #kind).nullable(#nullable)
        };
        if let Some(label) = meta.label {
            descriptor.extend(quote::quote! { .label(#label) });
        }
        if let Some(choices) = meta.choices {
            descriptor.extend(quote::quote! { .choices(#choices()) });
        }
        fields.extend(quote::quote! { #descriptor, });
    }

    let (generics, ty_generics, wc) = generics.split_for_impl();

    quote::quote! {
        const _: () = {
            #[automatically_derived]
            impl #generics ::ww_filters::schema::Model for #ident #ty_generics #wc {
                fn schema() -> ::ww_filters::schema::Schema {
                    ::ww_filters::schema::Schema::new(::std::vec![#fields])
                }
            }
        };
    }
}
