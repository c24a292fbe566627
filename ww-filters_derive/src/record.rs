use proc_macro2 as pm2;

use crate::attributes::FilterMeta;

pub fn derive_record(input: syn::DeriveInput) -> pm2::TokenStream {
    let syn::DeriveInput {
        ident,
        data,
        generics,
        ..
    } = input;

    let named = match crate::named_fields(&ident, data, "Record") {
        Ok(named) => named,
        Err(e) => return e.to_compile_error(),
    };

    let mut arms = pm2::TokenStream::new();
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
        arms.extend(quote::quote! {
            #fieldname => ::std::option::Option::Some(
                ::ww_filters::value::IntoValue::to_value(&self.#fieldid)
            ),
        });
    }

    let (generics, ty_generics, wc) = generics.split_for_impl();

    quote::quote! {
        const _: () = {
            #[automatically_derived]
            impl #generics ::ww_filters::query::Record for #ident #ty_generics #wc {
                fn value(&self, field: &str) -> ::std::option::Option<::ww_filters::value::Value> {
                    match field {
                        #arms
                        _ => ::std::option::Option::None,
                    }
                }
            }
        };
    }
}
