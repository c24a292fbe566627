use proc_macro::{self, TokenStream};

use proc_macro2 as pm2;

mod attributes;
mod model;
mod record;

/// Derive the `Model` trait, describing the fields of a struct so
/// that a default set of filters can be built for it.
///
/// This is only implemented for structs with named fields. All fields
/// are described, in declaration order, with a kind inferred from
/// their type: strings are text, integer types are integers, `f32`
/// and `f64` are floats, `bool` is boolean, `NaiveDate` is a date and
/// `NaiveDateTime` or `DateTime` a datetime. An `Option` field has the
/// kind of its contents, and is nullable. Fields of any other type
/// are described as `Other`, and get no filter. The annotations use
/// the `filter` attribute, which has the following options:
///
/// - `#[filter(rename="new_name")]` Describe the annotated member as
///   `new_name` instead of using its name in the source code.
///
/// - `#[filter(label="Date of birth")]` Use the given label as the
///   filter's title. By default the title is the field name, with
///   underscores replaced by spaces.
///
/// - `#[filter(exclude)]` Do not describe this field at all.
///
/// - `#[filter(nullable)]` The field may be blank even though its type
///   is not an `Option`.
///
/// - `#[filter(relation="User")]` The field refers to a row of
///   another entity, named `User`. Its filter offers a choice of
///   rows, which are supplied when building the filters.
///
/// - `#[filter(kind=decimal)]` Override the inferred kind, with one
///   of `text`, `integer`, `decimal`, `float`, `boolean`, `date`,
///   `datetime` or `other`.
///
/// - `#[filter(choices=my_crate::status_choices)]` The field takes one
///   of an enumerated set of values, returned as a `Vec<Choice>` by
///   the function `my_crate::status_choices`.
#[proc_macro_derive(Model, attributes(filter))]
pub fn model(input: TokenStream) -> TokenStream {
    let derive: syn::DeriveInput = syn::parse_macro_input!(input);

    let res: pm2::TokenStream = model::derive_model(derive);

    res.into()
}

/// Derive the `Record` trait, exposing field values to queries.
///
/// This is only implemented for structs with named fields. Every
/// field not marked `#[filter(exclude)]` must have a type which
/// implements `IntoValue`, and is looked up by its name, or the name
/// given with `#[filter(rename="new_name")]`.
#[proc_macro_derive(Record, attributes(filter))]
pub fn record(input: TokenStream) -> TokenStream {
    let derive: syn::DeriveInput = syn::parse_macro_input!(input);

    let res: pm2::TokenStream = record::derive_record(derive);

    res.into()
}

fn named_fields(
    ident: &syn::Ident,
    data: syn::Data,
    derive: &str,
) -> syn::Result<syn::punctuated::Punctuated<syn::Field, syn::Token![,]>> {
    if let syn::Data::Struct(s) = data {
        if let syn::Fields::Named(syn::FieldsNamed { named, .. }) = s.fields {
            return Ok(named);
        }
    }
    Err(syn::Error::new(
        ident.span(),
        format!("{} can only be derived for structs with named fields.", derive),
    ))
}
