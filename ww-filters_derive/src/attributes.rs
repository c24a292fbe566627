use syn::ext::IdentExt;

#[derive(Debug, Clone)]
pub enum FilterKind {
    Text,
    Integer,
    Decimal,
    Float,
    Boolean,
    Date,
    DateTime,
    Relation(syn::LitStr),
    Other,
}

impl FilterKind {
    fn from_ident(ident: &syn::Ident) -> syn::Result<Self> {
        Ok(match ident.to_string().as_str() {
            "text" => FilterKind::Text,
            "integer" => FilterKind::Integer,
            "decimal" => FilterKind::Decimal,
            "float" => FilterKind::Float,
            "boolean" => FilterKind::Boolean,
            "date" => FilterKind::Date,
            "datetime" => FilterKind::DateTime,
            "other" => FilterKind::Other,
            _ => {
                return Err(syn::Error::new_spanned(
                    ident,
                    "unknown field kind, expected one of text, integer, decimal, float, boolean, date, datetime, other",
                ))
            }
        })
    }

    pub fn to_tokens(&self) -> proc_macro2::TokenStream {
        match self {
            FilterKind::Text => quote::quote! { ::ww_filters::schema::FieldKind::Text },
            FilterKind::Integer => quote::quote! { ::ww_filters::schema::FieldKind::Integer },
            FilterKind::Decimal => quote::quote! { ::ww_filters::schema::FieldKind::Decimal },
            FilterKind::Float => quote::quote! { ::ww_filters::schema::FieldKind::Float },
            FilterKind::Boolean => quote::quote! { ::ww_filters::schema::FieldKind::Boolean },
            FilterKind::Date => quote::quote! { ::ww_filters::schema::FieldKind::Date },
            FilterKind::DateTime => quote::quote! { ::ww_filters::schema::FieldKind::DateTime },
            FilterKind::Relation(target) => quote::quote! {
                ::ww_filters::schema::FieldKind::Relation { target: ::std::string::String::from(#target) }
            },
            FilterKind::Other => quote::quote! { ::ww_filters::schema::FieldKind::Other },
        }
    }
}

#[derive(Debug)]
pub enum FilterItem {
    Rename(syn::LitStr),
    Label(syn::LitStr),
    Excluded,
    Nullable,
    Relation(syn::LitStr),
    Kind(FilterKind),
    Choices(syn::Path),
}

impl syn::parse::Parse for FilterItem {
    fn parse(input: syn::parse::ParseStream<'_>) -> syn::Result<Self> {
        let attr = input.call(syn::Ident::parse_any)?;
        match attr.to_string().as_str() {
            "rename" => {
                // rename = "other_name"
                let _: syn::Token![=] = input.parse()?;
                Ok(FilterItem::Rename(input.parse()?))
            }
            "label" => {
                let _: syn::Token![=] = input.parse()?;
                Ok(FilterItem::Label(input.parse()?))
            }
            "exclude" => Ok(FilterItem::Excluded),
            "nullable" => Ok(FilterItem::Nullable),
            "relation" => {
                // relation = "User"
                let _: syn::Token![=] = input.parse()?;
                Ok(FilterItem::Relation(input.parse()?))
            }
            "kind" => {
                let _: syn::Token![=] = input.parse()?;
                let kind = input.call(syn::Ident::parse_any)?;
                Ok(FilterItem::Kind(FilterKind::from_ident(&kind)?))
            }
            "choices" => {
                // choices = my_crate::status_choices
                let _: syn::Token![=] = input.parse()?;
                Ok(FilterItem::Choices(input.call(syn::Path::parse_mod_style)?))
            }
            _ => Err(syn::Error::new_spanned(attr, "unsupported filter attribute")),
        }
    }
}

#[derive(Debug, Default)]
pub struct FilterMeta {
    pub name: Option<syn::LitStr>,
    pub label: Option<syn::LitStr>,
    pub excluded: bool,
    pub nullable: bool,
    pub kind: Option<FilterKind>,
    pub choices: Option<syn::Path>,
}

impl syn::parse::Parse for FilterMeta {
    fn parse(input: syn::parse::ParseStream<'_>) -> syn::Result<Self> {
        let punc =
            syn::punctuated::Punctuated::<FilterItem, syn::Token![,]>::parse_terminated(input)?;
        let mut meta = FilterMeta::default();
        for item in punc {
            match item {
                FilterItem::Rename(name) => meta.name = Some(name),
                FilterItem::Label(label) => meta.label = Some(label),
                FilterItem::Excluded => meta.excluded = true,
                FilterItem::Nullable => meta.nullable = true,
                FilterItem::Relation(target) => meta.kind = Some(FilterKind::Relation(target)),
                FilterItem::Kind(kind) => meta.kind = Some(kind),
                FilterItem::Choices(path) => meta.choices = Some(path),
            }
        }
        Ok(meta)
    }
}

impl FilterMeta {
    /// Merge all `#[filter(...)]` attributes on a field.
    pub fn from_attrs(attrs: &[syn::Attribute]) -> syn::Result<Self> {
        let mut meta = FilterMeta::default();
        for attr in attrs.iter() {
            if attr.path.is_ident("filter") {
                let parsed = attr.parse_args::<FilterMeta>()?;
                meta.name = parsed.name.or(meta.name);
                meta.label = parsed.label.or(meta.label);
                meta.excluded |= parsed.excluded;
                meta.nullable |= parsed.nullable;
                meta.kind = parsed.kind.or(meta.kind);
                meta.choices = parsed.choices.or(meta.choices);
            }
        }
        Ok(meta)
    }
}

/// Infer the kind of a field from its type, and whether it is an
/// [`Option`].
pub fn infer_kind(ty: &syn::Type) -> (FilterKind, bool) {
    match ty {
        syn::Type::Reference(r) => infer_kind(&r.elem),
        syn::Type::Group(g) => infer_kind(&g.elem),
        syn::Type::Paren(p) => infer_kind(&p.elem),
        syn::Type::Path(p) => {
            let segment = match p.path.segments.last() {
                Some(segment) => segment,
                None => return (FilterKind::Other, false),
            };
            let kind = match segment.ident.to_string().as_str() {
                "Option" => {
                    if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                        if let Some(syn::GenericArgument::Type(inner)) = args.args.first() {
                            let (kind, _) = infer_kind(inner);
                            return (kind, true);
                        }
                    }
                    FilterKind::Other
                }
                "String" | "str" => FilterKind::Text,
                "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32" | "u64"
                | "usize" => FilterKind::Integer,
                "f32" | "f64" => FilterKind::Float,
                "bool" => FilterKind::Boolean,
                "NaiveDate" => FilterKind::Date,
                "NaiveDateTime" | "DateTime" => FilterKind::DateTime,
                _ => FilterKind::Other,
            };
            (kind, false)
        }
        _ => (FilterKind::Other, false),
    }
}
