use darling::util::Flag;
use darling::FromAttributes;
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Generics, Ident, Type};

/// `#[lifecycle(init, destroy)]`
#[derive(Debug, Default, FromAttributes)]
#[darling(attributes(lifecycle))]
pub(crate) struct LifecycleOpts {
    init: Flag,
    destroy: Flag,
}

pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => {
            return syn::Error::new_spanned(&input.ident, "#[derive(Injectable)] can only be applied to structs")
                .to_compile_error()
                .into()
        }
    };

    let lifecycle = match LifecycleOpts::from_attributes(&input.attrs) {
        Ok(lifecycle) => lifecycle,
        Err(e) => return e.write_errors().into(),
    };

    TokenStream::from(generate_injectable_impl(&input.ident, &input.generics, fields, &lifecycle))
}

/// `impl Injectable` resolving every `Arc<T>` field from the container.
/// Other fields start from `Default::default()`.
pub(crate) fn generate_injectable_impl(
    struct_name: &Ident,
    generics: &Generics,
    fields: &Fields,
    lifecycle: &LifecycleOpts,
) -> TokenStream2 {
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let dependencies: Vec<_> = fields
        .iter()
        .filter_map(|field| extract_injectable_type(&field.ty))
        .map(|ty| quote! { ::keystone::di::Token::of::<#ty>() })
        .collect();

    let values = fields.iter().map(|field| match extract_injectable_type(&field.ty) {
        Some(ty) => quote! { container.resolve::<#ty>()? },
        None => quote! { ::core::default::Default::default() },
    });

    let construct = match fields {
        Fields::Named(named) => {
            let names = named.named.iter().map(|field| &field.ident);
            quote! { Self { #(#names: #values),* } }
        }
        Fields::Unnamed(_) => quote! { Self(#(#values),*) },
        Fields::Unit => quote! { Self },
    };

    let mut hooks = quote! { ::keystone::lifecycle::LifecycleHooks::new() };
    if lifecycle.init.is_present() {
        hooks = quote! { #hooks.with_init() };
    }
    if lifecycle.destroy.is_present() {
        hooks = quote! { #hooks.with_destroy() };
    }

    quote! {
        impl #impl_generics ::keystone::di::Injectable for #struct_name #ty_generics #where_clause {
            fn dependencies() -> ::std::vec::Vec<::keystone::di::Token> {
                ::std::vec![#(#dependencies),*]
            }

            #[allow(unused_variables)]
            fn inject(container: &::keystone::di::Container) -> ::keystone::Result<Self> {
                ::std::result::Result::Ok(#construct)
            }

            fn lifecycle() -> ::keystone::lifecycle::LifecycleHooks<Self> {
                #hooks
            }
        }
    }
}

/// The `T` of an `Arc<T>` field.
fn extract_injectable_type(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Arc" {
        return None;
    }
    match &segment.arguments {
        syn::PathArguments::AngleBracketed(args) => match args.args.first()? {
            syn::GenericArgument::Type(inner_type) => Some(inner_type),
            _ => None,
        },
        _ => None,
    }
}
