use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse::Parse, parse::ParseStream, parse_macro_input, Attribute, ItemStruct, Path, Token,
};

struct ModuleItem {
    attrs: Vec<Attribute>,
    path: Path,
}

impl Parse for ModuleItem {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let attrs = input.call(Attribute::parse_outer)?;
        let path = input.parse()?;
        Ok(ModuleItem { attrs, path })
    }
}

#[derive(Default)]
struct ModuleArgs {
    imports: Vec<ModuleItem>,
    controllers: Vec<ModuleItem>,
    providers: Vec<ModuleItem>,
    exports: Vec<ModuleItem>,
}

impl Parse for ModuleArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = ModuleArgs::default();

        while !input.is_empty() {
            let name: syn::Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            // Parse array: [Item1, Item2, ...]
            let content;
            syn::bracketed!(content in input);
            let items: Vec<ModuleItem> = content
                .parse_terminated(ModuleItem::parse, Token![,])?
                .into_iter()
                .collect();

            match name.to_string().as_str() {
                "imports" => args.imports = items,
                "controllers" => args.controllers = items,
                "providers" => args.providers = items,
                "exports" => args.exports = items,
                _ => {
                    return Err(syn::Error::new(
                        name.span(),
                        "expected one of: imports, controllers, providers, exports",
                    ))
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(args)
    }
}

pub fn module_attribute(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as ModuleArgs);
    let input = parse_macro_input!(item as ItemStruct);
    let expanded = generate_module_impl(&args, &input);

    TokenStream::from(expanded)
}

fn entries(items: &[ModuleItem], method: TokenStream2) -> impl Iterator<Item = TokenStream2> + '_ {
    items.iter().map(move |item| {
        let path = &item.path;
        let attrs = &item.attrs;
        quote! {
            #(#attrs)*
            let descriptor = descriptor.#method::<#path>();
        }
    })
}

fn generate_module_impl(args: &ModuleArgs, input: &ItemStruct) -> TokenStream2 {
    let module_name = &input.ident;
    let imports = entries(&args.imports, quote!(import));
    let controllers = entries(&args.controllers, quote!(controller));
    let providers = entries(&args.providers, quote!(provider));
    let exports = entries(&args.exports, quote!(export));

    quote! {
        #input

        impl ::keystone::module::Module for #module_name {
            fn descriptor() -> ::keystone::module::ModuleDescriptor {
                let descriptor = ::keystone::module::ModuleDescriptor::new();
                #(#imports)*
                #(#controllers)*
                #(#providers)*
                #(#exports)*
                descriptor
            }
        }
    }
}
