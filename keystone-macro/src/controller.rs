use crate::injectable::{generate_injectable_impl, LifecycleOpts};
use darling::ast::NestedMeta;
use darling::util::{Flag, PathList};
use darling::{FromAttributes, FromMeta};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse::Parse, parse::ParseStream, parse_macro_input, punctuated::Punctuated, Attribute, Expr,
    FnArg, ImplItem, ImplItemFn, ItemImpl, ItemStruct, LitStr, Token,
};

const HTTP_METHODS: [&str; 5] = ["get", "post", "put", "patch", "delete"];
const METHOD_MARKERS: [&str; 4] = ["public", "use_guards", "use_interceptors", "use_filters"];
const PARAM_MARKERS: [&str; 6] = ["body", "param", "query", "headers", "current_user", "cookie"];
const WS_MARKERS: [&str; 4] = ["ws_open", "ws_message", "ws_close", "ws_drain"];

#[derive(Debug, Default)]
struct Tags(Vec<String>);

impl FromMeta for Tags {
    fn from_list(items: &[NestedMeta]) -> darling::Result<Self> {
        items
            .iter()
            .map(|item| match item {
                NestedMeta::Lit(syn::Lit::Str(tag)) => Ok(tag.value()),
                other => Err(darling::Error::custom("expected a string literal").with_span(other)),
            })
            .collect::<darling::Result<Vec<_>>>()
            .map(Tags)
    }
}

/// `#[controller(path = "/users", tags("Users"), guards(AuthGuard), public, websocket = "/ws")]`
#[derive(Debug, FromMeta)]
struct ControllerArgs {
    #[darling(default)]
    path: Option<String>,
    #[darling(default)]
    tags: Tags,
    #[darling(default)]
    guards: PathList,
    #[darling(default)]
    interceptors: PathList,
    #[darling(default)]
    filters: PathList,
    #[darling(default)]
    public: Flag,
    #[darling(default)]
    websocket: Option<String>,
}

pub fn controller_attribute(attr: TokenStream, item: TokenStream) -> TokenStream {
    let nested = match NestedMeta::parse_meta_list(attr.into()) {
        Ok(nested) => nested,
        Err(e) => return TokenStream::from(darling::Error::from(e).write_errors()),
    };
    let args = match ControllerArgs::from_list(&nested) {
        Ok(args) => args,
        Err(e) => return TokenStream::from(e.write_errors()),
    };
    let mut input = parse_macro_input!(item as ItemStruct);

    let lifecycle = match LifecycleOpts::from_attributes(&input.attrs) {
        Ok(lifecycle) => lifecycle,
        Err(e) => return TokenStream::from(e.write_errors()),
    };
    input.attrs.retain(|attr| !attr.path().is_ident("lifecycle"));

    TokenStream::from(generate_controller_impl(&args, &input, &lifecycle))
}

fn generate_controller_impl(args: &ControllerArgs, input: &ItemStruct, lifecycle: &LifecycleOpts) -> TokenStream2 {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let injectable_impl = generate_injectable_impl(struct_name, &input.generics, &input.fields, lifecycle);

    let path = args.path.as_deref().unwrap_or("/");
    let tags = &args.tags.0;
    let guards = args.guards.iter();
    let interceptors = args.interceptors.iter();
    let filters = args.filters.iter();
    let public = args.public.is_present().then(|| quote! { declaration.public(); });
    let websocket = args
        .websocket
        .as_ref()
        .map(|path| quote! { declaration.websocket(#path); });

    quote! {
        #input
        #injectable_impl

        impl #impl_generics #struct_name #ty_generics #where_clause {
            #[doc(hidden)]
            pub fn __keystone_declare_class(
                declaration: &mut ::keystone::controller::ControllerDeclaration<'_, Self>,
            ) {
                declaration.path(#path);
                #(declaration.tags([#tags]);)*
                #(declaration.guard::<#guards>();)*
                #(declaration.interceptor::<#interceptors>();)*
                #(declaration.filter::<#filters>();)*
                #public
                #websocket
            }
        }
    }
}

#[derive(Clone, Copy)]
enum ParamKind {
    Body,
    Param,
    Query,
    Headers,
    CurrentUser,
    Cookie,
    Unbound,
}

struct ParamInfo {
    kind: ParamKind,
    key: Option<LitStr>,
    schema: Option<Expr>,
}

/// `("key")` or `(schema = expr)`
#[derive(Default)]
struct ParamArgs {
    key: Option<LitStr>,
    schema: Option<Expr>,
}

impl Parse for ParamArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = ParamArgs::default();
        while !input.is_empty() {
            if input.peek(LitStr) {
                args.key = Some(input.parse()?);
            } else {
                let name: syn::Ident = input.parse()?;
                if name != "schema" {
                    return Err(syn::Error::new(name.span(), "expected a key string or `schema = ...`"));
                }
                input.parse::<Token![=]>()?;
                args.schema = Some(input.parse()?);
            }
            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }
        Ok(args)
    }
}

struct RouteInfo {
    method: syn::Ident,
    path: String,
    fn_name: syn::Ident,
    params: Vec<ParamInfo>,
    guards: Vec<syn::Path>,
    interceptors: Vec<syn::Path>,
    filters: Vec<syn::Path>,
    public: bool,
}

struct WsInfo {
    event: syn::Ident,
    fn_name: syn::Ident,
}

pub fn routes_attribute(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemImpl);
    match generate_routes_impl(input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(e) => TokenStream::from(e.to_compile_error()),
    }
}

fn generate_routes_impl(mut input: ItemImpl) -> syn::Result<TokenStream2> {
    let mut routes = Vec::new();
    let mut ws_handlers = Vec::new();

    for item in input.items.iter_mut() {
        let ImplItem::Fn(method) = item else {
            continue;
        };
        if let Some(route) = extract_route_info(method)? {
            routes.push(route);
        } else if let Some(event) = ws_event(&method.attrs) {
            ws_handlers.push(WsInfo {
                event,
                fn_name: method.sig.ident.clone(),
            });
        }
        strip_markers(method);
    }

    let route_registrations = routes.iter().map(generate_route_registration);
    let ws_registrations = ws_handlers.iter().map(|handler| {
        let event = &handler.event;
        let fn_name = &handler.fn_name;
        let name = fn_name.to_string();
        if event == "ws_message" {
            quote! {
                declaration.#event(#name, |controller: ::std::sync::Arc<Self>, connection, message| async move {
                    controller.#fn_name(connection, message).await
                });
            }
        } else {
            quote! {
                declaration.#event(#name, |controller: ::std::sync::Arc<Self>, connection| async move {
                    controller.#fn_name(connection).await
                });
            }
        }
    });

    let self_ty = &input.self_ty;
    let (impl_generics, _, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        #input

        impl #impl_generics ::keystone::controller::Controller for #self_ty #where_clause {
            fn declare(declaration: &mut ::keystone::controller::ControllerDeclaration<'_, Self>) {
                Self::__keystone_declare_class(declaration);
                #(#route_registrations)*
                #(#ws_registrations)*
            }
        }
    })
}

fn generate_route_registration(route: &RouteInfo) -> TokenStream2 {
    let method = &route.method;
    let path = &route.path;
    let fn_name = &route.fn_name;
    let name = fn_name.to_string();

    let bindings = route
        .params
        .iter()
        .enumerate()
        .filter_map(|(index, param)| {
            let source = match param.kind {
                ParamKind::Body => quote!(Body),
                ParamKind::Param => quote!(Param),
                ParamKind::Query => quote!(Query),
                ParamKind::Headers => quote!(Headers),
                ParamKind::CurrentUser => quote!(CurrentUser),
                ParamKind::Cookie => quote!(Cookie),
                ParamKind::Unbound => return None,
            };
            let key = param.key.as_ref().map(|key| quote! { .with_key(#key) });
            let schema = param.schema.as_ref().map(|schema| quote! { .with_schema(#schema) });
            Some(quote! {
                .param(
                    ::keystone::controller::ParamBinding::new(#index, ::keystone::controller::ParamSource::#source)
                        #key
                        #schema
                )
            })
        });

    let guards = &route.guards;
    let interceptors = &route.interceptors;
    let filters = &route.filters;
    let public = route.public.then(|| quote! { .public() });

    let args: Vec<_> = (0..route.params.len()).map(|i| format_ident!("__arg_{}", i)).collect();
    let indices = 0..route.params.len();
    let arguments = if args.is_empty() {
        quote!(_arguments)
    } else {
        quote!(mut arguments)
    };

    quote! {
        declaration.route(
            ::keystone::controller::Route::#method(#path, #name)
                #(#bindings)*
                #(.guard::<#guards>())*
                #(.interceptor::<#interceptors>())*
                #(.filter::<#filters>())*
                #public,
            |controller: ::std::sync::Arc<Self>, #arguments: ::keystone::controller::Arguments| async move {
                #(
                    let #args = match arguments.take(#indices) {
                        ::std::result::Result::Ok(value) => value,
                        ::std::result::Result::Err(error) => return ::keystone::HandlerResult::Err(error),
                    };
                )*
                ::keystone::controller::respond(controller.#fn_name(#(#args),*).await)
            },
        );
    }
}

fn extract_route_info(method: &ImplItemFn) -> syn::Result<Option<RouteInfo>> {
    let mut http_method = None;
    let mut path = String::new();
    let mut guards = Vec::new();
    let mut interceptors = Vec::new();
    let mut filters = Vec::new();
    let mut public = false;

    for attr in &method.attrs {
        let Some(ident) = attr.path().get_ident() else {
            continue;
        };
        let name = ident.to_string();
        if HTTP_METHODS.contains(&name.as_str()) {
            http_method = Some(ident.clone());
            if let syn::Meta::List(_) = &attr.meta {
                path = attr.parse_args::<LitStr>()?.value();
            }
        } else if name == "public" {
            public = true;
        } else if name == "use_guards" {
            guards.extend(parse_path_list(attr)?);
        } else if name == "use_interceptors" {
            interceptors.extend(parse_path_list(attr)?);
        } else if name == "use_filters" {
            filters.extend(parse_path_list(attr)?);
        }
    }
    let Some(http_method) = http_method else {
        return Ok(None);
    };

    let params = method
        .sig
        .inputs
        .iter()
        .filter_map(|input| match input {
            FnArg::Typed(pat_type) => Some(get_param_info(&pat_type.attrs)),
            FnArg::Receiver(_) => None,
        })
        .collect::<syn::Result<Vec<_>>>()?;

    Ok(Some(RouteInfo {
        method: http_method,
        path,
        fn_name: method.sig.ident.clone(),
        params,
        guards,
        interceptors,
        filters,
        public,
    }))
}

fn parse_path_list(attr: &Attribute) -> syn::Result<Vec<syn::Path>> {
    let paths = attr.parse_args_with(Punctuated::<syn::Path, Token![,]>::parse_terminated)?;
    Ok(paths.into_iter().collect())
}

fn get_param_info(attrs: &[Attribute]) -> syn::Result<ParamInfo> {
    for attr in attrs {
        let Some(ident) = attr.path().get_ident() else {
            continue;
        };
        let kind = match ident.to_string().as_str() {
            "body" => ParamKind::Body,
            "param" => ParamKind::Param,
            "query" => ParamKind::Query,
            "headers" => ParamKind::Headers,
            "current_user" => ParamKind::CurrentUser,
            "cookie" => ParamKind::Cookie,
            _ => continue,
        };
        let args = match &attr.meta {
            syn::Meta::List(_) => attr.parse_args::<ParamArgs>()?,
            _ => ParamArgs::default(),
        };
        return Ok(ParamInfo {
            kind,
            key: args.key,
            schema: args.schema,
        });
    }
    Ok(ParamInfo {
        kind: ParamKind::Unbound,
        key: None,
        schema: None,
    })
}

fn ws_event(attrs: &[Attribute]) -> Option<syn::Ident> {
    attrs
        .iter()
        .filter_map(|attr| attr.path().get_ident())
        .find(|ident| WS_MARKERS.contains(&ident.to_string().as_str()))
        .cloned()
}

fn is_marker(attr: &Attribute, markers: &[&str]) -> bool {
    attr.path()
        .get_ident()
        .is_some_and(|ident| markers.contains(&ident.to_string().as_str()))
}

fn strip_markers(method: &mut ImplItemFn) {
    method.attrs.retain(|attr| {
        !is_marker(attr, &HTTP_METHODS) && !is_marker(attr, &METHOD_MARKERS) && !is_marker(attr, &WS_MARKERS)
    });
    for input in method.sig.inputs.iter_mut() {
        if let FnArg::Typed(pat_type) = input {
            pat_type.attrs.retain(|attr| !is_marker(attr, &PARAM_MARKERS));
        }
    }
}
