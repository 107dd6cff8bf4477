use proc_macro::TokenStream;
use quote::quote;
use syn::parse_macro_input;

/// Route attributes are read and removed by `#[routes]`; outside of it they
/// leave the method untouched.
pub fn http_method_attribute(_method: &str, _attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as syn::ImplItemFn);

    TokenStream::from(quote! {
        #input
    })
}
