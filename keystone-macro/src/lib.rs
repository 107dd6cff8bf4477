use proc_macro::TokenStream;

mod controller;
mod http_methods;
mod injectable;
mod module;

/// Derive macro for making a struct injectable into the DI container
///
/// Every `Arc<T>` field is a dependency, resolved in declaration order. Other
/// fields start from `Default::default()`. `#[lifecycle(init, destroy)]`
/// registers the type's `OnModuleInit` / `OnModuleDestroy` implementations.
///
/// # Example
/// ```ignore
/// use keystone::prelude::*;
///
/// #[derive(Injectable)]
/// #[lifecycle(init)]
/// pub struct UserService {
///     repository: Arc<UserRepository>,
/// }
/// ```
#[proc_macro_derive(Injectable, attributes(lifecycle))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    injectable::derive_injectable(input)
}

/// Attribute macro for defining a controller with automatic DI registration
///
/// Pair it with `#[routes]` on the controller's impl block.
///
/// # Example
/// ```ignore
/// #[controller(path = "/users", tags("Users"), guards(AuthGuard))]
/// pub struct UserController {
///     user_service: Arc<UserService>,
/// }
/// ```
#[proc_macro_attribute]
pub fn controller(attr: TokenStream, item: TokenStream) -> TokenStream {
    controller::controller_attribute(attr, item)
}

/// Attribute macro for declaring the routes of a controller
///
/// # Example
/// ```ignore
/// #[routes]
/// impl UserController {
///     #[get(":id")]
///     #[use_guards(OwnerGuard)]
///     async fn find_one(&self, #[param("id")] id: u32) -> Result<Json<User>, HttpException> {
///         // ...
///     }
///
///     #[public]
///     #[post("")]
///     async fn create(&self, #[body(schema = user_schema())] user: NewUser) -> Result<Json<User>, HttpException> {
///         // ...
///     }
///
///     #[ws_message]
///     async fn on_message(&self, connection: WsConnection, message: WsMessage) {
///         // ...
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn routes(attr: TokenStream, item: TokenStream) -> TokenStream {
    controller::routes_attribute(attr, item)
}

/// Attribute macro for defining a module with providers and controllers
///
/// # Example
/// ```ignore
/// use keystone::module;
///
/// #[module(
///     imports = [DatabaseModule],
///     controllers = [UserController],
///     providers = [UserService, UserRepository],
///     exports = [UserService],
/// )]
/// pub struct UserModule;
/// ```
#[proc_macro_attribute]
pub fn module(attr: TokenStream, item: TokenStream) -> TokenStream {
    module::module_attribute(attr, item)
}

/// HTTP GET method attribute for controller methods
#[proc_macro_attribute]
pub fn get(attr: TokenStream, item: TokenStream) -> TokenStream {
    http_methods::http_method_attribute("GET", attr, item)
}

/// HTTP POST method attribute for controller methods
#[proc_macro_attribute]
pub fn post(attr: TokenStream, item: TokenStream) -> TokenStream {
    http_methods::http_method_attribute("POST", attr, item)
}

/// HTTP PUT method attribute for controller methods
#[proc_macro_attribute]
pub fn put(attr: TokenStream, item: TokenStream) -> TokenStream {
    http_methods::http_method_attribute("PUT", attr, item)
}

/// HTTP DELETE method attribute for controller methods
#[proc_macro_attribute]
pub fn delete(attr: TokenStream, item: TokenStream) -> TokenStream {
    http_methods::http_method_attribute("DELETE", attr, item)
}

/// HTTP PATCH method attribute for controller methods
#[proc_macro_attribute]
pub fn patch(attr: TokenStream, item: TokenStream) -> TokenStream {
    http_methods::http_method_attribute("PATCH", attr, item)
}
