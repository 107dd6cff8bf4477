mod builder;
mod component;
mod container;
mod injectable;
mod token;

pub use builder::ContainerBuilder;
pub use component::ComponentRef;
pub use container::{Container, ResolvedInstance};
pub use injectable::{Injectable, Instance, Provider};
pub use token::Token;
