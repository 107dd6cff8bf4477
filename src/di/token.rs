use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of a provider, controller, module or cross-cutting component.
///
/// A token is derived from the type itself, so two distinct types are always
/// two distinct tokens even when they look alike. There is no string or alias
/// based lookup.
#[derive(Clone, Copy)]
pub struct Token {
    id: TypeId,
    name: &'static str,
}

impl Token {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Fully qualified type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path, used in log lines.
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        base.rsplit("::").next().unwrap_or(base)
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({})", self.name)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}
