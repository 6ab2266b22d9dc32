// Strongly-typed rendered-type IR. No string formatting here; see `emit`.

/// One rendered type expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Primitive(String),                      // spelling supplied by the primitive provider
    Named(String),                          // reference to a registered type
    Sequence(Box<TypeExpr>),
    Mapping(Box<TypeExpr>, Box<TypeExpr>),
    Optional(Box<TypeExpr>),                // T | Absent
    Record(Vec<(String, TypeExpr)>),        // stable schema field order
    TaggedUnion(Vec<(String, TypeExpr)>),   // one `{ Variant: T }` case per variant
    Intersected(Box<TypeExpr>),             // ergonomic read view of a union
    TagOnly,                                // zero-field marker
}

/// Which of the three views is being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Canonical,
    Ergonomic,
    Permissive,
}

/// The three structurally related views of one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeViews {
    pub canonical: TypeExpr,
    pub ergonomic: TypeExpr,
    pub permissive: TypeExpr,
}

/// Registered names for the three views of a named type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeNames {
    pub canonical: String,
    pub ergonomic: String,
    pub permissive: String,
}

impl TypeViews {
    /// All three views share one expression (primitives without a relaxed form, markers).
    pub fn uniform(expr: TypeExpr) -> Self {
        Self { canonical: expr.clone(), ergonomic: expr.clone(), permissive: expr }
    }

    pub fn get(&self, view: View) -> &TypeExpr {
        match view {
            View::Canonical => &self.canonical,
            View::Ergonomic => &self.ergonomic,
            View::Permissive => &self.permissive,
        }
    }

    /// Build each view independently from a per-view constructor.
    pub fn from_fn(mut f: impl FnMut(View) -> TypeExpr) -> Self {
        Self {
            canonical: f(View::Canonical),
            ergonomic: f(View::Ergonomic),
            permissive: f(View::Permissive),
        }
    }
}

impl TypeNames {
    /// Canonical uses the bare name, permissive appends `Like`, ergonomic prefixes `Ergo`.
    pub fn for_name(name: &str) -> Self {
        Self {
            canonical: name.to_string(),
            ergonomic: format!("Ergo{name}"),
            permissive: format!("{name}Like"),
        }
    }

    pub fn get(&self, view: View) -> &str {
        match view {
            View::Canonical => &self.canonical,
            View::Ergonomic => &self.ergonomic,
            View::Permissive => &self.permissive,
        }
    }

    pub fn as_refs(&self) -> TypeViews {
        TypeViews::from_fn(|view| TypeExpr::Named(self.get(view).to_string()))
    }
}
