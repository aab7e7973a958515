use std::fmt;

/// Stable identifier for a parsed type, keyed by its originating DIE offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub usize);

#[derive(Debug, Clone)]
pub enum TypeKind {
    Base {
        encoding: gimli::DwAte,
    },
    Pointer {
        pointee: Option<TypeId>,
    },
    Array {
        element: Option<TypeId>,
        count: Option<u64>,
    },
    Structure {
        members: Vec<Member>,
    },
    Enumeration,
    Typedef {
        target: Option<TypeId>,
    },
    Const {
        target: Option<TypeId>,
    },
    Unknown,
}

#[derive(Debug, Clone)]
pub struct Member {
    pub name: String,
    pub offset: u64,
    pub r#type: Option<TypeId>,
}

/// A parsed `DW_TAG_*_type` DIE: display name, size and structural kind.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub id: TypeId,
    pub name: Option<String>,
    pub byte_size: Option<u64>,
    pub kind: TypeKind,
}

impl TypeInfo {
    /// Strip one layer of `typedef`/`const` to the representational type,
    /// the shape a value evaluator or a UI type column wants to print.
    pub fn resolve<'a>(&'a self, table: &'a TypeTable) -> &'a TypeInfo {
        match &self.kind {
            TypeKind::Typedef { target: Some(t) } | TypeKind::Const { target: Some(t) } => {
                table.get(*t).map(|t| t.resolve(table)).unwrap_or(self)
            }
            _ => self,
        }
    }

    pub fn is_pointer(&self, table: &TypeTable) -> bool {
        matches!(self.resolve(table).kind, TypeKind::Pointer { .. })
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeKind::Pointer { .. } => write!(f, "{}*", self.name.as_deref().unwrap_or("void")),
            TypeKind::Array { count: Some(n), .. } => {
                write!(f, "{}[{n}]", self.name.as_deref().unwrap_or("?"))
            }
            _ => write!(f, "{}", self.name.as_deref().unwrap_or("<anonymous>")),
        }
    }
}

/// Per-module table of parsed types, indexed by `TypeId`. One table is
/// shared by every compilation unit in a `DwarfContainer` (spec §3,
/// `DwarfContainer.type table`).
#[derive(Debug, Default)]
pub struct TypeTable {
    types: Vec<TypeInfo>,
}

impl TypeTable {
    pub fn insert(&mut self, name: Option<String>, byte_size: Option<u64>, kind: TypeKind) -> TypeId {
        let id = TypeId(self.types.len());
        self.types.push(TypeInfo {
            id,
            name,
            byte_size,
            kind,
        });
        id
    }

    pub fn get(&self, id: TypeId) -> Option<&TypeInfo> {
        self.types.get(id.0)
    }
}
