//! Entity graph: the hierarchical source model.
//!
//! This module provides the program data model:
//! - [`File`]: analyzed compilation units
//! - [`Package`]: named groups of classes (the default package has an empty name)
//! - [`Class`]: in-project or external classes, including nested, anonymous and local ones
//! - [`Method`]: callable members (methods, constructors, initializers)
//! - [`Field`]: fields and enum constants
//! - [`Local`]: parameters and local variables owned by a method
//!
//! Entities live in arenas inside [`Program`] and are addressed by typed ids.
//! Equality and hashing of handles are id-based: two handles denote the same
//! entity iff their ids are equal. Ownership (program → file → class →
//! method/field → local) is a tree; invocation, access, type-use and supertype
//! edges are plain id sets and may form cycles.

mod program;

pub use program::{Checkpoint, Program};

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::resolution::ResolutionStatus;

/// Qualified name of the synthetic class standing in for unresolvable types.
pub const UNKNOWN_CLASS_NAME: &str = "<unknown>";

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            pub fn new(id: u32) -> Self {
                $name(id)
            }

            pub(crate) fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "_{}"), self.0)
            }
        }
    };
}

entity_id!(
    /// Identifier of an analyzed file.
    FileId,
    "file"
);
entity_id!(
    /// Identifier of a package.
    PackageId,
    "pkg"
);
entity_id!(
    /// Identifier of a class.
    ClassId,
    "cls"
);
entity_id!(
    /// Identifier of a method, constructor or initializer.
    MethodId,
    "mth"
);
entity_id!(
    /// Identifier of a field.
    FieldId,
    "fld"
);
entity_id!(
    /// Identifier of a local variable or parameter.
    LocalId,
    "loc"
);

// ============================================================================
// Entities
// ============================================================================

/// Whether an entity was declared in the analyzed sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    InProject,
    External,
}

/// Declaration form of a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    Class,
    Interface,
    Enum,
    Annotation,
    Anonymous,
    Local,
    /// The synthetic placeholder for unresolvable and array types.
    Unknown,
}

/// An analyzed source file.
#[derive(Debug, Clone)]
pub struct File {
    pub id: FileId,
    pub path: String,
    pub package: PackageId,
    pub line_count: u32,
    /// Top-level classes declared in this file.
    pub classes: Vec<ClassId>,
}

/// A package and the classes declared in it.
#[derive(Debug, Clone)]
pub struct Package {
    pub id: PackageId,
    /// Dotted name; empty for the default package.
    pub name: String,
    /// `InProject` once any analyzed class is declared in it.
    pub origin: Origin,
    /// All classes of the package, nested ones included.
    pub classes: Vec<ClassId>,
}

impl Package {
    pub fn is_in_project(&self) -> bool {
        self.origin == Origin::InProject
    }

    /// Display name, `(default)` for the unnamed package.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "(default)"
        } else {
            &self.name
        }
    }
}

/// A class, interface, enum or annotation type.
#[derive(Debug, Clone)]
pub struct Class {
    pub id: ClassId,
    /// Simple name; empty for anonymous classes.
    pub name: String,
    pub qualified_name: String,
    pub kind: ClassKind,
    pub origin: Origin,
    /// Declaring file; `None` for external classes.
    pub file: Option<FileId>,
    pub package: PackageId,
    /// Lexically enclosing class for nested, anonymous and local classes.
    pub enclosing: Option<ClassId>,
    pub fields: Vec<FieldId>,
    pub methods: Vec<MethodId>,
    pub inner_classes: Vec<ClassId>,
    pub superclass: Option<ClassId>,
    pub interfaces: Vec<ClassId>,
    /// Named types mentioned by the class, excluding itself.
    pub type_uses: BTreeSet<ClassId>,
    pub type_use_status: ResolutionStatus,
    /// Set once the declaration has been fully visited; no members are added afterwards.
    pub sealed: bool,
}

impl Class {
    pub fn is_in_project(&self) -> bool {
        self.origin == Origin::InProject
    }
}

/// Kind of callable member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    Method,
    Constructor,
    Initializer,
    StaticInitializer,
}

impl MethodKind {
    /// Methods and constructors, as opposed to initializer blocks.
    pub fn is_declared_callable(self) -> bool {
        matches!(self, MethodKind::Method | MethodKind::Constructor)
    }
}

/// Size and complexity counts gathered from a method body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodStats {
    pub statements: u32,
    pub decision_points: u32,
    pub parameters: u32,
}

/// A method, constructor or initializer.
#[derive(Debug, Clone)]
pub struct Method {
    pub id: MethodId,
    pub name: String,
    /// Identity key within the declaring class, e.g. `run(int,java.lang.String)`.
    pub signature: String,
    pub kind: MethodKind,
    pub origin: Origin,
    pub declaring: ClassId,
    pub is_static: bool,
    /// Return type; `None` for primitives, constructors and initializers.
    pub return_type: Option<ClassId>,
    pub return_type_name: Option<String>,
    pub locals: Vec<LocalId>,
    pub invoked: BTreeSet<MethodId>,
    pub accessed: BTreeSet<VariableRef>,
    pub invocation_status: ResolutionStatus,
    pub access_status: ResolutionStatus,
    pub stats: MethodStats,
}

impl Method {
    pub fn is_in_project(&self) -> bool {
        self.origin == Origin::InProject
    }

    /// Combined status of the invocation and access collectors.
    pub fn resolution(&self) -> ResolutionStatus {
        self.invocation_status.merge(self.access_status)
    }
}

/// A field or enum constant.
#[derive(Debug, Clone)]
pub struct Field {
    pub id: FieldId,
    pub name: String,
    pub origin: Origin,
    pub declaring: ClassId,
    /// Declared type; `None` for primitive types.
    pub type_ref: Option<ClassId>,
    pub type_name: String,
    pub is_static: bool,
    /// Fields read or written by this field's initializer.
    pub accessed_fields: BTreeSet<FieldId>,
    pub status: ResolutionStatus,
}

impl Field {
    pub fn is_in_project(&self) -> bool {
        self.origin == Origin::InProject
    }
}

/// A parameter or local variable.
#[derive(Debug, Clone)]
pub struct Local {
    pub id: LocalId,
    pub name: String,
    pub method: MethodId,
    pub type_name: String,
    pub type_ref: Option<ClassId>,
    /// Formal parameter of the owning method.
    pub is_parameter: bool,
}

// ============================================================================
// Variable references
// ============================================================================

/// Role of a compiler-introduced dependence variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntheticKind {
    FormalIn,
    FormalOut,
    ActualIn,
    ActualOut,
}

/// Entity a synthetic variable belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntheticOwner {
    Class(ClassId),
    Method(MethodId),
    Field(FieldId),
}

/// A pseudo-variable modelling data or control dependence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SyntheticVariable {
    pub kind: SyntheticKind,
    /// Parameter or argument position; 0 for return values.
    pub slot: u32,
    pub owner: SyntheticOwner,
}

/// Target of a variable access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableRef {
    Field(FieldId),
    Local(LocalId),
    Synthetic(SyntheticVariable),
}

/// Classification of a [`VariableRef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessKind {
    Field,
    Local,
    Synthetic,
}

impl VariableRef {
    pub fn access_kind(&self) -> AccessKind {
        match self {
            VariableRef::Field(_) => AccessKind::Field,
            VariableRef::Local(_) => AccessKind::Local,
            VariableRef::Synthetic(_) => AccessKind::Synthetic,
        }
    }

    pub fn as_field(&self) -> Option<FieldId> {
        match self {
            VariableRef::Field(id) => Some(*id),
            _ => None,
        }
    }
}

// ============================================================================
// Entity references and stable keys
// ============================================================================

/// The five entity kinds metrics are defined over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Project,
    Package,
    Class,
    Method,
    Field,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Project,
        EntityKind::Package,
        EntityKind::Class,
        EntityKind::Method,
        EntityKind::Field,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Project => "project",
            EntityKind::Package => "package",
            EntityKind::Class => "class",
            EntityKind::Method => "method",
            EntityKind::Field => "field",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to any measurable entity of a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityRef {
    Project,
    Package(PackageId),
    Class(ClassId),
    Method(MethodId),
    Field(FieldId),
}

impl EntityRef {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::Project => EntityKind::Project,
            EntityRef::Package(_) => EntityKind::Package,
            EntityRef::Class(_) => EntityKind::Class,
            EntityRef::Method(_) => EntityKind::Method,
            EntityRef::Field(_) => EntityKind::Field,
        }
    }
}

/// Id-independent name of an entity, stable across runs and persistence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityKey {
    Project,
    Package { name: String },
    Class { name: String },
    Method { class: String, signature: String },
    Field { class: String, name: String },
}

impl EntityKey {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityKey::Project => EntityKind::Project,
            EntityKey::Package { .. } => EntityKind::Package,
            EntityKey::Class { .. } => EntityKind::Class,
            EntityKey::Method { .. } => EntityKind::Method,
            EntityKey::Field { .. } => EntityKind::Field,
        }
    }

    /// Parse the textual form produced by `Display`.
    ///
    /// `project`, `package:NAME`, `class:QNAME`, `method:QNAME#SIG`, `field:QNAME#NAME`.
    pub fn parse(text: &str) -> Option<EntityKey> {
        if text == "project" {
            return Some(EntityKey::Project);
        }
        let (kind, rest) = text.split_once(':')?;
        match kind {
            "package" => Some(EntityKey::Package {
                name: rest.to_string(),
            }),
            "class" => Some(EntityKey::Class {
                name: rest.to_string(),
            }),
            "method" => {
                let (class, signature) = rest.split_once('#')?;
                Some(EntityKey::Method {
                    class: class.to_string(),
                    signature: signature.to_string(),
                })
            }
            "field" => {
                let (class, name) = rest.split_once('#')?;
                Some(EntityKey::Field {
                    class: class.to_string(),
                    name: name.to_string(),
                })
            }
            _ => None,
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Project => f.write_str("project"),
            EntityKey::Package { name } => write!(f, "package:{}", name),
            EntityKey::Class { name } => write!(f, "class:{}", name),
            EntityKey::Method { class, signature } => write!(f, "method:{}#{}", class, signature),
            EntityKey::Field { class, name } => write!(f, "field:{}#{}", class, name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_display_uses_prefix() {
        assert_eq!(ClassId::new(3).to_string(), "cls_3");
        assert_eq!(MethodId::new(0).to_string(), "mth_0");
    }

    #[test]
    fn entity_key_text_round_trips() {
        let keys = [
            EntityKey::Project,
            EntityKey::Package {
                name: "p.q".to_string(),
            },
            EntityKey::Class {
                name: "p.A$1".to_string(),
            },
            EntityKey::Method {
                class: "p.A".to_string(),
                signature: "run(int,java.lang.String)".to_string(),
            },
            EntityKey::Field {
                class: "p.A".to_string(),
                name: "count".to_string(),
            },
        ];
        for key in keys {
            assert_eq!(EntityKey::parse(&key.to_string()), Some(key));
        }
    }

    #[test]
    fn entity_key_parse_rejects_garbage() {
        assert_eq!(EntityKey::parse("method:p.A"), None);
        assert_eq!(EntityKey::parse("widget:x"), None);
    }

    #[test]
    fn variable_ref_access_kind() {
        let synthetic = VariableRef::Synthetic(SyntheticVariable {
            kind: SyntheticKind::FormalIn,
            slot: 0,
            owner: SyntheticOwner::Method(MethodId::new(1)),
        });
        assert_eq!(synthetic.access_kind(), AccessKind::Synthetic);
        assert_eq!(VariableRef::Field(FieldId::new(2)).as_field(), Some(FieldId::new(2)));
        assert_eq!(VariableRef::Local(LocalId::new(2)).as_field(), None);
    }
}
