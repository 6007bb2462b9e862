// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Compilation-unit AST with symbol bindings.
//!
//! These types are the hand-off format between a compiler front-end and the
//! strata model builder. The front-end parses source files, resolves names,
//! and attaches a binding to every reference it could resolve. A binding of
//! `None` always means "the front-end tried and failed to resolve this".
//!
//! All node types derive `Serialize`/`Deserialize` so front-ends written in
//! other languages can hand over units as JSON.

use serde::{Deserialize, Serialize};

// ============================================================================
// Bindings
// ============================================================================

/// Kind of type a [`TypeBinding`] denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeBindingKind {
    Class,
    Interface,
    Enum,
    Annotation,
    Primitive,
    Array,
    TypeVariable,
}

/// Resolved reference to a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeBinding {
    /// Fully qualified name, e.g. `java.util.List` or `int`.
    pub qualified_name: String,
    pub kind: TypeBindingKind,
}

impl TypeBinding {
    /// Create a class binding.
    pub fn class(qualified_name: impl Into<String>) -> Self {
        TypeBinding {
            qualified_name: qualified_name.into(),
            kind: TypeBindingKind::Class,
        }
    }

    /// Create a primitive binding (`int`, `void`, ...).
    pub fn primitive(name: impl Into<String>) -> Self {
        TypeBinding {
            qualified_name: name.into(),
            kind: TypeBindingKind::Primitive,
        }
    }

    /// Create an array binding.
    pub fn array(qualified_name: impl Into<String>) -> Self {
        TypeBinding {
            qualified_name: qualified_name.into(),
            kind: TypeBindingKind::Array,
        }
    }

    /// Create a binding with an explicit kind.
    pub fn new(qualified_name: impl Into<String>, kind: TypeBindingKind) -> Self {
        TypeBinding {
            qualified_name: qualified_name.into(),
            kind,
        }
    }

    /// Primitive types carry no coupling weight.
    pub fn is_primitive(&self) -> bool {
        self.kind == TypeBindingKind::Primitive
    }

    /// Named class-like types (class, interface, enum, annotation).
    pub fn is_named_type(&self) -> bool {
        matches!(
            self.kind,
            TypeBindingKind::Class
                | TypeBindingKind::Interface
                | TypeBindingKind::Enum
                | TypeBindingKind::Annotation
        )
    }
}

/// Resolved reference to a method or constructor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodBinding {
    /// Qualified name of the class declaring the method.
    pub declaring_class: String,
    /// Simple method name (the class simple name for constructors).
    pub name: String,
    /// Parameter types in declaration order.
    #[serde(default)]
    pub parameter_types: Vec<TypeBinding>,
    /// Return type (`void` as a primitive for procedures and constructors).
    pub return_type: TypeBinding,
    #[serde(default)]
    pub is_constructor: bool,
}

impl MethodBinding {
    /// Signature used as the identity key within the declaring class:
    /// `name(T1,T2)` with qualified parameter type names.
    pub fn signature(&self) -> String {
        let params: Vec<&str> = self
            .parameter_types
            .iter()
            .map(|t| t.qualified_name.as_str())
            .collect();
        format!("{}({})", self.name, params.join(","))
    }

    /// Whether calling this method yields a value.
    pub fn returns_value(&self) -> bool {
        !(self.is_constructor
            || (self.return_type.is_primitive() && self.return_type.qualified_name == "void"))
    }
}

/// Kind of variable a [`VariableBinding`] denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Field,
    EnumConstant,
    Parameter,
    Local,
}

/// Resolved reference to a field, enum constant, parameter or local.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableBinding {
    pub name: String,
    pub kind: VariableKind,
    /// Declaring class for fields and enum constants. `None` for
    /// pseudo-fields such as an array's `length`.
    #[serde(default)]
    pub declaring_class: Option<String>,
    #[serde(default)]
    pub type_binding: Option<TypeBinding>,
    /// Front-end key distinguishing same-named locals within one method.
    /// Falls back to `name` when absent.
    #[serde(default)]
    pub key: Option<String>,
}

impl VariableBinding {
    /// Create a field binding.
    pub fn field(declaring_class: impl Into<String>, name: impl Into<String>) -> Self {
        VariableBinding {
            name: name.into(),
            kind: VariableKind::Field,
            declaring_class: Some(declaring_class.into()),
            type_binding: None,
            key: None,
        }
    }

    /// Create a parameter or local binding.
    pub fn local(name: impl Into<String>, kind: VariableKind) -> Self {
        VariableBinding {
            name: name.into(),
            kind,
            declaring_class: None,
            type_binding: None,
            key: None,
        }
    }

    /// The key identifying a local within its method.
    pub fn local_key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.name)
    }

    /// Field-like bindings (fields and enum constants).
    pub fn is_field_like(&self) -> bool {
        matches!(self.kind, VariableKind::Field | VariableKind::EnumConstant)
    }
}

// ============================================================================
// Declarations
// ============================================================================

/// A parsed source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilationUnit {
    /// Workspace-relative path of the source file.
    pub path: String,
    /// Declared package; `None` for the default package.
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub line_count: u32,
    #[serde(default)]
    pub types: Vec<TypeDecl>,
}

/// Declaration form of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Annotation,
    Anonymous,
    Local,
}

/// A class, interface, enum, annotation, anonymous or local class declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    /// Simple name; empty for anonymous classes.
    #[serde(default)]
    pub name: String,
    pub kind: TypeKind,
    #[serde(default)]
    pub binding: Option<TypeBinding>,
    #[serde(default)]
    pub superclass: Option<TypeRef>,
    #[serde(default)]
    pub interfaces: Vec<TypeRef>,
    #[serde(default)]
    pub members: Vec<Member>,
}

/// A member of a type declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "member", rename_all = "snake_case")]
pub enum Member {
    Field(FieldDecl),
    Method(MethodDecl),
    Initializer(Initializer),
    Type(TypeDecl),
}

/// A field or enum constant declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeRef,
    #[serde(default)]
    pub binding: Option<VariableBinding>,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub initializer: Option<Expr>,
}

/// Whether a callable is an ordinary method or a constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    #[default]
    Method,
    Constructor,
}

/// A method or constructor declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    #[serde(default)]
    pub kind: MethodKind,
    #[serde(default)]
    pub params: Vec<Param>,
    /// Declared return type; `None` for constructors.
    #[serde(default)]
    pub return_type: Option<TypeRef>,
    #[serde(default)]
    pub binding: Option<MethodBinding>,
    /// Body; `None` for abstract and interface methods.
    #[serde(default)]
    pub body: Option<Block>,
    #[serde(default)]
    pub is_static: bool,
}

/// An instance or static initializer block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Initializer {
    #[serde(default)]
    pub is_static: bool,
    pub body: Block,
}

/// A formal parameter (method, catch clause or lambda).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: TypeRef,
    #[serde(default)]
    pub binding: Option<VariableBinding>,
}

/// A mention of a type in source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRef {
    /// Spelling as written in source.
    pub name: String,
    #[serde(default)]
    pub binding: Option<TypeBinding>,
}

impl TypeRef {
    /// Create a resolved type reference.
    pub fn resolved(name: impl Into<String>, binding: TypeBinding) -> Self {
        TypeRef {
            name: name.into(),
            binding: Some(binding),
        }
    }

    /// Create an unresolved type reference.
    pub fn unresolved(name: impl Into<String>) -> Self {
        TypeRef {
            name: name.into(),
            binding: None,
        }
    }
}

// ============================================================================
// Statements
// ============================================================================

/// A brace-delimited statement list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub statements: Vec<Stmt>,
}

impl Block {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Block { statements }
    }
}

/// A local variable declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalDecl {
    pub name: String,
    pub ty: TypeRef,
    #[serde(default)]
    pub binding: Option<VariableBinding>,
    #[serde(default)]
    pub initializer: Option<Expr>,
}

/// One `case`/`default` group of a switch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    /// Case labels; empty for `default`.
    #[serde(default)]
    pub labels: Vec<Expr>,
    #[serde(default)]
    pub body: Vec<Stmt>,
}

/// A `catch` clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    pub param: Param,
    pub body: Block,
}

/// A statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stmt {
    Local(LocalDecl),
    Expr {
        expr: Expr,
    },
    Return {
        #[serde(default)]
        value: Option<Expr>,
    },
    If {
        cond: Expr,
        then_branch: Block,
        #[serde(default)]
        else_branch: Option<Block>,
    },
    While {
        cond: Expr,
        body: Block,
    },
    DoWhile {
        body: Block,
        cond: Expr,
    },
    For {
        #[serde(default)]
        init: Vec<Stmt>,
        #[serde(default)]
        cond: Option<Expr>,
        #[serde(default)]
        update: Vec<Expr>,
        body: Block,
    },
    ForEach {
        var: LocalDecl,
        iterable: Expr,
        body: Block,
    },
    Switch {
        selector: Expr,
        #[serde(default)]
        cases: Vec<SwitchCase>,
    },
    Try {
        body: Block,
        #[serde(default)]
        catches: Vec<CatchClause>,
        #[serde(default)]
        finally: Option<Block>,
    },
    Throw {
        expr: Expr,
    },
    Block {
        block: Block,
    },
    Break,
    Continue,
    Synchronized {
        lock: Expr,
        body: Block,
    },
    LocalClass {
        decl: TypeDecl,
    },
}

// ============================================================================
// Expressions
// ============================================================================

/// How a call was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    /// `foo()`, `obj.foo()`, `Type.foo()`.
    #[default]
    Ordinary,
    /// `super.foo()`.
    Super,
}

/// Which constructor an explicit constructor invocation delegates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructorTarget {
    This,
    Super,
}

/// An expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    Literal {
        text: String,
    },
    Name {
        name: String,
        #[serde(default)]
        binding: Option<VariableBinding>,
    },
    FieldAccess {
        #[serde(default)]
        target: Option<Box<Expr>>,
        name: String,
        #[serde(default)]
        binding: Option<VariableBinding>,
    },
    Call {
        #[serde(default)]
        target: Option<Box<Expr>>,
        name: String,
        #[serde(default)]
        args: Vec<Expr>,
        #[serde(default)]
        binding: Option<MethodBinding>,
        #[serde(default)]
        call_kind: CallKind,
    },
    ConstructorCall {
        target: ConstructorTarget,
        #[serde(default)]
        args: Vec<Expr>,
        #[serde(default)]
        binding: Option<MethodBinding>,
    },
    New {
        ty: TypeRef,
        #[serde(default)]
        args: Vec<Expr>,
        #[serde(default)]
        binding: Option<MethodBinding>,
        /// Anonymous class body.
        #[serde(default)]
        body: Option<Box<TypeDecl>>,
    },
    Assign {
        target: Box<Expr>,
        /// Compound operator (`+=` ...); `None` for plain `=`.
        #[serde(default)]
        op: Option<String>,
        value: Box<Expr>,
    },
    Binary {
        op: String,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: String,
        operand: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Cast {
        ty: TypeRef,
        expr: Box<Expr>,
    },
    InstanceOf {
        expr: Box<Expr>,
        ty: TypeRef,
    },
    ArrayAccess {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    ArrayNew {
        element: TypeRef,
        #[serde(default)]
        dims: Vec<Expr>,
        #[serde(default)]
        init: Vec<Expr>,
    },
    ClassLiteral {
        ty: TypeRef,
    },
    This,
    Lambda {
        #[serde(default)]
        params: Vec<Param>,
        body: Block,
    },
    /// A type used as a qualifier, e.g. `Math` in `Math.max(a, b)`.
    TypeName {
        ty: TypeRef,
    },
}

impl Expr {
    /// Create a resolved or unresolved simple name.
    pub fn name(name: impl Into<String>, binding: Option<VariableBinding>) -> Self {
        Expr::Name {
            name: name.into(),
            binding,
        }
    }

    /// Create an unqualified call.
    pub fn call(name: impl Into<String>, binding: Option<MethodBinding>, args: Vec<Expr>) -> Self {
        Expr::Call {
            target: None,
            name: name.into(),
            args,
            binding,
            call_kind: CallKind::Ordinary,
        }
    }

    /// Create a literal.
    pub fn literal(text: impl Into<String>) -> Self {
        Expr::Literal { text: text.into() }
    }
}
