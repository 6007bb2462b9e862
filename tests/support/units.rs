//! Compilation-unit builders.
//!
//! Front-ends hand strata JSON; tests build the same nodes in code. Every
//! builder produces fully bound nodes unless its name says otherwise.

#![allow(dead_code)]

use strata::ast::{
    Block, CompilationUnit, Expr, FieldDecl, Member, MethodBinding, MethodDecl, MethodKind, Param,
    Stmt, TypeBinding, TypeDecl, TypeKind, TypeRef, VariableBinding, VariableKind,
};

pub fn void() -> TypeBinding {
    TypeBinding::primitive("void")
}

pub fn int() -> TypeRef {
    TypeRef::resolved("int", TypeBinding::primitive("int"))
}

/// A class `package.name` with the given members.
pub fn class(package: &str, name: &str, members: Vec<Member>) -> TypeDecl {
    TypeDecl {
        name: name.to_string(),
        kind: TypeKind::Class,
        binding: Some(TypeBinding::class(format!("{}.{}", package, name))),
        superclass: None,
        interfaces: vec![],
        members,
    }
}

/// Like [`class`] with a bound superclass.
pub fn subclass(package: &str, name: &str, superclass: &str, members: Vec<Member>) -> TypeDecl {
    let mut decl = class(package, name, members);
    decl.superclass = Some(TypeRef::resolved(superclass, TypeBinding::class(superclass)));
    decl
}

/// One unit holding `types`, named after the first type.
pub fn unit(package: &str, types: Vec<TypeDecl>) -> CompilationUnit {
    let first = types.first().map(|t| t.name.clone()).unwrap_or_default();
    CompilationUnit {
        path: format!("{}/{}.java", package.replace('.', "/"), first),
        package: Some(package.to_string()),
        line_count: 20,
        types,
    }
}

pub fn method_binding(class: &str, name: &str, params: &[TypeBinding]) -> MethodBinding {
    MethodBinding {
        declaring_class: class.to_string(),
        name: name.to_string(),
        parameter_types: params.to_vec(),
        return_type: void(),
        is_constructor: false,
    }
}

/// A `void` instance method of `class` with the given parameters and body.
pub fn method(class: &str, name: &str, params: Vec<Param>, body: Vec<Stmt>) -> Member {
    let types: Vec<TypeBinding> = params
        .iter()
        .filter_map(|p| p.ty.binding.clone())
        .collect();
    Member::Method(MethodDecl {
        name: name.to_string(),
        kind: MethodKind::Method,
        params,
        return_type: Some(TypeRef::resolved("void", void())),
        binding: Some(method_binding(class, name, &types)),
        body: Some(Block::new(body)),
        is_static: false,
    })
}

pub fn int_param(name: &str) -> Param {
    Param {
        name: name.to_string(),
        ty: int(),
        binding: Some(VariableBinding::local(name, VariableKind::Parameter)),
    }
}

/// An `int` field, optionally initialized.
pub fn field(class: &str, name: &str, initializer: Option<Expr>) -> Member {
    Member::Field(FieldDecl {
        name: name.to_string(),
        ty: int(),
        binding: Some(VariableBinding::field(class, name)),
        is_static: false,
        initializer,
    })
}

/// `target()` as a statement; `None` for a call the front-end could not bind.
pub fn call(target: Option<MethodBinding>) -> Stmt {
    let name = target
        .as_ref()
        .map(|b| b.name.clone())
        .unwrap_or_else(|| "undefined".to_string());
    Stmt::Expr {
        expr: Expr::call(name, target, vec![]),
    }
}

/// `new Class()` through the no-argument constructor of `class`.
pub fn construct(class: &str) -> Stmt {
    let simple = class.rsplit('.').next().unwrap_or(class);
    Stmt::Expr {
        expr: Expr::New {
            ty: TypeRef::resolved(simple, TypeBinding::class(class)),
            args: vec![],
            binding: Some(MethodBinding {
                is_constructor: true,
                ..method_binding(class, simple, &[])
            }),
            body: None,
        },
    }
}

/// A read of field `class.name`.
pub fn read_field(class: &str, name: &str) -> Expr {
    Expr::name(name, Some(VariableBinding::field(class, name)))
}

/// `if (cond) { then }` where `cond` reads a parameter.
pub fn if_param(param: &str, then: Vec<Stmt>) -> Stmt {
    Stmt::If {
        cond: Expr::name(param, Some(VariableBinding::local(param, VariableKind::Parameter))),
        then_branch: Block::new(then),
        else_branch: None,
    }
}

/// Two classes in package `shop`:
///
/// - `shop.A` with field `count`, method `first()` calling `shop.B.run()`
///   and method `second(int)` that branches but calls nothing
/// - `shop.B` with method `run()`
pub fn scenario() -> Vec<CompilationUnit> {
    let a = class(
        "shop",
        "A",
        vec![
            field("shop.A", "count", None),
            method(
                "shop.A",
                "first",
                vec![],
                vec![call(Some(method_binding("shop.B", "run", &[])))],
            ),
            method(
                "shop.A",
                "second",
                vec![int_param("n")],
                vec![if_param(
                    "n",
                    vec![Stmt::Expr {
                        expr: Expr::Assign {
                            target: Box::new(read_field("shop.A", "count")),
                            op: None,
                            value: Box::new(Expr::literal("0")),
                        },
                    }],
                )],
            ),
        ],
    );
    let b = class("shop", "B", vec![method("shop.B", "run", vec![], vec![])]);
    vec![unit("shop", vec![a]), unit("shop", vec![b])]
}
