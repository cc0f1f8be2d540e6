// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Declaration AST nodes.

use crate::{NodeId, Span};
use crate::expr::Expr;
use crate::stmt::{Block, VarDeclarator};
use crate::token::Modifier;

/// A parsed compilation unit.
#[derive(Debug, Clone, Default)]
pub struct SyntaxTree {
    pub usings: Vec<UsingDirective>,
    pub members: Vec<Decl>,
}

/// `using A.B;`, `using X = A.B;` or `using static A.B;`
#[derive(Debug, Clone)]
pub struct UsingDirective {
    pub path: String,
    pub alias: Option<String>,
    pub is_static: bool,
    pub span: Span,
}

/// A declaration: namespace, type or type member.
#[derive(Debug, Clone)]
pub struct Decl {
    pub id: NodeId,
    pub kind: DeclKind,
    pub attributes: Vec<Attribute>,
    pub modifiers: Vec<Modifier>,
    pub span: Span,
}

/// The kind of declaration.
#[derive(Debug, Clone)]
pub enum DeclKind {
    /// Namespace block (`namespace A.B { ... }`)
    Namespace(NamespaceDecl),
    /// Class, struct, interface or enum
    Type(TypeDecl),
    /// Field declaration, possibly declaring several variables
    Field(FieldDecl),
    /// Method declaration
    Method(MethodDecl),
    /// Instance or static constructor
    Constructor(ConstructorDecl),
    /// User-defined operator or conversion
    Operator(OperatorDecl),
    /// Property with accessors or an expression body
    Property(PropertyDecl),
    /// Indexer (`T this [params] { ... }`)
    Indexer(IndexerDecl),
    /// Field-like event (`event T E;`)
    Event(EventDecl),
    /// Event with explicit `add`/`remove` accessors
    CustomEvent(CustomEventDecl),
    /// Enum member
    EnumMember(EnumMemberDecl),
}

#[derive(Debug, Clone)]
pub struct NamespaceDecl {
    pub name: String,
    pub usings: Vec<UsingDirective>,
    pub members: Vec<Decl>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
    Enum,
}

impl TypeKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            TypeKind::Class => "class",
            TypeKind::Struct => "struct",
            TypeKind::Interface => "interface",
            TypeKind::Enum => "enum",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub kind: TypeKind,
    pub name: String,
    pub type_params: Vec<String>,
    pub bases: Vec<String>,
    pub members: Vec<Decl>,
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub ty: String,
    pub vars: Vec<VarDeclarator>,
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub return_ty: String,
    pub name: String,
    pub type_params: Vec<String>,
    pub params: Vec<Param>,
    /// `None` for abstract, interface and extern methods
    pub body: Option<MemberBody>,
}

#[derive(Debug, Clone)]
pub struct ConstructorDecl {
    pub name: String,
    pub params: Vec<Param>,
    /// `: base (args)` or `: this (args)`
    pub initializer: Option<ConstructorInitializer>,
    pub body: Option<MemberBody>,
}

#[derive(Debug, Clone)]
pub struct ConstructorInitializer {
    pub is_base: bool,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub struct OperatorDecl {
    pub return_ty: String,
    /// Operator token text, or `implicit` / `explicit` for conversions
    pub symbol: String,
    pub params: Vec<Param>,
    pub body: Option<MemberBody>,
}

impl OperatorDecl {
    /// Metadata name of the operator method (`op_Addition`, `op_Implicit`, ...).
    pub fn metadata_name(&self) -> String {
        let unary = self.params.len() == 1;
        let name = match (self.symbol.as_str(), unary) {
            ("implicit", _) => "Implicit",
            ("explicit", _) => "Explicit",
            ("+", true) => "UnaryPlus",
            ("-", true) => "UnaryNegation",
            ("!", _) => "LogicalNot",
            ("~", _) => "OnesComplement",
            ("++", _) => "Increment",
            ("--", _) => "Decrement",
            ("true", _) => "True",
            ("false", _) => "False",
            ("+", false) => "Addition",
            ("-", false) => "Subtraction",
            ("*", _) => "Multiply",
            ("/", _) => "Division",
            ("%", _) => "Modulus",
            ("&", _) => "BitwiseAnd",
            ("|", _) => "BitwiseOr",
            ("^", _) => "ExclusiveOr",
            ("<<", _) => "LeftShift",
            (">>", _) => "RightShift",
            ("==", _) => "Equality",
            ("!=", _) => "Inequality",
            ("<", _) => "LessThan",
            (">", _) => "GreaterThan",
            ("<=", _) => "LessThanOrEqual",
            (">=", _) => "GreaterThanOrEqual",
            (other, _) => return format!("op_{}", other),
        };
        format!("op_{}", name)
    }
}

#[derive(Debug, Clone)]
pub struct PropertyDecl {
    pub ty: String,
    pub name: String,
    pub accessors: Vec<Accessor>,
    /// `T P => expr;`
    pub expr_body: Option<Expr>,
    /// `T P { get; set; } = expr;`
    pub init: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct IndexerDecl {
    pub ty: String,
    pub params: Vec<Param>,
    pub accessors: Vec<Accessor>,
    pub expr_body: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct EventDecl {
    pub ty: String,
    pub vars: Vec<VarDeclarator>,
}

#[derive(Debug, Clone)]
pub struct CustomEventDecl {
    pub ty: String,
    pub name: String,
    pub accessors: Vec<Accessor>,
}

#[derive(Debug, Clone)]
pub struct EnumMemberDecl {
    pub name: String,
    pub value: Option<Expr>,
}

/// A property, indexer or event accessor.
#[derive(Debug, Clone)]
pub struct Accessor {
    pub id: NodeId,
    pub kind: AccessorKind,
    pub attributes: Vec<Attribute>,
    pub modifiers: Vec<Modifier>,
    /// `None` for auto-implemented accessors (`get;`)
    pub body: Option<MemberBody>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorKind {
    Get,
    Set,
    Init,
    Add,
    Remove,
}

impl AccessorKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            AccessorKind::Get => "get",
            AccessorKind::Set => "set",
            AccessorKind::Init => "init",
            AccessorKind::Add => "add",
            AccessorKind::Remove => "remove",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "get" => Some(AccessorKind::Get),
            "set" => Some(AccessorKind::Set),
            "init" => Some(AccessorKind::Init),
            "add" => Some(AccessorKind::Add),
            "remove" => Some(AccessorKind::Remove),
            _ => None,
        }
    }
}

/// An attribute (`[Obsolete ("x")]`).
#[derive(Debug, Clone)]
pub struct Attribute {
    pub id: NodeId,
    /// `assembly`, `return`, ... when written as `[target: Name]`
    pub target: Option<String>,
    pub name: String,
    pub args: Vec<Expr>,
    pub span: Span,
}

/// A method or constructor parameter.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: String,
    pub modifier: Option<ParamModifier>,
    pub default: Option<Expr>,
    pub attributes: Vec<Attribute>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamModifier {
    Ref,
    Out,
    In,
    Params,
    This,
}

/// Body of a method-like member.
#[derive(Debug, Clone)]
pub enum MemberBody {
    Block(Block),
    Expr(Expr),
}

impl Decl {
    /// The declared name, if the declaration has exactly one.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            DeclKind::Namespace(ns) => Some(&ns.name),
            DeclKind::Type(ty) => Some(&ty.name),
            DeclKind::Method(m) => Some(&m.name),
            DeclKind::Constructor(c) => Some(&c.name),
            DeclKind::Property(p) => Some(&p.name),
            DeclKind::Indexer(_) => Some("this"),
            DeclKind::CustomEvent(e) => Some(&e.name),
            DeclKind::EnumMember(e) => Some(&e.name),
            DeclKind::Field(_) | DeclKind::Event(_) | DeclKind::Operator(_) => None,
        }
    }

    pub fn has_modifier(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }
}
