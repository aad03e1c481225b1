//! Symbol records and the scope arena shared by declaration collection and
//! lowering.
//!
//! Scopes live in one `Vec` and point at their parent by index; a symbol is
//! addressed by `(scope, slot)`. Lowering writes storage facts (offset, size,
//! dimensions, frame sizes) back into the records it looks up.

use crate::compiler::ast::TypeExpr;
use crate::compiler::span::Span;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ── Types ───────────────────────────────────────────────────────────

/// Declared type of a symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclaredType {
    Boolean,
    Integer,
    String,
    Void,
    Null,
    /// `element` with `rank` index levels; `element` is never an array
    Array { element: Box<DeclaredType>, rank: usize },
    Class(String),
    /// Nothing was written and nothing could be inferred
    Unknown,
}

impl DeclaredType {
    pub fn from_type_expr(ty: &TypeExpr) -> Self {
        match ty {
            TypeExpr::Boolean => DeclaredType::Boolean,
            TypeExpr::Integer => DeclaredType::Integer,
            TypeExpr::String => DeclaredType::String,
            TypeExpr::Void => DeclaredType::Void,
            TypeExpr::Named(name) => DeclaredType::Class(name.clone()),
            TypeExpr::Array(inner) => DeclaredType::from_type_expr(inner).array_of(1),
        }
    }

    /// This type wrapped in `levels` more array levels.
    pub fn array_of(self, levels: usize) -> Self {
        if levels == 0 {
            return self;
        }
        match self {
            DeclaredType::Array { element, rank } => DeclaredType::Array { element, rank: rank + levels },
            other => DeclaredType::Array { element: Box::new(other), rank: levels },
        }
    }

    /// The type produced by indexing once.
    pub fn indexed(&self) -> DeclaredType {
        match self {
            DeclaredType::Array { element, rank } if *rank > 1 => {
                DeclaredType::Array { element: element.clone(), rank: rank - 1 }
            }
            DeclaredType::Array { element, .. } => (**element).clone(),
            _ => DeclaredType::Unknown,
        }
    }

    /// The scalar element type of an array, or the type itself.
    pub fn element(&self) -> &DeclaredType {
        match self {
            DeclaredType::Array { element, .. } => element,
            other => other,
        }
    }

    /// Bytes of storage for one value of this type. References (strings,
    /// arrays, objects) take `pointer_size`; unknown and void types are
    /// sized as integers, so no storage is ever empty.
    pub fn size(&self, pointer_size: u32) -> u32 {
        match self {
            DeclaredType::Boolean => 1,
            DeclaredType::Integer | DeclaredType::Unknown | DeclaredType::Void => 4,
            DeclaredType::String
            | DeclaredType::Null
            | DeclaredType::Array { .. }
            | DeclaredType::Class(_) => pointer_size,
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclaredType::Boolean => write!(f, "boolean"),
            DeclaredType::Integer => write!(f, "integer"),
            DeclaredType::String => write!(f, "string"),
            DeclaredType::Void => write!(f, "void"),
            DeclaredType::Null => write!(f, "null"),
            DeclaredType::Array { element, rank } => write!(f, "{}{}", element, "[]".repeat(*rank)),
            DeclaredType::Class(name) => write!(f, "{}", name),
            DeclaredType::Unknown => write!(f, "?"),
        }
    }
}

// ── Symbols ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    Variable,
    Parameter,
    Function,
    Field,
    Class,
}

/// One named entity. Declaration collection fills the first block of
/// fields; lowering fills the storage block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub declared_type: DeclaredType,
    pub kind: SymbolKind,
    pub is_const: bool,
    /// Owning class for fields and methods
    pub enclosing_class: Option<String>,
    /// Scope holding a function's parameters and locals, or a class's members
    pub members: Option<ScopeId>,
    pub span: Span,

    /// Byte offset in the enclosing frame; assigned once
    pub offset: Option<u32>,
    pub size: u32,
    /// Array extents, outermost first
    pub dimensions: Vec<usize>,
    pub param_count: usize,
    pub local_frame_size: u32,
    /// Name used for this symbol in emitted instructions
    pub address: Option<String>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, declared_type: DeclaredType, kind: SymbolKind, span: Span) -> Self {
        Self {
            name: name.into(),
            declared_type,
            kind,
            is_const: false,
            enclosing_class: None,
            members: None,
            span,
            offset: None,
            size: 0,
            dimensions: Vec::new(),
            param_count: 0,
            local_frame_size: 0,
            address: None,
        }
    }

    pub fn with_class(mut self, class: Option<String>) -> Self {
        self.enclosing_class = class;
        self
    }

    pub fn with_members(mut self, scope: ScopeId) -> Self {
        self.members = Some(scope);
        self
    }

    pub fn is_callable(&self) -> bool {
        self.kind == SymbolKind::Function
    }

    /// Label a function or method is emitted under: `Class.method` for
    /// methods, the bare name otherwise.
    pub fn qualified_name(&self) -> String {
        match (&self.enclosing_class, self.kind) {
            (Some(class), SymbolKind::Function) => format!("{}.{}", class, self.name),
            _ => self.name.clone(),
        }
    }
}

// ── Scopes ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolId {
    pub scope: ScopeId,
    pub slot: usize,
}

/// Stable per-block key: where the block starts in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeKey {
    pub line: usize,
    pub col: usize,
}

impl ScopeKey {
    pub const GLOBAL: ScopeKey = ScopeKey { line: 0, col: 0 };

    pub fn of(span: Span) -> Self {
        Self { line: span.line, col: span.col }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeKind {
    Global,
    Block,
    Function,
    Class,
}

impl ScopeKind {
    /// Function and class scopes open a fresh storage frame.
    pub fn opens_frame(self) -> bool {
        matches!(self, ScopeKind::Function | ScopeKind::Class)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scope {
    pub key: ScopeKey,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    pub symbols: Vec<Symbol>,
    by_name: HashMap<String, usize>,
}

impl Scope {
    fn new(key: ScopeKey, kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Self { key, kind, parent, children: Vec::new(), symbols: Vec::new(), by_name: HashMap::new() }
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.by_name.get(name).map(|&slot| &self.symbols[slot])
    }
}

/// Arena of scopes; index 0 is the global scope.
#[derive(Debug, Clone, Serialize)]
pub struct ScopeTable {
    scopes: Vec<Scope>,
    #[serde(skip)]
    by_key: HashMap<ScopeKey, ScopeId>,
}

impl Default for ScopeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTable {
    pub fn new() -> Self {
        let mut by_key = HashMap::new();
        by_key.insert(ScopeKey::GLOBAL, ScopeId(0));
        Self { scopes: vec![Scope::new(ScopeKey::GLOBAL, ScopeKind::Global, None)], by_key }
    }

    pub fn global(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Open a child scope of `parent`. A key already in use yields
    /// `Err` with the scope that owns it.
    pub fn add_scope(&mut self, key: ScopeKey, kind: ScopeKind, parent: ScopeId) -> Result<ScopeId, ScopeId> {
        if let Some(&existing) = self.by_key.get(&key) {
            return Err(existing);
        }
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope::new(key, kind, Some(parent)));
        self.scopes[parent.0].children.push(id);
        self.by_key.insert(key, id);
        Ok(id)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn scope_for(&self, key: ScopeKey) -> Option<ScopeId> {
        self.by_key.get(&key).copied()
    }

    /// Declare `symbol` in `scope`. A name already declared there yields
    /// `Err` with the existing symbol.
    pub fn declare(&mut self, scope: ScopeId, symbol: Symbol) -> Result<SymbolId, SymbolId> {
        let target = &mut self.scopes[scope.0];
        if let Some(&slot) = target.by_name.get(&symbol.name) {
            return Err(SymbolId { scope, slot });
        }
        let slot = target.symbols.len();
        target.by_name.insert(symbol.name.clone(), slot);
        target.symbols.push(symbol);
        Ok(SymbolId { scope, slot })
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.scopes[id.scope.0].symbols[id.slot]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.scopes[id.scope.0].symbols[id.slot]
    }

    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        self.scopes[scope.0].by_name.get(name).map(|&slot| SymbolId { scope, slot })
    }

    /// Innermost declaration of `name` visible from `scope`.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(found) = self.lookup_local(id, name) {
                return Some(found);
            }
            current = self.scopes[id.0].parent;
        }
        None
    }

    /// Symbols stored in the frame owned by a function or class: its member
    /// scope plus nested block scopes, stopping at nested frames.
    pub fn frame_members(&self, owner: SymbolId) -> Vec<&Symbol> {
        let mut out = Vec::new();
        if let Some(root) = self.symbol(owner).members {
            let mut pending = vec![root];
            while let Some(id) = pending.pop() {
                let scope = &self.scopes[id.0];
                out.extend(scope.symbols.iter());
                pending.extend(
                    scope.children.iter().rev().filter(|c| !self.scopes[c.0].kind.opens_frame()).copied(),
                );
            }
        }
        out
    }

    /// A member of a function or class frame by name.
    pub fn member(&self, owner: SymbolId, name: &str) -> Option<&Symbol> {
        self.frame_members(owner).into_iter().find(|s| s.name == name)
    }

    /// All symbols in declaration order of their scopes.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.scopes.iter().flat_map(|s| s.symbols.iter())
    }
}
