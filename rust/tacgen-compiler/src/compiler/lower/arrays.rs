//! Array literal shapes and element stores.

use super::{LowerError, Lowerer};
use crate::compiler::ast::Expr;
use crate::compiler::span::Span;
use crate::compiler::symbols::{DeclaredType, SymbolId};
use crate::compiler::tac::Operand;
use crate::RaggedArrayPolicy;

/// Extents per depth, read from the first element at each level.
pub(crate) fn infer_dimensions(elements: &[Expr]) -> Vec<usize> {
    let mut dims = vec![elements.len()];
    let mut current = elements;
    while let Some(Expr::ArrayLit(inner, _)) = current.first() {
        dims.push(inner.len());
        current = inner;
    }
    dims
}

/// True when every nested literal has exactly the extents in `dims`.
pub(crate) fn conforms(elements: &[Expr], dims: &[usize]) -> bool {
    let Some((&extent, rest)) = dims.split_first() else {
        return false;
    };
    elements.len() == extent
        && elements.iter().all(|e| match e {
            Expr::ArrayLit(inner, _) => !rest.is_empty() && conforms(inner, rest),
            _ => rest.is_empty(),
        })
}

/// Longest row seen at each depth.
pub(crate) fn padded_dimensions(elements: &[Expr]) -> Vec<usize> {
    fn walk(elements: &[Expr], depth: usize, dims: &mut Vec<usize>) {
        if dims.len() <= depth {
            dims.push(0);
        }
        dims[depth] = dims[depth].max(elements.len());
        for e in elements {
            if let Expr::ArrayLit(inner, _) = e {
                walk(inner, depth + 1, dims);
            }
        }
    }
    let mut dims = Vec::new();
    walk(elements, 0, &mut dims);
    dims
}

/// The scalar literal at `position`, if the literal has one there.
pub(crate) fn element_at<'e>(elements: &'e [Expr], position: &[usize]) -> Option<&'e Expr> {
    let (&first, rest) = position.split_first()?;
    match (elements.get(first)?, rest.is_empty()) {
        (Expr::ArrayLit(..), true) => None,
        (scalar, true) => Some(scalar),
        (Expr::ArrayLit(inner, _), false) => element_at(inner, rest),
        (_, false) => None,
    }
}

/// Every index vector within `dims`, row-major.
pub(crate) fn positions(dims: &[usize]) -> Vec<Vec<usize>> {
    if dims.is_empty() || dims.contains(&0) {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut current = vec![0; dims.len()];
    loop {
        out.push(current.clone());
        let mut axis = dims.len();
        loop {
            if axis == 0 {
                return out;
            }
            axis -= 1;
            current[axis] += 1;
            if current[axis] < dims[axis] {
                break;
            }
            current[axis] = 0;
        }
    }
}

/// Size of one scalar leaf, from the declared element type or, failing
/// that, the first literal leaf.
fn leaf_size(element: &DeclaredType, elements: &[Expr], pointer_size: u32) -> u32 {
    if *element != DeclaredType::Unknown {
        return element.size(pointer_size);
    }
    let mut current = elements;
    while let Some(first) = current.first() {
        match first {
            Expr::ArrayLit(inner, _) => current = inner,
            Expr::BoolLit(..) => return 1,
            Expr::StringLit(..) | Expr::NullLit(_) | Expr::New(..) => return pointer_size,
            _ => return 4,
        }
    }
    4
}

fn zero_value(element: &DeclaredType) -> Operand {
    match element {
        DeclaredType::Integer | DeclaredType::Unknown => Operand::Int(0),
        DeclaredType::Boolean => Operand::Bool(false),
        DeclaredType::String => Operand::Str(String::new()),
        _ => Operand::Null,
    }
}

impl<'a> Lowerer<'a> {
    /// Shape of a literal under the configured ragged-array policy, or
    /// `None` after reporting a rejected literal.
    fn literal_shape(&mut self, name: &str, elements: &[Expr], span: Span) -> Option<Vec<usize>> {
        let dims = infer_dimensions(elements);
        if conforms(elements, &dims) {
            return Some(dims);
        }
        match self.options.ragged_arrays {
            RaggedArrayPolicy::ZeroPad => Some(padded_dimensions(elements)),
            RaggedArrayPolicy::Reject => {
                self.report(LowerError::RaggedArrayLiteral { name: name.to_string(), line: span.line });
                None
            }
        }
    }

    /// Declaration with an array literal initializer: records the extents,
    /// reserves header plus element storage, then stores every leaf.
    pub(super) fn lower_array_declaration(&mut self, id: SymbolId, elements: &[Expr], span: Span) {
        let (name, element) = {
            let symbol = self.symbol(id);
            (symbol.name.clone(), symbol.declared_type.element().clone())
        };
        let pointer_size = self.options.pointer_size;
        let Some(dims) = self.literal_shape(&name, elements, span) else {
            self.bind_storage(id, pointer_size);
            return;
        };
        let count: usize = dims.iter().product();
        let storage = pointer_size + count as u32 * leaf_size(&element, elements, pointer_size);
        self.scopes.symbol_mut(id).dimensions = dims.clone();
        self.bind_storage(id, storage);
        self.store_elements(Operand::var(name), elements, &dims, &element);
    }

    /// Assignment of an array literal to an existing array variable.
    pub(super) fn lower_array_assignment(&mut self, id: SymbolId, elements: &[Expr], span: Span) {
        let (name, element) = {
            let symbol = self.symbol(id);
            (symbol.name.clone(), symbol.declared_type.element().clone())
        };
        if let Some(dims) = self.literal_shape(&name, elements, span) {
            self.store_elements(Operand::var(name), elements, &dims, &element);
        }
    }

    /// An array literal used as a value. Every leaf is evaluated before the
    /// temp base is allocated, then stored into it.
    pub(super) fn lower_array_value(&mut self, elements: &[Expr], span: Span) -> Operand {
        let shape = self.literal_shape("<array literal>", elements, span);
        let values: Vec<_> = shape
            .map(|dims| positions(&dims))
            .unwrap_or_default()
            .into_iter()
            .map(|position| {
                let value = self.leaf_value(elements, &position, &DeclaredType::Unknown);
                (position, value)
            })
            .collect();
        let base: Operand = self.gen.new_temp().into();
        for (position, value) in values {
            self.store_element(&base, &position, value);
        }
        base
    }

    fn store_elements(&mut self, base: Operand, elements: &[Expr], dims: &[usize], element: &DeclaredType) {
        for position in positions(dims) {
            let value = self.leaf_value(elements, &position, element);
            self.store_element(&base, &position, value);
        }
    }

    /// The literal's leaf at `position`, or the element type's zero value
    /// where a padded literal has a gap.
    fn leaf_value(&mut self, elements: &[Expr], position: &[usize], element: &DeclaredType) -> Operand {
        match element_at(elements, position) {
            Some(leaf) => self.lower_rhs(leaf),
            None => self.copy_to_temp(zero_value(element)).into(),
        }
    }

    fn store_element(&mut self, base: &Operand, position: &[usize], value: Operand) {
        let indices = position.iter().map(|&i| Operand::Int(i as i64)).collect();
        let target = Operand::Element { base: Box::new(base.clone()), indices };
        self.emit_assign(target, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::builders::{array, int};

    #[test]
    fn dimensions_come_from_first_elements() {
        let lit = vec![array(vec![int(1), int(2), int(3)]), array(vec![int(4), int(5), int(6)])];
        assert_eq!(infer_dimensions(&lit), vec![2, 3]);
        assert!(conforms(&lit, &[2, 3]));
    }

    #[test]
    fn ragged_rows_do_not_conform() {
        let lit = vec![array(vec![int(1), int(2)]), array(vec![int(3)])];
        assert!(!conforms(&lit, &infer_dimensions(&lit)));
        assert_eq!(padded_dimensions(&lit), vec![2, 2]);
        assert!(element_at(&lit, &[1, 1]).is_none());
        assert!(element_at(&lit, &[1, 0]).is_some());
    }

    #[test]
    fn mixed_depth_does_not_conform() {
        let lit = vec![int(1), array(vec![int(2)])];
        assert!(!conforms(&lit, &infer_dimensions(&lit)));
    }

    #[test]
    fn positions_are_row_major() {
        assert_eq!(positions(&[2, 2]), vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]);
        assert_eq!(positions(&[3]), vec![vec![0], vec![1], vec![2]]);
        assert!(positions(&[0]).is_empty());
    }
}
