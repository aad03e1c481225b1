//! Expression lowering. Every expression yields the operand holding its
//! value; sub-expressions are always lowered in value context.

use super::Lowerer;
use crate::compiler::ast::*;
use crate::compiler::span::Span;
use crate::compiler::symbols::{DeclaredType, SymbolKind};
use crate::compiler::tac::{Instruction, Operand, RelOp};

impl<'a> Lowerer<'a> {
    /// Lower `expr` in value context.
    pub(super) fn lower_value(&mut self, expr: &Expr) -> Operand {
        let prev = self.gen.set_expecting_value(true);
        let value = self.lower_expr(expr);
        self.gen.set_expecting_value(prev);
        value
    }

    /// Lower the right-hand side of a store. A bare name is copied into a
    /// temp first so the store never aliases its source directly.
    pub(super) fn lower_rhs(&mut self, expr: &Expr) -> Operand {
        match self.lower_value(expr) {
            value @ Operand::Var(_) => self.copy_to_temp(value).into(),
            value => value,
        }
    }

    pub(super) fn lower_expr(&mut self, expr: &Expr) -> Operand {
        match expr {
            Expr::IntLit(n, _) => self.copy_to_temp(Operand::Int(*n)).into(),
            Expr::StringLit(s, _) => self.copy_to_temp(Operand::Str(s.clone())).into(),
            Expr::BoolLit(b, _) => self.copy_to_temp(Operand::Bool(*b)).into(),
            Expr::NullLit(_) => self.copy_to_temp(Operand::Null).into(),
            Expr::Ident(name, span) => self.name_operand(name, *span),
            Expr::This(_) => Operand::var("this"),
            Expr::ArrayLit(elems, span) => self.lower_array_value(elems, *span),
            Expr::BinOp(lhs, op, rhs, _) => {
                let left = self.lower_value(lhs);
                let right = self.lower_value(rhs);
                let result = self.gen.new_temp();
                self.gen.emit(Instruction::BinaryOp { result: result.into(), left, op: *op, right });
                result.into()
            }
            Expr::UnaryOp(op, inner, _) => {
                let arg = self.lower_value(inner);
                let result = self.gen.new_temp();
                self.gen.emit(Instruction::UnaryOp { result: result.into(), op: *op, arg });
                result.into()
            }
            Expr::Logical(lhs, op, rhs, _) => self.lower_short_circuit(lhs, *op, rhs),
            Expr::Ternary(cond, then_value, else_value, _) => self.lower_ternary(cond, then_value, else_value),
            Expr::Call(callee, args, span) => self.lower_call(callee, args, *span),
            Expr::New(class, args, _) => {
                let params = self.lower_args(args);
                let result = self.gen.new_temp();
                self.gen.emit(Instruction::New { result: result.into(), class: class.clone(), params });
                result.into()
            }
            Expr::Index(base, idx, _) => {
                let base = self.lower_value(base);
                let index = self.lower_value(idx);
                let index = self.ensure_temp(index);
                let result = self.gen.new_temp();
                let element = Operand::Element { base: Box::new(base), indices: vec![index] };
                self.emit_assign(result.into(), element);
                result.into()
            }
            Expr::Property(object, field, _) => {
                let base = self.lower_value(object);
                let result = self.gen.new_temp();
                self.emit_assign(result.into(), Operand::Field { base: Box::new(base), field: field.clone() });
                result.into()
            }
        }
    }

    /// Storage name of `name`; an unknown name is reported and used as is.
    fn name_operand(&mut self, name: &str, span: Span) -> Operand {
        match self.lookup(name) {
            Some(id) => {
                let symbol = self.symbol(id);
                Operand::var(symbol.address.clone().unwrap_or_else(|| symbol.name.clone()))
            }
            None => {
                self.report_unresolved(name, span);
                Operand::var(name)
            }
        }
    }

    // ── Short-circuit forms ─────────────────────────────────────────

    /// `a && b` / `a || b`: the result starts at the absorbing value and the
    /// right operand is only evaluated when `a` does not decide the outcome.
    fn lower_short_circuit(&mut self, lhs: &Expr, op: LogicalOp, rhs: &Expr) -> Operand {
        let left = self.lower_value(lhs);
        let result = self.gen.new_temp();
        let (absorbing, skip_when) = match op {
            LogicalOp::And => (Operand::Int(0), RelOp::Eq),
            LogicalOp::Or => (Operand::Int(1), RelOp::NotEq),
        };
        self.emit_assign(result.into(), absorbing);
        let end = self.gen.new_label();
        self.gen.emit(Instruction::IfGoto { left, relop: skip_when, right: Operand::Int(0), target: end });
        let right = self.lower_value(rhs);
        self.emit_assign(result.into(), right);
        self.gen.emit(Instruction::Label(end));
        result.into()
    }

    fn lower_ternary(&mut self, cond: &Expr, then_value: &Expr, else_value: &Expr) -> Operand {
        let cond = self.lower_value(cond);
        let true_label = self.gen.new_label();
        self.gen.emit(Instruction::IfGoto { left: cond, relop: RelOp::Eq, right: Operand::Bool(true), target: true_label });
        let false_label = self.gen.new_label();
        self.gen.emit(Instruction::Goto(false_label));

        self.gen.emit(Instruction::Label(true_label));
        let value = self.lower_value(then_value);
        let result = self.gen.new_temp();
        self.emit_assign(result.into(), value);
        let end = self.gen.new_label();
        self.gen.emit(Instruction::Goto(end));

        self.gen.emit(Instruction::Label(false_label));
        let value = self.lower_value(else_value);
        self.emit_assign(result.into(), value);
        self.gen.emit(Instruction::Label(end));
        result.into()
    }

    // ── Calls ───────────────────────────────────────────────────────

    /// Lower each argument and pass a fresh copy of it.
    pub(super) fn lower_args(&mut self, args: &[Expr]) -> Vec<Operand> {
        args.iter()
            .map(|arg| {
                let value = self.lower_value(arg);
                self.copy_to_temp(value).into()
            })
            .collect()
    }

    /// A call yields a value only when its caller expects one; otherwise it
    /// lowers to a bare `call` and the returned operand is `null`.
    fn lower_call(&mut self, callee: &Expr, args: &[Expr], span: Span) -> Operand {
        let wants_value = self.gen.is_expecting_value();
        let mut params = Vec::new();
        let name = match callee {
            Expr::Ident(name, _) => match self.lookup(name) {
                Some(id) => {
                    let symbol = self.symbol(id);
                    let is_method = symbol.kind == SymbolKind::Function && symbol.enclosing_class.is_some();
                    let qualified = symbol.qualified_name();
                    if is_method {
                        // Calls between methods pass the current receiver along.
                        params.push(self.copy_to_temp(Operand::var("this")).into());
                    }
                    qualified
                }
                None => {
                    self.report_unresolved(name, span);
                    name.clone()
                }
            },
            Expr::Property(receiver, method, _) => {
                let class = self.receiver_class(receiver);
                let value = self.lower_value(receiver);
                params.push(self.copy_to_temp(value).into());
                match class {
                    Some(class) => format!("{}.{}", class, method),
                    None => method.clone(),
                }
            }
            other => self.lower_value(other).to_string(),
        };
        params.extend(self.lower_args(args));

        if wants_value {
            let result = self.gen.new_temp();
            self.gen.emit(Instruction::AssignCall { result: result.into(), callee: name, params });
            result.into()
        } else {
            self.gen.emit(Instruction::Call { callee: name, params });
            Operand::Null
        }
    }

    /// Statically known class of a method receiver.
    fn receiver_class(&self, receiver: &Expr) -> Option<String> {
        match receiver {
            Expr::This(_) => self.gen.current_class().map(str::to_string),
            Expr::New(class, _, _) => Some(class.clone()),
            Expr::Ident(name, _) => {
                let id = self.lookup(name)?;
                match &self.symbol(id).declared_type {
                    DeclaredType::Class(class) => Some(class.clone()),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}
