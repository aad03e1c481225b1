//! Statement lowering: declarations, stores, structured control flow.

use super::{LowerError, Lowerer};
use crate::compiler::ast::*;
use crate::compiler::tac::{Instruction, Operand, RelOp};
use crate::SwitchCaseExit;

impl<'a> Lowerer<'a> {
    pub(super) fn lower_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Let(_) | Stmt::Assign(_) | Stmt::Print(_) | Stmt::Expr(_) | Stmt::Return(_)
                if !self.check_names(stmt) => {}
            Stmt::Let(ls) => self.lower_let(ls),
            Stmt::Assign(a) => self.lower_assign(a),
            Stmt::Print(p) => {
                let value = self.lower_value(&p.value);
                let arg = self.copy_to_temp(value);
                self.gen.emit(Instruction::Call { callee: "print".to_string(), params: vec![arg.into()] });
            }
            Stmt::Expr(e) => {
                let prev = self.gen.set_expecting_value(false);
                self.lower_expr(&e.expr);
                self.gen.set_expecting_value(prev);
            }
            Stmt::Block(b) => self.lower_block(b),
            Stmt::If(s) => self.lower_if(s),
            Stmt::While(s) => self.lower_while(s),
            Stmt::DoWhile(s) => self.lower_do_while(s),
            Stmt::For(s) => self.lower_for(s),
            Stmt::Foreach(s) => self.lower_foreach(s),
            Stmt::Switch(s) => self.lower_switch(s),
            Stmt::Break(span) => match self.gen.break_label() {
                Some(target) => self.gen.emit(Instruction::Goto(target)),
                None => self.report(LowerError::BreakOutsideLoop { line: span.line }),
            },
            Stmt::Continue(span) => match self.gen.continue_label() {
                Some(target) => self.gen.emit(Instruction::Goto(target)),
                None => self.report(LowerError::ContinueOutsideLoop { line: span.line }),
            },
            Stmt::Return(r) => {
                let value = match &r.value {
                    Some(value) => self.lower_value(value),
                    None => Operand::Null,
                };
                self.gen.emit(Instruction::Return(value));
            }
            Stmt::TryCatch(s) => self.lower_try_catch(s),
            Stmt::Function(f) => self.lower_function(f),
            Stmt::Class(c) => self.lower_class(c),
        }
    }

    fn lower_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.lower_stmt(stmt);
        }
    }

    pub(super) fn lower_block(&mut self, block: &Block) {
        let outer = self.enter_scope(block.span);
        self.lower_stmts(&block.statements);
        self.scope = outer;
    }

    // ── Declarations and stores ─────────────────────────────────────

    /// Storage is reserved at the declaration, before the initializer runs.
    pub(super) fn lower_let(&mut self, ls: &LetStmt) {
        let Some(id) = self.lookup(&ls.name) else {
            self.report_unresolved(&ls.name, ls.span);
            return;
        };
        match &ls.value {
            Some(Expr::ArrayLit(elems, span)) => self.lower_array_declaration(id, elems, *span),
            value => {
                let size = self.value_size(id);
                self.bind_storage(id, size);
                if let Some(value) = value {
                    let value = self.lower_rhs(value);
                    self.emit_assign(Operand::var(ls.name.as_str()), value);
                }
            }
        }
    }

    fn lower_assign(&mut self, a: &AssignStmt) {
        match &a.target {
            AssignTarget::Ident(name) => {
                let Some(id) = self.lookup(name) else {
                    self.report_unresolved(name, a.span);
                    return;
                };
                if let Expr::ArrayLit(elems, span) = &a.value {
                    self.lower_array_assignment(id, elems, *span);
                    return;
                }
                let target = self.symbol(id).address.clone().unwrap_or_else(|| name.clone());
                let value = self.lower_rhs(&a.value);
                self.emit_assign(Operand::Var(target), value);
            }
            AssignTarget::Index { base, indices } => {
                let base = self.lower_value(base);
                let indices: Vec<Operand> = indices
                    .iter()
                    .map(|i| {
                        let index = self.lower_value(i);
                        self.ensure_temp(index)
                    })
                    .collect();
                let value = self.lower_rhs(&a.value);
                self.emit_assign(Operand::Element { base: Box::new(base), indices }, value);
            }
            AssignTarget::Property { object, field } => {
                let base = self.lower_value(object);
                let value = self.lower_rhs(&a.value);
                self.emit_assign(Operand::Field { base: Box::new(base), field: field.clone() }, value);
            }
        }
    }

    // ── Conditionals ────────────────────────────────────────────────

    fn lower_if(&mut self, s: &IfStmt) {
        let cond = self.lower_value(&s.condition);
        let else_label = self.gen.new_label();
        self.gen.emit(Instruction::IfGoto { left: cond, relop: RelOp::Eq, right: Operand::Int(0), target: else_label });
        self.lower_block(&s.then_block);
        match &s.else_block {
            Some(else_block) => {
                let end = self.gen.new_label();
                self.gen.emit(Instruction::Goto(end));
                self.gen.emit(Instruction::Label(else_label));
                self.lower_block(else_block);
                self.gen.emit(Instruction::Label(end));
            }
            None => self.gen.emit(Instruction::Label(else_label)),
        }
    }

    /// The subject is evaluated once; each case compares against it in
    /// order, and the chain falls back to `default` or the end label.
    fn lower_switch(&mut self, s: &SwitchStmt) {
        let subject = self.lower_value(&s.subject);
        let subject = self.ensure_temp(subject);

        let mut case_labels = Vec::with_capacity(s.cases.len());
        for case in &s.cases {
            let value = self.lower_value(&case.value);
            let label = self.gen.new_label();
            self.gen.emit(Instruction::IfGoto { left: subject.clone(), relop: RelOp::Eq, right: value, target: label });
            case_labels.push(label);
        }

        self.gen.enter_switch();
        let default_label = match &s.default {
            Some(_) => {
                let label = self.gen.new_label();
                self.gen.emit(Instruction::Goto(label));
                Some(label)
            }
            None => {
                if let Some(end) = self.gen.break_label() {
                    self.gen.emit(Instruction::Goto(end));
                }
                None
            }
        };

        for (case, label) in s.cases.iter().zip(case_labels) {
            self.gen.emit(Instruction::Label(label));
            self.lower_stmts(&case.body);
            let implicit_break = self.options.switch_cases == SwitchCaseExit::ImplicitBreak;
            // An empty case shares the next case's body.
            if implicit_break && !case.body.is_empty() && !self.gen.ends_with_jump() {
                if let Some(end) = self.gen.break_label() {
                    self.gen.emit(Instruction::Goto(end));
                }
            }
        }

        if let (Some(body), Some(label)) = (&s.default, default_label) {
            self.gen.emit(Instruction::Label(label));
            self.lower_stmts(body);
        }
        if let Some(end) = self.gen.exit_switch() {
            self.gen.emit(Instruction::Label(end));
        }
    }

    // ── Loops ───────────────────────────────────────────────────────

    fn lower_while(&mut self, s: &WhileStmt) {
        let start = self.gen.new_label();
        self.gen.emit(Instruction::Label(start));
        let cond = self.lower_value(&s.condition);
        let end = self.gen.new_label();
        self.gen.emit(Instruction::IfGoto { left: cond, relop: RelOp::Eq, right: Operand::Int(0), target: end });

        self.gen.enter_loop(Some(end), Some(start));
        self.lower_block(&s.body);
        self.gen.emit(Instruction::Goto(start));
        self.gen.exit_loop();
        self.gen.emit(Instruction::Label(end));
    }

    /// Body first, then a jump back while the condition holds. The end label
    /// only exists when something breaks out.
    fn lower_do_while(&mut self, s: &DoWhileStmt) {
        let start = self.gen.new_label();
        self.gen.emit(Instruction::Label(start));

        self.gen.enter_loop(None, Some(start));
        self.lower_block(&s.body);
        let cond = self.lower_value(&s.condition);
        self.gen.emit(Instruction::IfGoto { left: cond, relop: RelOp::NotEq, right: Operand::Int(0), target: start });
        let (end, _) = self.gen.exit_loop();
        if let Some(end) = end {
            self.gen.emit(Instruction::Label(end));
        }
    }

    /// The init declaration shares the body's scope. `continue` targets the
    /// update step, whose label is only placed when something jumps to it.
    fn lower_for(&mut self, s: &ForStmt) {
        let outer = self.enter_scope(s.body.span);
        if let Some(init) = &s.init {
            self.lower_stmt(init);
        }

        let start = self.gen.new_label();
        self.gen.emit(Instruction::Label(start));
        let mut end = None;
        if let Some(condition) = &s.condition {
            let cond = self.lower_value(condition);
            let label = self.gen.new_label();
            self.gen.emit(Instruction::IfGoto { left: cond, relop: RelOp::Eq, right: Operand::Int(0), target: label });
            end = Some(label);
        }

        let continue_label = if s.update.is_some() { None } else { Some(start) };
        self.gen.enter_loop(end, continue_label);
        self.lower_stmts(&s.body.statements);
        let (end, update_label) = self.gen.exit_loop();

        if let Some(update) = &s.update {
            if let Some(label) = update_label {
                self.gen.emit(Instruction::Label(label));
            }
            self.lower_stmt(update);
        }
        self.gen.emit(Instruction::Goto(start));
        if let Some(end) = end {
            self.gen.emit(Instruction::Label(end));
        }
        self.scope = outer;
    }

    /// Index and bound temps drive the loop; each pass reads
    /// `collection[index]` into the item variable.
    fn lower_foreach(&mut self, s: &ForeachStmt) {
        let outer = self.enter_scope(s.body.span);
        let collection = self.lower_value(&s.collection);
        let extent = match &s.collection {
            Expr::Ident(name, _) => self.lookup(name).and_then(|id| self.symbol(id).dimensions.first().copied()),
            _ => None,
        };

        let index = self.copy_to_temp(Operand::Int(0));
        let bound_value = match extent {
            Some(n) => Operand::Int(n as i64),
            None => Operand::Field { base: Box::new(collection.clone()), field: "length".to_string() },
        };
        let bound = self.copy_to_temp(bound_value);

        match self.lookup(&s.item) {
            Some(id) => {
                let size = self.value_size(id);
                self.bind_storage(id, size);
            }
            None => self.report_unresolved(&s.item, s.span),
        }

        let start = self.gen.new_label();
        self.gen.emit(Instruction::Label(start));
        let check = self.gen.new_temp();
        self.gen.emit(Instruction::BinaryOp {
            result: check.into(),
            left: index.into(),
            op: BinOp::Lt,
            right: bound.into(),
        });
        let end = self.gen.new_label();
        self.gen.emit(Instruction::IfGoto { left: check.into(), relop: RelOp::Eq, right: Operand::Int(0), target: end });
        let element = self.gen.new_temp();
        self.emit_assign(element.into(), Operand::Element { base: Box::new(collection), indices: vec![index.into()] });
        self.emit_assign(Operand::var(s.item.as_str()), element.into());

        self.gen.enter_loop(Some(end), None);
        self.lower_stmts(&s.body.statements);
        let (_, step_label) = self.gen.exit_loop();
        if let Some(label) = step_label {
            self.gen.emit(Instruction::Label(label));
        }
        self.gen.emit(Instruction::BinaryOp {
            result: index.into(),
            left: index.into(),
            op: BinOp::Add,
            right: Operand::Int(1),
        });
        self.gen.emit(Instruction::Goto(start));
        self.gen.emit(Instruction::Label(end));
        self.scope = outer;
    }

    // ── Exceptions ──────────────────────────────────────────────────

    /// Region markers only; the handler binds the caught value and both
    /// paths meet at the end label.
    fn lower_try_catch(&mut self, s: &TryCatchStmt) {
        let handler = self.gen.new_label();
        self.gen.emit(Instruction::TryBegin(handler));
        self.lower_block(&s.try_block);
        self.gen.emit(Instruction::TryEnd);
        let end = self.gen.new_label();
        self.gen.emit(Instruction::Goto(end));

        self.gen.emit(Instruction::Label(handler));
        let outer = self.enter_scope(s.catch_block.span);
        match self.lookup(&s.catch_name) {
            Some(id) => {
                let size = self.value_size(id);
                self.bind_storage(id, size);
            }
            None => self.report_unresolved(&s.catch_name, s.span),
        }
        self.emit_assign(Operand::var(s.catch_name.as_str()), Operand::Exception);
        self.lower_stmts(&s.catch_block.statements);
        self.scope = outer;
        self.gen.emit(Instruction::Label(end));
    }
}
