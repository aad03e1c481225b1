//! Function and class frames.

use super::Lowerer;
use crate::compiler::ast::{ClassDecl, ClassMember, FunctionDecl};
use crate::compiler::tac::Instruction;
use tracing::debug;

impl<'a> Lowerer<'a> {
    /// `name:`, parameters bound first, the body, `end name`. The body runs
    /// in a fresh frame whose final size is recorded on the function symbol.
    pub(super) fn lower_function(&mut self, f: &FunctionDecl) {
        let Some(id) = self.lookup(&f.name) else {
            self.report_unresolved(&f.name, f.span);
            return;
        };
        let (label, body_scope) = {
            let symbol = self.symbol(id);
            (symbol.qualified_name(), symbol.members)
        };

        let outer_scope = self.scope;
        let outer_function = self.gen.enter_function(&label);
        self.gen.enter_frame();
        self.gen.emit(Instruction::FunctionLabel(label.clone()));
        if let Some(scope) = body_scope {
            self.scope = scope;
        }

        for param in &f.params {
            match self.scopes.lookup_local(self.scope, &param.name) {
                Some(pid) => {
                    let size = self.value_size(pid);
                    self.bind_storage(pid, size);
                }
                None => self.report_unresolved(&param.name, param.span),
            }
        }
        for stmt in &f.body.statements {
            self.lower_stmt(stmt);
        }
        self.gen.emit(Instruction::End(label.clone()));

        let frame_size = self.gen.exit_frame();
        let symbol = self.scopes.symbol_mut(id);
        symbol.param_count = f.params.len();
        symbol.local_frame_size = frame_size;
        debug!(function = %label, params = f.params.len(), frame_size, "lowered function");

        self.scope = outer_scope;
        self.gen.exit_function(outer_function);
    }

    /// Fields are laid out in the class frame after any inherited fields;
    /// methods are lowered inline, each in its own frame.
    pub(super) fn lower_class(&mut self, c: &ClassDecl) {
        let Some(id) = self.lookup(&c.name) else {
            self.report_unresolved(&c.name, c.span);
            return;
        };
        let members = self.symbol(id).members;
        let inherited = c
            .parent
            .as_deref()
            .and_then(|parent| self.lookup(parent))
            .map(|pid| self.symbol(pid).local_frame_size)
            .unwrap_or(0);

        let outer_scope = self.scope;
        let outer_class = self.gen.enter_class(&c.name);
        self.gen.enter_frame();
        self.gen.emit(Instruction::FunctionLabel(c.name.clone()));
        if inherited > 0 {
            self.gen.allocate(inherited);
        }
        if let Some(scope) = members {
            self.scope = scope;
        }

        for member in &c.members {
            match member {
                ClassMember::Field(ls) => {
                    if self.check_let_names(ls) {
                        self.lower_let(ls);
                    }
                }
                ClassMember::Method(f) => self.lower_function(f),
            }
        }
        self.gen.emit(Instruction::End(c.name.clone()));

        let frame_size = self.gen.exit_frame();
        self.scopes.symbol_mut(id).local_frame_size = frame_size;
        debug!(class = %c.name, inherited, frame_size, "lowered class");

        self.scope = outer_scope;
        self.gen.exit_class(outer_class);
    }
}
