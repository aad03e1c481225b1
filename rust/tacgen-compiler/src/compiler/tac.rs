//! Three-address code data types.
//! One instruction per operation, each with a canonical text form.

use crate::compiler::ast::{BinOp, UnaryOp};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumDiscriminants};

/// Compiler-generated value slot `t<N>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Temp(pub u32);

impl fmt::Display for Temp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Numbered jump target `L<N>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// An instruction operand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    Temp(Temp),
    /// Named storage: variable, parameter, field or `this`
    Var(String),
    Int(i64),
    /// Renders as `1` / `0`
    Bool(bool),
    /// Renders with its quotes
    Str(String),
    Null,
    /// The value bound by a catch handler
    Exception,
    /// Address form `base[i][j]`
    Element { base: Box<Operand>, indices: Vec<Operand> },
    /// Address form `base.field`
    Field { base: Box<Operand>, field: String },
}

impl Operand {
    pub fn var(name: impl Into<String>) -> Self {
        Operand::Var(name.into())
    }

    pub fn is_temp(&self) -> bool {
        matches!(self, Operand::Temp(_))
    }

    /// Every temp mentioned by this operand, outermost first.
    pub fn temps(&self) -> Vec<Temp> {
        match self {
            Operand::Temp(t) => vec![*t],
            Operand::Element { base, indices } => {
                let mut out = base.temps();
                out.extend(indices.iter().flat_map(Operand::temps));
                out
            }
            Operand::Field { base, .. } => base.temps(),
            _ => Vec::new(),
        }
    }
}

impl From<Temp> for Operand {
    fn from(t: Temp) -> Self {
        Operand::Temp(t)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Temp(t) => write!(f, "{}", t),
            Operand::Var(name) => write!(f, "{}", name),
            Operand::Int(n) => write!(f, "{}", n),
            Operand::Bool(b) => write!(f, "{}", u8::from(*b)),
            Operand::Str(s) => write!(f, "\"{}\"", s),
            Operand::Null => write!(f, "null"),
            Operand::Exception => write!(f, "exception"),
            Operand::Element { base, indices } => {
                write!(f, "{}", base)?;
                for index in indices {
                    write!(f, "[{}]", index)?;
                }
                Ok(())
            }
            Operand::Field { base, field } => write!(f, "{}.{}", base, field),
        }
    }
}

/// Relational operator of a conditional jump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum RelOp {
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    NotEq,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    LtEq,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    GtEq,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, EnumDiscriminants)]
#[strum_discriminants(name(OpKind), derive(Hash, Serialize, Deserialize))]
pub enum Instruction {
    /// `result = arg`
    Assign { result: Operand, arg: Operand },
    /// `result = left op right`
    BinaryOp { result: Operand, left: Operand, op: BinOp, right: Operand },
    /// `result = op arg`
    UnaryOp { result: Operand, op: UnaryOp, arg: Operand },
    /// `L:`
    Label(Label),
    /// `name:` for functions, methods and classes
    FunctionLabel(String),
    /// `goto L`
    Goto(Label),
    /// `if left relop right goto target`
    IfGoto { left: Operand, relop: RelOp, right: Operand, target: Label },
    /// `call f(p1, p2)` with the value discarded
    Call { callee: String, params: Vec<Operand> },
    /// `result = call f(p1, p2)`
    AssignCall { result: Operand, callee: String, params: Vec<Operand> },
    /// `result = new C(p1, p2)`
    New { result: Operand, class: String, params: Vec<Operand> },
    /// `return value`
    Return(Operand),
    /// `end name`
    End(String),
    /// `try_begin handler`
    TryBegin(Label),
    /// `try_end`
    TryEnd,
}

impl Instruction {
    pub fn kind(&self) -> OpKind {
        OpKind::from(self)
    }

    /// True for instructions after which control never falls through.
    pub fn is_unconditional_jump(&self) -> bool {
        matches!(self, Instruction::Goto(_) | Instruction::Return(_))
    }

    /// The label placed or jumped to by this instruction, if any.
    pub fn label(&self) -> Option<Label> {
        match self {
            Instruction::Label(l)
            | Instruction::Goto(l)
            | Instruction::TryBegin(l)
            | Instruction::IfGoto { target: l, .. } => Some(*l),
            _ => None,
        }
    }

    /// Every temp mentioned by this instruction, in text order.
    pub fn temps(&self) -> Vec<Temp> {
        let mut out = Vec::new();
        match self {
            Instruction::Assign { result, arg } => {
                out.extend(result.temps());
                out.extend(arg.temps());
            }
            Instruction::BinaryOp { result, left, right, .. } => {
                out.extend(result.temps());
                out.extend(left.temps());
                out.extend(right.temps());
            }
            Instruction::UnaryOp { result, arg, .. } => {
                out.extend(result.temps());
                out.extend(arg.temps());
            }
            Instruction::IfGoto { left, right, .. } => {
                out.extend(left.temps());
                out.extend(right.temps());
            }
            Instruction::Call { params, .. } => {
                out.extend(params.iter().flat_map(Operand::temps));
            }
            Instruction::AssignCall { result, params, .. } | Instruction::New { result, params, .. } => {
                out.extend(result.temps());
                out.extend(params.iter().flat_map(Operand::temps));
            }
            Instruction::Return(value) => out.extend(value.temps()),
            _ => {}
        }
        out
    }
}

fn write_params(f: &mut fmt::Formatter<'_>, params: &[Operand]) -> fmt::Result {
    for (i, p) in params.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", p)?;
    }
    Ok(())
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Assign { result, arg } => write!(f, "{} = {}", result, arg),
            Instruction::BinaryOp { result, left, op, right } => {
                write!(f, "{} = {} {} {}", result, left, op, right)
            }
            Instruction::UnaryOp { result, op, arg } => write!(f, "{} = {}{}", result, op, arg),
            Instruction::Label(l) => write!(f, "{}:", l),
            Instruction::FunctionLabel(name) => write!(f, "{}:", name),
            Instruction::Goto(l) => write!(f, "goto {}", l),
            Instruction::IfGoto { left, relop, right, target } => {
                write!(f, "if {} {} {} goto {}", left, relop, right, target)
            }
            Instruction::Call { callee, params } => {
                write!(f, "call {}(", callee)?;
                write_params(f, params)?;
                write!(f, ")")
            }
            Instruction::AssignCall { result, callee, params } => {
                write!(f, "{} = call {}(", result, callee)?;
                write_params(f, params)?;
                write!(f, ")")
            }
            Instruction::New { result, class, params } => {
                write!(f, "{} = new {}(", result, class)?;
                write_params(f, params)?;
                write!(f, ")")
            }
            Instruction::Return(value) => write!(f, "return {}", value),
            Instruction::End(name) => write!(f, "end {}", name),
            Instruction::TryBegin(l) => write!(f, "try_begin {}", l),
            Instruction::TryEnd => write!(f, "try_end"),
        }
    }
}

/// The lowered instruction log of one program
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TacProgram {
    pub instructions: Vec<Instruction>,
}

impl TacProgram {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    /// Canonical text of each instruction, in emission order.
    pub fn lines(&self) -> Vec<String> {
        self.instructions.iter().map(|i| i.to_string()).collect()
    }

    pub fn count(&self, kind: OpKind) -> usize {
        self.instructions.iter().filter(|i| i.kind() == kind).count()
    }
}

impl fmt::Display for TacProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instr in &self.instructions {
            writeln!(f, "{}", instr)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a TacProgram {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(n: u32) -> Operand {
        Operand::Temp(Temp(n))
    }

    #[test]
    fn renders_canonical_forms() {
        let cases = vec![
            (Instruction::Assign { result: t(1), arg: Operand::Int(5) }, "t1 = 5"),
            (
                Instruction::BinaryOp { result: t(3), left: t(1), op: BinOp::Mul, right: t(2) },
                "t3 = t1 * t2",
            ),
            (Instruction::UnaryOp { result: t(2), op: UnaryOp::Neg, arg: t(1) }, "t2 = -t1"),
            (Instruction::Label(Label(4)), "L4:"),
            (Instruction::FunctionLabel("sum".into()), "sum:"),
            (Instruction::Goto(Label(1)), "goto L1"),
            (
                Instruction::IfGoto {
                    left: Operand::var("x"),
                    relop: RelOp::Eq,
                    right: Operand::Int(0),
                    target: Label(2),
                },
                "if x == 0 goto L2",
            ),
            (Instruction::Call { callee: "print".into(), params: vec![t(2)] }, "call print(t2)"),
            (
                Instruction::AssignCall { result: t(4), callee: "sum".into(), params: vec![t(2), t(3)] },
                "t4 = call sum(t2, t3)",
            ),
            (Instruction::New { result: t(1), class: "Dog".into(), params: vec![] }, "t1 = new Dog()"),
            (Instruction::Return(Operand::Null), "return null"),
            (Instruction::End("sum".into()), "end sum"),
            (Instruction::TryBegin(Label(1)), "try_begin L1"),
            (Instruction::TryEnd, "try_end"),
        ];
        for (instr, text) in cases {
            assert_eq!(instr.to_string(), text);
        }
    }

    #[test]
    fn renders_address_forms_and_literals() {
        let element = Operand::Element {
            base: Box::new(Operand::var("matrix")),
            indices: vec![Operand::Int(0), Operand::Int(1)],
        };
        let store = Instruction::Assign { result: element, arg: t(2) };
        assert_eq!(store.to_string(), "matrix[0][1] = t2");

        let field = Operand::Field { base: Box::new(Operand::var("this")), field: "name".into() };
        assert_eq!(field.to_string(), "this.name");
        assert_eq!(Operand::Bool(true).to_string(), "1");
        assert_eq!(Operand::Bool(false).to_string(), "0");
        assert_eq!(Operand::Str("lunes".into()).to_string(), "\"lunes\"");
        assert_eq!(Operand::Exception.to_string(), "exception");
    }

    #[test]
    fn kind_and_jump_classification() {
        assert_eq!(Instruction::TryEnd.kind(), OpKind::TryEnd);
        assert!(Instruction::Goto(Label(1)).is_unconditional_jump());
        assert!(Instruction::Return(Operand::Null).is_unconditional_jump());
        assert!(!Instruction::Label(Label(1)).is_unconditional_jump());
        let program = TacProgram::new(vec![Instruction::TryEnd, Instruction::Goto(Label(1))]);
        assert_eq!(program.count(OpKind::Goto), 1);
        assert_eq!(program.to_string(), "try_end\ngoto L1\n");
    }
}
