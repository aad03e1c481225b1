//! Lowering state: the instruction log, temp and label counters, jump
//! target stacks, the frame offset cursor and the current context.

use crate::compiler::tac::{Instruction, Label, Temp};
use crate::NestedFrameLayout;
use tracing::{debug, trace};

/// Break and continue targets of the innermost enclosing constructs.
/// Labels are allocated on first request, so a target nobody jumps to
/// never consumes a label number.
#[derive(Debug, Default)]
struct JumpTargets {
    break_stack: Vec<Option<Label>>,
    continue_stack: Vec<Option<Label>>,
}

/// Mutable state threaded through one lowering run
#[derive(Debug)]
pub struct Generator {
    instructions: Vec<Instruction>,
    next_temp: u32,
    next_label: u32,
    targets: JumpTargets,
    current_offset: u32,
    saved_offsets: Vec<u32>,
    saved_targets: Vec<JumpTargets>,
    frame_layout: NestedFrameLayout,
    current_function: Option<String>,
    current_class: Option<String>,
    expecting_value: bool,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new(NestedFrameLayout::default())
    }
}

impl Generator {
    pub fn new(frame_layout: NestedFrameLayout) -> Self {
        Self {
            instructions: Vec::new(),
            next_temp: 0,
            next_label: 0,
            targets: JumpTargets::default(),
            current_offset: 0,
            saved_offsets: Vec::new(),
            saved_targets: Vec::new(),
            frame_layout,
            current_function: None,
            current_class: None,
            expecting_value: false,
        }
    }

    // ── Names ───────────────────────────────────────────────────────

    /// Allocate a fresh temporary. Never reused within a run.
    pub fn new_temp(&mut self) -> Temp {
        self.next_temp += 1;
        Temp(self.next_temp)
    }

    /// Allocate a fresh label. Never reused within a run.
    pub fn new_label(&mut self) -> Label {
        self.next_label += 1;
        Label(self.next_label)
    }

    pub fn temps_allocated(&self) -> u32 {
        self.next_temp
    }

    pub fn labels_allocated(&self) -> u32 {
        self.next_label
    }

    // ── Instruction log ─────────────────────────────────────────────

    pub fn emit(&mut self, instr: Instruction) {
        trace!(index = self.instructions.len(), instr = %instr, "emit");
        self.instructions.push(instr);
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn last_instruction(&self) -> Option<&Instruction> {
        self.instructions.last()
    }

    /// True when control cannot fall out of the last emitted instruction.
    pub fn ends_with_jump(&self) -> bool {
        self.last_instruction().is_some_and(Instruction::is_unconditional_jump)
    }

    pub fn into_instructions(self) -> Vec<Instruction> {
        self.instructions
    }

    // ── Jump targets ────────────────────────────────────────────────

    /// Enter a loop. `None` targets are allocated when first requested.
    pub fn enter_loop(&mut self, break_label: Option<Label>, continue_label: Option<Label>) {
        self.targets.break_stack.push(break_label);
        self.targets.continue_stack.push(continue_label);
    }

    /// Leave the innermost loop, returning its break and continue labels
    /// if they were ever allocated.
    pub fn exit_loop(&mut self) -> (Option<Label>, Option<Label>) {
        let brk = self.targets.break_stack.pop().flatten();
        let cont = self.targets.continue_stack.pop().flatten();
        (brk, cont)
    }

    /// Enter a switch: a break target only, so `continue` skips past it.
    pub fn enter_switch(&mut self) {
        self.targets.break_stack.push(None);
    }

    pub fn exit_switch(&mut self) -> Option<Label> {
        self.targets.break_stack.pop().flatten()
    }

    /// Label of the innermost break target, or `None` outside any loop or
    /// switch.
    pub fn break_label(&mut self) -> Option<Label> {
        let counter = &mut self.next_label;
        let slot = self.targets.break_stack.last_mut()?;
        Some(*slot.get_or_insert_with(|| {
            *counter += 1;
            Label(*counter)
        }))
    }

    /// Label of the innermost continue target, or `None` outside any loop.
    pub fn continue_label(&mut self) -> Option<Label> {
        let counter = &mut self.next_label;
        let slot = self.targets.continue_stack.last_mut()?;
        Some(*slot.get_or_insert_with(|| {
            *counter += 1;
            Label(*counter)
        }))
    }

    pub fn loop_depth(&self) -> usize {
        self.targets.continue_stack.len()
    }

    // ── Frames ──────────────────────────────────────────────────────

    /// Reserve `size` bytes in the current frame and return their offset.
    pub fn allocate(&mut self, size: u32) -> u32 {
        let offset = self.current_offset;
        self.current_offset += size;
        offset
    }

    pub fn current_offset(&self) -> u32 {
        self.current_offset
    }

    /// Open a fresh frame: save the cursor and restart it at zero. Jump
    /// targets of the caller are hidden until the frame closes.
    pub fn enter_frame(&mut self) {
        self.saved_offsets.push(self.current_offset);
        self.current_offset = 0;
        self.saved_targets.push(std::mem::take(&mut self.targets));
        debug!(depth = self.saved_offsets.len(), "enter frame");
    }

    /// Close the innermost frame and return its size. The caller's cursor is
    /// restored, plus the closed frame's size under `NestedFrameLayout::Folded`.
    pub fn exit_frame(&mut self) -> u32 {
        let frame_size = self.current_offset;
        let saved = self.saved_offsets.pop().unwrap_or(0);
        self.targets = self.saved_targets.pop().unwrap_or_default();
        self.current_offset = match self.frame_layout {
            NestedFrameLayout::Independent => saved,
            NestedFrameLayout::Folded => saved + frame_size,
        };
        debug!(depth = self.saved_offsets.len(), frame_size, "exit frame");
        frame_size
    }

    pub fn frame_depth(&self) -> usize {
        self.saved_offsets.len()
    }

    // ── Context ─────────────────────────────────────────────────────

    /// Make `name` the current function, returning the previous one.
    pub fn enter_function(&mut self, name: &str) -> Option<String> {
        self.current_function.replace(name.to_string())
    }

    pub fn exit_function(&mut self, previous: Option<String>) {
        self.current_function = previous;
    }

    pub fn current_function(&self) -> Option<&str> {
        self.current_function.as_deref()
    }

    pub fn enter_class(&mut self, name: &str) -> Option<String> {
        self.current_class.replace(name.to_string())
    }

    pub fn exit_class(&mut self, previous: Option<String>) {
        self.current_class = previous;
    }

    pub fn current_class(&self) -> Option<&str> {
        self.current_class.as_deref()
    }

    /// Set whether the expression being lowered must produce a value;
    /// returns the previous setting.
    pub fn set_expecting_value(&mut self, expecting: bool) -> bool {
        std::mem::replace(&mut self.expecting_value, expecting)
    }

    pub fn is_expecting_value(&self) -> bool {
        self.expecting_value
    }
}
