// Hack Assembly Code Generation
// Emits the machine preamble followed by every instruction's rendering

use log::debug;

use crate::vm_translator::instruction::Instruction;

/// Default address the stack pointer is initialised to
pub const DEFAULT_STACK_BASE: u16 = 256;

pub struct CodeWriter {
    stack_base: u16,
}

impl Default for CodeWriter {
    fn default() -> Self {
        Self::new(DEFAULT_STACK_BASE)
    }
}

impl CodeWriter {
    pub fn new(stack_base: u16) -> Self {
        CodeWriter { stack_base }
    }

    /// Set SP to the stack base
    pub fn preamble(&self) -> String {
        format!("@{}\nD=A\n@SP\nM=D\n", self.stack_base)
    }

    /// The synthetic call that starts a whole program at its entry function
    pub fn bootstrap(entry_function: &str, return_label: &str) -> Instruction {
        Instruction::CallFunction {
            name: entry_function.to_string(),
            args: 0,
            return_label: return_label.to_string(),
        }
    }

    /// Render the preamble and `instructions`, dropping blank lines.
    ///
    /// Lines are joined with `\n`; the text has no trailing newline.
    pub fn write(&self, instructions: &[Instruction]) -> String {
        let mut text = self.preamble();
        for instruction in instructions {
            text.push_str(&instruction.render());
            text.push('\n');
        }

        let lines: Vec<&str> = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .collect();
        debug!(
            "Emitted {} assembly lines for {} instructions",
            lines.len(),
            instructions.len()
        );
        lines.join("\n")
    }
}
