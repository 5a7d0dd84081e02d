//! VM instruction model
//!
//! Every VM command becomes one [`Instruction`] value. Rendering an
//! instruction produces the Hack assembly block that implements it; the
//! rendering is pure, so equal instructions always produce equal text.
//!
//! # Register conventions
//!
//! - `SP` (RAM[0]) points at the next free stack slot
//! - `LCL`, `ARG`, `THIS`, `THAT` (RAM[1..=4]) hold the segment bases
//! - `R5..=R12` are the eight `temp` cells
//! - `R13` and `R14` are scratch cells used by pop, comparison, and return

use std::fmt;

use crate::vm_translator::error::TranslatorError;

/// First RAM cell of the `temp` segment
pub const TEMP_BASE: u16 = 5;

/// Number of `temp` cells
pub const TEMP_SIZE: u16 = 8;

/// RAM cell backing `pointer 0` (`THIS`); `pointer 1` is the next one (`THAT`)
pub const POINTER_BASE: u16 = 3;

/// Number of `pointer` cells
pub const POINTER_SIZE: u16 = 2;

/// Largest constant loadable with a single address instruction
pub const MAX_CONSTANT: u16 = 0x7FFF;

/// Words of saved caller state pushed by a call: return address, LCL, ARG, THIS, THAT
pub const FRAME_SIZE: u16 = 5;

/// Push D onto the stack
const PUSH_D: &str = "@SP\nA=M\nM=D\n@SP\nM=M+1\n";

/// Pop the top of the stack into D
const POP_D: &str = "@SP\nAM=M-1\nD=M\n";

/// Pointer-indirect memory segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    Local,
    Argument,
    This,
    That,
}

impl Segment {
    pub const ALL: [Segment; 4] = [
        Segment::Local,
        Segment::Argument,
        Segment::This,
        Segment::That,
    ];

    /// Parse a VM segment keyword (`local`, `argument`, `this`, `that`)
    pub fn from_keyword(keyword: &str) -> Result<Self, TranslatorError> {
        let keyword = keyword.trim();
        Segment::ALL
            .into_iter()
            .find(|segment| segment.keyword() == keyword)
            .ok_or_else(|| TranslatorError::UnknownSegment(keyword.to_string()))
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Segment::Local => "local",
            Segment::Argument => "argument",
            Segment::This => "this",
            Segment::That => "that",
        }
    }

    /// The register holding this segment's base address
    pub fn base_register(&self) -> &'static str {
        match self {
            Segment::Local => "LCL",
            Segment::Argument => "ARG",
            Segment::This => "THIS",
            Segment::That => "THAT",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.base_register())
    }
}

/// The three comparison commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Equal,
    GreaterThan,
    LessThan,
}

impl Comparison {
    pub const ALL: [Comparison; 3] = [
        Comparison::Equal,
        Comparison::GreaterThan,
        Comparison::LessThan,
    ];

    pub fn from_mnemonic(word: &str) -> Option<Self> {
        Comparison::ALL
            .into_iter()
            .find(|kind| kind.mnemonic() == word)
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Comparison::Equal => "eq",
            Comparison::GreaterThan => "gt",
            Comparison::LessThan => "lt",
        }
    }

    /// Prefix of the internal branch labels (`EQUAL_0`, `NOT_GT_3`, ...)
    pub fn label_stem(&self) -> &'static str {
        match self {
            Comparison::Equal => "EQUAL",
            Comparison::GreaterThan => "GT",
            Comparison::LessThan => "LT",
        }
    }

    /// Jump taken when `left - right` satisfies the comparison
    pub fn jump(&self) -> &'static str {
        match self {
            Comparison::Equal => "JEQ",
            Comparison::GreaterThan => "JGT",
            Comparison::LessThan => "JLT",
        }
    }

    pub fn instruction(&self, disambiguator: u32) -> Instruction {
        match self {
            Comparison::Equal => Instruction::Equal(disambiguator),
            Comparison::GreaterThan => Instruction::GreaterThan(disambiguator),
            Comparison::LessThan => Instruction::LessThan(disambiguator),
        }
    }
}

/// The labels generated for one comparison occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonLabels {
    pub when_true: String,
    pub when_false: String,
    pub end: String,
}

impl ComparisonLabels {
    pub fn new(kind: Comparison, disambiguator: u32) -> Self {
        let stem = kind.label_stem();
        ComparisonLabels {
            when_true: format!("{}_{}", stem, disambiguator),
            when_false: format!("NOT_{}_{}", stem, disambiguator),
            end: format!("END_{}_{}", stem, disambiguator),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    // Stack access
    PushConstant(u16),
    PushSegment { segment: Segment, index: u16 },
    PopSegment { segment: Segment, index: u16 },
    PushTemp(u16),
    PopTemp(u16),
    PushStatic { module: String, index: u16 },
    PopStatic { module: String, index: u16 },
    PushPointer(u16),
    PopPointer(u16),

    // Arithmetic and logic
    Add,
    Subtract,
    Negative,
    And,
    Or,
    Not,

    // Comparisons, each with its disambiguator
    Equal(u32),
    GreaterThan(u32),
    LessThan(u32),

    // Branching (names are already qualified)
    Label(String),
    GoTo(String),
    IfGoTo(String),

    // Functions
    DefineFunction {
        name: String,
        locals: u16,
    },
    CallFunction {
        name: String,
        args: u16,
        return_label: String,
    },
    Return,

    /// Produced by comments; renders to nothing
    Null,
}

impl Instruction {
    /// Render this instruction as a block of Hack assembly, one statement per line
    pub fn render(&self) -> String {
        match self {
            Instruction::PushConstant(value) => format!("@{}\nD=A\n{}", value, PUSH_D),
            Instruction::PushSegment { segment, index } => format!(
                "@{}\nD=A\n@{}\nA=M+D\nD=M\n{}",
                index,
                segment.base_register(),
                PUSH_D
            ),
            Instruction::PopSegment { segment, index } => format!(
                "@{}\nD=A\n@{}\nA=M+D\nD=A\n@R13\nM=D\n{}@R13\nA=M\nM=D\n",
                index,
                segment.base_register(),
                POP_D
            ),
            Instruction::PushTemp(index) => {
                format!("@R{}\nD=M\n{}", TEMP_BASE + index, PUSH_D)
            }
            Instruction::PopTemp(index) => format!("{}@R{}\nM=D\n", POP_D, TEMP_BASE + index),
            Instruction::PushStatic { module, index } => {
                format!("@{}.{}\nD=M\n{}", module, index, PUSH_D)
            }
            Instruction::PopStatic { module, index } => {
                format!("{}@{}.{}\nM=D\n", POP_D, module, index)
            }
            Instruction::PushPointer(index) => {
                format!("@{}\nD=M\n{}", POINTER_BASE + index, PUSH_D)
            }
            Instruction::PopPointer(index) => {
                format!("{}@{}\nM=D\n", POP_D, POINTER_BASE + index)
            }

            Instruction::Add => render_binary("M=M+D"),
            Instruction::Subtract => render_binary("M=M-D"),
            Instruction::And => render_binary("M=M&D"),
            Instruction::Or => render_binary("M=M|D"),
            Instruction::Negative => "@SP\nAM=M-1\nD=!M\nM=D+1\n@SP\nM=M+1\n".to_string(),
            Instruction::Not => "@SP\nAM=M-1\nM=!M\n@SP\nM=M+1\n".to_string(),

            Instruction::Equal(n) => render_comparison(Comparison::Equal, *n),
            Instruction::GreaterThan(n) => render_comparison(Comparison::GreaterThan, *n),
            Instruction::LessThan(n) => render_comparison(Comparison::LessThan, *n),

            Instruction::Label(name) => format!("({})\n", name),
            Instruction::GoTo(name) => format!("@{}\n0;JMP\n", name),
            Instruction::IfGoTo(name) => format!("{}@{}\nD;JNE\n", POP_D, name),

            Instruction::DefineFunction { name, locals } => {
                let mut out = Instruction::Label(name.clone()).render();
                for index in 0..*locals {
                    out.push_str(&Instruction::PushConstant(0).render());
                    out.push_str(
                        &Instruction::PopSegment {
                            segment: Segment::Local,
                            index,
                        }
                        .render(),
                    );
                }
                out
            }
            Instruction::CallFunction {
                name,
                args,
                return_label,
            } => render_call(name, *args, return_label),
            Instruction::Return => render_return(),

            Instruction::Null => String::new(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Pop the right operand into D and combine it into the left operand in place
fn render_binary(combine: &str) -> String {
    format!("{}@SP\nAM=M-1\n{}\n@SP\nM=M+1\n", POP_D, combine)
}

fn render_comparison(kind: Comparison, disambiguator: u32) -> String {
    let labels = ComparisonLabels::new(kind, disambiguator);
    format!(
        "{pop}@R13\nM=D\n{pop}@R13\nD=D-M\n\
         @{t}\nD;{jump}\n@{f}\n0;JMP\n\
         ({t})\nD=-1\n@{end}\n0;JMP\n\
         ({f})\nD=0\n\
         ({end})\n{push}",
        pop = POP_D,
        push = PUSH_D,
        jump = kind.jump(),
        t = labels.when_true,
        f = labels.when_false,
        end = labels.end,
    )
}

fn render_call(name: &str, args: u16, return_label: &str) -> String {
    let mut out = format!("@{}\nD=A\n{}", return_label, PUSH_D);
    for register in ["LCL", "ARG", "THIS", "THAT"] {
        out.push_str(&format!("@{}\nD=M\n{}", register, PUSH_D));
    }
    // ARG = SP - args - 5, LCL = SP
    out.push_str(&format!(
        "@SP\nD=M\n@{}\nD=D-A\n@ARG\nM=D\n@SP\nD=M\n@LCL\nM=D\n",
        u32::from(args) + u32::from(FRAME_SIZE)
    ));
    out.push_str(&format!("@{}\n0;JMP\n({})\n", name, return_label));
    out
}

fn render_return() -> String {
    // R13 = frame (the callee's LCL), R14 = return address at frame - 5.
    // The return address is read before *ARG is written: with no arguments
    // *ARG is the saved return address slot.
    let mut out = format!(
        "@LCL\nD=M\n@R13\nM=D\n@{}\nA=D-A\nD=M\n@R14\nM=D\n",
        FRAME_SIZE
    );
    out.push_str(POP_D);
    out.push_str("@ARG\nA=M\nM=D\n@ARG\nD=M+1\n@SP\nM=D\n");
    for register in ["THAT", "THIS", "ARG", "LCL"] {
        out.push_str(&format!("@R13\nAM=M-1\nD=M\n@{}\nM=D\n", register));
    }
    out.push_str("@R14\nA=M\n0;JMP\n");
    out
}
