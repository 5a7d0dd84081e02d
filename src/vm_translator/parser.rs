// VM Front-End Parser
// Turns one module's VM source into instructions, qualifying labels by
// function scope and numbering comparisons and call sites

use indexmap::IndexMap;
use log::{debug, trace};
use regex::Regex;

use crate::vm_translator::combinator::{end_of_input, eol, literal, pattern, Parser};
use crate::vm_translator::error::TranslatorError;
use crate::vm_translator::instruction::{
    Comparison, Instruction, Segment, FRAME_SIZE, MAX_CONSTANT, POINTER_SIZE, TEMP_SIZE,
};

lazy_static! {
    static ref SPACES: Regex = Regex::new(r"^ +").unwrap();
    static ref NUMBER: Regex = Regex::new(r"^[0-9]+").unwrap();
    static ref WORD: Regex = Regex::new(r"^[a-z]+").unwrap();
    static ref SYMBOL: Regex = Regex::new(r"^[A-Za-z0-9_.:$\-]+").unwrap();
    static ref COMMENT: Regex = Regex::new(r"^ *//[^\n]*").unwrap();
    static ref ANY_LINE: Regex = Regex::new(r"^[^\n]+").unwrap();
}

/// One VM command as written, before function scope and counters are applied
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Commands that need no parser state
    Plain(Instruction),
    Compare(Comparison),
    Label(String),
    GoTo(String),
    IfGoTo(String),
    Function { name: String, locals: u16 },
    Call { name: String, args: u16 },
    Return,
    Comment,
}

/// Which function, if any, the parser is currently inside
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FunctionScope {
    #[default]
    NoFunction,
    InFunction { module: String, function: String },
}

impl FunctionScope {
    pub fn define(self, module: &str, function: &str) -> Result<Self, TranslatorError> {
        match self {
            FunctionScope::NoFunction => Ok(FunctionScope::InFunction {
                module: module.to_string(),
                function: function.to_string(),
            }),
            FunctionScope::InFunction { function: outer, .. } => {
                Err(TranslatorError::NestedFunction {
                    outer,
                    inner: function.to_string(),
                })
            }
        }
    }

    pub fn do_return(self) -> Result<Self, TranslatorError> {
        match self {
            FunctionScope::InFunction { .. } => Ok(FunctionScope::NoFunction),
            FunctionScope::NoFunction => Err(TranslatorError::ReturnOutsideFunction),
        }
    }

    /// `module.function$label` inside a function, the bare label outside
    pub fn qualify(&self, label: &str) -> String {
        match self {
            FunctionScope::NoFunction => label.to_string(),
            FunctionScope::InFunction { module, function } => {
                format!("{}.{}${}", module, function, label)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComparisonCounters {
    pub equal: u32,
    pub greater_than: u32,
    pub less_than: u32,
}

impl ComparisonCounters {
    /// Current value for `kind`, advancing the counter
    fn next(&mut self, kind: Comparison) -> u32 {
        let counter = match kind {
            Comparison::Equal => &mut self.equal,
            Comparison::GreaterThan => &mut self.greater_than,
            Comparison::LessThan => &mut self.less_than,
        };
        let current = *counter;
        *counter += 1;
        current
    }
}

/// Cross-statement parser state.
///
/// The state is a plain value threaded through the parse: every statement
/// consumes the current state and yields the next one together with its
/// instruction. Independent parses never share counters unless the caller
/// hands one parse's final state to the next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserState {
    comparisons: ComparisonCounters,
    call_sites: IndexMap<String, u32>,
    scope: FunctionScope,
}

impl ParserState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scope(&self) -> &FunctionScope {
        &self.scope
    }

    pub fn comparisons(&self) -> &ComparisonCounters {
        &self.comparisons
    }

    /// Number of call sites seen so far for `callee`
    pub fn call_sites(&self, callee: &str) -> u32 {
        self.call_sites.get(callee).map_or(0, |last| last + 1)
    }

    /// Keep the counters but start the next module outside any function
    pub fn for_next_module(mut self) -> Self {
        self.scope = FunctionScope::NoFunction;
        self
    }

    /// Resolve one statement of `module` against this state
    pub fn apply(
        mut self,
        module: &str,
        statement: Statement,
    ) -> Result<(Self, Instruction), TranslatorError> {
        let instruction = match statement {
            Statement::Plain(instruction) => instruction,
            Statement::Compare(kind) => kind.instruction(self.comparisons.next(kind)),
            Statement::Label(name) => Instruction::Label(self.scope.qualify(&name)),
            Statement::GoTo(name) => Instruction::GoTo(self.scope.qualify(&name)),
            Statement::IfGoTo(name) => Instruction::IfGoTo(self.scope.qualify(&name)),
            Statement::Function { name, locals } => {
                self.scope = std::mem::take(&mut self.scope).define(module, &name)?;
                trace!("Entering function '{}' in module '{}'", name, module);
                Instruction::DefineFunction { name, locals }
            }
            Statement::Call { name, args } => {
                let site = *self
                    .call_sites
                    .entry(name.clone())
                    .and_modify(|count| *count += 1)
                    .or_insert(0);
                let return_label = format!("{}.ret.{}", name, site);
                Instruction::CallFunction {
                    name,
                    args,
                    return_label,
                }
            }
            Statement::Return => {
                self.scope = std::mem::take(&mut self.scope).do_return()?;
                trace!("Leaving function scope in module '{}'", module);
                Instruction::Return
            }
            Statement::Comment => Instruction::Null,
        };
        Ok((self, instruction))
    }
}

/// Strip tabs, trim every line and drop blank ones
pub fn normalize(source: &str) -> String {
    source
        .replace('\t', "")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse a whole module starting from `state`.
///
/// Returns the module's instructions (comments dropped) and the state after
/// the last statement.
pub fn parse_module(
    module: &str,
    source: &str,
    state: ParserState,
) -> Result<(Vec<Instruction>, ParserState), TranslatorError> {
    let normalized = normalize(source);
    let owner = module.to_string();

    let parser = statement(module)
        .fold_repeating(
            move || (state.clone(), Vec::new()),
            move |(state, mut instructions), statement| {
                let (state, instruction) = state.apply(&owner, statement)?;
                if instruction != Instruction::Null {
                    instructions.push(instruction);
                }
                Ok((state, instructions))
            },
        )
        .and_skip(end_of_input());

    let (state, instructions) = parser.parse(&normalized)?.value;

    debug!(
        "Parsed {} instructions from module '{}'",
        instructions.len(),
        module
    );
    Ok((instructions, state))
}

/// Stateful wrapper around [`parse_module`] for one module.
///
/// The parser state survives between calls to [`VmParser::parse`], so
/// repeated parses on one instance keep numbering call sites and
/// comparisons where the previous parse stopped.
pub struct VmParser {
    module: String,
    state: ParserState,
}

impl VmParser {
    pub fn new(module: &str) -> Self {
        Self::with_state(module, ParserState::new())
    }

    pub fn with_state(module: &str, state: ParserState) -> Self {
        VmParser {
            module: module.to_string(),
            state,
        }
    }

    pub fn state(&self) -> &ParserState {
        &self.state
    }

    pub fn into_state(self) -> ParserState {
        self.state
    }

    /// Parse `source`. On failure the state is left as it was before the call.
    pub fn parse(&mut self, source: &str) -> Result<Vec<Instruction>, TranslatorError> {
        let (instructions, state) = parse_module(&self.module, source, self.state.clone())?;
        self.state = state;
        Ok(instructions)
    }
}

// Statement grammar

fn spaces() -> Parser<'static, String> {
    pattern(&SPACES)
}

fn keyword(word: &'static str) -> Parser<'static, String> {
    literal(word).and_skip(spaces())
}

/// A decimal operand; it must fit the 15-bit literal of an address instruction
fn number() -> Parser<'static, u16> {
    pattern(&NUMBER).try_map(|digits| match digits.parse::<u16>() {
        Ok(value) if value <= MAX_CONSTANT => Ok(value),
        _ => Err(TranslatorError::InvalidNumber(digits.clone())),
    })
}

fn symbol() -> Parser<'static, String> {
    pattern(&SYMBOL)
}

/// An index into a fixed-size segment; out-of-range indexes are fatal
fn bounded_index(segment: &'static str, size: u16) -> Parser<'static, u16> {
    number().try_map(move |index| {
        if index < size {
            Ok(index)
        } else {
            Err(TranslatorError::IndexOutOfRange {
                segment: segment.to_string(),
                index,
                max: size - 1,
            })
        }
    })
}

/// `<segment> <index>` for the pointer-indirect segments
fn segment_operand() -> Parser<'static, (Segment, u16)> {
    pattern(&WORD)
        .and_skip(spaces())
        .and_then(number())
        .try_map(|(keyword, index)| Ok((Segment::from_keyword(&keyword)?, index)))
}

fn comment() -> Parser<'static, String> {
    pattern(&COMMENT).and_skip(eol())
}

/// A newline, end of input, or a trailing comment
fn end_of_statement() -> Parser<'static, String> {
    eol().or(comment())
}

fn push_statement(module: &str) -> Parser<'static, Statement> {
    let module = module.to_string();
    keyword("push").skip_and(
        keyword("constant")
            .skip_and(number())
            .map(|value| Statement::Plain(Instruction::PushConstant(value)))
            .or(keyword("temp")
                .skip_and(bounded_index("temp", TEMP_SIZE))
                .map(|index| Statement::Plain(Instruction::PushTemp(index))))
            .or(keyword("static").skip_and(number()).map(move |index| {
                Statement::Plain(Instruction::PushStatic {
                    module: module.clone(),
                    index,
                })
            }))
            .or(keyword("pointer")
                .skip_and(bounded_index("pointer", POINTER_SIZE))
                .map(|index| Statement::Plain(Instruction::PushPointer(index))))
            .or(segment_operand().map(|(segment, index)| {
                Statement::Plain(Instruction::PushSegment { segment, index })
            })),
    )
}

fn pop_statement(module: &str) -> Parser<'static, Statement> {
    let module = module.to_string();
    keyword("pop").skip_and(
        keyword("temp")
            .skip_and(bounded_index("temp", TEMP_SIZE))
            .map(|index| Statement::Plain(Instruction::PopTemp(index)))
            .or(keyword("static").skip_and(number()).map(move |index| {
                Statement::Plain(Instruction::PopStatic {
                    module: module.clone(),
                    index,
                })
            }))
            .or(keyword("pointer")
                .skip_and(bounded_index("pointer", POINTER_SIZE))
                .map(|index| Statement::Plain(Instruction::PopPointer(index))))
            .or(segment_operand().map(|(segment, index)| {
                Statement::Plain(Instruction::PopSegment { segment, index })
            })),
    )
}

fn arithmetic_command(word: &str) -> Option<Statement> {
    if let Some(kind) = Comparison::from_mnemonic(word) {
        return Some(Statement::Compare(kind));
    }
    let instruction = match word {
        "add" => Instruction::Add,
        "sub" => Instruction::Subtract,
        "neg" => Instruction::Negative,
        "and" => Instruction::And,
        "or" => Instruction::Or,
        "not" => Instruction::Not,
        _ => return None,
    };
    Some(Statement::Plain(instruction))
}

/// A bare mnemonic. Other words are left for the later alternatives
/// (`return`) or the unknown-command fallback.
fn arithmetic_statement() -> Parser<'static, Statement> {
    pattern(&WORD).try_map(|word| {
        arithmetic_command(&word).ok_or_else(|| TranslatorError::NoMatch(word.clone()))
    })
}

fn branch_statement() -> Parser<'static, Statement> {
    keyword("label")
        .skip_and(symbol())
        .map(Statement::Label)
        .or(keyword("goto").skip_and(symbol()).map(Statement::GoTo))
        .or(keyword("if-goto").skip_and(symbol()).map(Statement::IfGoTo))
}

fn function_statement() -> Parser<'static, Statement> {
    keyword("function")
        .skip_and(symbol())
        .and_skip(spaces())
        .and_then(number())
        .map(|(name, locals)| Statement::Function { name, locals })
        .or(keyword("call")
            .skip_and(symbol())
            .and_skip(spaces())
            .and_then(number())
            .try_map(|(name, args)| {
                // The call computes ARG with `@<args + 5>`
                if args <= MAX_CONSTANT - FRAME_SIZE {
                    Ok(Statement::Call { name, args })
                } else {
                    Err(TranslatorError::InvalidNumber(args.to_string()))
                }
            }))
        .or(literal("return").map(|_| Statement::Return))
}

/// Any line nothing else recognised
fn unknown_command() -> Parser<'static, Statement> {
    pattern(&ANY_LINE).try_map(|line| -> Result<Statement, TranslatorError> {
        Err(TranslatorError::UnknownCommand(line))
    })
}

/// One statement of `module`, including its line terminator
pub fn statement(module: &str) -> Parser<'static, Statement> {
    push_statement(module)
        .or(pop_statement(module))
        .or(arithmetic_statement())
        .or(branch_statement())
        .or(function_statement())
        .and_skip(end_of_statement())
        .or(comment().map(|_| Statement::Comment))
        .or(unknown_command())
}
