// Translator Error Handling

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TranslatorError {
    // Syntax errors
    NoMatch(String),            // snippet of the unmatched input
    ExpectedEndOfInput(String), // snippet of the trailing input
    UnknownCommand(String),

    // Operand errors
    UnknownSegment(String),
    IndexOutOfRange {
        segment: String,
        index: u16,
        max: u16,
    },
    InvalidNumber(String),

    // Function scope errors
    NestedFunction {
        outer: String,
        inner: String,
    },
    ReturnOutsideFunction,

    // Module context
    InModule(String, Box<TranslatorError>),

    // Configuration and IO errors
    ConfigError(String),
    IOError(String),
}

impl TranslatorError {
    /// Recoverable failures are the combinators' backtracking signal: `or`
    /// tries its next branch and `repeating` stops. Everything else aborts.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TranslatorError::NoMatch(_) | TranslatorError::ExpectedEndOfInput(_)
        )
    }

    pub fn in_module(self, module: &str) -> Self {
        TranslatorError::InModule(module.to_string(), Box::new(self))
    }

    /// Strips any module context and returns the underlying failure.
    pub fn root_cause(&self) -> &TranslatorError {
        match self {
            TranslatorError::InModule(_, inner) => inner.root_cause(),
            other => other,
        }
    }
}

impl fmt::Display for TranslatorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TranslatorError::NoMatch(snippet) => {
                write!(f, "No match for input\n{}", snippet)
            }
            TranslatorError::ExpectedEndOfInput(snippet) => {
                write!(f, "Expected end of input\n{}", snippet)
            }
            TranslatorError::UnknownCommand(line) => {
                write!(f, "Unknown command '{}'", line)
            }
            TranslatorError::UnknownSegment(name) => {
                write!(f, "Unknown memory segment '{}'", name)
            }
            TranslatorError::IndexOutOfRange {
                segment,
                index,
                max,
            } => {
                write!(
                    f,
                    "Index {} out of range for segment '{}' (maximum {})",
                    index, segment, max
                )
            }
            TranslatorError::InvalidNumber(text) => {
                write!(f, "Invalid number '{}'", text)
            }
            TranslatorError::NestedFunction { outer, inner } => {
                write!(
                    f,
                    "Cannot define function '{}' inside function '{}'",
                    inner, outer
                )
            }
            TranslatorError::ReturnOutsideFunction => {
                write!(f, "'return' outside of a function is not allowed")
            }
            TranslatorError::InModule(module, inner) => {
                write!(f, "In module '{}': {}", module, inner)
            }
            TranslatorError::ConfigError(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
            TranslatorError::IOError(msg) => {
                write!(f, "IO error: {}", msg)
            }
        }
    }
}

impl std::error::Error for TranslatorError {}

impl From<std::io::Error> for TranslatorError {
    fn from(err: std::io::Error) -> Self {
        TranslatorError::IOError(err.to_string())
    }
}
