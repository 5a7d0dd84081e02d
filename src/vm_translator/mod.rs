// VM Translator Module
// Translates stack-machine VM code into Hack assembly

pub mod codegen;
pub mod combinator;
pub mod config;
pub mod error;
pub mod instruction;
pub mod parser;

#[cfg(test)]
mod translator_tests;

use indexmap::IndexMap;
use log::{debug, info};

pub use codegen::CodeWriter;
pub use config::TranslatorConfig;
pub use error::TranslatorError;
pub use instruction::{Comparison, Instruction, Segment};
pub use parser::{parse_module, ParserState, VmParser};

/// Main translator structure
pub struct VmTranslator {
    config: TranslatorConfig,
}

impl Default for VmTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl VmTranslator {
    /// Create a translator with the default configuration
    pub fn new() -> Self {
        Self::with_config(TranslatorConfig::default())
    }

    pub fn with_config(config: TranslatorConfig) -> Self {
        VmTranslator { config }
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    fn writer(&self) -> CodeWriter {
        CodeWriter::new(self.config.stack_base)
    }

    /// Translate a single module to assembly. No bootstrap call is emitted.
    pub fn translate_module(&self, module: &str, source: &str) -> Result<String, TranslatorError> {
        let (instructions, _) = parse_module(module, source, ParserState::new())
            .map_err(|err| err.in_module(module))?;
        Ok(self.writer().write(&instructions))
    }

    /// Parse every module of a program, in order, into one instruction stream.
    ///
    /// Comparison and call-site counters carry over from one module to the
    /// next so generated labels stay unique across the program; each module
    /// starts outside any function.
    pub fn parse_program(
        &self,
        modules: &IndexMap<String, String>,
    ) -> Result<Vec<Vec<Instruction>>, TranslatorError> {
        let mut state = ParserState::new();
        let mut parsed = Vec::with_capacity(modules.len());
        for (module, source) in modules {
            let (instructions, next) = parse_module(module, source, state.for_next_module())
                .map_err(|err| err.in_module(module))?;
            debug!(
                "Module '{}' contributed {} instructions",
                module,
                instructions.len()
            );
            parsed.push(instructions);
            state = next;
        }
        Ok(parsed)
    }

    /// Concatenate per-module instruction streams in the given order and
    /// generate the program, prefixed with the bootstrap call if enabled.
    pub fn assemble_program(&self, modules: Vec<Vec<Instruction>>) -> String {
        let mut instructions = Vec::new();
        if self.config.bootstrap {
            instructions.push(CodeWriter::bootstrap(
                &self.config.entry_function,
                &self.config.entry_return_label,
            ));
        }
        instructions.extend(modules.into_iter().flatten());
        self.writer().write(&instructions)
    }

    /// Translate a whole program: every module, then one combined output
    pub fn translate_program(
        &self,
        modules: &IndexMap<String, String>,
    ) -> Result<String, TranslatorError> {
        info!("Translating program of {} modules", modules.len());
        let parsed = self.parse_program(modules)?;
        Ok(self.assemble_program(parsed))
    }
}
