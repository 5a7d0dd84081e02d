// Whole-module and whole-program translation tests

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use crate::test_utils::HackMachine;
    use crate::vm_translator::*;

    use test_log::test;

    const PREAMBLE: &str = "@256\nD=A\n@SP\nM=D";

    fn program(modules: &[(&str, &str)]) -> IndexMap<String, String> {
        modules
            .iter()
            .map(|(name, source)| (name.to_string(), source.to_string()))
            .collect()
    }

    fn without_bootstrap() -> VmTranslator {
        VmTranslator::with_config(TranslatorConfig {
            bootstrap: false,
            ..TranslatorConfig::default()
        })
    }

    #[test]
    fn test_module_output_matches_codegen() {
        let source = "function Main.fib 0\npush argument 0\nreturn\n";
        let text = VmTranslator::new().translate_module("Main", source).unwrap();

        let expected = CodeWriter::default().write(&[
            Instruction::DefineFunction {
                name: "Main.fib".to_string(),
                locals: 0,
            },
            Instruction::PushSegment {
                segment: Segment::Argument,
                index: 0,
            },
            Instruction::Return,
        ]);
        assert_eq!(text, expected);
        assert!(text.starts_with(&format!("{}\n(Main.fib)\n@0\nD=A\n@ARG\n", PREAMBLE)));
    }

    #[test]
    fn test_single_module_has_no_bootstrap() {
        let text = VmTranslator::new().translate_module("Main", "add").unwrap();
        assert!(!text.contains("Sys.init"));
        assert!(text.starts_with(PREAMBLE));
    }

    #[test]
    fn test_comments_do_not_change_output() {
        let translator = VmTranslator::new();
        assert_eq!(
            translator.translate_module("Main", "add // sum").unwrap(),
            translator.translate_module("Main", "add").unwrap()
        );
        assert_eq!(
            translator
                .translate_module("Main", "// lead\n\n\teq\n// mid\neq // again\n")
                .unwrap(),
            translator.translate_module("Main", "eq\neq").unwrap()
        );
    }

    #[test]
    fn test_translation_is_deterministic() {
        let source = "eq\ncall Main.f 0\ngt\ncall Main.f 0\neq";
        let translator = VmTranslator::new();
        assert_eq!(
            translator.translate_module("Main", source).unwrap(),
            translator.translate_module("Main", source).unwrap()
        );
    }

    #[test]
    fn test_errors_carry_the_module_name() {
        let err = VmTranslator::new()
            .translate_module("Main", "push foo 1")
            .unwrap_err();
        assert_eq!(
            err.root_cause(),
            &TranslatorError::UnknownSegment("foo".to_string())
        );
        assert_eq!(
            err.to_string(),
            "In module 'Main': Unknown memory segment 'foo'"
        );
    }

    #[test]
    fn test_stack_base_from_config() {
        let translator = VmTranslator::with_config(TranslatorConfig {
            stack_base: 300,
            ..TranslatorConfig::default()
        });
        assert_eq!(translator.config().stack_base, 300);
        let text = translator.translate_module("Main", "neg").unwrap();
        assert!(text.starts_with("@300\nD=A\n@SP\nM=D\n"));
    }

    #[test]
    fn test_program_starts_with_bootstrap() {
        let modules = program(&[("Sys", "function Sys.init 0\nlabel END\ngoto END")]);
        let text = VmTranslator::new().translate_program(&modules).unwrap();
        let bootstrap = CodeWriter::default().write(&[CodeWriter::bootstrap("Sys.init", "sysReturn")]);
        assert!(text.starts_with(&bootstrap));
        assert!(text.contains("\n(Sys.init)\n(Sys.Sys.init$END)\n@Sys.Sys.init$END\n0;JMP"));
    }

    #[test]
    fn test_program_without_bootstrap() {
        let modules = program(&[("Main", "push constant 1")]);
        let text = without_bootstrap().translate_program(&modules).unwrap();
        assert_eq!(
            text,
            VmTranslator::new().translate_module("Main", "push constant 1").unwrap()
        );
    }

    #[test]
    fn test_custom_entry_point() {
        let translator = VmTranslator::with_config(TranslatorConfig {
            entry_function: "Main.main".to_string(),
            entry_return_label: "boot".to_string(),
            ..TranslatorConfig::default()
        });
        let text = translator
            .translate_program(&program(&[("Main", "function Main.main 0\nreturn")]))
            .unwrap();
        assert!(text.contains("@Main.main\n0;JMP\n(boot)"));
        assert!(!text.contains("Sys.init"));
    }

    #[test]
    fn test_modules_keep_their_order() {
        let modules = program(&[("B", "push static 0"), ("A", "push static 0")]);
        let text = without_bootstrap().translate_program(&modules).unwrap();
        assert!(text.find("@B.0").unwrap() < text.find("@A.0").unwrap());
    }

    #[test]
    fn test_counters_continue_across_modules() {
        let modules = program(&[
            ("A", "eq\ncall X.f 0"),
            ("B", "eq\ncall X.f 0\nlt"),
        ]);
        let parsed = without_bootstrap().parse_program(&modules).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1][0], Instruction::Equal(1));
        assert_eq!(
            parsed[1][1],
            Instruction::CallFunction {
                name: "X.f".to_string(),
                args: 0,
                return_label: "X.f.ret.1".to_string(),
            }
        );
        assert_eq!(parsed[1][2], Instruction::LessThan(0));

        let text = without_bootstrap().assemble_program(parsed);
        for label in ["(EQUAL_0)", "(EQUAL_1)", "(X.f.ret.0)", "(X.f.ret.1)"] {
            assert_eq!(text.matches(label).count(), 1, "{}", label);
        }
    }

    #[test]
    fn test_each_module_starts_outside_a_function() {
        // A never returns; B must still see top-level scope
        let modules = program(&[
            ("A", "function A.f 0\nlabel L"),
            ("B", "label L\nfunction B.g 0\nreturn"),
        ]);
        let parsed = without_bootstrap().parse_program(&modules).unwrap();
        assert_eq!(parsed[0][1], Instruction::Label("A.A.f$L".to_string()));
        assert_eq!(parsed[1][0], Instruction::Label("L".to_string()));
    }

    #[test]
    fn test_program_error_names_the_failing_module() {
        let modules = program(&[("A", "add"), ("B", "return")]);
        let err = VmTranslator::new().translate_program(&modules).unwrap_err();
        assert_eq!(
            err,
            TranslatorError::ReturnOutsideFunction.in_module("B")
        );
    }

    #[test]
    fn test_call_and_return_run_on_the_machine() {
        let modules = program(&[
            (
                "Main",
                "// doubles its argument\n\
                 function Main.double 0\n\
                 push argument 0\n\
                 push argument 0\n\
                 add\n\
                 return\n",
            ),
            (
                "Sys",
                "function Sys.init 0\n\
                 push constant 21\n\
                 call Main.double 1\n\
                 pop temp 0\n\
                 label HALT\n\
                 goto HALT\n",
            ),
        ]);
        let text = VmTranslator::new().translate_program(&modules).unwrap();

        let mut machine = HackMachine::load(&text);
        machine.run(2_000);

        // Sys.init spins in its HALT loop with its own frame still on the stack
        assert!(!machine.is_halted());
        assert_eq!(machine.ram[5], 42);
        assert_eq!(machine.sp(), 261);
        assert_eq!(machine.ram[1], 261);
        assert_eq!(machine.ram[2], 256);
    }

    #[test]
    fn test_recursion_runs_on_the_machine() {
        // sum(n) = n + sum(n - 1), sum(0) = 0
        let modules = program(&[(
            "Sys",
            "function Sys.init 0\n\
             push constant 6\n\
             call Sys.sum 1\n\
             pop static 0\n\
             label HALT\n\
             goto HALT\n\
             return\n\
             function Sys.sum 0\n\
             push argument 0\n\
             push constant 0\n\
             eq\n\
             if-goto BASE\n\
             push argument 0\n\
             push argument 0\n\
             push constant 1\n\
             sub\n\
             call Sys.sum 1\n\
             add\n\
             goto END\n\
             label BASE\n\
             push constant 0\n\
             label END\n\
             return\n",
        )]);
        let text = VmTranslator::new().translate_program(&modules).unwrap();
        assert!(text.contains("(Sys.sum.ret.0)"));
        assert!(text.contains("(Sys.sum.ret.1)"));

        let mut machine = HackMachine::load(&text);
        machine.run(20_000);
        let total = machine.symbol("Sys.0").unwrap();
        assert_eq!(machine.ram[total as usize], 21);
        assert_eq!(machine.sp(), 261);
    }

    #[test]
    fn test_locals_share_the_working_stack() {
        // The prologue pushes and pops a zero for each local, so SP ends
        // back at LCL: locals are cleared but no stack space is reserved
        // for them. The callee's first push lands on local 0.
        let modules = program(&[(
            "Sys",
            "function Sys.init 0\n\
             push constant 7\n\
             call Sys.clobber 1\n\
             pop temp 0\n\
             push constant 7\n\
             call Sys.echo 2\n\
             pop temp 2\n\
             label HALT\n\
             goto HALT\n\
             return\n\
             function Sys.clobber 1\n\
             push argument 0\n\
             pop local 0\n\
             push constant 100\n\
             push constant 200\n\
             add\n\
             pop temp 1\n\
             push local 0\n\
             return\n\
             function Sys.echo 2\n\
             push argument 0\n\
             pop local 1\n\
             push local 1\n\
             return\n",
        )]);
        let text = VmTranslator::new().translate_program(&modules).unwrap();

        let mut machine = HackMachine::load(&text);
        machine.run(5_000);

        // local 0 was overwritten by the 100 + 200 computed above it
        assert_eq!(machine.ram[6], 300);
        assert_eq!(machine.ram[5], 300);
        // With no pushes in between, a stored local reads back
        assert_eq!(machine.ram[7], 7);
        assert_eq!(machine.sp(), 261);
    }

    #[test]
    fn test_second_return_in_a_function_is_rejected() {
        let source = "function Main.f 0\npush constant 0\nreturn\npush constant 1\nreturn";
        assert_eq!(
            VmTranslator::new()
                .translate_module("Main", source)
                .unwrap_err()
                .root_cause(),
            &TranslatorError::ReturnOutsideFunction
        );
    }
}
