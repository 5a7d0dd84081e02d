// Test utilities for running generated Hack assembly on a minimal CPU model
use std::collections::HashMap;

/// Full 16-bit address space, so any A value can be dereferenced
const RAM_SIZE: usize = 1 << 16;

/// First RAM cell handed out to assembler variables
const FIRST_VARIABLE: i16 = 16;

#[derive(Debug, Clone)]
enum Op {
    Address(i16),
    Compute {
        dest: String,
        comp: String,
        jump: Option<String>,
    },
}

pub struct HackMachine {
    pub ram: Vec<i16>,
    pub a: i16,
    pub d: i16,
    pub pc: usize,
    pub symbols: HashMap<String, i16>,
    program: Vec<Op>,
}

impl HackMachine {
    /// Assemble `asm` (labels, variables and predefined symbols resolved)
    pub fn load(asm: &str) -> Self {
        let mut symbols: HashMap<String, i16> = HashMap::new();
        for (name, address) in [("SP", 0), ("LCL", 1), ("ARG", 2), ("THIS", 3), ("THAT", 4)] {
            symbols.insert(name.to_string(), address);
        }
        for register in 0..16 {
            symbols.insert(format!("R{}", register), register);
        }
        symbols.insert("SCREEN".to_string(), 16384);
        symbols.insert("KBD".to_string(), 24576);

        // Pass 1: label addresses
        let mut statements = Vec::new();
        for raw in asm.lines() {
            let line = raw.split("//").next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if let Some(label) = line.strip_prefix('(').and_then(|l| l.strip_suffix(')')) {
                symbols.insert(label.to_string(), statements.len() as i16);
            } else {
                statements.push(line.to_string());
            }
        }

        // Pass 2: encode, allocating variables on first use
        let mut next_variable = FIRST_VARIABLE;
        let mut program = Vec::with_capacity(statements.len());
        for line in statements {
            if let Some(symbol) = line.strip_prefix('@') {
                let value = match symbol.parse::<i16>() {
                    Ok(value) => value,
                    Err(_) => *symbols.entry(symbol.to_string()).or_insert_with(|| {
                        let address = next_variable;
                        next_variable += 1;
                        address
                    }),
                };
                program.push(Op::Address(value));
            } else {
                let (body, jump) = match line.split_once(';') {
                    Some((body, jump)) => (body.to_string(), Some(jump.to_string())),
                    None => (line.clone(), None),
                };
                let (dest, comp) = match body.split_once('=') {
                    Some((dest, comp)) => (dest.to_string(), comp.to_string()),
                    None => (String::new(), body),
                };
                program.push(Op::Compute { dest, comp, jump });
            }
        }

        HackMachine {
            ram: vec![0; RAM_SIZE],
            a: 0,
            d: 0,
            pc: 0,
            symbols,
            program,
        }
    }

    pub fn is_halted(&self) -> bool {
        self.pc >= self.program.len()
    }

    /// Execute one instruction; returns false once the program has run off its end
    pub fn step(&mut self) -> bool {
        let op = match self.program.get(self.pc) {
            Some(op) => op.clone(),
            None => return false,
        };
        match op {
            Op::Address(value) => {
                self.a = value;
                self.pc += 1;
            }
            Op::Compute { dest, comp, jump } => {
                let address = self.a as u16 as usize;
                let value = self.compute(&comp, self.ram[address]);
                if dest.contains('M') {
                    self.ram[address] = value;
                }
                if dest.contains('D') {
                    self.d = value;
                }
                if dest.contains('A') {
                    self.a = value;
                }
                let taken = match jump.as_deref() {
                    None => false,
                    Some("JGT") => value > 0,
                    Some("JEQ") => value == 0,
                    Some("JGE") => value >= 0,
                    Some("JLT") => value < 0,
                    Some("JNE") => value != 0,
                    Some("JLE") => value <= 0,
                    Some("JMP") => true,
                    Some(other) => panic!("unsupported jump '{}'", other),
                };
                self.pc = if taken { address } else { self.pc + 1 };
            }
        }
        true
    }

    /// Run until the program ends or `max_steps` instructions have executed
    pub fn run(&mut self, max_steps: usize) -> usize {
        let mut steps = 0;
        while steps < max_steps && self.step() {
            steps += 1;
        }
        steps
    }

    pub fn sp(&self) -> i16 {
        self.ram[0]
    }

    /// Value on top of the stack
    pub fn top(&self) -> i16 {
        self.ram[(self.sp() - 1) as u16 as usize]
    }

    /// Value of an assembler symbol (variable or label)
    pub fn symbol(&self, name: &str) -> Option<i16> {
        self.symbols.get(name).copied()
    }

    fn compute(&self, comp: &str, m: i16) -> i16 {
        let (a, d) = (self.a, self.d);
        match comp {
            "0" => 0,
            "1" => 1,
            "-1" => -1,
            "D" => d,
            "A" => a,
            "M" => m,
            "!D" => !d,
            "!A" => !a,
            "!M" => !m,
            "-D" => d.wrapping_neg(),
            "-A" => a.wrapping_neg(),
            "-M" => m.wrapping_neg(),
            "D+1" => d.wrapping_add(1),
            "A+1" => a.wrapping_add(1),
            "M+1" => m.wrapping_add(1),
            "D-1" => d.wrapping_sub(1),
            "A-1" => a.wrapping_sub(1),
            "M-1" => m.wrapping_sub(1),
            "D+A" | "A+D" => d.wrapping_add(a),
            "D+M" | "M+D" => d.wrapping_add(m),
            "D-A" => d.wrapping_sub(a),
            "D-M" => d.wrapping_sub(m),
            "A-D" => a.wrapping_sub(d),
            "M-D" => m.wrapping_sub(d),
            "D&A" | "A&D" => d & a,
            "D&M" | "M&D" => d & m,
            "D|A" | "A|D" => d | a,
            "D|M" | "M|D" => d | m,
            other => panic!("unsupported computation '{}'", other),
        }
    }
}
