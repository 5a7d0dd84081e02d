#[macro_use]
extern crate lazy_static;

pub mod vm_translator;

#[cfg(test)]
pub mod test_utils;


/*
Hack RAM layout used by the generated code
        0       SP
        1       LCL
        2       ARG
        3       THIS  (pointer 0)
        4       THAT  (pointer 1)
        5-12    temp 0-7
        13-15   scratch (R13, R14 used by pop/compare/return)
        16-255  static variables (Module.index symbols)
        256-    stack
*/
