//! x86 code generation from the TAC listing.
//!
//! The generator is line-oriented: it re-reads the TAC text the front end
//! produced and translates each recognized instruction, tolerating anything
//! it does not recognize. Temporaries live in a six-register pool with a
//! round-robin spill that discards the victim's value: temporaries are
//! short-lived by construction, so nothing is written back to memory.

use std::collections::{HashMap, VecDeque};

use indexmap::IndexSet;

/// Allocation order; also the spill victim ring.
const REGISTERS: [&str; 6] = ["eax", "ebx", "ecx", "edx", "esi", "edi"];

/// A temporary is `t` followed by a digit (`t1`, `t42`, ...).
fn is_temporary(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 2 && bytes[0] == b't' && bytes[1].is_ascii_digit()
}

/// A literal operand starts with a digit or a minus sign; anything that is
/// neither a temporary nor a literal is a source variable.
fn is_literal(operand: &str) -> bool {
    operand
        .as_bytes()
        .first()
        .is_some_and(|b| b.is_ascii_digit() || *b == b'-')
}

pub struct AssemblyGenerator {
    pool: VecDeque<&'static str>,
    map: HashMap<String, &'static str>,
    spill_index: usize,
    variables: IndexSet<String>,
    asm_code: Vec<String>,
    spill_log: Vec<String>,
}

impl Default for AssemblyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl AssemblyGenerator {
    pub fn new() -> Self {
        Self {
            pool: REGISTERS.iter().copied().collect(),
            map: HashMap::new(),
            spill_index: 0,
            variables: IndexSet::new(),
            asm_code: Vec::new(),
            spill_log: Vec::new(),
        }
    }

    /// Diagnostic lines recorded when the allocator reclaimed a register.
    pub fn spill_log(&self) -> &[String] {
        &self.spill_log
    }

    /// Translate a TAC listing into a complete NASM document.
    pub fn generate_from_tac(&mut self, tac_code: &str) -> String {
        for raw in tac_code.lines() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if line.starts_with("IF ") {
                self.handle_if(line);
            } else if line.starts_with("GOTO ") {
                self.handle_goto(line);
            } else if line.starts_with("ADD ") {
                self.handle_add_sub(line, "add");
            } else if line.starts_with("SUB ") {
                self.handle_add_sub(line, "sub");
            } else if line.starts_with("MOV ") {
                self.handle_mov(line);
            } else if line.contains('=') {
                self.handle_assignment(line);
            } else if let Some(label) = line.strip_suffix(':') {
                self.emit_label(label);
            }
            // Anything else is not part of the dialect; skip it.
        }

        self.get_assembly_code()
    }

    /// Register already holding `temp`, or a fresh one from the pool, or a
    /// spill victim chosen round-robin. The victim's value is discarded.
    fn get_register(&mut self, temp: &str) -> &'static str {
        if let Some(&reg) = self.map.get(temp) {
            return reg;
        }
        if let Some(reg) = self.pool.pop_front() {
            self.map.insert(temp.to_string(), reg);
            return reg;
        }

        let victim = REGISTERS[self.spill_index];
        self.spill_index = (self.spill_index + 1) % REGISTERS.len();
        if let Some(evicted) = self
            .map
            .iter()
            .find_map(|(k, v)| (*v == victim).then(|| k.clone()))
        {
            self.map.remove(&evicted);
            self.spill_log
                .push(format!("Spilling {} from {} for {}", evicted, victim, temp));
        }
        self.map.insert(temp.to_string(), victim);
        victim
    }

    fn free_register(&mut self, temp: &str) {
        if let Some(reg) = self.map.remove(temp) {
            self.pool.push_back(reg);
        }
    }

    fn emit(&mut self, instruction: &str) {
        self.asm_code.push(format!("    {}", instruction));
    }

    fn emit_label(&mut self, label: &str) {
        self.asm_code.push(format!("{}:", label));
    }

    /// Materialize a source variable in the data section, once.
    fn add_variable(&mut self, var: &str) {
        self.variables.insert(var.to_string());
    }

    /// `MOV dest, src`: store a temporary's register or an immediate into
    /// the variable's memory slot.
    fn handle_mov(&mut self, line: &str) {
        let content = &line[4..];
        let Some((dest, src)) = content.split_once(',') else {
            return;
        };
        let dest = dest.trim();
        let src = src.trim();

        self.add_variable(dest);
        if is_temporary(src) {
            let src_reg = self.get_register(src);
            self.emit(&format!("mov [{}], {}", dest, src_reg));
            self.free_register(src);
        } else {
            self.emit(&format!("mov dword [{}], {}", dest, src));
        }
    }

    /// `ADD dest, src1, src2` / `SUB dest, src1, src2`. Only the in-place
    /// form (`dest == src1`) exists in the dialect; other shapes emit nothing.
    fn handle_add_sub(&mut self, line: &str, op: &str) {
        let content = &line[4..];
        let mut parts = content.split(',');
        let (Some(dest), Some(src1), Some(src2)) = (parts.next(), parts.next(), parts.next())
        else {
            return;
        };
        let dest = dest.trim();
        let src1 = src1.trim();
        let src2 = src2.trim();

        self.add_variable(dest);
        if dest == src1 {
            if is_literal(src2) {
                self.emit(&format!("{} dword [{}], {}", op, dest, src2));
            } else {
                self.add_variable(src2);
                self.emit(&format!("mov eax, [{}]", src2));
                self.emit(&format!("{} dword [{}], eax", op, dest));
            }
        }
    }

    /// `dest = src` or `dest = left op right`. `dest` is always a
    /// temporary; the TAC generator guarantees it.
    fn handle_assignment(&mut self, line: &str) {
        let Some((dest, expr)) = line.split_once('=') else {
            return;
        };
        let dest = dest.trim();
        let expr = expr.trim();

        let parts: Vec<&str> = expr.split_whitespace().collect();
        match parts[..] {
            [src] => {
                let dest_reg = self.get_register(dest);
                if is_temporary(src) {
                    let src_reg = self.get_register(src);
                    self.emit(&format!("mov {}, {}", dest_reg, src_reg));
                    self.free_register(src);
                } else if is_literal(src) {
                    self.emit(&format!("mov {}, {}", dest_reg, src));
                } else {
                    self.add_variable(src);
                    self.emit(&format!("mov {}, [{}]", dest_reg, src));
                }
            }
            [left, op @ ("+" | "-" | "*"), right] => {
                let op_instr = match op {
                    "+" => "add",
                    "-" => "sub",
                    _ => "imul",
                };

                let dest_reg = self.get_register(dest);
                if is_temporary(left) {
                    let left_reg = self.get_register(left);
                    self.emit(&format!("mov {}, {}", dest_reg, left_reg));
                } else if is_literal(left) {
                    self.emit(&format!("mov {}, {}", dest_reg, left));
                } else {
                    self.add_variable(left);
                    self.emit(&format!("mov {}, [{}]", dest_reg, left));
                }

                if is_temporary(right) {
                    let right_reg = self.get_register(right);
                    self.emit(&format!("{} {}, {}", op_instr, dest_reg, right_reg));
                    self.free_register(right);
                } else if is_literal(right) {
                    self.emit(&format!("{} {}, {}", op_instr, dest_reg, right));
                } else {
                    self.add_variable(right);
                    self.emit(&format!("{} {}, [{}]", op_instr, dest_reg, right));
                }
            }
            // Division and anything else (e.g. unary forms) are not
            // lowered; the line is dropped.
            _ => {}
        }
    }

    /// `IF left relop right GOTO label`: compare and conditionally jump.
    fn handle_if(&mut self, line: &str) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let (left, op, right, label) = match parts[..] {
            [_, left, op, right, _, label] => (left, op, right, label),
            _ => return,
        };

        let left_reg = if is_temporary(left) {
            self.get_register(left)
        } else {
            self.add_variable(left);
            self.emit(&format!("mov eax, [{}]", left));
            "eax"
        };

        if is_temporary(right) {
            let right_reg = self.get_register(right);
            self.emit(&format!("cmp {}, {}", left_reg, right_reg));
        } else if is_literal(right) {
            self.emit(&format!("cmp {}, {}", left_reg, right));
        } else {
            self.add_variable(right);
            self.emit(&format!("cmp {}, [{}]", left_reg, right));
        }

        let jump = match op {
            "<" => "jl",
            ">" => "jg",
            "<=" => "jle",
            ">=" => "jge",
            "==" => "je",
            "!=" => "jne",
            _ => return,
        };
        self.emit(&format!("{} {}", jump, label));
    }

    fn handle_goto(&mut self, line: &str) {
        let label = line[5..].trim();
        self.emit(&format!("jmp {}", label));
    }

    /// Assemble the full document: data section, text section, body, and
    /// the exit trailer.
    fn get_assembly_code(&self) -> String {
        let mut full = String::new();
        full.push_str("section .data\n");
        for var in &self.variables {
            full.push_str(&format!("    {} dd 0\n", var));
        }
        full.push_str("\nsection .text\n");
        full.push_str("    global _start\n\n");
        full.push_str("_start:\n");
        for line in &self.asm_code {
            full.push_str(line);
            full.push('\n');
        }
        full.push_str("\n    ; Exit program\n");
        full.push_str("    mov eax, 1\n");
        full.push_str("    xor ebx, ebx\n");
        full.push_str("    int 0x80\n");
        full
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(tac: &str) -> String {
        AssemblyGenerator::new().generate_from_tac(tac)
    }

    #[test]
    fn test_is_temporary() {
        assert!(is_temporary("t1"));
        assert!(is_temporary("t42"));
        assert!(!is_temporary("t"));
        assert!(!is_temporary("total"));
        assert!(!is_temporary("x1"));
        assert!(!is_temporary("7"));
    }

    #[test]
    fn test_is_literal() {
        assert!(is_literal("3"));
        assert!(is_literal("-3"));
        assert!(!is_literal("t1"));
        assert!(!is_literal("var"));
        assert!(!is_literal(""));
    }

    #[test]
    fn test_literal_assignment_uses_pool_order() {
        let asm = generate("t1 = 3\nt2 = 4\n");
        assert!(asm.contains("    mov eax, 3\n"));
        assert!(asm.contains("    mov ebx, 4\n"));
    }

    #[test]
    fn test_binary_assignment_and_store() {
        let asm = generate("t1 = 3\nt2 = 4\nt3 = t1 + t2\nMOV a, t3\n");
        assert!(asm.contains("    mov ecx, eax\n"));
        assert!(asm.contains("    add ecx, ebx\n"));
        assert!(asm.contains("    mov [a], ecx\n"));
        assert!(asm.contains("    a dd 0\n"));
    }

    #[test]
    fn test_mul_lowering() {
        let asm = generate("t1 = 2\nt2 = t1 * 5\n");
        assert!(asm.contains("    imul ebx, 5\n"));
    }

    #[test]
    fn test_division_is_not_lowered() {
        let asm = generate("t1 = 6\nt2 = t1 / 2\n");
        assert!(!asm.contains("div"));
        // The left operand load is dropped along with the whole line.
        assert!(!asm.contains("mov ebx, eax"));
    }

    #[test]
    fn test_mov_immediate() {
        let asm = generate("MOV a, 5\n");
        assert!(asm.contains("    mov dword [a], 5\n"));
    }

    #[test]
    fn test_variable_operand_reads_memory() {
        let asm = generate("t1 = b\n");
        assert!(asm.contains("    mov eax, [b]\n"));
        assert!(asm.contains("    b dd 0\n"));
    }

    #[test]
    fn test_add_in_place_with_literal() {
        let asm = generate("ADD i, i, 1\n");
        assert!(asm.contains("    add dword [i], 1\n"));
    }

    #[test]
    fn test_sub_in_place_with_variable() {
        let asm = generate("SUB i, i, j\n");
        assert!(asm.contains("    mov eax, [j]\n"));
        assert!(asm.contains("    sub dword [i], eax\n"));
        assert!(asm.contains("    j dd 0\n"));
    }

    #[test]
    fn test_three_operand_form_with_distinct_dest_is_dropped() {
        let asm = generate("ADD k, i, 1\n");
        assert!(!asm.contains("add"));
        // The destination is still materialized.
        assert!(asm.contains("    k dd 0\n"));
    }

    #[test]
    fn test_if_with_variable_lhs() {
        let asm = generate("t1 = 3\nIF i < t1 GOTO L2\n");
        assert!(asm.contains("    mov eax, [i]\n"));
        // t1 sits in eax, which the variable load just clobbered; the
        // compare is emitted against the register mapping regardless.
        assert!(asm.contains("    cmp eax, eax\n"));
        assert!(asm.contains("    jl L2\n"));
    }

    #[test]
    fn test_if_jump_selection() {
        for (op, jump) in [
            ("<", "jl"),
            (">", "jg"),
            ("<=", "jle"),
            (">=", "jge"),
            ("==", "je"),
            ("!=", "jne"),
        ] {
            let asm = generate(&format!("IF a {} 1 GOTO L9\n", op));
            assert!(
                asm.contains(&format!("    {} L9\n", jump)),
                "{} should lower to {}",
                op,
                jump
            );
        }
    }

    #[test]
    fn test_goto_and_label() {
        let asm = generate("L1:\nGOTO L1\n");
        assert!(asm.contains("\nL1:\n"));
        assert!(asm.contains("    jmp L1\n"));
    }

    #[test]
    fn test_indented_tac_lines_are_recognized() {
        let asm = generate("L1:\n\tMOV a, 1\nL2:\n");
        assert!(asm.contains("    mov dword [a], 1\n"));
    }

    #[test]
    fn test_unrecognized_lines_are_skipped() {
        let asm = generate("this is not tac\n???\n");
        assert!(asm.contains("_start:\n\n    ; Exit program\n"));
    }

    #[test]
    fn test_data_section_is_deduplicated_and_ordered() {
        let asm = generate("MOV b, 1\nMOV a, 2\nMOV b, 3\n");
        let data_b = asm.find("b dd 0").unwrap();
        let data_a = asm.find("a dd 0").unwrap();
        assert!(data_b < data_a, "first-referenced variable comes first");
        assert_eq!(asm.matches("b dd 0").count(), 1);
    }

    #[test]
    fn test_exit_trailer() {
        let asm = generate("MOV a, 1\n");
        assert!(asm.ends_with(
            "\n    ; Exit program\n    mov eax, 1\n    xor ebx, ebx\n    int 0x80\n"
        ));
    }

    #[test]
    fn test_spill_round_robin() {
        // Seven simultaneously-live temporaries: the seventh allocation
        // evicts t1 from eax, the ring's first stop.
        let mut gen = AssemblyGenerator::new();
        let tac: String = (1..=7).map(|i| format!("t{} = {}\n", i, i)).collect();
        gen.generate_from_tac(&tac);
        assert_eq!(gen.spill_log(), ["Spilling t1 from eax for t7"]);
    }

    #[test]
    fn test_spill_ring_advances() {
        let mut gen = AssemblyGenerator::new();
        let tac: String = (1..=8).map(|i| format!("t{} = {}\n", i, i)).collect();
        gen.generate_from_tac(&tac);
        assert_eq!(
            gen.spill_log(),
            [
                "Spilling t1 from eax for t7",
                "Spilling t2 from ebx for t8"
            ]
        );
    }

    #[test]
    fn test_pool_and_map_partition_registers() {
        let mut gen = AssemblyGenerator::new();
        gen.generate_from_tac("t1 = 1\nt2 = 2\nt3 = t1 + t2\n");
        // t1 stays mapped (binary left operands are not freed), t2 was
        // freed back to the pool, t3 is live.
        assert_eq!(gen.pool.len() + gen.map.len(), REGISTERS.len());
    }

    #[test]
    fn test_free_register_returns_to_pool_tail() {
        let mut gen = AssemblyGenerator::new();
        gen.generate_from_tac("t1 = 1\nMOV a, t1\nt2 = 2\n");
        // t1's eax went to the back of the pool, so t2 gets ebx.
        assert!(gen.asm_code.iter().any(|l| l == "    mov ebx, 2"));
    }
}
