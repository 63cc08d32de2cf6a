//! Verilog netlist output.
//!
//! The design is written as a single flattened module. Every expression node
//! becomes a `wire` with an explicit width, and operands are sign- or
//! zero-extended by hand, so the text never relies on Verilog's
//! context-dependent sizing rules. Combinational processes become
//! `always @*` blocks that load reset values before running their
//! statements; synchronous processes become edge-triggered blocks with the
//! domain reset overriding data.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::Write as _;

use strata_common::Bits;
use strata_elaborate::{ElaboratedDesign, FlatDomain, Process, SignalRole};
use strata_ir::{
    BinaryOp, Domain, Edge, MaskedPattern, PortDirection, ResetKind, ResetPolarity, SignalId, Statement, Target,
    UnaryOp, Value, ValueKind,
};

use crate::code_writer::CodeWriter;
use crate::error::BackendError;

const KEYWORDS: &[&str] = &[
    "always", "and", "assign", "begin", "buf", "case", "casex", "casez", "default", "else", "end", "endcase",
    "endfunction", "endmodule", "for", "function", "if", "initial", "inout", "input", "integer", "localparam",
    "module", "nand", "negedge", "nor", "not", "or", "output", "parameter", "posedge", "reg", "signed", "wire",
    "xor",
];

/// Renders `design` as a Verilog module named `name`, or after the top
/// fragment if `name` is `None`.
pub fn convert(design: &ElaboratedDesign, name: Option<&str>) -> Result<String, BackendError> {
    let module_name = sanitize(name.unwrap_or(design.top_name()));
    let mut emitter = Emitter::new(design);
    emitter.assign_names();

    let mut blocks = CodeWriter::new(String::new());
    blocks.indent();
    for process in design.processes() {
        match process.domain {
            Domain::Comb => emitter.comb_block(process, &mut blocks)?,
            Domain::Sync(d) => emitter.sync_block(process, design.domain(d), &mut blocks)?,
        }
    }
    let blocks = blocks.into_inner();

    let mut w = CodeWriter::new(String::new());
    w.append_line("/* Generated by Strata */")?;
    emitter.write_header(&module_name, &mut w)?;
    w.indent();
    emitter.write_declarations(&mut w)?;
    w.append(&blocks)?;
    w.unindent()?;
    w.append_line("endmodule")?;

    tracing::info!(
        module = %module_name,
        wires = emitter.wires.len(),
        processes = design.processes().len(),
        "generated Verilog netlist"
    );
    Ok(w.into_inner())
}

/// Turns a hierarchical path into a plain Verilog identifier.
fn sanitize(path: &str) -> String {
    let mut out: String = path
        .replace('.', "__")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit() || c == '$') {
        out.insert(0, '_');
    }
    if KEYWORDS.contains(&out.as_str()) {
        out.push('_');
    }
    out
}

fn range(width: u32) -> String {
    if width > 1 {
        format!(" [{}:0]", width - 1)
    } else {
        String::new()
    }
}

fn literal(bits: &Bits) -> String {
    if bits.width() == 0 {
        "1'b0".to_string()
    } else {
        format!("{}'b{bits}", bits.width())
    }
}

fn pattern(p: &MaskedPattern) -> String {
    format!("{}'b{}", p.mask.width(), p.to_casez())
}

struct Emitter<'d> {
    design: &'d ElaboratedDesign,
    names: HashMap<SignalId, String>,
    inputs: BTreeSet<SignalId>,
    constants: BTreeSet<SignalId>,
    wires: Vec<(String, u32, String)>,
    cache: HashMap<Value, String>,
}

impl<'d> Emitter<'d> {
    fn new(design: &'d ElaboratedDesign) -> Self {
        Self {
            design,
            names: HashMap::new(),
            inputs: BTreeSet::new(),
            constants: BTreeSet::new(),
            wires: Vec::new(),
            cache: HashMap::new(),
        }
    }

    /// Names every live signal; top ports keep their port names. Undriven
    /// signals become module inputs if they are ports or domain controls
    /// and constants otherwise.
    fn assign_names(&mut self) {
        let mut taken: HashSet<String> = HashSet::new();
        for port in self.design.ports() {
            let name = sanitize(&port.name);
            taken.insert(name.clone());
            self.names.insert(port.signal, name);
            if port.direction == PortDirection::Input {
                self.inputs.insert(port.signal);
            }
        }
        for d in self.design.domains().values() {
            self.inputs.extend(std::iter::once(d.clk).chain(d.rst));
        }
        for (id, s) in self.design.live_signals() {
            if s.role == SignalRole::Input && !self.inputs.contains(&id) {
                self.constants.insert(id);
            }
            if self.names.contains_key(&id) {
                continue;
            }
            let base = sanitize(&s.path);
            let mut name = base.clone();
            let mut n = 1;
            while !taken.insert(name.clone()) {
                name = format!("{base}_{n}");
                n += 1;
            }
            self.names.insert(id, name);
        }
        // Domain controls driven by logic are not inputs.
        let design = self.design;
        self.inputs.retain(|id| design.signal(*id).role == SignalRole::Input);
    }

    fn name(&self, id: SignalId) -> &str {
        let id = self.design.resolve(id);
        self.names.get(&id).map(String::as_str).unwrap_or("_unknown")
    }

    fn write_header(&self, module_name: &str, w: &mut CodeWriter<String>) -> Result<(), BackendError> {
        let mut ports: Vec<String> = Vec::new();
        for &id in &self.inputs {
            let s = self.design.signal(id);
            let signed = if s.shape.signed { " signed" } else { "" };
            ports.push(format!("input wire{signed}{} {}", range(s.shape.width), self.name(id)));
        }
        for port in self.design.ports() {
            if port.direction != PortDirection::Output {
                continue;
            }
            let s = self.design.signal(port.signal);
            let kind = if s.role == SignalRole::Input { "wire" } else { "reg" };
            let signed = if s.shape.signed { " signed" } else { "" };
            ports.push(format!("output {kind}{signed}{} {}", range(s.shape.width), self.name(port.signal)));
        }

        if ports.is_empty() {
            return w.append_line(&format!("module {module_name};"));
        }
        w.append_line(&format!("module {module_name}("))?;
        w.indent();
        let last = ports.len() - 1;
        for (i, port) in ports.iter().enumerate() {
            let sep = if i == last { "" } else { "," };
            w.append_line(&format!("{port}{sep}"))?;
        }
        w.unindent()?;
        w.append_line(");")
    }

    fn write_declarations(&self, w: &mut CodeWriter<String>) -> Result<(), BackendError> {
        let outputs: HashSet<SignalId> = self
            .design
            .ports()
            .iter()
            .filter(|p| p.direction == PortDirection::Output)
            .map(|p| p.signal)
            .collect();
        for (id, s) in self.design.live_signals() {
            if self.inputs.contains(&id) {
                continue;
            }
            let signed = if s.shape.signed { " signed" } else { "" };
            let name = self.name(id);
            if self.constants.contains(&id) {
                if outputs.contains(&id) {
                    w.append_line(&format!("assign {name} = {};", literal(&s.reset)))?;
                } else {
                    w.append_line(&format!(
                        "wire{signed}{} {name} = {};",
                        range(s.shape.width),
                        literal(&s.reset)
                    ))?;
                }
            } else if !outputs.contains(&id) {
                let init = match s.role {
                    SignalRole::Sync { .. } => format!(" = {}", literal(&s.reset)),
                    _ => String::new(),
                };
                w.append_line(&format!("reg{signed}{} {name}{init};", range(s.shape.width)))?;
            }
        }
        for (name, width, expr) in &self.wires {
            w.append_line(&format!("wire{} {name} = {expr};", range(*width)))?;
        }
        Ok(())
    }

    fn wire(&mut self, width: u32, expr: String) -> String {
        let name = format!("_w{}", self.wires.len());
        self.wires.push((name.clone(), width, expr));
        name
    }

    /// Text of exactly `v.width()` bits; a literal, a signal or a wire.
    fn operand(&mut self, v: &Value) -> String {
        match v.kind() {
            ValueKind::Const(bits) => literal(bits),
            ValueKind::Signal(id) => self.name(*id).to_string(),
            _ => self.node(v),
        }
    }

    /// Like [`operand`](Self::operand) but always something bits can be
    /// selected from.
    fn ident(&mut self, v: &Value) -> String {
        match v.kind() {
            ValueKind::Const(bits) => self.wire(bits.width(), literal(bits)),
            _ => self.operand(v),
        }
    }

    /// Resizes `v` to `width` bits according to its own signedness.
    fn extend(&mut self, v: &Value, width: u32) -> String {
        let from = v.width();
        if from == 0 || width == 0 {
            return literal(&Bits::new(width.max(1)));
        }
        if from == width {
            return self.operand(v);
        }
        if width < from {
            let base = self.ident(v);
            return if width == 1 {
                format!("{base}[0]")
            } else {
                format!("{base}[{}:0]", width - 1)
            };
        }
        let fill = width - from;
        if v.shape().signed {
            let base = self.ident(v);
            format!("{{{{{fill}{{{base}[{}]}}}}, {base}}}", from - 1)
        } else {
            let base = self.operand(v);
            format!("{{{{{fill}{{1'b0}}}}, {base}}}")
        }
    }

    fn node(&mut self, v: &Value) -> String {
        if let Some(name) = self.cache.get(v) {
            return name.clone();
        }
        let width = v.width();
        if width == 0 {
            return literal(&Bits::new(0));
        }
        let expr = match v.kind() {
            ValueKind::Const(bits) => literal(bits),
            ValueKind::Signal(id) => self.name(*id).to_string(),
            ValueKind::Slice { value, start, end } => {
                let base = self.ident(value);
                if end - start == 1 {
                    format!("{base}[{start}]")
                } else {
                    format!("{base}[{}:{start}]", end - 1)
                }
            }
            ValueKind::Part {
                value,
                offset,
                width: part_width,
                stride,
            } => {
                let base = self.operand(value);
                let off = self.operand(offset);
                let shifted = self.wire(value.width().max(1), format!("{base} >> ({off} * {stride})"));
                if *part_width <= value.width() {
                    format!("{shifted}[{}:0]", part_width - 1)
                } else {
                    format!("{{{{{}{{1'b0}}}}, {shifted}}}", part_width - value.width())
                }
            }
            ValueKind::Concat(parts) => {
                let texts: Vec<String> = parts
                    .iter()
                    .rev()
                    .filter(|p| p.width() > 0)
                    .map(|p| self.operand(p))
                    .collect();
                format!("{{{}}}", texts.join(", "))
            }
            ValueKind::Repl { value, count } => {
                let inner = self.operand(value);
                format!("{{{count}{{{inner}}}}}")
            }
            ValueKind::Unary { op, operand } => match op {
                UnaryOp::Not => format!("~{}", self.operand(operand)),
                UnaryOp::Neg => format!("-{}", self.extend(operand, width)),
                UnaryOp::Any => format!("|{}", self.operand(operand)),
                UnaryOp::All => format!("&{}", self.operand(operand)),
                UnaryOp::Xor => format!("^{}", self.operand(operand)),
            },
            ValueKind::Binary { op, lhs, rhs } => self.binary(*op, lhs, rhs, width),
            ValueKind::Mux {
                cond,
                if_true,
                if_false,
            } => {
                let c = self.operand(cond);
                let t = self.extend(if_true, width);
                let f = self.extend(if_false, width);
                format!("{c} ? {t} : {f}")
            }
        };
        let name = self.wire(width, expr);
        self.cache.insert(v.clone(), name.clone());
        name
    }

    fn binary(&mut self, op: BinaryOp, lhs: &Value, rhs: &Value, width: u32) -> String {
        match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => {
                let l = self.extend(lhs, width);
                let r = self.extend(rhs, width);
                format!("{l} {} {r}", op.symbol())
            }
            BinaryOp::Shl => {
                let l = self.extend(lhs, width);
                let amount = self.shift_amount(rhs);
                format!("{l} << {amount}")
            }
            BinaryOp::Shr => {
                let amount = self.shift_amount(rhs);
                if lhs.shape().signed {
                    let l = self.ident(lhs);
                    format!("$signed({l}) >>> {amount}")
                } else {
                    let l = self.operand(lhs);
                    format!("{l} >> {amount}")
                }
            }
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let common = lhs.width().max(rhs.width()) + 1;
                let l = self.extend(lhs, common);
                let r = self.extend(rhs, common);
                if lhs.shape().signed || rhs.shape().signed {
                    format!("$signed({l}) {} $signed({r})", op.symbol())
                } else {
                    format!("{l} {} {r}", op.symbol())
                }
            }
        }
    }

    /// A negative signed shift amount shifts by zero.
    fn shift_amount(&mut self, amount: &Value) -> String {
        if amount.shape().signed && amount.width() > 0 {
            let a = self.ident(amount);
            format!("({a}[{}] ? {}'d0 : {a})", amount.width() - 1, amount.width())
        } else {
            self.operand(amount)
        }
    }

    fn target(&self, target: &Target) -> String {
        match target {
            Target::Signal(s) => self.name(s.id).to_string(),
            Target::Slice { signal, start, end } => {
                let name = self.name(signal.id);
                if end - start == 1 {
                    format!("{name}[{start}]")
                } else {
                    format!("{name}[{}:{start}]", end - 1)
                }
            }
            Target::Concat(parts) => {
                let texts: Vec<String> = parts
                    .iter()
                    .rev()
                    .filter(|p| p.width() > 0)
                    .map(|p| self.target(p))
                    .collect();
                format!("{{{}}}", texts.join(", "))
            }
        }
    }

    fn statements(&mut self, stmts: &[Statement], op: &str, w: &mut CodeWriter<String>) -> Result<(), BackendError> {
        for stmt in stmts {
            match stmt {
                Statement::Assign { target, value, .. } => {
                    if target.width() == 0 {
                        continue;
                    }
                    let rhs = self.extend(value, target.width());
                    let lhs = self.target(target);
                    w.append_line(&format!("{lhs} {op} {rhs};"))?;
                }
                Statement::Switch {
                    selector,
                    cases,
                    default,
                    ..
                } => {
                    let live: Vec<_> = cases.iter().filter(|c| !c.patterns.is_empty()).collect();
                    if live.is_empty() && default.is_none() {
                        continue;
                    }
                    if selector.width() == 0 {
                        // Every pattern of a zero-width selector matches.
                        match live.first() {
                            Some(case) => self.statements(&case.body, op, w)?,
                            None => self.statements(default.as_deref().unwrap_or_default(), op, w)?,
                        }
                        continue;
                    }
                    let sel = self.operand(selector);
                    w.append_line(&format!("casez ({sel})"))?;
                    w.indent();
                    for case in live {
                        let labels: Vec<String> = case.patterns.iter().map(pattern).collect();
                        w.append_line(&format!("{}: begin", labels.join(", ")))?;
                        w.indent();
                        self.statements(&case.body, op, w)?;
                        w.unindent()?;
                        w.append_line("end")?;
                    }
                    if let Some(body) = default {
                        w.append_line("default: begin")?;
                        w.indent();
                        self.statements(body, op, w)?;
                        w.unindent()?;
                        w.append_line("end")?;
                    }
                    w.unindent()?;
                    w.append_line("endcase")?;
                }
            }
        }
        Ok(())
    }

    fn comb_block(&mut self, process: &Process, w: &mut CodeWriter<String>) -> Result<(), BackendError> {
        w.append_line(&format!("// {}", process.label))?;
        w.append_line("always @* begin")?;
        w.indent();
        for &id in &process.drives {
            let s = self.design.signal(id);
            w.append_line(&format!("{} = {};", self.name(id), literal(&s.reset)))?;
        }
        self.statements(&process.statements, "=", w)?;
        w.unindent()?;
        w.append_line("end")?;
        w.append_newline()
    }

    fn sync_block(&mut self, process: &Process, domain: &FlatDomain, w: &mut CodeWriter<String>) -> Result<(), BackendError> {
        let edge = |e: Edge| match e {
            Edge::Posedge => "posedge",
            Edge::Negedge => "negedge",
        };
        let clk = self.name(domain.clk).to_string();
        let reset = domain.rst.map(|r| {
            let name = self.name(r).to_string();
            match domain.polarity {
                ResetPolarity::ActiveHigh => (format!("posedge {name}"), name),
                ResetPolarity::ActiveLow => (format!("negedge {name}"), format!("!{name}")),
            }
        });
        let resets: Vec<String> = process
            .drives
            .iter()
            .filter(|id| !self.design.signal(**id).reset_less)
            .map(|&id| format!("{} <= {};", self.name(id), literal(&self.design.signal(id).reset)))
            .collect();

        w.append_line(&format!("// {}", process.label))?;
        match (&reset, domain.reset_kind) {
            (Some((sensitivity, asserted)), ResetKind::Async) => {
                w.append_line(&format!("always @({} {clk} or {sensitivity}) begin", edge(domain.edge)))?;
                w.indent();
                w.append_line(&format!("if ({asserted}) begin"))?;
                w.indent();
                for line in &resets {
                    w.append_line(line)?;
                }
                w.unindent()?;
                w.append_line("end else begin")?;
                w.indent();
                self.statements(&process.statements, "<=", w)?;
                w.unindent()?;
                w.append_line("end")?;
            }
            _ => {
                w.append_line(&format!("always @({} {clk}) begin", edge(domain.edge)))?;
                w.indent();
                self.statements(&process.statements, "<=", w)?;
                if let Some((_, asserted)) = &reset {
                    if !resets.is_empty() {
                        w.append_line(&format!("if ({asserted}) begin"))?;
                        w.indent();
                        for line in &resets {
                            w.append_line(line)?;
                        }
                        w.unindent()?;
                        w.append_line("end")?;
                    }
                }
            }
        }
        w.unindent()?;
        w.append_line("end")?;
        w.append_newline()
    }
}
