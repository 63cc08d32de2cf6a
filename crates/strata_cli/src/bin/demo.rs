//! An 8-bit counter with a synchronous reset, driven through the Strata CLI.
//!
//! ```text
//! strata-demo generate counter.v
//! strata-demo simulate -c 300 -p 10ns --vcd counter.vcd
//! ```

use strata_ir::{Design, DomainOptions, IrError, Shape, Statement};

fn counter() -> Result<Design, IrError> {
    let mut d = Design::new();
    let top = d.fragment("counter");
    let sync = d.add_domain("sync", DomainOptions::new())?;

    let count = d.output(top, "count", Shape::unsigned(8));
    let wrap = d.output(top, "wrap", Shape::unsigned(1));

    d.sync(top, sync, Statement::assign(count, count + 1u32));
    d.comb(top, Statement::assign(wrap, count.value().equal(255u32)));
    d.set_top(top);
    Ok(d)
}

fn main() {
    match counter() {
        Ok(design) => strata_cli::main(design),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
