//! The netlist backend reads the same elaborated design the simulator runs.

use strata_backend::convert;
use strata_conformance::{counter, inverter_chain, two_clock_counters};
use strata_ir::DomainOptions;
use strata_sim::{SimConfig, Simulator};

#[test]
fn counter_netlist_has_clocked_block() {
    let c = counter(8, DomainOptions::default()).unwrap();
    let v = convert(&c.design, None).unwrap();
    assert!(v.contains("module counter("));
    assert!(v.contains("output reg [7:0] count"));
    assert!(v.contains("always @(posedge clk) begin"));
    assert!(v.contains("if (rst) begin"));
}

#[test]
fn each_domain_gets_its_own_clock_input() {
    let t = two_clock_counters().unwrap();
    let v = convert(&t.design, None).unwrap();
    assert!(v.contains("input wire slow_clk"));
    assert!(v.contains("input wire fast_clk"));
    assert!(v.contains("always @(posedge slow_clk) begin"));
    assert!(v.contains("always @(posedge fast_clk) begin"));
    // Reset-less domains have no reset port.
    assert!(!v.contains("slow_rst"));
}

#[test]
fn netlist_is_deterministic_and_leaves_design_untouched() {
    let (design, input, output) = inverter_chain(3).unwrap();
    let first = convert(&design, Some("chain")).unwrap();
    assert_eq!(convert(&design, Some("chain")).unwrap(), first);
    assert!(first.contains("module chain("));
    assert_eq!(first.matches("always @* begin").count(), 3);

    // Emitting the netlist does not disturb simulation of the same design.
    let mut sim = Simulator::new(&design, SimConfig::default());
    sim.poke(input, true).unwrap();
    sim.settle().unwrap();
    assert_eq!(sim.peek_u64(output).unwrap(), Some(0));
}
