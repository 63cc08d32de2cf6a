//! Elaboration: turns a built [`Design`] into an [`ElaboratedDesign`].
//!
//! Elaboration walks the instance tree from the top fragment, gives every
//! signal of every instance a unique identity, resolves port bindings into
//! aliases of the parent's signals, and checks the structural invariants:
//! one driver per signal and no clock or reset that depends on a register of
//! its own domain. It also builds the combinational dependency graph used by
//! the simulator for incremental settling.
//!
//! Any failure is fatal: no partially elaborated design is ever returned.

#![warn(missing_docs)]

mod context;
mod drivers;
pub mod errors;
pub mod flat;
pub mod graph;

use std::collections::HashMap;

use strata_ir::{Arena, Design};

use context::FlattenContext;
pub use errors::ElabError;
pub use flat::{ElaboratedDesign, FlatDomain, FlatPort, FlatSignal, Process, ProcessId, SignalRole};
pub use graph::{DepNode, DependencyGraph};

/// Flattens and checks `design`.
pub fn elaborate(design: &Design) -> Result<ElaboratedDesign, ElabError> {
    let top = design.top().ok_or(ElabError::NoTop)?;
    let top_def = design.fragment_def(top);

    let mut ctx = FlattenContext::new(design);
    ctx.flatten(top, "", &HashMap::new(), &top_def.loc)?;
    let (mut signals, processes, bound_inputs) = ctx.finish();
    drivers::assign_drivers(&mut signals, &processes, &bound_inputs)?;

    let mut domains = Arena::new();
    for d in design.domains().values() {
        domains.alloc(FlatDomain {
            name: design.name(d.name).to_string(),
            clk: d.clk,
            rst: d.rst,
            edge: d.edge,
            polarity: d.polarity,
            reset_kind: d.reset_kind,
        });
    }

    let graph = DependencyGraph::build(&signals, &processes);
    graph::check_domains(&signals, &domains, &graph)?;

    let ports = top_def
        .ports
        .iter()
        .map(|p| FlatPort {
            name: design.name(p.name).to_string(),
            direction: p.direction,
            signal: p.signal,
        })
        .collect();

    let elaborated = ElaboratedDesign {
        name: design.name(top_def.name).to_string(),
        signals,
        processes,
        domains,
        ports,
        graph,
    };
    tracing::info!(
        top = elaborated.top_name(),
        signals = elaborated.live_signals().count(),
        processes = elaborated.processes().len(),
        domains = elaborated.domains().len(),
        "elaborated design"
    );
    Ok(elaborated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_ir::{Domain, DomainOptions, PortDirection, Shape, Signal, Statement, Target};

    fn u(width: u32) -> Shape {
        Shape::unsigned(width)
    }

    /// A fragment with input `a` and output `y = a + 1`.
    fn incrementer(d: &mut Design) -> (strata_ir::FragmentId, Signal, Signal) {
        let f = d.fragment("inc");
        let a = d.input(f, "a", u(4));
        let y = d.output(f, "y", u(4));
        d.comb(f, Statement::assign(y, a + 1));
        (f, a, y)
    }

    #[test]
    fn missing_top() {
        assert_eq!(elaborate(&Design::new()).unwrap_err(), ElabError::NoTop);
    }

    #[test]
    fn counter_roles() {
        let mut d = Design::new();
        let sync = d.add_domain("sync", DomainOptions::new()).unwrap();
        let top = d.fragment("top");
        let count = d.output(top, "count", u(8));
        let next = d.signal(top, "next", u(8));
        d.comb(top, Statement::assign(next, count + 1));
        d.sync(top, sync, Statement::assign(count, next));
        d.set_top(top);

        let e = elaborate(&d).unwrap();
        assert!(matches!(e.signal(next.id).role, SignalRole::Comb(_)));
        assert!(matches!(e.signal(count.id).role, SignalRole::Sync { domain, .. } if domain == sync));
        let clk = d.clock_signal(sync).id;
        assert_eq!(e.signal(clk).role, SignalRole::Input);
        assert_eq!(e.comb_processes().count(), 1);
        assert_eq!(e.sync_processes(sync).count(), 1);
        assert_eq!(e.ports().len(), 1);
        assert_eq!(e.ports()[0].direction, PortDirection::Output);
    }

    #[test]
    fn repeated_instances_get_distinct_signals() {
        let mut d = Design::new();
        let (inc, a, y) = incrementer(&mut d);
        let top = d.fragment("top");
        let x = d.input(top, "x", u(4));
        let m = d.signal(top, "m", u(4));
        let z = d.output(top, "z", u(4));
        d.instance(top, "u0", inc, [(a, x), (y, m)]).unwrap();
        d.instance(top, "u1", inc, [(a, m), (y, z)]).unwrap();
        d.set_top(top);

        let e = elaborate(&d).unwrap();
        // Bound ports alias the parent's signals.
        assert_eq!(e.find_signal("u0.a"), Some(x.id));
        assert_eq!(e.find_signal("u0.y"), Some(m.id));
        assert!(matches!(e.signal(y.id).role, SignalRole::Alias(_)));
        assert!(matches!(e.signal(m.id).role, SignalRole::Comb(_)));
        assert!(matches!(e.signal(z.id).role, SignalRole::Comb(_)));
        assert_ne!(e.signal(m.id).role, e.signal(z.id).role);
        assert_eq!(e.comb_processes().count(), 2);
        assert_eq!(e.resolve(a.id), x.id);
    }

    #[test]
    fn unbound_outputs_become_local_signals() {
        let mut d = Design::new();
        let (inc, a, _) = incrementer(&mut d);
        let top = d.fragment("top");
        let x = d.input(top, "x", u(4));
        d.instance(top, "u0", inc, [(a, x)]).unwrap();
        d.instance(top, "u1", inc, [(a, x)]).unwrap();
        d.set_top(top);

        let e = elaborate(&d).unwrap();
        let y0 = e.find_signal("u0.y").unwrap();
        let y1 = e.find_signal("u1.y").unwrap();
        assert_ne!(y0, y1);
        assert!(matches!(e.signal(y1).role, SignalRole::Comb(_)));
    }

    #[test]
    fn multiple_comb_drivers() {
        let mut d = Design::new();
        let top = d.fragment("top");
        let a = d.signal(top, "a", u(1));
        let b = d.signal(top, "b", u(1));
        let (inc, ia, iy) = incrementer(&mut d);
        let x = d.signal(top, "x", u(4));
        let y = d.signal(top, "y", u(4));
        d.comb(top, Statement::assign(a, b));
        d.comb(top, Statement::assign(y, x));
        d.instance(top, "u0", inc, [(ia, x), (iy, y)]).unwrap();
        d.set_top(top);

        match elaborate(&d).unwrap_err() {
            ElabError::MultipleDrivers {
                signal,
                first_scope,
                second_scope,
                ..
            } => {
                assert_eq!(signal, "y");
                assert_eq!(first_scope, "comb logic of 'top'");
                assert_eq!(second_scope, "comb logic of 'u0'");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn comb_and_sync_driver_conflict() {
        let mut d = Design::new();
        let sync = d.add_domain("sync", DomainOptions::new()).unwrap();
        let top = d.fragment("top");
        let q = d.signal(top, "q", u(1));
        d.comb(top, Statement::assign(q, 0));
        d.sync(top, sync, Statement::assign(q, 1));
        d.set_top(top);
        let err = elaborate(&d).unwrap_err();
        assert_eq!(err.code(), "E307");
    }

    #[test]
    fn last_assignment_in_one_scope_is_not_a_conflict() {
        let mut d = Design::new();
        let top = d.fragment("top");
        let q = d.signal(top, "q", u(2));
        d.comb(top, Statement::assign(q, 0));
        d.comb(top, Statement::assign(Target::slice(q, 0, 1).unwrap(), 1));
        d.set_top(top);
        assert!(elaborate(&d).is_ok());
    }

    #[test]
    fn foreign_signal_rejected() {
        let mut d = Design::new();
        let other = d.fragment("other");
        let hidden = d.signal(other, "hidden", u(1));
        let top = d.fragment("top");
        let a = d.signal(top, "a", u(1));
        d.comb(top, Statement::assign(a, hidden));
        d.set_top(top);
        assert!(matches!(
            elaborate(&d).unwrap_err(),
            ElabError::ForeignSignal { signal, .. } if signal == "hidden"
        ));
    }

    #[test]
    fn recursive_instance_rejected() {
        let mut d = Design::new();
        let a = d.fragment("a");
        let b = d.fragment("b");
        d.instance(a, "ub", b, []).unwrap();
        d.instance(b, "ua", a, []).unwrap();
        d.set_top(a);
        assert!(matches!(
            elaborate(&d).unwrap_err(),
            ElabError::RecursiveInstance { path, .. } if path == "ub.ua"
        ));
    }

    #[test]
    fn unbound_input_rejected() {
        let mut d = Design::new();
        let (inc, _, _) = incrementer(&mut d);
        let top = d.fragment("top");
        d.instance(top, "u0", inc, []).unwrap();
        d.set_top(top);
        assert!(matches!(
            elaborate(&d).unwrap_err(),
            ElabError::UnboundInput { port, .. } if port == "a"
        ));
    }

    #[test]
    fn port_shape_mismatch_rejected() {
        let mut d = Design::new();
        let (inc, a, _) = incrementer(&mut d);
        let top = d.fragment("top");
        let narrow = d.signal(top, "narrow", u(3));
        d.instance(top, "u0", inc, [(a, narrow)]).unwrap();
        d.set_top(top);
        let err = elaborate(&d).unwrap_err();
        assert_eq!(err.code(), "E305");
        match err {
            ElabError::PortShapeMismatch {
                instance,
                port,
                port_shape,
                actual,
                actual_shape,
                ..
            } => {
                assert_eq!(instance, "u0");
                assert_eq!(port, "a");
                assert_eq!(port_shape, u(4));
                assert_eq!(actual, "narrow");
                assert_eq!(actual_shape, u(3));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn child_driving_its_input_rejected() {
        let mut d = Design::new();
        let child = d.fragment("child");
        let a = d.input(child, "a", u(1));
        d.comb(child, Statement::assign(a, 1));
        let top = d.fragment("top");
        let x = d.input(top, "x", u(1));
        d.instance(top, "u0", child, [(a, x)]).unwrap();
        d.set_top(top);

        match elaborate(&d).unwrap_err() {
            ElabError::MultipleDrivers {
                signal,
                first_scope,
                second_scope,
                ..
            } => {
                assert_eq!(signal, "x");
                assert_eq!(first_scope, "input port 'a' of 'u0'");
                assert_eq!(second_scope, "comb logic of 'u0'");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn grandchild_output_into_child_input_rejected() {
        let mut d = Design::new();
        let leaf = d.fragment("leaf");
        let o = d.output(leaf, "o", u(1));
        d.comb(leaf, Statement::assign(o, 1));
        let mid = d.fragment("mid");
        let a = d.input(mid, "a", u(1));
        d.instance(mid, "g", leaf, [(o, a)]).unwrap();
        let top = d.fragment("top");
        let x = d.signal(top, "x", u(1));
        d.comb(top, Statement::assign(x, 0));
        d.instance(top, "u0", mid, [(a, x)]).unwrap();
        d.set_top(top);

        assert!(matches!(
            elaborate(&d).unwrap_err(),
            ElabError::MultipleDrivers { first_scope, .. } if first_scope == "input port 'a' of 'u0'"
        ));
    }

    #[test]
    fn child_reading_its_input_is_fine() {
        let mut d = Design::new();
        let (inc, a, y) = incrementer(&mut d);
        let top = d.fragment("u0");
        let x = d.input(top, "x", u(4));
        let z = d.output(top, "z", u(4));
        d.instance(top, "u0", inc, [(a, x), (y, z)]).unwrap();
        d.set_top(top);
        let e = elaborate(&d).unwrap();
        assert_eq!(e.signal(e.resolve(x.id)).role, SignalRole::Input);
    }

    #[test]
    fn clock_derived_from_own_register_rejected() {
        let mut d = Design::new();
        let top = d.fragment("top");
        let q = d.signal(top, "q", u(1));
        let clk = d.signal(top, "gclk", u(1));
        let dom = d.add_domain_with("div", clk, None, DomainOptions::new()).unwrap();
        d.comb(top, Statement::assign(clk, !q));
        d.sync(top, dom, Statement::assign(q, !q));
        d.set_top(top);
        match elaborate(&d).unwrap_err() {
            ElabError::DomainSelfDependency { domain, role, signal } => {
                assert_eq!((domain.as_str(), role, signal.as_str()), ("div", "clock", "q"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn clock_derived_from_other_domain_is_fine() {
        let mut d = Design::new();
        let sync = d.add_domain("sync", DomainOptions::new()).unwrap();
        let top = d.fragment("top");
        let q = d.signal(top, "q", u(1));
        let slow = d.signal(top, "slow_clk", u(1));
        let dom = d.add_domain_with("slow", slow, None, DomainOptions::new()).unwrap();
        let r = d.signal(top, "r", u(1));
        d.sync(top, sync, Statement::assign(q, !q));
        d.comb(top, Statement::assign(slow, q));
        d.sync(top, dom, Statement::assign(r, !r));
        d.set_top(top);
        assert!(elaborate(&d).is_ok());
    }

    #[test]
    fn unknown_domain_rejected() {
        let mut d = Design::new();
        let top = d.fragment("top");
        let q = d.signal(top, "q", u(1));
        d.add_statement(top, Domain::Sync(strata_ir::DomainId::from_raw(5)), Statement::assign(q, 1));
        d.set_top(top);
        assert_eq!(elaborate(&d).unwrap_err().code(), "E306");
    }

    #[test]
    fn dependency_graph_orders_and_finds_loops() {
        let mut d = Design::new();
        let top = d.fragment("top");
        let a = d.signal(top, "a", u(1));
        let b = d.signal(top, "b", u(1));
        let c = d.signal(top, "c", u(1));
        let (inner, ia, iy) = {
            let f = d.fragment("inv");
            let i = d.input(f, "i", u(1));
            let o = d.output(f, "o", u(1));
            d.comb(f, Statement::assign(o, !i));
            (f, i, o)
        };
        // c depends on b through an instance, b on a in top's comb logic.
        d.comb(top, Statement::assign(b, a));
        d.instance(top, "u0", inner, [(ia, b), (iy, c)]).unwrap();
        d.set_top(top);
        let e = elaborate(&d).unwrap();
        let order = e.graph().comb_order().to_vec();
        assert_eq!(order.len(), 2);
        assert_eq!(e.process(order[0]).scope, "top");
        assert_eq!(e.process(order[1]).scope, "u0");
        assert_eq!(e.graph().readers(b.id), &[order[1]]);
        assert_eq!(e.graph().fan_in(c.id), vec![a.id, b.id]);
        assert!(e.graph().cycles().is_empty());
    }

    #[test]
    fn comb_loop_is_not_an_elaboration_error() {
        let mut d = Design::new();
        let top = d.fragment("top");
        let a = d.signal(top, "a", u(1));
        let b = d.signal(top, "b", u(1));
        d.comb(top, Statement::assign(a, !b));
        d.comb(top, Statement::assign(b, !a));
        d.set_top(top);
        let e = elaborate(&d).unwrap();
        assert_eq!(e.graph().cycles(), &[vec![a.id, b.id]]);
    }

    #[test]
    fn unused_fragments_are_not_live() {
        let mut d = Design::new();
        let (_, a, _) = incrementer(&mut d);
        let top = d.fragment("top");
        d.set_top(top);
        let e = elaborate(&d).unwrap();
        assert_eq!(e.signal(a.id).role, SignalRole::Unused);
        assert!(e.find_signal("a").is_none());
    }

    #[test]
    fn fragment_info_summarizes() {
        let mut d = Design::new();
        let sync = d.add_domain("sync", DomainOptions::new()).unwrap();
        let top = d.fragment("counter");
        let en = d.input(top, "en", u(1));
        let count = d.output(top, "count", u(8));
        d.sync(top, sync, Statement::when(en, vec![Statement::assign(count, count + 1)]));
        d.set_top(top);
        let info = elaborate(&d).unwrap().fragment_info();
        assert!(info.contains("top: counter"));
        assert!(info.contains("inputs: en"));
        assert!(info.contains("outputs: count"));
        assert!(info.contains("1 registered"));
        assert!(info.contains("domain sync: clock 'clk' posedge, sync reset 'rst'"));
    }
}
