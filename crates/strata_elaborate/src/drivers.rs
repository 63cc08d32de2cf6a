//! Driver analysis: every signal may be assigned by at most one process.

use std::collections::HashMap;

use strata_ir::{Arena, Domain, SignalId, SrcLoc};

use crate::context::BoundInput;
use crate::errors::ElabError;
use crate::flat::{FlatSignal, Process, ProcessId, SignalRole};

/// Checks that no signal is driven by two processes and records each driven
/// signal's role.
///
/// Several assignments to one signal inside a single process are fine; the
/// last one executed wins. Two processes (two comb scopes, comb and sync, two
/// domains, or two instances) assigning the same signal is an error naming
/// the first assignment of each.
///
/// A signal bound to an instance's input port belongs to the parent. Logic
/// inside the instance assigning it is reported the same way, with the
/// port binding as the first driver.
pub(crate) fn assign_drivers(
    signals: &mut Arena<SignalId, FlatSignal>,
    processes: &[Process],
    bound_inputs: &[BoundInput],
) -> Result<(), ElabError> {
    let mut first_driver: HashMap<SignalId, (ProcessId, SrcLoc)> = HashMap::new();
    for (index, process) in processes.iter().enumerate() {
        let pid = ProcessId::from_raw(index as u32);
        let inputs: Vec<&BoundInput> = bound_inputs.iter().filter(|b| b.processes.contains(&index)).collect();
        let mut conflict = None;
        let mut input_driven = None;
        for stmt in &process.statements {
            stmt.visit_targets(&mut |id, loc| {
                if conflict.is_some() || input_driven.is_some() {
                    return;
                }
                if let Some(input) = inputs.iter().find(|b| b.actual == id) {
                    input_driven = Some((id, *input, loc.clone()));
                    return;
                }
                match first_driver.get(&id) {
                    Some((other, other_loc)) if *other != pid => {
                        conflict = Some((id, *other, other_loc.clone(), loc.clone()));
                    }
                    Some(_) => {}
                    None => {
                        first_driver.insert(id, (pid, loc.clone()));
                    }
                }
            });
        }
        if let Some((id, input, second_loc)) = input_driven {
            return Err(ElabError::MultipleDrivers {
                signal: signals[id].path.clone(),
                first_scope: format!("input port '{}' of '{}'", input.port, input.scope),
                first_loc: input.loc.clone(),
                second_scope: process.label.clone(),
                second_loc,
            });
        }
        if let Some((id, other, first_loc, second_loc)) = conflict {
            return Err(ElabError::MultipleDrivers {
                signal: signals[id].path.clone(),
                first_scope: processes[other.index()].label.clone(),
                first_loc,
                second_scope: process.label.clone(),
                second_loc,
            });
        }
    }

    for (id, (pid, _)) in first_driver {
        signals[id].role = match processes[pid.index()].domain {
            Domain::Comb => SignalRole::Comb(pid),
            Domain::Sync(domain) => SignalRole::Sync {
                domain,
                process: pid,
            },
        };
    }
    Ok(())
}
