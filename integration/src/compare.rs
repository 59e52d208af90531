//! Cycle-by-cycle comparison of two simulators' snapshot logs.

use serde::Serialize;

use crate::snapshot::Snapshot;

#[derive(Clone, Debug, PartialEq, Eq, derive_more::Display)]
pub enum SnapshotDiff {
    #[display("cycle count: candidate has {candidate}, reference has {reference}")]
    CycleCount { candidate: usize, reference: usize },
    #[display("cycle {cycle}, {field}: candidate {candidate}, reference {reference}")]
    Field {
        cycle: usize,
        field: &'static str,
        candidate: String,
        reference: String,
    },
    #[display("final state, {field}: candidate {candidate}, reference {reference}")]
    FinalField {
        field: &'static str,
        candidate: String,
        reference: String,
    },
}

/// Differences between `candidate` and `reference`: the cycle count, every
/// field of the first diverging cycle and, when the runs have different
/// lengths, the fields of their final snapshots.
pub fn diff_snapshots(candidate: &[Snapshot], reference: &[Snapshot]) -> Vec<SnapshotDiff> {
    let mut diffs = Vec::new();
    if candidate.len() != reference.len() {
        diffs.push(SnapshotDiff::CycleCount {
            candidate: candidate.len(),
            reference: reference.len(),
        });
    }

    let first_divergence = candidate
        .iter()
        .zip(reference)
        .enumerate()
        .map(|(cycle, (c, r))| (cycle, field_diffs(c, r)))
        .find(|(_, fields)| !fields.is_empty());
    if let Some((cycle, fields)) = first_divergence {
        diffs.extend(
            fields
                .into_iter()
                .map(|(field, candidate, reference)| SnapshotDiff::Field {
                    cycle,
                    field,
                    candidate,
                    reference,
                }),
        );
    }

    if candidate.len() != reference.len() {
        if let (Some(c), Some(r)) = (candidate.last(), reference.last()) {
            diffs.extend(field_diffs(c, r).into_iter().map(
                |(field, candidate, reference)| SnapshotDiff::FinalField {
                    field,
                    candidate,
                    reference,
                },
            ));
        }
    }
    diffs
}

type FieldDiff = (&'static str, String, String);

fn field_diffs(candidate: &Snapshot, reference: &Snapshot) -> Vec<FieldDiff> {
    let mut diffs = Vec::new();
    let mut compare = |field: &'static str, c: &dyn RenderJson, r: &dyn RenderJson| {
        let (c, r) = (c.render(), r.render());
        if c != r {
            diffs.push((field, c, r));
        }
    };
    compare("PC", &candidate.pc, &reference.pc);
    compare("Exception", &candidate.exception, &reference.exception);
    compare("ExceptionPC", &candidate.exception_pc, &reference.exception_pc);
    compare("ActiveList", &candidate.active_list, &reference.active_list);
    compare("DecodedPCs", &candidate.decoded_pcs, &reference.decoded_pcs);
    compare("IntegerQueue", &candidate.integer_queue, &reference.integer_queue);
    compare(
        "BusyBitTable",
        &busy_bits(candidate),
        &busy_bits(reference),
    );
    compare("FreeList", &candidate.free_list, &reference.free_list);
    compare(
        "RegisterMapTable",
        &candidate.register_map_table,
        &reference.register_map_table,
    );
    compare(
        "PhysicalRegisterFile",
        &candidate.physical_register_file,
        &reference.physical_register_file,
    );
    diffs
}

/// `0/1` and `false/true` encodings compare equal.
fn busy_bits(snapshot: &Snapshot) -> Vec<bool> {
    snapshot.busy_bit_table.iter().map(|bit| bit.is_set()).collect()
}

trait RenderJson {
    fn render(&self) -> String;
}

impl<T: Serialize> RenderJson for T {
    fn render(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!("<unserializable: {e}>"))
    }
}
