/// A single write staged in a [`Transaction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    SetScalar {
        entity_id: String,
        name: String,
        value: String,
    },
    AppendLog {
        entity_id: String,
        field: String,
        timestamp: i64,
        value: String,
    },
    AddToSet {
        set_name: String,
        member: String,
        added_at: i64,
    },
    SetHashField {
        record_id: String,
        field: String,
        value: String,
    },
}

/// Ordered batch of writes applied all-or-nothing by
/// [`PrimaryStore::commit`](super::PrimaryStore::commit).
///
/// There is no concurrency token: two transactions appending to the same
/// log both land, and whichever commits last becomes "latest".
#[derive(Debug, Default)]
pub struct Transaction {
    ops: Vec<Op>,
}

impl Transaction {
    pub fn stage(&mut self, op: Op) -> &mut Self {
        self.ops.push(op);
        self
    }

    pub fn set_scalar(
        &mut self,
        entity_id: impl Into<String>,
        name: &str,
        value: impl Into<String>,
    ) -> &mut Self {
        self.stage(Op::SetScalar {
            entity_id: entity_id.into(),
            name: name.to_owned(),
            value: value.into(),
        })
    }

    pub fn append_log(
        &mut self,
        entity_id: impl Into<String>,
        field: &str,
        timestamp: i64,
        value: impl Into<String>,
    ) -> &mut Self {
        self.stage(Op::AppendLog {
            entity_id: entity_id.into(),
            field: field.to_owned(),
            timestamp,
            value: value.into(),
        })
    }

    pub fn add_to_set(
        &mut self,
        set_name: &str,
        member: impl Into<String>,
        added_at: i64,
    ) -> &mut Self {
        self.stage(Op::AddToSet {
            set_name: set_name.to_owned(),
            member: member.into(),
            added_at,
        })
    }

    pub fn set_hash_field(
        &mut self,
        record_id: impl Into<String>,
        field: &str,
        value: impl Into<String>,
    ) -> &mut Self {
        self.stage(Op::SetHashField {
            record_id: record_id.into(),
            field: field.to_owned(),
            value: value.into(),
        })
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub(super) fn into_ops(self) -> Vec<Op> {
        self.ops
    }
}
