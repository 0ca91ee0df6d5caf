//! Clinical tables: conditions, medications and actions.
//!
//! Tables are derived state.  Each is the baseline rows the patient was
//! created with, plus the merge of every event in the record, in record
//! order.  [`ClinicalState::rebuild`] recomputes them from scratch, which is
//! how an overwritten record entry is reflected.
//!
//! Rows are keyed by `(name, start)`.  An event matching an existing key
//! updates that row; any other event appends a row whose `count` is the
//! number of rows with that name so far (including itself).

use std::collections::BTreeMap;

use pa_core::PatientTime;

use crate::{AgentError, AgentResult, ClinicalEvent, Effect, PatientRecordEntry, ResourceKind};

/// Which clinical table a row belongs to.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TableKind {
    Conditions,
    Medications,
    Actions,
}

// ── ClinicalRow ───────────────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClinicalRow {
    pub name:   String,
    pub start:  PatientTime,
    pub end:    Option<PatientTime>,
    /// `true` iff `end` is `None`.
    pub active: bool,
    /// Occurrence number of this name within the table, starting at 1.
    pub count:  u32,
    /// First record entry that produced the row; `None` for baseline rows.
    pub record_index: Option<usize>,
    pub code:   Option<String>,
    pub dosage: Option<String>,
    pub resource_kind: Option<ResourceKind>,
}

impl ClinicalRow {
    /// An active baseline row (comorbidity, long-term medication, …).
    pub fn new(name: impl Into<String>, start: PatientTime) -> Self {
        Self {
            name: name.into(),
            start,
            end:           None,
            active:        true,
            count:         1,
            record_index:  None,
            code:          None,
            dosage:        None,
            resource_kind: None,
        }
    }

    pub fn end(mut self, end: PatientTime) -> Self {
        self.end = Some(end);
        self.active = false;
        self
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn dosage(mut self, dosage: impl Into<String>) -> Self {
        self.dosage = Some(dosage.into());
        self
    }

    fn from_event(event: &ClinicalEvent, count: u32, record_index: usize) -> Self {
        Self {
            name:          event.name.clone(),
            start:         event.start,
            end:           event.end,
            active:        event.end.is_none(),
            count,
            record_index:  Some(record_index),
            code:          event.code.clone(),
            dosage:        event.dosage.clone(),
            resource_kind: Some(event.kind),
        }
    }

    fn update_from(&mut self, event: &ClinicalEvent) {
        self.end = event.end;
        self.active = event.end.is_none();
        if event.code.is_some() {
            self.code = event.code.clone();
        }
        if event.dosage.is_some() {
            self.dosage = event.dosage.clone();
        }
    }
}

// ── ClinicalTable ─────────────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "TableRows", into = "TableRows"))]
pub struct ClinicalTable {
    pub kind: TableKind,
    rows:     Vec<ClinicalRow>,
    /// `(name, start)` → row position.
    keys:     BTreeMap<(String, PatientTime), usize>,
    /// Rows per name.
    names:    BTreeMap<String, u32>,
}

impl ClinicalTable {
    pub fn new(kind: TableKind) -> Self {
        Self { kind, rows: Vec::new(), keys: BTreeMap::new(), names: BTreeMap::new() }
    }

    /// Table seeded with baseline rows.  Counts are renumbered by name in
    /// the given order.
    ///
    /// # Errors
    ///
    /// [`AgentError::DuplicateTableRow`] if two rows share `(name, start)`.
    pub fn from_baseline(kind: TableKind, rows: Vec<ClinicalRow>) -> AgentResult<Self> {
        let mut table = Self::new(kind);
        for mut row in rows {
            if table.get(&row.name, row.start).is_some() {
                return Err(AgentError::DuplicateTableRow {
                    table: kind,
                    name:  row.name,
                    start: row.start,
                });
            }
            row.count = table.count_named(&row.name) + 1;
            row.active = row.end.is_none();
            table.push_row(row);
        }
        Ok(table)
    }

    /// Merge one event produced by record entry `record_index`.
    pub fn merge(&mut self, event: &ClinicalEvent, record_index: usize) {
        match self.keys.get(&(event.name.clone(), event.start)) {
            Some(&at) => self.rows[at].update_from(event),
            None => {
                let count = self.count_named(&event.name) + 1;
                self.push_row(ClinicalRow::from_event(event, count, record_index));
            }
        }
    }

    pub fn get(&self, name: &str, start: PatientTime) -> Option<&ClinicalRow> {
        self.keys.get(&(name.to_string(), start)).map(|&at| &self.rows[at])
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Rows with no end date.
    pub fn active(&self) -> impl Iterator<Item = &ClinicalRow> {
        self.rows.iter().filter(|r| r.active)
    }

    pub fn rows(&self) -> &[ClinicalRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn count_named(&self, name: &str) -> u32 {
        self.names.get(name).copied().unwrap_or(0)
    }

    fn push_row(&mut self, row: ClinicalRow) {
        self.keys.insert((row.name.clone(), row.start), self.rows.len());
        *self.names.entry(row.name.clone()).or_insert(0) += 1;
        self.rows.push(row);
    }
}

/// Serialized form of a table; the lookup indexes are rebuilt on load.
#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct TableRows {
    kind: TableKind,
    rows: Vec<ClinicalRow>,
}

#[cfg(feature = "serde")]
impl From<TableRows> for ClinicalTable {
    fn from(table: TableRows) -> Self {
        let mut out = Self::new(table.kind);
        for row in table.rows {
            out.push_row(row);
        }
        out
    }
}

#[cfg(feature = "serde")]
impl From<ClinicalTable> for TableRows {
    fn from(table: ClinicalTable) -> Self {
        Self { kind: table.kind, rows: table.rows }
    }
}

// ── ClinicalState ─────────────────────────────────────────────────────────────

/// The three clinical tables of one patient.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClinicalState {
    pub conditions:  ClinicalTable,
    pub medications: ClinicalTable,
    pub actions:     ClinicalTable,
}

impl Default for ClinicalState {
    fn default() -> Self {
        Self {
            conditions:  ClinicalTable::new(TableKind::Conditions),
            medications: ClinicalTable::new(TableKind::Medications),
            actions:     ClinicalTable::new(TableKind::Actions),
        }
    }
}

impl ClinicalState {
    pub fn table(&self, kind: TableKind) -> &ClinicalTable {
        match kind {
            TableKind::Conditions  => &self.conditions,
            TableKind::Medications => &self.medications,
            TableKind::Actions     => &self.actions,
        }
    }

    fn table_mut(&mut self, kind: TableKind) -> &mut ClinicalTable {
        match kind {
            TableKind::Conditions  => &mut self.conditions,
            TableKind::Medications => &mut self.medications,
            TableKind::Actions     => &mut self.actions,
        }
    }

    /// Merge every table-routed event of `entry`.
    pub fn apply_entry(&mut self, entry: &PatientRecordEntry) {
        for effect in &entry.effects {
            let Effect::Event(event) = effect else { continue };
            if let Some(kind) = event.kind.table() {
                self.table_mut(kind).merge(event, entry.record_index);
            }
        }
    }

    /// `baseline` plus every entry of `record`, in order.
    pub fn rebuild(baseline: &ClinicalState, record: &[PatientRecordEntry]) -> ClinicalState {
        let mut state = baseline.clone();
        for entry in record {
            state.apply_entry(entry);
        }
        state
    }
}
