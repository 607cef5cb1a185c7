use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

/// Position of the student id in every row. The id is the map key, not a
/// record field.
pub const ID_COLUMN: usize = 1;

/// Column holding the per-student encryption key. Provisioned externally,
/// never generated here.
pub const KEY_FIELD: &str = "Key";

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("failed to read roster file: {0}")]
    Io(#[from] std::io::Error),
    #[error("roster file has no header row")]
    MissingHeader,
    #[error("header row has no column at the student id position")]
    NarrowHeader,
    #[error("row {row} has {got} field(s), header has {expected}")]
    MalformedRow {
        row: usize,
        got: usize,
        expected: usize,
    },
    #[error("row {row} repeats student id {id}")]
    DuplicateId { row: usize, id: String },
}

/// One student's field name to value mapping, in header order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRecord {
    fields: Vec<(String, String)>,
}

impl StudentRecord {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Fields in header order, id column excluded.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn key(&self) -> Option<&str> {
        self.field(KEY_FIELD)
    }
}

/// The course roster, loaded once at startup and immutable afterwards.
#[derive(Debug, Default)]
pub struct Roster {
    students: HashMap<String, StudentRecord>,
}

impl Roster {
    pub fn load(path: &Path) -> Result<Roster, RosterError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Startup policy: a missing or malformed roster file is not fatal. The
    /// server runs with an empty roster and every lookup fails instead.
    pub fn load_or_empty(path: &Path) -> Roster {
        match Self::load(path) {
            Ok(roster) => {
                debug!(
                    "read {} student record(s) from {}",
                    roster.len(),
                    path.display()
                );
                roster
            }
            Err(RosterError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "roster file {} not found, starting with an empty roster",
                    path.display()
                );
                Roster::default()
            }
            Err(e) => {
                warn!(
                    "could not load roster from {}: {e}; starting with an empty roster",
                    path.display()
                );
                Roster::default()
            }
        }
    }

    /// First non-blank line is the header, every other non-blank line is one
    /// student row. Blank lines are ignored wherever they appear. A row whose
    /// width differs from the header fails the whole load; nothing is ever
    /// indexed positionally past a width check.
    pub fn parse(text: &str) -> Result<Roster, RosterError> {
        let mut lines = text
            .lines()
            .map(str::trim)
            .enumerate()
            .filter(|(_, line)| !line.is_empty());

        let Some((_, header_line)) = lines.next() else {
            return Err(RosterError::MissingHeader);
        };
        let header: Vec<&str> = header_line.split(',').collect();
        if header.len() <= ID_COLUMN {
            return Err(RosterError::NarrowHeader);
        }

        let mut students = HashMap::new();
        for (idx, line) in lines {
            let row = idx + 1;
            let cells: Vec<&str> = line.split(',').collect();
            if cells.len() != header.len() {
                return Err(RosterError::MalformedRow {
                    row,
                    got: cells.len(),
                    expected: header.len(),
                });
            }
            let id = cells[ID_COLUMN].to_string();
            let fields = header
                .iter()
                .zip(cells.iter())
                .enumerate()
                .filter(|(i, _)| *i != ID_COLUMN)
                .map(|(_, (k, v))| (k.to_string(), v.to_string()))
                .collect();
            if students
                .insert(id.clone(), StudentRecord { fields })
                .is_some()
            {
                return Err(RosterError::DuplicateId { row, id });
            }
        }
        Ok(Roster { students })
    }

    pub fn lookup(&self, id: &str) -> Option<&StudentRecord> {
        self.students.get(id)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &StudentRecord)> {
        self.students.iter().map(|(id, r)| (id.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }
}
