use thiserror::Error;

use crate::commands::{Command, CommandKind};
use crate::roster::{Roster, StudentRecord};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CalcError {
    #[error("cannot average {column}: roster has no students")]
    EmptyRoster { column: String },
    #[error("student {student} has no {field} field")]
    MissingField { student: String, field: String },
    #[error("student {student} has a non-numeric {field} value: {value:?}")]
    BadNumber {
        student: String,
        field: String,
        value: String,
    },
}

fn numeric_field(id: &str, record: &StudentRecord, field: &str) -> Result<f64, CalcError> {
    let raw = record.field(field).ok_or_else(|| CalcError::MissingField {
        student: id.to_string(),
        field: field.to_string(),
    })?;
    raw.trim().parse::<f64>().map_err(|_| CalcError::BadNumber {
        student: id.to_string(),
        field: field.to_string(),
        value: raw.to_string(),
    })
}

/// Mean of one column across every student. A student missing the column or
/// carrying a non-numeric value fails the whole request; nobody is silently
/// skipped.
pub fn column_average(roster: &Roster, column: &str) -> Result<f64, CalcError> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for (id, record) in roster.entries() {
        sum += numeric_field(id, record, column)?;
        count += 1;
    }
    if count == 0 {
        return Err(CalcError::EmptyRoster {
            column: column.to_string(),
        });
    }
    Ok(sum / count as f64)
}

/// Mean over the "<base> 1".."<base> slots" fields of every student, pooled
/// into one sum and one count. Every slot value weighs the same regardless
/// of which student it belongs to.
pub fn pooled_average(roster: &Roster, base: &str, slots: u32) -> Result<f64, CalcError> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for (id, record) in roster.entries() {
        for slot in 1..=slots {
            let field = format!("{base} {slot}");
            sum += numeric_field(id, record, &field)?;
            count += 1;
        }
    }
    if count == 0 {
        return Err(CalcError::EmptyRoster {
            column: base.to_string(),
        });
    }
    Ok(sum / count as f64)
}

/// The requesting student's fields only, in record order.
pub fn full_record(record: &StudentRecord) -> String {
    record
        .fields()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A whole-number mean still renders with one decimal: "Midterm average: 85.0".
pub fn render_average(label: &str, value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{label} average: {value:.1}")
    } else {
        format!("{label} average: {value}")
    }
}

pub fn answer(
    roster: &Roster,
    record: &StudentRecord,
    command: &Command,
) -> Result<String, CalcError> {
    match command.kind {
        CommandKind::FullRecord => Ok(full_record(record)),
        CommandKind::ColumnAverage { column } => {
            column_average(roster, column).map(|v| render_average(column, v))
        }
        CommandKind::PooledAverage { base, slots } => {
            pooled_average(roster, base, slots).map(|v| render_average(base, v))
        }
    }
}
