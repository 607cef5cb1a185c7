/// What a command computes once resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Mean of one named column across every student in the roster.
    ColumnAverage { column: &'static str },
    /// Mean pooled over the "<base> 1".."<base> N" slots of every student.
    /// One sum and one count over the whole roster, not a mean of
    /// per-student means.
    PooledAverage { base: &'static str, slots: u32 },
    /// The requesting student's full record.
    FullRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub token: &'static str,
    pub kind: CommandKind,
    /// Operator progress line the client prints when the command is accepted.
    pub progress: &'static str,
}

pub const COMMANDS: &[Command] = &[
    Command {
        token: "GMA",
        kind: CommandKind::ColumnAverage { column: "Midterm" },
        progress: "Fetching midterm average: ",
    },
    Command {
        token: "GL1A",
        kind: CommandKind::ColumnAverage { column: "Lab 1" },
        progress: "Fetching lab 1 average: ",
    },
    Command {
        token: "GL2A",
        kind: CommandKind::ColumnAverage { column: "Lab 2" },
        progress: "Fetching lab 2 average: ",
    },
    Command {
        token: "GL3A",
        kind: CommandKind::ColumnAverage { column: "Lab 3" },
        progress: "Fetching lab 3 average: ",
    },
    Command {
        token: "GL4A",
        kind: CommandKind::ColumnAverage { column: "Lab 4" },
        progress: "Fetching lab 4 average: ",
    },
    Command {
        token: "GEA",
        kind: CommandKind::PooledAverage {
            base: "Exam",
            slots: 4,
        },
        progress: "Fetching exams average: ",
    },
    Command {
        token: "GG",
        kind: CommandKind::FullRecord,
        progress: "Getting Grades: ",
    },
];

impl Command {
    /// Case-sensitive exact match over the fixed table. Unknown tokens fail
    /// closed before any roster access.
    pub fn resolve(token: &str) -> Option<&'static Command> {
        COMMANDS.iter().find(|c| c.token == token)
    }
}
