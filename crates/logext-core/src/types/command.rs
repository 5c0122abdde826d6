use super::level::LogLevel;
use super::record::RecordId;

/// Which line a command serializes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandKind {
    /// Full record definition (`$DEF`)
    #[default]
    Def,
    /// Counter increment for an already defined id (`$INC`)
    Inc,
}

/// Pooled envelope describing one line to persist
///
/// A plain struct tagged with [`CommandKind`] so instances can be recycled
/// through the pool regardless of kind. Fields irrelevant to the kind are
/// left at their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteCommand {
    pub kind: CommandKind,
    pub id: RecordId,
    pub level: LogLevel,
    pub timestamp: i64,
    pub message: String,
    pub payload: Option<String>,
    pub caller_file: String,
    pub caller_line: u32,
    /// Pre-serialized stack payload; the writer does no further transformation
    pub stack_json: String,
    /// Increment amount for `Inc`
    pub amount: u64,
}

impl WriteCommand {
    /// Turn this instance into a `$DEF` for a freshly created record
    #[allow(clippy::too_many_arguments)]
    pub fn set_def(
        &mut self,
        id: RecordId,
        level: LogLevel,
        timestamp: i64,
        message: &str,
        payload: Option<&str>,
        caller_file: &str,
        caller_line: u32,
        stack_json: String,
    ) {
        self.kind = CommandKind::Def;
        self.id = id;
        self.level = level;
        self.timestamp = timestamp;
        self.message.clear();
        self.message.push_str(message);
        self.payload = payload.map(str::to_owned);
        self.caller_file.clear();
        self.caller_file.push_str(caller_file);
        self.caller_line = caller_line;
        self.stack_json = stack_json;
        self.amount = 0;
    }

    /// Turn this instance into an `$INC` for an existing record
    pub fn set_inc(&mut self, id: RecordId, amount: u64) {
        self.kind = CommandKind::Inc;
        self.id = id;
        self.amount = amount;
    }

    /// Release every heap-backed field and reset scalars
    ///
    /// Called by the pool on return so retained commands do not pin memory.
    pub fn reset(&mut self) {
        self.kind = CommandKind::Def;
        self.id = 0;
        self.level = LogLevel::Verbose;
        self.timestamp = 0;
        self.message = String::new();
        self.payload = None;
        self.caller_file = String::new();
        self.caller_line = 0;
        self.stack_json = String::new();
        self.amount = 0;
    }
}
