use std::fmt;

/// Per-dataset pipeline states, in the order they are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Read,
    ValidateColumns,
    Transform,
    ValidateKeys,
    Dedupe,
    Classify,
    PersistFiles,
    LoadStore,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Read => "read",
            Stage::ValidateColumns => "validate_columns",
            Stage::Transform => "transform",
            Stage::ValidateKeys => "validate_keys",
            Stage::Dedupe => "dedupe",
            Stage::Classify => "classify",
            Stage::PersistFiles => "persist_files",
            Stage::LoadStore => "load_store",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
