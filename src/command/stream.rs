/// Identifies which child produced an output line.
#[derive(Debug, Clone)]
pub struct Metadata {
    name: String,
}

impl Metadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A single line of child output, either stdout or stderr.
#[derive(Debug)]
pub enum OutputEvent {
    Stdout(String),
    Stderr(String),
}

#[derive(Debug)]
pub struct Event {
    pub metadata: Metadata,
    pub output: OutputEvent,
}
