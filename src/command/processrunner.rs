use std::io::{BufRead, BufReader, Read};
use std::marker::PhantomData;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::Sender;
use std::thread;

use super::stream::{Event, Metadata, OutputEvent};
use super::CommandError;

#[derive(Debug)]
pub struct Unstarted;
#[derive(Debug)]
pub struct Started;

/// Builds and spawns one supervised child with piped stdio. The typestate
/// keeps pid and stream access behind an actual spawn.
#[derive(Debug)]
pub struct ProcessRunner<State = Unstarted> {
    cmd: Option<Command>,
    process: Option<Child>,
    metadata: Metadata,

    state: PhantomData<State>,
}

impl ProcessRunner {
    pub fn new(name: &str, argv: &[String]) -> Result<Self, CommandError> {
        let (binary, args) = argv
            .split_first()
            .ok_or_else(|| CommandError::EmptyArgv(name.to_string()))?;

        let mut command = Command::new(binary);
        command
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        Ok(Self {
            cmd: Some(command),
            process: None,
            metadata: Metadata::new(name),
            state: PhantomData,
        })
    }

    pub fn start(self) -> Result<ProcessRunner<Started>, CommandError> {
        let name = self.metadata.name().to_string();
        let mut cmd = self.cmd.ok_or(CommandError::EmptyArgv(name.clone()))?;
        let process = cmd
            .spawn()
            .map_err(|source| CommandError::SpawnFailure { name, source })?;

        Ok(ProcessRunner {
            cmd: None,
            process: Some(process),
            metadata: self.metadata,
            state: PhantomData,
        })
    }
}

impl ProcessRunner<Started> {
    pub fn pid(&self) -> u32 {
        // set in start(), the Started state cannot be built without it
        self.process.as_ref().map(Child::id).unwrap_or_default()
    }

    /// Moves stdout and stderr onto reader threads that forward each line
    /// to `snd` tagged with the child's name. The threads drain whatever
    /// remains in the pipes when the child exits, then finish.
    pub fn stream(mut self, snd: &Sender<Event>) -> Result<ProcessRunner<Started>, CommandError> {
        let name = self.metadata.name().to_string();
        let child = self
            .process
            .as_mut()
            .ok_or_else(|| CommandError::NotPiped(name.clone()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CommandError::NotPiped(name.clone()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| CommandError::NotPiped(name.clone()))?;

        spawn_line_reader(stdout, self.metadata.clone(), snd.clone(), OutputEvent::Stdout);
        spawn_line_reader(stderr, self.metadata.clone(), snd.clone(), OutputEvent::Stderr);
        Ok(self)
    }

    pub fn into_child(self) -> Child {
        // same invariant as pid(): Started always holds a process
        self.process.expect("started process")
    }
}

fn spawn_line_reader<R>(
    pipe: R,
    metadata: Metadata,
    snd: Sender<Event>,
    wrap: fn(String) -> OutputEvent,
) where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        for line in BufReader::new(pipe).lines() {
            let Ok(line) = line else { break };
            // receiver gone means the executor is shutting down
            if snd
                .send(Event {
                    metadata: metadata.clone(),
                    output: wrap(line),
                })
                .is_err()
            {
                break;
            }
        }
    });
}
