//! # Flow sources
//!
//! [`FlowSource`] is the capability the controller polls once per tick for the current
//! connection-tracking snapshot. [`ConntrackSource`] implements it by running
//! `conntrack -L -p tcp` under a bounded timeout and normalizing its output.
//!
//! A source never blocks the loop for longer than its timeout: a slow or missing tool
//! yields a [`SourceError`], which the controller turns into an empty snapshot.

use super::flow_record::{parse_conntrack_output, FlowRecord};
use crate::error_handling::types::SourceError;
use log::debug;
use std::future::Future;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

pub trait FlowSource: Send {
    fn fetch(&mut self) -> impl Future<Output = Result<Vec<FlowRecord>, SourceError>> + Send;
}

pub struct ConntrackSource {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ConntrackSource {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: vec!["-L".into(), "-p".into(), "tcp".into()],
            timeout,
        }
    }

    /// Overrides the argument list, mostly useful to point the source at a fixture
    /// (`cat dump.txt`).
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl FlowSource for ConntrackSource {
    fn fetch(&mut self) -> impl Future<Output = Result<Vec<FlowRecord>, SourceError>> + Send {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            // conntrack warns on stderr when not running as root
            .stderr(Stdio::null())
            .kill_on_drop(true);
        let program = self.program.clone();
        let timeout = self.timeout;

        async move {
            let output = tokio::time::timeout(timeout, command.output())
                .await
                .map_err(|_| {
                    SourceError::Timeout(format!("{} did not finish within {:?}", program, timeout))
                })?
                .map_err(SourceError::SpawnFailed)?;

            // conntrack exits non-zero on an empty table, the output is still usable
            if !output.status.success() && output.stdout.is_empty() {
                return Err(SourceError::CommandFailed(format!(
                    "{} exited with {}",
                    program, output.status
                )));
            }

            let text = String::from_utf8_lossy(&output.stdout);
            let records = parse_conntrack_output(&text);
            debug!("{} returned {} tcp flow record(s)", program, records.len());
            Ok(records)
        }
    }
}
