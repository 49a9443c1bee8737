//! In-memory collaborators shared by the dispatcher and interactive loop tests.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::backend::{
    Backend, BackendError, Backends, DynInput, DynOutput, ExecutionResult, TextBackend,
};
use crate::executor::Dispatcher;
use crate::logger::LogSink;

/// What a [`StubBackend`] answers to `execute`.
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    /// The command followed by a newline.
    Echo,
    Fixed(&'static str),
    /// The text together with a `Closed` failure.
    Partial(&'static str),
    /// No text, `Timeout` failure.
    Fail,
}

/// Every call made to any stub, in order, as `"<backend>:<op>:<arg>"`.
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub struct StubBackend {
    name: &'static str,
    reply: Reply,
    reject_credentials: bool,
    calls: CallLog,
}

impl StubBackend {
    pub fn new(name: &'static str, reply: Reply, calls: &CallLog) -> Self {
        Self {
            name,
            reply,
            reject_credentials: false,
            calls: Arc::clone(calls),
        }
    }

    pub fn rejecting(mut self) -> Self {
        self.reject_credentials = true;
        self
    }

    fn record(&self, op: &str, arg: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}:{}:{}", self.name, op, arg));
    }
}

#[async_trait]
impl Backend for StubBackend {
    async fn execute(&self, _address: &str, _password: &str, command: &str) -> ExecutionResult {
        self.record("execute", command);
        match self.reply {
            Reply::Echo => ExecutionResult::ok(format!("{}\n", command)),
            Reply::Fixed(text) => ExecutionResult::ok(text),
            Reply::Partial(text) => ExecutionResult::partial(text, BackendError::Closed),
            Reply::Fail => ExecutionResult::failed(BackendError::Timeout),
        }
    }

    async fn check_credentials(&self, address: &str, _password: &str) -> Result<(), BackendError> {
        self.record("check", address);
        if self.reject_credentials {
            Err(BackendError::AuthFailed)
        } else {
            Ok(())
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

#[async_trait]
impl TextBackend for StubBackend {
    async fn interactive(
        &self,
        _input: DynInput<'_>,
        output: DynOutput<'_>,
        address: &str,
        password: &str,
    ) -> Result<(), BackendError> {
        self.record("interactive", &format!("{}/{}", address, password));
        output.write_all(b"telnet session\n").await?;
        Ok(())
    }
}

/// One stub per protocol, all answering with `reply`.
pub fn stub_backends(reply: Reply, calls: &CallLog) -> Backends {
    Backends {
        rcon: Box::new(StubBackend::new("rcon", reply, calls)),
        telnet: Box::new(StubBackend::new("telnet", reply, calls)),
        web: Box::new(StubBackend::new("web", reply, calls)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub target: Option<PathBuf>,
    pub address: String,
    pub command: String,
    pub result: String,
}

/// Keeps records in memory, or fails every write.
#[derive(Default)]
pub struct RecordingSink {
    pub records: Arc<Mutex<Vec<LogRecord>>>,
    pub fail: bool,
}

#[async_trait]
impl LogSink for RecordingSink {
    async fn add_log(
        &self,
        target: Option<&Path>,
        address: &str,
        command: &str,
        result: &str,
    ) -> io::Result<()> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only file system"));
        }
        self.records.lock().unwrap().push(LogRecord {
            target: target.map(Path::to_path_buf),
            address: address.to_string(),
            command: command.to_string(),
            result: result.to_string(),
        });
        Ok(())
    }
}

/// A dispatcher wired to stubs, plus handles to observe them.
pub struct Harness {
    pub dispatcher: Dispatcher,
    pub calls: CallLog,
    pub records: Arc<Mutex<Vec<LogRecord>>>,
}

impl Harness {
    pub fn new(reply: Reply) -> Self {
        Self::build(reply, false, false)
    }

    pub fn with_failing_log(reply: Reply) -> Self {
        Self::build(reply, true, false)
    }

    pub fn with_rejected_credentials(reply: Reply) -> Self {
        Self::build(reply, false, true)
    }

    fn build(reply: Reply, fail_log: bool, reject: bool) -> Self {
        let calls = CallLog::default();
        let mut backends = stub_backends(reply, &calls);
        if reject {
            backends.rcon = Box::new(StubBackend::new("rcon", reply, &calls).rejecting());
            backends.web = Box::new(StubBackend::new("web", reply, &calls).rejecting());
        }

        let sink = RecordingSink {
            fail: fail_log,
            ..Default::default()
        };
        let records = Arc::clone(&sink.records);

        Self {
            dispatcher: Dispatcher::new(backends, Box::new(sink)),
            calls,
            records,
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().unwrap().clone()
    }
}
