//! JsonHandler - local sink writing one JSON object per line

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::{debug, instrument};

use contracts::{DeliveryContext, DeliveryError, DeliveryHandler, Record};

/// Handler that writes records as JSON lines
pub struct JsonHandler {
    name: String,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonHandler {
    /// Create a handler writing to `writer`
    pub fn new(name: impl Into<String>, writer: impl Write + Send + 'static) -> Self {
        Self {
            name: name.into(),
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// Handler writing to stdout
    pub fn stdout() -> Self {
        Self::new("json", io::stdout())
    }

    /// Handler dropping every record after encoding it
    pub fn discard() -> Self {
        Self::new("json", io::sink())
    }

    /// Handler appending to `path`, creating parent directories
    pub fn file(name: impl Into<String>, path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        debug!(path = %path.display(), "JsonHandler file opened");
        Ok(Self::new(name, file))
    }

    fn write_line(&self, line: &[u8]) -> io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(line)?;
        writer.flush()
    }
}

#[async_trait]
impl DeliveryHandler for JsonHandler {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "json_handler_deliver",
        skip(self, ctx, record),
        fields(handler = %self.name, key = record.idempotency_key())
    )]
    async fn deliver(&self, ctx: &DeliveryContext, record: &Record) -> Result<(), DeliveryError> {
        ctx.check(&self.name)?;

        let mut line =
            serde_json::to_vec(record).map_err(|e| DeliveryError::encode(&self.name, e))?;
        line.push(b'\n');

        self.write_line(&line)
            .map_err(|e| DeliveryError::transport_with_source(&self.name, e))
    }
}
