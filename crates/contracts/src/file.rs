//! IncomingFile - a named byte stream delivered by the trigger host

/// File handed over by the trigger host for a single invocation.
///
/// `content` is any `tokio::io::AsyncRead`. Hosts that must close the stream
/// themselves pass `&mut stream`, keeping ownership across the call.
///
/// # Example
///
/// ```ignore
/// let mut blob = tokio::fs::File::open("invoice_42.pdf").await?;
/// let result = dispatcher
///     .handle(IncomingFile::new("invoice_42.pdf", &mut blob))
///     .await?;
/// drop(blob); // host releases the stream
/// ```
#[derive(Debug)]
pub struct IncomingFile<R> {
    /// Blob name as reported by the trigger
    pub name: String,
    /// Byte stream (consumed fully or partially by the processor)
    pub content: R,
}

impl<R> IncomingFile<R> {
    pub fn new(name: impl Into<String>, content: R) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }

    /// Split into name and stream
    pub fn into_parts(self) -> (String, R) {
        (self.name, self.content)
    }
}
